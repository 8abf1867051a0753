//! Ordered multi-entity workflow with an explicit compensation slot per
//! completed step.
//!
//! The create sequence is a saga without compensations: no step registers
//! an undo today, so a failure aborts the sequence and leaves the
//! entities created by earlier steps in place on the remote. The slot
//! exists so that leaving them is a visible choice per step, not an
//! accident of control flow.

use std::fmt::Display;
use std::future::Future;

use futures::future::BoxFuture;
use tracing::{debug, warn};

/// Undo action for one completed step.
pub type Compensation = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct CompletedStep {
    name: &'static str,
    compensation: Option<Compensation>,
}

/// Transient in-flight sequencing for one operation. Nothing is persisted.
#[derive(Default)]
pub struct Saga {
    completed: Vec<CompletedStep>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one step. On success the step joins the completed list together
    /// with its compensation slot; on failure the completed steps unwind in
    /// reverse order and the error surfaces unchanged.
    pub async fn step<T, E, F>(
        &mut self,
        name: &'static str,
        compensation: Option<Compensation>,
        fut: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match fut.await {
            Ok(value) => {
                debug!("Step {} completed", name);
                self.completed.push(CompletedStep { name, compensation });
                Ok(value)
            }
            Err(e) => {
                warn!(
                    "Step {} failed after [{}]: {}",
                    name,
                    self.completed_names().join(", "),
                    e
                );
                self.unwind().await;
                Err(e)
            }
        }
    }

    pub fn completed_names(&self) -> Vec<&'static str> {
        self.completed.iter().map(|step| step.name).collect()
    }

    async fn unwind(&mut self) {
        while let Some(step) = self.completed.pop() {
            match step.compensation {
                Some(compensate) => {
                    warn!("Compensating step {}", step.name);
                    compensate().await;
                }
                None => {
                    // Entities created by this step stay on the remote.
                    warn!("No compensation registered for step {}", step.name);
                }
            }
        }
    }
}
