//! Authenticated JSON client for the Bitrix24 REST API.
//!
//! All remote state lives in Bitrix24; this crate only dispatches
//! method-per-URL calls with a bearer token, refreshing through
//! [`bridge24_auth::TokenManager`] when needed.

pub mod client;
pub mod error;

pub use client::CrmClient;
pub use error::{CrmError, CrmResult};
