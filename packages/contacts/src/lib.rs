//! Composition of one logical contact out of four Bitrix24 CRM entities:
//! contact, requisite, address, and bank detail.
//!
//! The remote CRM owns all four; this crate only sequences creates,
//! updates, and deletes across them and enriches listings. There are no
//! local transaction semantics: a failure partway through an operation
//! leaves the remote in whatever state the completed calls produced.

pub mod error;
pub mod payloads;
pub mod saga;
pub mod service;
pub mod types;

pub use error::{ContactError, ContactResult};
pub use service::ContactService;
pub use types::{first_by_remote_order, ContactInput, CreatedContact, DeletedContact, UpdatedContact};
