use thiserror::Error;

use bridge24_crm::CrmError;

pub type ContactResult<T> = Result<T, ContactError>;

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("Missing required fields: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    #[error("Contact with ID {0} not found")]
    ContactNotFound(String),

    #[error("No requisite found for contact {0}; recreate the contact")]
    RequisiteNotFound(String),

    #[error("No address found for requisite {0}; recreate the contact")]
    AddressNotFound(String),

    #[error("No bank detail found for requisite {0}; recreate the contact")]
    BankDetailNotFound(String),

    #[error(transparent)]
    Crm(#[from] CrmError),
}
