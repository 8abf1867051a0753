use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ContactError, ContactResult};

/// CRM entity type discriminator for contacts.
pub const ENTITY_TYPE_CONTACT: u32 = 3;
/// CRM entity type discriminator for requisite-owned addresses and bank details.
pub const ENTITY_TYPE_REQUISITE: u32 = 8;
/// Address TYPE_ID for the primary address slot.
pub const ADDRESS_TYPE_PRIMARY: u32 = 1;
/// Requisite preset used for every created requisite.
pub const REQUISITE_PRESET_ID: u32 = 1;
/// Country code written into requisite, address, and bank-detail payloads.
pub const DEFAULT_COUNTRY: &str = "VN";

/// Inbound contact payload for create and update.
///
/// Every field but `website` is required; validation runs before any
/// remote call and reports the complete missing-field list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
}

impl ContactInput {
    pub fn validate(&self) -> ContactResult<()> {
        let required: [(&str, &Option<String>); 9] = [
            ("name", &self.name),
            ("lastName", &self.last_name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("address", &self.address),
            ("city", &self.city),
            ("region", &self.region),
            ("bankName", &self.bank_name),
            ("bankAccount", &self.bank_account),
        ];

        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map(str::is_empty).unwrap_or(true))
            .map(|(field, _)| field.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ContactError::Validation { missing })
        }
    }

    /// "{name} {lastName}", used for requisite and account-holder names.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
    }
}

/// IDs produced by a completed create sequence, in creation order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedContact {
    pub contact_id: Value,
    pub requisite_id: Value,
    pub address_id: Value,
    pub bank_detail_id: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedContact {
    pub contact_id: String,
    pub requisite_id: Value,
    pub bank_detail_id: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedContact {
    pub contact_id: String,
}

/// Named tie-break rule: when the remote returns several candidate rows
/// for a parent entity, the first row in remote-returned order wins. No
/// sorting, no recency heuristic.
pub fn first_by_remote_order(list_result: &Value) -> Option<&Value> {
    list_result.as_array().and_then(|rows| rows.first())
}

/// Render a remote ID value (number or string) without JSON quoting.
pub(crate) fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
