//! Request payload builders for the Bitrix24 CRM methods the composition
//! service sequences. Field sets follow the CRM's REST conventions:
//! multi-value channels are `[{VALUE, VALUE_TYPE}]` lists, links are
//! `ENTITY_ID` plus an `ENTITY_TYPE_ID` discriminator.

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::{
    ContactInput, ADDRESS_TYPE_PRIMARY, DEFAULT_COUNTRY, ENTITY_TYPE_CONTACT,
    ENTITY_TYPE_REQUISITE, REQUISITE_PRESET_ID,
};

fn contact_fields(input: &ContactInput) -> Value {
    json!({
        "NAME": input.name,
        "LAST_NAME": input.last_name,
        "PHONE": [{ "VALUE": input.phone, "VALUE_TYPE": "WORK" }],
        "EMAIL": [{ "VALUE": input.email, "VALUE_TYPE": "WORK" }],
        "WEB": [{ "VALUE": input.website, "VALUE_TYPE": "WORK" }]
    })
}

pub fn create_contact(input: &ContactInput) -> Value {
    json!({
        "fields": contact_fields(input),
        "params": { "REGISTER_SONET_EVENT": "Y" }
    })
}

pub fn update_contact(contact_id: &str, input: &ContactInput) -> Value {
    json!({
        "id": contact_id,
        "fields": contact_fields(input),
        "params": { "REGISTER_SONET_EVENT": "Y" }
    })
}

pub fn create_requisite<I: Serialize>(contact_id: &I, input: &ContactInput) -> Value {
    json!({
        "fields": {
            "ENTITY_TYPE_ID": ENTITY_TYPE_CONTACT,
            "ENTITY_ID": contact_id,
            "PRESET_ID": REQUISITE_PRESET_ID,
            "NAME": format!("{} - Business Info", input.full_name()),
            "COUNTRY": DEFAULT_COUNTRY
        }
    })
}

/// Address payload for both add and update: the CRM addresses the row by
/// its `(TYPE_ID, ENTITY_TYPE_ID, ENTITY_ID)` tuple, not by an id field.
pub fn upsert_address<I: Serialize>(requisite_id: &I, input: &ContactInput) -> Value {
    json!({
        "fields": {
            "TYPE_ID": ADDRESS_TYPE_PRIMARY,
            "ENTITY_TYPE_ID": ENTITY_TYPE_REQUISITE,
            "ENTITY_ID": requisite_id,
            "COUNTRY": DEFAULT_COUNTRY,
            "PROVINCE": input.region,
            "CITY": input.city,
            "ADDRESS_1": input.address
        }
    })
}

pub fn create_bank_detail<I: Serialize>(requisite_id: &I, input: &ContactInput) -> Value {
    json!({
        "fields": {
            "ENTITY_TYPE_ID": ENTITY_TYPE_REQUISITE,
            "ENTITY_ID": requisite_id,
            "COUNTRY": DEFAULT_COUNTRY,
            "NAME": format!("{} - Primary Account", input.bank_name.as_deref().unwrap_or_default()),
            "RQ_BANK_NAME": input.bank_name,
            "RQ_ACC_NAME": input.full_name(),
            "RQ_ACC_NUM": input.bank_account
        }
    })
}

pub fn update_bank_detail<I: Serialize>(
    bank_detail_id: &I,
    requisite_id: &I,
    input: &ContactInput,
) -> Value {
    json!({
        "id": bank_detail_id,
        "fields": {
            "ENTITY_ID": requisite_id,
            "NAME": format!("{} - Primary Account", input.bank_name.as_deref().unwrap_or_default()),
            "RQ_BANK_NAME": input.bank_name,
            "RQ_ACC_NAME": input.full_name(),
            "RQ_ACC_NUM": input.bank_account
        }
    })
}

pub fn requisite_filter<I: Serialize>(contact_id: &I) -> Value {
    json!({
        "filter": { "ENTITY_ID": contact_id, "ENTITY_TYPE_ID": ENTITY_TYPE_CONTACT }
    })
}

pub fn address_filter<I: Serialize>(requisite_id: &I) -> Value {
    json!({
        "filter": { "ENTITY_ID": requisite_id, "ENTITY_TYPE_ID": ENTITY_TYPE_REQUISITE }
    })
}

pub fn bank_detail_filter<I: Serialize>(requisite_id: &I) -> Value {
    json!({
        "filter": { "ENTITY_ID": requisite_id }
    })
}

pub fn list_contacts() -> Value {
    json!({
        "select": ["*", "PHONE", "EMAIL", "WEB"]
    })
}

pub fn by_id<I: Serialize>(id: &I) -> Value {
    json!({ "id": id })
}
