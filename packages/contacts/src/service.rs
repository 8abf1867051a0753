use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info};

use bridge24_crm::CrmClient;

use crate::{
    error::{ContactError, ContactResult},
    payloads,
    saga::Saga,
    types::{
        first_by_remote_order, id_string, ContactInput, CreatedContact, DeletedContact,
        UpdatedContact,
    },
};

/// Composition service sequencing contact + requisite + address + bank
/// detail operations against the remote CRM.
#[derive(Clone)]
pub struct ContactService {
    client: CrmClient,
}

impl ContactService {
    pub fn new(client: CrmClient) -> Self {
        Self { client }
    }

    /// Create a full contact. Four sequential steps, each consuming the ID
    /// produced by the previous one. No step registers a compensation: a
    /// mid-sequence failure leaves the already-created entities in place.
    pub async fn create(&self, input: &ContactInput, domain: &str) -> ContactResult<CreatedContact> {
        input.validate()?;

        let mut saga = Saga::new();

        let contact_id = saga
            .step("crm.contact.add", None, async {
                self.client
                    .call("crm.contact.add", payloads::create_contact(input), domain)
                    .await
            })
            .await?;

        let requisite_id = saga
            .step("crm.requisite.add", None, async {
                self.client
                    .call(
                        "crm.requisite.add",
                        payloads::create_requisite(&contact_id, input),
                        domain,
                    )
                    .await
            })
            .await?;

        let address_id = saga
            .step("crm.address.add", None, async {
                self.client
                    .call(
                        "crm.address.add",
                        payloads::upsert_address(&requisite_id, input),
                        domain,
                    )
                    .await
            })
            .await?;

        let bank_detail_id = saga
            .step("crm.requisite.bankdetail.add", None, async {
                self.client
                    .call(
                        "crm.requisite.bankdetail.add",
                        payloads::create_bank_detail(&requisite_id, input),
                        domain,
                    )
                    .await
            })
            .await?;

        info!(
            "Created contact {} with requisite {}",
            id_string(&contact_id),
            id_string(&requisite_id)
        );

        Ok(CreatedContact {
            contact_id,
            requisite_id,
            address_id,
            bank_detail_id,
        })
    }

    /// Update a full contact. The linked sub-entities must already exist:
    /// a contact missing its requisite, address, or bank detail must be
    /// recreated, never patched here.
    pub async fn update(
        &self,
        contact_id: &str,
        input: &ContactInput,
        domain: &str,
    ) -> ContactResult<UpdatedContact> {
        input.validate()?;

        self.verify_contact_exists(contact_id, domain).await?;

        self.client
            .call(
                "crm.contact.update",
                payloads::update_contact(contact_id, input),
                domain,
            )
            .await?;

        let requisites = self
            .client
            .call(
                "crm.requisite.list",
                payloads::requisite_filter(&contact_id),
                domain,
            )
            .await?;
        let requisite = first_by_remote_order(&requisites)
            .ok_or_else(|| ContactError::RequisiteNotFound(contact_id.to_string()))?;
        let requisite_id = requisite["ID"].clone();

        let addresses = self
            .client
            .call(
                "crm.address.list",
                payloads::address_filter(&requisite_id),
                domain,
            )
            .await?;
        if first_by_remote_order(&addresses).is_none() {
            return Err(ContactError::AddressNotFound(id_string(&requisite_id)));
        }
        self.client
            .call(
                "crm.address.update",
                payloads::upsert_address(&requisite_id, input),
                domain,
            )
            .await?;

        let bank_details = self
            .client
            .call(
                "crm.requisite.bankdetail.list",
                payloads::bank_detail_filter(&requisite_id),
                domain,
            )
            .await?;
        let bank_detail = first_by_remote_order(&bank_details)
            .ok_or_else(|| ContactError::BankDetailNotFound(id_string(&requisite_id)))?;
        let bank_detail_id = bank_detail["ID"].clone();
        self.client
            .call(
                "crm.requisite.bankdetail.update",
                payloads::update_bank_detail(&bank_detail_id, &requisite_id, input),
                domain,
            )
            .await?;

        info!("Updated contact {}", contact_id);

        Ok(UpdatedContact {
            contact_id: contact_id.to_string(),
            requisite_id,
            bank_detail_id,
        })
    }

    /// Delete a full contact, children strictly before parents: per
    /// requisite all bank details, then all addresses, then the requisite
    /// itself, and finally the contact.
    pub async fn delete(&self, contact_id: &str, domain: &str) -> ContactResult<DeletedContact> {
        self.verify_contact_exists(contact_id, domain).await?;

        let requisites = self
            .client
            .call(
                "crm.requisite.list",
                payloads::requisite_filter(&contact_id),
                domain,
            )
            .await?;

        for requisite in requisites.as_array().into_iter().flatten() {
            let requisite_id = &requisite["ID"];

            let bank_details = self
                .client
                .call(
                    "crm.requisite.bankdetail.list",
                    payloads::bank_detail_filter(requisite_id),
                    domain,
                )
                .await?;
            for bank_detail in bank_details.as_array().into_iter().flatten() {
                self.client
                    .call(
                        "crm.requisite.bankdetail.delete",
                        payloads::by_id(&bank_detail["ID"]),
                        domain,
                    )
                    .await?;
            }

            let addresses = self
                .client
                .call("crm.address.list", payloads::address_filter(requisite_id), domain)
                .await?;
            for address in addresses.as_array().into_iter().flatten() {
                self.client
                    .call("crm.address.delete", payloads::by_id(&address["ID"]), domain)
                    .await?;
            }

            self.client
                .call("crm.requisite.delete", payloads::by_id(requisite_id), domain)
                .await?;
        }

        self.client
            .call("crm.contact.delete", payloads::by_id(&contact_id), domain)
            .await?;

        info!("Deleted contact {}", contact_id);

        Ok(DeletedContact {
            contact_id: contact_id.to_string(),
        })
    }

    /// List every remote contact, enriched with its first requisite's
    /// first address and bank detail. Enrichment fans out concurrently per
    /// contact; a contact whose enrichment fails comes back raw rather
    /// than failing the list.
    pub async fn list(&self, domain: &str) -> ContactResult<Vec<Value>> {
        let contacts = self
            .client
            .call("crm.contact.list", payloads::list_contacts(), domain)
            .await?;

        let contacts = match contacts {
            Value::Array(rows) => rows,
            other => {
                error!("Unexpected crm.contact.list result shape: {}", other);
                return Ok(Vec::new());
            }
        };

        let enriched = join_all(
            contacts
                .into_iter()
                .map(|contact| self.enrich_or_raw(contact, domain)),
        )
        .await;

        Ok(enriched)
    }

    async fn enrich_or_raw(&self, contact: Value, domain: &str) -> Value {
        match self.enrich(&contact, domain).await {
            Ok(enriched) => enriched,
            Err(e) => {
                error!(
                    "Failed to enrich contact {}: {}",
                    id_string(&contact["ID"]),
                    e
                );
                contact
            }
        }
    }

    async fn enrich(&self, contact: &Value, domain: &str) -> ContactResult<Value> {
        let contact_id = &contact["ID"];

        let requisites = self
            .client
            .call(
                "crm.requisite.list",
                payloads::requisite_filter(contact_id),
                domain,
            )
            .await?;

        let Some(requisite) = first_by_remote_order(&requisites) else {
            // Contacts without business info still appear in the listing.
            debug!("Contact {} has no requisite", id_string(contact_id));
            return Ok(enhance_contact(contact.clone(), None, None));
        };
        let requisite_id = &requisite["ID"];

        let (addresses, bank_details) = futures::try_join!(
            self.client.call(
                "crm.address.list",
                payloads::address_filter(requisite_id),
                domain,
            ),
            self.client.call(
                "crm.requisite.bankdetail.list",
                payloads::bank_detail_filter(requisite_id),
                domain,
            ),
        )?;

        Ok(enhance_contact(
            contact.clone(),
            first_by_remote_order(&addresses).cloned(),
            first_by_remote_order(&bank_details).cloned(),
        ))
    }

    async fn verify_contact_exists(&self, contact_id: &str, domain: &str) -> ContactResult<()> {
        self.client
            .call("crm.contact.get", payloads::by_id(&contact_id), domain)
            .await
            .map_err(|_| ContactError::ContactNotFound(contact_id.to_string()))?;
        Ok(())
    }
}

/// Merge the first address and bank detail into the raw contact object.
/// Missing pieces become explicit nulls so every contact carries the same
/// field set.
fn enhance_contact(contact: Value, address: Option<Value>, bank_detail: Option<Value>) -> Value {
    let mut merged = match contact {
        Value::Object(map) => map,
        other => return other,
    };

    merged.insert("ADDRESS".to_string(), address.unwrap_or(Value::Null));
    let (bank_name, bank_account) = match &bank_detail {
        Some(detail) => (detail["RQ_BANK_NAME"].clone(), detail["RQ_ACC_NUM"].clone()),
        None => (Value::Null, Value::Null),
    };
    merged.insert("BANK_NAME".to_string(), bank_name);
    merged.insert("BANK_ACCOUNT".to_string(), bank_account);

    Value::Object(merged)
}
