// ABOUTME: Integration tests for the contact composition service
// ABOUTME: Drives create/update/delete/list sequencing against a mock Bitrix24

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bridge24_auth::{OAuthConfig, TokenManager, TokenRecord, TokenStore};
use bridge24_contacts::{ContactError, ContactInput, ContactService};
use bridge24_crm::CrmClient;

const DOMAIN: &str = "example.bitrix24.com";

/// Service wired to a mock CRM through a fresh seeded token.
async fn setup_service(server: &MockServer) -> (ContactService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = TokenStore::new(temp_dir.path().join("tokens.json"));
    store
        .put(
            DOMAIN,
            TokenRecord {
                access_token: "access".to_string(),
                refresh_token: Some("refresh".to_string()),
                domain: DOMAIN.to_string(),
                expires_in: Some(3600),
                saved_at: None,
                client_endpoint: format!("{}/rest/", server.uri()),
                member_id: None,
                application_token: None,
                scope: None,
                status: None,
            },
        )
        .await
        .unwrap();

    let config = OAuthConfig::new(
        "client-id".to_string(),
        "client-secret".to_string(),
        "https://localhost/auth/callback".to_string(),
    );
    let manager = Arc::new(TokenManager::new(store, config));
    let service = ContactService::new(CrmClient::new(manager).unwrap());
    (service, temp_dir)
}

fn full_input() -> ContactInput {
    ContactInput {
        name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        phone: Some("+84123456789".to_string()),
        email: Some("jane@example.com".to_string()),
        website: Some("https://example.com".to_string()),
        address: Some("1 Main St".to_string()),
        city: Some("Hanoi".to_string()),
        region: Some("Hanoi".to_string()),
        bank_name: Some("VCB".to_string()),
        bank_account: Some("0123456789".to_string()),
    }
}

fn result_response(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": result }))
}

/// CRM method names extracted from the mock server's request log, in
/// arrival order.
async fn called_methods(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| {
            req.url
                .path()
                .trim_start_matches("/rest/")
                .trim_end_matches(".json")
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_create_sequences_four_adds_feeding_ids_forward() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.add.json"))
        .respond_with(result_response(json!(101)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.add.json"))
        .respond_with(result_response(json!(201)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.add.json"))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.add.json"))
        .respond_with(result_response(json!(301)))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let created = service.create(&full_input(), DOMAIN).await.unwrap();

    assert_eq!(created.contact_id, json!(101));
    assert_eq!(created.requisite_id, json!(201));
    assert_eq!(created.bank_detail_id, json!(301));

    assert_eq!(
        called_methods(&server).await,
        vec![
            "crm.contact.add",
            "crm.requisite.add",
            "crm.address.add",
            "crm.requisite.bankdetail.add",
        ]
    );

    // Each step consumed the previous step's ID as its link field.
    let requests = server.received_requests().await.unwrap();
    let requisite_body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(requisite_body["fields"]["ENTITY_ID"], json!(101));
    let address_body: Value = serde_json::from_slice(&requests[2].body).unwrap();
    assert_eq!(address_body["fields"]["ENTITY_ID"], json!(201));
    let bank_body: Value = serde_json::from_slice(&requests[3].body).unwrap();
    assert_eq!(bank_body["fields"]["ENTITY_ID"], json!(201));
}

#[tokio::test]
async fn test_create_validates_before_any_remote_call() {
    let server = MockServer::start().await;
    let (service, _temp_dir) = setup_service(&server).await;

    let result = service
        .create(&ContactInput::default(), DOMAIN)
        .await;

    match result {
        Err(ContactError::Validation { missing }) => {
            assert_eq!(missing.len(), 9);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_aborts_without_rolling_back_completed_steps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.add.json"))
        .respond_with(result_response(json!(101)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.add.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ERROR_CORE",
            "error_description": "Preset not found"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.add.json"))
        .respond_with(result_response(json!(true)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.add.json"))
        .respond_with(result_response(json!(301)))
        .expect(0)
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let result = service.create(&full_input(), DOMAIN).await;

    assert!(matches!(result, Err(ContactError::Crm(_))));
    // No crm.contact.delete was issued: the created contact leaks by design.
    assert_eq!(
        called_methods(&server).await,
        vec!["crm.contact.add", "crm.requisite.add"]
    );
}

#[tokio::test]
async fn test_update_fails_on_missing_requisite_before_sub_entity_updates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.get.json"))
        .respond_with(result_response(json!({ "ID": "55" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.update.json"))
        .respond_with(result_response(json!(true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .respond_with(result_response(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.update.json"))
        .respond_with(result_response(json!(true)))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.update.json"))
        .respond_with(result_response(json!(true)))
        .expect(0)
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let result = service.update("55", &full_input(), DOMAIN).await;

    assert!(matches!(result, Err(ContactError::RequisiteNotFound(_))));
}

#[tokio::test]
async fn test_update_missing_contact_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.get.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ERROR_NOT_FOUND",
            "error_description": "Not found"
        })))
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let result = service.update("404", &full_input(), DOMAIN).await;

    match result {
        Err(ContactError::ContactNotFound(id)) => assert_eq!(id, "404"),
        other => panic!("expected ContactNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_walks_requisite_address_and_bank_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.get.json"))
        .respond_with(result_response(json!({ "ID": "55" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.update.json"))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .respond_with(result_response(json!([{ "ID": "7" }, { "ID": "8" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.list.json"))
        .respond_with(result_response(json!([{ "TYPE_ID": 1 }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.update.json"))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.list.json"))
        .respond_with(result_response(json!([{ "ID": "31" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.update.json"))
        .and(body_json(json!({
            "id": "31",
            "fields": {
                "ENTITY_ID": "7",
                "NAME": "VCB - Primary Account",
                "RQ_BANK_NAME": "VCB",
                "RQ_ACC_NAME": "Jane Doe",
                "RQ_ACC_NUM": "0123456789"
            }
        })))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let updated = service.update("55", &full_input(), DOMAIN).await.unwrap();

    // First requisite in remote order wins, even with two present.
    assert_eq!(updated.requisite_id, json!("7"));
    assert_eq!(updated.bank_detail_id, json!("31"));
}

#[tokio::test]
async fn test_delete_removes_children_before_parents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.get.json"))
        .respond_with(result_response(json!({ "ID": "55" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .respond_with(result_response(json!([{ "ID": "7" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.list.json"))
        .respond_with(result_response(json!([{ "ID": "31" }, { "ID": "32" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.delete.json"))
        .respond_with(result_response(json!(true)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.list.json"))
        .respond_with(result_response(json!([{ "ID": "41" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.delete.json"))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.delete.json"))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.delete.json"))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    service.delete("55", DOMAIN).await.unwrap();

    assert_eq!(
        called_methods(&server).await,
        vec![
            "crm.contact.get",
            "crm.requisite.list",
            "crm.requisite.bankdetail.list",
            "crm.requisite.bankdetail.delete",
            "crm.requisite.bankdetail.delete",
            "crm.address.list",
            "crm.address.delete",
            "crm.requisite.delete",
            "crm.contact.delete",
        ]
    );
}

#[tokio::test]
async fn test_delete_contact_without_requisites_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.get.json"))
        .respond_with(result_response(json!({ "ID": "55" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .respond_with(result_response(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.delete.json"))
        .respond_with(result_response(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let deleted = service.delete("55", DOMAIN).await.unwrap();
    assert_eq!(deleted.contact_id, "55");
}

#[tokio::test]
async fn test_list_enriches_and_isolates_per_contact_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.list.json"))
        .respond_with(result_response(json!([
            { "ID": "1", "NAME": "Jane" },
            { "ID": "2", "NAME": "Broken" },
            { "ID": "3", "NAME": "Bare" }
        ])))
        .mount(&server)
        .await;
    // Contact 1: full enrichment chain.
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .and(body_json(json!({
            "filter": { "ENTITY_ID": "1", "ENTITY_TYPE_ID": 3 }
        })))
        .respond_with(result_response(json!([{ "ID": "7" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.list.json"))
        .respond_with(result_response(json!([
            { "ADDRESS_1": "1 Main St", "CITY": "Hanoi" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.list.json"))
        .respond_with(result_response(json!([
            { "ID": "31", "RQ_BANK_NAME": "VCB", "RQ_ACC_NUM": "0123456789" }
        ])))
        .mount(&server)
        .await;
    // Contact 2: requisite lookup fails outright.
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .and(body_json(json!({
            "filter": { "ENTITY_ID": "2", "ENTITY_TYPE_ID": 3 }
        })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "INTERNAL_SERVER_ERROR",
            "error_description": "upstream exploded"
        })))
        .mount(&server)
        .await;
    // Contact 3: no requisite at all.
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .and(body_json(json!({
            "filter": { "ENTITY_ID": "3", "ENTITY_TYPE_ID": 3 }
        })))
        .respond_with(result_response(json!([])))
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let contacts = service.list(DOMAIN).await.unwrap();
    assert_eq!(contacts.len(), 3);

    let jane = contacts.iter().find(|c| c["ID"] == "1").unwrap();
    assert_eq!(jane["ADDRESS"]["CITY"], "Hanoi");
    assert_eq!(jane["BANK_NAME"], "VCB");
    assert_eq!(jane["BANK_ACCOUNT"], "0123456789");

    // The failing contact comes back exactly as the remote returned it.
    let broken = contacts.iter().find(|c| c["ID"] == "2").unwrap();
    assert_eq!(*broken, json!({ "ID": "2", "NAME": "Broken" }));

    // No requisite: present with explicit nulls.
    let bare = contacts.iter().find(|c| c["ID"] == "3").unwrap();
    assert_eq!(bare["ADDRESS"], Value::Null);
    assert_eq!(bare["BANK_NAME"], Value::Null);
    assert_eq!(bare["BANK_ACCOUNT"], Value::Null);
}

#[tokio::test]
async fn test_list_with_requisite_but_no_sub_entities_returns_nulls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.contact.list.json"))
        .respond_with(result_response(json!([{ "ID": "1", "NAME": "Jane" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.list.json"))
        .respond_with(result_response(json!([{ "ID": "7" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.address.list.json"))
        .respond_with(result_response(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/crm.requisite.bankdetail.list.json"))
        .respond_with(result_response(json!([])))
        .mount(&server)
        .await;

    let (service, _temp_dir) = setup_service(&server).await;
    let contacts = service.list(DOMAIN).await.unwrap();

    assert_eq!(contacts[0]["NAME"], "Jane");
    assert_eq!(contacts[0]["ADDRESS"], Value::Null);
    assert_eq!(contacts[0]["BANK_NAME"], Value::Null);
}
