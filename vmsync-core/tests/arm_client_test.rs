//! Integration tests for the Resource Manager client against a mock
//! control plane.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use vmsync_core::logging::LogContext;
use vmsync_core::record::{PowerStatus, Provenance, ServerRecord};
use vmsync_core::source::arm::{ArmComputeClient, SubscriptionClients};
use vmsync_core::source::client::ComputeClient;
use vmsync_core::source::connector::SourceConnector;
use vmsync_core::source::credential::{AmbientCredential, ClientSecretCredential, TokenCredential};
use vmsync_core::InventoryError;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VMS: &str = "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Compute/virtualMachines";

fn client(server: &MockServer) -> ArmComputeClient {
    ArmComputeClient::new(
        &server.uri(),
        "sub-1",
        Arc::new(AmbientCredential::new(Some("tok".to_string()))),
        reqwest::Client::new(),
    )
}

fn vm_json(name: &str) -> serde_json::Value {
    json!({
        "id": format!("{}/{}", VMS, name),
        "name": name,
        "location": "westeurope",
        "tags": {"Environment": "qa", "Owner": "ops"},
        "properties": {
            "vmId": format!("id-{}", name),
            "provisioningState": "Succeeded",
            "hardwareProfile": {"vmSize": "Standard_B2s"},
            "storageProfile": {"osDisk": {"osType": "Linux"}}
        }
    })
}

#[tokio::test]
async fn test_resource_groups_follow_next_link() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourcegroups"))
        .and(query_param("api-version", "2021-04-01"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "rg-a"}],
            "nextLink": format!("{}/page-2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "rg-b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let groups = client(&server).list_resource_groups().await.unwrap();
    assert_eq!(groups, vec!["rg-a", "rg-b"]);
}

#[tokio::test]
async fn test_unauthorized_is_credential_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourcegroups"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "InvalidAuthenticationToken", "message": "expired"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_resource_groups().await.unwrap_err();
    assert!(err.is_systemic());
    match err {
        InventoryError::Credential(message) => assert!(message.contains("InvalidAuthenticationToken")),
        other => panic!("expected credential error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_contained_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(VMS))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client(&server).list_instances("rg-a").await.unwrap_err();
    assert!(!err.is_systemic());
    assert!(matches!(err, InventoryError::Api { status: 503, .. }));
}

#[tokio::test]
async fn test_missing_detail_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/gone", VMS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let detail = client(&server).get_instance("rg-a", "gone").await.unwrap();
    assert!(detail.is_none());
}

#[tokio::test]
async fn test_instance_view_statuses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/web01/instanceView", VMS)))
        .and(query_param("api-version", "2023-03-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [
                {"code": "ProvisioningState/succeeded"},
                {"code": "PowerState/running", "displayStatus": "VM running"}
            ]
        })))
        .mount(&server)
        .await;

    let view = client(&server).get_instance_view("rg-a", "web01").await.unwrap();
    let statuses = view.statuses.unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[1].code.as_deref(), Some("PowerState/running"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_systemic() {
    let client = ArmComputeClient::new(
        "http://127.0.0.1:1",
        "sub-1",
        Arc::new(AmbientCredential::new(Some("tok".to_string()))),
        reqwest::Client::new(),
    );

    let err = client.list_resource_groups().await.unwrap_err();
    assert!(matches!(err, InventoryError::Unreachable(_)));
}

#[tokio::test]
async fn test_client_secret_token_is_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = ClientSecretCredential::new(
        &server.uri(),
        "tenant-1",
        "app-1",
        "secret",
        reqwest::Client::new(),
    );

    assert_eq!(credential.bearer_token().await.unwrap(), "issued");
    assert_eq!(credential.bearer_token().await.unwrap(), "issued");
}

#[tokio::test]
async fn test_rejected_token_request_is_credential_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let credential = ClientSecretCredential::new(
        &server.uri(),
        "tenant-1",
        "app-1",
        "wrong",
        reqwest::Client::new(),
    );

    let err = credential.bearer_token().await.unwrap_err();
    assert!(matches!(err, InventoryError::Credential(_)));
}

#[tokio::test]
async fn test_connector_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourcegroups"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"value": [{"name": "rg-a"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(VMS))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"value": [vm_json("web01"), vm_json("web02")]})),
        )
        .mount(&server)
        .await;
    for name in ["web01", "web02"] {
        Mock::given(method("GET"))
            .and(path(format!("{}/{}", VMS, name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(vm_json(name)))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(format!("{}/web01/instanceView", VMS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [{"code": "PowerState/running"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/web02/instanceView", VMS)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let connector = SourceConnector::new(
        SubscriptionClients::new().with("sub-1", Arc::new(client(&server))),
    );
    let ctx = LogContext::new("it-run");
    let mut records: Vec<ServerRecord> = connector.fetch_records(&ctx).await.unwrap();
    records.sort_by(|a, b| a.computer_name.cmp(&b.computer_name));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].computer_name, "web01");
    assert_eq!(records[0].power_status, PowerStatus::Active);
    assert_eq!(records[0].environment, "QA");
    assert_eq!(records[0].owner, "ops");
    assert_eq!(records[0].resource_group, "rg-a");
    assert_eq!(records[0].os_type, "Linux");
    assert_eq!(records[1].power_status, PowerStatus::Unknown);
    assert_eq!(records[1].raw_power_state, "unknown");
    assert!(records.iter().all(|r| r.provenance != Some(Provenance::Matched)));
}

async fn mount_group(server: &MockServer, subscription: &str, names: &[&str]) {
    let vms = format!(
        "/subscriptions/{}/resourceGroups/rg-a/providers/Microsoft.Compute/virtualMachines",
        subscription
    );
    Mock::given(method("GET"))
        .and(path(format!("/subscriptions/{}/resourcegroups", subscription)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"value": [{"name": "rg-a"}]})),
        )
        .mount(server)
        .await;
    let listed: Vec<_> = names.iter().map(|n| vm_json(n)).collect();
    Mock::given(method("GET"))
        .and(path(vms.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": listed })))
        .mount(server)
        .await;
    for name in names {
        Mock::given(method("GET"))
            .and(path(format!("{}/{}", vms, name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(vm_json(name)))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_detail_timeout_drops_only_that_instance() {
    let server = MockServer::start().await;
    mount_group(&server, "sub-1", &["ok1", "ok2"]).await;

    Mock::given(method("GET"))
        .and(path(VMS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [vm_json("ok1"), vm_json("slow"), vm_json("ok2")]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/slow", VMS)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vm_json("slow"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let client = ArmComputeClient::new(
        &server.uri(),
        "sub-1",
        Arc::new(AmbientCredential::new(Some("tok".to_string()))),
        http,
    );
    let connector = SourceConnector::new(SubscriptionClients::new().with("sub-1", Arc::new(client)));

    let report = connector.fetch_all(&LogContext::new("it-run")).await.unwrap();
    let names: Vec<&str> = report
        .instances
        .iter()
        .map(|f| f.instance.name.as_str())
        .collect();
    assert_eq!(names, vec!["ok1", "ok2"]);
    assert_eq!(report.summary.instances_dropped, 1);
}

#[tokio::test]
async fn test_forbidden_subscription_does_not_hide_others() {
    let server = MockServer::start().await;
    mount_group(&server, "sub-a", &["vm-a"]).await;
    mount_group(&server, "sub-c", &["vm-c"]).await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-b/resourcegroups"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "AuthorizationFailed", "message": "no Reader role"}
        })))
        .mount(&server)
        .await;

    let credential: Arc<dyn TokenCredential> =
        Arc::new(AmbientCredential::new(Some("tok".to_string())));
    let mut clients = SubscriptionClients::new();
    for subscription in ["sub-a", "sub-b", "sub-c"] {
        let client = ArmComputeClient::new(
            &server.uri(),
            subscription,
            credential.clone(),
            reqwest::Client::new(),
        );
        clients.insert(subscription, Arc::new(client));
    }

    let records = SourceConnector::new(clients)
        .fetch_records(&LogContext::new("it-run"))
        .await
        .unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.computer_name.as_str()).collect();
    assert_eq!(names, vec!["vm-a", "vm-c"]);
}
