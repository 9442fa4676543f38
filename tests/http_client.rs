//! Integration tests for the HTTP management API client.
//!
//! Uses wiremock to stand in for the Authsignal management API.

#![allow(clippy::unwrap_used, clippy::panic)]

use hemmer_provider_authsignal::client::{
    ActionConfigurationInput, ApiError, Container, HttpClient, ManagementApi, Nullable, RuleInput,
    Theme, ValueListInput,
};
use hemmer_provider_authsignal::testing::ProviderTester;
use hemmer_provider_authsignal::AuthsignalProvider;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// "secret" as username, empty password.
const AUTHORIZATION: &str = "Basic c2VjcmV0Og==";

fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(&format!("{}/v1/management", server.uri()), "tenant-1", "secret").unwrap()
}

async fn configured_tester(server: &MockServer) -> ProviderTester<AuthsignalProvider> {
    let tester = ProviderTester::new(AuthsignalProvider::new("test").with_env(|_| None));
    tester
        .configure(json!({
            "host": format!("{}/v1/management", server.uri()),
            "tenant_id": "tenant-1",
            "api_secret": "secret"
        }))
        .await
        .unwrap();
    tester
}

// =============================================================================
// REQUEST SHAPE
// =============================================================================

#[tokio::test]
async fn test_create_action_configuration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/management/actions"))
        .and(header("authorization", AUTHORIZATION))
        .and(body_json(json!({
            "actionCode": "signIn",
            "defaultUserActionResult": "ALLOW"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "actionCode": "signIn",
            "tenantId": "tenant-1",
            "defaultUserActionResult": "ALLOW",
            "lastActionCreatedAt": "2024-05-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = ActionConfigurationInput {
        action_code: Nullable::Value("signIn".to_string()),
        default_user_action_result: Nullable::Value("ALLOW".to_string()),
        messaging_templates: Nullable::Unset,
    };
    let created = client(&server)
        .create_action_configuration(&input)
        .await
        .unwrap();

    assert_eq!(created.tenant_id, "tenant-1");
    assert_eq!(created.last_action_created_at, "2024-05-01T00:00:00Z");
    assert!(created.messaging_templates.is_none());
}

#[tokio::test]
async fn test_patch_rule_sends_nulls_and_omits_unset() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/management/actions/signIn/rules/rule-1"))
        .and(body_json(json!({
            "isActive": false,
            "priority": 0,
            "description": null,
            "verificationMethods": ["SMS"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ruleId": "rule-1",
            "isActive": false,
            "priority": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = RuleInput {
        is_active: Nullable::Value(false),
        priority: Nullable::Value(0),
        description: Nullable::Null,
        verification_methods: Nullable::Value(vec!["SMS".to_string()]),
        ..Default::default()
    };
    let rule = client(&server)
        .update_rule("signIn", "rule-1", &input)
        .await
        .unwrap();

    assert_eq!(rule.rule_id, "rule-1");
    assert!(!rule.is_active);
}

#[tokio::test]
async fn test_value_list_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/management/value-lists"))
        .and(body_json(json!({
            "name": "Risky ASNs",
            "isActive": true,
            "itemType": "number",
            "valueListItems": [13335.0]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Risky ASNs",
            "alias": "risky-asns",
            "itemType": "number",
            "isActive": true,
            "valueListItems": [13335]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/management/value-lists/risky-asns"))
        .and(header("authorization", AUTHORIZATION))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let input = ValueListInput {
        name: Nullable::Value("Risky ASNs".to_string()),
        is_active: Nullable::Value(true),
        item_type: Nullable::Value("number".to_string()),
        value_list_items: Nullable::Value(vec![json!(13335.0)]),
    };
    let list = client.create_value_list(&input).await.unwrap();
    assert_eq!(list.alias, "risky-asns");

    client.delete_value_list(&list.alias).await.unwrap();
}

#[tokio::test]
async fn test_theme_round_trip_through_patch() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/management/theme"))
        .and(body_json(json!({
            "primaryColor": null,
            "container": {"padding": 16, "position": null}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Acme",
            "primaryColor": "",
            "container": {"padding": 16, "position": ""}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let patch = Theme {
        primary_color: Nullable::Null,
        container: Nullable::Value(Container {
            padding: Nullable::Value(16),
            position: Nullable::Null,
            ..Default::default()
        }),
        ..Default::default()
    };
    let theme = client(&server).update_theme(&patch).await.unwrap();

    assert_eq!(theme.name, Nullable::Value("Acme".to_string()));
    assert_eq!(theme.container.as_value().unwrap().padding, Nullable::Value(16));
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[tokio::test]
async fn test_not_found_is_distinguishable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/management/custom-data-points/cdp-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "errorDescription": "Custom data point not found"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_custom_data_point("cdp-1")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Custom data point not found");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_errors_keep_plain_text_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/management/theme"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable\n"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/management/actions/signIn"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client(&server);

    let err = client.get_theme().await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.to_string(), "Authsignal API returned 502: upstream unavailable");

    let err = client.delete_action_configuration("signIn").await.unwrap_err();
    assert_eq!(err.to_string(), "Authsignal API returned 401: Unauthorized");
}

#[tokio::test]
async fn test_rule_with_null_fields_reads_as_null_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/management/actions/signIn/rules/rule-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ruleId": "rule-9",
            "tenantId": "tenant-1",
            "actionCode": "signIn",
            "name": "Review VPN traffic",
            "description": null,
            "isActive": true,
            "priority": 4,
            "type": "REVIEW",
            "verificationMethods": null,
            "promptToEnrollVerificationMethods": null,
            "defaultVerificationMethod": null,
            "conditions": {"==": [{"var": "ip.isVpn"}, true]}
        })))
        .mount(&server)
        .await;

    let tester = configured_tester(&server).await;
    let state = tester
        .read(
            "authsignal_rule",
            json!({"action_code": "signIn", "rule_id": "rule-9"}),
        )
        .await
        .unwrap();

    assert_eq!(state["name"], "Review VPN traffic");
    assert_eq!(state["description"], Value::Null);
    assert_eq!(state["verification_methods"], Value::Null);
    assert_eq!(state["prompt_to_enroll_verification_methods"], Value::Null);
    assert_eq!(state["default_verification_method"], Value::Null);
}

#[tokio::test]
async fn test_malformed_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/management/value-lists/blocked"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_value_list("blocked")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Json(_)));
}

// =============================================================================
// PROVIDER OVER HTTP
// =============================================================================

#[tokio::test]
async fn test_configured_provider_creates_rule_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/management/actions/withdraw/rules"))
        .and(header("authorization", AUTHORIZATION))
        .and(body_json(json!({
            "name": "Block high risk",
            "isActive": true,
            "priority": 5,
            "type": "BLOCK",
            "conditions": {"==": [{"var": "ip.isAnonymous"}, true]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ruleId": "3f0c",
            "tenantId": "tenant-1",
            "actionCode": "withdraw"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tester = configured_tester(&server).await;

    let plan = tester
        .plan_create(
            "authsignal_rule",
            json!({
                "action_code": "withdraw",
                "name": "Block high risk",
                "is_active": true,
                "priority": 5,
                "type": "BLOCK",
                "conditions": "{\"==\": [{\"var\": \"ip.isAnonymous\"}, true]}"
            }),
        )
        .await
        .unwrap();
    let state = tester
        .create("authsignal_rule", plan.planned_state)
        .await
        .unwrap();

    assert_eq!(state["rule_id"], "3f0c");
    assert_eq!(state["tenant_id"], "tenant-1");
}
