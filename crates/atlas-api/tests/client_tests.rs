//! HTTP-level tests for the organization API client.

use atlas_api::{AtlasClient, AtlasClientConfig};
use atlas_core::{
    ApiCredentials, ApiKeyDescriptor, CreateOrganizationInput, ErrorKind, OrganizationApi,
    OrganizationPatch,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> AtlasClient {
    let config = AtlasClientConfig::new().with_base_url(format!("{}/api/atlas/v1.0", server.uri()));
    AtlasClient::new(ApiCredentials::new("root-pub", "root-priv"), config).unwrap()
}

fn create_input() -> CreateOrganizationInput {
    CreateOrganizationInput {
        name: "acme".into(),
        owner_id: "user-1".into(),
        api_key: ApiKeyDescriptor::new("acme key", ["ORG_OWNER"]),
    }
}

#[tokio::test]
async fn test_create_sends_payload_and_returns_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/atlas/v1.0/orgs"))
        .and(body_partial_json(json!({
            "name": "acme",
            "orgOwnerId": "user-1",
            "apiKey": {"desc": "acme key", "roles": ["ORG_OWNER"]}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "apiKey": {"id": "k-1", "publicKey": "pub-1", "privateKey": "priv-1"},
            "organization": {"id": "org-42", "name": "acme", "isDeleted": false}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client_for(&server).create(&create_input()).await.unwrap();
    assert_eq!(created.organization.id, "org-42");
    assert_eq!(created.organization.owner_id, "user-1");
    assert_eq!(created.api_key, ApiCredentials::new("pub-1", "priv-1"));
}

#[tokio::test]
async fn test_get_maps_soft_deleted_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atlas/v1.0/orgs/org-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "org-42", "name": "acme", "isDeleted": true
        })))
        .mount(&server)
        .await;

    let org = client_for(&server).get("org-42").await.unwrap();
    assert!(org.is_deleted);
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let cases = [
        (404, ErrorKind::NotFound),
        (409, ErrorKind::Conflict),
        (429, ErrorKind::RateLimited),
        (400, ErrorKind::ClientError),
        (503, ErrorKind::ServerError),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/atlas/v1.0/orgs/org-42"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": status,
                "detail": "something happened",
                "reason": "Reason"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get("org-42").await.unwrap_err();
        assert_eq!(err.kind(), expected, "status {status}");
    }
}

#[tokio::test]
async fn test_unparsable_error_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atlas/v1.0/orgs/a"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/atlas/v1.0/orgs/b"))
        .respond_with(ResponseTemplate::new(418).set_body_string("teapot"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.get("a").await.unwrap_err().kind(), ErrorKind::ServerError);
    assert_eq!(client.get("b").await.unwrap_err().kind(), ErrorKind::Unclassified);
}

#[tokio::test]
async fn test_undecodable_success_body_is_unclassified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atlas/v1.0/orgs/org-42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).get("org-42").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unclassified);
}

#[tokio::test]
async fn test_delete_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/atlas/v1.0/orgs/org-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/atlas/v1.0/orgs/org-2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": 404, "detail": "Organization org-2 not found", "reason": "Not Found"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete("org-1").await.unwrap();
    assert!(client.delete("org-2").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_sends_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/atlas/v1.0/orgs/org-42"))
        .and(body_partial_json(json!({"name": "acme-renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "org-42", "name": "acme-renamed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let patch = OrganizationPatch {
        name: Some("acme-renamed".into()),
    };
    let org = client_for(&server).update("org-42", &patch).await.unwrap();
    assert_eq!(org.name, "acme-renamed");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({"name": "acme-renamed"}));
}

#[tokio::test]
async fn test_empty_patch_reads_instead_of_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atlas/v1.0/orgs/org-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "org-42", "name": "acme"})))
        .expect(1)
        .mount(&server)
        .await;

    let org = client_for(&server)
        .update("org-42", &OrganizationPatch::default())
        .await
        .unwrap();
    assert_eq!(org.name, "acme");
}

#[tokio::test]
async fn test_answers_digest_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atlas/v1.0/orgs/org-42"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "org-42", "name": "acme"})))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/atlas/v1.0/orgs/org-42"))
        .respond_with(ResponseTemplate::new(401).insert_header(
            "WWW-Authenticate",
            r#"Digest realm="MMS Public API", domain="", nonce="abc123", algorithm=MD5, qop="auth", stale=false"#,
        ))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let org = client_for(&server).get("org-42").await.unwrap();
    assert_eq!(org.id, "org-42");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let authorization = requests[1].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(authorization.starts_with(r#"Digest username="root-pub""#));
    assert!(authorization.contains(r#"uri="/api/atlas/v1.0/orgs/org-42""#));
    assert!(!authorization.contains("root-priv"));
}

#[tokio::test]
async fn test_rejected_credentials_are_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("WWW-Authenticate", r#"Digest realm="r", nonce="n", qop="auth""#)
                .set_body_json(json!({"error": 401, "detail": "bad key", "reason": "Unauthorized"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).get("org-42").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClientError);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let config = AtlasClientConfig::new().with_base_url("http://127.0.0.1:1/api");
    let client = AtlasClient::new(ApiCredentials::new("a", "b"), config).unwrap();

    let err = client.get("org-42").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_validation_happens_before_any_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let mut input = create_input();
    input.owner_id = String::new();
    assert_eq!(
        client.create(&input).await.unwrap_err().kind(),
        ErrorKind::ConfigurationInvalid
    );

    let mut input = create_input();
    input.name = "  ".into();
    assert_eq!(
        client.create(&input).await.unwrap_err().kind(),
        ErrorKind::ConfigurationInvalid
    );

    assert_eq!(client.get("").await.unwrap_err().kind(), ErrorKind::ConfigurationInvalid);
    assert_eq!(client.delete("").await.unwrap_err().kind(), ErrorKind::ConfigurationInvalid);

    assert!(server.received_requests().await.unwrap().is_empty());
}
