//! Integration tests for `MgmtClient` against a wiremock management API.

use apimigrate_client::auth::{Auth, Credentials};
use apimigrate_client::client::{BundleCollection, MgmtClient};
use apimigrate_client::error::ClientError;
use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> MgmtClient {
    let auth = Auth::new(Credentials::Basic {
        username: "admin@example.com".into(),
        password: "test-password".into(),
    });
    MgmtClient::with_http_client(server.uri(), "acme", auth, reqwest::Client::new())
}

#[tokio::test]
async fn verify_connection_succeeds_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/organizations/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "acme"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.verify_connection().await.unwrap();
}

#[tokio::test]
async fn verify_connection_maps_401_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/organizations/acme"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.verify_connection().await.unwrap_err();
    assert!(matches!(error, ClientError::Auth(_)), "got {error:?}");
}

#[tokio::test]
async fn listing_exhausts_pagination() {
    let server = MockServer::start().await;

    let first_page: Vec<String> = (0..100).map(|i| format!("product-{i:03}")).collect();
    // Continuation repeats the boundary element, then 50 fresh names.
    let mut second_page = vec!["product-099".to_string()];
    second_page.extend((100..150).map(|i| format!("product-{i:03}")));

    Mock::given(method("GET"))
        .and(path("/v1/organizations/acme/apiproducts"))
        .and(query_param_is_missing("startKey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&first_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/organizations/acme/apiproducts"))
        .and(query_param("startKey", "product-099"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&second_page))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let names = client.list_products().await.unwrap();
    assert_eq!(names.len(), 150);
    assert_eq!(names.first().map(String::as_str), Some("product-000"));
    assert_eq!(names.last().map(String::as_str), Some("product-149"));
    // No duplicate at the page boundary.
    assert_eq!(
        names.iter().filter(|n| n.as_str() == "product-099").count(),
        1
    );
}

#[tokio::test]
async fn get_product_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/organizations/acme/apiproducts/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.get_product("ghost").await.unwrap_err();
    assert!(error.is_not_found(), "got {error:?}");
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/organizations/acme/apiproducts/slow"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.get_product("slow").await.unwrap_err() {
        ClientError::RateLimited { retry_after_secs } => {
            assert_eq!(retry_after_secs, Some(7));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn export_bundle_returns_raw_bytes() {
    let server = MockServer::start().await;
    let zip_bytes = b"PK\x03\x04fake-bundle".to_vec();
    Mock::given(method("GET"))
        .and(path("/v1/organizations/acme/apis/orders/revisions/3"))
        .and(query_param("format", "bundle"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes.clone()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let bytes = client
        .export_bundle(BundleCollection::Proxies, "orders", "3")
        .await
        .unwrap();
    assert_eq!(bytes, zip_bytes);
}

#[tokio::test]
async fn import_bundle_posts_octet_stream_and_parses_revision() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/organizations/acme/sharedflows"))
        .and(query_param("action", "import"))
        .and(query_param("name", "audit-log"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "audit-log",
            "revision": "1"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let imported = client
        .import_bundle(BundleCollection::SharedFlows, "audit-log", b"PK".to_vec())
        .await
        .unwrap();
    assert_eq!(imported.revision.as_deref(), Some("1"));
}

#[tokio::test]
async fn import_alias_sends_cert_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/v1/organizations/acme/environments/test/keystores/gateway/aliases",
        ))
        .and(body_partial_json(serde_json::json!({
            "alias": "a1",
            "cert": "-----BEGIN CERTIFICATE-----",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"alias": "a1"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .import_alias("test", "gateway", "a1", "-----BEGIN CERTIFICATE-----", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn export_cert_returns_pem_text() {
    let server = MockServer::start().await;
    let pem = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
    Mock::given(method("GET"))
        .and(path(
            "/v1/organizations/acme/environments/test/keystores/gateway/certs/c1/export",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(pem))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let body = client.export_cert("test", "gateway", "c1").await.unwrap();
    assert_eq!(body, pem);
}

#[tokio::test]
async fn deploy_hits_environment_scoped_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/v1/organizations/acme/environments/test/apis/orders/revisions/3/deployments",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .deploy(BundleCollection::Proxies, "orders", "test", "3")
        .await
        .unwrap();
}
