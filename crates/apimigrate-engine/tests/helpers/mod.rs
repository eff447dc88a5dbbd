//! Shared fixtures for engine integration tests: a wiremock management API
//! plus a tempdir-backed artifact store.

#![allow(dead_code)]

use apimigrate_client::auth::{Auth, Credentials};
use apimigrate_client::{MgmtClient, RetryPolicy};
use apimigrate_engine::{ArtifactStore, MigrateContext, Summary};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a context wired to the mock server and a staging root.
pub fn context(server: &MockServer, root: &Path, env: Option<&str>, trial: bool) -> MigrateContext {
    let auth = Auth::new(Credentials::Bearer {
        token: "test-token".into(),
    });
    let client = MgmtClient::with_http_client(server.uri(), "acme", auth, reqwest::Client::new());
    MigrateContext {
        client,
        store: ArtifactStore::new(root, trial),
        summary: Summary::new(),
        retry: RetryPolicy::new(3, 1),
        env: env.map(str::to_string),
        trial,
        concurrency: 4,
    }
}

/// Mount a GET returning a JSON array of names.
pub async fn mount_name_list(server: &MockServer, url_path: &str, names: &[&str]) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(names))
        .mount(server)
        .await;
}

/// Mount a GET returning a JSON body.
pub async fn mount_json(server: &MockServer, url_path: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Stage a JSON artifact directly on disk.
pub fn stage_json(root: &Path, dir: &str, filename: &str, body: &serde_json::Value) {
    let dir = root.join(dir);
    std::fs::create_dir_all(&dir).expect("create staging dir");
    std::fs::write(
        dir.join(filename),
        serde_json::to_vec_pretty(body).expect("serialize"),
    )
    .expect("write staged artifact");
}

/// Stage a raw artifact directly on disk.
pub fn stage_raw(root: &Path, dir: &str, filename: &str, bytes: &[u8]) {
    let dir = root.join(dir);
    std::fs::create_dir_all(&dir).expect("create staging dir");
    std::fs::write(dir.join(filename), bytes).expect("write staged artifact");
}
