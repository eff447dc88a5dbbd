//! Management API HTTP client (reqwest-based).
//!
//! One method per remote operation the migration engine needs. Listings
//! exhaust server-side pagination before returning; response status codes
//! are translated into the [`ClientError`] taxonomy in one place.

use crate::auth::Auth;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AppRecord, BundleImportResult, BundleRecord, DeploymentStatus, KeystoreRecord, KvmRecord,
    NewCredential, ProductRecord, TargetServerRecord,
};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;

/// Page size for listing requests.
const LIST_PAGE_SIZE: usize = 100;

/// Bundle collections that share the revision/deployment API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleCollection {
    /// API proxies.
    Proxies,
    /// Shared flows.
    SharedFlows,
}

impl BundleCollection {
    /// URL path segment for this collection.
    #[must_use]
    pub fn path_segment(&self) -> &'static str {
        match self {
            BundleCollection::Proxies => "apis",
            BundleCollection::SharedFlows => "sharedflows",
        }
    }
}

/// Typed client for one organization of the management API.
#[derive(Debug, Clone)]
pub struct MgmtClient {
    /// Base URL of the management endpoint, without trailing slash.
    base_url: String,
    /// Organization all operations are scoped to.
    org: String,
    auth: Auth,
    http: Client,
}

impl MgmtClient {
    /// Create a new client.
    pub fn new(
        base_url: impl Into<String>,
        org: impl Into<String>,
        auth: Auth,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apimigrate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(base_url, org, auth, http))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(
        base_url: impl Into<String>,
        org: impl Into<String>,
        auth: Auth,
        http: Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            org: org.into(),
            auth,
            http,
        }
    }

    /// The organization this client operates on.
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/organizations/{}{}", self.base_url, self.org, path)
    }

    /// Verify connectivity and credentials by fetching the organization.
    ///
    /// A failure here is fatal for the whole run.
    pub async fn verify_connection(&self) -> ClientResult<()> {
        let _: serde_json::Value = self.get(&self.url("")).await?;
        debug!(org = %self.org, "management API connection verified");
        Ok(())
    }

    // ── Apps ──────────────────────────────────────────────────────────

    /// List all app identifiers in the organization.
    pub async fn list_apps(&self) -> ClientResult<Vec<String>> {
        self.list_names(&self.url("/apps")).await
    }

    /// Fetch one app by its platform identifier.
    pub async fn get_app(&self, app_id: &str) -> ClientResult<AppRecord> {
        self.get(&self.url(&format!("/apps/{app_id}"))).await
    }

    // ── Developers & developer apps ───────────────────────────────────

    /// List developer emails.
    pub async fn list_developers(&self) -> ClientResult<Vec<String>> {
        self.list_names(&self.url("/developers")).await
    }

    /// List app names owned by one developer.
    pub async fn list_developer_apps(&self, email: &str) -> ClientResult<Vec<String>> {
        self.list_names(&self.url(&format!("/developers/{email}/apps")))
            .await
    }

    /// Fetch one developer app.
    pub async fn get_developer_app(&self, email: &str, name: &str) -> ClientResult<AppRecord> {
        self.get(&self.url(&format!("/developers/{email}/apps/{name}")))
            .await
    }

    /// Create a developer app.
    ///
    /// The platform mints a placeholder credential on creation; the returned
    /// record includes it so callers can remove it after attaching the real
    /// credentials.
    pub async fn create_developer_app(
        &self,
        email: &str,
        app: &AppRecord,
    ) -> ClientResult<AppRecord> {
        // Credentials are attached separately; send only the app shell.
        let mut body = serde_json::Map::new();
        body.insert("name".into(), serde_json::Value::String(app.name.clone()));
        for (k, v) in &app.extra {
            body.insert(k.clone(), v.clone());
        }
        self.post(&self.url(&format!("/developers/{email}/apps")), &body)
            .await
    }

    /// Attach a credential to a developer app.
    pub async fn add_credential(
        &self,
        email: &str,
        app_name: &str,
        credential: &NewCredential,
    ) -> ClientResult<()> {
        let url = self.url(&format!("/developers/{email}/apps/{app_name}/keys/create"));
        let _: serde_json::Value = self.post(&url, credential).await?;
        Ok(())
    }

    /// Remove a credential from a developer app by consumer key.
    pub async fn delete_credential(
        &self,
        email: &str,
        app_name: &str,
        consumer_key: &str,
    ) -> ClientResult<()> {
        self.delete(&self.url(&format!(
            "/developers/{email}/apps/{app_name}/keys/{consumer_key}"
        )))
        .await
    }

    /// Delete a developer app.
    pub async fn delete_developer_app(&self, email: &str, name: &str) -> ClientResult<()> {
        self.delete(&self.url(&format!("/developers/{email}/apps/{name}")))
            .await
    }

    // ── API products ──────────────────────────────────────────────────

    /// List API product names.
    pub async fn list_products(&self) -> ClientResult<Vec<String>> {
        self.list_names(&self.url("/apiproducts")).await
    }

    /// Fetch one API product.
    pub async fn get_product(&self, name: &str) -> ClientResult<ProductRecord> {
        self.get(&self.url(&format!("/apiproducts/{name}"))).await
    }

    /// Create an API product.
    pub async fn create_product(&self, product: &ProductRecord) -> ClientResult<ProductRecord> {
        self.post(&self.url("/apiproducts"), product).await
    }

    // ── Bundles (proxies & shared flows) ──────────────────────────────

    /// List bundle names in a collection.
    pub async fn list_bundles(&self, collection: BundleCollection) -> ClientResult<Vec<String>> {
        self.list_names(&self.url(&format!("/{}", collection.path_segment())))
            .await
    }

    /// Fetch a bundle's revision inventory.
    pub async fn get_bundle(
        &self,
        collection: BundleCollection,
        name: &str,
    ) -> ClientResult<BundleRecord> {
        self.get(&self.url(&format!("/{}/{name}", collection.path_segment())))
            .await
    }

    /// Fetch the per-environment deployment state of a bundle.
    pub async fn get_deployments(
        &self,
        collection: BundleCollection,
        name: &str,
    ) -> ClientResult<DeploymentStatus> {
        self.get(&self.url(&format!(
            "/{}/{name}/deployments",
            collection.path_segment()
        )))
        .await
    }

    /// Download the binary bundle of one revision.
    pub async fn export_bundle(
        &self,
        collection: BundleCollection,
        name: &str,
        revision: &str,
    ) -> ClientResult<Vec<u8>> {
        let url = format!(
            "{}?format=bundle",
            self.url(&format!(
                "/{}/{name}/revisions/{revision}",
                collection.path_segment()
            ))
        );
        debug!(%url, "GET (bundle)");
        let response = self.auth.apply(self.http.get(&url)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            self.error_from_response(response).await
        }
    }

    /// Upload a bundle, creating a new revision.
    pub async fn import_bundle(
        &self,
        collection: BundleCollection,
        name: &str,
        bundle: Vec<u8>,
    ) -> ClientResult<BundleImportResult> {
        let url = format!(
            "{}?action=import&name={name}",
            self.url(&format!("/{}", collection.path_segment()))
        );
        debug!(%url, bytes = bundle.len(), "POST (bundle)");
        let response = self
            .auth
            .apply(self.http.post(&url))
            .header("Content-Type", "application/octet-stream")
            .body(bundle)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Deploy a revision of a bundle to an environment.
    pub async fn deploy(
        &self,
        collection: BundleCollection,
        name: &str,
        environment: &str,
        revision: &str,
    ) -> ClientResult<()> {
        let url = self.url(&format!(
            "/environments/{environment}/{}/{name}/revisions/{revision}/deployments",
            collection.path_segment()
        ));
        debug!(%url, "POST");
        let response = self.auth.apply(self.http.post(&url)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.error_from_response(response).await
        }
    }

    // ── Key-value maps ────────────────────────────────────────────────

    /// List key-value map names in an environment.
    pub async fn list_kvms(&self, environment: &str) -> ClientResult<Vec<String>> {
        self.list_names(&self.url(&format!("/environments/{environment}/keyvaluemaps")))
            .await
    }

    /// Fetch one key-value map with its entries.
    pub async fn get_kvm(&self, environment: &str, name: &str) -> ClientResult<KvmRecord> {
        self.get(&self.url(&format!(
            "/environments/{environment}/keyvaluemaps/{name}"
        )))
        .await
    }

    /// Create an empty key-value map.
    pub async fn create_kvm(
        &self,
        environment: &str,
        name: &str,
        encrypted: bool,
    ) -> ClientResult<()> {
        let body = serde_json::json!({ "name": name, "encrypted": encrypted });
        let url = self.url(&format!("/environments/{environment}/keyvaluemaps"));
        let _: serde_json::Value = self.post(&url, &body).await?;
        Ok(())
    }

    /// Create or replace one entry of a key-value map.
    pub async fn upsert_kvm_entry(
        &self,
        environment: &str,
        map: &str,
        key: &str,
        value: &str,
    ) -> ClientResult<()> {
        let body = serde_json::json!({ "name": key, "value": value });
        let url = self.url(&format!(
            "/environments/{environment}/keyvaluemaps/{map}/entries/{key}"
        ));
        debug!(%url, "PUT");
        let response = self
            .auth
            .apply(self.http.put(&url))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.error_from_response(response).await
        }
    }

    /// List entry keys of a key-value map.
    pub async fn list_kvm_keys(&self, environment: &str, map: &str) -> ClientResult<Vec<String>> {
        self.list_names(&self.url(&format!(
            "/environments/{environment}/keyvaluemaps/{map}/keys"
        )))
        .await
    }

    // ── Target servers ────────────────────────────────────────────────

    /// List target server names in an environment.
    pub async fn list_targetservers(&self, environment: &str) -> ClientResult<Vec<String>> {
        self.list_names(&self.url(&format!("/environments/{environment}/targetservers")))
            .await
    }

    /// Fetch one target server.
    pub async fn get_targetserver(
        &self,
        environment: &str,
        name: &str,
    ) -> ClientResult<TargetServerRecord> {
        self.get(&self.url(&format!(
            "/environments/{environment}/targetservers/{name}"
        )))
        .await
    }

    /// Create a target server.
    pub async fn create_targetserver(
        &self,
        environment: &str,
        record: &TargetServerRecord,
    ) -> ClientResult<()> {
        let url = self.url(&format!("/environments/{environment}/targetservers"));
        let _: serde_json::Value = self.post(&url, record).await?;
        Ok(())
    }

    // ── Keystores & certificates ──────────────────────────────────────

    /// List keystore names in an environment.
    pub async fn list_keystores(&self, environment: &str) -> ClientResult<Vec<String>> {
        self.list_names(&self.url(&format!("/environments/{environment}/keystores")))
            .await
    }

    /// Fetch one keystore record.
    pub async fn get_keystore(
        &self,
        environment: &str,
        name: &str,
    ) -> ClientResult<KeystoreRecord> {
        self.get(&self.url(&format!(
            "/environments/{environment}/keystores/{name}"
        )))
        .await
    }

    /// Create an empty keystore.
    pub async fn create_keystore(&self, environment: &str, name: &str) -> ClientResult<()> {
        let body = serde_json::json!({ "name": name });
        let url = self.url(&format!("/environments/{environment}/keystores"));
        let _: serde_json::Value = self.post(&url, &body).await?;
        Ok(())
    }

    /// List alias names present in a keystore.
    pub async fn get_aliases(&self, environment: &str, keystore: &str) -> ClientResult<Vec<String>> {
        self.list_names(&self.url(&format!(
            "/environments/{environment}/keystores/{keystore}/aliases"
        )))
        .await
    }

    /// Download the PEM content of one certificate.
    pub async fn export_cert(
        &self,
        environment: &str,
        keystore: &str,
        cert: &str,
    ) -> ClientResult<String> {
        let url = self.url(&format!(
            "/environments/{environment}/keystores/{keystore}/certs/{cert}/export"
        ));
        debug!(%url, "GET (text)");
        let response = self.auth.apply(self.http.get(&url)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.text().await?)
        } else {
            self.error_from_response(response).await
        }
    }

    /// Import a certificate (and optional private key) as a keyed alias.
    pub async fn import_alias(
        &self,
        environment: &str,
        keystore: &str,
        alias: &str,
        cert_pem: &str,
        key_pem: Option<&str>,
    ) -> ClientResult<()> {
        let body = serde_json::json!({
            "alias": alias,
            "cert": cert_pem,
            "key": key_pem,
        });
        let url = self.url(&format!(
            "/environments/{environment}/keystores/{keystore}/aliases"
        ));
        let _: serde_json::Value = self.post(&url, &body).await?;
        Ok(())
    }

    // ── Internal HTTP helpers ─────────────────────────────────────────

    /// Exhaust a paginated name listing.
    ///
    /// Pages are requested with `count`; continuation passes the last name
    /// of the previous page as `startKey`, and the repeated boundary element
    /// is dropped from each continuation page.
    async fn list_names(&self, url: &str) -> ClientResult<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        let mut start_key: Option<String> = None;

        loop {
            let mut builder = self
                .http
                .get(url)
                .query(&[("count", LIST_PAGE_SIZE.to_string())]);
            if let Some(key) = &start_key {
                builder = builder.query(&[("startKey", key.clone())]);
            }
            debug!(%url, start_key = ?start_key, "GET (list page)");
            let response = self.auth.apply(builder).send().await?;
            let mut page: Vec<String> = self.handle_response(response).await?;
            let full_page = page.len() >= LIST_PAGE_SIZE;

            if start_key.is_some() && !page.is_empty() {
                page.remove(0);
            }
            names.extend(page);

            if !full_page {
                return Ok(names);
            }
            match names.last() {
                // A server that ignores startKey would repeat the same page
                // forever; an unchanged boundary ends the walk.
                Some(last) if start_key.as_deref() == Some(last.as_str()) => return Ok(names),
                Some(last) => start_key = Some(last.clone()),
                None => return Ok(names),
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        debug!(%url, "GET");
        let response = self.auth.apply(self.http.get(url)).send().await?;
        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> ClientResult<T> {
        debug!(%url, "POST");
        let response = self
            .auth
            .apply(self.http.post(url))
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn delete(&self, url: &str) -> ClientResult<()> {
        debug!(%url, "DELETE");
        let response = self.auth.apply(self.http.delete(url)).send().await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            Ok(())
        } else {
            self.error_from_response(response).await
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))
        } else {
            self.error_from_response(response).await
        }
    }

    async fn error_from_response<T>(&self, response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let path = response.url().path().to_string();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(path)),
            StatusCode::CONFLICT => Err(ClientError::Conflict(body)),
            StatusCode::TOO_MANY_REQUESTS => Err(ClientError::RateLimited {
                retry_after_secs: retry_after,
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Auth(format!(
                "management API returned {status} for {path}"
            ))),
            _ => Err(ClientError::Api {
                status: status.as_u16(),
                detail: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
            }),
        }
    }
}
