//! Typed client for the API-management platform's management API.
//!
//! Wraps `reqwest` with per-collection CRUD operations, paginated listings,
//! bundle export/import, deployment control, and keystore certificate
//! handling. Transient failures can be wrapped in [`retry::RetryPolicy`].

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod retry;

pub use auth::{Auth, Credentials};
pub use client::MgmtClient;
pub use error::{ClientError, ClientResult};
pub use retry::RetryPolicy;
