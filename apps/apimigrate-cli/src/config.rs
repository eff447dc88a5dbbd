//! Connection flags and credential resolution.

use crate::error::{CliError, CliResult};
use apimigrate_client::auth::{Auth, Credentials};
use apimigrate_client::MgmtClient;
use std::time::Duration;
use tracing::debug;

/// Flags shared by every subcommand that talks to the management API.
#[derive(Debug, clap::Args)]
pub struct ConnectionArgs {
    /// Management API endpoint
    #[arg(long, env = "APIMIGRATE_BASE_URL")]
    pub base_url: String,

    /// Organization to operate on
    #[arg(short, long)]
    pub org: String,

    /// Username for basic authentication
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "APIMIGRATE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Bearer token; takes precedence over username/password
    #[arg(long, env = "APIMIGRATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl ConnectionArgs {
    /// Resolve credentials from the supplied flags and environment.
    pub fn credentials(&self) -> CliResult<Credentials> {
        if let Some(token) = &self.token {
            return Ok(Credentials::Bearer {
                token: token.clone(),
            });
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            (Some(_), None) => Err(CliError::Config(
                "a password is required with --username (flag or APIMIGRATE_PASSWORD)".into(),
            )),
            _ => Err(CliError::Config(
                "credentials are required: --token or --username/--password".into(),
            )),
        }
    }

    /// Build a client and verify connectivity.
    ///
    /// A failure here aborts the run with a non-zero exit, unlike
    /// per-entity failures later on.
    pub async fn connect(&self) -> CliResult<MgmtClient> {
        let auth = Auth::new(self.credentials()?);
        let client = MgmtClient::new(
            &self.base_url,
            &self.org,
            auth,
            Duration::from_secs(self.timeout_secs),
        )
        .map_err(|e| CliError::Config(e.to_string()))?;

        client
            .verify_connection()
            .await
            .map_err(|e| CliError::Connection(e.to_string()))?;
        debug!(org = %self.org, "connected to management API");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(username: Option<&str>, password: Option<&str>, token: Option<&str>) -> ConnectionArgs {
        ConnectionArgs {
            base_url: "https://mgmt.example.com".into(),
            org: "acme".into(),
            username: username.map(String::from),
            password: password.map(String::from),
            token: token.map(String::from),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_token_takes_precedence() {
        let credentials = args(Some("u"), Some("p"), Some("t")).credentials().unwrap();
        assert!(matches!(credentials, Credentials::Bearer { token } if token == "t"));
    }

    #[test]
    fn test_basic_credentials() {
        let credentials = args(Some("u"), Some("p"), None).credentials().unwrap();
        assert!(matches!(credentials, Credentials::Basic { username, .. } if username == "u"));
    }

    #[test]
    fn test_username_without_password_is_config_error() {
        let error = args(Some("u"), None, None).credentials().unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_no_credentials_is_config_error() {
        let error = args(None, None, None).credentials().unwrap_err();
        assert!(matches!(error, CliError::Config(_)));
    }
}
