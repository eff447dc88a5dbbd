//! Management API authentication — Basic credentials or a Bearer token.

use reqwest::RequestBuilder;

/// Credentials for the management API.
///
/// The [`Debug`] impl redacts secrets to prevent accidental credential
/// exposure in log output.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// Username/password pair sent as HTTP Basic auth.
    Basic { username: String, password: String },

    /// Static Bearer token.
    Bearer { token: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Authentication handler applied to every outgoing request.
#[derive(Debug, Clone)]
pub struct Auth {
    credentials: Credentials,
}

impl Auth {
    /// Create a new auth handler.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Apply authentication to a request builder.
    #[must_use]
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Credentials::Bearer { token } => builder.bearer_auth(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::Basic {
            username: "admin@example.com".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("admin@example.com"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let credentials = Credentials::Bearer {
            token: "sekrit-token".into(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sekrit-token"));
    }

    #[test]
    fn test_credentials_serde_tag() {
        let credentials = Credentials::Bearer {
            token: "abc".into(),
        };
        let json = serde_json::to_string(&credentials).unwrap();
        assert!(json.contains("\"type\":\"bearer\""));

        let parsed: Credentials = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, Credentials::Bearer { token } if token == "abc"));
    }
}
