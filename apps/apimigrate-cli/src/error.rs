//! CLI error types and exit codes.

use thiserror::Error;

/// Exit codes:
/// - 0: success (individual entity failures are logged, not fatal)
/// - 1: general error
/// - 2: configuration error (bad flags, missing environment/credentials)
/// - 3: connection or authentication failure
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection to the management API failed: {0}")]
    Connection(String),

    #[error("Management API error: {0}")]
    Api(#[from] apimigrate_client::ClientError),

    #[error(transparent)]
    Engine(#[from] apimigrate_engine::EngineError),
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Validation(_) => 2,
            CliError::Connection(_) => 3,
            CliError::Api(_) | CliError::Engine(_) => 1,
        }
    }

    /// Print the error for the user.
    pub fn print(&self) {
        eprintln!("error: {self}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("missing env".into()).exit_code(), 2);
        assert_eq!(CliError::Validation("no --yes".into()).exit_code(), 2);
        assert_eq!(CliError::Connection("refused".into()).exit_code(), 3);
        assert_eq!(
            CliError::Api(apimigrate_client::ClientError::NotFound("x".into())).exit_code(),
            1
        );
    }
}
