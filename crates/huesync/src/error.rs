//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use huesync_config::ConfigError;
use huesync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to hub: {reason}")]
    #[diagnostic(
        code(huesync::connection_failed),
        help("Check that the hub is powered and reachable from this machine, then retry.")
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The hub rejected the credential: {message}")]
    #[diagnostic(
        code(huesync::auth_failed),
        help("Obtain a new credential with: huesync pair")
    )]
    AuthFailed { message: String },

    #[error("Pairing did not complete after {attempts} attempts")]
    #[diagnostic(
        code(huesync::pairing_timeout),
        help("Press the pairing button on the hub, then run: huesync pair")
    )]
    PairingTimedOut { attempts: u32 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{entity} not found")]
    #[diagnostic(code(huesync::not_found))]
    NotFound { entity: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Hub error: {message}")]
    #[diagnostic(code(huesync::api_error))]
    ApiError { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(huesync::validation),
        help("Set it in {path} or pass it on the command line.")
    )]
    Validation {
        field: String,
        reason: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(huesync::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(huesync::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::PairingTimedOut { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation {
                field,
                reason,
                path: huesync_config::config_path().display().to_string(),
            },
            other => CliError::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotConnected => CliError::ConnectionFailed {
                reason: "hub not reachable or not paired".into(),
            },
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::NotFound { entity } => CliError::NotFound { entity },
            CoreError::OperationFailed { message } | CoreError::Api { message, .. } => {
                CliError::ApiError { message }
            }
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
                path: huesync_config::config_path().display().to_string(),
            },
        }
    }
}

impl From<huesync_api::Error> for CliError {
    fn from(err: huesync_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
