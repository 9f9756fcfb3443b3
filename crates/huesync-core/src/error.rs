// ── Core error types ──
//
// Remote failures are classified into the closed `Fault` taxonomy at the
// point where a call is made; the supervisor and dispatcher branch on it
// exhaustively. `CoreError` is what the `Bridge` facade returns to callers.

use thiserror::Error;

/// Classified remote failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// Network or I/O failure. Retried on the next cycle.
    #[error("connectivity: {0}")]
    Connectivity(String),

    /// Credential missing or rejected.
    #[error("authorization: {0}")]
    Authorization(String),

    /// A light refused a change because it is switched off.
    #[error("device off: {0}")]
    DeviceOff(String),

    /// The addressed entity no longer exists on the hub.
    #[error("entity unavailable: {0}")]
    EntityUnavailable(String),

    /// Unexpected application error or malformed payload. Most likely a bug.
    #[error("protocol: {0}")]
    Protocol(String),

    /// The client was used after being torn down.
    #[error("transient race: {0}")]
    TransientRace(String),
}

impl Fault {
    /// Classify a remote client error.
    pub fn classify(err: &huesync_api::Error) -> Self {
        use huesync_api::Error as E;

        let message = err.to_string();
        match err {
            E::Transport(_) | E::Timeout { .. } | E::Unavailable { .. } => {
                Self::Connectivity(message)
            }
            E::Unauthorized { .. } | E::LinkButtonNotPressed | E::NoCredential { .. } => {
                Self::Authorization(message)
            }
            E::DeviceOff { .. } => Self::DeviceOff(message),
            E::EntityNotAvailable { .. } => Self::EntityUnavailable(message),
            E::Api { .. } | E::Deserialization { .. } | E::InvalidUrl(_) => {
                Self::Protocol(message)
            }
            E::Closed => Self::TransientRace(message),
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

impl From<huesync_api::Error> for Fault {
    fn from(err: huesync_api::Error) -> Self {
        Self::classify(&err)
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Hub not connected")]
    NotConnected,

    #[error("Cannot reach hub: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity}")]
    NotFound { entity: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Hub error type code (if the hub reported one).
        code: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<Fault> for CoreError {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Connectivity(reason) => CoreError::ConnectionFailed { reason },
            Fault::Authorization(message) => CoreError::AuthenticationFailed { message },
            Fault::EntityUnavailable(entity) => CoreError::NotFound { entity },
            Fault::DeviceOff(message) | Fault::Protocol(message) | Fault::TransientRace(message) => {
                CoreError::OperationFailed { message }
            }
        }
    }
}

impl From<huesync_api::Error> for CoreError {
    fn from(err: huesync_api::Error) -> Self {
        match err {
            huesync_api::Error::Api { code, description } => CoreError::Api {
                message: description,
                code: Some(code),
            },
            huesync_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Deserialization error: {message}"),
                code: None,
            },
            huesync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            other => Fault::classify(&other).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_each_family() {
        use huesync_api::Error as E;

        assert!(Fault::classify(&E::Timeout { timeout_secs: 5 }).is_connectivity());
        assert!(Fault::classify(&E::Unavailable { status: 503 }).is_connectivity());
        assert!(Fault::classify(&E::from_hub(1, "unauthorized user")).is_authorization());
        assert!(Fault::classify(&E::LinkButtonNotPressed).is_authorization());
        assert!(matches!(
            Fault::classify(&E::from_hub(201, "off")),
            Fault::DeviceOff(_)
        ));
        assert!(matches!(
            Fault::classify(&E::from_hub(3, "gone")),
            Fault::EntityUnavailable(_)
        ));
        assert!(matches!(
            Fault::classify(&E::from_hub(7, "invalid value")),
            Fault::Protocol(_)
        ));
        assert!(matches!(Fault::classify(&E::Closed), Fault::TransientRace(_)));
    }

    #[test]
    fn api_errors_keep_hub_code() {
        let err: CoreError = huesync_api::Error::from_hub(7, "invalid value").into();
        assert!(matches!(err, CoreError::Api { code: Some(7), .. }));

        let err: CoreError = huesync_api::Error::Timeout { timeout_secs: 5 }.into();
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    }
}
