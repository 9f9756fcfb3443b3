use thiserror::Error;

/// Hub error `type` codes carried in the `[{"error": {...}}]` envelope.
pub mod code {
    pub const UNAUTHORIZED: u16 = 1;
    pub const RESOURCE_NOT_AVAILABLE: u16 = 3;
    pub const LINK_BUTTON_NOT_PRESSED: u16 = 101;
    pub const DEVICE_OFF: u16 = 201;
}

/// Top-level error type for the `huesync-api` crate.
///
/// Covers transport failures, hub-reported application errors, and
/// payload decoding. `huesync-core` classifies these into its closed
/// fault taxonomy; nothing above the core sees them raw.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The credential was rejected (hub error type 1).
    #[error("Unauthorized: {description}")]
    Unauthorized { description: String },

    /// Provisioning requires the physical link button (hub error type 101).
    #[error("Link button not pressed")]
    LinkButtonNotPressed,

    // ── Entity ──────────────────────────────────────────────────────
    /// The addressed light, sensor, or group no longer exists (type 3).
    #[error("Entity not available: {description}")]
    EntityNotAvailable { description: String },

    /// The light is switched off and cannot accept the requested change (type 201).
    #[error("Device is off: {description}")]
    DeviceOff { description: String },

    /// Any other error entry reported by the hub.
    #[error("Hub API error (type {code}): {description}")]
    Api { code: u16, description: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The hub answered with a server-side failure (typically while rebooting).
    #[error("Hub unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Lifecycle ───────────────────────────────────────────────────
    /// The client was closed and may no longer be used.
    #[error("Client closed")]
    Closed,

    /// The operation needs a credential that has not been set yet.
    #[error("No credential set for {operation}")]
    NoCredential { operation: &'static str },
}

impl Error {
    /// Build an error from a hub error entry (`type` + `description`).
    pub fn from_hub(code: u16, description: impl Into<String>) -> Self {
        let description = description.into();
        match code {
            code::UNAUTHORIZED => Self::Unauthorized { description },
            code::RESOURCE_NOT_AVAILABLE => Self::EntityNotAvailable { description },
            code::LINK_BUTTON_NOT_PRESSED => Self::LinkButtonNotPressed,
            code::DEVICE_OFF => Self::DeviceOff { description },
            _ => Self::Api { code, description },
        }
    }

    /// Returns `true` if re-authentication might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::NoCredential { .. } | Self::LinkButtonNotPressed
        )
    }

    /// Returns `true` if this is a network-level error worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Unavailable { .. }
        )
    }

    /// Returns `true` if the addressed entity does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::EntityNotAvailable { .. } => true,
            _ => false,
        }
    }

    /// Extract the hub error type code, if available.
    pub fn api_error_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(code::UNAUTHORIZED),
            Self::EntityNotAvailable { .. } => Some(code::RESOURCE_NOT_AVAILABLE),
            Self::LinkButtonNotPressed => Some(code::LINK_BUTTON_NOT_PRESSED),
            Self::DeviceOff { .. } => Some(code::DEVICE_OFF),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
