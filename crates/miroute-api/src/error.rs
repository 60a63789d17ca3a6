use thiserror::Error;

/// Top-level error type for the `miroute-api` crate.
///
/// Covers every failure mode of the Luci HTTP surface: the challenge
/// login, transport, the `{code, ...}` envelope, and payload decoding.
/// `miroute-core` classifies these when deciding how a poll cycle ends.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong password, account locked, router busy).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The router rejected the session token (`code == 401`).
    /// Re-login is required; the token is cleared before this is returned.
    #[error("Session token rejected -- re-login required")]
    TokenExpired,

    /// A token-bearing call was attempted without a stored token.
    #[error("No active session -- login first")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, DNS failure).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Envelope ────────────────────────────────────────────────────
    /// The router answered with a non-zero, non-401 envelope code.
    #[error("Luci API error (code {code}): {message}")]
    Api { code: i64, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the session is gone and
    /// re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::NotAuthenticated | Self::Authentication { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying
    /// on the next cycle without treating the router as gone.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { .. } => true,
            _ => false,
        }
    }
}
