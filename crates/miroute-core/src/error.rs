use serde::Serialize;
use thiserror::Error;

/// Failure class of one fetch operation inside a poll cycle.
///
/// Cycle reports carry this instead of the full API error so they stay
/// cheap to clone and serialize; the full error is logged at the
/// failure site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetchErrorKind {
    /// The session token was rejected or never established.
    Auth,
    /// The router was unreachable or answered with an error code.
    Transport,
    /// The router answered, but not with anything we could decode.
    Malformed,
}

impl FetchErrorKind {
    pub fn classify(error: &miroute_api::Error) -> Self {
        match error {
            miroute_api::Error::Authentication { .. }
            | miroute_api::Error::TokenExpired
            | miroute_api::Error::NotAuthenticated => Self::Auth,
            miroute_api::Error::Transport(_)
            | miroute_api::Error::InvalidUrl(_)
            | miroute_api::Error::Api { .. } => Self::Transport,
            miroute_api::Error::Deserialization { .. } => Self::Malformed,
        }
    }
}

/// Errors from a cache store backend.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encoding: {0}")]
    Serialization(#[from] serde_json::Error),
}
