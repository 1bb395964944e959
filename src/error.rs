#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No token pair is stored.
    #[error("No session")]
    NoSession,

    /// The server rejected the refresh token, or it expired locally.
    #[error("Refresh token expired")]
    RefreshTokenExpired,

    /// The accounts server answered with an error.
    #[error("{operation} failed{}: {detail}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[cfg(feature = "graphql")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("User already impersonating")]
    AlreadyImpersonating,

    #[error("User unauthorized to impersonate")]
    ImpersonationUnauthorized,

    #[error("An access token is required")]
    NoAccessToken,

    /// The token could not be decoded.
    #[error("Token error: {0}")]
    Token(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn transport(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            status: None,
            detail: detail.into(),
        }
    }
}
