use crate::error::Error;

pub const DEFAULT_TOKEN_STORAGE_PREFIX: &str = "accounts";
pub const ENV_TOKEN_STORAGE_PREFIX: &str = "ACCOUNTS_TOKEN_STORAGE_PREFIX";

/// Client-side session settings.
///
/// All fields have defaults. Override with `with_*` methods, or read them from
/// the environment with [`from_env()`](ClientConfig::from_env).
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) token_storage_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_storage_prefix: DEFAULT_TOKEN_STORAGE_PREFIX.into(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `ACCOUNTS_TOKEN_STORAGE_PREFIX`: key prefix for stored tokens
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the prefix is set but blank.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(std::env::var(ENV_TOKEN_STORAGE_PREFIX).ok())
    }

    fn from_vars(prefix: Option<String>) -> Result<Self, Error> {
        match prefix {
            Some(prefix) => Self::default().with_token_storage_prefix(prefix),
            None => Ok(Self::default()),
        }
    }

    /// Override the storage key prefix (default: `"accounts"`).
    ///
    /// Two clients sharing one storage backend must use different prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the prefix is blank.
    pub fn with_token_storage_prefix(mut self, prefix: impl Into<String>) -> Result<Self, Error> {
        let prefix = prefix.into().trim().to_string();
        if prefix.is_empty() {
            return Err(Error::Config("token storage prefix must not be empty".into()));
        }
        self.token_storage_prefix = prefix;
        Ok(self)
    }

    #[must_use]
    pub fn token_storage_prefix(&self) -> &str {
        &self.token_storage_prefix
    }
}
