use crate::config::ClientConfig;
use crate::error::Error;
use crate::storage::TokenStorage;
use crate::types::TokenPair;

const ACCESS_TOKEN: &str = "accessToken";
const REFRESH_TOKEN: &str = "refreshToken";
const ORIGINAL_ACCESS_TOKEN: &str = "originalAccessToken";
const ORIGINAL_REFRESH_TOKEN: &str = "originalRefreshToken";

/// Which token pair slot to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The pair used for requests.
    Current,
    /// The pre-impersonation pair, kept for restoring the session.
    Original,
}

/// Typed view of the token keys held in a [`TokenStorage`] backend.
///
/// Keys are `<prefix>:<name>`. Both halves of a pair are always written and
/// removed together; a half-present pair reads as absent.
#[derive(Debug)]
pub struct TokenStore<S> {
    storage: S,
    prefix: String,
}

impl<S: TokenStorage> TokenStore<S> {
    #[must_use]
    pub fn new(storage: S, config: &ClientConfig) -> Self {
        Self {
            storage,
            prefix: config.token_storage_prefix.clone(),
        }
    }

    /// Read a pair. `None` unless both keys are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    pub async fn get(&self, slot: Slot) -> Result<Option<TokenPair>, Error> {
        let (access_key, refresh_key) = self.keys(slot);
        let access = self.storage.get(&access_key).await.map_err(storage_err)?;
        let refresh = self.storage.get(&refresh_key).await.map_err(storage_err)?;
        Ok(access
            .zip(refresh)
            .map(|(access_token, refresh_token)| TokenPair {
                access_token,
                refresh_token,
            }))
    }

    /// Write both keys of a pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    pub async fn set(&self, pair: &TokenPair, slot: Slot) -> Result<(), Error> {
        let (access_key, refresh_key) = self.keys(slot);
        self.storage
            .set(&access_key, &pair.access_token)
            .await
            .map_err(storage_err)?;
        self.storage
            .set(&refresh_key, &pair.refresh_token)
            .await
            .map_err(storage_err)
    }

    /// Remove both keys of a pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    pub async fn clear(&self, slot: Slot) -> Result<(), Error> {
        let (access_key, refresh_key) = self.keys(slot);
        self.storage.remove(&access_key).await.map_err(storage_err)?;
        self.storage.remove(&refresh_key).await.map_err(storage_err)
    }

    /// Whether an original pair is stashed, i.e. an impersonation is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    pub async fn is_impersonating(&self) -> Result<bool, Error> {
        Ok(self.get(Slot::Original).await?.is_some())
    }

    /// The underlying backend.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn keys(&self, slot: Slot) -> (String, String) {
        let (access, refresh) = match slot {
            Slot::Current => (ACCESS_TOKEN, REFRESH_TOKEN),
            Slot::Original => (ORIGINAL_ACCESS_TOKEN, ORIGINAL_REFRESH_TOKEN),
        };
        (
            format!("{}:{access}", self.prefix),
            format!("{}:{refresh}", self.prefix),
        )
    }
}

fn storage_err(e: crate::storage::StorageError) -> Error {
    Error::Storage(e.to_string())
}
