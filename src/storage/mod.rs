//! Key-value persistence for session tokens.
//!
//! [`TokenStore`](crate::TokenStore) sits on top of any [`TokenStorage`]
//! backend. Two are provided: [`MemoryStorage`] for tests and short-lived
//! processes, and [`JsonFileStorage`] for CLIs that keep a session on disk.
//! Browser-style or keychain-backed storage can be plugged in by implementing
//! the trait.

mod file;
mod memory;

use std::future::Future;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

/// Boxed error returned by storage backends.
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided key-value persistence.
///
/// Each call is treated as atomic. Keys are plain strings chosen by the
/// token store; values are opaque.
///
/// # Example
///
/// ```rust,ignore
/// impl TokenStorage for Keychain {
///     async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
///         Ok(self.entry(key)?.get_password().ok())
///     }
///
///     async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
///         self.entry(key)?.set_password(value)?;
///         Ok(())
///     }
///
///     async fn remove(&self, key: &str) -> Result<(), StorageError> {
///         let _ = self.entry(key)?.delete_credential();
///         Ok(())
///     }
/// }
/// ```
pub trait TokenStorage: Send + Sync {
    /// Read a value. `None` if the key is absent.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write a value, replacing any previous one.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}
