#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "graphql")]
pub mod graphql;
pub mod jwt;
pub mod storage;
pub mod token_store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use client::AccountsClient;
pub use config::ClientConfig;
pub use error::Error;
#[cfg(feature = "graphql")]
pub use graphql::{DefaultSelections, GraphQlConfig, GraphQlTransport, Selections};
pub use storage::{JsonFileStorage, MemoryStorage, StorageError, TokenStorage};
pub use token_store::{Slot, TokenStore};
pub use transport::Transport;
pub use types::{
    AuthenticationOutcome, Authenticator, CreateUser, CreateUserResult, EmailRecord,
    ImpersonationResult, ImpersonationTarget, LoginResult, SessionId, TokenPair, User, UserId,
};
