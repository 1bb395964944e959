use std::future::Future;

use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::types::{
    AuthenticationOutcome, Authenticator, CreateUser, CreateUserResult, ImpersonationResult,
    ImpersonationTarget, LoginResult, TokenPair, User,
};

/// Network capability the client drives.
///
/// Authenticated operations receive the access token explicitly; a transport
/// never reads token storage itself. [`GraphQlTransport`](crate::GraphQlTransport)
/// is the stock implementation. Implement this trait to talk to the server
/// another way, or to script responses in tests.
///
/// `refresh_tokens` must report a rejected refresh token as
/// [`Error::RefreshTokenExpired`] so the client can drop the dead session.
pub trait Transport: Send + Sync {
    /// Log in through an authentication service (`password`, `magicLink`, ...).
    fn authenticate_with_service(
        &self,
        service: &str,
        params: &JsonValue,
    ) -> impl Future<Output = Result<AuthenticationOutcome, Error>> + Send;

    fn create_user(
        &self,
        user: &CreateUser,
    ) -> impl Future<Output = Result<CreateUserResult, Error>> + Send;

    /// Exchange a token pair for a fresh one.
    fn refresh_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenPair, Error>> + Send;

    /// Invalidate the server-side session.
    fn logout(&self, access_token: &str) -> impl Future<Output = Result<(), Error>> + Send;

    fn impersonate(
        &self,
        access_token: &str,
        target: &ImpersonationTarget,
    ) -> impl Future<Output = Result<ImpersonationResult, Error>> + Send;

    /// The user owning the session, if the server still recognizes it.
    fn get_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Option<User>, Error>> + Send;

    fn verify_email(&self, token: &str) -> impl Future<Output = Result<(), Error>> + Send;

    fn send_verification_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn send_reset_password_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns a login result when the server logs the user in after reset.
    fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<Option<LoginResult>, Error>> + Send;

    fn change_password(
        &self,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn add_email(
        &self,
        access_token: &str,
        email: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn authenticators(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<Authenticator>, Error>> + Send;

    fn authenticators_by_mfa_token(
        &self,
        mfa_token: &str,
    ) -> impl Future<Output = Result<Vec<Authenticator>, Error>> + Send;

    /// Start associating a new authenticator. The result shape depends on the
    /// authenticator type.
    fn mfa_associate(
        &self,
        access_token: &str,
        kind: &str,
        params: &JsonValue,
    ) -> impl Future<Output = Result<JsonValue, Error>> + Send;

    /// Trigger a challenge (e.g. send an SMS code) for an authenticator.
    fn mfa_challenge(
        &self,
        mfa_token: &str,
        authenticator_id: &str,
    ) -> impl Future<Output = Result<JsonValue, Error>> + Send;
}
