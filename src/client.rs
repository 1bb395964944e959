use serde_json::Value as JsonValue;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::jwt;
use crate::storage::TokenStorage;
use crate::token_store::{Slot, TokenStore};
use crate::transport::Transport;
use crate::types::{
    AuthenticationOutcome, Authenticator, CreateUser, CreateUserResult, ImpersonationResult,
    ImpersonationTarget, LoginResult, TokenPair, User,
};

/// Client for an accounts server.
///
/// Owns the session kept in token storage and drives a [`Transport`]. Every
/// authenticated call first goes through [`refresh_session`](Self::refresh_session),
/// so callers never have to check token expiry themselves.
///
/// ```rust,ignore
/// use accounts_client::{AccountsClient, ClientConfig, GraphQlConfig, GraphQlTransport, MemoryStorage};
///
/// let transport = GraphQlTransport::new(GraphQlConfig::new("https://api.example.com/graphql".parse()?));
/// let client = AccountsClient::new(transport, MemoryStorage::new(), ClientConfig::default());
///
/// client
///     .login_with_service("password", &serde_json::json!({
///         "user": { "email": "ada@example.com" },
///         "password": "secret",
///     }))
///     .await?;
/// let user = client.get_user().await?;
/// ```
///
/// Concurrent calls are safe but not coordinated: two tasks that both find
/// the access token expired will both refresh, and the later write wins.
pub struct AccountsClient<T, S> {
    transport: T,
    store: TokenStore<S>,
}

impl<T: Transport, S: TokenStorage> AccountsClient<T, S> {
    #[must_use]
    pub fn new(transport: T, storage: S, config: ClientConfig) -> Self {
        Self {
            transport,
            store: TokenStore::new(storage, &config),
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn token_store(&self) -> &TokenStore<S> {
        &self.store
    }

    // ── Tokens ─────────────────────────────────────────────────────────

    /// The stored token pair, without checking expiry.
    pub async fn tokens(&self) -> Result<Option<TokenPair>, Error> {
        self.store.get(Slot::Current).await
    }

    /// Store a token pair as the current session.
    pub async fn set_tokens(&self, tokens: &TokenPair) -> Result<(), Error> {
        self.store.set(tokens, Slot::Current).await
    }

    /// Drop the current session and any stashed impersonation original.
    pub async fn clear_tokens(&self) -> Result<(), Error> {
        self.store.clear(Slot::Current).await?;
        self.store.clear(Slot::Original).await
    }

    pub async fn is_impersonating(&self) -> Result<bool, Error> {
        self.store.is_impersonating().await
    }

    // ── Session refresh ────────────────────────────────────────────────

    /// Return a usable token pair, refreshing it first if the access token
    /// has expired.
    ///
    /// - No stored session: `Ok(None)`, no network call.
    /// - Access token still valid: the stored pair, no network call.
    /// - Refresh token expired (locally, or per the server): the session and
    ///   any stashed impersonation original are cleared and `Ok(None)`
    ///   returned.
    /// - Otherwise exactly one refresh call; the new pair is stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the access token cannot be decoded, and
    /// any transport or storage error. Stored tokens are left untouched in
    /// those cases.
    pub async fn refresh_session(&self) -> Result<Option<TokenPair>, Error> {
        let Some(tokens) = self.store.get(Slot::Current).await? else {
            return Ok(None);
        };

        if !jwt::is_expired(&tokens.access_token)? {
            return Ok(Some(tokens));
        }

        // Opaque refresh tokens can't be checked locally; the server decides.
        if jwt::is_expired(&tokens.refresh_token).unwrap_or(false) {
            tracing::warn!("Refresh token expired, clearing session");
            self.clear_tokens().await?;
            return Ok(None);
        }

        tracing::debug!("Access token expired, refreshing session");
        match self
            .transport
            .refresh_tokens(&tokens.access_token, &tokens.refresh_token)
            .await
        {
            Ok(refreshed) => {
                self.store.set(&refreshed, Slot::Current).await?;
                tracing::debug!("Session refreshed");
                Ok(Some(refreshed))
            }
            Err(Error::RefreshTokenExpired) => {
                tracing::warn!("Server rejected refresh token, clearing session");
                self.clear_tokens().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`refresh_session`](Self::refresh_session), but a missing session
    /// is an error.
    async fn require_session(&self) -> Result<TokenPair, Error> {
        self.refresh_session().await?.ok_or(Error::NoSession)
    }

    // ── Login / registration ───────────────────────────────────────────

    /// Log in through an authentication service. On success the session is
    /// stored; when a second factor is required nothing is stored.
    pub async fn login_with_service(
        &self,
        service: &str,
        params: &JsonValue,
    ) -> Result<AuthenticationOutcome, Error> {
        let outcome = self
            .transport
            .authenticate_with_service(service, params)
            .await?;

        match &outcome {
            AuthenticationOutcome::LoggedIn(login) => {
                self.store_login(login).await?;
                tracing::info!(service, user_id = %login.user.id, "Login successful");
            }
            AuthenticationOutcome::MultiFactorRequired { .. } => {
                tracing::info!(service, "Login requires a second factor");
            }
        }
        Ok(outcome)
    }

    /// Register a user. If the server logs the new user in, the session is
    /// stored.
    pub async fn create_user(&self, user: &CreateUser) -> Result<CreateUserResult, Error> {
        let result = self.transport.create_user(user).await?;
        if let Some(login) = &result.login_result {
            self.store_login(login).await?;
        }
        Ok(result)
    }

    /// Invalidate the session on the server and forget it locally.
    ///
    /// Local tokens are cleared even if the server call fails; that error is
    /// still returned.
    pub async fn logout(&self) -> Result<(), Error> {
        let outcome = match self.refresh_session().await {
            Ok(Some(tokens)) => self.transport.logout(&tokens.access_token).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        self.clear_tokens().await?;
        tracing::info!("Logged out");
        outcome
    }

    // ── Impersonation ──────────────────────────────────────────────────

    /// Act as another user. The current pair is stashed so
    /// [`stop_impersonation`](Self::stop_impersonation) can restore it.
    ///
    /// # Errors
    ///
    /// - [`Error::NoAccessToken`] without a session
    /// - [`Error::AlreadyImpersonating`] while an impersonation is active
    /// - [`Error::ImpersonationUnauthorized`] if the server refuses
    ///
    /// No tokens change on any error.
    pub async fn impersonate(
        &self,
        target: &ImpersonationTarget,
    ) -> Result<ImpersonationResult, Error> {
        let tokens = self.refresh_session().await?.ok_or(Error::NoAccessToken)?;
        if self.store.is_impersonating().await? {
            return Err(Error::AlreadyImpersonating);
        }

        let result = self
            .transport
            .impersonate(&tokens.access_token, target)
            .await?;
        if !result.authorized {
            tracing::warn!("Impersonation refused by server");
            return Err(Error::ImpersonationUnauthorized);
        }
        let impersonation_tokens = result
            .tokens
            .as_ref()
            .ok_or_else(|| Error::transport("impersonate", "authorized response carried no tokens"))?;

        // Stash first: once the current slot is overwritten the original is gone.
        self.store.set(&tokens, Slot::Original).await?;
        self.store.set(impersonation_tokens, Slot::Current).await?;

        tracing::info!("Impersonation started");
        Ok(result)
    }

    /// Restore the pre-impersonation session. No-op if none is stashed.
    pub async fn stop_impersonation(&self) -> Result<(), Error> {
        let Some(original) = self.store.get(Slot::Original).await? else {
            return Ok(());
        };
        self.store.set(&original, Slot::Current).await?;
        self.store.clear(Slot::Original).await?;
        tracing::info!("Impersonation stopped");
        Ok(())
    }

    // ── Account ────────────────────────────────────────────────────────

    /// The logged-in user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without a session or if the server no
    /// longer recognizes it.
    pub async fn get_user(&self) -> Result<User, Error> {
        let tokens = self.require_session().await?;
        self.transport
            .get_user(&tokens.access_token)
            .await?
            .ok_or(Error::NoSession)
    }

    /// Confirm an email address with the token from the verification mail.
    pub async fn verify_email(&self, token: &str) -> Result<(), Error> {
        self.transport.verify_email(token).await
    }

    /// Ask the server to mail a verification link to `email`.
    pub async fn send_verification_email(&self, email: &str) -> Result<(), Error> {
        self.transport.send_verification_email(email).await
    }

    /// Ask the server to mail a password reset link to `email`.
    pub async fn send_reset_password_email(&self, email: &str) -> Result<(), Error> {
        self.transport.send_reset_password_email(email).await
    }

    /// Reset a password with an emailed token. Stores the session when the
    /// server logs the user in.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<LoginResult>, Error> {
        let login = self.transport.reset_password(token, new_password).await?;
        if let Some(login) = &login {
            self.store_login(login).await?;
        }
        Ok(login)
    }

    /// Change the logged-in user's password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without a session.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), Error> {
        let tokens = self.require_session().await?;
        self.transport
            .change_password(&tokens.access_token, old_password, new_password)
            .await
    }

    /// Add another email address to the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without a session.
    pub async fn add_email(&self, email: &str) -> Result<(), Error> {
        let tokens = self.require_session().await?;
        self.transport.add_email(&tokens.access_token, email).await
    }

    // ── Multi-factor ───────────────────────────────────────────────────

    /// Authenticators registered for the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without a session.
    pub async fn authenticators(&self) -> Result<Vec<Authenticator>, Error> {
        let tokens = self.require_session().await?;
        self.transport.authenticators(&tokens.access_token).await
    }

    /// Authenticators usable to finish a login that returned
    /// [`AuthenticationOutcome::MultiFactorRequired`].
    pub async fn authenticators_by_mfa_token(
        &self,
        mfa_token: &str,
    ) -> Result<Vec<Authenticator>, Error> {
        self.transport.authenticators_by_mfa_token(mfa_token).await
    }

    /// Start associating a new authenticator of type `kind`. The result is
    /// returned as the server sent it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without a session.
    pub async fn mfa_associate(&self, kind: &str, params: &JsonValue) -> Result<JsonValue, Error> {
        let tokens = self.require_session().await?;
        self.transport
            .mfa_associate(&tokens.access_token, kind, params)
            .await
    }

    /// Challenge an authenticator to finish a login that required a second
    /// factor.
    pub async fn mfa_challenge(
        &self,
        mfa_token: &str,
        authenticator_id: &str,
    ) -> Result<JsonValue, Error> {
        self.transport.mfa_challenge(mfa_token, authenticator_id).await
    }

    /// A fresh login replaces the whole session, impersonation included.
    async fn store_login(&self, login: &LoginResult) -> Result<(), Error> {
        self.store.clear(Slot::Original).await?;
        self.store.set(&login.tokens, Slot::Current).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{expired_token, fresh_token};
    use crate::storage::MemoryStorage;
    use crate::testing::ScriptedTransport;

    fn client(transport: ScriptedTransport) -> AccountsClient<ScriptedTransport, MemoryStorage> {
        AccountsClient::new(transport, MemoryStorage::new(), ClientConfig::default())
    }

    async fn logged_in(
        transport: ScriptedTransport,
        tokens: &TokenPair,
    ) -> AccountsClient<ScriptedTransport, MemoryStorage> {
        let client = client(transport);
        client.set_tokens(tokens).await.unwrap();
        client
    }

    #[tokio::test]
    async fn no_session_refreshes_to_none() {
        let client = client(ScriptedTransport::default());
        assert_eq!(client.refresh_session().await.unwrap(), None);
        assert_eq!(client.transport().count("refreshTokens"), 0);
    }

    #[tokio::test]
    async fn valid_access_token_skips_transport() {
        let tokens = TokenPair::new(fresh_token(), fresh_token());
        let client = logged_in(ScriptedTransport::default(), &tokens).await;

        assert_eq!(client.refresh_session().await.unwrap(), Some(tokens));
        assert_eq!(client.transport().count("refreshTokens"), 0);
    }

    #[tokio::test]
    async fn expired_access_token_refreshes_once_and_stores() {
        let access = expired_token();
        let tokens = TokenPair::new(access.clone(), "R");
        let refreshed = TokenPair::new("A2", "R2");
        let transport = ScriptedTransport::default().on_refresh(Ok(refreshed.clone()));
        let client = logged_in(transport, &tokens).await;

        assert_eq!(client.refresh_session().await.unwrap(), Some(refreshed.clone()));
        assert_eq!(client.transport().count("refreshTokens"), 1);
        assert_eq!(
            client.transport().last_args("refreshTokens"),
            Some(vec![access, "R".to_string()])
        );
        assert_eq!(client.tokens().await.unwrap(), Some(refreshed));
    }

    #[tokio::test]
    async fn locally_expired_refresh_token_clears_session() {
        let tokens = TokenPair::new(expired_token(), expired_token());
        let client = logged_in(ScriptedTransport::default(), &tokens).await;

        assert_eq!(client.refresh_session().await.unwrap(), None);
        assert_eq!(client.tokens().await.unwrap(), None);
        assert_eq!(client.transport().count("refreshTokens"), 0);
    }

    #[tokio::test]
    async fn server_rejected_refresh_token_clears_session() {
        let tokens = TokenPair::new(expired_token(), "opaque-refresh");
        let transport = ScriptedTransport::default().on_refresh(Err(Error::RefreshTokenExpired));
        let client = logged_in(transport, &tokens).await;

        assert_eq!(client.refresh_session().await.unwrap(), None);
        assert_eq!(client.tokens().await.unwrap(), None);
        assert_eq!(client.transport().count("refreshTokens"), 1);
    }

    #[tokio::test]
    async fn other_refresh_failures_leave_tokens_alone() {
        let tokens = TokenPair::new(expired_token(), "R");
        let transport = ScriptedTransport::default()
            .on_refresh(Err(Error::transport("refreshTokens", "connection reset")));
        let client = logged_in(transport, &tokens).await;

        let err = client.refresh_session().await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(client.tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn undecodable_access_token_is_an_error() {
        let tokens = TokenPair::new("not-a-jwt", "R");
        let client = logged_in(ScriptedTransport::default(), &tokens).await;

        assert!(matches!(client.refresh_session().await, Err(Error::Token(_))));
        assert_eq!(client.tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn impersonate_then_stop_restores_original() {
        let original = TokenPair::new(fresh_token(), "R");
        let impersonated = TokenPair::new(fresh_token(), "IR");
        let transport = ScriptedTransport::default()
            .on_impersonate(Ok(ImpersonationResult::authorized(impersonated.clone())));
        let client = logged_in(transport, &original).await;

        let target = ImpersonationTarget::Username("ada".into());
        let result = client.impersonate(&target).await.unwrap();
        assert!(result.authorized);
        assert!(client.is_impersonating().await.unwrap());
        assert_eq!(client.tokens().await.unwrap(), Some(impersonated));
        assert_eq!(
            client.transport().last_args("impersonate"),
            Some(vec![original.access_token.clone()])
        );

        client.stop_impersonation().await.unwrap();
        assert_eq!(client.tokens().await.unwrap(), Some(original));
        assert!(!client.is_impersonating().await.unwrap());
        assert_eq!(client.token_store().storage().len().await, 2);
    }

    #[tokio::test]
    async fn impersonate_requires_session() {
        let client = client(ScriptedTransport::default());
        let err = client
            .impersonate(&ImpersonationTarget::UserId("u2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoAccessToken));
        assert_eq!(client.transport().count("impersonate"), 0);
    }

    #[tokio::test]
    async fn impersonate_twice_is_rejected() {
        let original = TokenPair::new(fresh_token(), "R");
        let transport = ScriptedTransport::default()
            .on_impersonate(Ok(ImpersonationResult::authorized(TokenPair::new(fresh_token(), "IR"))));
        let client = logged_in(transport, &original).await;
        let target = ImpersonationTarget::Email("ada@example.com".into());

        client.impersonate(&target).await.unwrap();
        let err = client.impersonate(&target).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyImpersonating));
        assert_eq!(client.transport().count("impersonate"), 1);
    }

    #[tokio::test]
    async fn unauthorized_impersonation_changes_nothing() {
        let original = TokenPair::new(fresh_token(), "R");
        let transport =
            ScriptedTransport::default().on_impersonate(Ok(ImpersonationResult::denied()));
        let client = logged_in(transport, &original).await;

        let err = client
            .impersonate(&ImpersonationTarget::UserId("u2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ImpersonationUnauthorized));
        assert_eq!(client.tokens().await.unwrap(), Some(original));
        assert!(!client.is_impersonating().await.unwrap());
    }

    #[tokio::test]
    async fn authorized_without_tokens_changes_nothing() {
        let original = TokenPair::new(fresh_token(), "R");
        let mut result = ImpersonationResult::denied();
        result.authorized = true;
        let transport = ScriptedTransport::default().on_impersonate(Ok(result));
        let client = logged_in(transport, &original).await;

        let err = client
            .impersonate(&ImpersonationTarget::UserId("u2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(client.tokens().await.unwrap(), Some(original));
        assert!(!client.is_impersonating().await.unwrap());
    }

    #[tokio::test]
    async fn impersonate_refreshes_expired_session_first() {
        let stale = TokenPair::new(expired_token(), "R");
        let refreshed = TokenPair::new(fresh_token(), "R2");
        let impersonated = TokenPair::new(fresh_token(), "IR");
        let transport = ScriptedTransport::default()
            .on_refresh(Ok(refreshed.clone()))
            .on_impersonate(Ok(ImpersonationResult::authorized(impersonated.clone())));
        let client = logged_in(transport, &stale).await;

        client
            .impersonate(&ImpersonationTarget::Username("ada".into()))
            .await
            .unwrap();
        assert_eq!(
            client.transport().last_args("impersonate"),
            Some(vec![refreshed.access_token.clone()])
        );
        assert_eq!(
            client.token_store().get(Slot::Original).await.unwrap(),
            Some(refreshed)
        );
        assert_eq!(client.tokens().await.unwrap(), Some(impersonated));
    }

    #[tokio::test]
    async fn impersonate_with_dead_refresh_token_is_rejected() {
        let stale = TokenPair::new(expired_token(), "opaque-refresh");
        let transport = ScriptedTransport::default().on_refresh(Err(Error::RefreshTokenExpired));
        let client = logged_in(transport, &stale).await;

        let err = client
            .impersonate(&ImpersonationTarget::UserId("u2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoAccessToken));
        assert_eq!(client.transport().count("impersonate"), 0);
        assert_eq!(client.tokens().await.unwrap(), None);
        assert!(!client.is_impersonating().await.unwrap());
    }

    #[tokio::test]
    async fn expired_impersonation_does_not_leak_into_next_login() {
        let admin = TokenPair::new(fresh_token(), "R");
        let impersonated = TokenPair::new(expired_token(), "IR");
        let bob = TokenPair::new(fresh_token(), "BR");
        let transport = ScriptedTransport::default()
            .on_impersonate(Ok(ImpersonationResult::authorized(impersonated)))
            .on_refresh(Err(Error::RefreshTokenExpired))
            .on_authenticate(Ok(AuthenticationOutcome::LoggedIn(LoginResult::new(
                "s2",
                bob.clone(),
                User::new("bob"),
            ))));
        let client = logged_in(transport, &admin).await;

        client
            .impersonate(&ImpersonationTarget::Username("ada".into()))
            .await
            .unwrap();
        assert_eq!(client.refresh_session().await.unwrap(), None);
        assert!(!client.is_impersonating().await.unwrap());

        client
            .login_with_service("password", &serde_json::json!({ "password": "pw" }))
            .await
            .unwrap();
        assert!(!client.is_impersonating().await.unwrap());

        client.stop_impersonation().await.unwrap();
        assert_eq!(client.tokens().await.unwrap(), Some(bob));
    }

    #[tokio::test]
    async fn login_during_impersonation_drops_the_original() {
        let admin = TokenPair::new(fresh_token(), "R");
        let bob = TokenPair::new(fresh_token(), "BR");
        let transport = ScriptedTransport::default()
            .on_impersonate(Ok(ImpersonationResult::authorized(TokenPair::new(
                fresh_token(),
                "IR",
            ))))
            .with_reset_login(LoginResult::new("s2", bob.clone(), User::new("bob")));
        let client = logged_in(transport, &admin).await;

        client
            .impersonate(&ImpersonationTarget::UserId("u2".into()))
            .await
            .unwrap();
        client.reset_password("reset-token", "new").await.unwrap();

        assert!(!client.is_impersonating().await.unwrap());
        assert_eq!(client.tokens().await.unwrap(), Some(bob));
        assert_eq!(client.token_store().storage().len().await, 2);
    }

    #[tokio::test]
    async fn stop_without_impersonation_is_noop() {
        let tokens = TokenPair::new(fresh_token(), "R");
        let client = logged_in(ScriptedTransport::default(), &tokens).await;
        client.stop_impersonation().await.unwrap();
        assert_eq!(client.tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn login_stores_tokens() {
        let tokens = TokenPair::new(fresh_token(), "R");
        let login = LoginResult::new("s1", tokens.clone(), User::new("u1"));
        let transport = ScriptedTransport::default()
            .on_authenticate(Ok(AuthenticationOutcome::LoggedIn(login)));
        let client = client(transport);

        let outcome = client
            .login_with_service("password", &serde_json::json!({ "password": "pw" }))
            .await
            .unwrap();
        assert!(matches!(outcome, AuthenticationOutcome::LoggedIn(_)));
        assert_eq!(client.tokens().await.unwrap(), Some(tokens));
        assert_eq!(
            client.transport().last_args("authenticate"),
            Some(vec!["password".to_string()])
        );
    }

    #[tokio::test]
    async fn login_requiring_mfa_stores_nothing() {
        let transport = ScriptedTransport::default().on_authenticate(Ok(
            AuthenticationOutcome::MultiFactorRequired {
                mfa_token: "mfa".into(),
            },
        ));
        let client = client(transport);

        client
            .login_with_service("password", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(client.tokens().await.unwrap(), None);

        let challenge = client.mfa_challenge("mfa", "auth-1").await.unwrap();
        assert_eq!(challenge["authenticatorId"], "auth-1");
    }

    #[tokio::test]
    async fn create_user_stores_tokens_when_logged_in() {
        let tokens = TokenPair::new(fresh_token(), "R");
        let login = LoginResult::new("s1", tokens.clone(), User::new("u1"));
        let transport = ScriptedTransport::default()
            .on_create_user(Ok(CreateUserResult::new(None, None)))
            .on_create_user(Ok(CreateUserResult::new(None, Some(login))));
        let client = client(transport);
        let user = CreateUser::default().with_email("ada@example.com");

        client.create_user(&user).await.unwrap();
        assert_eq!(client.tokens().await.unwrap(), None);

        client.create_user(&user).await.unwrap();
        assert_eq!(client.tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn logout_clears_both_slots() {
        let original = TokenPair::new(fresh_token(), "R");
        let transport = ScriptedTransport::default()
            .on_impersonate(Ok(ImpersonationResult::authorized(TokenPair::new(fresh_token(), "IR"))));
        let client = logged_in(transport, &original).await;
        client
            .impersonate(&ImpersonationTarget::UserId("u2".into()))
            .await
            .unwrap();

        client.logout().await.unwrap();
        assert_eq!(client.transport().count("logout"), 1);
        assert!(client.token_store().storage().is_empty().await);
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let tokens = TokenPair::new(fresh_token(), "R");
        let transport = ScriptedTransport::default()
            .on_logout(Err(Error::transport("logout", "unavailable")));
        let client = logged_in(transport, &tokens).await;

        assert!(client.logout().await.is_err());
        assert_eq!(client.tokens().await.unwrap(), None);
    }

    #[tokio::test]
    async fn logout_without_session_skips_transport() {
        let client = client(ScriptedTransport::default());
        client.logout().await.unwrap();
        assert_eq!(client.transport().count("logout"), 0);
    }

    #[tokio::test]
    async fn get_user_refreshes_first() {
        let tokens = TokenPair::new(expired_token(), "R");
        let refreshed = TokenPair::new(fresh_token(), "R2");
        let transport = ScriptedTransport::default()
            .on_refresh(Ok(refreshed.clone()))
            .with_user(User::new("u1").with_username("ada"));
        let client = logged_in(transport, &tokens).await;

        let user = client.get_user().await.unwrap();
        assert_eq!(user.username.as_deref(), Some("ada"));
        assert_eq!(
            client.transport().last_args("getUser"),
            Some(vec![refreshed.access_token])
        );
    }

    #[tokio::test]
    async fn authenticated_calls_need_session() {
        let client = client(ScriptedTransport::default());
        assert!(matches!(client.get_user().await, Err(Error::NoSession)));
        assert!(matches!(
            client.change_password("old", "new").await,
            Err(Error::NoSession)
        ));
        assert!(matches!(
            client.add_email("ada@example.com").await,
            Err(Error::NoSession)
        ));
        assert!(matches!(client.authenticators().await, Err(Error::NoSession)));
        assert_eq!(client.transport().count("getUser"), 0);
    }

    #[tokio::test]
    async fn reset_password_stores_returned_session() {
        let tokens = TokenPair::new(fresh_token(), "R");
        let transport = ScriptedTransport::default()
            .with_reset_login(LoginResult::new("s1", tokens.clone(), User::new("u1")));
        let client = client(transport);

        let login = client.reset_password("reset-token", "new").await.unwrap();
        assert!(login.is_some());
        assert_eq!(client.tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn account_calls_forward_access_token() {
        let tokens = TokenPair::new(fresh_token(), "R");
        let client = logged_in(ScriptedTransport::default(), &tokens).await;

        client.add_email("second@example.com").await.unwrap();
        client.change_password("old", "new").await.unwrap();
        client
            .mfa_associate("otp", &serde_json::json!({}))
            .await
            .unwrap();
        client.verify_email("verify-token").await.unwrap();
        client.send_verification_email("ada@example.com").await.unwrap();
        client.send_reset_password_email("ada@example.com").await.unwrap();
        client.authenticators_by_mfa_token("mfa").await.unwrap();

        assert_eq!(
            client.transport().last_args("addEmail"),
            Some(vec![tokens.access_token.clone(), "second@example.com".into()])
        );
        assert_eq!(
            client.transport().last_args("mfaAssociate"),
            Some(vec![tokens.access_token.clone(), "otp".into()])
        );
        assert_eq!(client.transport().count("changePassword"), 1);
        assert_eq!(client.transport().count("verifyEmail"), 1);
    }
}
