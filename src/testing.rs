//! Scripted transport for client tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::transport::Transport;
use crate::types::{
    AuthenticationOutcome, Authenticator, CreateUser, CreateUserResult, ImpersonationResult,
    ImpersonationTarget, LoginResult, TokenPair, User,
};

/// Replays queued responses and records every call by operation name.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    calls: Mutex<Vec<(&'static str, Vec<String>)>>,
    refresh: Mutex<VecDeque<Result<TokenPair, Error>>>,
    impersonate: Mutex<VecDeque<Result<ImpersonationResult, Error>>>,
    authenticate: Mutex<VecDeque<Result<AuthenticationOutcome, Error>>>,
    create_user: Mutex<VecDeque<Result<CreateUserResult, Error>>>,
    logout: Mutex<VecDeque<Result<(), Error>>>,
    user: Mutex<Option<User>>,
    reset_password: Mutex<Option<LoginResult>>,
}

impl ScriptedTransport {
    pub(crate) fn on_refresh(self, result: Result<TokenPair, Error>) -> Self {
        self.refresh.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_impersonate(self, result: Result<ImpersonationResult, Error>) -> Self {
        self.impersonate.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_authenticate(self, result: Result<AuthenticationOutcome, Error>) -> Self {
        self.authenticate.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_create_user(self, result: Result<CreateUserResult, Error>) -> Self {
        self.create_user.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn on_logout(self, result: Result<(), Error>) -> Self {
        self.logout.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_user(self, user: User) -> Self {
        *self.user.lock().unwrap() = Some(user);
        self
    }

    pub(crate) fn with_reset_login(self, login: LoginResult) -> Self {
        *self.reset_password.lock().unwrap() = Some(login);
        self
    }

    /// Number of calls recorded for `operation`.
    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }

    /// Arguments of the last call to `operation`.
    pub(crate) fn last_args(&self, operation: &str) -> Option<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(op, _)| *op == operation)
            .map(|(_, args)| args.clone())
    }

    fn record(&self, operation: &'static str, args: &[&str]) {
        self.calls
            .lock()
            .unwrap()
            .push((operation, args.iter().map(|s| s.to_string()).collect()));
    }
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, Error>>>, operation: &'static str) -> Result<T, Error> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(Error::transport(operation, "no scripted response")))
}

impl Transport for ScriptedTransport {
    async fn authenticate_with_service(
        &self,
        service: &str,
        _params: &JsonValue,
    ) -> Result<AuthenticationOutcome, Error> {
        self.record("authenticate", &[service]);
        next(&self.authenticate, "authenticate")
    }

    async fn create_user(&self, _user: &CreateUser) -> Result<CreateUserResult, Error> {
        self.record("createUser", &[]);
        next(&self.create_user, "createUser")
    }

    async fn refresh_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, Error> {
        self.record("refreshTokens", &[access_token, refresh_token]);
        next(&self.refresh, "refreshTokens")
    }

    async fn logout(&self, access_token: &str) -> Result<(), Error> {
        self.record("logout", &[access_token]);
        self.logout.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn impersonate(
        &self,
        access_token: &str,
        _target: &ImpersonationTarget,
    ) -> Result<ImpersonationResult, Error> {
        self.record("impersonate", &[access_token]);
        next(&self.impersonate, "impersonate")
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<User>, Error> {
        self.record("getUser", &[access_token]);
        Ok(self.user.lock().unwrap().clone())
    }

    async fn verify_email(&self, token: &str) -> Result<(), Error> {
        self.record("verifyEmail", &[token]);
        Ok(())
    }

    async fn send_verification_email(&self, email: &str) -> Result<(), Error> {
        self.record("sendVerificationEmail", &[email]);
        Ok(())
    }

    async fn send_reset_password_email(&self, email: &str) -> Result<(), Error> {
        self.record("sendResetPasswordEmail", &[email]);
        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        _new_password: &str,
    ) -> Result<Option<LoginResult>, Error> {
        self.record("resetPassword", &[token]);
        Ok(self.reset_password.lock().unwrap().clone())
    }

    async fn change_password(
        &self,
        access_token: &str,
        _old_password: &str,
        _new_password: &str,
    ) -> Result<(), Error> {
        self.record("changePassword", &[access_token]);
        Ok(())
    }

    async fn add_email(&self, access_token: &str, email: &str) -> Result<(), Error> {
        self.record("addEmail", &[access_token, email]);
        Ok(())
    }

    async fn authenticators(&self, access_token: &str) -> Result<Vec<Authenticator>, Error> {
        self.record("authenticators", &[access_token]);
        Ok(Vec::new())
    }

    async fn authenticators_by_mfa_token(
        &self,
        mfa_token: &str,
    ) -> Result<Vec<Authenticator>, Error> {
        self.record("authenticatorsByMfaToken", &[mfa_token]);
        Ok(Vec::new())
    }

    async fn mfa_associate(
        &self,
        access_token: &str,
        kind: &str,
        _params: &JsonValue,
    ) -> Result<JsonValue, Error> {
        self.record("mfaAssociate", &[access_token, kind]);
        Ok(serde_json::json!({ "id": "auth-1" }))
    }

    async fn mfa_challenge(
        &self,
        mfa_token: &str,
        authenticator_id: &str,
    ) -> Result<JsonValue, Error> {
        self.record("mfaChallenge", &[mfa_token, authenticator_id]);
        Ok(serde_json::json!({ "mfaToken": mfa_token, "authenticatorId": authenticator_id }))
    }
}
