//! GraphQL transport for the accounts server schema.

mod operations;
mod selections;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use self::operations::{
    AddEmail, Authenticate, AuthenticationResult, AuthenticatorsByMfaToken, Authenticators,
    ChangePassword, CreateUserOp, GetUser, Impersonate, Logout, MfaAssociate, MfaChallenge,
    Operation, RefreshTokens, ResetPassword, SendResetPasswordEmail, SendVerificationEmail,
    VerifyEmail,
};
pub use self::selections::{
    DEFAULT_ASSOCIATION_FIELDS, DEFAULT_CHALLENGE_FIELDS, DEFAULT_USER_FIELDS, DefaultSelections,
    Selections,
};
use crate::error::Error;
use crate::transport::Transport;
use crate::types::{
    AuthenticationOutcome, Authenticator, CreateUser, CreateUserResult, ImpersonationResult,
    ImpersonationTarget, LoginResult, TokenPair, User,
};

pub const ENV_GRAPHQL_URL: &str = "ACCOUNTS_GRAPHQL_URL";
pub const ENV_GRAPHQL_TIMEOUT_SECS: &str = "ACCOUNTS_GRAPHQL_TIMEOUT_SECS";

/// Error codes the server uses when a refresh token can no longer be used.
const REFRESH_REJECTED_CODES: &[&str] = &[
    "TokenVerificationFailed",
    "InvalidTokens",
    "InvalidSession",
    "SessionNotFound",
];

/// GraphQL transport configuration.
///
/// The endpoint is a constructor parameter; everything else is optional.
///
/// ```rust,ignore
/// let config = GraphQlConfig::new("https://api.example.com/graphql".parse()?)
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct GraphQlConfig {
    pub(crate) endpoint: Url,
    pub(crate) timeout: Option<Duration>,
    pub(crate) selections: Arc<dyn Selections>,
}

impl std::fmt::Debug for GraphQlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQlConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("user_fields", &self.selections.user_fields())
            .finish()
    }
}

impl GraphQlConfig {
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: None,
            selections: Arc::new(DefaultSelections),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `ACCOUNTS_GRAPHQL_URL`: GraphQL endpoint of the accounts server
    ///
    /// # Optional env vars
    /// - `ACCOUNTS_GRAPHQL_TIMEOUT_SECS`: per-request timeout in seconds
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is missing or invalid, or the
    /// timeout is not a positive integer.
    pub fn from_env() -> Result<Self, Error> {
        let endpoint = parse_endpoint(std::env::var(ENV_GRAPHQL_URL).ok())?;
        let mut config = Self::new(endpoint);
        if let Some(timeout) = parse_timeout(std::env::var(ENV_GRAPHQL_TIMEOUT_SECS).ok())? {
            config = config.with_timeout(timeout);
        }
        Ok(config)
    }

    /// Per-request timeout. Without one a hung server blocks the call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the selection sets requested for users, MFA challenges and
    /// associations.
    #[must_use]
    pub fn with_selections(mut self, selections: impl Selections + 'static) -> Self {
        self.selections = Arc::new(selections);
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn selections(&self) -> &dyn Selections {
        self.selections.as_ref()
    }
}

fn parse_endpoint(value: Option<String>) -> Result<Url, Error> {
    let value = value.ok_or_else(|| Error::Config(format!("{ENV_GRAPHQL_URL} is required")))?;
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{ENV_GRAPHQL_URL}: {e}")))
}

fn parse_timeout(value: Option<String>) -> Result<Option<Duration>, Error> {
    let Some(value) = value else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(|secs| Some(Duration::from_secs(secs)))
        .ok_or_else(|| {
            Error::Config(format!("{ENV_GRAPHQL_TIMEOUT_SECS} must be a positive integer"))
        })
}

/// [`Transport`] speaking the accounts server's GraphQL schema over HTTP.
pub struct GraphQlTransport {
    config: GraphQlConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a> {
    query: &'a str,
    operation_name: &'static str,
    variables: JsonValue,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<serde_json::Map<String, JsonValue>>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    extensions: Option<JsonValue>,
}

impl GraphQlError {
    /// Machine-readable code, from `extensions.code` or the older
    /// `extensions.exception.code`.
    fn code(&self) -> Option<&str> {
        let extensions = self.extensions.as_ref()?;
        extensions
            .get("code")
            .or_else(|| extensions.get("exception").and_then(|e| e.get("code")))
            .and_then(JsonValue::as_str)
    }
}

impl GraphQlTransport {
    #[must_use]
    pub fn new(config: GraphQlConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &GraphQlConfig {
        &self.config
    }

    async fn execute<O: Operation>(
        &self,
        variables: JsonValue,
        access_token: Option<&str>,
    ) -> Result<O::Output, Error> {
        let query = O::document(self.config.selections.as_ref());
        let body = GraphQlRequest {
            query: &query,
            operation_name: O::NAME,
            variables,
        };

        let mut request = self.http.post(self.config.endpoint.clone()).json(&body);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!(operation = O::NAME, "Sending accounts GraphQL request");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Servers may answer a failed operation with a non-2xx status and a
        // regular GraphQL error body; prefer the structured errors when present.
        let parsed = serde_json::from_str::<GraphQlResponse>(&text);
        if !status.is_success() && !parsed.as_ref().is_ok_and(|p| !p.errors.is_empty()) {
            return Err(Error::Transport {
                operation: O::NAME,
                status: Some(status.as_u16()),
                detail: text,
            });
        }
        let mut parsed =
            parsed.map_err(|e| Error::transport(O::NAME, format!("invalid response: {e}")))?;

        if !parsed.errors.is_empty() {
            return Err(Self::map_errors(O::NAME, &parsed.errors));
        }

        let field = parsed
            .data
            .as_mut()
            .and_then(|data| data.remove(O::NAME))
            .unwrap_or(JsonValue::Null);
        serde_json::from_value(field)
            .map_err(|e| Error::transport(O::NAME, format!("invalid response: {e}")))
    }

    fn map_errors(operation: &'static str, errors: &[GraphQlError]) -> Error {
        if operation == RefreshTokens::NAME
            && errors
                .iter()
                .filter_map(GraphQlError::code)
                .any(|code| REFRESH_REJECTED_CODES.contains(&code))
        {
            return Error::RefreshTokenExpired;
        }

        let detail = errors
            .iter()
            .map(|e| match e.code() {
                Some(code) => format!("{} ({code})", e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        Error::transport(operation, detail)
    }
}

impl Transport for GraphQlTransport {
    async fn authenticate_with_service(
        &self,
        service: &str,
        params: &JsonValue,
    ) -> Result<AuthenticationOutcome, Error> {
        let variables = serde_json::json!({ "serviceName": service, "params": params });
        Ok(match self.execute::<Authenticate>(variables, None).await? {
            AuthenticationResult::LoginResult(login) => AuthenticationOutcome::LoggedIn(login),
            AuthenticationResult::MultiFactorResult { mfa_token } => {
                AuthenticationOutcome::MultiFactorRequired { mfa_token }
            }
        })
    }

    async fn create_user(&self, user: &CreateUser) -> Result<CreateUserResult, Error> {
        self.execute::<CreateUserOp>(serde_json::json!({ "user": user }), None)
            .await
    }

    async fn refresh_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, Error> {
        let variables = serde_json::json!({
            "accessToken": access_token,
            "refreshToken": refresh_token,
        });
        let refreshed = self.execute::<RefreshTokens>(variables, None).await?;
        Ok(refreshed.tokens)
    }

    async fn logout(&self, access_token: &str) -> Result<(), Error> {
        self.execute::<Logout>(serde_json::json!({}), Some(access_token))
            .await
            .map(|_| ())
    }

    async fn impersonate(
        &self,
        access_token: &str,
        target: &ImpersonationTarget,
    ) -> Result<ImpersonationResult, Error> {
        let variables = serde_json::json!({
            "accessToken": access_token,
            "impersonated": target,
        });
        self.execute::<Impersonate>(variables, Some(access_token))
            .await
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<User>, Error> {
        self.execute::<GetUser>(serde_json::json!({}), Some(access_token))
            .await
    }

    async fn verify_email(&self, token: &str) -> Result<(), Error> {
        self.execute::<VerifyEmail>(serde_json::json!({ "token": token }), None)
            .await
            .map(|_| ())
    }

    async fn send_verification_email(&self, email: &str) -> Result<(), Error> {
        self.execute::<SendVerificationEmail>(serde_json::json!({ "email": email }), None)
            .await
            .map(|_| ())
    }

    async fn send_reset_password_email(&self, email: &str) -> Result<(), Error> {
        self.execute::<SendResetPasswordEmail>(serde_json::json!({ "email": email }), None)
            .await
            .map(|_| ())
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<LoginResult>, Error> {
        let variables = serde_json::json!({ "token": token, "newPassword": new_password });
        self.execute::<ResetPassword>(variables, None).await
    }

    async fn change_password(
        &self,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        let variables = serde_json::json!({
            "oldPassword": old_password,
            "newPassword": new_password,
        });
        self.execute::<ChangePassword>(variables, Some(access_token))
            .await
            .map(|_| ())
    }

    async fn add_email(&self, access_token: &str, email: &str) -> Result<(), Error> {
        self.execute::<AddEmail>(serde_json::json!({ "newEmail": email }), Some(access_token))
            .await
            .map(|_| ())
    }

    async fn authenticators(&self, access_token: &str) -> Result<Vec<Authenticator>, Error> {
        self.execute::<Authenticators>(serde_json::json!({}), Some(access_token))
            .await
            .map(Option::unwrap_or_default)
    }

    async fn authenticators_by_mfa_token(
        &self,
        mfa_token: &str,
    ) -> Result<Vec<Authenticator>, Error> {
        self.execute::<AuthenticatorsByMfaToken>(serde_json::json!({ "mfaToken": mfa_token }), None)
            .await
            .map(Option::unwrap_or_default)
    }

    async fn mfa_associate(
        &self,
        access_token: &str,
        kind: &str,
        params: &JsonValue,
    ) -> Result<JsonValue, Error> {
        let variables = serde_json::json!({ "type": kind, "params": params });
        self.execute::<MfaAssociate>(variables, Some(access_token))
            .await
    }

    async fn mfa_challenge(
        &self,
        mfa_token: &str,
        authenticator_id: &str,
    ) -> Result<JsonValue, Error> {
        let variables = serde_json::json!({
            "mfaToken": mfa_token,
            "authenticatorId": authenticator_id,
        });
        self.execute::<MfaChallenge>(variables, None).await
    }
}
