use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Access/refresh token tuple issued by the accounts server.
///
/// Replaced wholesale on login, refresh and impersonation; never edited field
/// by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Server-side user identifier (opaque string).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Server-side session identifier (opaque string).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub address: String,
    #[serde(default)]
    pub verified: bool,
}

/// User as returned by the accounts server.
///
/// Fields selected beyond the stock user selection set land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub emails: Vec<EmailRecord>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            username: None,
            emails: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, address: impl Into<String>, verified: bool) -> Self {
        self.emails.push(EmailRecord {
            address: address.into(),
            verified,
        });
        self
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct LoginResult {
    pub session_id: SessionId,
    pub tokens: TokenPair,
    pub user: User,
}

impl LoginResult {
    #[must_use]
    pub fn new(session_id: impl Into<String>, tokens: TokenPair, user: User) -> Self {
        Self {
            session_id: SessionId(session_id.into()),
            tokens,
            user,
        }
    }
}

/// Outcome of `authenticate`: either a session, or a second factor is needed.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationOutcome {
    LoggedIn(LoginResult),
    MultiFactorRequired { mfa_token: String },
}

/// Account to create on the server.
///
/// `extra` carries custom registration fields understood by the server.
#[derive(Debug, Clone, Default, Serialize)]
#[non_exhaustive]
pub struct CreateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CreateUser {
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CreateUserResult {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub login_result: Option<LoginResult>,
}

impl CreateUserResult {
    #[must_use]
    pub fn new(user_id: Option<UserId>, login_result: Option<LoginResult>) -> Self {
        Self {
            user_id,
            login_result,
        }
    }
}

/// Identity to impersonate. The server resolves exactly one lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImpersonationTarget {
    #[serde(rename = "userId")]
    UserId(String),
    #[serde(rename = "username")]
    Username(String),
    #[serde(rename = "email")]
    Email(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[non_exhaustive]
pub struct ImpersonationResult {
    pub authorized: bool,
    #[serde(default)]
    pub tokens: Option<TokenPair>,
    #[serde(default)]
    pub user: Option<User>,
}

impl ImpersonationResult {
    #[must_use]
    pub fn authorized(tokens: TokenPair) -> Self {
        Self {
            authorized: true,
            tokens: Some(tokens),
            user: None,
        }
    }

    #[must_use]
    pub fn denied() -> Self {
        Self {
            authorized: false,
            tokens: None,
            user: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }
}

/// Second factor registered for a user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Authenticator {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub activated_at: Option<String>,
}
