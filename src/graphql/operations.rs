//! One type per GraphQL operation: its root field, document and decoded output.

use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value as JsonValue;

use super::selections::Selections;
use crate::types::{
    Authenticator, CreateUserResult, ImpersonationResult, LoginResult, TokenPair, User,
};

pub(super) trait Operation {
    /// Root field name; also sent as the GraphQL operation name.
    const NAME: &'static str;
    type Output: DeserializeOwned;

    fn document(selections: &dyn Selections) -> String;
}

const TOKEN_FIELDS: &str = "accessToken refreshToken";

fn login_result_fields(selections: &dyn Selections) -> String {
    format!(
        "sessionId tokens {{ {TOKEN_FIELDS} }} user {{ {} }}",
        selections.user_fields()
    )
}

/// `authenticate` answers with either union member.
#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub(super) enum AuthenticationResult {
    LoginResult(LoginResult),
    MultiFactorResult {
        #[serde(rename = "mfaToken")]
        mfa_token: String,
    },
}

#[derive(Debug, Deserialize)]
pub(super) struct RefreshedSession {
    pub(super) tokens: TokenPair,
}

pub(super) struct Authenticate;

impl Operation for Authenticate {
    const NAME: &'static str = "authenticate";
    type Output = AuthenticationResult;

    fn document(selections: &dyn Selections) -> String {
        format!(
            "mutation authenticate($serviceName: String!, $params: AuthenticateParamsInput!) {{ \
             authenticate(serviceName: $serviceName, params: $params) {{ __typename \
             ... on LoginResult {{ {} }} \
             ... on MultiFactorResult {{ mfaToken }} }} }}",
            login_result_fields(selections)
        )
    }
}

pub(super) struct CreateUserOp;

impl Operation for CreateUserOp {
    const NAME: &'static str = "createUser";
    type Output = CreateUserResult;

    fn document(selections: &dyn Selections) -> String {
        format!(
            "mutation createUser($user: CreateUserInput!) {{ \
             createUser(user: $user) {{ userId loginResult {{ {} }} }} }}",
            login_result_fields(selections)
        )
    }
}

pub(super) struct RefreshTokens;

impl Operation for RefreshTokens {
    const NAME: &'static str = "refreshTokens";
    type Output = RefreshedSession;

    fn document(_: &dyn Selections) -> String {
        format!(
            "mutation refreshTokens($accessToken: String!, $refreshToken: String!) {{ \
             refreshTokens(accessToken: $accessToken, refreshToken: $refreshToken) {{ \
             tokens {{ {TOKEN_FIELDS} }} }} }}"
        )
    }
}

pub(super) struct Logout;

impl Operation for Logout {
    const NAME: &'static str = "logout";
    type Output = IgnoredAny;

    fn document(_: &dyn Selections) -> String {
        "mutation logout { logout }".into()
    }
}

pub(super) struct Impersonate;

impl Operation for Impersonate {
    const NAME: &'static str = "impersonate";
    type Output = ImpersonationResult;

    fn document(selections: &dyn Selections) -> String {
        format!(
            "mutation impersonate($accessToken: String!, $impersonated: ImpersonationUserIdentityInput!) {{ \
             impersonate(accessToken: $accessToken, impersonated: $impersonated) {{ \
             authorized tokens {{ {TOKEN_FIELDS} }} user {{ {} }} }} }}",
            selections.user_fields()
        )
    }
}

pub(super) struct GetUser;

impl Operation for GetUser {
    const NAME: &'static str = "getUser";
    type Output = Option<User>;

    fn document(selections: &dyn Selections) -> String {
        format!("query getUser {{ getUser {{ {} }} }}", selections.user_fields())
    }
}

pub(super) struct VerifyEmail;

impl Operation for VerifyEmail {
    const NAME: &'static str = "verifyEmail";
    type Output = IgnoredAny;

    fn document(_: &dyn Selections) -> String {
        "mutation verifyEmail($token: String!) { verifyEmail(token: $token) }".into()
    }
}

pub(super) struct SendVerificationEmail;

impl Operation for SendVerificationEmail {
    const NAME: &'static str = "sendVerificationEmail";
    type Output = IgnoredAny;

    fn document(_: &dyn Selections) -> String {
        "mutation sendVerificationEmail($email: String!) { sendVerificationEmail(email: $email) }"
            .into()
    }
}

pub(super) struct SendResetPasswordEmail;

impl Operation for SendResetPasswordEmail {
    const NAME: &'static str = "sendResetPasswordEmail";
    type Output = IgnoredAny;

    fn document(_: &dyn Selections) -> String {
        "mutation sendResetPasswordEmail($email: String!) { sendResetPasswordEmail(email: $email) }"
            .into()
    }
}

pub(super) struct ResetPassword;

impl Operation for ResetPassword {
    const NAME: &'static str = "resetPassword";
    type Output = Option<LoginResult>;

    fn document(selections: &dyn Selections) -> String {
        format!(
            "mutation resetPassword($token: String!, $newPassword: String!) {{ \
             resetPassword(token: $token, newPassword: $newPassword) {{ {} }} }}",
            login_result_fields(selections)
        )
    }
}

pub(super) struct ChangePassword;

impl Operation for ChangePassword {
    const NAME: &'static str = "changePassword";
    type Output = IgnoredAny;

    fn document(_: &dyn Selections) -> String {
        "mutation changePassword($oldPassword: String!, $newPassword: String!) { \
         changePassword(oldPassword: $oldPassword, newPassword: $newPassword) }"
            .into()
    }
}

pub(super) struct AddEmail;

impl Operation for AddEmail {
    const NAME: &'static str = "addEmail";
    type Output = IgnoredAny;

    fn document(_: &dyn Selections) -> String {
        "mutation addEmail($newEmail: String!) { addEmail(newEmail: $newEmail) }".into()
    }
}

const AUTHENTICATOR_FIELDS: &str = "id type active activatedAt";

pub(super) struct Authenticators;

impl Operation for Authenticators {
    const NAME: &'static str = "authenticators";
    type Output = Option<Vec<Authenticator>>;

    fn document(_: &dyn Selections) -> String {
        format!("query authenticators {{ authenticators {{ {AUTHENTICATOR_FIELDS} }} }}")
    }
}

pub(super) struct AuthenticatorsByMfaToken;

impl Operation for AuthenticatorsByMfaToken {
    const NAME: &'static str = "authenticatorsByMfaToken";
    type Output = Option<Vec<Authenticator>>;

    fn document(_: &dyn Selections) -> String {
        format!(
            "query authenticatorsByMfaToken($mfaToken: String!) {{ \
             authenticatorsByMfaToken(mfaToken: $mfaToken) {{ {AUTHENTICATOR_FIELDS} }} }}"
        )
    }
}

pub(super) struct MfaAssociate;

impl Operation for MfaAssociate {
    const NAME: &'static str = "mfaAssociate";
    type Output = JsonValue;

    fn document(selections: &dyn Selections) -> String {
        format!(
            "mutation mfaAssociate($type: String!, $params: AssociationParamsInput) {{ \
             mfaAssociate(type: $type, params: $params) {{ __typename {} }} }}",
            selections.association_fields()
        )
    }
}

pub(super) struct MfaChallenge;

impl Operation for MfaChallenge {
    const NAME: &'static str = "mfaChallenge";
    type Output = JsonValue;

    fn document(selections: &dyn Selections) -> String {
        format!(
            "mutation mfaChallenge($mfaToken: String!, $authenticatorId: String!) {{ \
             mfaChallenge(mfaToken: $mfaToken, authenticatorId: $authenticatorId) {{ __typename {} }} }}",
            selections.challenge_fields()
        )
    }
}
