/// Selection sets the GraphQL transport requests for server-defined shapes.
///
/// Servers that extend `User`, or register authenticators with their own
/// challenge/association payloads, plug in a custom strategy so the extra
/// fields come back. Unknown user fields surface in
/// [`User::extra`](crate::types::User::extra); challenge and association
/// results are returned as raw JSON.
///
/// ```rust,ignore
/// struct WithProfile;
///
/// impl Selections for WithProfile {
///     fn user_fields(&self) -> &str {
///         "id username emails { address verified } profile { firstName lastName }"
///     }
/// }
/// ```
pub trait Selections: Send + Sync {
    /// Fields selected on `User`.
    fn user_fields(&self) -> &str {
        DEFAULT_USER_FIELDS
    }

    /// Selection on the `mfaChallenge` result.
    fn challenge_fields(&self) -> &str {
        DEFAULT_CHALLENGE_FIELDS
    }

    /// Selection on the `mfaAssociate` result.
    fn association_fields(&self) -> &str {
        DEFAULT_ASSOCIATION_FIELDS
    }
}

pub const DEFAULT_USER_FIELDS: &str = "id emails { address verified } username";
pub const DEFAULT_CHALLENGE_FIELDS: &str =
    "... on DefaultChallengeResult { mfaToken authenticatorId }";
pub const DEFAULT_ASSOCIATION_FIELDS: &str =
    "... on OTPAssociationResult { mfaToken authenticatorId }";

/// The stock accounts server schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSelections;

impl Selections for DefaultSelections {}
