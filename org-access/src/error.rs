//! Error taxonomy surfaced to tool callers.

use std::fmt::{self, Display, Formatter};

use org_provider::BackendError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for access-layer operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Why a directory operation was refused locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The caller is not the organization's management account.
    NotMasterAccount,
    /// The caller's account has no organization to administer.
    OrganizationsNotEnabled,
}

impl DenialReason {
    /// Returns the stable snake_case label of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotMasterAccount => "not_master_account",
            Self::OrganizationsNotEnabled => "organizations_not_enabled",
        }
    }
}

impl Display for DenialReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local authorization failure; never reaches the provider.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("directory operation not authorized: {reason}")]
pub struct AuthorizationError {
    reason: DenialReason,
}

impl AuthorizationError {
    /// Creates an authorization failure for `reason`.
    #[must_use]
    pub const fn new(reason: DenialReason) -> Self {
        Self { reason }
    }

    /// Returns why the operation was refused.
    #[must_use]
    pub const fn reason(&self) -> DenialReason {
        self.reason
    }
}

/// Failures returned by the access layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No credentials could be resolved for the configured profile.
    #[error("AWS credentials not found: {reason}")]
    CredentialsMissing {
        /// Context from the credential chain.
        reason: String,
    },

    /// The account has not enabled AWS Organizations.
    #[error("AWS Organizations is not enabled for this account")]
    OrganizationsNotEnabled,

    /// The provider refused the request for lack of permissions.
    #[error("access denied by AWS Organizations: {message}")]
    AccessDenied {
        /// Provider message, passed through unchanged.
        message: String,
    },

    /// The local master-account policy refused the request.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// The requested policy id does not exist.
    #[error("policy `{policy_id}` was not found")]
    PolicyNotFound {
        /// Identifier that missed.
        policy_id: String,
    },

    /// Any other provider failure.
    #[error("AWS Organizations API error {code}: {message}")]
    Provider {
        /// Provider error code, preserved verbatim.
        code: String,
        /// Provider error message.
        message: String,
    },

    /// Anything unanticipated.
    #[error("unexpected error: {reason}")]
    Internal {
        /// Human-readable description.
        reason: String,
    },
}

impl AccessError {
    /// Convenience constructor for unanticipated failures.
    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Classifies a provider failure from a detail lookup of `policy_id`.
    ///
    /// Identical to the [`From<BackendError>`] conversion except that an
    /// unknown policy id becomes [`AccessError::PolicyNotFound`].
    #[must_use]
    pub fn from_policy_lookup(err: BackendError, policy_id: &str) -> Self {
        if err.is_policy_not_found() {
            return Self::PolicyNotFound {
                policy_id: policy_id.to_owned(),
            };
        }
        Self::from(err)
    }

    /// Returns the stable snake_case kind used in tool responses.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CredentialsMissing { .. } => "credentials_missing",
            Self::OrganizationsNotEnabled => "organizations_not_enabled",
            Self::AccessDenied { .. } => "access_denied",
            Self::Authorization(_) => "authorization_error",
            Self::PolicyNotFound { .. } => "policy_not_found",
            Self::Provider { .. } => "provider_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Returns a remediation hint for user-facing output, when one applies.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CredentialsMissing { .. } => {
                Some("Check AWS_PROFILE or configure AWS credentials for the profile.")
            }
            Self::OrganizationsNotEnabled
            | Self::Authorization(AuthorizationError {
                reason: DenialReason::OrganizationsNotEnabled,
            }) => Some("Enable AWS Organizations or use credentials of an organization member."),
            Self::Authorization(AuthorizationError {
                reason: DenialReason::NotMasterAccount,
            }) => Some(
                "Use credentials of the organization's management account or set MASTER_ACCOUNT_ONLY=false.",
            ),
            Self::AccessDenied { .. } => {
                Some("Grant the principal organizations:List* and organizations:Describe* permissions.")
            }
            Self::PolicyNotFound { .. } | Self::Provider { .. } | Self::Internal { .. } => None,
        }
    }
}

impl From<BackendError> for AccessError {
    fn from(err: BackendError) -> Self {
        if err.is_organizations_not_in_use() {
            return Self::OrganizationsNotEnabled;
        }

        let access_denied = err.is_access_denied();
        match err {
            BackendError::NoCredentials { reason } => Self::CredentialsMissing { reason },
            BackendError::Service { message, .. } if access_denied => Self::AccessDenied { message },
            BackendError::Service { code, message } => Self::Provider { code, message },
            BackendError::Transport { reason } => Self::Internal { reason },
        }
    }
}
