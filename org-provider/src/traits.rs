//! Shared provider traits and data structures.

use async_trait::async_trait;
use org_primitives::{CallerIdentity, OrganizationDescriptor, PolicyDetail, PolicySummary, PolicyType};
use thiserror::Error;

/// Provider code reported when the account has not enabled Organizations.
pub const ORGANIZATIONS_NOT_IN_USE: &str = "AWSOrganizationsNotInUseException";
/// Provider code reported when a policy id does not exist.
pub const POLICY_NOT_FOUND: &str = "PolicyNotFoundException";
/// Provider codes reported for permission failures.
pub const ACCESS_DENIED_CODES: [&str; 2] = ["AccessDenied", "AccessDeniedException"];

/// Result alias used by provider clients.
pub type BackendResult<T> = Result<T, BackendError>;

/// Error type shared by provider implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No credentials could be resolved for the configured profile.
    #[error("no credentials available: {reason}")]
    NoCredentials {
        /// Additional context from the credential chain.
        reason: String,
    },

    /// The provider answered with an error code.
    #[error("{code}: {message}")]
    Service {
        /// Provider error code, preserved verbatim.
        code: String,
        /// Provider error message.
        message: String,
    },

    /// The request never produced a provider answer (network, timeout, malformed response).
    #[error("provider transport error: {reason}")]
    Transport {
        /// Additional context about the failure.
        reason: String,
    },
}

impl BackendError {
    /// Convenience constructor for credential failures.
    #[must_use]
    pub fn no_credentials(reason: impl Into<String>) -> Self {
        Self::NoCredentials {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for coded provider errors.
    #[must_use]
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Returns the provider error code, if the provider supplied one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns true when the provider reports that Organizations is not in use.
    #[must_use]
    pub fn is_organizations_not_in_use(&self) -> bool {
        self.code() == Some(ORGANIZATIONS_NOT_IN_USE)
    }

    /// Returns true for provider-level permission failures.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        self.code()
            .is_some_and(|code| ACCESS_DENIED_CODES.contains(&code))
    }

    /// Returns true when the provider reports an unknown policy id.
    #[must_use]
    pub fn is_policy_not_found(&self) -> bool {
        self.code() == Some(POLICY_NOT_FOUND)
    }
}

impl From<org_primitives::Error> for BackendError {
    fn from(err: org_primitives::Error) -> Self {
        Self::transport(format!("malformed provider response: {err}"))
    }
}

/// One page of a policy listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyPage {
    /// Policies on this page, in provider order.
    pub policies: Vec<PolicySummary>,
    /// Continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

impl PolicyPage {
    /// Creates a page with the supplied entries and continuation token.
    #[must_use]
    pub fn new(policies: Vec<PolicySummary>, next_token: Option<String>) -> Self {
        Self {
            policies,
            next_token,
        }
    }
}

/// Resolves the identity behind the current credentials.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Returns the account and principal the credentials resolve to.
    ///
    /// Implementations must not cache the answer; credentials may rotate
    /// between calls.
    async fn caller_identity(&self) -> BackendResult<CallerIdentity>;
}

/// Read-only view of the Organizations control plane.
///
/// No mutating call is part of this interface.
#[async_trait]
pub trait OrganizationsClient: Send + Sync {
    /// Describes the organization the credentials belong to.
    async fn describe_organization(&self) -> BackendResult<OrganizationDescriptor>;

    /// Fetches one page of policies of the given type.
    async fn list_policies_page(
        &self,
        filter: &PolicyType,
        next_token: Option<String>,
    ) -> BackendResult<PolicyPage>;

    /// Describes a single policy including its document.
    async fn describe_policy(&self, policy_id: &str) -> BackendResult<PolicyDetail>;
}
