//! Organizations access layer.
//!
//! Talks to the Organizations control plane through the provider seam,
//! restricts directory operations to the management account, memoizes the
//! organization descriptor, drains paginated policy listings, and converts
//! provider failures into [`AccessError`]. Nothing in this crate logs; callers
//! decide how outcomes are presented.

#![warn(missing_docs, clippy::pedantic)]

pub mod directory;
pub mod document;
pub mod error;
pub mod guard;
pub mod health;
pub mod repository;

use std::sync::Arc;

use org_config::ServiceConfig;
use org_primitives::{PolicyDetail, PolicySummary, PolicyType};
use org_provider::{IdentityClient, OrganizationsClient};

pub use directory::OrganizationDirectory;
pub use document::{ValidationReport, validate_policy_document};
pub use error::{AccessError, AccessResult, AuthorizationError, DenialReason};
pub use guard::AuthorizationGuard;
pub use health::{
    EffectiveConfig, FailureKind, HealthReport, HealthReporter, HealthySnapshot,
    OrganizationsState, OrganizationsStatus, UnhealthySnapshot,
};
pub use repository::PolicyRepository;

/// Entry point bundling every access-layer component over one session.
///
/// Constructed once by the process and shared by all tool invocations.
#[derive(Debug)]
pub struct OrganizationsAccess {
    directory: Arc<OrganizationDirectory>,
    policies: PolicyRepository,
    health: HealthReporter,
}

impl OrganizationsAccess {
    /// Wires the components over the supplied provider clients.
    #[must_use]
    pub fn new(
        config: &ServiceConfig,
        organizations: Arc<dyn OrganizationsClient>,
        identity: Arc<dyn IdentityClient>,
    ) -> Self {
        let directory = Arc::new(OrganizationDirectory::new(Arc::clone(&organizations)));
        let guard = AuthorizationGuard::new(config.master_account_only(), Arc::clone(&directory));
        let policies = PolicyRepository::new(organizations, Arc::clone(&identity), guard);
        let health = HealthReporter::new(config, identity, Arc::clone(&directory));

        Self {
            directory,
            policies,
            health,
        }
    }

    /// Returns the organization directory cache.
    #[must_use]
    pub fn directory(&self) -> &OrganizationDirectory {
        &self.directory
    }

    /// Returns the policy repository.
    #[must_use]
    pub fn policies(&self) -> &PolicyRepository {
        &self.policies
    }

    /// Lists policies of `filter` type on behalf of the current credentials.
    ///
    /// # Errors
    ///
    /// See [`PolicyRepository::list_policies`].
    pub async fn list_policies(&self, filter: PolicyType) -> AccessResult<Vec<PolicySummary>> {
        self.policies.list_policies(filter).await
    }

    /// Fetches one policy including its document.
    ///
    /// # Errors
    ///
    /// See [`PolicyRepository::get_policy`].
    pub async fn get_policy(&self, policy_id: &str) -> AccessResult<PolicyDetail> {
        self.policies.get_policy(policy_id).await
    }

    /// Produces a diagnostic snapshot of session, identity, and organization.
    pub async fn check_health(&self) -> HealthReport {
        self.health.check().await
    }
}
