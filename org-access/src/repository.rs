//! Policy repository over the Organizations control plane.

use std::fmt;
use std::sync::Arc;

use org_primitives::{AccountId, PolicyDetail, PolicySummary, PolicyType};
use org_provider::{IdentityClient, OrganizationsClient};

use crate::error::{AccessError, AccessResult};
use crate::guard::AuthorizationGuard;

/// Lists and fetches organization policies.
///
/// Listings are privileged and pass through the [`AuthorizationGuard`];
/// detail reads are not.
pub struct PolicyRepository {
    client: Arc<dyn OrganizationsClient>,
    identity: Arc<dyn IdentityClient>,
    guard: AuthorizationGuard,
}

impl fmt::Debug for PolicyRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRepository")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl PolicyRepository {
    /// Creates a repository over the supplied clients.
    #[must_use]
    pub fn new(
        client: Arc<dyn OrganizationsClient>,
        identity: Arc<dyn IdentityClient>,
        guard: AuthorizationGuard,
    ) -> Self {
        Self {
            client,
            identity,
            guard,
        }
    }

    /// Lists every policy of `filter` type on behalf of the current credentials.
    ///
    /// The caller identity is resolved afresh when the master-account policy
    /// is enforced, so rotated credentials are re-authorized on each call.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Authorization`] without issuing any listing call
    /// when the guard refuses the caller, and the classified provider failure
    /// otherwise.
    pub async fn list_policies(&self, filter: PolicyType) -> AccessResult<Vec<PolicySummary>> {
        if self.guard.is_enforced() {
            let caller = self.identity.caller_identity().await?;
            self.guard
                .authorize_directory_operation(caller.account_id())
                .await?;
        }
        self.drain(filter).await
    }

    /// Lists every policy of `filter` type on behalf of an already resolved caller.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list_policies`].
    pub async fn list_policies_for(
        &self,
        caller: &AccountId,
        filter: PolicyType,
    ) -> AccessResult<Vec<PolicySummary>> {
        self.guard.authorize_directory_operation(caller).await?;
        self.drain(filter).await
    }

    /// Fetches one policy including its document.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::PolicyNotFound`] for an unknown id,
    /// [`AccessError::AccessDenied`] for permission failures, and
    /// [`AccessError::Provider`] for any other provider error.
    pub async fn get_policy(&self, policy_id: &str) -> AccessResult<PolicyDetail> {
        self.client
            .describe_policy(policy_id)
            .await
            .map_err(|err| AccessError::from_policy_lookup(err, policy_id))
    }

    /// Fetches pages until the provider stops returning a continuation token.
    async fn drain(&self, filter: PolicyType) -> AccessResult<Vec<PolicySummary>> {
        let mut policies = Vec::new();
        let mut next_token = None;

        loop {
            let page = self.client.list_policies_page(&filter, next_token).await?;
            policies.extend(page.policies);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(policies),
            }
        }
    }
}
