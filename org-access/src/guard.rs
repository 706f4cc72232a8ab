//! Master-account authorization for directory operations.

use std::sync::Arc;

use org_primitives::AccountId;

use crate::directory::OrganizationDirectory;
use crate::error::{AccessResult, AuthorizationError, DenialReason};

/// Decides whether a caller may run privileged directory operations.
///
/// Evaluated on every call; the caller identity is never cached.
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    master_account_only: bool,
    directory: Arc<OrganizationDirectory>,
}

impl AuthorizationGuard {
    /// Creates a guard enforcing the master-account policy when `master_account_only` is set.
    #[must_use]
    pub fn new(master_account_only: bool, directory: Arc<OrganizationDirectory>) -> Self {
        Self {
            master_account_only,
            directory,
        }
    }

    /// Returns true when the master-account policy is enforced.
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.master_account_only
    }

    /// Authorizes `caller` for a directory operation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AccessError::Authorization`] with
    /// [`DenialReason::OrganizationsNotEnabled`] when no organization exists,
    /// or [`DenialReason::NotMasterAccount`] when `caller` is not the
    /// management account. Provider failures while resolving the organization
    /// are classified through the usual taxonomy.
    pub async fn authorize_directory_operation(&self, caller: &AccountId) -> AccessResult<()> {
        if !self.master_account_only {
            return Ok(());
        }

        match self.directory.descriptor().await? {
            None => Err(AuthorizationError::new(DenialReason::OrganizationsNotEnabled).into()),
            Some(descriptor) if descriptor.is_master_account(caller) => Ok(()),
            Some(_) => Err(AuthorizationError::new(DenialReason::NotMasterAccount).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use org_primitives::OrganizationDescriptor;
    use org_provider::memory::StaticOrganizations;

    use super::*;
    use crate::AccessError;

    const MASTER: &str = "111111111111";
    const MEMBER: &str = "222222222222";

    fn directory(with_org: bool) -> Arc<OrganizationDirectory> {
        let backend = if with_org {
            StaticOrganizations::with_organization(OrganizationDescriptor::new(
                "o-exampleorgid",
                "arn:aws:organizations::111111111111:organization/o-exampleorgid",
                AccountId::new(MASTER).unwrap(),
            ))
        } else {
            StaticOrganizations::new()
        };
        Arc::new(OrganizationDirectory::new(Arc::new(backend)))
    }

    fn account(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn denial(result: AccessResult<()>) -> Option<DenialReason> {
        match result {
            Err(AccessError::Authorization(err)) => Some(err.reason()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn disabled_policy_allows_everyone() {
        for with_org in [true, false] {
            let guard = AuthorizationGuard::new(false, directory(with_org));
            assert!(!guard.is_enforced());
            guard
                .authorize_directory_operation(&account(MEMBER))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn master_account_is_allowed() {
        let guard = AuthorizationGuard::new(true, directory(true));
        guard
            .authorize_directory_operation(&account(MASTER))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn member_account_is_refused() {
        let guard = AuthorizationGuard::new(true, directory(true));
        let result = guard.authorize_directory_operation(&account(MEMBER)).await;
        assert_eq!(denial(result), Some(DenialReason::NotMasterAccount));
    }

    #[tokio::test]
    async fn missing_organization_is_refused() {
        let guard = AuthorizationGuard::new(true, directory(false));
        let result = guard.authorize_directory_operation(&account(MASTER)).await;
        assert_eq!(denial(result), Some(DenialReason::OrganizationsNotEnabled));
    }
}
