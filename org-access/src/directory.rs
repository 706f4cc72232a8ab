//! Organization directory cache.

use std::fmt;
use std::sync::Arc;

use org_primitives::{AccountId, OrganizationDescriptor};
use org_provider::{BackendResult, OrganizationsClient};
use tokio::sync::OnceCell;

/// Memoizes the organization descriptor for the lifetime of the service.
///
/// The cell is filled at most once. Concurrent callers share one in-flight
/// fetch; a failed or cancelled fetch leaves the cell empty for the next
/// caller. An account without an organization is reported as `None` and is
/// not cached, so a later call probes again. A filled cell is never
/// invalidated.
pub struct OrganizationDirectory {
    client: Arc<dyn OrganizationsClient>,
    descriptor: OnceCell<OrganizationDescriptor>,
}

impl fmt::Debug for OrganizationDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrganizationDirectory")
            .field("descriptor", &self.descriptor.get())
            .finish_non_exhaustive()
    }
}

impl OrganizationDirectory {
    /// Creates an empty directory over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn OrganizationsClient>) -> Self {
        Self {
            client,
            descriptor: OnceCell::new(),
        }
    }

    /// Returns the organization descriptor, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Propagates any provider failure other than "Organizations not in use"
    /// unmodified.
    pub async fn descriptor(&self) -> BackendResult<Option<&OrganizationDescriptor>> {
        let fetched = self
            .descriptor
            .get_or_try_init(|| self.client.describe_organization())
            .await;

        match fetched {
            Ok(descriptor) => Ok(Some(descriptor)),
            Err(err) if err.is_organizations_not_in_use() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Returns the descriptor if it has already been fetched.
    #[must_use]
    pub fn cached(&self) -> Option<&OrganizationDescriptor> {
        self.descriptor.get()
    }

    /// Returns true when `account_id` is the organization's management account.
    ///
    /// Accounts outside any organization are never the management account.
    ///
    /// # Errors
    ///
    /// Propagates provider failures from [`Self::descriptor`].
    pub async fn is_master_account(&self, account_id: &AccountId) -> BackendResult<bool> {
        Ok(self
            .descriptor()
            .await?
            .is_some_and(|descriptor| descriptor.is_master_account(account_id)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::join_all;
    use org_provider::BackendError;
    use org_provider::memory::StaticOrganizations;

    use super::*;

    fn organization() -> OrganizationDescriptor {
        OrganizationDescriptor::new(
            "o-exampleorgid",
            "arn:aws:organizations::111111111111:organization/o-exampleorgid",
            AccountId::new("111111111111").unwrap(),
        )
    }

    #[tokio::test]
    async fn descriptor_is_memoized() {
        let backend = Arc::new(StaticOrganizations::with_organization(organization()));
        let directory = OrganizationDirectory::new(backend.clone());

        let first = directory.descriptor().await.unwrap().cloned();
        let second = directory.descriptor().await.unwrap().cloned();

        assert_eq!(first, Some(organization()));
        assert_eq!(first, second);
        assert_eq!(backend.describe_calls(), 1);
        assert_eq!(directory.cached(), Some(&organization()));
    }

    #[tokio::test]
    async fn not_in_use_is_absent_not_error() {
        let backend = Arc::new(StaticOrganizations::new());
        let directory = OrganizationDirectory::new(backend.clone());

        assert_eq!(directory.descriptor().await.unwrap(), None);
        assert_eq!(directory.descriptor().await.unwrap(), None);
        assert!(directory.cached().is_none());
        assert_eq!(backend.describe_calls(), 2);
    }

    #[tokio::test]
    async fn other_failures_propagate_unmodified() {
        let failure = BackendError::service("ServiceException", "try later");
        let backend = Arc::new(
            StaticOrganizations::with_organization(organization()).failing_describe(failure.clone()),
        );
        let directory = OrganizationDirectory::new(backend);

        assert_eq!(directory.descriptor().await.unwrap_err(), failure);
        assert!(directory.cached().is_none());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let backend = Arc::new(
            StaticOrganizations::with_organization(organization())
                .with_latency(Duration::from_millis(20)),
        );
        let directory = OrganizationDirectory::new(backend.clone());

        let results = join_all((0..8).map(|_| directory.descriptor())).await;

        for result in results {
            assert_eq!(result.unwrap(), Some(&organization()));
        }
        assert_eq!(backend.describe_calls(), 1);
    }

    #[tokio::test]
    async fn cancelled_fetch_leaves_cache_empty() {
        let backend = Arc::new(
            StaticOrganizations::with_organization(organization())
                .with_latency(Duration::from_millis(50)),
        );
        let directory = OrganizationDirectory::new(backend.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), directory.descriptor()).await;
        assert!(abandoned.is_err());
        assert!(directory.cached().is_none());

        assert_eq!(directory.descriptor().await.unwrap(), Some(&organization()));
        assert_eq!(backend.describe_calls(), 2);
    }

    #[tokio::test]
    async fn master_account_check() {
        let directory =
            OrganizationDirectory::new(Arc::new(StaticOrganizations::with_organization(organization())));
        let master = AccountId::new("111111111111").unwrap();
        let member = AccountId::new("222222222222").unwrap();

        assert!(directory.is_master_account(&master).await.unwrap());
        assert!(!directory.is_master_account(&member).await.unwrap());

        let detached = OrganizationDirectory::new(Arc::new(StaticOrganizations::new()));
        assert!(!detached.is_master_account(&master).await.unwrap());
    }
}
