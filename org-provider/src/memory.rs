//! In-memory provider backend.
//!
//! Serves a fixed organization and policy set without network access. Used for
//! offline runs and as the fake collaborator in tests; every call is counted so
//! callers can assert how many round trips an operation issued.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use org_primitives::{CallerIdentity, OrganizationDescriptor, PolicyDetail, PolicyType};

use crate::traits::{
    BackendError, BackendResult, IdentityClient, ORGANIZATIONS_NOT_IN_USE, OrganizationsClient,
    POLICY_NOT_FOUND, PolicyPage,
};

const TOKEN_PREFIX: &str = "offset-";

/// Organizations backend holding its state in process memory.
#[derive(Debug)]
pub struct StaticOrganizations {
    organization: Option<OrganizationDescriptor>,
    policies: Vec<PolicyDetail>,
    page_size: NonZeroUsize,
    latency: Option<Duration>,
    describe_failure: Option<BackendError>,
    listing_failure: Option<BackendError>,
    detail_failure: Option<BackendError>,
    describe_calls: AtomicUsize,
    page_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl Default for StaticOrganizations {
    fn default() -> Self {
        Self {
            organization: None,
            policies: Vec::new(),
            page_size: NonZeroUsize::new(20).unwrap_or(NonZeroUsize::MIN),
            latency: None,
            describe_failure: None,
            listing_failure: None,
            detail_failure: None,
            describe_calls: AtomicUsize::new(0),
            page_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }
}

impl StaticOrganizations {
    /// Creates a backend for an account that has not enabled Organizations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend serving the supplied organization.
    #[must_use]
    pub fn with_organization(organization: OrganizationDescriptor) -> Self {
        Self {
            organization: Some(organization),
            ..Self::default()
        }
    }

    /// Adds a policy; listing order follows insertion order.
    #[must_use]
    pub fn with_policy(mut self, policy: PolicyDetail) -> Self {
        self.policies.push(policy);
        self
    }

    /// Sets how many policies a single listing page carries.
    #[must_use]
    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Delays every call by `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes `describe_organization` fail with `error`.
    #[must_use]
    pub fn failing_describe(mut self, error: BackendError) -> Self {
        self.describe_failure = Some(error);
        self
    }

    /// Makes every listing page fail with `error`.
    #[must_use]
    pub fn failing_listing(mut self, error: BackendError) -> Self {
        self.listing_failure = Some(error);
        self
    }

    /// Makes `describe_policy` fail with `error`.
    #[must_use]
    pub fn failing_detail(mut self, error: BackendError) -> Self {
        self.detail_failure = Some(error);
        self
    }

    /// Number of `describe_organization` calls served so far.
    #[must_use]
    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    /// Number of listing pages requested so far.
    #[must_use]
    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    /// Number of `describe_policy` calls served so far.
    #[must_use]
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn organization(&self) -> BackendResult<&OrganizationDescriptor> {
        self.organization.as_ref().ok_or_else(|| {
            BackendError::service(
                ORGANIZATIONS_NOT_IN_USE,
                "Your account is not a member of an organization.",
            )
        })
    }
}

#[async_trait]
impl OrganizationsClient for StaticOrganizations {
    async fn describe_organization(&self) -> BackendResult<OrganizationDescriptor> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(err) = &self.describe_failure {
            return Err(err.clone());
        }
        self.organization().cloned()
    }

    async fn list_policies_page(
        &self,
        filter: &PolicyType,
        next_token: Option<String>,
    ) -> BackendResult<PolicyPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(err) = &self.listing_failure {
            return Err(err.clone());
        }
        self.organization()?;

        let offset = match next_token.as_deref() {
            None => 0,
            Some(token) => token
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|raw| raw.parse::<usize>().ok())
                .ok_or_else(|| {
                    BackendError::service(
                        "InvalidInputException",
                        format!("invalid pagination token `{token}`"),
                    )
                })?,
        };

        let matching: Vec<_> = self
            .policies
            .iter()
            .filter(|policy| &policy.policy_type == filter)
            .collect();
        let end = (offset + self.page_size.get()).min(matching.len());
        let policies = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|policy| policy.summary())
            .collect();
        let next_token = (end < matching.len()).then(|| format!("{TOKEN_PREFIX}{end}"));

        Ok(PolicyPage::new(policies, next_token))
    }

    async fn describe_policy(&self, policy_id: &str) -> BackendResult<PolicyDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(err) = &self.detail_failure {
            return Err(err.clone());
        }
        self.organization()?;

        self.policies
            .iter()
            .find(|policy| policy.id == policy_id)
            .cloned()
            .ok_or_else(|| {
                BackendError::service(
                    POLICY_NOT_FOUND,
                    format!("We can't find a policy with the PolicyId {policy_id}."),
                )
            })
    }
}

/// Identity backend whose answer can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    identity: Mutex<Option<CallerIdentity>>,
    calls: AtomicUsize,
}

impl StaticIdentity {
    /// Creates a backend resolving to `identity`.
    #[must_use]
    pub fn new(identity: CallerIdentity) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a backend with no resolvable credentials.
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// Replaces the resolved identity, simulating a credential rotation.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set(&self, identity: Option<CallerIdentity>) {
        *self.identity.lock().expect("identity lock poisoned") = identity;
    }

    /// Number of identity resolutions served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityClient for StaticIdentity {
    async fn caller_identity(&self) -> BackendResult<CallerIdentity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.identity
            .lock()
            .map_err(|_| BackendError::transport("identity lock poisoned"))?
            .clone()
            .ok_or_else(|| {
                BackendError::no_credentials("unable to locate credentials for the profile")
            })
    }
}
