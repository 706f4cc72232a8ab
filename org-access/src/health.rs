//! Health reporting over session, identity, and organization status.

use std::fmt;
use std::sync::Arc;

use org_config::ServiceConfig;
use org_primitives::{AccountId, OrganizationDescriptor};
use org_provider::{BackendError, IdentityClient};
use serde::{Deserialize, Serialize};

use crate::directory::OrganizationDirectory;

const NO_CREDENTIALS_SUGGESTION: &str =
    "Check AWS_PROFILE or configure AWS credentials for the profile.";

/// Whether the account belongs to an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationsState {
    /// The organization could be described.
    Accessible,
    /// The account has not enabled Organizations.
    NotInUse,
}

/// Organization part of a healthy report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationsStatus {
    /// Whether an organization was found.
    pub status: OrganizationsState,
    /// True when the caller is the management account.
    pub is_master_account: bool,
    /// Organization id when accessible.
    pub organization_id: Option<String>,
    /// Organization ARN when accessible.
    pub organization_arn: Option<String>,
}

impl OrganizationsStatus {
    fn accessible(descriptor: &OrganizationDescriptor, caller: &AccountId) -> Self {
        Self {
            status: OrganizationsState::Accessible,
            is_master_account: descriptor.is_master_account(caller),
            organization_id: Some(descriptor.id().to_owned()),
            organization_arn: Some(descriptor.arn().to_owned()),
        }
    }

    fn not_in_use() -> Self {
        Self {
            status: OrganizationsState::NotInUse,
            is_master_account: false,
            organization_id: None,
            organization_arn: None,
        }
    }
}

/// Configuration flags echoed back in a healthy report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// Mutating operations are refused.
    pub readonly_mode: bool,
    /// Directory operations require the management account.
    pub master_account_only: bool,
}

/// Snapshot produced when identity and organization could be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthySnapshot {
    /// Account the credentials resolve to.
    pub account_id: AccountId,
    /// Calling principal ARN.
    pub principal_arn: String,
    /// Configured region.
    pub region: String,
    /// Configured named profile.
    pub profile: String,
    /// Organization status.
    pub organizations: OrganizationsStatus,
    /// Effective security flags.
    pub config: EffectiveConfig,
}

/// Category of an unhealthy report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No credentials could be resolved.
    NoCredentials,
    /// The provider answered with an error.
    ProviderError,
    /// Anything else.
    InternalError,
}

/// Snapshot produced when the health check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnhealthySnapshot {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable description.
    pub message: String,
    /// Provider error code for provider failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Remediation hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Configured named profile.
    pub profile: String,
    /// Configured region.
    pub region: String,
}

/// Diagnostic snapshot returned by the health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthReport {
    /// Identity resolved; organization accessible or not in use.
    Healthy(HealthySnapshot),
    /// Identity or organization resolution failed.
    Unhealthy(UnhealthySnapshot),
}

impl HealthReport {
    /// Returns true for healthy reports.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy(_))
    }
}

/// Aggregates identity and organization status into a [`HealthReport`].
pub struct HealthReporter {
    identity: Arc<dyn IdentityClient>,
    directory: Arc<OrganizationDirectory>,
    profile: String,
    region: String,
    effective: EffectiveConfig,
}

impl fmt::Debug for HealthReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthReporter")
            .field("profile", &self.profile)
            .field("region", &self.region)
            .field("effective", &self.effective)
            .finish_non_exhaustive()
    }
}

impl HealthReporter {
    /// Creates a reporter for the configured session.
    #[must_use]
    pub fn new(
        config: &ServiceConfig,
        identity: Arc<dyn IdentityClient>,
        directory: Arc<OrganizationDirectory>,
    ) -> Self {
        Self {
            identity,
            directory,
            profile: config.aws_profile().to_owned(),
            region: config.aws_region().to_owned(),
            effective: EffectiveConfig {
                readonly_mode: config.readonly_mode(),
                master_account_only: config.master_account_only(),
            },
        }
    }

    /// Resolves identity, then organization status.
    ///
    /// An account without an organization is healthy; any other failure is
    /// reported as unhealthy.
    pub async fn check(&self) -> HealthReport {
        let identity = match self.identity.caller_identity().await {
            Ok(identity) => identity,
            Err(err) => return self.unhealthy(err),
        };

        let organizations = match self.directory.descriptor().await {
            Ok(Some(descriptor)) => OrganizationsStatus::accessible(descriptor, identity.account_id()),
            Ok(None) => OrganizationsStatus::not_in_use(),
            Err(err) => return self.unhealthy(err),
        };

        HealthReport::Healthy(HealthySnapshot {
            account_id: identity.account_id().clone(),
            principal_arn: identity.principal_arn().to_owned(),
            region: self.region.clone(),
            profile: self.profile.clone(),
            organizations,
            config: self.effective,
        })
    }

    fn unhealthy(&self, err: BackendError) -> HealthReport {
        let (kind, message, code, suggestion) = match err {
            BackendError::NoCredentials { reason } => (
                FailureKind::NoCredentials,
                format!("AWS credentials not found: {reason}"),
                None,
                Some(NO_CREDENTIALS_SUGGESTION.to_owned()),
            ),
            BackendError::Service { code, message } => (
                FailureKind::ProviderError,
                format!("AWS API error {code}: {message}"),
                Some(code),
                None,
            ),
            BackendError::Transport { reason } => (
                FailureKind::InternalError,
                format!("unexpected error: {reason}"),
                None,
                None,
            ),
        };

        HealthReport::Unhealthy(UnhealthySnapshot {
            kind,
            message,
            code,
            suggestion,
            profile: self.profile.clone(),
            region: self.region.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use org_primitives::CallerIdentity;
    use org_provider::memory::{StaticIdentity, StaticOrganizations};

    use super::*;

    fn account(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn caller(id: &str) -> CallerIdentity {
        CallerIdentity::new(account(id), format!("arn:aws:iam::{id}:user/auditor"))
    }

    fn organization() -> OrganizationDescriptor {
        OrganizationDescriptor::new(
            "o-exampleorgid",
            "arn:aws:organizations::111111111111:organization/o-exampleorgid",
            account("111111111111"),
        )
    }

    fn reporter(identity: StaticIdentity, backend: StaticOrganizations) -> HealthReporter {
        let config = ServiceConfig::default()
            .with_profile("audit")
            .with_region("eu-west-1");
        let directory = Arc::new(OrganizationDirectory::new(Arc::new(backend)));
        HealthReporter::new(&config, Arc::new(identity), directory)
    }

    #[tokio::test]
    async fn master_account_is_healthy() {
        let report = reporter(
            StaticIdentity::new(caller("111111111111")),
            StaticOrganizations::with_organization(organization()),
        )
        .check()
        .await;

        let HealthReport::Healthy(snapshot) = report else {
            panic!("expected healthy report");
        };
        assert_eq!(snapshot.account_id.as_str(), "111111111111");
        assert_eq!(snapshot.profile, "audit");
        assert_eq!(snapshot.region, "eu-west-1");
        assert_eq!(snapshot.organizations.status, OrganizationsState::Accessible);
        assert!(snapshot.organizations.is_master_account);
        assert_eq!(
            snapshot.organizations.organization_id.as_deref(),
            Some("o-exampleorgid")
        );
        assert!(snapshot.config.readonly_mode);
        assert!(snapshot.config.master_account_only);
    }

    #[tokio::test]
    async fn member_account_is_healthy_but_not_master() {
        let report = reporter(
            StaticIdentity::new(caller("222222222222")),
            StaticOrganizations::with_organization(organization()),
        )
        .check()
        .await;

        let HealthReport::Healthy(snapshot) = report else {
            panic!("expected healthy report");
        };
        assert!(!snapshot.organizations.is_master_account);
    }

    #[tokio::test]
    async fn missing_organization_is_still_healthy() {
        let report = reporter(
            StaticIdentity::new(caller("111111111111")),
            StaticOrganizations::new(),
        )
        .check()
        .await;

        let HealthReport::Healthy(snapshot) = report else {
            panic!("expected healthy report");
        };
        assert_eq!(snapshot.organizations.status, OrganizationsState::NotInUse);
        assert!(!snapshot.organizations.is_master_account);
        assert!(snapshot.organizations.organization_id.is_none());
    }

    #[tokio::test]
    async fn missing_credentials_are_unhealthy_with_hint() {
        let report = reporter(StaticIdentity::missing(), StaticOrganizations::new())
            .check()
            .await;

        let HealthReport::Unhealthy(snapshot) = report else {
            panic!("expected unhealthy report");
        };
        assert_eq!(snapshot.kind, FailureKind::NoCredentials);
        assert!(snapshot.suggestion.unwrap().contains("AWS_PROFILE"));
        assert_eq!(snapshot.profile, "audit");
    }

    #[tokio::test]
    async fn other_organization_failures_are_unhealthy() {
        let report = reporter(
            StaticIdentity::new(caller("111111111111")),
            StaticOrganizations::with_organization(organization())
                .failing_describe(BackendError::service("AccessDeniedException", "denied")),
        )
        .check()
        .await;

        let HealthReport::Unhealthy(snapshot) = report else {
            panic!("expected unhealthy report");
        };
        assert_eq!(snapshot.kind, FailureKind::ProviderError);
        assert_eq!(snapshot.code.as_deref(), Some("AccessDeniedException"));
    }

    #[tokio::test]
    async fn transport_failures_are_internal() {
        let report = reporter(
            StaticIdentity::new(caller("111111111111")),
            StaticOrganizations::new().failing_describe(BackendError::transport("dns failure")),
        )
        .check()
        .await;

        let HealthReport::Unhealthy(snapshot) = report else {
            panic!("expected unhealthy report");
        };
        assert_eq!(snapshot.kind, FailureKind::InternalError);
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let report = HealthReport::Healthy(HealthySnapshot {
            account_id: account("111111111111"),
            principal_arn: "arn:aws:iam::111111111111:user/auditor".into(),
            region: "us-east-1".into(),
            profile: "default".into(),
            organizations: OrganizationsStatus::not_in_use(),
            config: EffectiveConfig {
                readonly_mode: true,
                master_account_only: true,
            },
        });

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["organizations"]["status"], "not_in_use");
        assert_eq!(value["organizations"]["organization_id"], serde_json::Value::Null);
    }
}
