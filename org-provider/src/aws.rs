//! AWS SDK backed provider clients.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_organizations::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_organizations::types as sdk;
use org_primitives::{
    AccountId, CallerIdentity, Error as ModelError, OrganizationDescriptor, PolicyDetail,
    PolicySummary, PolicyType,
};
use tracing::debug;

use crate::traits::{BackendError, BackendResult, IdentityClient, OrganizationsClient, PolicyPage};

/// Credential and region session shared by every provider client.
///
/// Built once per process; the clients handed out share its connection pool.
#[derive(Clone)]
pub struct AwsSession {
    profile: String,
    config: SdkConfig,
}

impl fmt::Debug for AwsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSession")
            .field("profile", &self.profile)
            .field("region", &self.region())
            .finish_non_exhaustive()
    }
}

impl AwsSession {
    /// Resolves SDK configuration for the named profile, pinned to `region`.
    ///
    /// Credential resolution is deferred until the first request.
    pub async fn load(profile: impl Into<String>, region: impl Into<String>) -> Self {
        let profile = profile.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&profile)
            .region(Region::new(region.into()))
            .load()
            .await;

        Self { profile, config }
    }

    /// Returns the named profile this session was loaded from.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Returns the region the clients are pinned to.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.config.region().map(AsRef::<str>::as_ref)
    }

    /// Builds an Organizations client bound to this session.
    #[must_use]
    pub fn organizations(&self) -> AwsOrganizationsClient {
        AwsOrganizationsClient::new(&self.config)
    }

    /// Builds an STS identity client bound to this session.
    #[must_use]
    pub fn identity(&self) -> AwsIdentityClient {
        AwsIdentityClient::new(&self.config)
    }
}

/// Identity resolution through STS `GetCallerIdentity`.
///
/// Credentials are resolved by the SDK on send, through its identity cache.
#[derive(Clone, Debug)]
pub struct AwsIdentityClient {
    client: aws_sdk_sts::Client,
    has_provider: bool,
}

impl AwsIdentityClient {
    /// Creates a client from resolved SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_sts::Client::new(config),
            has_provider: config.credentials_provider().is_some(),
        }
    }
}

#[async_trait]
impl IdentityClient for AwsIdentityClient {
    async fn caller_identity(&self) -> BackendResult<CallerIdentity> {
        if !self.has_provider {
            return Err(BackendError::no_credentials(
                "no credential provider configured",
            ));
        }

        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(map_sdk_error)?;

        let account = required(output.account(), "caller identity", "Account")?;
        let arn = required(output.arn(), "caller identity", "Arn")?;
        Ok(CallerIdentity::new(AccountId::new(account)?, arn))
    }
}

/// Organizations control plane client.
#[derive(Clone, Debug)]
pub struct AwsOrganizationsClient {
    client: aws_sdk_organizations::Client,
}

impl AwsOrganizationsClient {
    /// Creates a client from resolved SDK configuration.
    #[must_use]
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_organizations::Client::new(config),
        }
    }
}

#[async_trait]
impl OrganizationsClient for AwsOrganizationsClient {
    async fn describe_organization(&self) -> BackendResult<OrganizationDescriptor> {
        let output = self
            .client
            .describe_organization()
            .send()
            .await
            .map_err(map_sdk_error)?;

        let org = output.organization().ok_or(ModelError::MissingField {
            record: "organization",
            field: "Organization",
        })?;
        let master = required(org.master_account_id(), "organization", "MasterAccountId")?;

        Ok(OrganizationDescriptor::new(
            required(org.id(), "organization", "Id")?,
            required(org.arn(), "organization", "Arn")?,
            AccountId::new(master)?,
        ))
    }

    async fn list_policies_page(
        &self,
        filter: &PolicyType,
        next_token: Option<String>,
    ) -> BackendResult<PolicyPage> {
        debug!(%filter, continued = next_token.is_some(), "listing organization policies");

        let output = self
            .client
            .list_policies()
            .filter(sdk::PolicyType::from(filter.as_str()))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let policies = output
            .policies()
            .iter()
            .map(convert_summary)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PolicyPage::new(
            policies,
            output.next_token().map(str::to_owned),
        ))
    }

    async fn describe_policy(&self, policy_id: &str) -> BackendResult<PolicyDetail> {
        let output = self
            .client
            .describe_policy()
            .policy_id(policy_id)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let policy = output.policy().ok_or(ModelError::MissingField {
            record: "policy",
            field: "Policy",
        })?;
        let summary = policy
            .policy_summary()
            .ok_or(ModelError::MissingField {
                record: "policy",
                field: "PolicySummary",
            })
            .and_then(convert_summary)?;

        Ok(PolicyDetail {
            id: summary.id,
            arn: summary.arn,
            name: summary.name,
            description: summary.description.unwrap_or_default(),
            content: required(policy.content(), "policy", "Content")?.to_owned(),
            policy_type: summary.policy_type,
            aws_managed: summary.aws_managed,
        })
    }
}

fn convert_summary(summary: &sdk::PolicySummary) -> Result<PolicySummary, ModelError> {
    let policy_type = summary
        .r#type()
        .ok_or(ModelError::MissingField {
            record: "policy summary",
            field: "Type",
        })?
        .as_str();

    Ok(PolicySummary {
        id: required(summary.id(), "policy summary", "Id")?.to_owned(),
        arn: required(summary.arn(), "policy summary", "Arn")?.to_owned(),
        name: required(summary.name(), "policy summary", "Name")?.to_owned(),
        description: summary
            .description()
            .filter(|text| !text.is_empty())
            .map(str::to_owned),
        policy_type: PolicyType::from_wire(policy_type),
        aws_managed: summary.aws_managed(),
    })
}

fn required<'a>(
    value: Option<&'a str>,
    record: &'static str,
    field: &'static str,
) -> Result<&'a str, ModelError> {
    value.ok_or(ModelError::MissingField { record, field })
}

/// Keeps the provider's error code verbatim for service errors. A request
/// that failed while resolving credentials is a credential failure; anything
/// else (dispatch, timeout, unparseable response) is a transport failure.
fn map_sdk_error<E, R>(err: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: fmt::Debug + 'static,
{
    if let SdkError::ServiceError(context) = &err {
        let service = context.err();
        return BackendError::service(
            service.code().unwrap_or("Unknown"),
            service.message().unwrap_or_default(),
        );
    }

    if let Some(cause) = credentials_failure(&err) {
        return BackendError::no_credentials(DisplayErrorContext(cause).to_string());
    }

    BackendError::transport(DisplayErrorContext(&err).to_string())
}

/// Finds a credential chain failure anywhere in the source chain of `err`.
fn credentials_failure<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a CredentialsError> {
    std::iter::successors(Some(err), |&current| current.source())
        .find_map(|cause| cause.downcast_ref::<CredentialsError>())
}

#[cfg(test)]
mod tests {
    use aws_sdk_organizations::error::ErrorMetadata;
    use aws_sdk_organizations::operation::describe_organization::DescribeOrganizationError;

    use super::*;

    fn sdk_summary(kind: &str) -> sdk::PolicySummary {
        sdk::PolicySummary::builder()
            .id("p-FullAWSAccess")
            .arn("arn:aws:organizations::aws:policy/service_control_policy/p-FullAWSAccess")
            .name("FullAWSAccess")
            .description("Allows access to every operation")
            .r#type(sdk::PolicyType::from(kind))
            .aws_managed(true)
            .build()
    }

    #[test]
    fn converts_sdk_summaries() {
        let summary = convert_summary(&sdk_summary("SERVICE_CONTROL_POLICY")).unwrap();
        assert_eq!(summary.id, "p-FullAWSAccess");
        assert_eq!(summary.policy_type, PolicyType::ServiceControlPolicy);
        assert!(summary.aws_managed);
        assert_eq!(
            summary.description.as_deref(),
            Some("Allows access to every operation")
        );
    }

    #[test]
    fn unrecognised_policy_type_is_kept() {
        let summary = convert_summary(&sdk_summary("SECURITYHUB_POLICY")).unwrap();
        assert_eq!(
            summary.policy_type,
            PolicyType::Unknown("SECURITYHUB_POLICY".into())
        );
        assert_eq!(summary.name, "FullAWSAccess");
    }

    #[test]
    fn service_error_codes_are_kept_verbatim() {
        let service = DescribeOrganizationError::generic(
            ErrorMetadata::builder()
                .code("AWSOrganizationsNotInUseException")
                .message("Your account is not a member of an organization.")
                .build(),
        );
        let err = map_sdk_error(SdkError::<DescribeOrganizationError, ()>::service_error(service, ()));

        assert_eq!(err.code(), Some("AWSOrganizationsNotInUseException"));
        assert!(err.is_organizations_not_in_use());
        assert_eq!(
            err,
            BackendError::service(
                "AWSOrganizationsNotInUseException",
                "Your account is not a member of an organization."
            )
        );
    }

    #[test]
    fn credential_chain_failures_are_classified() {
        let err = map_sdk_error(SdkError::<DescribeOrganizationError, ()>::construction_failure(
            CredentialsError::not_loaded("no profile named `audit`"),
        ));
        assert!(matches!(err, BackendError::NoCredentials { .. }), "{err:?}");

        let err = map_sdk_error(SdkError::<DescribeOrganizationError, ()>::construction_failure(
            "endpoint resolution failed",
        ));
        assert!(matches!(err, BackendError::Transport { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn session_reports_profile_and_region() {
        let session = AwsSession::load("default", "eu-central-1").await;
        assert_eq!(session.profile(), "default");
        assert_eq!(session.region(), Some("eu-central-1"));
    }
}
