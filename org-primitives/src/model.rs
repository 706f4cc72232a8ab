//! Organization, identity, and policy records.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{AccountId, Error};

/// Root descriptor of an AWS Organization.
///
/// Fetched once per service instance and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDescriptor {
    id: String,
    arn: String,
    master_account_id: AccountId,
}

impl OrganizationDescriptor {
    /// Creates a descriptor from its provider-assigned identifiers.
    #[must_use]
    pub fn new(id: impl Into<String>, arn: impl Into<String>, master_account_id: AccountId) -> Self {
        Self {
            id: id.into(),
            arn: arn.into(),
            master_account_id,
        }
    }

    /// Returns the organization identifier (`o-...`).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the organization ARN.
    #[must_use]
    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// Returns the management (master) account identifier.
    #[must_use]
    pub fn master_account_id(&self) -> &AccountId {
        &self.master_account_id
    }

    /// Returns true when `account_id` is the organization's management account.
    #[must_use]
    pub fn is_master_account(&self, account_id: &AccountId) -> bool {
        &self.master_account_id == account_id
    }
}

/// Identity the current credentials resolve to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    account_id: AccountId,
    principal_arn: String,
}

impl CallerIdentity {
    /// Creates an identity from the resolved account and principal ARN.
    #[must_use]
    pub fn new(account_id: AccountId, principal_arn: impl Into<String>) -> Self {
        Self {
            account_id,
            principal_arn: principal_arn.into(),
        }
    }

    /// Returns the account the credentials belong to.
    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Returns the ARN of the calling principal.
    #[must_use]
    pub fn principal_arn(&self) -> &str {
        &self.principal_arn
    }
}

/// Organization policy families.
///
/// Families the provider introduces after this release are carried as
/// [`PolicyType::Unknown`] under their wire name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PolicyType {
    /// Service Control Policy.
    #[default]
    ServiceControlPolicy,
    /// Resource Control Policy.
    ResourceControlPolicy,
    /// Tag policy.
    TagPolicy,
    /// Backup policy.
    BackupPolicy,
    /// AI services opt-out policy.
    AiservicesOptOutPolicy,
    /// Chat applications policy.
    ChatbotPolicy,
    /// EC2 declarative policy.
    DeclarativePolicyEc2,
    /// A family not listed above, kept verbatim.
    Unknown(String),
}

impl PolicyType {
    /// Every known policy type, in provider documentation order.
    pub const ALL: [Self; 7] = [
        Self::ServiceControlPolicy,
        Self::ResourceControlPolicy,
        Self::TagPolicy,
        Self::BackupPolicy,
        Self::AiservicesOptOutPolicy,
        Self::ChatbotPolicy,
        Self::DeclarativePolicyEc2,
    ];

    /// Returns the provider wire name of the policy type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ServiceControlPolicy => "SERVICE_CONTROL_POLICY",
            Self::ResourceControlPolicy => "RESOURCE_CONTROL_POLICY",
            Self::TagPolicy => "TAG_POLICY",
            Self::BackupPolicy => "BACKUP_POLICY",
            Self::AiservicesOptOutPolicy => "AISERVICES_OPT_OUT_POLICY",
            Self::ChatbotPolicy => "CHATBOT_POLICY",
            Self::DeclarativePolicyEc2 => "DECLARATIVE_POLICY_EC2",
            Self::Unknown(name) => name,
        }
    }

    /// Maps a wire name reported by the provider, falling back to
    /// [`PolicyType::Unknown`] for families not listed in [`PolicyType::ALL`].
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        name.parse()
            .unwrap_or_else(|_| Self::Unknown(name.to_owned()))
    }

    /// Returns true for the families listed in [`PolicyType::ALL`].
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl Display for PolicyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: only the families in [`PolicyType::ALL`] are accepted.
impl FromStr for PolicyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownPolicyType(s.to_owned()))
    }
}

impl Serialize for PolicyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PolicyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&name))
    }
}

/// One entry of a policy listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySummary {
    /// Policy identifier (`p-...`).
    pub id: String,
    /// Policy ARN.
    pub arn: String,
    /// Friendly policy name.
    pub name: String,
    /// Optional description supplied by the policy author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Policy family.
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    /// True for policies maintained by AWS (for example `FullAWSAccess`).
    pub aws_managed: bool,
}

/// Full policy record including its document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDetail {
    /// Policy identifier (`p-...`).
    pub id: String,
    /// Policy ARN.
    pub arn: String,
    /// Friendly policy name.
    pub name: String,
    /// Description, empty when the author supplied none.
    #[serde(default)]
    pub description: String,
    /// Raw policy document.
    pub content: String,
    /// Policy family.
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    /// True for policies maintained by AWS.
    pub aws_managed: bool,
}

impl PolicyDetail {
    /// Returns the listing view of this policy.
    #[must_use]
    pub fn summary(&self) -> PolicySummary {
        PolicySummary {
            id: self.id.clone(),
            arn: self.arn.clone(),
            name: self.name.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            policy_type: self.policy_type.clone(),
            aws_managed: self.aws_managed,
        }
    }
}
