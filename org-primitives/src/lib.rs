//! Core shared types for the AWS Organizations access layer.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod model;

/// Error type and result alias shared across the data model.
pub use error::{Error, Result};
/// Twelve-digit AWS account identifier.
pub use ids::AccountId;
/// Organization, identity, and policy records exchanged with the provider.
pub use model::{CallerIdentity, OrganizationDescriptor, PolicyDetail, PolicySummary, PolicyType};
