//! Provider clients used by the Organizations access layer.
//!
//! Each module exposes a backend for the same trait-based interface defined in
//! [`traits`]: [`aws`] talks to the real control plane through the AWS SDK,
//! [`memory`] serves a fixed organization from process memory.

#![warn(missing_docs, clippy::pedantic)]

pub mod aws;
pub mod memory;
pub mod traits;

pub use traits::{
    ACCESS_DENIED_CODES, BackendError, BackendResult, IdentityClient,
    ORGANIZATIONS_NOT_IN_USE, OrganizationsClient, POLICY_NOT_FOUND, PolicyPage,
};
