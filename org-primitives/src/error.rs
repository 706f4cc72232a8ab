//! Shared error definitions for the data model.

use thiserror::Error;

/// Result alias used throughout the data model.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing data model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The supplied account identifier is not a twelve digit number.
    #[error("invalid account id `{id}`: {reason}")]
    InvalidAccountId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: &'static str,
    },

    /// The supplied policy type is not one the provider recognises.
    #[error("unknown policy type `{0}`")]
    UnknownPolicyType(String),

    /// A record was missing a field the provider always supplies.
    #[error("incomplete {record}: missing `{field}`")]
    MissingField {
        /// Record being assembled.
        record: &'static str,
        /// Name of the absent field.
        field: &'static str,
    },
}
