//! Account identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

const ACCOUNT_ID_LEN: usize = 12;

/// Twelve-digit AWS account identifier.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Creates an account identifier after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAccountId`] when the value is not exactly twelve
    /// ASCII digits.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.len() != ACCOUNT_ID_LEN {
            return Err(Error::InvalidAccountId {
                id,
                reason: "account id must be exactly 12 digits",
            });
        }

        if !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAccountId {
                id,
                reason: "account id must contain only digits",
            });
        }

        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}
