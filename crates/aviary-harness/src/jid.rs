//! Bare address parsing for fixture identities.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while parsing a `localpart@domainpart` address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JidError {
    /// The address contains no `@` separator.
    #[error("address {address:?} is missing the '@' separator")]
    MissingSeparator {
        /// The malformed address.
        address: String,
    },

    /// The part before the `@` is empty.
    #[error("address {address:?} has an empty localpart")]
    EmptyLocalpart {
        /// The malformed address.
        address: String,
    },

    /// The part after the `@` is empty.
    #[error("address {address:?} has an empty domainpart")]
    EmptyDomainpart {
        /// The malformed address.
        address: String,
    },
}

/// A bare XMPP address of the form `localpart@domainpart`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jid {
    localpart: String,
    domainpart: String,
}

impl Jid {
    /// The account name before the `@`.
    #[must_use]
    pub fn localpart(&self) -> &str {
        &self.localpart
    }

    /// The domain after the `@`.
    #[must_use]
    pub fn domainpart(&self) -> &str {
        &self.domainpart
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}@{}", self.localpart, self.domainpart)
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some((localpart, domainpart)) = input.split_once('@') else {
            return Err(JidError::MissingSeparator {
                address: input.to_owned(),
            });
        };
        if localpart.is_empty() {
            return Err(JidError::EmptyLocalpart {
                address: input.to_owned(),
            });
        }
        if domainpart.is_empty() {
            return Err(JidError::EmptyDomainpart {
                address: input.to_owned(),
            });
        }
        Ok(Self {
            localpart: localpart.to_owned(),
            domainpart: domainpart.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Jid, JidError};

    #[rstest]
    #[case("me@localhost", "me", "localhost")]
    #[case("alice@example.net", "alice", "example.net")]
    fn parses_well_formed_addresses(
        #[case] input: &str,
        #[case] localpart: &str,
        #[case] domainpart: &str,
    ) {
        let jid: Jid = input.parse().expect("address should parse");
        assert_eq!(jid.localpart(), localpart);
        assert_eq!(jid.domainpart(), domainpart);
    }

    #[rstest]
    #[case::no_separator("melocalhost")]
    #[case::empty("")]
    fn rejects_addresses_without_separator(#[case] input: &str) {
        let error = input.parse::<Jid>().expect_err("address must not parse");
        assert!(matches!(error, JidError::MissingSeparator { .. }));
    }

    #[test]
    fn rejects_empty_localpart() {
        let error = "@localhost".parse::<Jid>().expect_err("address must not parse");
        assert!(matches!(error, JidError::EmptyLocalpart { .. }));
    }

    #[test]
    fn rejects_empty_domainpart() {
        let error = "me@".parse::<Jid>().expect_err("address must not parse");
        assert!(matches!(error, JidError::EmptyDomainpart { .. }));
    }

    #[test]
    fn displays_as_the_bare_address() {
        let jid: Jid = "me@localhost".parse().expect("address should parse");
        assert_eq!(jid.to_string(), "me@localhost");
    }
}
