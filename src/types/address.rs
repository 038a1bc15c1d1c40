// ABOUTME: Validated node address (IP or host name).
// ABOUTME: Guarantees a non-empty, whitespace-free address before it reaches a driver or registry.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeAddressError {
    #[error("node address cannot be empty")]
    Empty,

    #[error("node address exceeds maximum length of 253 characters")]
    TooLong,

    #[error("invalid character in node address: '{0}'")]
    InvalidChar(char),
}

/// Address a node is reachable at, as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress(String);

impl NodeAddress {
    pub fn new(value: &str) -> Result<Self, NodeAddressError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(NodeAddressError::Empty);
        }

        if value.len() > 253 {
            return Err(NodeAddressError::TooLong);
        }

        if let Some(c) = value
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '@' | ','))
        {
            return Err(NodeAddressError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    /// Parse an optional driver-reported string, treating blanks as absent.
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, NodeAddressError> {
        match value {
            Some(v) if !v.trim().is_empty() => Self::new(v).map(Some),
            _ => Ok(None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NodeAddress::new(&s).map_err(serde::de::Error::custom)
    }
}
