// ABOUTME: Discovery locator parsing ("host" or "host:port").
// ABOUTME: Locators seed the shared cluster registry handle.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Port the registry listens on when a locator omits one.
pub const DEFAULT_LOCATOR_PORT: u16 = 4174;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("locator cannot be empty")]
    Empty,

    #[error("locator host cannot be empty")]
    EmptyHost,

    #[error("invalid locator port: {0}")]
    InvalidPort(String),
}

/// A discovery endpoint of the cluster registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    host: String,
    port: u16,
}

impl Locator {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocatorError::Empty);
        }

        let (host, port) = match s.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| LocatorError::InvalidPort(port_str.to_string()))?;
                (host, port)
            }
            None => (s, DEFAULT_LOCATOR_PORT),
        };

        if host.is_empty() {
            return Err(LocatorError::EmptyHost);
        }

        Ok(Locator::new(host, port))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Join locators the way installed agents expect them: `host:port,host:port`.
pub fn locators_string(locators: &[Locator]) -> String {
    locators
        .iter()
        .map(Locator::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
