// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Accepts locators as strings or host/port maps and normalizes zone tags.

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::types::Locator;

pub fn deserialize_locators<'de, D>(deserializer: D) -> Result<NonEmpty<Locator>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<LocatorEntry> = Vec::deserialize(deserializer)?;
    let locators = values
        .into_iter()
        .map(LocatorEntry::into_locator)
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(locators)
        .ok_or_else(|| serde::de::Error::custom("at least one discovery locator is required"))
}

/// Zone tags are trimmed; blank entries are dropped.
pub fn deserialize_zones<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<String> = Vec::deserialize(deserializer)?;
    let mut zones: Vec<String> = Vec::with_capacity(values.len());
    for zone in values {
        let zone = zone.trim();
        if !zone.is_empty() && !zones.iter().any(|z| z == zone) {
            zones.push(zone.to_string());
        }
    }
    Ok(zones)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LocatorEntry {
    Simple(String),
    Detailed { host: String, port: Option<u16> },
}

impl LocatorEntry {
    fn into_locator(self) -> Result<Locator, String> {
        match self {
            LocatorEntry::Simple(s) => s.parse().map_err(|e| format!("{}: {}", s, e)),
            LocatorEntry::Detailed { host, port } => {
                if host.trim().is_empty() {
                    return Err("locator host cannot be empty".to_string());
                }
                Ok(Locator::new(
                    host.trim(),
                    port.unwrap_or(crate::types::DEFAULT_LOCATOR_PORT),
                ))
            }
        }
    }
}
