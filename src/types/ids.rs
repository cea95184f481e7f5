// src/types/ids.rs
use super::ValidationError;
use crate::constants::ROOT_SENTINEL_ID;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Identifier of a node in a category tree.
///
/// Ids come straight from the scraped listing (`data-id` attributes), so they
/// are kept as opaque strings. The only rules are that an id is non-empty and
/// carries no surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(String);

impl CategoryId {
    /// Parses a raw id, trimming whitespace and rejecting empty input.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField("category id"));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValidationError::InvalidId(format!(
                "control characters in id {:?}",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The id reserved for the synthetic root sentinel.
    pub fn root() -> Self {
        Self(ROOT_SENTINEL_ID.to_string())
    }

    /// Whether this is the root sentinel id.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_SENTINEL_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for CategoryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CategoryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Numeric ids (the listing's `data-id`) are always valid.
impl From<u64> for CategoryId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for CategoryId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CategoryId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        let id = CategoryId::parse(" 36 ").unwrap();
        assert_eq!(id.as_str(), "36");
        assert_eq!(CategoryId::from(36u64), id);
    }

    #[test]
    fn test_invalid_ids() {
        assert!(CategoryId::parse("").is_err());
        assert!(CategoryId::parse("   ").is_err());
        assert!(CategoryId::parse("4\n2").is_err());
    }

    #[test]
    fn test_root_sentinel() {
        assert!(CategoryId::root().is_root());
        assert!(!CategoryId::from(1u64).is_root());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = CategoryId::from(7u64);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"7\"");
        let back: CategoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<CategoryId>("\"\"").is_err());
    }
}
