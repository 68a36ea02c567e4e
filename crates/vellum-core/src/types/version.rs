//! Version tags used as the table's sort key.
//!
//! `V0` always names the current record of an entity. `V1, V2, ...` name
//! archived snapshots in the order they were written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCode, VellumError};

/// A version slot within one entity's partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(u32);

impl VersionTag {
    /// The current (live) slot.
    pub const CURRENT: VersionTag = VersionTag(0);

    /// Tag for archive slot `n`. `archived(0)` is the current slot.
    pub const fn archived(n: u32) -> Self {
        Self(n)
    }

    /// Numeric suffix of the tag.
    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn is_current(&self) -> bool {
        self.0 == 0
    }
}

impl Default for VersionTag {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

impl FromStr for VersionTag {
    type Err = VellumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('V').ok_or_else(|| {
            VellumError::validation_with_code(
                format!("Version tag '{}' must start with 'V'", s),
                ErrorCode::ValInvalidVersion,
            )
        })?;

        // Reject "V", "V+1" and "V01" so every slot has exactly one spelling.
        if digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
            || (digits.len() > 1 && digits.starts_with('0'))
        {
            return Err(VellumError::validation_with_code(
                format!("Version tag '{}' is not of the form V<n>", s),
                ErrorCode::ValInvalidVersion,
            ));
        }

        digits.parse::<u32>().map(Self).map_err(|e| {
            VellumError::validation_with_code(
                format!("Version tag '{}' out of range: {}", s, e),
                ErrorCode::ValInvalidVersion,
            )
        })
    }
}

impl TryFrom<String> for VersionTag {
    type Error = VellumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        assert_eq!(VersionTag::CURRENT.to_string(), "V0");
        assert_eq!(VersionTag::archived(12).to_string(), "V12");
        assert_eq!("V0".parse::<VersionTag>().unwrap(), VersionTag::CURRENT);
        assert_eq!("V7".parse::<VersionTag>().unwrap().number(), 7);
    }

    #[test]
    fn test_rejects_malformed_tags() {
        for bad in ["", "V", "v1", "1", "V01", "V-1", "V1a", "V99999999999"] {
            let err = bad.parse::<VersionTag>().unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValInvalidVersion, "input {:?}", bad);
        }
    }

    #[test]
    fn test_ordering_follows_number() {
        let mut tags = vec![
            VersionTag::archived(10),
            VersionTag::CURRENT,
            VersionTag::archived(2),
        ];
        tags.sort();
        assert_eq!(tags[0], VersionTag::CURRENT);
        assert_eq!(tags[1].number(), 2);
        assert_eq!(tags[2].number(), 10);
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&VersionTag::archived(3)).unwrap();
        assert_eq!(json, "\"V3\"");
        let parsed: VersionTag = serde_json::from_str("\"V0\"").unwrap();
        assert!(parsed.is_current());
        assert!(serde_json::from_str::<VersionTag>("\"X3\"").is_err());
    }
}
