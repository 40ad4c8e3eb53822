//! Identity atoms
//!
//! RegionId: region identifier, unique per index by normalized form
//! SubjectId: stable unique id of an acting subject
//! GroupName: named group a subject may belong to
//! WorldName: host world identifier (bypass cache key)

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{CoreError, InvalidId};

/// Reserved id of the implicit region covering the whole world.
pub const GLOBAL_REGION: &str = "__global__";

/// Region identifier.
///
/// The given case is preserved for display; indexing and equality of the
/// *key* use the lowercase normalized form. Two ids that differ only in case
/// address the same index slot.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionId(String);

impl RegionId {
    /// Parse and validate a region id string.
    ///
    /// Ids are non-empty and limited to alphanumerics plus `_,'-+/`.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.is_empty() {
            return Err(InvalidId::Region {
                raw: s,
                reason: "empty".into(),
            }
            .into());
        }
        for c in s.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '_' | ',' | '\'' | '-' | '+' | '/') {
                return Err(InvalidId::Region {
                    raw: s.clone(),
                    reason: format!("contains disallowed character `{c}`"),
                }
                .into());
            }
        }
        Ok(Self(s))
    }

    /// The id of the implicit global region.
    pub fn global() -> Self {
        Self(GLOBAL_REGION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used as the index key.
    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    pub fn is_global(&self) -> bool {
        self.0.eq_ignore_ascii_case(GLOBAL_REGION)
    }
}

impl fmt::Debug for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionId({:?})", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RegionId {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        RegionId::parse(s)
    }
}

impl From<RegionId> for String {
    fn from(id: RegionId) -> String {
        id.0
    }
}

/// Stable unique id of an acting subject.
///
/// Equality uses the id only; live subject handles are never compared.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(Uuid);

impl SubjectId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random id (hosts and tests).
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectId({})", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named group - non-empty, case-insensitive (stored lowercase).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupName(String);

impl GroupName {
    /// Parse and validate a group name.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into().trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(InvalidId::Group {
                raw: s,
                reason: "empty".into(),
            }
            .into());
        }
        if s.contains(char::is_whitespace) {
            return Err(InvalidId::Group {
                raw: s,
                reason: "cannot contain whitespace".into(),
            }
            .into());
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupName({:?})", self.0)
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for GroupName {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        GroupName::parse(s)
    }
}

impl From<GroupName> for String {
    fn from(g: GroupName) -> String {
        g.0
    }
}

/// Host world name - non-empty, trimmed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorldName(String);

impl WorldName {
    /// Parse and validate a world name.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into().trim().to_string();
        if s.is_empty() {
            return Err(InvalidId::World {
                raw: s,
                reason: "empty".into(),
            }
            .into());
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WorldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorldName({:?})", self.0)
    }
}

impl fmt::Display for WorldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for WorldName {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        WorldName::parse(s)
    }
}

impl From<WorldName> for String {
    fn from(w: WorldName) -> String {
        w.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_id_accepts_typical_names() {
        for raw in ["spawn", "mall-east", "plot_1,a", "a+b/c'd"] {
            let id = RegionId::parse(raw).unwrap();
            assert_eq!(id.as_str(), raw);
        }
    }

    #[test]
    fn region_id_rejects_invalid() {
        assert!(RegionId::parse("").is_err());
        assert!(RegionId::parse("has space").is_err());
        assert!(RegionId::parse("semi;colon").is_err());
    }

    #[test]
    fn region_id_preserves_case_but_normalizes_key() {
        let id = RegionId::parse("Spawn").unwrap();
        assert_eq!(id.as_str(), "Spawn");
        assert_eq!(id.normalized(), "spawn");
    }

    #[test]
    fn global_id_detected_case_insensitively() {
        assert!(RegionId::global().is_global());
        assert!(RegionId::parse("__GLOBAL__").unwrap().is_global());
        assert!(!RegionId::parse("spawn").unwrap().is_global());
    }

    #[test]
    fn group_name_lowercases_and_trims() {
        let g = GroupName::parse("  Builders ").unwrap();
        assert_eq!(g.as_str(), "builders");
        assert!(GroupName::parse("   ").is_err());
    }

    #[test]
    fn world_name_rejects_empty() {
        assert!(WorldName::parse("  ").is_err());
        assert_eq!(WorldName::parse(" overworld ").unwrap().as_str(), "overworld");
    }
}
