//! Typed policy flags
//!
//! FlagId: flag identity
//! FlagValue: closed heterogeneous value enum with typed accessors
//! FlagEntry: a value as set on one region (group scope + override marker)
//! FlagMap: per-region flag storage; absent key means "unset"
//! FlagDef/FlagRegistry: flag metadata, including the flag-specific default

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidId};

/// Flag identifier - non-empty, lowercase `[a-z0-9-]`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlagId(String);

impl FlagId {
    /// Parse and validate a flag id string.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into().to_ascii_lowercase();
        if s.is_empty() {
            return Err(InvalidId::Flag {
                raw: s,
                reason: "empty".into(),
            }
            .into());
        }
        for c in s.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(InvalidId::Flag {
                    raw: s.clone(),
                    reason: format!("contains disallowed character `{c}`"),
                }
                .into());
            }
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagId({:?})", self.0)
    }
}

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for FlagId {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        FlagId::parse(s)
    }
}

impl From<FlagId> for String {
    fn from(id: FlagId) -> String {
        id.0
    }
}

/// Tri-state flag decision (the third state is "unset", modeled as absence).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Allow,
    Deny,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// How a subject relates to a region (through the parent chain).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Association {
    Owner,
    Member,
    NonMember,
}

/// Which subjects a flag entry applies to. Ownership implies membership, so
/// `Members` covers owners too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionGroup {
    All,
    Members,
    Owners,
    NonMembers,
    NonOwners,
}

impl RegionGroup {
    pub fn contains(&self, association: Association) -> bool {
        match self {
            Self::All => true,
            Self::Members => matches!(association, Association::Owner | Association::Member),
            Self::Owners => matches!(association, Association::Owner),
            Self::NonMembers => matches!(association, Association::NonMember),
            Self::NonOwners => matches!(association, Association::Member | Association::NonMember),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Members => "members",
            Self::Owners => "owners",
            Self::NonMembers => "non_members",
            Self::NonOwners => "non_owners",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "members" => Some(Self::Members),
            "owners" => Some(Self::Owners),
            "non_members" => Some(Self::NonMembers),
            "non_owners" => Some(Self::NonOwners),
            _ => None,
        }
    }
}

/// Value kind a flag accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    State,
    Bool,
    Int,
    Float,
    Text,
    List,
}

/// A typed flag value.
///
/// Closed enum with typed accessors: the value set is fixed, so exhaustive
/// matching beats type erasure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagValue {
    State(State),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::State(_) => FlagKind::State,
            Self::Bool(_) => FlagKind::Bool,
            Self::Int(_) => FlagKind::Int,
            Self::Float(_) => FlagKind::Float,
            Self::Text(_) => FlagKind::Text,
            Self::List(_) => FlagKind::List,
        }
    }

    pub fn as_state(&self) -> Option<State> {
        match self {
            Self::State(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Decode a raw persisted value against the expected kind. `None` means
    /// the value is malformed for that kind (caller skips and diagnoses).
    pub fn unmarshal(kind: FlagKind, raw: &serde_json::Value) -> Option<FlagValue> {
        match kind {
            FlagKind::State => raw.as_str().and_then(|s| match s {
                s if s.eq_ignore_ascii_case("allow") => Some(FlagValue::State(State::Allow)),
                s if s.eq_ignore_ascii_case("deny") => Some(FlagValue::State(State::Deny)),
                _ => None,
            }),
            FlagKind::Bool => raw.as_bool().map(FlagValue::Bool),
            FlagKind::Int => raw.as_i64().map(FlagValue::Int),
            FlagKind::Float => raw.as_f64().map(FlagValue::Float),
            FlagKind::Text => raw.as_str().map(|s| FlagValue::Text(s.to_string())),
            FlagKind::List => raw.as_array().and_then(|items| {
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(FlagValue::List)
            }),
        }
    }
}

/// A flag value as set on one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlagEntry {
    pub value: FlagValue,
    /// Overrides the flag's default group scope when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<RegionGroup>,
    /// Short-circuits resolution regardless of more specific settings.
    #[serde(default, rename = "override", skip_serializing_if = "std::ops::Not::not")]
    pub is_override: bool,
}

impl FlagEntry {
    pub fn new(value: FlagValue) -> Self {
        Self {
            value,
            group: None,
            is_override: false,
        }
    }

    pub fn with_group(mut self, group: RegionGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_override(mut self) -> Self {
        self.is_override = true;
        self
    }
}

/// Per-region flag storage. Absent key means "unset", which is distinct from
/// any explicit value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagMap {
    by_id: BTreeMap<FlagId, FlagEntry>,
}

impl FlagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: FlagId, entry: FlagEntry) {
        self.by_id.insert(id, entry);
    }

    pub fn unset(&mut self, id: &FlagId) -> Option<FlagEntry> {
        self.by_id.remove(id)
    }

    pub fn get(&self, id: &FlagId) -> Option<&FlagEntry> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &FlagId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlagId, &FlagEntry)> {
        self.by_id.iter()
    }

    /// Decode persisted `(name -> raw value)` pairs. Malformed or unknown
    /// entries are skipped with a diagnostic; the rest of the map loads.
    ///
    /// Raw entries are either a bare value or an object
    /// `{ "value": .., "group": .., "override": .. }`.
    pub fn unmarshal(
        raw: &BTreeMap<String, serde_json::Value>,
        registry: &FlagRegistry,
    ) -> FlagMap {
        let mut map = FlagMap::new();
        for (name, raw_value) in raw {
            let id = match FlagId::parse(name.clone()) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(flag = %name, "skipping flag with invalid id: {e}");
                    continue;
                }
            };
            let Some(def) = registry.get(&id) else {
                tracing::warn!(flag = %id, "skipping unknown flag");
                continue;
            };
            match unmarshal_entry(def, raw_value) {
                Some(entry) => map.set(id, entry),
                None => {
                    tracing::warn!(flag = %id, "skipping malformed flag value");
                }
            }
        }
        map
    }
}

fn unmarshal_entry(def: &FlagDef, raw: &serde_json::Value) -> Option<FlagEntry> {
    if let Some(obj) = raw.as_object() {
        if obj.contains_key("value") {
            let value = FlagValue::unmarshal(def.kind, obj.get("value")?)?;
            let group = match obj.get("group") {
                Some(g) => Some(RegionGroup::parse(g.as_str()?)?),
                None => None,
            };
            let is_override = match obj.get("override") {
                Some(v) => v.as_bool()?,
                None => false,
            };
            return Some(FlagEntry {
                value,
                group,
                is_override,
            });
        }
    }
    FlagValue::unmarshal(def.kind, raw).map(FlagEntry::new)
}

/// Flag metadata: value kind, flag-specific default, and the default group
/// scope entries inherit when they set no group of their own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlagDef {
    pub id: FlagId,
    pub kind: FlagKind,
    pub default: Option<FlagValue>,
    pub default_group: RegionGroup,
}

impl FlagDef {
    pub fn new(id: FlagId, kind: FlagKind) -> Self {
        Self {
            id,
            kind,
            default: None,
            default_group: RegionGroup::All,
        }
    }

    pub fn with_default(mut self, value: FlagValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_default_group(mut self, group: RegionGroup) -> Self {
        self.default_group = group;
        self
    }
}

/// The set of known flags.
#[derive(Clone, Debug, Default)]
pub struct FlagRegistry {
    by_id: BTreeMap<FlagId, FlagDef>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin policy flags.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let state = |name: &str| FlagDef::new(flag_id(name), FlagKind::State);
        let int = |name: &str| FlagDef::new(flag_id(name), FlagKind::Int);
        let float = |name: &str| FlagDef::new(flag_id(name), FlagKind::Float);
        let text = |name: &str| FlagDef::new(flag_id(name), FlagKind::Text);

        registry.register(state("build").with_default(FlagValue::State(State::Allow)));
        registry.register(state("pvp").with_default(FlagValue::State(State::Allow)));
        registry.register(
            state("entry")
                .with_default(FlagValue::State(State::Allow))
                .with_default_group(RegionGroup::NonMembers),
        );
        registry.register(
            state("exit")
                .with_default(FlagValue::State(State::Allow))
                .with_default_group(RegionGroup::NonMembers),
        );
        registry.register(state("passthrough"));
        registry.register(state("invincible"));
        registry.register(text("greeting"));
        registry.register(text("farewell"));
        registry.register(float("heal-amount"));
        registry.register(int("heal-delay").with_default(FlagValue::Int(1)));
        registry.register(float("feed-amount"));
        registry.register(int("feed-delay").with_default(FlagValue::Int(1)));
        registry.register(text("game-mode"));
        registry.register(int("time-lock"));
        registry.register(text("weather-lock"));
        registry
    }

    /// Insert or replace a flag definition.
    pub fn register(&mut self, def: FlagDef) {
        self.by_id.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &FlagId) -> Option<&FlagDef> {
        self.by_id.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&FlagDef> {
        let id = FlagId::parse(name).ok()?;
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagDef> {
        self.by_id.values()
    }
}

fn flag_id(name: &str) -> FlagId {
    FlagId::parse(name).expect("builtin flag id is valid")
}
