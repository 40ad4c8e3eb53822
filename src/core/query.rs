//! Resolved region sets and flag-value resolution
//!
//! `RegionQuerySet` snapshots the regions covering one position: the ordered
//! covering list (global excluded), the ancestor closure needed for chain
//! walks, and the distinguished global region treated as outermost. The
//! snapshot stays valid after the index lock is released.

use std::collections::HashMap;
use std::sync::Arc;

use super::domain::Subject;
use super::flag::{Association, FlagDef, FlagValue, State};
use super::geometry::BlockPos;
use super::identity::RegionId;
use super::index::{RegionIndex, SharedRegionIndex};
use super::order::canonical_order;
use super::region::Region;

/// The regions covering one position, in canonical order.
#[derive(Clone, Debug, Default)]
pub struct RegionQuerySet {
    ordered: Vec<Arc<Region>>,
    ancestors: HashMap<String, Arc<Region>>,
    global: Option<Arc<Region>>,
}

impl RegionQuerySet {
    /// Build from an unordered covering list, resolving order and ancestor
    /// chains against the index.
    pub fn build(covering: Vec<Arc<Region>>, index: &RegionIndex) -> Self {
        let mut ancestors: HashMap<String, Arc<Region>> = HashMap::new();
        for region in &covering {
            ancestors.insert(region.id().normalized(), region.clone());
            let mut next = region.parent().cloned();
            while let Some(pid) = next {
                let key = pid.normalized();
                if ancestors.contains_key(&key) {
                    break;
                }
                let Some(parent) = index.get(&pid) else { break };
                ancestors.insert(key, parent.clone());
                next = parent.parent().cloned();
            }
        }
        let lookup = |id: &RegionId| index.get(id).map(|arc| arc.as_ref());
        let ordered = canonical_order(covering, &lookup);
        Self {
            ordered,
            ancestors,
            global: index.global().cloned(),
        }
    }

    /// Build from a caller-supplied pre-ordered list. Chain walks resolve
    /// within the supplied regions only.
    pub fn from_sorted(ordered: Vec<Arc<Region>>, global: Option<Arc<Region>>) -> Self {
        let ancestors = ordered
            .iter()
            .map(|r| (r.id().normalized(), r.clone()))
            .collect();
        Self {
            ordered,
            ancestors,
            global,
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Covering regions, innermost first, global excluded.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Region>> {
        self.ordered.iter()
    }

    pub fn global(&self) -> Option<&Arc<Region>> {
        self.global.as_ref()
    }

    /// How the subject relates to a region in this set. An absent subject is
    /// a non-member everywhere.
    pub fn association(&self, region: &Region, subject: Option<&dyn Subject>) -> Association {
        match subject {
            Some(s) => {
                let lookup =
                    |id: &RegionId| self.ancestors.get(&id.normalized()).map(|arc| arc.as_ref());
                region.association(s, &lookup)
            }
            None => Association::NonMember,
        }
    }

    /// Resolve one flag to its effective explicit value.
    ///
    /// Regions are consulted innermost to outermost, then the global region.
    /// An entry applies when its group scope (entry's own, else the flag's
    /// default group) contains the subject's association with that region.
    /// The innermost applicable plain entry wins; an applicable entry marked
    /// override ends resolution with its value on the spot. Regions without
    /// the flag are transparent. The flag's own default is not consulted
    /// here.
    pub fn query_value(
        &self,
        subject: Option<&dyn Subject>,
        def: &FlagDef,
    ) -> Option<FlagValue> {
        let mut found: Option<FlagValue> = None;
        for region in self.ordered.iter().chain(self.global.iter()) {
            let Some(entry) = region.flag(&def.id) else {
                continue;
            };
            let group = entry.group.unwrap_or(def.default_group);
            if !group.contains(self.association(region, subject)) {
                continue;
            }
            if entry.is_override {
                return Some(entry.value.clone());
            }
            if found.is_none() {
                found = Some(entry.value.clone());
            }
        }
        found
    }

    /// [`query_value`](Self::query_value) falling back to the flag's default.
    pub fn query_value_or_default(
        &self,
        subject: Option<&dyn Subject>,
        def: &FlagDef,
    ) -> Option<FlagValue> {
        self.query_value(subject, def).or_else(|| def.default.clone())
    }

    /// Resolve one or more state flags to a combined decision. Each flag
    /// resolves with its default as fallback; across flags DENY dominates
    /// ALLOW; nothing resolving yields `None`.
    pub fn query_state(
        &self,
        subject: Option<&dyn Subject>,
        defs: &[&FlagDef],
    ) -> Option<State> {
        let mut combined = None;
        for def in defs {
            let value = self.query_value_or_default(subject, def);
            match value.and_then(|v| v.as_state()) {
                Some(State::Deny) => return Some(State::Deny),
                Some(State::Allow) => combined = Some(State::Allow),
                None => {}
            }
        }
        combined
    }

    /// Every distinct applicable explicit value in canonical order, override
    /// markers ignored. Diagnostic surface.
    pub fn query_all_values(
        &self,
        subject: Option<&dyn Subject>,
        def: &FlagDef,
    ) -> Vec<FlagValue> {
        let mut values: Vec<FlagValue> = Vec::new();
        for region in self.ordered.iter().chain(self.global.iter()) {
            let Some(entry) = region.flag(&def.id) else {
                continue;
            };
            let group = entry.group.unwrap_or(def.default_group);
            if !group.contains(self.association(region, subject)) {
                continue;
            }
            if !values.contains(&entry.value) {
                values.push(entry.value.clone());
            }
        }
        values
    }

    /// Whether the subject owns every covering region. Vacuously true when
    /// nothing covers the position.
    pub fn is_owner_of_all(&self, subject: &dyn Subject) -> bool {
        let lookup = |id: &RegionId| self.ancestors.get(&id.normalized()).map(|arc| arc.as_ref());
        self.ordered.iter().all(|r| r.is_owner(subject, &lookup))
    }

    /// Whether the subject owns or is a member of every covering region.
    /// Vacuously true when nothing covers the position.
    pub fn is_member_of_all(&self, subject: &dyn Subject) -> bool {
        let lookup = |id: &RegionId| self.ancestors.get(&id.normalized()).map(|arc| arc.as_ref());
        self.ordered.iter().all(|r| r.is_member(subject, &lookup))
    }
}

impl RegionIndex {
    /// Resolve the region set covering a position.
    pub fn query(&self, pos: BlockPos) -> RegionQuerySet {
        RegionQuerySet::build(self.regions_at(pos), self)
    }
}

impl SharedRegionIndex {
    /// Resolve under a read lock; the returned set is an owned snapshot.
    pub fn query(&self, pos: BlockPos) -> RegionQuerySet {
        self.read().query(pos)
    }
}
