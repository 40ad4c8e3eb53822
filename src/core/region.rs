//! The region entity
//!
//! A region ties a shape to a priority, an optional parent link, owner and
//! member domains, and a flag map. Parent links are stored by id; walking the
//! chain needs a lookup into the owning index (regions do not hold references
//! to each other).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{Domain, Subject};
use super::flag::{Association, FlagEntry, FlagId, FlagMap};
use super::geometry::BlockPos;
use super::identity::RegionId;
use super::shape::RegionShape;

/// Resolves a parent id to a region, normally backed by the owning index.
pub type RegionLookup<'a> = dyn Fn(&RegionId) -> Option<&'a Region> + 'a;

/// A named protected region.
///
/// Freshly constructed regions start dirty so a newly added region always
/// shows up in the next change delta.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Region {
    id: RegionId,
    shape: RegionShape,
    #[serde(default)]
    priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<RegionId>,
    #[serde(default, skip_serializing_if = "Domain::is_empty")]
    owners: Domain,
    #[serde(default, skip_serializing_if = "Domain::is_empty")]
    members: Domain,
    #[serde(default, skip_serializing_if = "FlagMap::is_empty")]
    flags: FlagMap,
    #[serde(skip, default = "default_dirty")]
    dirty: bool,
}

fn default_dirty() -> bool {
    true
}

impl Region {
    pub fn new(id: RegionId, shape: RegionShape) -> Self {
        Self {
            id,
            shape,
            priority: 0,
            parent: None,
            owners: Domain::new(),
            members: Domain::new(),
            flags: FlagMap::new(),
            dirty: true,
        }
    }

    /// The implicit region covering the whole world.
    pub fn global() -> Self {
        Self::new(RegionId::global(), RegionShape::Global)
    }

    pub fn id(&self) -> &RegionId {
        &self.id
    }

    pub fn is_global(&self) -> bool {
        self.id.is_global()
    }

    pub fn shape(&self) -> &RegionShape {
        &self.shape
    }

    pub fn set_shape(&mut self, shape: RegionShape) {
        self.shape = shape;
        self.dirty = true;
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        if self.priority != priority {
            self.priority = priority;
            self.dirty = true;
        }
    }

    pub fn parent(&self) -> Option<&RegionId> {
        self.parent.as_ref()
    }

    /// Set or clear the parent link without a cycle check. The index owns the
    /// acyclicity invariant; use `RegionIndex::set_parent` everywhere else.
    pub(crate) fn set_parent_unchecked(&mut self, parent: Option<RegionId>) {
        if self.parent != parent {
            self.parent = parent;
            self.dirty = true;
        }
    }

    pub fn owners(&self) -> &Domain {
        &self.owners
    }

    pub fn owners_mut(&mut self) -> &mut Domain {
        &mut self.owners
    }

    pub fn members(&self) -> &Domain {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut Domain {
        &mut self.members
    }

    pub fn flags(&self) -> &FlagMap {
        &self.flags
    }

    pub fn flag(&self, id: &FlagId) -> Option<&FlagEntry> {
        self.flags.get(id)
    }

    pub fn set_flag(&mut self, id: FlagId, entry: FlagEntry) {
        self.flags.set(id, entry);
        self.dirty = true;
    }

    pub fn set_flags(&mut self, flags: FlagMap) {
        self.flags = flags;
        self.dirty = true;
    }

    pub fn unset_flag(&mut self, id: &FlagId) {
        if self.flags.unset(id).is_some() {
            self.dirty = true;
        }
    }

    pub fn contains(&self, p: BlockPos) -> bool {
        self.shape.contains(p)
    }

    /// Whether the subject owns this region, directly or through an ancestor.
    pub fn is_owner(&self, subject: &dyn Subject, lookup: &RegionLookup<'_>) -> bool {
        self.walk_chain(lookup, |r| r.owners.contains(subject))
    }

    /// Whether the subject owns or is a member of this region, directly or
    /// through an ancestor.
    pub fn is_member(&self, subject: &dyn Subject, lookup: &RegionLookup<'_>) -> bool {
        self.walk_chain(lookup, |r| {
            r.owners.contains(subject) || r.members.contains(subject)
        })
    }

    /// Whether the subject appears in a member set on the chain, ignoring
    /// owner sets entirely.
    pub fn is_member_only(&self, subject: &dyn Subject, lookup: &RegionLookup<'_>) -> bool {
        self.walk_chain(lookup, |r| r.members.contains(subject))
    }

    /// How the subject relates to this region, through the parent chain.
    pub fn association(&self, subject: &dyn Subject, lookup: &RegionLookup<'_>) -> Association {
        if self.is_owner(subject, lookup) {
            Association::Owner
        } else if self.is_member(subject, lookup) {
            Association::Member
        } else {
            Association::NonMember
        }
    }

    /// Walk self then the parent chain, stopping at the first match. A
    /// visited set guards against cycles in externally loaded data.
    fn walk_chain(&self, lookup: &RegionLookup<'_>, pred: impl Fn(&Region) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        let mut visited = BTreeSet::new();
        visited.insert(self.id.normalized());
        let mut next = self.parent.clone();
        while let Some(pid) = next {
            if !visited.insert(pid.normalized()) {
                break;
            }
            let Some(parent) = lookup(&pid) else { break };
            if pred(parent) {
                return true;
            }
            next = parent.parent.clone();
        }
        false
    }

    /// Whether this region changed since the last `mark_clean`, counting
    /// domain mutations made through `owners_mut`/`members_mut`.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.owners.is_dirty() || self.members.is_dirty()
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
        if !dirty {
            self.owners.mark_clean();
            self.members.mark_clean();
        }
    }

    pub fn mark_clean(&mut self) {
        self.set_dirty(false);
    }

    /// Copy attributes (not id or shape) from another region. Used when a
    /// same-id reshaped region replaces an existing one.
    pub fn copy_from(&mut self, other: &Region) {
        self.priority = other.priority;
        self.parent = other.parent.clone();
        self.owners = other.owners.clone();
        self.members = other.members.clone();
        self.flags = other.flags.clone();
        self.dirty = true;
    }
}

/// Regions are equal when they address the same index slot.
impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.id.normalized() == other.id.normalized()
    }
}

impl Eq for Region {}
