//! Subjects and membership domains
//!
//! Subject: the minimal read-only view a membership check needs
//! SubjectProfile: owned subject snapshot (tests, offline lookups)
//! Domain: a set of subject ids plus a set of group names

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::identity::{GroupName, SubjectId};

/// Read-only view of an acting subject, as membership checks see it.
pub trait Subject {
    fn id(&self) -> SubjectId;
    fn in_group(&self, group: &GroupName) -> bool;
}

/// Owned subject snapshot. Hosts with live subject handles implement
/// [`Subject`] directly; this is for tests and offline evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub id: SubjectId,
    pub groups: BTreeSet<GroupName>,
}

impl SubjectProfile {
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            groups: BTreeSet::new(),
        }
    }

    pub fn with_group(mut self, group: GroupName) -> Self {
        self.groups.insert(group);
        self
    }
}

impl Subject for SubjectProfile {
    fn id(&self) -> SubjectId {
        self.id
    }

    fn in_group(&self, group: &GroupName) -> bool {
        self.groups.contains(group)
    }
}

/// A membership domain: direct subject ids plus named groups.
///
/// A subject belongs when its id is listed or it is in any listed group.
/// Mutations flip the dirty bit so the owning region can report changes;
/// the bit is runtime state and is not persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    subjects: BTreeSet<SubjectId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    groups: BTreeSet<GroupName>,
    #[serde(skip)]
    dirty: bool,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, subject: &dyn Subject) -> bool {
        self.subjects.contains(&subject.id()) || self.groups.iter().any(|g| subject.in_group(g))
    }

    pub fn contains_id(&self, id: SubjectId) -> bool {
        self.subjects.contains(&id)
    }

    pub fn add_subject(&mut self, id: SubjectId) {
        if self.subjects.insert(id) {
            self.dirty = true;
        }
    }

    pub fn remove_subject(&mut self, id: SubjectId) {
        if self.subjects.remove(&id) {
            self.dirty = true;
        }
    }

    pub fn add_group(&mut self, group: GroupName) {
        if self.groups.insert(group) {
            self.dirty = true;
        }
    }

    pub fn remove_group(&mut self, group: &GroupName) {
        if self.groups.remove(group) {
            self.dirty = true;
        }
    }

    pub fn subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.subjects.iter()
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupName> {
        self.groups.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.groups.is_empty()
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.subjects == other.subjects && self.groups == other.groups
    }
}

impl Eq for Domain {}
