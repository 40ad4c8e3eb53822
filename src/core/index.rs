//! Region index and change tracking
//!
//! `RegionIndex` owns its regions by value behind `Arc` (copy-on-write via
//! `Arc::make_mut`), keyed by normalized id. `SharedRegionIndex` wraps it in
//! `Arc<RwLock>` so structural mutation is one mutual-exclusion domain while
//! point and area queries share the read side.
//!
//! Spatial queries are a naive full scan. The index stays correct at any
//! size; acceleration is a hint surface (`bias`/`forget`) a future layout can
//! honor.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use super::error::{CircularInheritance, CoreError, UnknownRegion};
use super::geometry::{Aabb, BlockPos};
use super::identity::RegionId;
use super::region::Region;

/// What happens to children when their parent is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalStrategy {
    /// Remove transitive descendants along with the region.
    RemoveChildren,
    /// Keep children, clearing the parent link on direct children only.
    UnsetParentInChildren,
}

/// Snapshot of accumulated changes since the last collection.
#[derive(Clone, Debug, Default)]
pub struct RegionDifference {
    pub changed: Vec<Arc<Region>>,
    pub removed: Vec<Arc<Region>>,
}

impl RegionDifference {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// All regions of one world, keyed by normalized id.
#[derive(Clone, Debug, Default)]
pub struct RegionIndex {
    regions: HashMap<String, Arc<Region>>,
    removed: HashMap<String, Arc<Region>>,
}

impl RegionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a region by normalized id.
    ///
    /// A replacement whose exact-case id differs marks the old entry removed
    /// so a persistence collaborator can drop the old record. A parent link
    /// naming an absent region is cleared with a diagnostic.
    pub fn add(&mut self, region: Region) {
        self.add_all(std::iter::once(region));
    }

    /// Insert a batch. All regions land before parent links are checked, so
    /// links between batch members resolve.
    pub fn add_all(&mut self, regions: impl IntoIterator<Item = Region>) {
        let mut keys = Vec::new();
        for region in regions {
            let key = region.id().normalized();
            let exact = region.id().clone();
            match self.regions.insert(key.clone(), Arc::new(region)) {
                Some(old) if old.id().as_str() != exact.as_str() => {
                    self.removed.insert(key.clone(), old);
                }
                // A re-add supersedes any pending removal of the same slot.
                _ => {
                    self.removed.remove(&key);
                }
            }
            keys.push(key);
        }
        for key in keys {
            let dangling = match self.regions[&key].parent() {
                Some(pid) => {
                    let pkey = pid.normalized();
                    pkey == key || !self.regions.contains_key(&pkey)
                }
                None => false,
            };
            if dangling {
                if let Some(arc) = self.regions.get_mut(&key) {
                    let region = Arc::make_mut(arc);
                    warn!(
                        region = %region.id(),
                        parent = %region.parent().map(ToString::to_string).unwrap_or_default(),
                        "clearing parent link naming an absent region"
                    );
                    region.set_parent_unchecked(None);
                }
            }
        }
    }

    /// Remove a region, applying the strategy to its children. Returns every
    /// region taken out of the index; empty when the id is unknown.
    pub fn remove(&mut self, id: &RegionId, strategy: RemovalStrategy) -> Vec<Arc<Region>> {
        let key = id.normalized();
        let Some(first) = self.regions.remove(&key) else {
            return Vec::new();
        };
        self.removed.insert(key.clone(), first.clone());
        let mut taken = vec![first];

        match strategy {
            RemovalStrategy::RemoveChildren => {
                // Re-scan for children of anything already removed until no
                // more are found.
                let mut gone: HashSet<String> = HashSet::new();
                gone.insert(key);
                loop {
                    let orphans: Vec<String> = self
                        .regions
                        .iter()
                        .filter(|(_, r)| {
                            r.parent().is_some_and(|p| gone.contains(&p.normalized()))
                        })
                        .map(|(k, _)| k.clone())
                        .collect();
                    if orphans.is_empty() {
                        break;
                    }
                    for k in orphans {
                        if let Some(r) = self.regions.remove(&k) {
                            self.removed.insert(k.clone(), r.clone());
                            taken.push(r);
                        }
                        gone.insert(k);
                    }
                }
            }
            RemovalStrategy::UnsetParentInChildren => {
                let children: Vec<String> = self
                    .regions
                    .iter()
                    .filter(|(_, r)| r.parent().is_some_and(|p| p.normalized() == key))
                    .map(|(k, _)| k.clone())
                    .collect();
                for k in children {
                    if let Some(arc) = self.regions.get_mut(&k) {
                        Arc::make_mut(arc).set_parent_unchecked(None);
                    }
                }
            }
        }
        taken
    }

    pub fn get(&self, id: &RegionId) -> Option<&Arc<Region>> {
        self.regions.get(&id.normalized())
    }

    /// In-place mutation handle. Marks nothing by itself; the region's own
    /// setters track dirtiness.
    pub fn get_mut(&mut self, id: &RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id.normalized()).map(Arc::make_mut)
    }

    pub fn contains_id(&self, id: &RegionId) -> bool {
        self.regions.contains_key(&id.normalized())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Region>> {
        self.regions.values()
    }

    /// The implicit global region, if one has been added.
    pub fn global(&self) -> Option<&Arc<Region>> {
        self.get(&RegionId::global())
    }

    /// Set or clear a region's parent, enforcing acyclicity.
    ///
    /// Rejection leaves the existing link untouched: the ancestor walk runs
    /// before any assignment.
    pub fn set_parent(
        &mut self,
        child: &RegionId,
        parent: Option<&RegionId>,
    ) -> Result<(), CoreError> {
        let child_key = child.normalized();
        if !self.regions.contains_key(&child_key) {
            return Err(UnknownRegion {
                id: child.to_string(),
            }
            .into());
        }
        let Some(parent) = parent else {
            if let Some(arc) = self.regions.get_mut(&child_key) {
                Arc::make_mut(arc).set_parent_unchecked(None);
            }
            return Ok(());
        };
        let parent_key = parent.normalized();
        let Some(parent_arc) = self.regions.get(&parent_key) else {
            return Err(UnknownRegion {
                id: parent.to_string(),
            }
            .into());
        };
        let exact_parent = parent_arc.id().clone();

        let mut visited = HashSet::new();
        let mut cursor = Some(parent_key);
        while let Some(key) = cursor {
            if key == child_key {
                return Err(CircularInheritance {
                    region: child.to_string(),
                    parent: parent.to_string(),
                }
                .into());
            }
            if !visited.insert(key.clone()) {
                break;
            }
            cursor = self
                .regions
                .get(&key)
                .and_then(|r| r.parent().map(RegionId::normalized));
        }

        if let Some(arc) = self.regions.get_mut(&child_key) {
            Arc::make_mut(arc).set_parent_unchecked(Some(exact_parent));
        }
        Ok(())
    }

    /// Visit every region containing the position, excluding the global
    /// region. The visitor returning false stops the scan.
    pub fn apply_containing(&self, pos: BlockPos, mut visitor: impl FnMut(&Arc<Region>) -> bool) {
        for region in self.regions.values() {
            if region.is_global() {
                continue;
            }
            if region.contains(pos) && !visitor(region) {
                return;
            }
        }
    }

    /// Visit every region whose shape intersects the given region's shape,
    /// excluding the global region and the region itself.
    pub fn apply_intersecting(
        &self,
        region: &Region,
        mut visitor: impl FnMut(&Arc<Region>) -> bool,
    ) {
        let key = region.id().normalized();
        for candidate in self.regions.values() {
            if candidate.is_global() || candidate.id().normalized() == key {
                continue;
            }
            if candidate.shape().intersects(region.shape()) && !visitor(candidate) {
                return;
            }
        }
    }

    /// Collect the regions covering a position, global excluded, unordered.
    pub fn regions_at(&self, pos: BlockPos) -> Vec<Arc<Region>> {
        let mut out = Vec::new();
        self.apply_containing(pos, |r| {
            out.push(r.clone());
            true
        });
        out
    }

    /// Collect the regions intersecting the given region's shape, global and
    /// the region itself excluded, unordered.
    pub fn intersecting(&self, region: &Region) -> Vec<Arc<Region>> {
        let mut out = Vec::new();
        self.apply_intersecting(region, |r| {
            out.push(r.clone());
            true
        });
        out
    }

    /// Acceleration hint: the area is about to be queried heavily. The flat
    /// index has nothing to warm, so this is a no-op.
    pub fn bias(&self, _area: Aabb) {}

    /// Acceleration hint: drop any warmed state for the area. No-op.
    pub fn forget(&self, _area: Aabb) {}

    /// Whether any region changed or any removal is pending.
    pub fn is_dirty(&self) -> bool {
        !self.removed.is_empty() || self.regions.values().any(|r| r.is_dirty())
    }

    /// Force the dirty state of every region. Clearing also drops pending
    /// removals.
    pub fn set_dirty(&mut self, dirty: bool) {
        for arc in self.regions.values_mut() {
            Arc::make_mut(arc).set_dirty(dirty);
        }
        if !dirty {
            self.removed.clear();
        }
    }

    /// Snapshot and clear the accumulated changes in one step.
    pub fn get_and_clear_difference(&mut self) -> RegionDifference {
        let mut changed = Vec::new();
        for arc in self.regions.values_mut() {
            if arc.is_dirty() {
                Arc::make_mut(arc).mark_clean();
                changed.push(arc.clone());
            }
        }
        let removed = self.removed.drain().map(|(_, r)| r).collect();
        RegionDifference { changed, removed }
    }
}

/// Thread-shared handle over a [`RegionIndex`].
///
/// A poisoned lock yields the inner guard; the index holds no invariants a
/// panicked writer could leave half-applied across calls.
#[derive(Clone, Debug, Default)]
pub struct SharedRegionIndex(Arc<RwLock<RegionIndex>>);

impl SharedRegionIndex {
    pub fn new(index: RegionIndex) -> Self {
        Self(Arc::new(RwLock::new(index)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, RegionIndex> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, RegionIndex> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}
