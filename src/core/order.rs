//! Canonical region ordering
//!
//! The resolver consumes regions in a total order with two rules:
//!
//! 1. a region precedes every strict ancestor of it present in the set
//!    (ancestry is absolute and transits through ancestors outside the set);
//! 2. subject to that, higher priority first, ties by ascending normalized
//!    id.
//!
//! The two rules can conflict globally (a child outranked by an unrelated
//! region that its parent outranks), so rule 1 is enforced structurally and
//! rule 2 greedily: the nearest in-set ancestor of each region defines a
//! forest, and a max-heap emits whichever region has all of its in-set
//! descendants already emitted, highest priority first.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use super::region::{Region, RegionLookup};

struct Ready {
    priority: i32,
    key: String,
    idx: usize,
}

impl PartialEq for Ready {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.key == other.key
    }
}

impl Eq for Ready {}

impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ready {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: highest priority pops first, ties by ascending id.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.key.cmp(&self.key))
    }
}

/// Order regions canonically: descendants before present ancestors, then by
/// descending priority, ties by ascending normalized id. `lookup` resolves
/// parent links that leave the input set.
pub fn canonical_order(input: Vec<Arc<Region>>, lookup: &RegionLookup<'_>) -> Vec<Arc<Region>> {
    let n = input.len();
    if n <= 1 {
        return input;
    }

    let in_set: HashMap<String, usize> = input
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id().normalized(), i))
        .collect();

    // Forest edge: each region's nearest strict ancestor inside the set.
    let mut ancestor_of: Vec<Option<usize>> = vec![None; n];
    for (i, region) in input.iter().enumerate() {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(region.id().normalized());
        let mut next = region.parent().cloned();
        while let Some(pid) = next {
            let pkey = pid.normalized();
            if !visited.insert(pkey.clone()) {
                break;
            }
            if let Some(&j) = in_set.get(&pkey) {
                ancestor_of[i] = Some(j);
                break;
            }
            let Some(parent) = lookup(&pid) else { break };
            next = parent.parent().cloned();
        }
    }

    let mut pending = vec![0usize; n];
    for j in ancestor_of.iter().flatten() {
        pending[*j] += 1;
    }

    let mut heap: BinaryHeap<Ready> = input
        .iter()
        .enumerate()
        .filter(|(i, _)| pending[*i] == 0)
        .map(|(i, r)| Ready {
            priority: r.priority(),
            key: r.id().normalized(),
            idx: i,
        })
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(ready) = heap.pop() {
        let i = ready.idx;
        order.push(input[i].clone());
        if let Some(j) = ancestor_of[i] {
            pending[j] -= 1;
            if pending[j] == 0 {
                heap.push(Ready {
                    priority: input[j].priority(),
                    key: input[j].id().normalized(),
                    idx: j,
                });
            }
        }
    }

    // Only reachable with a cyclic parent graph, which the index rejects.
    if order.len() < n {
        warn!(
            stalled = n - order.len(),
            "parent cycle detected while ordering, appending leftovers"
        );
        let emitted: HashSet<String> = order.iter().map(|r| r.id().normalized()).collect();
        let mut rest: Vec<Arc<Region>> = input
            .into_iter()
            .filter(|r| !emitted.contains(&r.id().normalized()))
            .collect();
        rest.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.id().normalized().cmp(&b.id().normalized()))
        });
        order.extend(rest);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{Aabb, BlockPos};
    use crate::core::identity::RegionId;
    use crate::core::shape::RegionShape;

    fn region(id: &str, priority: i32) -> Arc<Region> {
        let mut r = Region::new(
            RegionId::parse(id).unwrap(),
            RegionShape::Cuboid(Aabb::new(BlockPos::new(0, 0, 0), BlockPos::new(9, 9, 9))),
        );
        r.set_priority(priority);
        Arc::new(r)
    }

    fn with_parent(id: &str, priority: i32, parent: &str) -> Arc<Region> {
        let mut r = region(id, priority);
        Arc::make_mut(&mut r).set_parent_unchecked(Some(RegionId::parse(parent).unwrap()));
        r
    }

    fn no_lookup<'a>(_: &RegionId) -> Option<&'a Region> {
        None
    }

    fn ids(order: &[Arc<Region>]) -> Vec<&str> {
        order.iter().map(|r| r.id().as_str()).collect()
    }

    #[test]
    fn child_precedes_parent_despite_lower_priority() {
        let parent = region("parent", 100);
        let child = with_parent("child", 0, "parent");
        let order = canonical_order(vec![parent, child], &no_lookup);
        assert_eq!(ids(&order), ["child", "parent"]);
    }

    #[test]
    fn siblings_sort_by_priority_then_id() {
        let order = canonical_order(
            vec![region("b", 5), region("c", 10), region("a", 5)],
            &no_lookup,
        );
        assert_eq!(ids(&order), ["c", "a", "b"]);
    }

    #[test]
    fn unrelated_region_slots_between_chain_members_by_priority() {
        // child(10) under parent(20), unrelated(15): ancestry pins the chain,
        // priority places the unrelated region first among the ready.
        let order = canonical_order(
            vec![
                with_parent("child", 10, "parent"),
                region("parent", 20),
                region("unrelated", 15),
            ],
            &no_lookup,
        );
        assert_eq!(ids(&order), ["unrelated", "child", "parent"]);
    }

    #[test]
    fn ancestry_transits_through_regions_outside_the_set() {
        // grandparent and child in the set, the middle link resolved only
        // through the lookup.
        let middle = {
            let mut r = Region::new(
                RegionId::parse("middle").unwrap(),
                RegionShape::Global,
            );
            r.set_parent_unchecked(Some(RegionId::parse("grand").unwrap()));
            r
        };
        let lookup = |id: &RegionId| -> Option<&Region> {
            (id.normalized() == "middle").then_some(&middle)
        };

        let order = canonical_order(
            vec![region("grand", 50), with_parent("child", 0, "middle")],
            &lookup,
        );
        assert_eq!(ids(&order), ["child", "grand"]);
    }

    #[test]
    fn empty_and_singleton_inputs() {
        assert!(canonical_order(Vec::new(), &no_lookup).is_empty());
        let one = canonical_order(vec![region("solo", 0)], &no_lookup);
        assert_eq!(ids(&one), ["solo"]);
    }
}
