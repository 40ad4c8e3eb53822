//! Ordering properties checked exhaustively over small synthetic
//! hierarchies: descendants always precede their present ancestors, and
//! priority (ties by id) orders everything ancestry does not pin down.

use std::collections::HashMap;
use std::sync::Arc;

use warden::{canonical_order, Aabb, BlockPos, Region, RegionId, RegionIndex, RegionShape};

const IDS: [&str; 4] = ["a", "b", "c", "d"];

fn rid(id: &str) -> RegionId {
    RegionId::parse(id).unwrap()
}

fn region(id: &str, priority: i32) -> Region {
    let mut r = Region::new(
        rid(id),
        RegionShape::Cuboid(Aabb::new(BlockPos::new(0, 0, 0), BlockPos::new(9, 9, 9))),
    );
    r.set_priority(priority);
    r
}

/// Every acyclic parent assignment over four regions.
fn parent_assignments() -> Vec<[Option<usize>; 4]> {
    let mut out = Vec::new();
    let choices = [None, Some(0), Some(1), Some(2), Some(3)];
    for &pa in &choices {
        for &pb in &choices {
            for &pc in &choices {
                for &pd in &choices {
                    let assignment = [pa, pb, pc, pd];
                    if is_acyclic(&assignment) {
                        out.push(assignment);
                    }
                }
            }
        }
    }
    out
}

fn is_acyclic(assignment: &[Option<usize>; 4]) -> bool {
    for start in 0..4 {
        let mut seen = [false; 4];
        let mut cursor = Some(start);
        while let Some(i) = cursor {
            if seen[i] {
                return false;
            }
            seen[i] = true;
            cursor = assignment[i];
        }
    }
    true
}

fn strict_ancestors(assignment: &[Option<usize>; 4], i: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut cursor = assignment[i];
    while let Some(j) = cursor {
        out.push(j);
        cursor = assignment[j];
    }
    out
}

/// Regions wired up through the index so parent links are real.
fn build(assignment: &[Option<usize>; 4], priorities: &[i32; 4]) -> Vec<Arc<Region>> {
    let mut index = RegionIndex::new();
    index.add_all((0..4).map(|i| region(IDS[i], priorities[i])));
    for i in 0..4 {
        if let Some(j) = assignment[i] {
            index.set_parent(&rid(IDS[i]), Some(&rid(IDS[j]))).unwrap();
        }
    }
    IDS.iter().map(|id| index.get(&rid(id)).unwrap().clone()).collect()
}

fn positions(order: &[Arc<Region>]) -> HashMap<String, usize> {
    order
        .iter()
        .enumerate()
        .map(|(pos, r)| (r.id().normalized(), pos))
        .collect()
}

fn no_lookup<'a>(_: &RegionId) -> Option<&'a Region> {
    None
}

#[test]
fn descendants_precede_ancestors_in_every_hierarchy() {
    let priority_sets: [[i32; 4]; 4] = [
        [0, 0, 0, 0],
        [10, 5, 0, 20],
        [0, 10, 20, 30],
        [30, 20, 10, 0],
    ];
    for assignment in parent_assignments() {
        for priorities in &priority_sets {
            let input = build(&assignment, priorities);
            let order = canonical_order(input, &no_lookup);
            assert_eq!(order.len(), 4);
            let pos = positions(&order);
            for i in 0..4 {
                for j in strict_ancestors(&assignment, i) {
                    assert!(
                        pos[IDS[i]] < pos[IDS[j]],
                        "{} must precede its ancestor {} (parents {:?}, priorities {:?})",
                        IDS[i],
                        IDS[j],
                        assignment,
                        priorities,
                    );
                }
            }
        }
    }
}

#[test]
fn flat_sets_order_by_priority_then_id() {
    // No ancestry: pure priority order, ties broken by ascending id.
    let input = build(&[None, None, None, None], &[5, 10, 5, 0]);
    let order = canonical_order(input, &no_lookup);
    let got: Vec<&str> = order.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(got, ["b", "a", "c", "d"]);
}

#[test]
fn result_is_independent_of_input_order() {
    let assignment = [None, Some(0), Some(1), None];
    let priorities = [20, 10, 0, 15];
    let baseline = build(&assignment, &priorities);

    let reference: Vec<String> = canonical_order(baseline.clone(), &no_lookup)
        .iter()
        .map(|r| r.id().normalized())
        .collect();

    for rotation in 1..4 {
        let mut shuffled = baseline.clone();
        shuffled.rotate_left(rotation);
        let got: Vec<String> = canonical_order(shuffled, &no_lookup)
            .iter()
            .map(|r| r.id().normalized())
            .collect();
        assert_eq!(got, reference);
    }
}

#[test]
fn chains_interleave_with_unrelated_regions_by_priority() {
    // c(0) -> b(10) -> a(20), plus unrelated d(15): ancestry pins c<b<a,
    // priority slots d ahead of everything it is not chained to.
    let order = canonical_order(
        build(&[None, Some(0), Some(1), None], &[20, 10, 0, 15]),
        &no_lookup,
    );
    let got: Vec<&str> = order.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(got, ["d", "c", "b", "a"]);
}

#[test]
fn subsets_respect_ancestry_through_absent_middle_links() {
    // Full chain c -> b -> a lives in the index; only c and a are queried.
    let mut index = RegionIndex::new();
    index.add_all([region("a", 50), region("b", 0), region("c", 0)]);
    index.set_parent(&rid("b"), Some(&rid("a"))).unwrap();
    index.set_parent(&rid("c"), Some(&rid("b"))).unwrap();

    let input = vec![
        index.get(&rid("a")).unwrap().clone(),
        index.get(&rid("c")).unwrap().clone(),
    ];
    let lookup = |id: &RegionId| index.get(id).map(|arc| arc.as_ref());
    let order = canonical_order(input, &lookup);
    let got: Vec<&str> = order.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(got, ["c", "a"]);
}
