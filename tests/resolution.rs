//! Flag resolution scenarios over realistic region layouts.

use warden::{
    Aabb, BlockPos, FlagDef, FlagEntry, FlagRegistry, FlagValue, GroupName, Region, RegionGroup,
    RegionId, RegionIndex, RegionShape, State, SubjectId, SubjectProfile,
};

fn rid(id: &str) -> RegionId {
    RegionId::parse(id).unwrap()
}

fn cuboid(id: &str, min: i64, max: i64, priority: i32) -> Region {
    let mut r = Region::new(
        rid(id),
        RegionShape::Cuboid(Aabb::new(
            BlockPos::new(min, min, min),
            BlockPos::new(max, max, max),
        )),
    );
    r.set_priority(priority);
    r
}

fn state_entry(state: State) -> FlagEntry {
    FlagEntry::new(FlagValue::State(state))
}

fn def<'a>(registry: &'a FlagRegistry, name: &str) -> &'a FlagDef {
    registry.get_by_name(name).unwrap()
}

#[test]
fn nested_allow_wins_inside_global_deny_outside() {
    let registry = FlagRegistry::builtin();
    let pvp = def(&registry, "pvp");

    let mut global = Region::global();
    global.set_flag(pvp.id.clone(), state_entry(State::Deny));
    let mut arena = cuboid("arena", 0, 100, 0);
    arena.set_flag(pvp.id.clone(), state_entry(State::Allow));

    let mut index = RegionIndex::new();
    index.add_all([global, arena]);

    let inside = index.query(BlockPos::new(50, 50, 50));
    assert_eq!(inside.query_state(None, &[pvp]), Some(State::Allow));

    let outside = index.query(BlockPos::new(500, 50, 500));
    assert_eq!(outside.query_state(None, &[pvp]), Some(State::Deny));
}

#[test]
fn override_deny_beats_more_specific_allow() {
    let registry = FlagRegistry::builtin();
    let pvp = def(&registry, "pvp");

    // The override sits on the outermost, lowest-priority region.
    let mut lockdown = cuboid("lockdown", 0, 1000, 0);
    lockdown.set_flag(pvp.id.clone(), state_entry(State::Deny).with_override());
    let mut arena = cuboid("arena", 100, 200, 50);
    arena.set_flag(pvp.id.clone(), state_entry(State::Allow));

    let mut index = RegionIndex::new();
    index.add_all([lockdown, arena]);

    let set = index.query(BlockPos::new(150, 150, 150));
    assert_eq!(
        set.query_value(None, pvp),
        Some(FlagValue::State(State::Deny))
    );
}

#[test]
fn group_membership_through_named_groups() {
    let registry = FlagRegistry::builtin();
    let build = def(&registry, "build");
    let builders = GroupName::parse("builders").unwrap();

    let mut site = cuboid("site", 0, 100, 0);
    site.members_mut().add_group(builders.clone());
    site.set_flag(
        build.id.clone(),
        state_entry(State::Deny).with_group(RegionGroup::NonMembers),
    );

    let mut index = RegionIndex::new();
    index.add(site);
    let set = index.query(BlockPos::new(50, 50, 50));

    let builder = SubjectProfile::new(SubjectId::generate()).with_group(builders);
    let visitor = SubjectProfile::new(SubjectId::generate());

    // The deny is scoped to non-members; group members resolve to the
    // flag default instead.
    assert_eq!(set.query_state(Some(&builder), &[build]), Some(State::Allow));
    assert_eq!(set.query_state(Some(&visitor), &[build]), Some(State::Deny));
}

#[test]
fn inherited_ownership_scopes_entries_on_child_regions() {
    let registry = FlagRegistry::builtin();
    let entry = def(&registry, "entry");
    let mayor = SubjectProfile::new(SubjectId::generate());

    let mut town = cuboid("town", 0, 200, 0);
    town.owners_mut().add_subject(mayor.id);
    // entry defaults to the non-members group scope
    let mut vault = cuboid("vault", 50, 60, 10);
    vault.set_flag(entry.id.clone(), state_entry(State::Deny));

    let mut index = RegionIndex::new();
    index.add_all([town, vault]);
    index.set_parent(&rid("vault"), Some(&rid("town"))).unwrap();

    let set = index.query(BlockPos::new(55, 55, 55));
    // Owner of the parent owns the child; the non-members deny passes over.
    assert_eq!(set.query_state(Some(&mayor), &[entry]), Some(State::Allow));
    let stranger = SubjectProfile::new(SubjectId::generate());
    assert_eq!(
        set.query_state(Some(&stranger), &[entry]),
        Some(State::Deny)
    );
}

#[test]
fn multi_flag_state_query_lets_deny_dominate() {
    let registry = FlagRegistry::builtin();
    let build = def(&registry, "build");
    let pvp = def(&registry, "pvp");

    let mut site = cuboid("site", 0, 100, 0);
    site.set_flag(pvp.id.clone(), state_entry(State::Deny));

    let mut index = RegionIndex::new();
    index.add(site);
    let set = index.query(BlockPos::new(50, 50, 50));

    // build resolves to its default allow, pvp to explicit deny.
    assert_eq!(set.query_state(None, &[build]), Some(State::Allow));
    assert_eq!(set.query_state(None, &[build, pvp]), Some(State::Deny));
}

#[test]
fn unset_flags_resolve_to_nothing_without_defaults() {
    let registry = FlagRegistry::builtin();
    let greeting = def(&registry, "greeting");
    let invincible = def(&registry, "invincible");

    let mut index = RegionIndex::new();
    index.add(cuboid("plain", 0, 100, 0));
    let set = index.query(BlockPos::new(50, 50, 50));

    assert_eq!(set.query_value(None, greeting), None);
    assert_eq!(set.query_value_or_default(None, greeting), None);
    assert_eq!(set.query_state(None, &[invincible]), None);
}

#[test]
fn predicates_vacuously_true_outside_all_regions() {
    let mut index = RegionIndex::new();
    index.add(cuboid("somewhere", 0, 10, 0));
    let set = index.query(BlockPos::new(1000, 1000, 1000));

    let subject = SubjectProfile::new(SubjectId::generate());
    assert!(set.is_empty());
    assert!(set.is_owner_of_all(&subject));
    assert!(set.is_member_of_all(&subject));
}

#[test]
fn owner_and_member_of_all_require_every_covering_region() {
    let owner = SubjectProfile::new(SubjectId::generate());

    let mut a = cuboid("a", 0, 100, 0);
    a.owners_mut().add_subject(owner.id);
    let b = cuboid("b", 0, 100, 5);

    let mut index = RegionIndex::new();
    index.add_all([a, b]);
    let set = index.query(BlockPos::new(50, 50, 50));

    assert!(!set.is_owner_of_all(&owner));
    assert!(!set.is_member_of_all(&owner));

    if let Some(r) = index.get_mut(&rid("b")) {
        r.members_mut().add_subject(owner.id);
    }
    let set = index.query(BlockPos::new(50, 50, 50));
    assert!(set.is_member_of_all(&owner));
    assert!(!set.is_owner_of_all(&owner));
}

#[test]
fn priority_breaks_conflicts_between_overlapping_siblings() {
    let registry = FlagRegistry::builtin();
    let pvp = def(&registry, "pvp");

    let mut low = cuboid("low", 0, 100, 1);
    low.set_flag(pvp.id.clone(), state_entry(State::Allow));
    let mut high = cuboid("high", 0, 100, 10);
    high.set_flag(pvp.id.clone(), state_entry(State::Deny));

    let mut index = RegionIndex::new();
    index.add_all([low, high]);
    let set = index.query(BlockPos::new(50, 50, 50));

    assert_eq!(
        set.query_value(None, pvp),
        Some(FlagValue::State(State::Deny))
    );
}
