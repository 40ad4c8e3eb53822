//! Core domain types for the region engine
//!
//! Module hierarchy follows type dependency order:
//! - identity: RegionId, SubjectId, GroupName, WorldName
//! - geometry: BlockPos, Aabb
//! - shape: RegionShape (cuboid, polygon, global)
//! - flag: State, FlagValue, FlagMap, FlagRegistry
//! - domain: Subject, owner/member Domains
//! - region: the Region entity
//! - index: RegionIndex and its change delta
//! - order: canonical priority/inheritance ordering
//! - query: RegionQuerySet flag resolution

pub mod domain;
pub mod error;
pub mod flag;
pub mod geometry;
pub mod identity;
pub mod index;
pub mod order;
pub mod query;
pub mod region;
pub mod shape;

pub use domain::{Domain, Subject, SubjectProfile};
pub use error::{CircularInheritance, CoreError, InvalidId, UnknownRegion};
pub use flag::{
    Association, FlagDef, FlagEntry, FlagId, FlagKind, FlagMap, FlagRegistry, FlagValue,
    RegionGroup, State,
};
pub use geometry::{Aabb, BlockPos};
pub use identity::{GroupName, RegionId, SubjectId, WorldName, GLOBAL_REGION};
pub use index::{RegionDifference, RegionIndex, RemovalStrategy, SharedRegionIndex};
pub use order::canonical_order;
pub use query::RegionQuerySet;
pub use region::{Region, RegionLookup};
pub use shape::{Polygon2D, RegionShape};
