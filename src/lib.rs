#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod debounce;
pub mod error;
pub mod session;
pub mod telemetry;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    canonical_order, Aabb, Association, BlockPos, CircularInheritance, CoreError, Domain, FlagDef,
    FlagEntry, FlagId, FlagKind, FlagMap, FlagRegistry, FlagValue, GroupName, InvalidId,
    Polygon2D, Region, RegionDifference, RegionGroup, RegionId, RegionIndex, RegionLookup,
    RegionQuerySet, RegionShape, RemovalStrategy, SharedRegionIndex, State, Subject, SubjectId,
    SubjectProfile, UnknownRegion, WorldName, GLOBAL_REGION,
};
pub use crate::debounce::{Cancellable, DebounceCache, Outcome};
pub use crate::session::{
    Handler, HandlerFactory, HandlerRegistry, OnlineSubject, PermissionLookup, ReevalScheduler,
    Session, SessionManager, SubjectEffects, TickContext,
};
