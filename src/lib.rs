// Terrain-aware pathfinding for grid simulations, with a real swimming
// movement mode: agents with swim capability cross liquid terrain at
// their swim speed and swim-specific costs, everyone else wades or walks
// around. The search engine is a modified A* with epoch-stamped node
// reuse and a mid-search switch to a precomputed region-distance
// heuristic on large frontiers.

pub mod agent;
pub mod log;
pub mod map;
pub mod pathfind;
pub mod utils;

pub use agent::{AgentKind, AgentProfile, Job, LocomotionUrgency, WaterNeeds};
pub use map::{
    Area, Blueprint, Building, BuildingKind, ByteGrid, Door, DoorState,
    MapGrid, TerrainCatalog, TerrainDef, TerrainId, TerrainTags,
};
pub use pathfind::{
    Danger, Destination, MapPathfinding, Path, PathEndMode, PathFailure,
    PathFinder, PathResult, PathfinderConfig, PathfindingProvider,
    TraverseMode, TraverseParams,
};
pub use utils::{coords::Cell, coords::CellRange, Size};
