pub mod area;
pub mod grid;
pub mod regions;
pub mod spawn;
pub mod structures;
pub mod terrain;

pub use area::{Area, ByteGrid};
pub use grid::{AgentId, AreaId, AvoidGridId, BlueprintId, BuildingId, MapGrid, IMPASSABLE_COST};
pub use regions::{RegionCostCalculator, RegionMap};
pub use structures::{Blueprint, Building, BuildingKind, Door, DoorState};
pub use terrain::{TerrainCatalog, TerrainDef, TerrainId, TerrainTags, DEFAULT_SWIM_COST};
