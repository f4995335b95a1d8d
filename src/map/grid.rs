use std::sync::atomic::{AtomicU32, Ordering};

use bitvec::vec::BitVec;
use slab::Slab;
use smallvec::SmallVec;

use crate::{
    agent::AgentProfile,
    log,
    utils::{coords::Cell, Size},
};

use super::{
    area::{Area, ByteGrid},
    regions::RegionMap,
    structures::{Blueprint, Building},
    terrain::{TerrainCatalog, TerrainDef, TerrainId},
};

// ----------------------------------------------
// Handles
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuildingId(pub(crate) u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlueprintId(pub(crate) u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AgentId(pub(crate) u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AreaId(pub(crate) u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AvoidGridId(pub(crate) u32);

// ----------------------------------------------
// MapGrid
// ----------------------------------------------

// Static path-grid cost at or above this marks a cell as unwalkable.
pub const IMPASSABLE_COST: i32 = 10000;

static NEXT_MAP_ID: AtomicU32 = AtomicU32::new(1);

const LOG_CHANNEL: log::Channel = crate::channel!("Map");

type BlueprintList = SmallVec<[BlueprintId; 2]>;

// The grid model: terrain, static path costs, structures, agents and
// overlays for one map. Searches read it; the owning simulation writes
// it between searches.
pub struct MapGrid {
    id: u32,
    size: Size,

    catalog: TerrainCatalog,
    terrain: Vec<TerrainId>,

    // Precomputed static cost per cell; IMPASSABLE_COST and above means
    // the cell cannot be walked at all (impassable terrain or a wall).
    path_costs: Vec<i32>,

    edifices: Vec<Option<BuildingId>>,
    buildings: Slab<Building>,

    blueprint_cells: Vec<BlueprintList>,
    blueprints: Slab<Blueprint>,

    agents: Slab<AgentProfile>,
    agent_cells: Vec<Option<AgentId>>,

    areas: Slab<Area>,
    avoid_grids: Slab<ByteGrid>,

    roofed: BitVec,

    // Speed multiplier applied to agents on unroofed cells (weather).
    outdoor_speed_factor: f32,

    regions: RegionMap,
}

impl MapGrid {
    pub fn new(size: Size, catalog: TerrainCatalog) -> Self {
        debug_assert!(size.is_valid());
        debug_assert!(!catalog.is_empty());

        let cell_count = size.cell_count();
        let default_terrain = catalog.find("soil").unwrap_or(TerrainId(0));

        let mut map = Self {
            id: NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed),
            size,
            catalog,
            terrain: vec![default_terrain; cell_count],
            path_costs: vec![0; cell_count],
            edifices: vec![None; cell_count],
            buildings: Slab::new(),
            blueprint_cells: vec![BlueprintList::new(); cell_count],
            blueprints: Slab::new(),
            agents: Slab::new(),
            agent_cells: vec![None; cell_count],
            areas: Slab::new(),
            avoid_grids: Slab::new(),
            roofed: BitVec::repeat(false, cell_count),
            outdoor_speed_factor: 1.0,
            regions: RegionMap::empty(),
        };

        map.rebuild_path_grid();
        map
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn catalog(&self) -> &TerrainCatalog {
        &self.catalog
    }

    // -------------------------------
    // Cell indexing
    // -------------------------------

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.size.width &&
        cell.y >= 0 && cell.y < self.size.height
    }

    #[inline]
    pub fn cell_to_index(&self, cell: Cell) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some((cell.x + cell.y * self.size.width) as usize)
    }

    #[inline]
    pub fn index_to_cell(&self, index: usize) -> Cell {
        debug_assert!(index < self.size.cell_count());
        Cell::new(index as i32 % self.size.width, index as i32 / self.size.width)
    }

    // -------------------------------
    // Terrain
    // -------------------------------

    pub fn fill_terrain(&mut self, id: TerrainId) {
        self.terrain.fill(id);
        self.rebuild_path_grid();
    }

    pub fn set_terrain(&mut self, cell: Cell, id: TerrainId) {
        if let Some(index) = self.cell_to_index(cell) {
            self.terrain[index] = id;
            self.rebuild_cell(index);
        }
    }

    #[inline]
    pub fn terrain_at_index(&self, index: usize) -> TerrainId {
        self.terrain[index]
    }

    #[inline]
    pub fn terrain_def_at_index(&self, index: usize) -> &TerrainDef {
        self.catalog.def(self.terrain[index])
    }

    #[inline]
    pub fn terrain_def_at(&self, cell: Cell) -> Option<&TerrainDef> {
        self.cell_to_index(cell).map(|index| self.terrain_def_at_index(index))
    }

    // -------------------------------
    // Static path grid
    // -------------------------------

    pub fn rebuild_path_grid(&mut self) {
        for index in 0..self.path_costs.len() {
            self.rebuild_cell(index);
        }
    }

    fn rebuild_cell(&mut self, index: usize) {
        let def = self.catalog.def(self.terrain[index]);

        let cost = if !def.passable {
            IMPASSABLE_COST
        } else if self.building_at_index(index).is_some_and(|building| building.blocks_cell()) {
            IMPASSABLE_COST
        } else {
            def.path_cost
        };

        self.path_costs[index] = cost;
    }

    #[inline]
    pub fn path_cost_at(&self, index: usize) -> i32 {
        self.path_costs[index]
    }

    #[inline]
    pub fn walkable_fast(&self, index: usize) -> bool {
        self.path_costs[index] < IMPASSABLE_COST
    }

    #[inline]
    pub fn walkable(&self, cell: Cell) -> bool {
        self.cell_to_index(cell).is_some_and(|index| self.walkable_fast(index))
    }

    // A cell that forbids squeezing past it diagonally: unwalkable, or
    // holding a door.
    #[inline]
    pub fn blocks_diagonal_movement(&self, cell: Cell) -> bool {
        match self.cell_to_index(cell) {
            Some(index) => {
                !self.walkable_fast(index) ||
                self.building_at_index(index).is_some_and(|building| building.is_door())
            }
            None => true,
        }
    }

    // -------------------------------
    // Buildings
    // -------------------------------

    pub fn add_building(&mut self, cell: Cell, building: Building) -> Option<BuildingId> {
        let index = self.cell_to_index(cell)?;

        if self.edifices[index].is_some() {
            log::warn!(LOG_CHANNEL, "Cell {} already has a building; replacing it.", cell);
            self.remove_building(cell);
        }

        let id = BuildingId(self.buildings.insert(building) as u32);
        self.edifices[index] = Some(id);
        self.rebuild_cell(index);
        Some(id)
    }

    pub fn remove_building(&mut self, cell: Cell) {
        if let Some(index) = self.cell_to_index(cell) {
            if let Some(id) = self.edifices[index].take() {
                self.buildings.remove(id.0 as usize);
                self.rebuild_cell(index);
            }
        }
    }

    #[inline]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id.0 as usize)
    }

    #[inline]
    pub fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(id.0 as usize)
    }

    #[inline]
    pub fn building_at_index(&self, index: usize) -> Option<&Building> {
        self.edifices[index].and_then(|id| self.buildings.get(id.0 as usize))
    }

    #[inline]
    pub fn edifice_id_at(&self, index: usize) -> Option<BuildingId> {
        self.edifices[index]
    }

    #[inline]
    pub fn building_at(&self, cell: Cell) -> Option<&Building> {
        self.cell_to_index(cell).and_then(|index| self.building_at_index(index))
    }

    // -------------------------------
    // Blueprints
    // -------------------------------

    pub fn add_blueprint(&mut self, cell: Cell, blueprint: Blueprint) -> Option<BlueprintId> {
        let index = self.cell_to_index(cell)?;
        let id = BlueprintId(self.blueprints.insert(blueprint) as u32);
        self.blueprint_cells[index].push(id);
        Some(id)
    }

    #[inline]
    pub fn blueprint(&self, id: BlueprintId) -> &Blueprint {
        &self.blueprints[id.0 as usize]
    }

    #[inline]
    pub fn blueprints_at_index(&self, index: usize) -> &[BlueprintId] {
        &self.blueprint_cells[index]
    }

    // -------------------------------
    // Agents
    // -------------------------------

    pub fn add_agent(&mut self, cell: Cell, mut profile: AgentProfile) -> Option<AgentId> {
        let index = self.cell_to_index(cell)?;
        profile.map_id = self.id;

        let id = AgentId(self.agents.insert(profile) as u32);
        if self.agent_cells[index].is_some() {
            log::verbose!(LOG_CHANNEL, "Stacking agents at cell {}.", cell);
        }
        self.agent_cells[index] = Some(id);
        Some(id)
    }

    pub fn move_agent(&mut self, id: AgentId, from: Cell, to: Cell) {
        let (Some(from_index), Some(to_index)) = (self.cell_to_index(from), self.cell_to_index(to)) else {
            return;
        };
        if self.agent_cells[from_index] == Some(id) {
            self.agent_cells[from_index] = None;
        }
        self.agent_cells[to_index] = Some(id);
    }

    #[inline]
    pub fn agent(&self, id: AgentId) -> Option<&AgentProfile> {
        self.agents.get(id.0 as usize)
    }

    #[inline]
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut AgentProfile> {
        self.agents.get_mut(id.0 as usize)
    }

    // Whether another agent stands on this cell and would get in the way.
    pub fn any_blocking_agent_at(&self, cell: Cell, excluding: Option<AgentId>) -> bool {
        match self.cell_to_index(cell) {
            Some(index) => match self.agent_cells[index] {
                Some(id) => excluding != Some(id),
                None => false,
            },
            None => false,
        }
    }

    // -------------------------------
    // Areas & overlays
    // -------------------------------

    pub fn add_area(&mut self, area: Area) -> AreaId {
        debug_assert!(area.len() == self.size.cell_count());
        AreaId(self.areas.insert(area) as u32)
    }

    #[inline]
    pub fn area(&self, id: AreaId) -> Option<&Area> {
        self.areas.get(id.0 as usize)
    }

    #[inline]
    pub fn area_mut(&mut self, id: AreaId) -> Option<&mut Area> {
        self.areas.get_mut(id.0 as usize)
    }

    pub fn add_avoid_grid(&mut self, grid: ByteGrid) -> AvoidGridId {
        debug_assert!(grid.len() == self.size.cell_count());
        AvoidGridId(self.avoid_grids.insert(grid) as u32)
    }

    #[inline]
    pub fn avoid_grid(&self, id: AvoidGridId) -> Option<&ByteGrid> {
        self.avoid_grids.get(id.0 as usize)
    }

    // -------------------------------
    // Roofs & weather
    // -------------------------------

    pub fn set_roofed(&mut self, cell: Cell, roofed: bool) {
        if let Some(index) = self.cell_to_index(cell) {
            self.roofed.set(index, roofed);
        }
    }

    pub fn set_outdoor_speed_factor(&mut self, factor: f32) {
        debug_assert!(factor > 0.0);
        self.outdoor_speed_factor = factor;
    }

    // Movement speed multiplier at a cell: 1 under a roof, the current
    // weather factor in the open.
    #[inline]
    pub fn outdoor_factor_at(&self, index: usize) -> f32 {
        if self.roofed[index] {
            1.0
        } else {
            self.outdoor_speed_factor
        }
    }

    // -------------------------------
    // Regions
    // -------------------------------

    #[inline]
    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    // Recompute the connectivity partition. Call after terrain or
    // structure edits, before relying on reachability pre-checks or the
    // region-distance heuristic.
    pub fn rebuild_regions(&mut self) {
        let regions = RegionMap::build(self);
        self.regions = regions;
    }
}
