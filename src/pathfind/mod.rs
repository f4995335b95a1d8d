use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::{
    log,
    map::AgentId,
    utils::{coords::{Cell, CellRange}, Size},
};

pub mod cost;
pub mod heuristic;
pub mod path;
pub mod provider;
pub mod search;

#[cfg(test)]
mod tests;

pub use cost::building_cost;
pub use heuristic::octile_distance;
pub use path::{Path, PathFailure, PathResult};
pub use provider::{MapPathfinding, PathfindingProvider};
pub use search::PathFinder;

pub(crate) const LOG_CHANNEL: log::Channel = crate::channel!("Pathfind");

// ----------------------------------------------
// Search constants
// ----------------------------------------------

// Hard cap on expanded nodes before a search aborts.
pub const SEARCH_LIMIT: i32 = 160000;

// Per-step cost ceiling (before urgency scaling).
pub const MAX_STEP_COST: i32 = 450;

pub const COST_DOOR_TO_BASH: i32 = 300;
pub const COST_SQUEEZE_PAST_DOOR: i32 = 150;
pub const COST_BLOCKED_WALL_BASE: i32 = 70;
pub const COST_BLOCKED_WALL_PER_HIT_POINT: f32 = 0.2;
pub const COST_BLOCKED_DOOR: i32 = 50;
pub const COST_BLOCKED_DOOR_PER_HIT_POINT: f32 = 0.2;
pub const COST_OUTSIDE_ALLOWED_AREA: i32 = 600;
pub const COST_AGENT_COLLISION: i32 = 175;
pub const AVOID_GRID_COST_SCALE: i32 = 8;

// Opened-node counts that trigger the switch to region-based pathing.
pub const REGION_SWITCH_NODES_STANDARD: i32 = 2000;
pub const REGION_SWITCH_NODES_PRIORITY: i32 = 100000;

// ----------------------------------------------
// TraverseMode
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum TraverseMode {
    // Full per-agent rules: door permissions, bashing, swimming.
    #[default]
    ByAgent,

    // Doors are always considered passable (possibly at a squeeze cost).
    PassDoors,

    NoPassClosedDoors,
    NoPassClosedDoorsOrWater,

    // Destructible obstacles become high-cost instead of blocking.
    PassAllDestroyableThings,
    PassAllDestroyableThingsNotWater,
}

impl TraverseMode {
    #[inline]
    pub fn destroys_obstacles(self) -> bool {
        matches!(self, Self::PassAllDestroyableThings | Self::PassAllDestroyableThingsNotWater)
    }

    #[inline]
    pub fn allows_water(self) -> bool {
        !matches!(self, Self::NoPassClosedDoorsOrWater | Self::PassAllDestroyableThingsNotWater)
    }

    #[inline]
    pub fn blocks_closed_doors(self) -> bool {
        matches!(self, Self::NoPassClosedDoors | Self::NoPassClosedDoorsOrWater)
    }
}

// ----------------------------------------------
// Danger
// ----------------------------------------------

// How much danger the mover tolerates along the way. Carried through to
// the reachability oracle; the default oracle does not rate danger.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum Danger {
    Safe,
    Risky,
    #[default]
    Deadly,
}

// ----------------------------------------------
// TraverseParams
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraverseParams {
    pub agent: Option<AgentId>,
    pub mode: TraverseMode,
    pub danger: Danger,
    pub can_bash: bool,
}

impl TraverseParams {
    pub fn for_agent(agent: AgentId, danger: Danger, mode: TraverseMode, can_bash: bool) -> Self {
        Self { agent: Some(agent), mode, danger, can_bash }
    }

    // Agent-less traversal query with generic movement costs.
    pub fn modal(mode: TraverseMode) -> Self {
        Self { agent: None, mode, danger: Danger::Deadly, can_bash: false }
    }
}

// ----------------------------------------------
// Destination / PathEndMode
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathEndMode {
    // Land exactly on the destination cell.
    OnCell,

    // Stop on any cell touching the destination footprint (one ring out).
    Touch,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Cell(Cell),

    // An occupying object and its footprint.
    Footprint { base: Cell, size: Size },
}

impl Destination {
    #[inline]
    pub fn cell(&self) -> Cell {
        match self {
            Self::Cell(cell) => *cell,
            Self::Footprint { base, .. } => *base,
        }
    }

    // The rectangle of acceptable goal cells for a path-end mode.
    pub fn rect(&self, end_mode: PathEndMode) -> CellRange {
        let rect = match self {
            Self::Footprint { base, size } if end_mode != PathEndMode::OnCell => {
                CellRange::new(*base, Cell::new(base.x + size.width - 1, base.y + size.height - 1))
            }
            _ => CellRange::single_cell(self.cell()),
        };

        if end_mode == PathEndMode::Touch {
            rect.expanded_by(1)
        } else {
            rect
        }
    }
}

// ----------------------------------------------
// PathfinderConfig
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    pub search_limit: i32,
    pub region_switch_nodes_standard: i32,
    pub region_switch_nodes_priority: i32,

    // Debug override: forces PassAllDestroyableThings on every search.
    pub path_through_walls: bool,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            search_limit: SEARCH_LIMIT,
            region_switch_nodes_standard: REGION_SWITCH_NODES_STANDARD,
            region_switch_nodes_priority: REGION_SWITCH_NODES_PRIORITY,
            path_through_walls: false,
        }
    }
}
