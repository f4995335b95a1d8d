use serde::{Deserialize, Serialize};

use crate::agent::{AgentKind, AgentProfile};

// ----------------------------------------------
// Door
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorState {
    #[default]
    Closed,
    Open,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Door {
    pub state: DoorState,

    // Held open: counts as free passage for everyone.
    pub hold_open: bool,

    // Locked doors cannot be opened, only bashed through.
    pub locked: bool,

    // Forbidden doors block agents that respect restrictions.
    pub forbidden: bool,

    pub ticks_to_open: i32,
}

impl Door {
    pub fn new(ticks_to_open: i32) -> Self {
        Self {
            state: DoorState::Closed,
            hold_open: false,
            locked: false,
            forbidden: false,
            ticks_to_open,
        }
    }

    pub fn held_open(mut self) -> Self {
        self.state = DoorState::Open;
        self.hold_open = true;
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.forbidden = true;
        self
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == DoorState::Open
    }

    // Anyone can pass without opening anything.
    #[inline]
    pub fn free_passage(&self) -> bool {
        self.is_open() && self.hold_open
    }

    // Whether this agent could operate the door at all.
    #[inline]
    pub fn can_be_opened_by(&self, agent: &AgentProfile) -> bool {
        !self.locked && agent.kind == AgentKind::Humanlike
    }
}

// ----------------------------------------------
// Building
// ----------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
pub enum BuildingKind {
    // Solid obstacle; unwalkable unless destroyed.
    Wall,

    // Walkable for humanlikes at a cost, impassable for animals.
    Fence,

    // Walkable at an extra cost (sandbags, furniture, rubble).
    Furniture,

    Door(Door),
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub hit_points: i32,
    pub destroyable: bool,

    // Extra walk-over cost for passable non-door buildings.
    pub extra_path_cost: i32,
}

impl Building {
    pub fn wall(hit_points: i32) -> Self {
        Self {
            kind: BuildingKind::Wall,
            hit_points,
            destroyable: true,
            extra_path_cost: 0,
        }
    }

    pub fn fence(hit_points: i32, climb_cost: i32) -> Self {
        Self {
            kind: BuildingKind::Fence,
            hit_points,
            destroyable: true,
            extra_path_cost: climb_cost,
        }
    }

    pub fn furniture(hit_points: i32, walk_over_cost: i32) -> Self {
        Self {
            kind: BuildingKind::Furniture,
            hit_points,
            destroyable: true,
            extra_path_cost: walk_over_cost,
        }
    }

    pub fn door(hit_points: i32, door: Door) -> Self {
        Self {
            kind: BuildingKind::Door(door),
            hit_points,
            destroyable: true,
            extra_path_cost: 0,
        }
    }

    pub fn indestructible(mut self) -> Self {
        self.destroyable = false;
        self
    }

    #[inline]
    pub fn door_state(&self) -> Option<&Door> {
        match &self.kind {
            BuildingKind::Door(door) => Some(door),
            _ => None,
        }
    }

    #[inline]
    pub fn door_state_mut(&mut self) -> Option<&mut Door> {
        match &mut self.kind {
            BuildingKind::Door(door) => Some(door),
            _ => None,
        }
    }

    #[inline]
    pub fn is_door(&self) -> bool {
        matches!(self.kind, BuildingKind::Door(_))
    }

    // Whether this building makes its cell unwalkable on the static grid.
    #[inline]
    pub fn blocks_cell(&self) -> bool {
        matches!(self.kind, BuildingKind::Wall)
    }

    #[inline]
    pub fn is_destroyable(&self) -> bool {
        self.destroyable && self.hit_points > 0
    }

    // Walk-over cost for a specific agent. i32::MAX means the agent
    // cannot cross this building at all.
    pub fn path_cost_for(&self, agent: &AgentProfile) -> i32 {
        match &self.kind {
            BuildingKind::Wall => 0, // Caught earlier by the walkability check.
            BuildingKind::Fence => {
                if agent.kind == AgentKind::Animal {
                    i32::MAX
                } else {
                    self.extra_path_cost
                }
            }
            BuildingKind::Furniture => self.extra_path_cost,
            BuildingKind::Door(_) => 0, // Doors are costed per traversal mode.
        }
    }
}

// ----------------------------------------------
// Blueprint
// ----------------------------------------------

// Planned construction occupying a cell. Paths prefer to route around
// them; solid blueprints (planned walls) block entirely.
#[derive(Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub base_cost: i32,
    pub hit_points: i32,
    pub solid: bool,
}

impl Blueprint {
    pub fn new(base_cost: i32, hit_points: i32) -> Self {
        Self { base_cost, hit_points, solid: false }
    }

    pub fn solid(mut self) -> Self {
        self.solid = true;
        self
    }

    // Durability-scaled crossing cost, i32::MAX when impassable.
    pub fn path_cost_for(&self, agent: Option<&AgentProfile>) -> i32 {
        if agent.is_none() {
            return 0;
        }
        if self.solid {
            return i32::MAX;
        }
        self.base_cost + (self.hit_points as f32 * 0.2) as i32
    }
}
