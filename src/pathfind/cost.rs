use crate::{
    agent::{AgentProfile, LocomotionUrgency, UNABLE_TO_MOVE_TICKS},
    map::{
        area::{Area, ByteGrid},
        grid::{AgentId, MapGrid},
        structures::Building,
        terrain::TerrainDef,
    },
    utils::coords::{Cell, Direction},
};

use super::{
    TraverseMode, TraverseParams,
    AVOID_GRID_COST_SCALE, COST_AGENT_COLLISION, COST_BLOCKED_DOOR,
    COST_BLOCKED_DOOR_PER_HIT_POINT, COST_BLOCKED_WALL_BASE,
    COST_BLOCKED_WALL_PER_HIT_POINT, COST_DOOR_TO_BASH,
    COST_OUTSIDE_ALLOWED_AREA, COST_SQUEEZE_PAST_DOOR, MAX_STEP_COST,
};

// ----------------------------------------------
// Building & blueprint costs
// ----------------------------------------------

// Cost of stepping onto a building's cell, i32::MAX when the move is
// blocked outright. Doors follow the traversal-mode table; everything
// else charges its per-agent walk-over cost.
pub fn building_cost(building: &Building,
                     mode: TraverseMode,
                     can_bash: bool,
                     agent: Option<&AgentProfile>) -> i32 {
    let Some(door) = building.door_state() else {
        return match agent {
            Some(agent) => building.path_cost_for(agent),
            None => 0,
        };
    };

    let openable = agent.is_some_and(|agent| door.can_be_opened_by(agent));

    match mode {
        TraverseMode::ByAgent => {
            if !can_bash && door.forbidden {
                return i32::MAX;
            }
            if openable && !door.free_passage() {
                return door.ticks_to_open;
            }
            if door.is_open() {
                return 0;
            }
            if can_bash {
                return COST_DOOR_TO_BASH;
            }
            i32::MAX
        }
        TraverseMode::PassDoors => {
            if openable && !door.forbidden && !door.free_passage() {
                return door.ticks_to_open;
            }
            if door.is_open() {
                return 0;
            }
            COST_SQUEEZE_PAST_DOOR
        }
        TraverseMode::NoPassClosedDoors | TraverseMode::NoPassClosedDoorsOrWater => {
            if door.free_passage() {
                return 0;
            }
            i32::MAX
        }
        TraverseMode::PassAllDestroyableThings | TraverseMode::PassAllDestroyableThingsNotWater => {
            if openable && !door.forbidden && !door.free_passage() {
                return door.ticks_to_open;
            }
            if door.is_open() {
                return 0;
            }
            COST_BLOCKED_DOOR + (building.hit_points as f32 * COST_BLOCKED_DOOR_PER_HIT_POINT) as i32
        }
    }
}

// Terrain-level veto for a specific mover: deep water needs swimming,
// aquatic agents stay in water, and salt/fresh restrictions apply.
pub fn terrain_allows_agent(def: &TerrainDef, agent: &AgentProfile) -> bool {
    use crate::agent::WaterNeeds;
    use crate::map::terrain::TerrainTags;

    if def.is_liquid() {
        if def.is_deep() && !agent.can_swim() {
            return false;
        }
        match agent.water_needs {
            WaterNeeds::Any => {}
            WaterNeeds::FreshOnly => {
                if def.tags.contains(TerrainTags::Salt) {
                    return false;
                }
            }
            WaterNeeds::SaltOnly => {
                if def.tags.contains(TerrainTags::Fresh) {
                    return false;
                }
            }
        }
    } else if agent.aquatic {
        return false;
    }

    true
}

// ----------------------------------------------
// CostContext
// ----------------------------------------------

// Per-search snapshot of everything the cost model reads: the grid, the
// mover, its overlays, and the traversal policy.
pub(crate) struct CostContext<'a> {
    map: &'a MapGrid,
    agent: Option<&'a AgentProfile>,
    agent_id: Option<AgentId>,
    mode: TraverseMode,
    can_bash: bool,
    destroys: bool,
    block_corner_diagonals: bool,
    avoid: Option<&'a ByteGrid>,
    allowed_area: Option<&'a Area>,
}

impl<'a> CostContext<'a> {
    pub fn new(map: &'a MapGrid, agent: Option<&'a AgentProfile>, params: &TraverseParams) -> Self {
        let destroys = params.mode.destroys_obstacles();

        let avoid = agent
            .and_then(|agent| agent.avoid_grid)
            .and_then(|id| map.avoid_grid(id));

        // Commanded movement ignores area restrictions; empty areas
        // restrict nothing.
        let allowed_area = agent
            .filter(|agent| !agent.commanded)
            .and_then(|agent| agent.allowed_area)
            .and_then(|id| map.area(id))
            .filter(|area| area.true_count() > 0);

        Self {
            map,
            agent,
            agent_id: params.agent,
            mode: params.mode,
            can_bash: params.can_bash,
            destroys,
            // Squeezing past a blocked corner is only tolerated (at a
            // price) when the mover may destroy what blocks it.
            block_corner_diagonals: !destroys,
            avoid,
            allowed_area,
        }
    }

    // Full cost of one step from `from` onto `to`, or None if blocked.
    // `ticks_cardinal`/`ticks_diagonal` are the mover's move ticks at the
    // cell being exited.
    pub fn step_cost(&self,
                     from: Cell,
                     to: Cell,
                     to_index: usize,
                     dir: Direction,
                     ticks_cardinal: i32,
                     ticks_diagonal: i32) -> Option<i32> {
        self.step_cost_for(self.agent, from, to, to_index, dir, ticks_cardinal, ticks_diagonal, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn step_cost_for(&self,
                     agent: Option<&AgentProfile>,
                     from: Cell,
                     to: Cell,
                     to_index: usize,
                     dir: Direction,
                     ticks_cardinal: i32,
                     ticks_diagonal: i32,
                     follow_pace: bool) -> Option<i32> {
        let def = self.map.terrain_def_at_index(to_index);
        let swimming = def.is_liquid() && agent.is_some_and(|agent| agent.can_swim());

        if let Some(agent) = agent {
            if !terrain_allows_agent(def, agent) {
                return None;
            }
        }

        let mut obstacle_cost = 0;
        let mut smashing_through = false;

        if !self.map.walkable_fast(to_index) {
            if !self.destroys {
                return None;
            }
            // Charge for breaking whatever stands here.
            smashing_through = true;
            obstacle_cost += COST_BLOCKED_WALL_BASE;

            let building = self.map.building_at_index(to_index)?;
            if !building.is_destroyable() {
                return None;
            }
            obstacle_cost += (building.hit_points as f32 * COST_BLOCKED_WALL_PER_HIT_POINT) as i32;
        }

        // Diagonal corner rule: both flanking cardinals must be clear.
        if let Some((corner_a, corner_b)) = dir.corner_cells(from) {
            for corner in [corner_a, corner_b] {
                if self.map.blocks_diagonal_movement(corner) {
                    if self.block_corner_diagonals {
                        return None;
                    }
                    obstacle_cost += COST_BLOCKED_WALL_BASE;
                }
            }
        }

        let base_ticks = if dir.is_diagonal() { ticks_diagonal } else { ticks_cardinal };
        if base_ticks >= UNABLE_TO_MOVE_TICKS {
            // Zero effective speed: the mover cannot take this step at all.
            return None;
        }

        let mut cost = base_ticks + obstacle_cost;

        if !smashing_through {
            let mut terrain_cost = self.map.path_cost_at(to_index);
            if swimming {
                // Swap the terrain's walking cost for its swimming cost,
                // keeping any other static contributions.
                terrain_cost = terrain_cost - def.path_cost + def.swim_cost_or_discounted();
            }
            cost += terrain_cost;

            if !swimming {
                cost += def.perceived_cost(agent.is_some_and(|agent| agent.commanded));
            }
        }

        if let Some(avoid) = self.avoid {
            cost += avoid.value_at(to_index) as i32 * AVOID_GRID_COST_SCALE;
        }

        if let Some(area) = self.allowed_area {
            if !area.contains(to_index) {
                cost += COST_OUTSIDE_ALLOWED_AREA;
            }
        }

        if agent.is_some_and(|agent| agent.avoids_crowds) &&
           self.map.any_blocking_agent_at(to, self.agent_id) {
            cost += COST_AGENT_COLLISION;
        }

        if let Some(building) = self.map.building_at_index(to_index) {
            let bcost = building_cost(building, self.mode, self.can_bash, agent);
            if bcost == i32::MAX {
                return None;
            }
            cost += bcost;
        }

        let blueprints = self.map.blueprints_at_index(to_index);
        if !blueprints.is_empty() {
            let mut max_cost = 0;
            for id in blueprints {
                max_cost = max_cost.max(self.map.blueprint(*id).path_cost_for(agent));
            }
            if max_cost == i32::MAX {
                return None;
            }
            cost += max_cost;
        }

        cost = cost.min(MAX_STEP_COST);

        if let Some(agent) = agent {
            if let Some(job) = &agent.job {
                cost = match job.urgency {
                    LocomotionUrgency::Slow => (cost * 3).max(60),
                    LocomotionUrgency::Walk => (cost * 2).max(50),
                    LocomotionUrgency::Normal => cost,
                    LocomotionUrgency::Sprint => (cost as f32 * 0.75).round() as i32,
                };
            }

            // Match the followed agent's pace: take the worse of the two
            // costs for this cell. One level only; the followed agent's
            // own pace link is ignored, so mutual links cannot recurse.
            if follow_pace {
                if let Some(other_id) = agent.follow_pace_of {
                    if let Some(other) = self.map.agent(other_id) {
                        let from_index = self.map.cell_to_index(from);
                        let liquid_from = from_index
                            .map(|index| self.map.terrain_def_at_index(index).is_liquid())
                            .unwrap_or(false);
                        let outdoor = from_index
                            .map(|index| self.map.outdoor_factor_at(index))
                            .unwrap_or(1.0);

                        let other_cardinal = other.ticks_per_move_cardinal(liquid_from, outdoor);
                        let other_diagonal = other.ticks_per_move_diagonal(liquid_from, outdoor);

                        if let Some(other_cost) = self.step_cost_for(
                            Some(other), from, to, to_index, dir,
                            other_cardinal, other_diagonal, false)
                        {
                            cost = cost.max(other_cost);
                        }
                    }
                }
            }
        }

        Some(cost.max(1))
    }
}
