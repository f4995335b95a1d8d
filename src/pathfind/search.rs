use std::collections::BinaryHeap;

use arrayvec::ArrayVec;

use crate::{
    agent::{AgentProfile, DEFAULT_MOVE_TICKS_CARDINAL, DEFAULT_MOVE_TICKS_DIAGONAL},
    log,
    map::{regions::RegionCostCalculator, MapGrid},
    utils::{coords::{Cell, CellRange, Direction}, Size},
};

use super::{
    cost::CostContext,
    heuristic::{heuristic_strength, HeuristicSelector},
    path::{Path, PathFailure, PathResult},
    Destination, PathEndMode, PathfinderConfig, TraverseMode, TraverseParams,
    LOG_CHANNEL,
};

// ----------------------------------------------
// Node state
// ----------------------------------------------

// Epoch counters wrap here; the whole grid is cleared instead of ever
// letting a stale stamp collide with a live one.
const STATUS_RESET_THRESHOLD: u16 = 65435;

// One record per map cell, reused across searches. `queue_cost` stamps
// the cost this node was last enqueued with so superseded queue entries
// can be recognized and dropped on pop.
#[derive(Copy, Clone, Default)]
struct PathNode {
    known_cost: i32,
    heuristic_cost: i32,
    queue_cost: i32,
    parent: u32,
    status: u16,
}

// Transient open-queue entry. Min-ordered by cost (ties broken on index
// for determinism) under std's max-heap.
#[derive(Copy, Clone, PartialEq, Eq)]
struct CostNode {
    index: u32,
    cost: i32,
}

impl Ord for CostNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.cost.cmp(&self.cost).then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for CostNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ----------------------------------------------
// PathFinder
// ----------------------------------------------

// The search engine for one map. Owns its calc grid, open queue and
// epoch counters; they are reused across sequential searches and
// invalidated by bumping the status epoch rather than clearing. Not
// reentrant: one search at a time per instance.
pub struct PathFinder {
    map_id: u32,
    map_size: Size,

    calc_grid: Vec<PathNode>,
    open_list: BinaryHeap<CostNode>,

    status_open_value: u16,
    status_closed_value: u16,

    region_costs: RegionCostCalculator,
    disallowed_corners: ArrayVec<u32, 4>,

    config: PathfinderConfig,
}

impl PathFinder {
    pub fn new(map: &MapGrid) -> Self {
        Self::with_config(map, PathfinderConfig::default())
    }

    pub fn with_config(map: &MapGrid, config: PathfinderConfig) -> Self {
        Self {
            map_id: map.id(),
            map_size: map.size(),
            calc_grid: vec![PathNode::default(); map.size().cell_count()],
            open_list: BinaryHeap::new(),
            status_open_value: 1,
            status_closed_value: 2,
            region_costs: RegionCostCalculator::new(),
            disallowed_corners: ArrayVec::new(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    #[inline]
    pub fn set_config(&mut self, config: PathfinderConfig) {
        self.config = config;
    }

    // Call when the owning map was structurally reinitialized: records
    // are reallocated and the status epoch starts over.
    pub fn reset(&mut self, map: &MapGrid) {
        self.map_id = map.id();
        self.map_size = map.size();
        self.calc_grid.clear();
        self.calc_grid.resize(map.size().cell_count(), PathNode::default());
        self.open_list.clear();
        self.status_open_value = 1;
        self.status_closed_value = 2;
    }

    // Convenience wrapper mirroring the common "send this agent there"
    // call: full per-agent rules, deadly danger tolerance, bashing taken
    // from the agent's current job.
    pub fn find_path_for_agent(&mut self,
                               map: &MapGrid,
                               start: Cell,
                               dest: Destination,
                               agent: crate::map::AgentId,
                               end_mode: PathEndMode) -> PathResult {
        let can_bash = map.agent(agent).is_some_and(|profile| profile.can_bash());
        let params = TraverseParams::for_agent(agent, super::Danger::Deadly, TraverseMode::ByAgent, can_bash);
        self.find_path(map, start, dest, params, end_mode)
    }

    pub fn find_path(&mut self,
                     map: &MapGrid,
                     start: Cell,
                     dest: Destination,
                     params: TraverseParams,
                     end_mode: PathEndMode) -> PathResult {
        let mut params = params;
        if self.config.path_through_walls {
            params.mode = TraverseMode::PassAllDestroyableThings;
        }

        // -------------------------------
        // Validation
        // -------------------------------

        if map.id() != self.map_id || map.size() != self.map_size {
            log::error!(LOG_CHANNEL,
                "Search called with a different map than this pathfinder was built for (map={}, expected={}).",
                map.id(), self.map_id);
            return PathResult::NotFound(PathFailure::CrossInstanceMisuse);
        }

        let agent = match params.agent {
            Some(id) => {
                let Some(profile) = map.agent(id) else {
                    log::error!(LOG_CHANNEL, "Search for an agent unknown to map {}.", map.id());
                    return PathResult::NotFound(PathFailure::CrossInstanceMisuse);
                };
                if profile.map_id() != map.id() {
                    log::error!(LOG_CHANNEL,
                        "Agent '{}' belongs to map {} but was pathed on map {}. Use that map's pathfinder.",
                        profile.name, profile.map_id(), map.id());
                    return PathResult::NotFound(PathFailure::CrossInstanceMisuse);
                }
                Some(profile)
            }
            None => None,
        };

        let Some(start_index) = map.cell_to_index(start) else {
            log::error!(LOG_CHANNEL, "Search with invalid start {}, agent={}.",
                start, agent_name(agent));
            return PathResult::NotFound(PathFailure::InvalidStart);
        };

        let dest_cell = dest.cell();
        let Some(dest_index) = map.cell_to_index(dest_cell) else {
            log::error!(LOG_CHANNEL, "Search with invalid destination {}, agent={}.",
                dest_cell, agent_name(agent));
            return PathResult::NotFound(PathFailure::InvalidDestination);
        };

        let dest_rect = dest.rect(end_mode);

        // Cheap reachability pre-check before committing to a search.
        if !map.regions().can_reach(map, start, &dest_rect, params.mode) {
            return PathResult::NotFound(PathFailure::Unreachable);
        }

        // -------------------------------
        // Search setup
        // -------------------------------

        let water_ok = params.mode.allows_water();
        let single_cell = dest_rect.is_single_cell();

        let priority_agent = agent.is_some_and(|profile| profile.priority);
        let switch_threshold = if priority_agent {
            self.config.region_switch_nodes_priority
        } else {
            self.config.region_switch_nodes_standard
        };

        // Region-based fallback only works for non-destructive,
        // water-tolerant searches starting inside a known region.
        let can_switch_to_regions =
            !params.mode.destroys_obstacles() &&
            water_ok &&
            map.regions().is_built() &&
            map.regions().region_at(map, start).is_some();

        let mut heuristic = HeuristicSelector::new(
            dest_cell,
            heuristic_strength(agent, start, dest_cell));

        self.calculate_disallowed_corners(map, end_mode, &dest_rect);
        self.init_statuses_and_push_start(start_index);

        let ctx = CostContext::new(map, agent, &params);

        let mut nodes_opened: i32 = 0;
        let mut nodes_closed: i32 = 0;

        // -------------------------------
        // Expansion loop
        // -------------------------------

        loop {
            let Some(cost_node) = self.open_list.pop() else {
                log::warn!(LOG_CHANNEL,
                    "Agent '{}' pathing from {} to {} ran out of cells to process. Job: {}.",
                    agent_name(agent), start, dest_cell, agent_job(agent));
                return PathResult::NotFound(PathFailure::Exhausted);
            };

            let index = cost_node.index as usize;

            // Drop entries superseded by a cheaper re-discovery, and
            // anything already finalized.
            if cost_node.cost != self.calc_grid[index].queue_cost {
                continue;
            }
            if self.calc_grid[index].status == self.status_closed_value {
                continue;
            }

            let cell = map.index_to_cell(index);

            // Goal test.
            if single_cell {
                if index == dest_index {
                    return self.finalize_path(map, index, heuristic.is_region_based());
                }
            } else if dest_rect.contains(cell) && !self.disallowed_corners.contains(&(index as u32)) {
                return self.finalize_path(map, index, heuristic.is_region_based());
            }

            if nodes_closed > self.config.search_limit {
                log::warn!(LOG_CHANNEL,
                    "Agent '{}' pathing from {} to {} hit the search limit of {} cells. Job: {}.",
                    agent_name(agent), start, dest_cell, self.config.search_limit, agent_job(agent));
                return PathResult::NotFound(PathFailure::BudgetExceeded);
            }

            // Move ticks out of this cell; terrain-aware, so swimmers
            // speed up in water and weather slows the unroofed.
            let (ticks_cardinal, ticks_diagonal) = match agent {
                Some(profile) => {
                    let liquid = map.terrain_def_at_index(index).is_liquid();
                    let outdoor = map.outdoor_factor_at(index);
                    (profile.ticks_per_move_cardinal(liquid, outdoor),
                     profile.ticks_per_move_diagonal(liquid, outdoor))
                }
                None => (DEFAULT_MOVE_TICKS_CARDINAL, DEFAULT_MOVE_TICKS_DIAGONAL),
            };

            for dir in Direction::all() {
                let neighbor = dir.apply(cell);
                let Some(neighbor_index) = map.cell_to_index(neighbor) else {
                    continue;
                };

                // Water-averse modes never even look at liquid cells.
                if !water_ok && map.terrain_def_at_index(neighbor_index).is_liquid() {
                    continue;
                }

                // Closed cells are only reconsidered once the region
                // heuristic (which is far from consistent) is driving.
                if self.calc_grid[neighbor_index].status == self.status_closed_value &&
                   !heuristic.is_region_based() {
                    continue;
                }

                let Some(step_cost) = ctx.step_cost(
                    cell, neighbor, neighbor_index, dir, ticks_cardinal, ticks_diagonal)
                else {
                    continue;
                };

                let tentative_cost = self.calc_grid[index].known_cost.saturating_add(step_cost);

                let status = self.calc_grid[neighbor_index].status;
                let visited = status == self.status_open_value || status == self.status_closed_value;
                if visited {
                    // Reopening a closed node must improve on it by more
                    // than one cardinal step; open nodes just need any
                    // strict improvement.
                    let mut reopen_credit = 0;
                    if status == self.status_closed_value {
                        reopen_credit = ticks_cardinal;
                    }
                    if self.calc_grid[neighbor_index].known_cost <= tentative_cost.saturating_add(reopen_credit) {
                        continue;
                    }
                }

                if !visited {
                    // First touch this epoch: cache the estimate.
                    self.calc_grid[neighbor_index].heuristic_cost = heuristic.estimate(
                        neighbor, neighbor_index,
                        ticks_cardinal, ticks_diagonal,
                        map.regions(), &self.region_costs,
                        nodes_opened);
                }

                let queue_cost = tentative_cost.saturating_add(self.calc_grid[neighbor_index].heuristic_cost);
                let node = &mut self.calc_grid[neighbor_index];
                node.parent = index as u32;
                node.known_cost = tentative_cost;
                node.status = self.status_open_value;
                node.queue_cost = queue_cost;

                nodes_opened += 1;
                self.open_list.push(CostNode { index: neighbor_index as u32, cost: queue_cost });
            }

            nodes_closed += 1;
            self.calc_grid[index].status = self.status_closed_value;

            // Once the frontier has grown past the threshold, restart
            // under the precomputed region-distance estimate: costlier
            // per node, but it bounds total work on sprawling maps.
            if heuristic.should_switch(nodes_opened, switch_threshold, can_switch_to_regions) {
                heuristic.switch_to_region_based();
                self.region_costs.init(map, &dest_rect, ticks_cardinal, ticks_diagonal);
                self.init_statuses_and_push_start(start_index);
                nodes_opened = 0;
                nodes_closed = 0;
            }
        }
    }

    // -------------------------------
    // Internals
    // -------------------------------

    fn init_statuses_and_push_start(&mut self, start_index: usize) {
        self.status_open_value += 2;
        self.status_closed_value += 2;
        if self.status_closed_value >= STATUS_RESET_THRESHOLD {
            self.reset_statuses();
        }

        let node = &mut self.calc_grid[start_index];
        node.known_cost = 0;
        node.heuristic_cost = 0;
        node.queue_cost = 0;
        node.parent = start_index as u32;
        node.status = self.status_open_value;

        self.open_list.clear();
        self.open_list.push(CostNode { index: start_index as u32, cost: 0 });
    }

    fn reset_statuses(&mut self) {
        for node in &mut self.calc_grid {
            node.status = 0;
        }
        self.status_open_value = 1;
        self.status_closed_value = 2;
    }

    fn finalize_path(&mut self, map: &MapGrid, final_index: usize, used_region_heuristic: bool) -> PathResult {
        let total_cost = self.calc_grid[final_index].known_cost;

        let mut cells = Vec::new();
        let mut index = final_index;
        loop {
            cells.push(map.index_to_cell(index));
            let parent = self.calc_grid[index].parent as usize;
            if parent == index {
                break; // Self-parent marks the start node.
            }
            index = parent;
        }
        cells.reverse();

        PathResult::Found(Path::new(cells, total_cost, used_region_heuristic))
    }

    // For Touch destinations, ban goal-rect corners that could only be
    // reached by squeezing diagonally between two blocked cells.
    fn calculate_disallowed_corners(&mut self, map: &MapGrid, end_mode: PathEndMode, dest_rect: &CellRange) {
        self.disallowed_corners.clear();
        if end_mode != PathEndMode::Touch {
            return;
        }

        let min = dest_rect.start;
        let max = dest_rect.end;

        let corners = [
            (Cell::new(min.x, min.y), Cell::new(min.x + 1, min.y), Cell::new(min.x, min.y + 1)),
            (Cell::new(min.x, max.y), Cell::new(min.x + 1, max.y), Cell::new(min.x, max.y - 1)),
            (Cell::new(max.x, max.y), Cell::new(max.x - 1, max.y), Cell::new(max.x, max.y - 1)),
            (Cell::new(max.x, min.y), Cell::new(max.x - 1, min.y), Cell::new(max.x, min.y + 1)),
        ];

        for (corner, adjacent_a, adjacent_b) in corners {
            if !is_corner_touch_allowed(map, adjacent_a, adjacent_b) {
                if let Some(index) = map.cell_to_index(corner) {
                    self.disallowed_corners.push(index as u32);
                }
            }
        }
    }
}

// Touching the target from a rect corner is fine as long as at least one
// of the two cells adjacent to both corner and target lets the mover
// pass without a diagonal squeeze.
fn is_corner_touch_allowed(map: &MapGrid, adjacent_a: Cell, adjacent_b: Cell) -> bool {
    !map.blocks_diagonal_movement(adjacent_a) || !map.blocks_diagonal_movement(adjacent_b)
}

#[inline]
fn agent_name(agent: Option<&AgentProfile>) -> &str {
    agent.map_or("none", |profile| profile.name.as_str())
}

#[inline]
fn agent_job(agent: Option<&AgentProfile>) -> &str {
    agent
        .and_then(|profile| profile.job.as_ref())
        .map_or("null", |job| job.name.as_str())
}
