use std::cmp::Reverse;
use std::collections::BTreeMap;

use priority_queue::PriorityQueue;
use smallvec::SmallVec;

use crate::{
    pathfind::TraverseMode,
    utils::coords::{Cell, CellRange},
};

use super::grid::{BuildingId, MapGrid};

// ----------------------------------------------
// Region
// ----------------------------------------------

pub const NO_REGION: u16 = u16::MAX;

// Cost reported for cells whose region the destination cannot reach.
pub const UNREACHABLE_REGION_COST: i32 = 10_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionKind {
    // Walkable dry land.
    Plain,

    // A single door cell; passability depends on the traversal mode
    // and the door's current state.
    Door,

    // Swimmable/wadeable liquid terrain.
    Liquid,
}

#[derive(Copy, Clone)]
pub struct RegionLink {
    pub neighbor: u16,
    pub anchor: Cell,
}

pub struct Region {
    pub kind: RegionKind,
    pub door: Option<BuildingId>,
    pub cell_count: i32,
    pub anchor: Cell,
    pub links: SmallVec<[RegionLink; 4]>,
}

// ----------------------------------------------
// RegionMap
// ----------------------------------------------

// Connectivity partition of the walkable cells. Homogeneous flood-fill
// regions (4-neighbor): land and liquid never share a region, and every
// door cell is a region of its own. Used for cheap reachability
// pre-checks and as the domain of the fallback search heuristic.
pub struct RegionMap {
    labels: Vec<u16>,
    regions: Vec<Region>,
    built: bool,
}

impl RegionMap {
    pub fn empty() -> Self {
        Self {
            labels: Vec::new(),
            regions: Vec::new(),
            built: false,
        }
    }

    pub fn build(map: &MapGrid) -> Self {
        let size = map.size();
        let cell_count = size.cell_count();

        let mut labels = vec![NO_REGION; cell_count];
        let mut regions: Vec<Region> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        let cell_key = |index: usize| -> Option<RegionKind> {
            if !map.walkable_fast(index) {
                return None;
            }
            if map.building_at_index(index).is_some_and(|building| building.is_door()) {
                return Some(RegionKind::Door);
            }
            if map.terrain_def_at_index(index).is_liquid() {
                return Some(RegionKind::Liquid);
            }
            Some(RegionKind::Plain)
        };

        for start in 0..cell_count {
            if labels[start] != NO_REGION {
                continue;
            }
            let Some(kind) = cell_key(start) else {
                continue;
            };

            debug_assert!(regions.len() < NO_REGION as usize);
            let label = regions.len() as u16;
            let anchor = map.index_to_cell(start);

            if kind == RegionKind::Door {
                // Door cells never merge with their surroundings.
                labels[start] = label;
                let door = map.edifice_id_at(start);
                regions.push(Region {
                    kind,
                    door,
                    cell_count: 1,
                    anchor,
                    links: SmallVec::new(),
                });
                continue;
            }

            // Flood fill all connected same-kind cells.
            let mut cell_sum = (0i64, 0i64);
            let mut count = 0i32;

            labels[start] = label;
            stack.clear();
            stack.push(start);

            while let Some(index) = stack.pop() {
                let cell = map.index_to_cell(index);
                cell_sum.0 += cell.x as i64;
                cell_sum.1 += cell.y as i64;
                count += 1;

                for neighbor in [cell.shifted(0, -1), cell.shifted(1, 0), cell.shifted(0, 1), cell.shifted(-1, 0)] {
                    let Some(nindex) = map.cell_to_index(neighbor) else {
                        continue;
                    };
                    if labels[nindex] != NO_REGION {
                        continue;
                    }
                    if cell_key(nindex) == Some(kind) {
                        labels[nindex] = label;
                        stack.push(nindex);
                    }
                }
            }

            // Centroid-ish anchor; only used for distance estimates, so
            // it doesn't have to land on a walkable cell.
            let anchor = Cell::new(
                (cell_sum.0 / count as i64) as i32,
                (cell_sum.1 / count as i64) as i32,
            );

            regions.push(Region {
                kind,
                door: None,
                cell_count: count,
                anchor,
                links: SmallVec::new(),
            });
        }

        // Collect adjacency links between distinct regions. One link per
        // region pair, anchored at the first shared boundary cell.
        // Ordered map keeps link order (and search behavior) stable.
        let mut seen: BTreeMap<(u16, u16), Cell> = BTreeMap::new();
        for index in 0..cell_count {
            let label = labels[index];
            if label == NO_REGION {
                continue;
            }
            let cell = Cell::new(index as i32 % size.width, index as i32 / size.width);
            for neighbor in [cell.shifted(1, 0), cell.shifted(0, 1)] {
                let Some(nindex) = map.cell_to_index(neighbor) else {
                    continue;
                };
                let nlabel = labels[nindex];
                if nlabel == NO_REGION || nlabel == label {
                    continue;
                }
                let pair = (label.min(nlabel), label.max(nlabel));
                seen.entry(pair).or_insert(cell);
            }
        }

        for ((a, b), anchor) in seen {
            regions[a as usize].links.push(RegionLink { neighbor: b, anchor });
            regions[b as usize].links.push(RegionLink { neighbor: a, anchor });
        }

        Self { labels, regions, built: true }
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[inline]
    pub fn label_at_index(&self, index: usize) -> u16 {
        self.labels[index]
    }

    pub fn region_at(&self, map: &MapGrid, cell: Cell) -> Option<u16> {
        let index = map.cell_to_index(cell)?;
        let label = self.labels[index];
        if label == NO_REGION {
            None
        } else {
            Some(label)
        }
    }

    #[inline]
    pub fn region(&self, label: u16) -> &Region {
        &self.regions[label as usize]
    }

    // Whether a traversal mode can pass through a region at all. Start
    // regions are always allowed (the mover already stands there).
    fn region_allows(&self, map: &MapGrid, label: u16, mode: TraverseMode) -> bool {
        let region = &self.regions[label as usize];
        match region.kind {
            RegionKind::Plain => true,
            RegionKind::Liquid => mode.allows_water(),
            RegionKind::Door => {
                if !mode.blocks_closed_doors() {
                    return true;
                }
                // Closed doors block under the strict modes.
                region.door
                    .and_then(|id| map.building(id))
                    .and_then(|building| building.door_state())
                    .is_some_and(|door| door.free_passage())
            }
        }
    }

    // Cheap reachability oracle: BFS over the region graph, filtered by
    // the traversal mode. Optimistic on details the full search settles
    // exactly (door forbiddance, per-agent water needs).
    pub fn can_reach(&self, map: &MapGrid, start: Cell, dest_rect: &CellRange, mode: TraverseMode) -> bool {
        if !self.built {
            // No partition available; let the search decide.
            return true;
        }
        if mode.destroys_obstacles() {
            // Anything reachable by smashing through.
            return true;
        }

        let Some(start_region) = self.region_at(map, start) else {
            return false;
        };

        // Target region set.
        let mut targets = vec![false; self.regions.len()];
        let mut any_target = false;
        for cell in dest_rect.iter() {
            if let Some(label) = self.region_at(map, cell) {
                targets[label as usize] = true;
                any_target = true;
            }
        }
        if !any_target {
            return false;
        }
        if targets[start_region as usize] {
            return true;
        }

        let mut visited = vec![false; self.regions.len()];
        let mut queue = std::collections::VecDeque::new();
        visited[start_region as usize] = true;
        queue.push_back(start_region);

        while let Some(label) = queue.pop_front() {
            for link in &self.regions[label as usize].links {
                let next = link.neighbor;
                if visited[next as usize] {
                    continue;
                }
                if !self.region_allows(map, next, mode) {
                    continue;
                }
                if targets[next as usize] {
                    return true;
                }
                visited[next as usize] = true;
                queue.push_back(next);
            }
        }

        false
    }
}

// ----------------------------------------------
// RegionCostCalculator
// ----------------------------------------------

// Precomputes an approximate path cost from the destination to every
// region, by running Dijkstra over the region graph with anchor-distance
// edge weights. Backs the fallback heuristic once a search outgrows the
// octile estimate.
pub struct RegionCostCalculator {
    costs: Vec<i32>,
    queue: PriorityQueue<u16, Reverse<i32>>,
}

impl RegionCostCalculator {
    pub fn new() -> Self {
        Self {
            costs: Vec::new(),
            queue: PriorityQueue::new(),
        }
    }

    pub fn init(&mut self, map: &MapGrid, dest_rect: &CellRange, ticks_cardinal: i32, ticks_diagonal: i32) {
        let regions = map.regions();

        self.costs.clear();
        self.costs.resize(regions.len(), UNREACHABLE_REGION_COST);
        self.queue.clear();

        for cell in dest_rect.iter() {
            if let Some(label) = regions.region_at(map, cell) {
                if self.costs[label as usize] != 0 {
                    self.costs[label as usize] = 0;
                    self.queue.push(label, Reverse(0));
                }
            }
        }

        while let Some((label, Reverse(cost))) = self.queue.pop() {
            if cost > self.costs[label as usize] {
                continue; // Stale entry.
            }
            let region = regions.region(label);
            for link in &region.links {
                let next_region = regions.region(link.neighbor);
                let dx = (region.anchor.x - next_region.anchor.x).abs();
                let dy = (region.anchor.y - next_region.anchor.y).abs();
                let step = crate::pathfind::octile_distance(dx, dy, ticks_cardinal, ticks_diagonal).max(1);

                let next_cost = cost.saturating_add(step);
                if next_cost < self.costs[link.neighbor as usize] {
                    self.costs[link.neighbor as usize] = next_cost;
                    self.queue.push_increase(link.neighbor, Reverse(next_cost));
                }
            }
        }
    }

    // Approximate cost from the destination to the region holding this
    // cell. Cells outside any region report the unreachable sentinel.
    #[inline]
    pub fn cost_to_region(&self, regions: &RegionMap, index: usize) -> i32 {
        let label = regions.label_at_index(index);
        if label == NO_REGION {
            return UNREACHABLE_REGION_COST;
        }
        self.costs[label as usize]
    }
}

impl Default for RegionCostCalculator {
    fn default() -> Self {
        Self::new()
    }
}
