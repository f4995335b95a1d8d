use crate::{
    agent::AgentProfile,
    map::{regions::RegionCostCalculator, RegionMap},
    utils::{coords::Cell, evaluate_curve, CurvePoint},
};

// ----------------------------------------------
// Octile distance
// ----------------------------------------------

// Grid distance allowing diagonal steps, scaled by the mover's cardinal
// and diagonal tick costs.
#[inline]
pub fn octile_distance(dx: i32, dy: i32, ticks_cardinal: i32, ticks_diagonal: i32) -> i32 {
    debug_assert!(dx >= 0 && dy >= 0);
    ticks_cardinal * (dx + dy) + (ticks_diagonal - 2 * ticks_cardinal) * dx.min(dy)
}

// ----------------------------------------------
// Heuristic weighting
// ----------------------------------------------

// Flat weight applied to the octile estimate for animals.
pub const HEURISTIC_STRENGTH_ANIMAL: f32 = 1.75;

// Weight applied to the octile estimate for everyone else, by
// straight-line distance to the goal. Deliberately inadmissible: long
// hauls trade optimality for greedy speed.
const HEURISTIC_STRENGTH_BY_DISTANCE: [CurvePoint; 2] = [
    (40.0, 1.0),
    (120.0, 2.8),
];

// Weight applied to the region-distance estimate, by how many nodes the
// search has opened. Escalates hard so that huge searches terminate.
const REGION_WEIGHT_BY_NODES_OPENED: [CurvePoint; 5] = [
    (0.0, 1.0),
    (3500.0, 1.0),
    (4500.0, 5.0),
    (30000.0, 50.0),
    (100000.0, 500.0),
];

pub fn heuristic_strength(agent: Option<&AgentProfile>, start: Cell, dest: Cell) -> f32 {
    if let Some(agent) = agent {
        if agent.kind == crate::agent::AgentKind::Animal {
            return HEURISTIC_STRENGTH_ANIMAL;
        }
    }
    let distance = start.line_distance(dest);
    evaluate_curve(&HEURISTIC_STRENGTH_BY_DISTANCE, distance).round()
}

// ----------------------------------------------
// HeuristicSelector
// ----------------------------------------------

// The two goal-distance estimators a search can run under, and the
// switch-over decision. Starts on the cheap octile estimate; the search
// engine swaps to the precomputed region estimate when the frontier
// outgrows the switch threshold.
pub(crate) struct HeuristicSelector {
    dest: Cell,
    strength: f32,
    region_based: bool,
}

impl HeuristicSelector {
    pub fn new(dest: Cell, strength: f32) -> Self {
        Self {
            dest,
            strength,
            region_based: false,
        }
    }

    #[inline]
    pub fn is_region_based(&self) -> bool {
        self.region_based
    }

    pub fn switch_to_region_based(&mut self) {
        debug_assert!(!self.region_based);
        self.region_based = true;
    }

    // Whether the search should swap estimators now.
    #[inline]
    pub fn should_switch(&self, nodes_opened: i32, threshold: i32, start_has_region: bool) -> bool {
        !self.region_based && start_has_region && nodes_opened >= threshold
    }

    // Estimated cost-to-goal for a cell, under whichever estimator is
    // active. Region estimates are weighted up as the search grows.
    pub fn estimate(&self,
                    cell: Cell,
                    index: usize,
                    ticks_cardinal: i32,
                    ticks_diagonal: i32,
                    regions: &RegionMap,
                    region_costs: &RegionCostCalculator,
                    nodes_opened: i32) -> i32 {
        if self.region_based {
            let region_cost = region_costs.cost_to_region(regions, index);
            let weight = evaluate_curve(&REGION_WEIGHT_BY_NODES_OPENED, nodes_opened as f32);
            (region_cost as f32 * weight).round() as i32
        } else {
            let dx = (cell.x - self.dest.x).abs();
            let dy = (cell.y - self.dest.y).abs();
            let octile = octile_distance(dx, dy, ticks_cardinal, ticks_diagonal);
            (octile as f32 * self.strength).round() as i32
        }
    }
}
