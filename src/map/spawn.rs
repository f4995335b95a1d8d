use rand::Rng;

use crate::utils::coords::Cell;

use super::grid::MapGrid;

// ----------------------------------------------
// Entry cell selection
// ----------------------------------------------

const MAX_RANDOM_TRIES: i32 = 100;

// Picks a walkable cell on the map edge for arrivals. `prefer_land`
// rejects deep-water cells, so groups that walk rather than swim do not
// get placed mid-ocean; it is an explicit per-query parameter, never
// ambient state. Falls back to a full edge scan (and then to deep water)
// when random probing fails.
pub fn find_random_entry_cell(map: &MapGrid, rng: &mut impl Rng, prefer_land: bool) -> Option<Cell> {
    let size = map.size();

    let acceptable = |map: &MapGrid, cell: Cell, reject_deep: bool| -> bool {
        let Some(index) = map.cell_to_index(cell) else {
            return false;
        };
        if !map.walkable_fast(index) {
            return false;
        }
        if reject_deep && map.terrain_def_at_index(index).is_deep() {
            return false;
        }
        true
    };

    for _ in 0..MAX_RANDOM_TRIES {
        let cell = random_edge_cell(map, rng);
        if acceptable(map, cell, prefer_land) {
            return Some(cell);
        }
    }

    // Random probing failed; scan the whole edge deterministically,
    // first respecting the land preference, then without it.
    for reject_deep in [prefer_land, false] {
        for x in 0..size.width {
            for y in [0, size.height - 1] {
                let cell = Cell::new(x, y);
                if acceptable(map, cell, reject_deep) {
                    return Some(cell);
                }
            }
        }
        for y in 0..size.height {
            for x in [0, size.width - 1] {
                let cell = Cell::new(x, y);
                if acceptable(map, cell, reject_deep) {
                    return Some(cell);
                }
            }
        }
        if !reject_deep {
            break;
        }
    }

    None
}

fn random_edge_cell(map: &MapGrid, rng: &mut impl Rng) -> Cell {
    let size = map.size();
    match rng.random_range(0..4) {
        0 => Cell::new(rng.random_range(0..size.width), 0),
        1 => Cell::new(rng.random_range(0..size.width), size.height - 1),
        2 => Cell::new(0, rng.random_range(0..size.height)),
        _ => Cell::new(size.width - 1, rng.random_range(0..size.height)),
    }
}
