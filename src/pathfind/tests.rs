use super::*;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::agent::{AgentKind, AgentProfile, Job, LocomotionUrgency};
use crate::map::{
    Area, Building, ByteGrid, Door, MapGrid,
    TerrainCatalog, TerrainDef, TerrainTags,
};
use crate::utils::{coords::{Cell, Direction}, Size};

// ----------------------------------------------
// Fixtures
// ----------------------------------------------

// Minimal terrain set with exact numbers the assertions below rely on.
fn test_catalog() -> TerrainCatalog {
    let fresh = TerrainTags::Liquid | TerrainTags::Fresh;
    TerrainCatalog::new(vec![
        TerrainDef::new("land", TerrainTags::empty(), true, 0),
        TerrainDef::new("rock", TerrainTags::empty(), false, 0),
        // Cheap to swim, pricey to wade.
        TerrainDef::new("pond", fresh, true, 15)
            .with_swim_cost(5)
            .with_perceived_costs(10, 40),
        TerrainDef::new("strip", fresh, true, 30)
            .with_swim_cost(2)
            .with_perceived_costs(10, 25),
    ])
}

fn land_map(width: i32, height: i32) -> MapGrid {
    MapGrid::new(Size::new(width, height), test_catalog())
}

fn set_rock(map: &mut MapGrid, cell: Cell) {
    let rock = map.catalog().find("rock").unwrap();
    map.set_terrain(cell, rock);
}

fn find(map: &MapGrid, finder: &mut PathFinder, start: Cell, goal: Cell, mode: TraverseMode) -> PathResult {
    finder.find_path(map, start, Destination::Cell(goal), TraverseParams::modal(mode), PathEndMode::OnCell)
}

// Reference uniform-cost shortest path with the same movement rules as
// the engine's agent-less cost model: 13/18 move ticks, static terrain
// cost, no diagonal squeezing past blocked corners.
fn reference_dijkstra(map: &MapGrid, start: Cell, goal: Cell) -> Option<i32> {
    let start_index = map.cell_to_index(start)?;
    let goal_index = map.cell_to_index(goal)?;

    let mut dist = vec![i32::MAX; map.size().cell_count()];
    let mut queue: BinaryHeap<(Reverse<i32>, usize)> = BinaryHeap::new();
    dist[start_index] = 0;
    queue.push((Reverse(0), start_index));

    while let Some((Reverse(cost), index)) = queue.pop() {
        if index == goal_index {
            return Some(cost);
        }
        if cost > dist[index] {
            continue;
        }
        let cell = map.index_to_cell(index);
        for dir in Direction::all() {
            let neighbor = dir.apply(cell);
            let Some(nindex) = map.cell_to_index(neighbor) else {
                continue;
            };
            if !map.walkable_fast(nindex) {
                continue;
            }
            if let Some((a, b)) = dir.corner_cells(cell) {
                if map.blocks_diagonal_movement(a) || map.blocks_diagonal_movement(b) {
                    continue;
                }
            }
            let ticks = if dir.is_diagonal() { 18 } else { 13 };
            let step = (ticks + map.path_cost_at(nindex)).clamp(1, MAX_STEP_COST);
            let next = cost + step;
            if next < dist[nindex] {
                dist[nindex] = next;
                queue.push((Reverse(next), nindex));
            }
        }
    }

    None
}

// Recompute a path's cost edge by edge, agent-less rules.
fn recompute_path_cost(map: &MapGrid, path: &Path) -> i32 {
    let mut total = 0;
    for pair in path.cells().windows(2) {
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        assert!(dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0), "Non-adjacent path cells!");
        let diagonal = dx != 0 && dy != 0;
        let index = map.cell_to_index(pair[1]).unwrap();
        assert!(map.walkable_fast(index), "Path crosses unwalkable cell {}", pair[1]);
        let ticks = if diagonal { 18 } else { 13 };
        total += (ticks + map.path_cost_at(index)).clamp(1, MAX_STEP_COST);
    }
    total
}

// ----------------------------------------------
// Baseline correctness
// ----------------------------------------------

#[test]
fn test_trivial_paths() {
    let map = land_map(8, 8);
    let mut finder = PathFinder::new(&map);

    // start == goal
    let result = find(&map, &mut finder, Cell::new(3, 3), Cell::new(3, 3), TraverseMode::ByAgent);
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.cells(), &[Cell::new(3, 3)]);
    assert_eq!(path.total_cost(), 0);

    // One cardinal step.
    let result = find(&map, &mut finder, Cell::new(3, 3), Cell::new(4, 3), TraverseMode::ByAgent);
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.len(), 2);
    assert_eq!(path.total_cost(), 13);

    // One diagonal step.
    let result = find(&map, &mut finder, Cell::new(3, 3), Cell::new(4, 4), TraverseMode::ByAgent);
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.len(), 2);
    assert_eq!(path.total_cost(), 18);
}

#[test]
fn test_invalid_inputs() {
    let map = land_map(8, 8);
    let mut finder = PathFinder::new(&map);

    let result = find(&map, &mut finder, Cell::new(-1, 0), Cell::new(4, 4), TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::InvalidStart));

    let result = find(&map, &mut finder, Cell::new(0, 0), Cell::new(8, 8), TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::InvalidDestination));
}

#[test]
fn test_cross_instance_misuse() {
    let mut map_a = land_map(8, 8);
    let map_b = land_map(8, 8);

    let agent = map_a.add_agent(Cell::new(0, 0), AgentProfile::humanlike("stray")).unwrap();

    // Pathfinder built for one map, called with another.
    let mut finder_a = PathFinder::new(&map_a);
    let result = find(&map_b, &mut finder_a, Cell::new(0, 0), Cell::new(4, 4), TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::CrossInstanceMisuse));

    // Agent registered on another map.
    let mut finder_b = PathFinder::new(&map_b);
    let params = TraverseParams::for_agent(agent, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder_b.find_path(&map_b, Cell::new(0, 0), Destination::Cell(Cell::new(4, 4)), params, PathEndMode::OnCell);
    assert_eq!(result.failure(), Some(PathFailure::CrossInstanceMisuse));
}

#[test]
fn test_matches_reference_dijkstra_on_uniform_grids() {
    for seed in 0..10u64 {
        let mut map = land_map(12, 12);
        let mut rng = Pcg64::seed_from_u64(seed);

        for y in 0..12 {
            for x in 0..12 {
                if (x, y) == (0, 0) || (x, y) == (11, 11) {
                    continue;
                }
                if rng.random_range(0..100) < 22 {
                    set_rock(&mut map, Cell::new(x, y));
                }
            }
        }

        let mut finder = PathFinder::new(&map);
        let result = find(&map, &mut finder, Cell::new(0, 0), Cell::new(11, 11), TraverseMode::ByAgent);
        let reference = reference_dijkstra(&map, Cell::new(0, 0), Cell::new(11, 11));

        match (result.path(), reference) {
            (Some(path), Some(expected)) => {
                assert_eq!(path.total_cost(), expected, "seed {}: engine cost diverged from Dijkstra", seed);
                assert_eq!(path.total_cost(), recompute_path_cost(&map, path));
            }
            (None, None) => {} // Both agree there is no path.
            (found, expected) => {
                panic!("seed {}: engine={:?} reference={:?} disagree", seed, found.map(Path::total_cost), expected);
            }
        }
    }
}

// ----------------------------------------------
// Swimming
// ----------------------------------------------

#[test]
fn test_swim_cost_substitution() {
    // land | pond | land strip, forced single file.
    let mut map = land_map(3, 1);
    let pond = map.catalog().find("pond").unwrap();
    map.set_terrain(Cell::new(1, 0), pond);

    let swimmer = map.add_agent(Cell::new(0, 0), AgentProfile::humanlike("swimmer").with_swim_speed(4.6)).unwrap();

    let mut finder = PathFinder::new(&map);
    let params = TraverseParams::for_agent(swimmer, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(2, 0)), params, PathEndMode::OnCell);

    // Swim cost 5 substitutes for the pond's walk cost 15, and the
    // non-swim perceived surcharge (40) is skipped entirely:
    //   step onto pond: 13 + 5 = 18, step off: 13.
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 31);
}

#[test]
fn test_no_swim_fallback() {
    let mut map = land_map(3, 1);
    let pond = map.catalog().find("pond").unwrap();
    map.set_terrain(Cell::new(1, 0), pond);

    let wader = map.add_agent(Cell::new(0, 0), AgentProfile::humanlike("wader")).unwrap();

    let mut finder = PathFinder::new(&map);
    let params = TraverseParams::for_agent(wader, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(2, 0)), params, PathEndMode::OnCell);

    // No swim speed: land-speed ticks plus the full walk cost and the
    // non-commanded perceived surcharge.
    //   step onto pond: 13 + 15 + 40 = 68, step off: 13.
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 81);
}

#[test]
fn test_swimmer_crosses_wader_detours() {
    // 5x5, a liquid strip across the middle with a land ford at x=4:
    //   . . . . .
    //   . . . . .
    //   ~ ~ ~ ~ .
    //   . . . . .
    //   . . . . .
    let mut map = land_map(5, 5);
    let strip = map.catalog().find("strip").unwrap();
    for x in 0..4 {
        map.set_terrain(Cell::new(x, 2), strip);
    }

    let swimmer = map.add_agent(Cell::new(1, 0), AgentProfile::humanlike("swimmer").with_swim_speed(4.6)).unwrap();
    let wader = map.add_agent(Cell::new(1, 0), AgentProfile::humanlike("wader")).unwrap();

    let mut finder = PathFinder::new(&map);
    let start = Cell::new(1, 0);
    let goal = Destination::Cell(Cell::new(1, 4));

    let is_liquid = |map: &MapGrid, cell: Cell| map.terrain_def_at(cell).unwrap().is_liquid();

    // The swimmer goes straight across the strip: 4 cardinal steps, the
    // wet one costing 13 + swim cost 2.
    let params = TraverseParams::for_agent(swimmer, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, start, goal, params, PathEndMode::OnCell);
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.len(), 5);
    assert_eq!(path.total_cost(), 54);
    assert!(path.iter().any(|cell| is_liquid(&map, *cell)));

    // The wader routes around via the ford and never touches water.
    let params = TraverseParams::for_agent(wader, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, start, goal, params, PathEndMode::OnCell);
    let path = result.path().expect("Expected a path!");
    assert!(path.iter().all(|cell| !is_liquid(&map, *cell)));
}

#[test]
fn test_deep_water_needs_swim_speed() {
    // land | deep water | land, single file, stock catalog.
    let mut map = MapGrid::new(Size::new(3, 1), TerrainCatalog::with_defaults());
    let deep = map.catalog().find("water_deep").unwrap();
    map.set_terrain(Cell::new(1, 0), deep);

    let wader = map.add_agent(Cell::new(0, 0), AgentProfile::humanlike("wader")).unwrap();
    let swimmer = map.add_agent(Cell::new(0, 0), AgentProfile::humanlike("swimmer").with_swim_speed(2.0)).unwrap();

    let mut finder = PathFinder::new(&map);
    let goal = Destination::Cell(Cell::new(2, 0));

    // Non-swimmers cannot wade chest-deep water.
    let params = TraverseParams::for_agent(wader, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), goal, params, PathEndMode::OnCell);
    assert!(result.not_found());

    let params = TraverseParams::for_agent(swimmer, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), goal, params, PathEndMode::OnCell);
    assert!(result.found());
}

#[test]
fn test_aquatic_agents_stay_in_their_water() {
    // A river crossing the map, fresh on the west, salt on the east.
    let mut map = MapGrid::new(Size::new(6, 1), TerrainCatalog::with_defaults());
    let fresh = map.catalog().find("water_shallow").unwrap();
    let salt = map.catalog().find("water_ocean_shallow").unwrap();
    for x in 0..3 {
        map.set_terrain(Cell::new(x, 0), fresh);
    }
    for x in 3..6 {
        map.set_terrain(Cell::new(x, 0), salt);
    }

    let mut fish = AgentProfile::new("fish", AgentKind::Animal, 0.0).with_swim_speed(3.0);
    fish.aquatic = true;
    fish.water_needs = crate::agent::WaterNeeds::FreshOnly;
    let fish = map.add_agent(Cell::new(0, 0), fish).unwrap();

    let mut finder = PathFinder::new(&map);
    let params = TraverseParams::for_agent(fish, Danger::Deadly, TraverseMode::ByAgent, false);

    // Within fresh water: fine.
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(2, 0)), params, PathEndMode::OnCell);
    assert!(result.found());

    // Into salt water: blocked by the water restriction.
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(5, 0)), params, PathEndMode::OnCell);
    assert!(result.not_found());
}

#[test]
fn test_water_averse_modes_skip_liquid() {
    // Water spans the full width; no dry route exists.
    let mut map = land_map(5, 5);
    let pond = map.catalog().find("pond").unwrap();
    for x in 0..5 {
        map.set_terrain(Cell::new(x, 2), pond);
    }
    map.rebuild_regions();

    let mut finder = PathFinder::new(&map);

    let result = find(&map, &mut finder, Cell::new(2, 0), Cell::new(2, 4), TraverseMode::NoPassClosedDoorsOrWater);
    assert!(result.not_found());

    let result = find(&map, &mut finder, Cell::new(2, 0), Cell::new(2, 4), TraverseMode::NoPassClosedDoors);
    assert!(result.found());
}

// ----------------------------------------------
// Doors & corners
// ----------------------------------------------

#[test]
fn test_door_cost_table() {
    let human = AgentProfile::humanlike("opener");
    let animal = AgentProfile::animal("boar");

    let closed = Building::door(100, Door::new(60));
    let held = Building::door(100, Door::new(60).held_open());
    let locked = Building::door(100, Door::new(60).locked());
    let forbidden = Building::door(100, Door::new(60).forbidden());

    use TraverseMode::*;

    // Full per-agent rules.
    assert_eq!(building_cost(&closed, ByAgent, false, Some(&human)), 60);
    assert_eq!(building_cost(&held, ByAgent, false, Some(&human)), 0);
    assert_eq!(building_cost(&locked, ByAgent, false, Some(&human)), i32::MAX);
    assert_eq!(building_cost(&locked, ByAgent, true, Some(&human)), COST_DOOR_TO_BASH);
    assert_eq!(building_cost(&forbidden, ByAgent, false, Some(&human)), i32::MAX);
    assert_eq!(building_cost(&forbidden, ByAgent, true, Some(&human)), 60);

    // Animals cannot operate doors.
    assert_eq!(building_cost(&closed, ByAgent, false, Some(&animal)), i32::MAX);

    // PassDoors squeezes where it cannot open.
    assert_eq!(building_cost(&closed, PassDoors, false, Some(&human)), 60);
    assert_eq!(building_cost(&locked, PassDoors, false, Some(&human)), COST_SQUEEZE_PAST_DOOR);
    assert_eq!(building_cost(&held, PassDoors, false, Some(&human)), 0);

    // Strict modes: only free passage goes through.
    assert_eq!(building_cost(&held, NoPassClosedDoors, false, Some(&human)), 0);
    assert_eq!(building_cost(&closed, NoPassClosedDoors, false, Some(&human)), i32::MAX);
    assert_eq!(building_cost(&closed, NoPassClosedDoorsOrWater, false, Some(&human)), i32::MAX);

    // Destroy modes price the door by its durability: 50 + 0.2 * 100.
    assert_eq!(building_cost(&locked, PassAllDestroyableThings, false, Some(&human)), 70);
    assert_eq!(building_cost(&closed, PassAllDestroyableThings, false, Some(&human)), 60);

    // Fences block animals outright, humans climb at a cost.
    let fence = Building::fence(50, 30);
    assert_eq!(building_cost(&fence, ByAgent, false, Some(&animal)), i32::MAX);
    assert_eq!(building_cost(&fence, ByAgent, false, Some(&human)), 30);
    assert_eq!(building_cost(&fence, ByAgent, false, None), 0);
}

#[test]
fn test_diagonal_corner_rule() {
    // 2x2 grid; both cells flanking the start->goal diagonal hold
    // locked doors, so the only alternatives lead through a door.
    let mut map = land_map(2, 2);
    map.add_building(Cell::new(1, 0), Building::door(1000, Door::new(60).locked()));
    map.add_building(Cell::new(0, 1), Building::door(1000, Door::new(60).locked()));

    let mut finder = PathFinder::new(&map);

    // Strict traversal cannot cut the corner and cannot pass the locked
    // doors either: no path at all.
    let result = find(&map, &mut finder, Cell::new(0, 0), Cell::new(1, 1), TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::Exhausted));

    // Destroy mode tolerates the squeeze at a price per blocked corner:
    // 18 diagonal ticks + 2 * 70.
    let result = find(&map, &mut finder, Cell::new(0, 0), Cell::new(1, 1), TraverseMode::PassAllDestroyableThings);
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.len(), 2);
    assert_eq!(path.total_cost(), 158);
}

#[test]
fn test_bashing_comes_from_the_job() {
    // A locked door bars the only corridor.
    let mut map = land_map(3, 1);
    map.add_building(Cell::new(1, 0), Building::door(100, Door::new(60).locked()));

    let meek = map.add_agent(Cell::new(0, 0), AgentProfile::humanlike("meek")).unwrap();
    let brute = map.add_agent(Cell::new(0, 0),
        AgentProfile::humanlike("brute").with_job(Job::new("assault", LocomotionUrgency::Normal).with_bashing())).unwrap();

    let mut finder = PathFinder::new(&map);
    let goal = Destination::Cell(Cell::new(2, 0));

    let result = finder.find_path_for_agent(&map, Cell::new(0, 0), goal, meek, PathEndMode::OnCell);
    assert!(result.not_found());

    // Bash permission prices the locked door at 300.
    let result = finder.find_path_for_agent(&map, Cell::new(0, 0), goal, brute, PathEndMode::OnCell);
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 13 + COST_DOOR_TO_BASH + 13);
}

#[test]
fn test_walls_block_until_destroyed() {
    // A wall bar with no gaps between start and goal.
    let mut map = land_map(5, 3);
    for y in 0..3 {
        map.add_building(Cell::new(2, y), Building::wall(100));
    }
    map.rebuild_regions();

    let mut finder = PathFinder::new(&map);

    let result = find(&map, &mut finder, Cell::new(0, 1), Cell::new(4, 1), TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::Unreachable));

    // Smashing through: 70 base + 0.2 * 100 hit points on the wall cell.
    let result = find(&map, &mut finder, Cell::new(0, 1), Cell::new(4, 1), TraverseMode::PassAllDestroyableThings);
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 4 * 13 + 70 + 20);
}

// ----------------------------------------------
// Destination regions
// ----------------------------------------------

#[test]
fn test_touch_destination_stops_adjacent() {
    // 3x3 building footprint in the middle of a 9x9 map.
    let mut map = land_map(9, 9);
    for y in 3..6 {
        for x in 3..6 {
            map.add_building(Cell::new(x, y), Building::wall(100));
        }
    }

    let dest = Destination::Footprint { base: Cell::new(3, 3), size: Size::new(3, 3) };
    let rect = dest.rect(PathEndMode::Touch);
    assert_eq!(rect.start, Cell::new(2, 2));
    assert_eq!(rect.end, Cell::new(6, 6));

    let mut finder = PathFinder::new(&map);
    let result = finder.find_path(&map, Cell::new(0, 0), dest, TraverseParams::modal(TraverseMode::ByAgent), PathEndMode::Touch);

    let path = result.path().expect("Expected a path!");
    let goal = path.goal();
    assert!(rect.contains(goal));
    assert!(map.building_at(goal).is_none(), "Touch goal must not be inside the footprint");
}

// ----------------------------------------------
// Heuristic switch
// ----------------------------------------------

fn serpentine_maze(width: i32, height: i32) -> MapGrid {
    let mut map = land_map(width, height);
    let mut gap_left = true;
    for y in (2..height - 1).step_by(2) {
        for x in 0..width {
            let gap = if gap_left { x == 0 } else { x == width - 1 };
            if !gap {
                set_rock(&mut map, Cell::new(x, y));
            }
        }
        gap_left = !gap_left;
    }
    map
}

#[test]
fn test_forced_heuristic_switch_still_finds_correct_path() {
    let mut map = serpentine_maze(20, 20);
    map.rebuild_regions();

    let start = Cell::new(10, 0);
    let goal = Cell::new(10, 19);

    // Plain run for comparison.
    let mut plain = PathFinder::new(&map);
    let plain_result = find(&map, &mut plain, start, goal, TraverseMode::ByAgent);
    let plain_path = plain_result.path().expect("Expected a path!");
    assert!(!plain_path.used_region_heuristic());

    // Forcing the switch almost immediately must still yield a valid,
    // cost-consistent path.
    let mut config = PathfinderConfig::default();
    config.region_switch_nodes_standard = 8;
    let mut switching = PathFinder::with_config(&map, config);

    let result = find(&map, &mut switching, start, goal, TraverseMode::ByAgent);
    let path = result.path().expect("Expected a path!");

    assert!(path.used_region_heuristic());
    assert_eq!(path.start(), start);
    assert_eq!(path.goal(), goal);
    assert_eq!(path.total_cost(), recompute_path_cost(&map, path));

    // The maze corridor is unique, so both runs land on the same cost.
    assert_eq!(path.total_cost(), plain_path.total_cost());
}

#[test]
fn test_unreachable_goal_fails_deterministically() {
    // Goal sealed inside a solid rock chamber.
    let mut map = land_map(12, 12);
    for y in 4..9 {
        for x in 4..9 {
            if x == 4 || x == 8 || y == 4 || y == 8 {
                set_rock(&mut map, Cell::new(x, y));
            }
        }
    }

    let start = Cell::new(0, 0);
    let goal = Cell::new(6, 6);

    // Without a region partition the search must exhaust the frontier.
    let mut finder = PathFinder::new(&map);
    let result = find(&map, &mut finder, start, goal, TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::Exhausted));

    // With one, the pre-check answers before any expansion.
    map.rebuild_regions();
    let result = find(&map, &mut finder, start, goal, TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::Unreachable));
}

#[test]
fn test_search_budget_aborts() {
    let mut map = serpentine_maze(24, 24);
    map.rebuild_regions();

    let mut config = PathfinderConfig::default();
    config.search_limit = 20; // Far too small for the maze.
    let mut finder = PathFinder::with_config(&map, config);

    let result = find(&map, &mut finder, Cell::new(12, 0), Cell::new(12, 23), TraverseMode::ByAgent);
    assert_eq!(result.failure(), Some(PathFailure::BudgetExceeded));
}

// ----------------------------------------------
// Epoch reuse
// ----------------------------------------------

#[test]
fn test_epoch_reuse_across_many_searches() {
    // Enough sequential searches on one instance to wrap the u16 status
    // epoch twice. Results must never be contaminated by stale records.
    let mut map = land_map(8, 8);
    set_rock(&mut map, Cell::new(3, 3));
    set_rock(&mut map, Cell::new(4, 3));
    set_rock(&mut map, Cell::new(3, 4));

    let mut finder = PathFinder::new(&map);

    let runs = [
        (Cell::new(0, 0), Cell::new(7, 7)),
        (Cell::new(7, 0), Cell::new(0, 7)),
    ];

    let mut expected: Vec<(i32, Vec<Cell>)> = Vec::new();
    for (start, goal) in runs {
        let result = find(&map, &mut finder, start, goal, TraverseMode::ByAgent);
        let path = result.path().expect("Expected a path!");
        expected.push((path.total_cost(), path.cells().to_vec()));
    }

    for i in 0..40000 {
        let (start, goal) = runs[i % runs.len()];
        let result = find(&map, &mut finder, start, goal, TraverseMode::ByAgent);
        let path = result.path().expect("Expected a path!");
        let (expected_cost, expected_cells) = &expected[i % runs.len()];
        assert_eq!(path.total_cost(), *expected_cost, "run {} diverged", i);
        assert_eq!(path.cells(), expected_cells.as_slice(), "run {} diverged", i);
    }
}

// ----------------------------------------------
// Soft costs
// ----------------------------------------------

#[test]
fn test_avoid_grid_overlay() {
    let mut map = land_map(3, 1);

    let mut overlay = ByteGrid::new(map.size());
    overlay.set(map.cell_to_index(Cell::new(1, 0)).unwrap(), 5);
    let overlay = map.add_avoid_grid(overlay);

    let mut profile = AgentProfile::humanlike("wary");
    profile.avoid_grid = Some(overlay);
    let agent = map.add_agent(Cell::new(0, 0), profile).unwrap();

    let mut finder = PathFinder::new(&map);
    let params = TraverseParams::for_agent(agent, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(2, 0)), params, PathEndMode::OnCell);

    // 13 + 5 * 8 through the marked cell, then 13.
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 13 + 40 + 13);
}

#[test]
fn test_allowed_area_penalty() {
    let mut map = land_map(3, 1);

    // Only the start cell is allowed.
    let mut area = Area::new(map.size());
    area.set(map.cell_to_index(Cell::new(0, 0)).unwrap(), true);
    let area = map.add_area(area);

    let mut profile = AgentProfile::humanlike("fenced");
    profile.allowed_area = Some(area);
    let agent = map.add_agent(Cell::new(0, 0), profile).unwrap();

    let mut finder = PathFinder::new(&map);
    let params = TraverseParams::for_agent(agent, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(2, 0)), params, PathEndMode::OnCell);

    // Each step outside the area costs 13 + 600, capped at 450.
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 450 + 450);

    // Commanded agents ignore their area restriction.
    map.agent_mut(agent).unwrap().commanded = true;
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(2, 0)), params, PathEndMode::OnCell);
    assert_eq!(result.path().unwrap().total_cost(), 26);
}

#[test]
fn test_crowding_penalty() {
    let mut map = land_map(3, 1);

    let mover = map.add_agent(Cell::new(0, 0), AgentProfile::humanlike("mover")).unwrap();
    map.add_agent(Cell::new(1, 0), AgentProfile::humanlike("loiterer")).unwrap();

    let mut finder = PathFinder::new(&map);
    let params = TraverseParams::for_agent(mover, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(2, 0)), params, PathEndMode::OnCell);

    // 13 + 175 through the occupied cell, then 13.
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 13 + COST_AGENT_COLLISION + 13);
}

// ----------------------------------------------
// Urgency & pace
// ----------------------------------------------

#[test]
fn test_job_urgency_scaling() {
    let mut map = land_map(3, 1);

    let ambler = map.add_agent(Cell::new(0, 0),
        AgentProfile::humanlike("ambler").with_job(Job::new("wander", LocomotionUrgency::Slow))).unwrap();
    let sprinter = map.add_agent(Cell::new(0, 0),
        AgentProfile::humanlike("sprinter").with_job(Job::new("flee", LocomotionUrgency::Sprint))).unwrap();

    let mut finder = PathFinder::new(&map);
    let goal = Destination::Cell(Cell::new(2, 0));

    // Slow: 13 * 3 = 39, floored to 60 per step.
    let params = TraverseParams::for_agent(ambler, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), goal, params, PathEndMode::OnCell);
    assert_eq!(result.path().unwrap().total_cost(), 120);

    // Sprint: round(13 * 0.75) = 10 per step, no floor.
    let params = TraverseParams::for_agent(sprinter, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), goal, params, PathEndMode::OnCell);
    assert_eq!(result.path().unwrap().total_cost(), 20);
}

#[test]
fn test_follow_pace_takes_the_slower_cost() {
    let mut map = land_map(3, 1);

    // The followed agent plods at 1 cell/sec: 60 ticks per step.
    let slowpoke = map.add_agent(Cell::new(2, 0), AgentProfile::new("slowpoke", AgentKind::Humanlike, 1.0)).unwrap();

    let mut profile = AgentProfile::humanlike("escort");
    profile.follow_pace_of = Some(slowpoke);
    let escort = map.add_agent(Cell::new(0, 0), profile).unwrap();

    // Mutual link: must terminate (single-level indirection) and give
    // the same answer.
    map.agent_mut(slowpoke).unwrap().follow_pace_of = Some(escort);

    let mut finder = PathFinder::new(&map);
    let params = TraverseParams::for_agent(escort, Danger::Deadly, TraverseMode::ByAgent, false);
    let result = finder.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(1, 0)), params, PathEndMode::OnCell);

    // One step at the slowpoke's 60 ticks instead of the escort's 13.
    let path = result.path().expect("Expected a path!");
    assert_eq!(path.total_cost(), 60);
}

// ----------------------------------------------
// Provider lifecycle
// ----------------------------------------------

#[test]
fn test_provider_survives_map_rebuild() {
    let map = land_map(6, 6);
    let mut provider = MapPathfinding::new(&map);

    let result = provider.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(5, 5)),
                                    TraverseParams::modal(TraverseMode::ByAgent), PathEndMode::OnCell);
    assert!(result.found());

    // A structurally new (bigger) map requires a reset before use.
    let bigger = land_map(10, 10);
    provider.notify_map_rebuilt(&bigger);

    let result = provider.find_path(&bigger, Cell::new(0, 0), Destination::Cell(Cell::new(9, 9)),
                                    TraverseParams::modal(TraverseMode::ByAgent), PathEndMode::OnCell);
    assert!(result.found());

    // Using the stale map afterwards is refused, not mis-answered.
    let result = provider.find_path(&map, Cell::new(0, 0), Destination::Cell(Cell::new(5, 5)),
                                    TraverseParams::modal(TraverseMode::ByAgent), PathEndMode::OnCell);
    assert_eq!(result.failure(), Some(PathFailure::CrossInstanceMisuse));
}

// ----------------------------------------------
// Config
// ----------------------------------------------

#[test]
fn test_config_defaults_and_serde() {
    let config = PathfinderConfig::default();
    assert_eq!(config.search_limit, SEARCH_LIMIT);
    assert_eq!(config.region_switch_nodes_standard, REGION_SWITCH_NODES_STANDARD);
    assert_eq!(config.region_switch_nodes_priority, REGION_SWITCH_NODES_PRIORITY);
    assert!(!config.path_through_walls);

    // Partial configs deserialize over the defaults.
    let loaded: PathfinderConfig = serde_json::from_str(r#"{ "search_limit": 5000 }"#).unwrap();
    assert_eq!(loaded.search_limit, 5000);
    assert_eq!(loaded.region_switch_nodes_standard, REGION_SWITCH_NODES_STANDARD);
}
