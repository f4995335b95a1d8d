use crate::{
    map::MapGrid,
    utils::coords::Cell,
};

use super::{
    path::PathResult,
    search::PathFinder,
    Destination, PathEndMode, TraverseParams,
};

// ----------------------------------------------
// PathfindingProvider
// ----------------------------------------------

// The entry point a host movement system calls to route its agents.
// Implemented by the stock engine below; hosts can substitute their own
// provider without touching the callers.
pub trait PathfindingProvider {
    fn find_path(&mut self,
                 map: &MapGrid,
                 start: Cell,
                 dest: Destination,
                 params: TraverseParams,
                 end_mode: PathEndMode) -> PathResult;
}

impl PathfindingProvider for PathFinder {
    fn find_path(&mut self,
                 map: &MapGrid,
                 start: Cell,
                 dest: Destination,
                 params: TraverseParams,
                 end_mode: PathEndMode) -> PathResult {
        PathFinder::find_path(self, map, start, dest, params, end_mode)
    }
}

// ----------------------------------------------
// MapPathfinding
// ----------------------------------------------

// Owns the cached per-map search engine. One of these lives beside each
// map; `notify_map_rebuilt` must run whenever the map is reinitialized
// so node records sized for the old grid are thrown away.
pub struct MapPathfinding {
    finder: PathFinder,
}

impl MapPathfinding {
    pub fn new(map: &MapGrid) -> Self {
        Self { finder: PathFinder::new(map) }
    }

    pub fn notify_map_rebuilt(&mut self, map: &MapGrid) {
        self.finder.reset(map);
    }

    #[inline]
    pub fn finder(&mut self) -> &mut PathFinder {
        &mut self.finder
    }
}

impl PathfindingProvider for MapPathfinding {
    fn find_path(&mut self,
                 map: &MapGrid,
                 start: Cell,
                 dest: Destination,
                 params: TraverseParams,
                 end_mode: PathEndMode) -> PathResult {
        self.finder.find_path(map, start, dest, params, end_mode)
    }
}
