use std::iter::FusedIterator;
use std::ops::RangeInclusive;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

// ----------------------------------------------
// Cell
// ----------------------------------------------

// X,Y position in the map grid of cells.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    #[inline]
    pub const fn invalid() -> Self {
        Self { x: -1, y: -1 }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    #[inline]
    pub const fn shifted(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    // Number of axis-aligned steps between two cells.
    #[inline]
    pub fn manhattan_distance(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    // Straight-line distance, used to pick heuristic strength.
    #[inline]
    pub fn line_distance(self, other: Cell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

// ----------------------------------------------
// Direction
// ----------------------------------------------

// The 8 grid move directions. Cardinals first, diagonals after,
// so `(dir as u8) < 4` tests for a cardinal move.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum Direction {
    North,
    East,
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

pub const DIRECTION_COUNT: usize = 8;

const DIRECTION_OFFSETS: [(i32, i32); DIRECTION_COUNT] = [
    (0, -1), // N
    (1, 0),  // E
    (0, 1),  // S
    (-1, 0), // W
    (1, -1), // NE
    (1, 1),  // SE
    (-1, 1), // SW
    (-1, -1), // NW
];

impl Direction {
    #[inline]
    pub fn all() -> impl Iterator<Item = Direction> {
        (0..DIRECTION_COUNT as u8).map(|i| Direction::try_from(i).unwrap())
    }

    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        DIRECTION_OFFSETS[self as usize]
    }

    #[inline]
    pub const fn is_diagonal(self) -> bool {
        (self as u8) > 3
    }

    #[inline]
    pub fn apply(self, cell: Cell) -> Cell {
        let (dx, dy) = self.offset();
        cell.shifted(dx, dy)
    }

    // The two cardinal cells flanking a diagonal step out of `cell`.
    // Either one being blocked can forbid or penalize the diagonal.
    #[inline]
    pub fn corner_cells(self, cell: Cell) -> Option<(Cell, Cell)> {
        if !self.is_diagonal() {
            return None;
        }
        let (dx, dy) = self.offset();
        Some((cell.shifted(dx, 0), cell.shifted(0, dy)))
    }
}

// ----------------------------------------------
// CellRange
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellRange {
    // Inclusive range, e.g.: [start..=end]
    pub start: Cell,
    pub end: Cell,
}

impl CellRange {
    #[inline]
    pub const fn new(start: Cell, end: Cell) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn single_cell(cell: Cell) -> Self {
        Self { start: cell, end: cell }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.end.is_valid() &&
        self.start.x <= self.end.x && self.start.y <= self.end.y
    }

    #[inline]
    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn x_range(&self) -> RangeInclusive<i32> {
        self.start.x..=self.end.x
    }

    #[inline]
    pub fn y_range(&self) -> RangeInclusive<i32> {
        self.start.y..=self.end.y
    }

    #[inline]
    pub fn expanded_by(&self, amount: i32) -> CellRange {
        Self {
            start: Cell::new(self.start.x - amount, self.start.y - amount),
            end: Cell::new(self.end.x + amount, self.end.y + amount),
        }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        if cell.x < self.start.x || cell.y < self.start.y {
            return false;
        }
        if cell.x > self.end.x || cell.y > self.end.y {
            return false;
        }
        true
    }

    #[inline]
    pub fn iter(&self) -> CellRangeIter {
        CellRangeIter::new(*self)
    }
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}; {},{}]",
               self.start.x,
               self.start.y,
               self.end.x,
               self.end.y)
    }
}

// ----------------------------------------------
// CellRangeIter
// ----------------------------------------------

#[derive(Copy, Clone)]
pub struct CellRangeIter {
    range:  CellRange,
    curr_y: i32,
    curr_x: i32,
    done:   bool,
}

impl CellRangeIter {
    #[inline]
    pub fn new(range: CellRange) -> Self {
        Self {
            range,
            curr_y: range.start.y,
            curr_x: range.start.x,
            done: false,
        }
    }
}

impl Iterator for CellRangeIter {
    type Item = Cell;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = Cell {
            x: self.curr_x,
            y: self.curr_y,
        };

        // Determine next x,y:
        if self.curr_x < self.range.end.x {
            self.curr_x += 1;
        } else if self.curr_y < self.range.end.y {
            self.curr_y += 1;
            self.curr_x = self.range.start.x;
        } else {
            self.done = true;
        }

        Some(result)
    }
}

// Guarantees next() always stays None after exhaustion.
impl FusedIterator for CellRangeIter {}

// Support for-each style iteration.
impl IntoIterator for &CellRange {
    type Item = Cell;
    type IntoIter = CellRangeIter;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
