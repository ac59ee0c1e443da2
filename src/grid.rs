use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Smallest grid edge length that still allows a move.
pub const MIN_SIZE: usize = 2;

/// Edge length of the classic board.
pub const DEFAULT_SIZE: usize = 4;

/// A tile value. `0` is an empty cell, anything else is a power of two.
pub type Value = u32;

/// Largest tile a merge can produce. A pair of these never merges.
pub const MAX_TILE: Value = 1 << 31;

/// Zero-based cell coordinate; `x` is the column, `y` the row (row 0 on top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All directions in canonical order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// Canonical integer code: Up=0, Right=1, Down=2, Left=3.
    #[inline]
    pub fn index(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = GameError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            other => Err(GameError::InvalidDirection(other.to_string())),
        }
    }
}

impl FromStr for Direction {
    type Err = GameError;

    /// Accepts direction names and WASD keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "w" => Ok(Direction::Up),
            "right" | "d" => Ok(Direction::Right),
            "down" | "s" => Ok(Direction::Down),
            "left" | "a" => Ok(Direction::Left),
            _ => Err(GameError::InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        };
        f.write_str(name)
    }
}

/// A cell snapshot: where it is and what it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub position: Position,
    pub value: Value,
}

impl Tile {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value == 0
    }
}

/// Square `size x size` board of tile values stored row-major.
///
/// Tiles are identified by position only. A merge doubles one cell and
/// zeroes another; nothing carries identity across cells.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    size: usize,
    cells: Vec<Value>,
}

impl Grid {
    /// Create an empty grid.
    ///
    /// ```
    /// use matrix_2048::grid::Grid;
    /// let g = Grid::new(4).unwrap();
    /// assert_eq!(g.empty_positions().len(), 16);
    /// assert!(Grid::new(1).is_err());
    /// ```
    pub fn new(size: usize) -> Result<Self, GameError> {
        if size < MIN_SIZE {
            return Err(GameError::InvalidSize(size));
        }
        Ok(Grid { size, cells: vec![0; size * size] })
    }

    /// Build a grid from row-major values. Missing trailing cells are empty,
    /// surplus values are ignored.
    pub fn from_values(size: usize, values: &[Value]) -> Result<Self, GameError> {
        let mut grid = Grid::new(size)?;
        for (dst, &v) in grid.cells.iter_mut().zip(values) {
            *dst = v;
        }
        Ok(grid)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major view of every cell value.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.cells
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Value, GameError> {
        let pos = self.checked(x, y)?;
        Ok(self[pos])
    }

    pub fn set(&mut self, x: usize, y: usize, value: Value) -> Result<(), GameError> {
        let pos = self.checked(x, y)?;
        self[pos] = value;
        Ok(())
    }

    fn checked(&self, x: usize, y: usize) -> Result<Position, GameError> {
        let pos = Position::new(x, y);
        if self.contains(pos) {
            Ok(pos)
        } else {
            Err(GameError::OutOfBounds { x, y, size: self.size })
        }
    }

    #[inline]
    fn offset(&self, pos: Position) -> usize {
        assert!(self.contains(pos), "position {pos} outside {0}x{0} grid", self.size);
        pos.y * self.size + pos.x
    }

    /// The `index`-th line processed when moving in `direction`.
    ///
    /// Index 0 is the line lying on the destination edge, higher indices step
    /// away from it. Moving Up or Down yields rows, Left or Right yields columns.
    /// Cells within a line run left-to-right (rows) or top-to-bottom (columns).
    pub fn line_for(&self, direction: Direction, index: usize) -> Vec<Position> {
        assert!(index < self.size, "line {index} outside {0}x{0} grid", self.size);
        let last = self.size - 1;
        match direction {
            Direction::Up => self.row(index),
            Direction::Right => self.column(last - index),
            Direction::Down => self.row(last - index),
            Direction::Left => self.column(index),
        }
    }

    fn row(&self, y: usize) -> Vec<Position> {
        (0..self.size).map(|x| Position::new(x, y)).collect()
    }

    fn column(&self, x: usize) -> Vec<Position> {
        (0..self.size).map(|y| Position::new(x, y)).collect()
    }

    /// The adjacent position one step in `direction`, if it is on the grid.
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Option<Position> {
        let Position { x, y } = pos;
        let next = match direction {
            Direction::Up => Position::new(x, y.checked_sub(1)?),
            Direction::Right => Position::new(x + 1, y),
            Direction::Down => Position::new(x, y + 1),
            Direction::Left => Position::new(x.checked_sub(1)?, y),
        };
        self.contains(next).then_some(next)
    }

    /// Nearest occupied cell strictly beyond `pos` in `direction`, skipping empties.
    pub fn nearest_occupied(&self, pos: Position, direction: Direction) -> Option<Position> {
        let mut cur = self.neighbor(pos, direction)?;
        while self[cur] == 0 {
            cur = self.neighbor(cur, direction)?;
        }
        Some(cur)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.size).flat_map(move |y| (0..self.size).map(move |x| Position::new(x, y)))
    }

    /// Every cell as a `Tile`, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.positions().map(move |position| Tile { position, value: self[position] })
    }

    pub fn empty_positions(&self) -> Vec<Position> {
        self.positions().filter(|&p| self[p] == 0).collect()
    }

    pub fn occupied_positions(&self) -> Vec<Position> {
        self.positions().filter(|&p| self[p] != 0).collect()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&v| v != 0)
    }

    /// Highest tile value on the grid (0 when empty).
    pub fn highest_tile(&self) -> Value {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Reset every cell to empty.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }
}

impl Index<Position> for Grid {
    type Output = Value;

    #[inline]
    fn index(&self, pos: Position) -> &Value {
        &self.cells[self.offset(pos)]
    }
}

impl IndexMut<Position> for Grid {
    #[inline]
    fn index_mut(&mut self, pos: Position) -> &mut Value {
        let idx = self.offset(pos);
        &mut self.cells[idx]
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid({}x{}, {:?})", self.size, self.size, self.cells)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(self.size * 8 - 1);
        for (y, row) in self.cells.chunks(self.size).enumerate() {
            if y > 0 {
                writeln!(f, "{rule}")?;
            }
            let cells: Vec<String> = row.iter().map(format_val).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

fn format_val(val: &Value) -> String {
    match val {
        0 => " ".repeat(7),
        v => format!("{v:^7}"),
    }
}
