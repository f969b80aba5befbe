use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ops;
use super::source::TileSource;
use crate::error::EngineError;

/// Side length of the grid. Fixed for the lifetime of a game.
pub const SIZE: usize = 4;

pub(crate) type Cells = [[u32; SIZE]; SIZE];

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions in index order (Up, Down, Left, Right).
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Position of this direction in [`Direction::ALL`] and in legal-move masks.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Single-letter form used by compact move strings (`U`, `D`, `L`, `R`).
    #[inline]
    pub fn letter(self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

impl FromStr for Direction {
    type Err = EngineError;

    /// Accepts `up`/`u`/`arrowup` and friends, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" | "arrowup" => Ok(Direction::Up),
            "down" | "d" | "arrowdown" => Ok(Direction::Down),
            "left" | "l" | "arrowleft" => Ok(Direction::Left),
            "right" | "r" | "arrowright" => Ok(Direction::Right),
            _ => Err(EngineError::InvalidDirection(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = EngineError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Direction::ALL
            .get(v as usize)
            .copied()
            .ok_or_else(|| EngineError::InvalidDirection(v.to_string()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// A cell coordinate; `row` 0 is the top edge, `col` 0 the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Pos { row, col }
    }
}

/// 4x4 grid of face values. `0` is an empty cell, anything else is a power of two >= 2.
///
/// Grids built from outside data go through [`Grid::from_rows`] (and serde uses the
/// same check), so a `Grid` always upholds the power-of-two invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "[[u32; 4]; 4]", into = "[[u32; 4]; 4]")]
pub struct Grid(pub(crate) Cells);

impl Grid {
    /// A constant empty grid (all zeros).
    pub const EMPTY: Grid = Grid([[0; SIZE]; SIZE]);

    /// Largest tile a grid may hold: the biggest one a game started from an empty
    /// 4x4 board can produce.
    pub const MAX_TILE: u32 = 1 << 17;

    /// Build a grid from row-major values, rejecting tiles that are not powers of two
    /// or exceed [`Grid::MAX_TILE`].
    ///
    /// ```
    /// use twenty48_engine::{EngineError, Grid};
    /// let g = Grid::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap();
    /// assert_eq!(g.count_tiles(), 2);
    /// assert!(matches!(
    ///     Grid::from_rows([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]]),
    ///     Err(EngineError::InvalidTile { row: 0, col: 0, value: 3 })
    /// ));
    /// assert!(Grid::from_rows([[0; 4], [0; 4], [0; 4], [0, 0, 0, 1 << 18]]).is_err());
    /// ```
    pub fn from_rows(rows: Cells) -> Result<Self, EngineError> {
        for (row, line) in rows.iter().enumerate() {
            for (col, &value) in line.iter().enumerate() {
                let valid = value.is_power_of_two() && (2..=Self::MAX_TILE).contains(&value);
                if value != 0 && !valid {
                    return Err(EngineError::InvalidTile { row, col, value });
                }
            }
        }
        Ok(Grid(rows))
    }

    /// Borrow the row-major cell values.
    #[inline]
    pub fn rows(&self) -> &Cells {
        &self.0
    }

    /// Value at `pos` (0 if empty).
    #[inline]
    pub fn get(&self, pos: Pos) -> u32 {
        self.0[pos.row][pos.col]
    }

    #[inline]
    pub(crate) fn set(&mut self, pos: Pos, value: u32) {
        self.0[pos.row][pos.col] = value;
    }

    /// Iterate over `(pos, value)` for every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Pos, u32)> + '_ {
        self.0.iter().enumerate().flat_map(|(row, line)| {
            line.iter()
                .enumerate()
                .map(move |(col, &value)| (Pos::new(row, col), value))
        })
    }

    /// Positions of all empty cells, row-major.
    pub fn empty_cells(&self) -> Vec<Pos> {
        self.cells()
            .filter(|&(_, value)| value == 0)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Count the number of empty cells.
    pub fn count_empty(&self) -> usize {
        self.cells().filter(|&(_, value)| value == 0).count()
    }

    /// Count the number of occupied cells.
    pub fn count_tiles(&self) -> usize {
        SIZE * SIZE - self.count_empty()
    }

    /// Sum of all face values on the grid.
    pub fn sum(&self) -> u64 {
        self.cells().map(|(_, value)| u64::from(value)).sum()
    }

    /// Return the highest tile value (e.g., 2048) present, or 0 on an empty grid.
    pub fn highest_tile(&self) -> u32 {
        self.cells().map(|(_, value)| value).max().unwrap_or(0)
    }

    /// Return the grid resulting from sliding/merging in `dir`, with the move's diff.
    ///
    /// ```
    /// use twenty48_engine::{Direction, Grid};
    /// let g = Grid::from_rows([[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// let (next, outcome) = g.shift(Direction::Left);
    /// assert_eq!(next.rows()[0], [4, 4, 0, 0]);
    /// assert_eq!(outcome.score_delta, 4);
    /// assert!(outcome.changed);
    /// ```
    #[inline]
    pub fn shift(&self, dir: Direction) -> (Grid, MoveOutcome) {
        ops::shift(self, dir)
    }

    /// True when the grid is full and no two neighbours share a value.
    #[inline]
    pub fn is_game_over(&self) -> bool {
        ops::is_game_over(self)
    }

    /// Which directions would change the grid, indexed like [`Direction::ALL`].
    #[inline]
    pub fn legal_moves(&self) -> [bool; 4] {
        ops::legal_moves(self)
    }
}

impl TryFrom<Cells> for Grid {
    type Error = EngineError;

    fn try_from(rows: Cells) -> Result<Self, Self::Error> {
        Grid::from_rows(rows)
    }
}

impl From<Grid> for Cells {
    fn from(g: Grid) -> Self {
        g.0
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f, "{}", "-".repeat(31))?;
            }
            let cells: Vec<String> = line.iter().map(|&v| ops::format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

/// One tile's travel during a move. Stationary tiles appear with `from == to`;
/// both halves of a merge point at the merged cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMotion {
    pub from: Pos,
    pub to: Pos,
    /// Face value before the move.
    pub value: u32,
}

/// A tile produced by a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merge {
    pub at: Pos,
    /// Face value after the merge; also its contribution to the score.
    pub value: u32,
}

/// Result of resolving a single move.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// True iff at least one cell differs from the grid before the move.
    pub changed: bool,
    /// Sum of all values created by merges during this move.
    pub score_delta: u64,
    pub motions: Vec<TileMotion>,
    pub merges: Vec<Merge>,
}

/// A freshly spawned tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spawn {
    pub pos: Pos,
    pub value: u32,
}

/// A full turn: the move, the follow-up spawn (if the move changed the grid)
/// and whether the game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub outcome: MoveOutcome,
    pub spawned: Option<Spawn>,
    pub over: bool,
}

/// A single game: grid, running score and the terminal flag.
///
/// The caller owns the value; nothing inside the engine keeps a reference to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) grid: Grid,
    pub(crate) score: u64,
    pub(crate) moves: u64,
    pub(crate) over: bool,
}

impl GameState {
    /// Start a new game with two tiles drawn from `source`.
    ///
    /// Deterministic example using a seeded RNG:
    /// ```
    /// use twenty48_engine::GameState;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let game = GameState::new(&mut rng);
    /// assert_eq!(game.grid().count_tiles(), 2);
    /// assert_eq!(game.score(), 0);
    /// ```
    pub fn new<S: TileSource + ?Sized>(source: &mut S) -> Self {
        ops::new_game(source)
    }

    /// Resume from an existing grid and score. A dead grid starts out over.
    pub fn from_grid(grid: Grid, score: u64) -> Self {
        GameState {
            grid,
            score,
            moves: 0,
            over: ops::is_game_over(&grid),
        }
    }

    pub(crate) fn blank() -> Self {
        GameState {
            grid: Grid::EMPTY,
            score: 0,
            moves: 0,
            over: false,
        }
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Number of moves that changed the grid since the game started.
    #[inline]
    pub fn moves(&self) -> u64 {
        self.moves
    }

    /// True once the game reached its terminal state.
    #[inline]
    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Slide and merge in `direction`, adding the merge score. Never spawns.
    #[inline]
    pub fn apply_move(&mut self, direction: Direction) -> Result<MoveOutcome, EngineError> {
        ops::apply_move(self, direction)
    }

    /// Place a 2 (90%) or 4 (10%) on a random empty cell; `None` on a full grid.
    /// Ends the game when the new tile leaves no move.
    #[inline]
    pub fn spawn_random_tile<S: TileSource + ?Sized>(&mut self, source: &mut S) -> Option<Spawn> {
        ops::spawn_random_tile(self, source)
    }

    /// Evaluate the game-over rule against the current grid.
    #[inline]
    pub fn is_game_over(&self) -> bool {
        ops::is_game_over(&self.grid)
    }

    /// Move, spawn if the grid changed, then update the over flag.
    ///
    /// ```
    /// use twenty48_engine::{Direction, GameState};
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let mut game = GameState::new(&mut rng);
    /// let turn = game.step(Direction::Up, &mut rng).unwrap();
    /// assert_eq!(turn.spawned.is_some(), turn.outcome.changed);
    /// ```
    #[inline]
    pub fn step<S: TileSource + ?Sized>(
        &mut self,
        direction: Direction,
        source: &mut S,
    ) -> Result<Turn, EngineError> {
        ops::step(self, direction, source)
    }

    #[inline]
    pub fn legal_moves(&self) -> [bool; 4] {
        ops::legal_moves(&self.grid)
    }
}
