use thiserror::Error;

/// Errors surfaced by the engine to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Direction input outside `up`, `down`, `left`, `right`.
    #[error("invalid direction: {0:?}")]
    InvalidDirection(String),
    /// A grid value that is neither empty nor a power of two in `2..=Grid::MAX_TILE`.
    #[error("invalid tile {value} at row {row}, col {col}")]
    InvalidTile { row: usize, col: usize, value: u32 },
    /// The game has ended; only a new game accepts moves again.
    #[error("game is over")]
    GameOver,
}
