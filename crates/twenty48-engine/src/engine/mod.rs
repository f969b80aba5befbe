//! 4x4 grid state, move resolution and tile spawning.
//!
//! `GameState` holds one game and is owned by the caller. Every operation is
//! also exported as a free function taking the state (or a bare `Grid` for
//! `shift`, `is_game_over` and `legal_moves`). Randomness only enters through
//! a `TileSource`.

mod ops;
mod source;
pub mod state;

pub use source::{RecordingSource, ScriptedTiles, TileSource};
pub use state::{
    Direction, GameState, Grid, Merge, MoveOutcome, Pos, SIZE, Spawn, TileMotion, Turn,
};

pub use ops::{apply_move, is_game_over, legal_moves, new_game, shift, spawn_random_tile, step};
