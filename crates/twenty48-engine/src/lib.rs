//! Pure game engine for the 4x4 sliding-tile merge puzzle.
//!
//! The engine owns no global state: a [`GameState`] is created by
//! [`engine::new_game`] and handed back to the caller, who drives it with
//! moves and an injected [`TileSource`]. Rendering, input handling and
//! best-score persistence belong to whatever sits on top of this crate.

pub mod engine;
pub mod error;

pub use engine::{
    Direction, GameState, Grid, Merge, MoveOutcome, Pos, RecordingSource, ScriptedTiles, Spawn,
    TileMotion, TileSource, Turn,
};
pub use error::EngineError;
