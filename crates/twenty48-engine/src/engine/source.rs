use std::collections::VecDeque;

use log::warn;
use rand::Rng;

use super::state::{Pos, Spawn};

/// Where new tiles come from.
///
/// Every [`rand::Rng`] is a `TileSource`: it picks an empty cell uniformly and
/// a value of 2 (90%) or 4 (10%). Seed the generator for reproducible games.
pub trait TileSource {
    /// Choose the next spawn given the grid's empty cells (row-major, non-empty).
    /// Returning `None` leaves the grid untouched.
    fn choose(&mut self, empty: &[Pos]) -> Option<Spawn>;
}

impl<R: Rng + ?Sized> TileSource for R {
    fn choose(&mut self, empty: &[Pos]) -> Option<Spawn> {
        if empty.is_empty() {
            return None;
        }
        let pos = empty[self.gen_range(0..empty.len())];
        Some(Spawn {
            pos,
            value: generate_random_tile(self),
        })
    }
}

pub(crate) fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen_range(0..10) < 9 { 2 } else { 4 }
}

/// Replays a fixed list of spawns, in order.
///
/// A scripted spawn that targets an occupied cell, or carries a value other
/// than 2 or 4, is dropped and counted in [`ScriptedTiles::rejected`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedTiles {
    spawns: VecDeque<Spawn>,
    rejected: usize,
}

impl ScriptedTiles {
    pub fn new<I: IntoIterator<Item = Spawn>>(spawns: I) -> Self {
        ScriptedTiles {
            spawns: spawns.into_iter().collect(),
            rejected: 0,
        }
    }

    /// Spawns not yet consumed.
    pub fn remaining(&self) -> usize {
        self.spawns.len()
    }

    /// Spawns that could not be placed.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl TileSource for ScriptedTiles {
    fn choose(&mut self, empty: &[Pos]) -> Option<Spawn> {
        let spawn = self.spawns.pop_front()?;
        if matches!(spawn.value, 2 | 4) && empty.contains(&spawn.pos) {
            Some(spawn)
        } else {
            warn!(
                "scripted spawn {} at ({}, {}) does not fit the grid",
                spawn.value, spawn.pos.row, spawn.pos.col
            );
            self.rejected += 1;
            None
        }
    }
}

/// Wraps another source and keeps a log of every spawn it produced.
#[derive(Debug)]
pub struct RecordingSource<S> {
    inner: S,
    log: Vec<Spawn>,
}

impl<S: TileSource> RecordingSource<S> {
    pub fn new(inner: S) -> Self {
        RecordingSource {
            inner,
            log: Vec::new(),
        }
    }

    /// Borrow the wrapped source, e.g. to share one RNG between spawns and move choice.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn spawns(&self) -> &[Spawn] {
        &self.log
    }

    /// Consume the wrapper, returning the inner source and the spawn log.
    pub fn into_parts(self) -> (S, Vec<Spawn>) {
        (self.inner, self.log)
    }
}

impl<S: TileSource> TileSource for RecordingSource<S> {
    fn choose(&mut self, empty: &[Pos]) -> Option<Spawn> {
        let spawn = self.inner.choose(empty)?;
        self.log.push(spawn);
        Some(spawn)
    }
}
