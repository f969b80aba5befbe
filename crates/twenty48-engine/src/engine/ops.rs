use log::{debug, trace};

use super::source::TileSource;
use super::state::{
    Direction, GameState, Grid, Merge, MoveOutcome, Pos, SIZE, Spawn, TileMotion, Turn,
};
use crate::error::EngineError;

/// Start a fresh game: empty grid, zero score, then two spawned tiles.
pub fn new_game<S: TileSource + ?Sized>(source: &mut S) -> GameState {
    let mut state = GameState::blank();
    spawn_random_tile(&mut state, source);
    spawn_random_tile(&mut state, source);
    debug!("new game with {} tiles", state.grid.count_tiles());
    state
}

/// Slide/merge tiles in the given direction. No randomness, no score bookkeeping.
pub fn shift(grid: &Grid, direction: Direction) -> (Grid, MoveOutcome) {
    let mut next = Grid::EMPTY;
    let mut outcome = MoveOutcome::default();
    for line in 0..SIZE {
        let positions = line_positions(direction, line);
        let resolved = resolve_line(positions.map(|pos| grid.get(pos)));
        for (offset, &pos) in positions.iter().enumerate() {
            next.set(pos, resolved.values[offset]);
        }
        for &(from, to) in &resolved.moves {
            outcome.motions.push(TileMotion {
                from: positions[from],
                to: positions[to],
                value: grid.get(positions[from]),
            });
        }
        for (offset, _) in resolved.merged.iter().enumerate().filter(|(_, m)| **m) {
            outcome.merges.push(Merge {
                at: positions[offset],
                value: resolved.values[offset],
            });
        }
        outcome.score_delta += resolved.score;
    }
    outcome.changed = next != *grid;
    (next, outcome)
}

/// Apply a move to the game. The grid and score only change when the move does;
/// an over game refuses every move.
pub fn apply_move(state: &mut GameState, direction: Direction) -> Result<MoveOutcome, EngineError> {
    if !state.over && is_game_over(&state.grid) {
        mark_over(state);
    }
    if state.over {
        return Err(EngineError::GameOver);
    }
    let (next, outcome) = shift(&state.grid, direction);
    if outcome.changed {
        state.grid = next;
        state.score += outcome.score_delta;
        state.moves += 1;
    }
    trace!(
        "move {direction}: changed={} delta={} score={}",
        outcome.changed, outcome.score_delta, state.score
    );
    Ok(outcome)
}

/// Place one new tile on an empty cell. A full grid is left alone.
///
/// Filling the grid without leaving a merge ends the game.
pub fn spawn_random_tile<S: TileSource + ?Sized>(
    state: &mut GameState,
    source: &mut S,
) -> Option<Spawn> {
    let empty = state.grid.empty_cells();
    if empty.is_empty() {
        return None;
    }
    let spawn = source.choose(&empty)?;
    state.grid.set(spawn.pos, spawn.value);
    trace!(
        "spawned {} at ({}, {})",
        spawn.value, spawn.pos.row, spawn.pos.col
    );
    if is_game_over(&state.grid) {
        mark_over(state);
    }
    Some(spawn)
}

fn mark_over(state: &mut GameState) {
    state.over = true;
    debug!(
        "game over after {} moves, score {}",
        state.moves, state.score
    );
}

/// True if the grid is full and no horizontal or vertical neighbours match.
pub fn is_game_over(grid: &Grid) -> bool {
    let cells = grid.rows();
    for row in 0..SIZE {
        for col in 0..SIZE {
            let value = cells[row][col];
            if value == 0 {
                return false;
            }
            if col + 1 < SIZE && value == cells[row][col + 1] {
                return false;
            }
            if row + 1 < SIZE && value == cells[row + 1][col] {
                return false;
            }
        }
    }
    true
}

/// For each direction in [`Direction::ALL`] order, whether it would change the grid.
pub fn legal_moves(grid: &Grid) -> [bool; 4] {
    Direction::ALL.map(|direction| shift(grid, direction).1.changed)
}

/// One full turn: move, spawn if the grid changed, then check for game over.
pub fn step<S: TileSource + ?Sized>(
    state: &mut GameState,
    direction: Direction,
    source: &mut S,
) -> Result<Turn, EngineError> {
    let outcome = apply_move(state, direction)?;
    let mut spawned = None;
    if outcome.changed {
        spawned = spawn_random_tile(state, source);
    }
    Ok(Turn {
        outcome,
        spawned,
        over: state.over,
    })
}

/// Grid positions of one line, ordered from the edge the tiles move toward.
fn line_positions(direction: Direction, line: usize) -> [Pos; SIZE] {
    let mut positions = [Pos::new(0, 0); SIZE];
    for (offset, pos) in positions.iter_mut().enumerate() {
        let far = SIZE - 1 - offset;
        *pos = match direction {
            Direction::Left => Pos::new(line, offset),
            Direction::Right => Pos::new(line, far),
            Direction::Up => Pos::new(offset, line),
            Direction::Down => Pos::new(far, line),
        };
    }
    positions
}

/// A line after the merge and placement passes, in extraction order.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ResolvedLine {
    pub(crate) values: [u32; SIZE],
    pub(crate) score: u64,
    /// `(source offset, destination offset)` for every tile of the line.
    pub(crate) moves: Vec<(usize, usize)>,
    pub(crate) merged: [bool; SIZE],
}

/// Compact a line toward offset 0, merging equal neighbours once per move.
///
/// A merged tile never merges again in the same pass: `[2, 2, 2, 2]` gives
/// `[4, 4, 0, 0]`, not `[8, 0, 0, 0]`.
pub(crate) fn resolve_line(line: [u32; SIZE]) -> ResolvedLine {
    let tiles: Vec<(usize, u32)> = line
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, value)| value != 0)
        .collect();
    let mut out = ResolvedLine::default();
    let mut slot = 0;
    let mut i = 0;
    while i < tiles.len() {
        let (src, value) = tiles[i];
        match tiles.get(i + 1) {
            Some(&(next_src, next_value)) if next_value == value => {
                let merged = value * 2;
                out.values[slot] = merged;
                out.merged[slot] = true;
                out.score += u64::from(merged);
                out.moves.push((src, slot));
                out.moves.push((next_src, slot));
                i += 2;
            }
            _ => {
                out.values[slot] = value;
                out.moves.push((src, slot));
                i += 1;
            }
        }
        slot += 1;
    }
    out
}

pub(crate) fn format_val(val: u32) -> String {
    match val {
        0 => String::from("       "),
        x => format!("{x:^7}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedTiles;

    fn grid(rows: [[u32; 4]; 4]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    fn row_grid(row: [u32; 4]) -> Grid {
        grid([row, [0; 4], [0; 4], [0; 4]])
    }

    #[test]
    fn it_resolve_line() {
        assert_eq!(resolve_line([0, 0, 0, 0]).values, [0, 0, 0, 0]);
        assert_eq!(resolve_line([2, 4, 2, 4]).values, [2, 4, 2, 4]);
        assert_eq!(resolve_line([2, 2, 4, 4]).values, [4, 8, 0, 0]);
        assert_eq!(resolve_line([2, 0, 0, 2]).values, [4, 0, 0, 0]);
        assert_eq!(resolve_line([2, 2, 2, 2]).values, [4, 4, 0, 0]);
        assert_eq!(resolve_line([2, 2, 4, 0]).values, [4, 4, 0, 0]);
        assert_eq!(resolve_line([4, 2, 2, 0]).values, [4, 4, 0, 0]);
        assert_eq!(resolve_line([2, 2, 2, 0]).values, [4, 2, 0, 0]);
    }

    #[test]
    fn it_resolve_line_bookkeeping() {
        let r = resolve_line([2, 2, 2, 2]);
        assert_eq!(r.score, 8);
        assert_eq!(r.merged, [true, true, false, false]);
        assert_eq!(r.moves, vec![(0, 0), (1, 0), (2, 1), (3, 1)]);

        let r = resolve_line([0, 8, 0, 4]);
        assert_eq!(r.score, 0);
        assert_eq!(r.merged, [false; 4]);
        assert_eq!(r.moves, vec![(1, 0), (3, 1)]);
    }

    #[test]
    fn test_shift_left() {
        let (g, o) = shift(&row_grid([2, 2, 4, 0]), Direction::Left);
        assert_eq!(g, row_grid([4, 4, 0, 0]));
        assert_eq!(o.score_delta, 4);
        assert!(o.changed);

        let (g, o) = shift(&row_grid([2, 4, 8, 16]), Direction::Left);
        assert_eq!(g, row_grid([2, 4, 8, 16]));
        assert_eq!(o.score_delta, 0);
        assert!(!o.changed);

        let (g, _) = shift(&row_grid([0, 0, 0, 2]), Direction::Left);
        assert_eq!(g, row_grid([2, 0, 0, 0]));
        let (g, _) = shift(&row_grid([2, 8, 8, 4]), Direction::Left);
        assert_eq!(g, row_grid([2, 16, 4, 0]));
        let (g, _) = shift(&row_grid([2, 0, 0, 4]), Direction::Left);
        assert_eq!(g, row_grid([2, 4, 0, 0]));
    }

    #[test]
    fn test_shift_right() {
        let (g, o) = shift(&row_grid([2, 0, 0, 2]), Direction::Right);
        assert_eq!(g, row_grid([0, 0, 0, 4]));
        assert_eq!(o.score_delta, 4);
        assert!(o.changed);

        let (g, _) = shift(&row_grid([2, 8, 8, 4]), Direction::Right);
        assert_eq!(g, row_grid([0, 2, 16, 4]));
        let (g, _) = shift(&row_grid([0, 2, 2, 2]), Direction::Right);
        assert_eq!(g, row_grid([0, 0, 2, 4]));
        let (g, o) = shift(&row_grid([2, 4, 8, 16]), Direction::Right);
        assert!(!o.changed);
        assert_eq!(g, row_grid([2, 4, 8, 16]));
    }

    #[test]
    fn test_move_left() {
        let game = grid([[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        let (game, _) = shift(&game, Direction::Left);
        assert_eq!(
            game,
            grid([[2, 4, 8, 16], [2, 16, 4, 0], [8, 0, 0, 0], [2, 4, 0, 0]])
        );
    }

    #[test]
    fn test_move_up() {
        let game = grid([[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        let (game, outcome) = shift(&game, Direction::Up);
        assert_eq!(
            game,
            grid([[2, 2, 8, 2], [4, 16, 0, 4], [8, 4, 0, 0], [16, 0, 0, 0]])
        );
        assert_eq!(outcome.score_delta, 24);
        assert_eq!(
            outcome.merges,
            vec![
                Merge { at: Pos::new(1, 1), value: 16 },
                Merge { at: Pos::new(0, 2), value: 8 },
            ]
        );
    }

    #[test]
    fn test_move_right() {
        let game = grid([[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        let (game, _) = shift(&game, Direction::Right);
        assert_eq!(
            game,
            grid([[2, 4, 8, 16], [0, 2, 16, 4], [0, 0, 0, 8], [0, 0, 2, 4]])
        );
    }

    #[test]
    fn test_move_down() {
        let game = grid([[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        let (game, _) = shift(&game, Direction::Down);
        assert_eq!(
            game,
            grid([[2, 0, 0, 0], [4, 2, 0, 0], [8, 16, 0, 2], [16, 4, 8, 4]])
        );
    }

    #[test]
    fn motions_map_back_to_grid_positions() {
        let (_, outcome) = shift(&row_grid([2, 0, 0, 2]), Direction::Right);
        assert_eq!(
            outcome.motions,
            vec![
                TileMotion { from: Pos::new(0, 3), to: Pos::new(0, 3), value: 2 },
                TileMotion { from: Pos::new(0, 0), to: Pos::new(0, 3), value: 2 },
            ]
        );
        assert_eq!(outcome.merges, vec![Merge { at: Pos::new(0, 3), value: 4 }]);
    }

    #[test]
    fn second_identical_move_is_a_no_op() {
        let mut state = GameState::from_grid(row_grid([2, 0, 4, 0]), 0);
        assert!(apply_move(&mut state, Direction::Left).unwrap().changed);
        let again = apply_move(&mut state, Direction::Left).unwrap();
        assert!(!again.changed);
        assert_eq!(again.score_delta, 0);
        assert_eq!(state.moves(), 1);
    }

    #[test]
    fn apply_move_accumulates_score() {
        let mut state = GameState::from_grid(row_grid([2, 2, 4, 4]), 10);
        let outcome = apply_move(&mut state, Direction::Left).unwrap();
        assert_eq!(outcome.score_delta, 12);
        assert_eq!(state.score(), 22);
        assert_eq!(*state.grid(), row_grid([4, 8, 0, 0]));
    }

    #[test]
    fn it_is_game_over() {
        let stuck = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(is_game_over(&stuck));
        assert_eq!(legal_moves(&stuck), [false; 4]);

        let pair = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 4, 8], [4, 2, 8, 2]]);
        assert!(!is_game_over(&pair));

        let vertical = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 8], [4, 2, 4, 8]]);
        assert!(!is_game_over(&vertical));

        let hole = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 0, 4], [4, 2, 4, 2]]);
        assert!(!is_game_over(&hole));
        assert!(!is_game_over(&Grid::EMPTY));
    }

    #[test]
    fn over_state_rejects_moves() {
        let stuck = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut state = GameState::from_grid(stuck, 100);
        assert!(state.is_over());
        assert_eq!(
            apply_move(&mut state, Direction::Up),
            Err(EngineError::GameOver)
        );
    }

    #[test]
    fn separate_calls_reach_the_over_state() {
        let before = grid([[2, 2, 8, 4], [8, 4, 2, 8], [2, 8, 4, 2], [4, 2, 8, 4]]);
        let mut state = GameState::from_grid(before, 0);
        let mut src = ScriptedTiles::new([Spawn { pos: Pos::new(0, 3), value: 2 }]);

        assert!(apply_move(&mut state, Direction::Left).unwrap().changed);
        assert!(!state.is_over());
        assert!(spawn_random_tile(&mut state, &mut src).is_some());
        assert!(state.is_game_over());
        assert!(state.is_over());
        for dir in Direction::ALL {
            assert_eq!(apply_move(&mut state, dir), Err(EngineError::GameOver));
        }
        assert_eq!(state.score(), 4);
        assert_eq!(state.moves(), 1);
    }

    #[test]
    fn dead_grid_is_caught_on_the_next_move() {
        let stuck = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut state = GameState::blank();
        state.grid = stuck;
        assert!(!state.is_over());
        assert_eq!(
            apply_move(&mut state, Direction::Left),
            Err(EngineError::GameOver)
        );
        assert!(state.is_over());
    }

    #[test]
    fn step_spawns_only_after_a_change() {
        let mut src = ScriptedTiles::new([Spawn { pos: Pos::new(3, 3), value: 2 }]);
        let mut state = GameState::from_grid(row_grid([2, 4, 0, 0]), 0);

        let turn = step(&mut state, Direction::Left, &mut src).unwrap();
        assert!(!turn.outcome.changed);
        assert_eq!(turn.spawned, None);
        assert_eq!(src.remaining(), 1);

        let turn = step(&mut state, Direction::Right, &mut src).unwrap();
        assert!(turn.outcome.changed);
        assert_eq!(turn.spawned, Some(Spawn { pos: Pos::new(3, 3), value: 2 }));
        assert_eq!(state.grid().get(Pos::new(3, 3)), 2);
        assert!(!turn.over);
    }

    #[test]
    fn step_ends_the_game() {
        let before = grid([[2, 2, 8, 4], [4, 8, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut state = GameState::from_grid(before, 0);
        let mut src = ScriptedTiles::new([Spawn { pos: Pos::new(0, 3), value: 2 }]);
        let turn = step(&mut state, Direction::Left, &mut src).unwrap();
        // Column 0 ends up with a 4-4 pair, so the game goes on.
        assert!(!turn.over);

        let before = grid([[2, 2, 8, 4], [8, 4, 2, 8], [2, 8, 4, 2], [4, 2, 8, 4]]);
        let mut state = GameState::from_grid(before, 0);
        let mut src = ScriptedTiles::new([Spawn { pos: Pos::new(0, 3), value: 2 }]);
        let turn = step(&mut state, Direction::Left, &mut src).unwrap();
        assert_eq!(
            *state.grid(),
            grid([[4, 8, 4, 2], [8, 4, 2, 8], [2, 8, 4, 2], [4, 2, 8, 4]])
        );
        assert!(turn.over);
        assert!(state.is_over());
        assert_eq!(state.score(), 4);
    }

    #[test]
    fn spawn_fills_the_last_hole() {
        let almost = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 0, 4], [4, 2, 4, 2]]);
        let mut state = GameState::from_grid(almost, 0);
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(9);
        let spawn = spawn_random_tile(&mut state, &mut rng).unwrap();
        assert_eq!(spawn.pos, Pos::new(2, 2));
        assert_eq!(state.grid().count_empty(), 0);
        assert_eq!(spawn_random_tile(&mut state, &mut rng), None);
    }

    #[test]
    fn it_format_val() {
        assert_eq!(format_val(0), "       ");
        assert_eq!(format_val(2), "   2   ");
        assert_eq!(format_val(2048), " 2048  ");
    }
}
