use rand::Rng;
use rand::rngs::StdRng;
use twenty48_engine::{Direction, Grid};

use crate::config;

/// Corner play: keep tiles packed down and left, only go up as a last resort.
const CORNER_ORDER: [Direction; 4] = [
    Direction::Down,
    Direction::Left,
    Direction::Right,
    Direction::Up,
];

fn select_move_random(legal: &[bool; 4], rng: &mut StdRng) -> Option<Direction> {
    let candidates: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|d| legal[d.index()])
        .collect();
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.gen_range(0..candidates.len())])
}

fn select_move_greedy(grid: &Grid, legal: &[bool; 4]) -> Option<Direction> {
    let mut best: Option<(Direction, u64)> = None;
    for d in Direction::ALL {
        if !legal[d.index()] { continue; }
        let (_, outcome) = grid.shift(d);
        if best.is_none_or(|(_, s)| outcome.score_delta > s) {
            best = Some((d, outcome.score_delta));
        }
    }
    best.map(|(d, _)| d)
}

fn select_move_corner(legal: &[bool; 4]) -> Option<Direction> {
    CORNER_ORDER.into_iter().find(|d| legal[d.index()])
}

/// Pick the next move for `grid`, or `None` when no direction is legal.
pub(crate) fn select_move(
    grid: &Grid,
    strategy: &config::Strategy,
    rng: &mut StdRng,
) -> Option<Direction> {
    let legal = grid.legal_moves();
    match strategy.kind {
        config::StrategyKind::Random => select_move_random(&legal, rng),
        config::StrategyKind::Greedy => select_move_greedy(grid, &legal),
        config::StrategyKind::Corner => select_move_corner(&legal),
    }
}
