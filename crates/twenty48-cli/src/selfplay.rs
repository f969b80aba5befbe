use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use twenty48_engine::{GameState, RecordingSource};

use crate::config::Config;
use crate::recorder::{GameRecord, ResultsWriter, RunSummary, prepare_records_dir};
use crate::strategies::select_move;

/// Output locations for a self-play session; CLI flags override the config.
#[derive(Clone, Debug, Default)]
pub struct SelfplayOptions {
    pub results_file: Option<PathBuf>,
    pub records_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub games: usize,
    pub finished: usize,
    pub best_score: u64,
    pub mean_score: f64,
    pub highest_tile: u32,
}

/// Play one game to the end (or to `max_moves`) with its own seeded RNG.
///
/// The same RNG drives both the strategy and the spawns, so a seed fully
/// determines the game.
pub fn play_game(game: u32, seed: u64, cfg: &Config) -> (RunSummary, GameRecord) {
    let mut source = RecordingSource::new(StdRng::seed_from_u64(seed));
    let mut state = GameState::new(&mut source);
    let mut moves = Vec::new();
    while !state.is_over() && state.moves() < cfg.max_moves {
        let Some(dir) = select_move(state.grid(), &cfg.strategy, source.inner_mut()) else {
            break;
        };
        match state.step(dir, &mut source) {
            Ok(turn) if turn.outcome.changed => moves.push(dir),
            Ok(_) => {
                warn!("game {game}: strategy picked a no-op move {dir}");
                break;
            }
            Err(e) => {
                warn!("game {game}: {e}");
                break;
            }
        }
    }
    debug!(
        "game {game} (seed {seed}) finished: {} moves, score {}",
        state.moves(),
        state.score()
    );
    let (_, spawns) = source.into_parts();
    let summary = RunSummary {
        game,
        seed,
        moves: state.moves(),
        score: state.score(),
        highest_tile: state.grid().highest_tile(),
        over: state.is_over(),
    };
    let record = GameRecord {
        seed,
        moves,
        spawns,
        final_grid: *state.grid(),
        final_score: state.score(),
    };
    (summary, record)
}

/// Run `cfg.num_games` independent games in parallel and report each one.
pub fn run_selfplay(cfg: &Config, options: SelfplayOptions) -> Result<SessionSummary> {
    let results_file = options.results_file.or_else(|| cfg.report.results_file.clone());
    let records_dir = match options.records_dir.or_else(|| cfg.report.records_dir.clone()) {
        Some(dir) => Some(prepare_records_dir(&dir)?),
        None => None,
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if cfg.max_concurrent_games > 0 {
        builder = builder.num_threads(cfg.max_concurrent_games);
    }
    let pool = builder.build().context("failed to build worker pool")?;

    let pb = ProgressBar::new(cfg.num_games as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} games")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    info!(
        "Self-play: {} games, base seed {}, strategy {:?}",
        cfg.num_games, cfg.base_seed, cfg.strategy.kind
    );

    let results: Vec<Result<RunSummary>> = pool.install(|| {
        (0..cfg.num_games)
            .into_par_iter()
            .map(|game| -> Result<RunSummary> {
                let seed = cfg.base_seed.wrapping_add(u64::from(game));
                let (summary, record) = play_game(game, seed, cfg);
                if let Some(dir) = &records_dir {
                    record.save(&dir.join(GameRecord::file_name(game)))?;
                }
                pb.inc(1);
                Ok(summary)
            })
            .collect()
    });
    pb.finish_and_clear();

    let summaries = results.into_iter().collect::<Result<Vec<_>>>()?;
    let mut writer = ResultsWriter::new(results_file.as_deref())?;
    for summary in &summaries {
        writer.write(summary)?;
    }
    writer.finish()?;

    let session = summarize(&summaries);
    info!(
        "Completed self-play: {} games ({} over), best {}, mean {:.1}, highest tile {}",
        session.games,
        session.finished,
        session.best_score,
        session.mean_score,
        session.highest_tile
    );
    Ok(session)
}

fn summarize(summaries: &[RunSummary]) -> SessionSummary {
    let games = summaries.len();
    let total: u64 = summaries.iter().map(|s| s.score).sum();
    SessionSummary {
        games,
        finished: summaries.iter().filter(|s| s.over).count(),
        best_score: summaries.iter().map(|s| s.score).max().unwrap_or(0),
        mean_score: if games == 0 { 0.0 } else { total as f64 / games as f64 },
        highest_tile: summaries.iter().map(|s| s.highest_tile).max().unwrap_or(0),
    }
}
