mod config;
mod recorder;
mod selfplay;
mod strategies;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use twenty48_engine::{Direction, GameState};

use config::Config;
use recorder::GameRecord;
use selfplay::SelfplayOptions;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Headless driver for the 2048 grid engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play a scripted move sequence from a seeded start
    Play {
        /// Seed for the tile RNG
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Moves as words ("up,left down") or letters ("ULDR")
        #[arg(long, value_name = "SEQ")]
        moves: String,
        /// Print the grid after every turn
        #[arg(long)]
        show: bool,
    },
    /// Run a batch of seeded self-play games
    Selfplay {
        /// Path to configuration file
        #[arg(long, value_name = "FILE", value_parser = clap::value_parser!(PathBuf))]
        config: PathBuf,
        /// JSON-lines results file (overrides report.results_file)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Directory for replayable game records (overrides report.records_dir)
        #[arg(long, value_name = "DIR")]
        records: Option<PathBuf>,
    },
    /// Verify a recorded game by replaying it
    Replay {
        /// Game record written by `selfplay --records`
        #[arg(long, value_name = "FILE")]
        record: PathBuf,
    },
}

#[derive(Serialize)]
struct PlaySummary {
    seed: u64,
    moves: u64,
    score: u64,
    highest_tile: u32,
    over: bool,
}

fn parse_moves(seq: &str) -> Result<Vec<Direction>> {
    let words: Vec<&str> = seq
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    let letters = words.len() == 1 && words[0].chars().all(|c| "UDLRudlr".contains(c));
    let tokens: Vec<String> = if letters {
        words[0].chars().map(String::from).collect()
    } else {
        words.into_iter().map(String::from).collect()
    };
    tokens
        .iter()
        .enumerate()
        .map(|(i, t)| t.parse::<Direction>().with_context(|| format!("move #{i}")))
        .collect()
}

fn play(seed: u64, moves: &str, show: bool) -> Result<()> {
    let dirs = parse_moves(moves)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut game = GameState::new(&mut rng);
    if show {
        println!("{}", game.grid());
    }
    for dir in dirs {
        let turn = game.step(dir, &mut rng)?;
        info!(
            "{dir}: changed={} +{} score={}",
            turn.outcome.changed,
            turn.outcome.score_delta,
            game.score()
        );
        if show && turn.outcome.changed {
            println!("{}", game.grid());
        }
        if turn.over {
            info!("Game over");
            break;
        }
    }
    if !show {
        println!("{}", game.grid());
    }
    let summary = PlaySummary {
        seed,
        moves: game.moves(),
        score: game.score(),
        highest_tile: game.grid().highest_tile(),
        over: game.is_over(),
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match cli.command {
        Command::Play { seed, moves, show } => play(seed, &moves, show),
        Command::Selfplay { config, out, records } => {
            info!("Using configuration file: {}", config.display());
            let cfg = Config::from_toml(&config)?;
            let options = SelfplayOptions {
                results_file: out,
                records_dir: records,
            };
            selfplay::run_selfplay(&cfg, options)?;
            Ok(())
        }
        Command::Replay { record } => {
            let rec = GameRecord::load(&record)?;
            let game = rec
                .replay()
                .with_context(|| format!("replay of {} failed", record.display()))?;
            info!(
                "Replay OK: seed {}, {} moves, score {}, over={}",
                rec.seed,
                game.moves(),
                game.score(),
                game.is_over()
            );
            Ok(())
        }
    }
}
