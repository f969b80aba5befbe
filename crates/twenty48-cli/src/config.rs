use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
pub enum StrategyKind {
    /// Uniformly random legal move.
    Random,
    /// Legal move with the largest immediate score delta; ties go to the earlier direction.
    Greedy,
    /// Fixed preference order that keeps big tiles in the bottom-left corner.
    Corner,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Strategy {
    #[serde(rename = "strategy")]
    pub kind: StrategyKind,
}

impl Default for Strategy {
    fn default() -> Self {
        Self { kind: StrategyKind::Greedy }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Config {
    pub num_games: u32,
    #[serde(default)]
    pub base_seed: u64,
    /// Worker threads for self-play; 0 lets rayon decide.
    #[serde(default)]
    pub max_concurrent_games: usize,
    /// Stop a game after this many accepted moves.
    #[serde(default = "defaults::max_moves")]
    pub max_moves: u64,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub report: Report,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, Default)]
pub struct Report {
    /// JSON-lines file receiving one summary per finished game.
    #[serde(default)]
    pub results_file: Option<PathBuf>,
    /// Directory receiving one replayable record per game.
    #[serde(default)]
    pub records_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.num_games == 0 {
            bail!("num_games must be at least 1");
        }
        if self.max_moves == 0 {
            bail!("max_moves must be at least 1");
        }
        Ok(())
    }
}

mod defaults {
    pub fn max_moves() -> u64 { 100_000 }
}
