use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use twenty48_engine::{Direction, GameState, Grid, ScriptedTiles, Spawn};

/// Summary for a completed game, written as one JSON line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub game: u32,
    pub seed: u64,
    pub moves: u64,
    pub score: u64,
    pub highest_tile: u32,
    pub over: bool,
}

/// Everything needed to replay a game without its RNG.
///
/// `spawns` starts with the two initial tiles, followed by one entry per
/// accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub seed: u64,
    pub moves: Vec<Direction>,
    pub spawns: Vec<Spawn>,
    pub final_grid: Grid,
    pub final_score: u64,
}

impl GameRecord {
    /// File name used inside a records directory.
    pub fn file_name(game: u32) -> String {
        format!("game-{game:06}.json")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse record {}", path.display()))
    }

    /// Re-run the recorded moves against the recorded spawns and check that the
    /// game ends exactly where the record says it did.
    pub fn replay(&self) -> Result<GameState> {
        let mut tiles = ScriptedTiles::new(self.spawns.iter().copied());
        let mut game = GameState::new(&mut tiles);
        for (i, &dir) in self.moves.iter().enumerate() {
            game.step(dir, &mut tiles)
                .with_context(|| format!("move {i} ({dir}) was rejected"))?;
        }
        if tiles.rejected() > 0 {
            bail!("{} recorded spawn(s) did not fit the replayed grid", tiles.rejected());
        }
        if tiles.remaining() > 0 {
            bail!("{} recorded spawn(s) were never used", tiles.remaining());
        }
        if *game.grid() != self.final_grid {
            bail!(
                "replayed grid differs from the record:\n{}\nexpected:\n{}",
                game.grid(),
                self.final_grid
            );
        }
        if game.score() != self.final_score {
            bail!(
                "replayed score {} differs from recorded {}",
                game.score(),
                self.final_score
            );
        }
        Ok(game)
    }
}

/// Appends run summaries as JSON lines.
pub struct ResultsWriter {
    out: Box<dyn Write + Send>,
}

impl ResultsWriter {
    /// Write to `path`, creating parent directories; `None` means stdout.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let out: Box<dyn Write + Send> = match path {
            Some(p) => {
                if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                let file = File::create(p)
                    .with_context(|| format!("failed to create {}", p.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(std::io::stdout()),
        };
        Ok(Self { out })
    }

    pub fn write(&mut self, summary: &RunSummary) -> Result<()> {
        let line = serde_json::to_string(summary)?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Make sure a records directory exists and return it.
pub fn prepare_records_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;
    use twenty48_engine::RecordingSource;

    fn record_game(seed: u64, dirs: &[Direction]) -> GameRecord {
        let mut source = RecordingSource::new(StdRng::seed_from_u64(seed));
        let mut game = GameState::new(&mut source);
        let mut moves = Vec::new();
        for &d in dirs {
            match game.step(d, &mut source) {
                Ok(turn) if turn.outcome.changed => moves.push(d),
                Ok(_) => {}
                Err(_) => break,
            }
        }
        let (_, spawns) = source.into_parts();
        GameRecord {
            seed,
            moves,
            spawns,
            final_grid: *game.grid(),
            final_score: game.score(),
        }
    }

    #[test]
    fn record_roundtrip_and_replay() {
        let dirs = [Direction::Left, Direction::Down, Direction::Right, Direction::Down];
        let record = record_game(11, &dirs.repeat(10));
        let dir = tempdir().unwrap();
        let path = dir.path().join(GameRecord::file_name(3));
        record.save(&path).unwrap();
        assert!(path.ends_with("game-000003.json"));

        let loaded = GameRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
        let game = loaded.replay().unwrap();
        assert_eq!(game.score(), record.final_score);
    }

    #[test]
    fn tampered_record_fails_replay() {
        let dirs = [Direction::Up, Direction::Left];
        let mut record = record_game(5, &dirs.repeat(8));
        record.final_score += 4;
        assert!(record.replay().is_err());

        let mut record = record_game(5, &dirs.repeat(8));
        record.spawns.push(record.spawns[0]);
        assert!(record.replay().is_err());
    }

    #[test]
    fn results_writer_emits_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/results.jsonl");
        let mut writer = ResultsWriter::new(Some(path.as_path())).unwrap();
        let summary = RunSummary {
            game: 0,
            seed: 9,
            moves: 120,
            score: 1500,
            highest_tile: 128,
            over: true,
        };
        writer.write(&summary).unwrap();
        writer.write(&RunSummary { game: 1, ..summary }).unwrap();
        writer.finish().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let rows: Vec<RunSummary> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].game, 1);
        assert_eq!(rows[0], summary);
    }
}
