use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::*;
use crate::tuning::trial::PerturbationMode;

/// Tuner configuration: where the external collaborators live and the
/// hyperparameters of the tuning loop itself. Loaded read-or-default
/// from TOML; a malformed file warns and falls back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory the engines run in; trial weight files land here too.
    pub engine_dir: PathBuf,
    /// Engine command, resolved relative to `engine_dir`.
    pub engine_cmd: String,
    /// cutechess-cli executable.
    pub cutechess_cmd: String,
    /// Authoritative best-weights document.
    pub best_path: PathBuf,

    /// Base time per game, seconds.
    pub game_time: f64,
    /// Increment per move, seconds.
    pub game_increment: f64,
    /// Rounds per match; cutechess plays each round twice, colors swapped.
    pub games_per_match: usize,
    pub concurrency: usize,
    pub max_moves: usize,
    pub book_path: Option<PathBuf>,
    pub book_depth: usize,
    pub pgn_out: PathBuf,

    /// Iterations between gain-adaptation measurements.
    pub gain_cadence: usize,
    /// Momentum floor; a session settles when every parameter reaches it.
    pub min_momentum: f64,
    /// Blend between adopting the full winning delta (1.0) and a
    /// fractional nudge toward it.
    pub update_blend: f64,
    pub perturbation_mode: PerturbationMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_dir: PathBuf::from("."),
            engine_cmd: "./engine".to_string(),
            cutechess_cmd: "cutechess-cli".to_string(),
            best_path: PathBuf::from("weights.toml"),
            game_time: 3.0,
            game_increment: 0.01,
            games_per_match: DEFAULT_GAMES_PER_MATCH,
            concurrency: 4,
            max_moves: 80,
            book_path: None,
            book_depth: 6,
            pgn_out: PathBuf::from("games.pgn"),
            gain_cadence: DEFAULT_GAIN_CADENCE,
            min_momentum: DEFAULT_MIN_MOMENTUM,
            update_blend: 1.0,
            perturbation_mode: PerturbationMode::default(),
        }
    }
}

impl Settings {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!(
                    "Malformed settings file {} ({e}), using defaults",
                    path.display()
                );
                Self::default()
            }),
            Err(_) => {
                info!("No settings file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Weight file handed to contender `idx` for the current iteration.
    pub fn trial_path(&self, idx: usize) -> PathBuf {
        self.engine_dir.join(format!("trial-{idx}.toml"))
    }

    /// Engine name announced to the match runner; the numeric suffix is
    /// how game lines map back to contender indices.
    pub fn contender_name(idx: usize) -> String {
        format!("tuner-{idx}")
    }

    /// Games per match as the runner counts them (two per round).
    pub fn games_total(&self) -> usize {
        self.games_per_match * 2
    }

    /// Rough wall-clock estimate for a whole session, used for the
    /// start-up banner only.
    pub fn estimated_seconds(&self, matches: usize) -> u64 {
        let per_game = self.game_time * 2.0 + self.game_increment * 120.0;
        let games = (self.games_total() as f64 / self.concurrency.max(1) as f64).ceil();
        (matches as f64 * 1.1 * per_game * games).round() as u64
    }
}
