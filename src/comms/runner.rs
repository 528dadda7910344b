use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};

use miette::{Context, IntoDiagnostic, miette};
use tracing::{debug, info, warn};

use crate::comms::parser;
use crate::consts::CONTENDERS;
use crate::settings::Settings;
use crate::tuning::scoreboard::Scoreboard;

/// Terminal result of one externally evaluated match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Decisive { winner: usize },
    Drawn,
    /// The game stream ended before the match was decidable. The
    /// current iteration is abandoned; the prior best stays
    /// authoritative.
    Cancelled,
}

/// Seam between the tuning loop and the external match evaluation, so
/// the session driver can be exercised without a subprocess.
pub trait MatchProvider {
    fn run_match(&mut self, iteration: usize) -> miette::Result<MatchOutcome>;
}

/// Drives a cutechess-cli process: one match per call, reading its
/// stdout line stream until the scoreboard is decided or the stream
/// closes.
pub struct CutechessRunner {
    settings: Settings,
    child: Option<Child>,
}

impl CutechessRunner {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            child: None,
        }
    }

    fn build_command(&self) -> Command {
        let s = &self.settings;
        let mut cmd = Command::new(&s.cutechess_cmd);
        cmd.current_dir(&s.engine_dir);

        for idx in 0..CONTENDERS {
            cmd.arg("-engine")
                .arg(format!("name={}", Settings::contender_name(idx)))
                .arg(format!("cmd={}", s.engine_cmd))
                .arg("arg=--weights")
                .arg(format!("arg={}", s.trial_path(idx).display()));
        }

        cmd.arg("-each")
            .arg("proto=uci")
            .arg(format!("tc={}+{}", s.game_time, s.game_increment));
        if let Some(book) = &s.book_path {
            cmd.arg(format!("book={}", book.display()))
                .arg(format!("bookdepth={}", s.book_depth));
        }

        cmd.arg("-concurrency")
            .arg(s.concurrency.to_string())
            .arg("-maxmoves")
            .arg(s.max_moves.to_string())
            .arg("-games")
            .arg("2")
            .arg("-rounds")
            .arg(s.games_per_match.to_string())
            .arg("-ratinginterval")
            .arg("10")
            .arg("-pgnout")
            .arg(s.pgn_out.display().to_string());

        cmd.stdin(Stdio::null()).stdout(Stdio::piped());
        cmd
    }

    /// Idempotent teardown; safe to call on every exit path.
    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => {
                    debug!("Killing match runner process");
                    child.kill().ok();
                }
            }
            child.wait().ok();
        }
    }
}

impl MatchProvider for CutechessRunner {
    fn run_match(&mut self, iteration: usize) -> miette::Result<MatchOutcome> {
        let mut child = self
            .build_command()
            .spawn()
            .into_diagnostic()
            .with_context(|| format!("Spawning {} for match {iteration}", self.settings.cutechess_cmd))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| miette!("Match runner stdout was not captured"))?;
        self.child = Some(child);

        let mut board = Scoreboard::new(CONTENDERS, self.settings.games_total());
        // Blocking line loop; the child's buffering paces us.
        for line in BufReader::new(stdout).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Match runner stream error: {e}");
                    break;
                }
            };
            let Some(game) = parser::parse_game_line(&line) else {
                continue;
            };
            board.record(game.first, game.second, game.outcome);
            debug!(
                "Game {}/{}: {} vs {} -> {:+}",
                board.games_seen(),
                self.settings.games_total(),
                game.first,
                game.second,
                game.outcome
            );

            if board.is_decided() {
                self.kill_child();
                return Ok(outcome_from(&board));
            }
        }

        // Stream closed before the match was decidable.
        self.kill_child();
        if board.is_complete() {
            Ok(outcome_from(&board))
        } else {
            info!(
                "Match runner exited after {}/{} games",
                board.games_seen(),
                self.settings.games_total()
            );
            Ok(MatchOutcome::Cancelled)
        }
    }
}

impl Drop for CutechessRunner {
    fn drop(&mut self) {
        self.kill_child();
    }
}

fn outcome_from(board: &Scoreboard) -> MatchOutcome {
    if board.margin() == 0 {
        MatchOutcome::Drawn
    } else {
        MatchOutcome::Decisive {
            winner: board.winner(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn outcome_maps_margin_to_winner_or_draw() {
        let mut board = Scoreboard::new(2, 4);
        board.record(0, 1, 1);
        board.record(0, 1, 0);
        board.record(0, 1, -1);
        board.record(0, 1, 0);
        assert_eq!(outcome_from(&board), MatchOutcome::Drawn);

        board.record(0, 1, -1);
        assert_eq!(outcome_from(&board), MatchOutcome::Decisive { winner: 1 });
    }

    #[test]
    fn stream_end_without_games_is_cancelled() {
        // `true` exits immediately without printing any game lines
        let settings = Settings {
            cutechess_cmd: "true".to_string(),
            ..Settings::default()
        };
        let mut runner = CutechessRunner::new(settings);
        let outcome = runner.run_match(0).unwrap();
        assert_eq!(outcome, MatchOutcome::Cancelled);
    }

    #[test]
    fn missing_runner_binary_is_an_error() {
        let settings = Settings {
            cutechess_cmd: "/nonexistent/cutechess-cli".to_string(),
            ..Settings::default()
        };
        let mut runner = CutechessRunner::new(settings);
        assert!(runner.run_match(0).is_err());
    }
}
