use std::path::PathBuf;

use chrono::Local;
use miette::Context;
use tracing::{info, warn};

use crate::comms::runner::{MatchOutcome, MatchProvider};
use crate::settings::Settings;
use crate::tuning::gain::GainController;
use crate::tuning::params::ParameterGroup;
use crate::tuning::trial::TrialGenerator;
use crate::utils::prng::Prng;

/// Where the driver loop currently stands. `Iterating` is the only
/// non-terminal state; a finished run reports one of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Iterating,
    /// Planned iteration count exhausted.
    Finished,
    /// Every parameter's momentum decayed to the floor before the
    /// iteration budget ran out.
    Settled,
    /// The match runner went away without a decisive outcome.
    Cancelled,
}

/// Final word on a tuning session, suitable for the console summary.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub state: SessionState,
    /// 1-based iteration the session stopped at.
    pub stopped_at: usize,
    /// Last successfully persisted best configuration.
    pub checkpoint: PathBuf,
}

/// The sequential tuning loop: perturb, evaluate externally, fold the
/// winner back in, persist, repeat. One logical writer; nothing here is
/// concurrent.
pub struct TuningSession {
    settings: Settings,
    best: ParameterGroup,
    generator: TrialGenerator,
    controller: GainController,
    max_matches: usize,
    iteration: usize,
    state: SessionState,
}

impl TuningSession {
    /// Load or create the best configuration and stage the session.
    /// `from_scratch` resets every parameter to 1 first; the CLI layer
    /// confirms with the operator before asking for that.
    pub fn new(
        settings: Settings,
        max_matches: usize,
        from_scratch: bool,
        rng: Prng,
    ) -> miette::Result<Self> {
        let mut best = ParameterGroup::load_or_default(&settings.best_path);
        if from_scratch {
            warn!("Tuning from scratch: all parameters reset to 1");
            best.one_out();
        }
        best.save_full(&settings.best_path)
            .context("Persisting initial parameter state")?;

        let generator = TrialGenerator::new(settings.perturbation_mode, rng);
        let controller = GainController::new(settings.gain_cadence, max_matches);

        Ok(Self {
            settings,
            best,
            generator,
            controller,
            max_matches,
            iteration: 0,
            state: SessionState::Iterating,
        })
    }

    pub fn best(&self) -> &ParameterGroup {
        &self.best
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the loop to a terminal state. Blocks on the provider for
    /// every iteration; errors from the provider are process-level
    /// failures and abort the session.
    pub fn run(&mut self, provider: &mut dyn MatchProvider) -> miette::Result<SessionReport> {
        let started = Local::now();
        let estimate = self.settings.estimated_seconds(self.max_matches);
        info!(
            "Starting tuning with {} max matches (estimated {})",
            self.max_matches,
            fmt_hms(estimate as i64)
        );

        for i in 0..self.max_matches {
            self.iteration = i;
            info!("Starting match {} of {}", i + 1, self.max_matches);

            let (plus, minus) = self.generator.generate(&self.best, i, self.max_matches);
            plus.group
                .save_raw(self.settings.trial_path(0))
                .context("Staging trial weights")?;
            minus
                .group
                .save_raw(self.settings.trial_path(1))
                .context("Staging trial weights")?;

            match provider.run_match(i)? {
                MatchOutcome::Cancelled => {
                    warn!(
                        "Match {} cancelled; keeping checkpoint {}",
                        i + 1,
                        self.settings.best_path.display()
                    );
                    self.state = SessionState::Cancelled;
                    break;
                }
                MatchOutcome::Drawn => {
                    info!("Match {} drawn, skipping adjustments", i + 1);
                    continue;
                }
                MatchOutcome::Decisive { winner } => {
                    let trial = if winner == 0 { &plus } else { &minus };
                    info!("Match {} won by contender {winner}", i + 1);

                    for (name, delta) in &trial.deltas {
                        let param = self
                            .best
                            .get_mut(name)
                            .expect("trial deltas only name base parameters");
                        param.nudge(*delta, self.settings.update_blend);
                        param.update_momentum(*delta, self.settings.min_momentum);
                    }

                    // Gain adaptation runs on its own cadence, counted
                    // in 1-based match numbers.
                    for param in self.best.params.values_mut() {
                        self.controller.observe(i + 1, param);
                    }

                    self.best
                        .save_full(&self.settings.best_path)
                        .context("Persisting updated parameter state")?;

                    if self.settled() {
                        info!("All parameters settled at match {}", i + 1);
                        self.state = SessionState::Settled;
                        break;
                    }
                }
            }
        }

        if self.state == SessionState::Iterating {
            self.state = SessionState::Finished;
        }

        let stopped_at = match self.state {
            SessionState::Finished => self.max_matches,
            _ => self.iteration + 1,
        };

        let elapsed = (Local::now() - started).num_seconds();
        info!(
            "Tuning session concluded in {} at iteration {stopped_at}; weights at {}",
            fmt_hms(elapsed),
            self.settings.best_path.display()
        );

        Ok(SessionReport {
            state: self.state,
            stopped_at,
            checkpoint: self.settings.best_path.clone(),
        })
    }

    /// Converged when every parameter's momentum (at the settlement
    /// precision) has decayed to the floor.
    fn settled(&self) -> bool {
        self.best
            .iter()
            .all(|(_, p)| p.settled_momentum() <= self.settings.min_momentum)
    }
}

fn fmt_hms(total_seconds: i64) -> String {
    let s = total_seconds.max(0);
    format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60)
}
