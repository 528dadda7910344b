use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tuning::params::ParameterGroup;
use crate::utils::prng::Prng;

/// Which parameters a single iteration perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerturbationMode {
    /// One parameter per iteration, cycling through the set by index.
    #[default]
    RoundRobin,
    /// Every parameter at once, one independent sign each.
    FullVector,
}

/// A candidate configuration derived from the current best, tagged with
/// the signed (pre-clamp) delta applied to each perturbed parameter so
/// the outcome can be attributed back to a magnitude of change.
#[derive(Debug, Clone)]
pub struct Trial {
    pub group: ParameterGroup,
    pub deltas: BTreeMap<String, f64>,
}

/// Produces mirrored trial pairs from the current best configuration.
pub struct TrialGenerator {
    mode: PerturbationMode,
    rng: Prng,
}

impl TrialGenerator {
    pub fn new(mode: PerturbationMode, rng: Prng) -> Self {
        Self { mode, rng }
    }

    /// Perturbation envelope over the session: 1.0 at the first
    /// iteration, a single maximum at the midpoint, decaying toward
    /// zero at the end. Never negative.
    pub fn schedule(iteration: usize, total: usize) -> f64 {
        let n = total.max(1) as f64;
        let i = iteration as f64;
        (2.0 * i / n).exp() * (n - i) / n
    }

    /// Derive the antithetic pair for `iteration` of `total`. Trial A
    /// takes `value + s*c`, trial B takes `value - s*c`, both clamped;
    /// the unclamped deltas ride along in the tags.
    pub fn generate(
        &mut self,
        base: &ParameterGroup,
        iteration: usize,
        total: usize,
    ) -> (Trial, Trial) {
        let mut plus = Trial {
            group: base.clone(),
            deltas: BTreeMap::new(),
        };
        let mut minus = Trial {
            group: base.clone(),
            deltas: BTreeMap::new(),
        };

        let names: Vec<String> = match self.mode {
            PerturbationMode::RoundRobin => base
                .name_at(iteration)
                .map(|n| vec![n.to_string()])
                .unwrap_or_default(),
            PerturbationMode::FullVector => base.iter().map(|(n, _)| n.clone()).collect(),
        };

        let envelope = Self::schedule(iteration, total);
        for name in names {
            let sign = self.rng.pm_one();
            let param = base.get(&name).expect("name taken from base enumeration");
            let delta = sign * param.max_delta * param.gain * param.momentum * envelope;
            debug!("Perturbing {name} by {delta:+.4} (envelope {envelope:.4})");

            let up = plus.group.get_mut(&name).expect("trial cloned from base");
            up.set_value(param.value + delta);
            plus.deltas.insert(name.clone(), delta);

            let down = minus.group.get_mut(&name).expect("trial cloned from base");
            down.set_value(param.value - delta);
            minus.deltas.insert(name, -delta);
        }

        (plus, minus)
    }
}
