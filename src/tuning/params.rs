use std::collections::BTreeMap;
use std::{fs, path::Path};

use miette::{Context, IntoDiagnostic};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::*;

fn default_gain() -> f64 {
    1.0
}

fn default_momentum() -> f64 {
    1.0
}

/// One tunable engine coefficient together with its step-size state.
///
/// `value` is kept fractional internally; consumers read it through
/// [`Parameter::rounded`]. Bounds are enforced by clamping on every
/// mutation, never by rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub value: f64,
    pub min_value: f64,
    pub max_value: f64,
    /// Nominal perturbation baseline (the SPSA c0).
    pub max_delta: f64,
    /// Multiplicative step corrector, held in [GAIN_MIN, GAIN_MAX].
    #[serde(default = "default_gain")]
    pub gain: f64,
    /// Perturbation damping scalar in [min_momentum, 1], never zero.
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    /// Signed delta applied in the most recent winning trial.
    #[serde(default)]
    pub last_delta: f64,
    /// Value movement over the previous measurement window.
    #[serde(default)]
    pub progress_prev: f64,
    /// Value movement over the current measurement window.
    #[serde(default)]
    pub progress_curr: f64,
    /// Value recorded at the start of the current measurement window.
    #[serde(default)]
    pub anchor: f64,
}

impl Parameter {
    pub fn new(value: f64, min_value: f64, max_value: f64, max_delta: f64) -> Self {
        let value = value.clamp(min_value, max_value);
        Self {
            value,
            min_value,
            max_value,
            max_delta,
            gain: 1.0,
            momentum: 1.0,
            last_delta: 0.0,
            progress_prev: 0.0,
            progress_curr: 0.0,
            anchor: value,
        }
    }

    /// Derive bounds from a bare default value, matching the historical
    /// tool: step is a tenth of the value (at least 1), range is
    /// [1, 3*value] (at least 10 wide).
    pub fn from_value(value: f64) -> Self {
        let max_delta = (value / 10.0).max(1.0);
        Self::new(value, 1.0, (value * 3.0).max(10.0), max_delta)
    }

    /// Clamping setter; out-of-range values are pulled to the nearer bound.
    pub fn set_value(&mut self, value: f64) {
        self.value = value.clamp(self.min_value, self.max_value);
    }

    /// Shift the value by `blend * delta` and remember the attributed delta.
    pub fn nudge(&mut self, delta: f64, blend: f64) {
        self.set_value(self.value + blend * delta);
        self.last_delta = delta;
    }

    /// Integer view the engine consumes.
    pub fn rounded(&self) -> i64 {
        self.value.round() as i64
    }

    /// Multiply gain by a correction factor and re-clamp.
    pub fn apply_gain_correction(&mut self, corr: f64) {
        self.gain = (self.gain * corr).clamp(GAIN_MIN, GAIN_MAX);
    }

    /// Momentum follows the magnitude of the winning delta relative to
    /// the step baseline, floored away from zero so future perturbations
    /// stay non-degenerate.
    pub fn update_momentum(&mut self, winning_delta: f64, min_momentum: f64) {
        let mut ratio = winning_delta / self.max_delta;
        if ratio.abs() <= MOMENTUM_EPS {
            ratio = MOMENTUM_EPS * if ratio < 0.0 { -1.0 } else { 1.0 };
        }
        self.momentum = ratio.abs().clamp(min_momentum, 1.0);
    }

    /// Momentum rounded for the settlement check.
    pub fn settled_momentum(&self) -> f64 {
        let scale = 10f64.powi(SETTLE_DECIMALS);
        (self.momentum.abs() * scale).round() / scale
    }
}

/// Named, ordered collection of [`Parameter`]s: one full engine
/// configuration. Backed by a `BTreeMap` so enumeration order is stable,
/// which round-robin trial indexing relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub params: BTreeMap<String, Parameter>,
}

impl Default for ParameterGroup {
    fn default() -> Self {
        let defaults = [
            ("aw_widen", 65.0),
            ("aw_size", 20.0),
            ("rfp_margin", 100.0),
            ("nmp_r", 3.0),
            ("nmp_depth_coef", 5.0),
            ("efp_margin", 120.0),
            ("lmr_r", 3.0),
            ("lmr_depth_margin", 3.0),
            ("lmr_tried_margin", 8.0),
        ];

        let params = defaults
            .into_iter()
            .map(|(name, value)| (name.to_string(), Parameter::from_value(value)))
            .collect();

        Self { params }
    }
}

impl ParameterGroup {
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Parameter)> {
        self.params.iter()
    }

    /// Name of the parameter at enumeration position `idx` (mod len).
    pub fn name_at(&self, idx: usize) -> Option<&str> {
        if self.params.is_empty() {
            return None;
        }
        self.params
            .keys()
            .nth(idx % self.params.len())
            .map(String::as_str)
    }

    /// Destructive from-scratch reset: every value to 1.
    pub fn one_out(&mut self) {
        for param in self.params.values_mut() {
            param.set_value(1.0);
        }
    }

    /// Save full tuning state (bounds, gain, momentum, progress) for
    /// crash recovery.
    pub fn save_full<P: AsRef<Path>>(&self, path: P) -> miette::Result<()> {
        let doc = toml::to_string_pretty(self).into_diagnostic()?;
        fs::write(&path, doc)
            .into_diagnostic()
            .with_context(|| format!("Writing parameter state to {}", path.as_ref().display()))
    }

    /// Save the minimal value-only export the engine consumes: a flat
    /// `name = <integer>` table.
    pub fn save_raw<P: AsRef<Path>>(&self, path: P) -> miette::Result<()> {
        let raw: BTreeMap<&str, i64> = self
            .params
            .iter()
            .map(|(name, param)| (name.as_str(), param.rounded()))
            .collect();
        let doc = toml::to_string_pretty(&raw).into_diagnostic()?;
        fs::write(&path, doc)
            .into_diagnostic()
            .with_context(|| format!("Writing raw weights to {}", path.as_ref().display()))
    }

    /// Read-or-create-default. A missing file initializes defaults; a
    /// malformed file warns and falls back to defaults rather than
    /// aborting the session. A raw value-only document is merged onto
    /// the default bounds.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                info!(
                    "No parameter file at {}, starting from defaults",
                    path.display()
                );
                return Self::default();
            }
        };

        if let Ok(group) = toml::from_str::<Self>(&content) {
            return group;
        }

        // Raw export: flat name -> value table.
        if let Ok(raw) = toml::from_str::<BTreeMap<String, f64>>(&content) {
            let mut group = Self::default();
            for (name, value) in raw {
                if let Some(param) = group.get_mut(&name) {
                    param.set_value(value);
                } else {
                    warn!("Ignoring unknown parameter '{name}' in {}", path.display());
                }
            }
            return group;
        }

        warn!(
            "Malformed parameter file {}, falling back to defaults",
            path.display()
        );
        Self::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_value_clamps_to_bounds() {
        let mut param = Parameter::new(3.0, 1.0, 20.0, 1.0);
        param.set_value(25.0);
        assert_eq!(param.value, 20.0);
        param.set_value(-4.0);
        assert_eq!(param.value, 1.0);
        param.set_value(7.3);
        assert_eq!(param.value, 7.3);
    }

    #[test]
    fn derived_bounds_match_historical_rule() {
        let param = Parameter::from_value(65.0);
        assert_eq!(param.max_delta, 6.5);
        assert_eq!(param.min_value, 1.0);
        assert_eq!(param.max_value, 195.0);

        // Small values get the floors
        let small = Parameter::from_value(3.0);
        assert_eq!(small.max_delta, 1.0);
        assert_eq!(small.max_value, 10.0);
    }

    #[test]
    fn gain_correction_stays_bounded() {
        let mut param = Parameter::from_value(10.0);
        for _ in 0..20 {
            param.apply_gain_correction(1.25);
            assert!(param.gain <= GAIN_MAX);
        }
        for _ in 0..40 {
            param.apply_gain_correction(0.8);
            assert!(param.gain >= GAIN_MIN);
        }
    }

    #[test]
    fn momentum_never_zero() {
        let mut param = Parameter::new(3.0, 1.0, 20.0, 1.0);
        param.update_momentum(0.0, 0.05);
        assert!(param.momentum > 0.0);
        assert_eq!(param.momentum, 0.05);

        param.update_momentum(1.0, 0.05);
        assert_eq!(param.momentum, 1.0);

        param.update_momentum(-0.4, 0.05);
        assert_eq!(param.momentum, 0.4);
    }

    #[test]
    fn one_out_resets_all_values() {
        let mut group = ParameterGroup::default();
        group.one_out();
        assert!(group.iter().all(|(_, p)| p.value == 1.0));
    }

    #[test]
    fn name_at_wraps_in_stable_order() {
        let group = ParameterGroup::default();
        let n = group.len();
        assert_eq!(group.name_at(0), group.name_at(n));
        // BTreeMap order: first key alphabetically
        assert_eq!(group.name_at(0), Some("aw_size"));
    }

    #[test]
    fn full_round_trip_preserves_state() {
        let dir = std::env::temp_dir().join(format!("matchtuner-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("full.toml");

        let mut group = ParameterGroup::default();
        group.get_mut("lmr_r").unwrap().set_value(4.0);
        group.get_mut("lmr_r").unwrap().momentum = 0.25;
        group.get_mut("lmr_r").unwrap().gain = 1.1;

        group.save_full(&path).unwrap();
        let loaded = ParameterGroup::load_or_default(&path);
        assert_eq!(group, loaded);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn raw_document_merges_onto_default_bounds() {
        let dir = std::env::temp_dir().join(format!("matchtuner-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("raw.toml");

        let mut group = ParameterGroup::default();
        group.get_mut("nmp_r").unwrap().set_value(4.0);
        group.save_raw(&path).unwrap();

        let loaded = ParameterGroup::load_or_default(&path);
        assert_eq!(loaded.get("nmp_r").unwrap().value, 4.0);
        // Bounds come from the defaults, not the raw file
        assert_eq!(
            loaded.get("nmp_r").unwrap().max_value,
            ParameterGroup::default().get("nmp_r").unwrap().max_value
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let loaded = ParameterGroup::load_or_default("/nonexistent/matchtuner/weights.toml");
        assert_eq!(loaded, ParameterGroup::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = std::env::temp_dir().join(format!("matchtuner-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("garbage.toml");
        std::fs::write(&path, "= not toml at all [").unwrap();

        let loaded = ParameterGroup::load_or_default(&path);
        assert_eq!(loaded, ParameterGroup::default());

        std::fs::remove_file(&path).ok();
    }
}
