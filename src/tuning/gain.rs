use tracing::{debug, trace};

use crate::consts::*;
use crate::tuning::params::Parameter;

/// Adapts per-parameter gain on a fixed measurement cadence.
///
/// Every `cadence` iterations the controller compares how far a
/// parameter's value moved in the latest window against the previous
/// window. A ratio near 1 means the movement persists (the step size can
/// grow); a ratio near 0 means the parameter is oscillating back (the
/// step size should shrink). The ratio is a heuristic convergence-rate
/// proxy, not a statistical test.
#[derive(Debug, Clone, Copy)]
pub struct GainController {
    cadence: usize,
    total: usize,
}

impl GainController {
    pub fn new(cadence: usize, total: usize) -> Self {
        Self {
            cadence: cadence.max(1),
            total: total.max(1),
        }
    }

    /// Run the cadence step for one parameter. Off-cadence iterations
    /// are a no-op.
    pub fn observe(&self, iteration: usize, param: &mut Parameter) {
        if iteration == 0 || iteration % self.cadence != 0 {
            return;
        }

        if iteration == self.cadence {
            // First window: establish the baseline movement.
            param.progress_prev = (param.value - param.anchor).abs();
            param.anchor = param.value;
            trace!(
                "Gain window bootstrap: progress_prev={:.4}",
                param.progress_prev
            );
            return;
        }

        param.progress_curr = (param.value - param.anchor).abs();

        let ratio = if param.progress_prev > PROGRESS_EPS {
            param.progress_curr / (param.gain * param.progress_prev)
        } else {
            RATIO_UNDEFINED
        };

        let corr = self.correction(ratio);
        param.apply_gain_correction(corr);
        debug!(
            "Gain step: ratio={ratio:.6} corr={corr:.4} gain={:.4}",
            param.gain
        );

        param.progress_prev = param.progress_curr;
        param.anchor = param.value;
    }

    /// Map the autocorrelation ratio to a multiplicative correction.
    fn correction(&self, ratio: f64) -> f64 {
        if ratio < 0.0 {
            // Undefined ratio: leave the gain alone.
            return 1.0;
        }
        if ratio <= RATIO_FLOOR {
            return GAIN_MIN;
        }
        if ratio >= RATIO_CEIL {
            return GAIN_MAX;
        }
        let corr = -2.0 * self.cadence as f64 / (self.total as f64 * ratio.ln());
        corr.clamp(GAIN_MIN, GAIN_MAX)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tuning::params::ParameterGroup;

    fn param() -> Parameter {
        Parameter::new(5.0, -100.0, 100.0, 1.0)
    }

    #[test]
    fn off_cadence_is_a_noop() {
        let controller = GainController::new(10, 100);
        let mut p = param();
        let before = p.clone();
        for i in [0, 1, 3, 9, 11, 15, 21] {
            controller.observe(i, &mut p);
        }
        assert_eq!(p, before);
    }

    #[test]
    fn first_window_only_records_baseline() {
        let controller = GainController::new(10, 100);
        let mut p = param();
        p.anchor = 3.0; // moved +2 since session start

        controller.observe(10, &mut p);
        assert_eq!(p.progress_prev, 2.0);
        assert_eq!(p.anchor, 5.0);
        assert_eq!(p.gain, 1.0);
    }

    #[test]
    fn regressing_parameter_shrinks_gain() {
        let controller = GainController::new(10, 100);
        let mut p = param();
        p.anchor = 3.0;
        controller.observe(10, &mut p);

        // Second window moves half as far: ratio 1/(1*2) = 0.5,
        // corr = clamp(-20 / (100 * ln 0.5)) = clamp(0.2885) = 0.8
        p.set_value(6.0);
        controller.observe(20, &mut p);
        assert!((p.gain - 0.8).abs() < 1e-9);
        assert_eq!(p.progress_prev, 1.0);
        assert_eq!(p.anchor, 6.0);
    }

    #[test]
    fn persistent_movement_grows_gain() {
        let controller = GainController::new(10, 100);
        let mut p = param();
        p.anchor = 3.0;
        controller.observe(10, &mut p);

        // Same movement again: ratio 2/(1*2) = 1.0 >= ceiling, corr 1.25
        p.set_value(7.0);
        controller.observe(20, &mut p);
        assert!((p.gain - 1.25).abs() < 1e-9);
    }

    #[test]
    fn stalled_window_skips_adaptation() {
        let controller = GainController::new(10, 100);
        let mut p = param();
        p.anchor = 5.0; // no movement at all in the first window
        controller.observe(10, &mut p);
        assert_eq!(p.progress_prev, 0.0);

        p.set_value(8.0);
        controller.observe(20, &mut p);
        // progress_prev below threshold -> sentinel -> gain untouched
        assert_eq!(p.gain, 1.0);
        // but the window still rolls forward
        assert_eq!(p.progress_prev, 3.0);
    }

    #[test]
    fn gain_bounded_under_arbitrary_histories() {
        let controller = GainController::new(5, 50);
        let mut group = ParameterGroup::default();
        let mut rng = crate::utils::prng::Prng::init(2024);

        for i in 1..=50 {
            for (_, p) in group.params.iter_mut() {
                let wiggle = (rng.rand() % 7) as f64 - 3.0;
                p.set_value(p.value + wiggle);
                controller.observe(i, p);
                assert!(p.gain >= GAIN_MIN && p.gain <= GAIN_MAX);
            }
        }
    }
}
