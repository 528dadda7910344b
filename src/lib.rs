pub mod cli;
pub mod comms;
pub mod prelude;
pub mod settings;
pub mod tuning;
pub mod utils;

pub mod consts {
    /// Lower bound on a parameter's gain after any adaptation step.
    pub const GAIN_MIN: f64 = 0.8;
    /// Upper bound on a parameter's gain after any adaptation step.
    pub const GAIN_MAX: f64 = 1.25;

    /// Below this magnitude a momentum ratio is floored away from zero.
    pub const MOMENTUM_EPS: f64 = 0.01;
    /// Decimal places momentum is rounded to for the settlement check.
    pub const SETTLE_DECIMALS: i32 = 2;

    /// Progress smaller than this makes the autocorrelation ratio undefined.
    pub const PROGRESS_EPS: f64 = 1e-3;
    /// Sentinel for "ratio undefined, skip adaptation".
    pub const RATIO_UNDEFINED: f64 = -1.0;
    /// Ratios at or below this pin the correction to `GAIN_MIN`.
    pub const RATIO_FLOOR: f64 = 1e-6;
    /// Ratios at or above this pin the correction to `GAIN_MAX`.
    pub const RATIO_CEIL: f64 = 0.999_999;

    pub const DEFAULT_MAX_MATCHES: usize = 1000;
    pub const DEFAULT_GAIN_CADENCE: usize = 10;
    pub const DEFAULT_MIN_MOMENTUM: f64 = 0.05;
    pub const DEFAULT_GAMES_PER_MATCH: usize = 8;

    /// Contenders per match: one antithetic trial pair.
    pub const CONTENDERS: usize = 2;
}
