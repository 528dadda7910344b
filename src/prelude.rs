pub use crate::comms::{
    parser::{self, GameLine},
    runner::{CutechessRunner, MatchOutcome, MatchProvider},
};
pub use crate::consts::*;
pub use crate::settings::Settings;
pub use crate::tuning::{
    self,
    gain::GainController,
    params::{Parameter, ParameterGroup},
    scoreboard::Scoreboard,
    session::{SessionReport, SessionState, TuningSession},
    trial::{PerturbationMode, Trial, TrialGenerator},
};
pub use crate::utils::{self, log::*, prng::*};
pub use miette::{self, Context, IntoDiagnostic, Result};
pub use std::fmt::Display;
pub use std::str::FromStr;
pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
