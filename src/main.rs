use std::path::PathBuf;

use clap::Parser;
use matchtuner::cli::{Cli, Commands};
use matchtuner::prelude::*;

fn main() -> miette::Result<()> {
    utils::log::init();

    let span = span!(Level::DEBUG, "main");
    let _guard = span.enter();

    let (max_matches, from_scratch, config) = match Cli::parse().command {
        Some(Commands::Tune {
            max_matches,
            from_scratch,
            config,
        }) => (max_matches, from_scratch, config),
        // No subcommand: tune with defaults, the historical behavior
        None => (DEFAULT_MAX_MATCHES, false, PathBuf::from("matchtuner.toml")),
    };

    if from_scratch {
        wait_for_confirmation()?;
    }

    let settings = Settings::load_or_default(&config);
    trace!("Settings: {settings:?}");

    let mut runner = CutechessRunner::new(settings.clone());
    let mut session = TuningSession::new(settings, max_matches, from_scratch, Prng::from_entropy())?;
    let report = session.run(&mut runner)?;

    match report.state {
        SessionState::Cancelled => warn!(
            "Session cancelled at iteration {}; last good weights: {}",
            report.stopped_at,
            report.checkpoint.display()
        ),
        SessionState::Settled => info!(
            "Parameters settled after {} matches; final weights: {}",
            report.stopped_at,
            report.checkpoint.display()
        ),
        _ => info!(
            "Completed {} matches; final weights: {}",
            report.stopped_at,
            report.checkpoint.display()
        ),
    }

    Ok(())
}

/// Resetting weights is destructive; make the operator acknowledge it.
fn wait_for_confirmation() -> miette::Result<()> {
    println!("{}", "=".repeat(30));
    println!(
        "Warning! Tuning from scratch will reset any weights currently in this \
         directory. Make sure you have a backup before continuing."
    );
    println!("{}", "=".repeat(30));
    println!("Press enter to begin tuning (Ctrl-C to abort)");

    let mut line = String::new();
    std::io::stdin().read_line(&mut line).into_diagnostic()?;
    Ok(())
}
