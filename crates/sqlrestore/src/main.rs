use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sqlrestore_core::{
    ArmClient, ProgressCallback, ProgressEvent, RestoreWorkflow, Settings, WorkflowOutcome,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod error;

use cli::{Cli, Commands, RunArgs};
use error::{CliError, Result};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Faults end the run but not the process
    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "sqlrestore stopped");
        e.print_diagnostic();
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "sqlrestore=info,sqlrestore_core=info",
            1 => "sqlrestore=debug,sqlrestore_core=debug",
            _ => "sqlrestore=trace,sqlrestore_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli) -> Result<()> {
    trace!("Executing command: {:?}", cli.command);
    let settings = load_settings(cli)?;

    match &cli.command {
        Commands::Run(args) => run(args, settings).await,
        Commands::ShowConfig => show_config(cli, &settings),
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let settings = if let Some(config_file) = &cli.config_file {
        let path = PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        Settings::load_from_path(&path)?
    } else {
        debug!("Loading config from default location");
        Settings::load()?
    };
    Ok(settings)
}

fn show_config(cli: &Cli, settings: &Settings) -> Result<()> {
    let path = match &cli.config_file {
        Some(path) => PathBuf::from(path),
        None => Settings::config_path()?,
    };
    println!("# {}", path.display());
    print!("{}", settings.to_toml_string()?);
    Ok(())
}

async fn run(args: &RunArgs, mut settings: Settings) -> Result<()> {
    if let Some(region) = &args.region {
        settings.workflow.region = region.clone();
    }
    settings.validate()?;

    let credentials = args.credentials.resolve()?;
    info!(
        subscription = %credentials.subscription_id,
        region = %settings.workflow.region,
        "Starting the restore walkthrough"
    );

    let client = ArmClient::new(credentials, settings.client.clone())?;
    let mut workflow = RestoreWorkflow::new(client, settings.workflow);

    let spinner = if args.no_progress {
        None
    } else {
        Some(new_spinner()?)
    };
    if let Some(pb) = &spinner {
        workflow = workflow.with_progress(spinner_callback(pb.clone()));
    }

    let result = workflow.run().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let outcome = result?;
    match outcome {
        WorkflowOutcome::Completed => info!("All restores succeeded and the resources are gone"),
        _ => info!(%outcome, "Walkthrough ended early"),
    }
    println!("{outcome}");
    Ok(())
}

fn new_spinner() -> anyhow::Result<ProgressBar> {
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed_precise}]")
        .context("invalid spinner template")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    Ok(pb)
}

/// Drive the spinner from polling progress
fn spinner_callback(pb: ProgressBar) -> ProgressCallback {
    Box::new(move |event: ProgressEvent| match &event {
        ProgressEvent::Started { what, max_attempts } => {
            pb.reset_elapsed();
            pb.enable_steady_tick(Duration::from_millis(120));
            pb.set_message(format!("Waiting for {what} (up to {max_attempts} checks)"));
        }
        ProgressEvent::Polling {
            what,
            attempt,
            max_attempts,
        } => {
            pb.set_message(format!("Waiting for {what}: check {attempt}/{max_attempts}"));
        }
        ProgressEvent::Satisfied { what, attempts } => {
            pb.disable_steady_tick();
            pb.set_message(format!("{what} available after {attempts} checks"));
        }
        ProgressEvent::Exhausted { what, attempts } => {
            pb.disable_steady_tick();
            pb.set_message(format!("No {what} after {attempts} checks"));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_callback_handles_every_event() {
        let pb = ProgressBar::hidden();
        let callback = spinner_callback(pb.clone());

        callback(ProgressEvent::Started {
            what: "restore point".to_string(),
            max_attempts: 50,
        });
        callback(ProgressEvent::Polling {
            what: "restore point".to_string(),
            attempt: 1,
            max_attempts: 50,
        });
        assert_eq!(pb.message(), "Waiting for restore point: check 1/50");

        callback(ProgressEvent::Satisfied {
            what: "restore point".to_string(),
            attempts: 2,
        });
        assert_eq!(pb.message(), "restore point available after 2 checks");
    }

    #[test]
    fn test_cli_error_from_anyhow_keeps_context() {
        let err: CliError = anyhow::anyhow!("inner").context("outer").into();
        assert!(err.to_string().contains("outer: inner"));
    }
}
