//! Process boundary of the exporters
//!
//! Loads configuration, initializes logging, wires the source and sink
//! together and turns the outcome into an exit status.

use std::num::NonZeroU64;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::error::{ArgumentError, Result};
use crate::export::{
    CsvSink, ExportDriver, ExportResult, IsisSource, MongoSink, ProgressTracker, RecordSink,
    RecordSource,
};

use super::{CsvCli, MongoCli, RunArgs, parse_args};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// 128 + SIGINT
pub const EXIT_CANCELLED: i32 = 130;

/// Parse the process arguments, printing help or errors and exiting on failure
pub fn parse_or_exit<C: Parser>() -> C {
    match parse_args::<C, _, _>(std::env::args_os()) {
        Ok(cli) => cli,
        Err(ArgumentError::Help(text)) => {
            print!("{text}");
            std::process::exit(EXIT_SUCCESS);
        }
        Err(e) => {
            eprint!("{e}");
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Initialize logging system based on verbosity flags and configuration
///
/// `RUST_LOG` takes precedence over both. Calling this twice keeps the first
/// subscriber.
pub fn initialize_logging(run: &RunArgs, config: &LoggingConfig) {
    let level = if run.verbose {
        Level::DEBUG
    } else if run.quiet {
        Level::WARN
    } else {
        config.level.to_tracing_level()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = if config.timestamps {
        subscriber.try_init()
    } else {
        subscriber.without_time().try_init()
    };
}

/// Cancellation token triggered by Ctrl+C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, stopping after the current record");
                trigger.cancel();
            }
            Err(err) => {
                warn!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    });

    token
}

/// Load configuration and start logging
fn prepare(run: &RunArgs) -> Result<Config> {
    let config = Config::load(run.config_file.as_deref())?;
    initialize_logging(run, &config.logging);
    Ok(config)
}

/// Export a master file to CSV as described by `cli`
pub async fn export_csv(cli: &CsvCli, cancel: CancellationToken) -> Result<ExportResult> {
    prepare(&cli.run)?;
    let source_options = cli.source_options()?;
    let mut sink_options = cli.sink_options()?;

    let source = IsisSource::open(source_options)?;
    if let Some(names) = source.selected_names() {
        sink_options.columns = names;
    }
    let sink = CsvSink::create(sink_options).await?;
    drive(source, sink, &cli.run, cancel).await
}

/// Export a master file to MongoDB as described by `cli`
pub async fn export_mongo(cli: &MongoCli, cancel: CancellationToken) -> Result<ExportResult> {
    let config = prepare(&cli.run)?;
    let source_options = cli.source_options()?;
    let sink_options = cli.sink_options();
    let target = sink_options.namespace();

    let source = IsisSource::open(source_options)?;
    let sink = MongoSink::connect(sink_options, &config.mongo).await?;
    info!("Connected, writing to {}", target);
    drive(source, sink, &cli.run, cancel).await
}

async fn drive(
    source: impl RecordSource + 'static,
    sink: impl RecordSink + 'static,
    run: &RunArgs,
    cancel: CancellationToken,
) -> Result<ExportResult> {
    let tracker = ProgressTracker::new(run.tell.and_then(NonZeroU64::new), run.progress);
    let mut driver =
        ExportDriver::new(Box::new(source), Box::new(sink), tracker).with_cancellation(cancel);
    driver.export().await
}

/// Report the outcome of a run and map it to an exit status
pub fn exit_code(outcome: Result<ExportResult>) -> i32 {
    match outcome {
        Ok(result) if result.cancelled => {
            eprintln!(
                "Export cancelled after {} documents",
                result.documents_exported
            );
            EXIT_CANCELLED
        }
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_argument() {
                eprintln!("For more information, try '--help'.");
            }
            EXIT_FAILURE
        }
    }
}
