use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vaultbackup_core::{
    BackupConfig, BackupOutcome, CredentialSource, HttpExchange, ProgressCallback,
    ReqwestExchange, run_backup,
};

mod cli;
mod error;
mod output;

use cli::Cli;

/// Exit code for any error that stopped the run
const EXIT_ERROR: u8 = 1;

/// Exit code when the backup operation itself reported `Failed`.
/// 2 is left to clap for usage errors.
const EXIT_OPERATION_FAILED: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    match execute(&cli).await {
        Ok(outcome) => {
            println!("{}", output::format_summary(&outcome));
            if outcome.is_reported_failure() {
                ExitCode::from(EXIT_OPERATION_FAILED)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            e.print_diagnostic();
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "vaultbackup=warn,vaultbackup_core=warn",
            1 => "vaultbackup=info,vaultbackup_core=info",
            2 => "vaultbackup=debug,vaultbackup_core=debug",
            _ => "vaultbackup=trace,vaultbackup_core=trace",
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

async fn execute(cli: &Cli) -> error::Result<BackupOutcome> {
    // Resolve everything before touching the network
    let config = BackupConfig::from_lookup(|key| cli.setting(key))?;
    let options = cli.poll_options();
    debug!(?options, "Poll options");

    let exchange: Arc<dyn HttpExchange> = Arc::new(ReqwestExchange::new()?);
    let credential = CredentialSource::from_env().into_provider(exchange.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    let progress: ProgressCallback = Box::new(output::print_event);
    let start = std::time::Instant::now();

    let outcome = run_backup(
        exchange.as_ref(),
        credential.as_ref(),
        &config,
        &options,
        &cancel,
        Some(&progress),
    )
    .await?;

    info!(
        trigger_status = outcome.trigger_status(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Backup run finished"
    );
    Ok(outcome)
}
