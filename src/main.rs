//! This file defines the crosstab binary entry point.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process::exit;

use tokio::signal;
use tokio_util::sync::CancellationToken;

use crosstab::cli;
use crosstab::error::{cause_chain, CrosstabError};
use crosstab::models::{Response, Table};
use crosstab::render;
use crosstab::stream;
use crosstab::tracing::init_tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    init_tracing();
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));
    let result = tokio::task::spawn_blocking(move || run(&args, cancel))
        .await
        .expect("conversion task panicked");
    match result {
        Ok(records) => tracing::info!(records, "conversion complete"),
        Err(error) => {
            for (depth, message) in cause_chain(&error).iter().enumerate() {
                if depth == 0 {
                    tracing::error!("{message}");
                } else {
                    tracing::error!("caused by: {message}");
                }
            }
            exit(1);
        }
    }
}

/// Convert the configured input document to CSV.
///
/// Returns the number of CSV records written, header included.
fn run(args: &cli::CommandLineArgs, cancel: CancellationToken) -> Result<u64, CrosstabError> {
    let input: Box<dyn Read> = if args.input == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };
    let output: Box<dyn Write> = if args.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(File::create(&args.output)?))
    };
    match args.format {
        cli::Format::Table => {
            let table: Table = serde_json::from_reader(input)?;
            render::write_table_cancellable(&table, output, &cancel)
        }
        cli::Format::Response if args.buffered => {
            let response: Response = serde_json::from_reader(input)?;
            let table = response.into_table()?;
            render::write_table_cancellable(&table, output, &cancel)
        }
        cli::Format::Response => stream::response_to_csv_cancellable(input, output, &cancel),
    }
}

/// Cancellation signal handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and cancel the conversion, which then
/// aborts before its next output record.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, canceling conversion");
    cancel.cancel();
}
