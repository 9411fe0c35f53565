mod cli;

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use distiller_core::{record, BatchReport, ItemOutput, Step};
use distiller_engine::{AtomicFileWriter, Pipeline, ResultRecord};
use engine_logging::{engine_error, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    engine_logging::initialize(cli.log_destination(), cli.log_level());

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs every item in order and prints the JSON outputs.
/// Returns `false` when the batch was aborted by a failing item.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let items = cli.load_items()?;
    let mode = cli.batch_mode();
    let writer = cli
        .out_dir
        .as_ref()
        .map(AtomicFileWriter::create)
        .transpose()
        .context("preparing output directory")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_warn!("Interrupted; cancelling in-flight request");
            on_interrupt.cancel();
        }
    });

    let pipeline = Pipeline::default();
    let mut report: BatchReport<ResultRecord> = BatchReport::default();
    let total = items.len();
    for (index, params) in items.into_iter().enumerate() {
        if cancel.is_cancelled() {
            anyhow::bail!("interrupted after {index} of {total} items");
        }
        engine_info!("[{}/{}] {}", index + 1, total, params.url);

        let result = match params.into_request() {
            Ok(request) => pipeline.run(&request, &cancel).await,
            Err(err) => Err(err),
        };
        if let (Ok(output), Some(writer)) = (&result, &writer) {
            writer
                .write_record(output)
                .with_context(|| format!("writing Markdown for {}", output.url))?;
        }

        match record(report, mode, index, result) {
            Step::Continue(next) => report = next,
            Step::Abort {
                report: partial,
                index,
                error,
            } => {
                print_outputs(partial.outputs())?;
                engine_error!("Stopping at item {}: {}", index + 1, error);
                eprintln!("Error: item {} failed: {error}", index + 1);
                return Ok(false);
            }
        }
    }

    engine_info!(
        "Finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    print_outputs(report.outputs())?;
    Ok(true)
}

fn print_outputs(outputs: &[ItemOutput<ResultRecord>]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(outputs).context("serializing results")?;
    println!("{json}");
    Ok(())
}
