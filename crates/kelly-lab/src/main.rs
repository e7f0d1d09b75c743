mod config;
mod wiring;

use std::error::Error;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use runtime::{
    BatchEngine, CancellationToken, EngineOutput, HistoryCsvWriter, PathCsvWriter, ReportError,
    RunLogWriter, SummaryDocument, TracingRunLogWriter,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let config = config::Config::from_env()?;
    let request = wiring::build_request(&config)?;
    tracing::info!(
        policy = config.policy.as_str(),
        perception = config.perception.as_str(),
        paths = config.paths,
        workers = config.workers,
        "starting kelly lab"
    );

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let engine = BatchEngine::new(config.workers)?;
    let mut log = TracingRunLogWriter;
    let output = engine.run(request, &cancel, &mut log).await?;
    write_reports(&config, &output, &mut log)?;

    let summary = &output.output.summary;
    tracing::info!(
        ruin_probability = summary.ruin_probability,
        ruin_std_error = summary.ruin_std_error,
        mean_final_wealth = summary.final_wealth.mean,
        mean_growth_rate = summary.growth.mean_slope,
        paths_per_sec = output.throughput.paths_per_sec,
        cancelled = output.cancelled,
        "batch complete"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after in-flight paths");
            cancel.cancel();
        }
    });
}

fn write_reports(
    config: &config::Config,
    output: &EngineOutput,
    log: &mut dyn RunLogWriter,
) -> Result<(), ReportError> {
    let summary = &output.output.summary;

    let table = create_output_file(&config.report_output_path)?;
    PathCsvWriter::new(BufWriter::new(table)).write_summary_and_log(
        output.batch_id,
        summary,
        log,
    )?;

    if let Some(histories) = output.output.histories.as_deref() {
        let file = create_output_file(&config.history_output_path)?;
        HistoryCsvWriter::new(BufWriter::new(file)).write_histories(&summary.paths, histories)?;
    }

    let document = SummaryDocument::from_output(output)?.to_json_pretty()?;
    let summary_path = Path::new(&config.summary_output_path);
    create_parent_dir(summary_path)?;
    fs::write(summary_path, document)?;
    Ok(())
}

fn create_output_file(path: &str) -> Result<File, std::io::Error> {
    let output_path = Path::new(path);
    create_parent_dir(output_path)?;
    File::create(output_path)
}

fn create_parent_dir(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
