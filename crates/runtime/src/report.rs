use std::io::{self, Write};

use core_sim::{AggregateRow, BatchSummary, PathRow, StakePlan};
use serde::Serialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::engine::EngineOutput;
use crate::logging::{RunLogEvent, RunLogEventKind, RunLogWriter};
use crate::metrics::ThroughputReport;

pub const PATH_CSV_HEADER: &str = "path,mean_log_wealth,std_log_wealth,slope_log_wealth,time_to_ruin,peak_wealth,min_wealth,final_wealth,ruined,trial_count\n";

pub const HISTORY_CSV_HEADER: &str = "path,trial,wealth\n";

/// Label in the `path` column of the aggregate row.
pub const AGGREGATE_ROW_LABEL: &str = "all";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("summary encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Per-path table: one row per path, then one aggregate row.
pub struct PathCsvWriter<W: Write> {
    writer: W,
}

impl<W: Write> PathCsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(PATH_CSV_HEADER.as_bytes())
    }

    pub fn append_rows(&mut self, rows: &[PathRow]) -> io::Result<()> {
        for row in rows {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{}",
                row.path,
                optional(row.mean_log_wealth),
                optional(row.std_log_wealth),
                optional(row.slope_log_wealth),
                optional(row.time_to_ruin),
                row.peak_wealth,
                row.min_wealth,
                row.final_wealth,
                row.ruined,
                row.trial_count,
            )?;
        }
        Ok(())
    }

    pub fn append_aggregate(&mut self, aggregate: &AggregateRow) -> io::Result<()> {
        writeln!(
            self.writer,
            "{AGGREGATE_ROW_LABEL},{},{},{},{},{},{},{},{},{}",
            optional(aggregate.mean_log_wealth),
            optional(aggregate.std_log_wealth),
            optional(aggregate.slope_log_wealth),
            optional(aggregate.time_to_ruin),
            aggregate.peak_wealth,
            aggregate.min_wealth,
            aggregate.final_wealth,
            aggregate.ruined,
            aggregate.trial_count,
        )
    }

    /// Writes the whole table and flushes before logging `ReportWritten`.
    pub fn write_summary_and_log(
        &mut self,
        batch_id: u64,
        summary: &BatchSummary,
        run_log_writer: &mut dyn RunLogWriter,
    ) -> io::Result<()> {
        self.write_header()?;
        self.append_rows(&summary.paths)?;
        self.append_aggregate(&summary.aggregate_row())?;
        self.writer.flush()?;
        run_log_writer.write(RunLogEvent::new(
            batch_id,
            RunLogEventKind::ReportWritten,
            Some(summary.num_paths),
        ));
        Ok(())
    }
}

/// Long-format wealth histories for plotting.
pub struct HistoryCsvWriter<W: Write> {
    writer: W,
}

impl<W: Write> HistoryCsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_histories(&mut self, paths: &[PathRow], histories: &[Vec<f64>]) -> io::Result<()> {
        self.writer.write_all(HISTORY_CSV_HEADER.as_bytes())?;
        for (row, history) in paths.iter().zip(histories) {
            for (trial, wealth) in history.iter().enumerate() {
                writeln!(self.writer, "{},{trial},{wealth}", row.path)?;
            }
        }
        self.writer.flush()
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct SummaryDocument<'a> {
    pub generated_at: String,
    pub batch_id: u64,
    pub requested_paths: u64,
    pub cancelled: bool,
    pub plan: &'a StakePlan,
    pub summary: &'a BatchSummary,
    pub throughput: &'a ThroughputReport,
}

impl<'a> SummaryDocument<'a> {
    pub fn from_output(output: &'a EngineOutput) -> Result<Self, ReportError> {
        Self::at(output, OffsetDateTime::now_utc())
    }

    pub fn at(output: &'a EngineOutput, generated_at: OffsetDateTime) -> Result<Self, ReportError> {
        Ok(Self {
            generated_at: generated_at.format(&Rfc3339)?,
            batch_id: output.batch_id,
            requested_paths: output.requested_paths,
            cancelled: output.cancelled,
            plan: &output.output.plan,
            summary: &output.output.summary,
            throughput: &output.throughput,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
