pub mod engine;
pub mod logging;
pub mod metrics;
pub mod report;

pub use engine::{BatchEngine, CancellationToken, EngineError, EngineOutput};
pub use logging::{
    InMemoryRunLogWriter, RunLogEvent, RunLogEventKind, RunLogWriter, TracingRunLogWriter,
};
pub use report::{HistoryCsvWriter, PathCsvWriter, ReportError, SummaryDocument};

/// Path throughput the benches report against, for 1_000-trial paths.
pub const TARGET_PATHS_PER_SEC: u64 = 10_000;
