use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLogEventKind {
    BatchStarted,
    StakeResolved,
    FractionClamped,
    DegenerateSizing,
    WorkerFinished,
    BatchCancelled,
    BatchSummarized,
    ReportWritten,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLogEvent {
    pub batch_id: u64,
    pub kind: RunLogEventKind,
    pub paths_completed: Option<u64>,
}

impl RunLogEvent {
    pub fn new(batch_id: u64, kind: RunLogEventKind, paths_completed: Option<u64>) -> Self {
        Self {
            batch_id,
            kind,
            paths_completed,
        }
    }
}

pub trait RunLogWriter {
    fn write(&mut self, event: RunLogEvent);
}

#[derive(Debug, Default)]
pub struct InMemoryRunLogWriter {
    events: Vec<RunLogEvent>,
}

impl InMemoryRunLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunLogEvent] {
        &self.events
    }

    pub fn kinds(&self) -> Vec<RunLogEventKind> {
        self.events.iter().map(|event| event.kind).collect()
    }
}

impl RunLogWriter for InMemoryRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        self.events.push(event);
    }
}

/// Forwards run-log events to the installed `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLogWriter;

impl RunLogWriter for TracingRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        match event.kind {
            RunLogEventKind::FractionClamped
            | RunLogEventKind::DegenerateSizing
            | RunLogEventKind::BatchCancelled => tracing::warn!(
                batch_id = event.batch_id,
                kind = ?event.kind,
                paths_completed = event.paths_completed,
                "run log"
            ),
            RunLogEventKind::WorkerFinished => tracing::debug!(
                batch_id = event.batch_id,
                kind = ?event.kind,
                paths_completed = event.paths_completed,
                "run log"
            ),
            _ => tracing::info!(
                batch_id = event.batch_id,
                kind = ?event.kind,
                paths_completed = event.paths_completed,
                "run log"
            ),
        }
    }
}
