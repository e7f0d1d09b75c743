use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use core_sim::{simulate_paths, BatchOutput, BatchRequest, PathResult, SimError, StakePlan};
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

use crate::logging::{RunLogEvent, RunLogEventKind, RunLogWriter};
use crate::metrics::ThroughputReport;

/// Batch-level stop flag, observed by workers between paths.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("batch worker failed: {0}")]
    Worker(#[from] JoinError),
    #[error("batch cancelled before any path completed")]
    CancelledBeforeFirstPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub batch_id: u64,
    pub requested_paths: u64,
    /// Set when cancellation stopped the batch short; the summary then covers
    /// only the completed paths.
    pub cancelled: bool,
    pub output: BatchOutput,
    pub throughput: ThroughputReport,
}

/// Runs the paths of a batch on blocking worker tasks. Worker `w` of `n` takes
/// path indices `w, w + n, w + 2n, ...`.
#[derive(Debug)]
pub struct BatchEngine {
    workers: usize,
    next_batch_id: AtomicU64,
}

impl BatchEngine {
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        if workers == 0 {
            return Err(EngineError::NoWorkers);
        }

        Ok(Self {
            workers,
            next_batch_id: AtomicU64::new(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn run(
        &self,
        request: BatchRequest,
        cancel: &CancellationToken,
        log: &mut dyn RunLogWriter,
    ) -> Result<EngineOutput, EngineError> {
        let batch_id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        log.write(RunLogEvent::new(batch_id, RunLogEventKind::BatchStarted, None));

        let plan = request.resolve_stake()?;
        log.write(RunLogEvent::new(batch_id, RunLogEventKind::StakeResolved, None));
        if plan.was_clamped() {
            log.write(RunLogEvent::new(batch_id, RunLogEventKind::FractionClamped, None));
        }
        if plan.degenerate {
            log.write(RunLogEvent::new(batch_id, RunLogEventKind::DegenerateSizing, None));
        }
        tracing::info!(
            batch_id,
            num_paths = request.num_paths(),
            workers = self.workers,
            stake = ?plan.stake,
            "batch started"
        );

        let workers = (self.workers as u64).min(request.num_paths());
        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let token = cancel.clone();
            let stake = plan.stake;
            tasks.spawn_blocking(move || {
                let stripe = (worker..request.num_paths())
                    .step_by(workers as usize)
                    .take_while(move |_| !token.is_cancelled());
                simulate_paths(&request, stake, stripe)
            });
        }

        let mut results = Vec::with_capacity(request.num_paths() as usize);
        while let Some(joined) = tasks.join_next().await {
            let worker_results = joined?;
            log.write(RunLogEvent::new(
                batch_id,
                RunLogEventKind::WorkerFinished,
                Some(worker_results.len() as u64),
            ));
            results.extend(worker_results);
        }

        summarize(batch_id, &request, plan, results, started, log)
    }
}

fn summarize(
    batch_id: u64,
    request: &BatchRequest,
    plan: StakePlan,
    results: Vec<PathResult>,
    started: Instant,
    log: &mut dyn RunLogWriter,
) -> Result<EngineOutput, EngineError> {
    let completed = results.len() as u64;
    if completed == 0 {
        log.write(RunLogEvent::new(batch_id, RunLogEventKind::BatchCancelled, Some(0)));
        return Err(EngineError::CancelledBeforeFirstPath);
    }

    let cancelled = completed < request.num_paths();
    if cancelled {
        tracing::warn!(
            batch_id,
            completed,
            requested = request.num_paths(),
            "batch cancelled, summarizing completed paths"
        );
        log.write(RunLogEvent::new(
            batch_id,
            RunLogEventKind::BatchCancelled,
            Some(completed),
        ));
    }

    let trials = results.iter().map(|result| result.trial_count).sum();
    let throughput = ThroughputReport::new(completed, trials, started.elapsed());
    let output = BatchOutput::assemble(plan, results, request.retain_histories())?;
    log.write(RunLogEvent::new(
        batch_id,
        RunLogEventKind::BatchSummarized,
        Some(completed),
    ));
    tracing::info!(
        batch_id,
        ruin_count = output.summary.ruin_count,
        ruin_probability = output.summary.ruin_probability,
        "batch summarized"
    );

    Ok(EngineOutput {
        batch_id,
        requested_paths: request.num_paths(),
        cancelled,
        output,
        throughput,
    })
}
