use std::time::Duration;

use core_sim::percentile_nearest_rank;
use serde::Serialize;

pub fn calculate_per_sec(processed: u64, elapsed_nanos: u128) -> u64 {
    if elapsed_nanos == 0 {
        return 0;
    }

    let scaled = (processed as u128).saturating_mul(1_000_000_000);
    let achieved = scaled / elapsed_nanos;
    u64::try_from(achieved).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThroughputReport {
    pub paths: u64,
    pub trials: u64,
    pub elapsed_nanos: u128,
    pub paths_per_sec: u64,
    pub trials_per_sec: u64,
}

impl ThroughputReport {
    pub fn new(paths: u64, trials: u64, elapsed: Duration) -> Self {
        let elapsed_nanos = elapsed.as_nanos();
        Self {
            paths,
            trials,
            elapsed_nanos,
            paths_per_sec: calculate_per_sec(paths, elapsed_nanos),
            trials_per_sec: calculate_per_sec(trials, elapsed_nanos),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyPercentiles {
    pub count: usize,
    pub p50_nanos: u64,
    pub p90_nanos: u64,
    pub p95_nanos: u64,
    pub p99_nanos: u64,
    pub max_nanos: u64,
}

/// Wall-clock cost of single paths.
#[derive(Debug, Default, Clone)]
pub struct PathLatencyMetrics {
    latencies_nanos: Vec<u64>,
}

impl PathLatencyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_latency_nanos(&mut self, latency_nanos: u64) {
        self.latencies_nanos.push(latency_nanos);
    }

    pub fn percentiles(&self) -> Option<LatencyPercentiles> {
        if self.latencies_nanos.is_empty() {
            return None;
        }

        let mut sorted = self.latencies_nanos.clone();
        sorted.sort_unstable();
        let count = sorted.len();

        Some(LatencyPercentiles {
            count,
            p50_nanos: percentile_nearest_rank(&sorted, 50),
            p90_nanos: percentile_nearest_rank(&sorted, 90),
            p95_nanos: percentile_nearest_rank(&sorted, 95),
            p99_nanos: percentile_nearest_rank(&sorted, 99),
            max_nanos: sorted[count - 1],
        })
    }
}
