use super::generator::ScaleParameters;
use super::params::ParameterGenerator;
use crate::core::{DriverError, Result};
use crate::engine::{TransactionEngine, TransactionKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, event};

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub clients: usize,
    pub duration: Duration,
    pub seed: u64,
    /// Upper bound on latency samples kept across all clients.
    pub sample_max: usize,
    /// Stop each client after this many transactions, even before `duration`.
    pub max_transactions_per_client: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            clients: 1,
            duration: Duration::from_secs(60),
            seed: 0,
            sample_max: 200_000,
            max_transactions_per_client: None,
        }
    }
}

#[derive(Debug, Default)]
struct KindCounters {
    completed: AtomicU64,
    aborted: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub completed: u64,
    pub aborted: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub elapsed_secs: f64,
    pub transactions: BTreeMap<TransactionKind, KindReport>,
    pub latency_us_p50: u64,
    pub latency_us_p95: u64,
    pub latency_us_p99: u64,
    pub delivery_skip_rate: f64,
    pub delivery_skip_flagged: bool,
}

impl BenchReport {
    pub fn kind(&self, kind: TransactionKind) -> KindReport {
        self.transactions.get(&kind).copied().unwrap_or_default()
    }

    pub fn total_completed(&self) -> u64 {
        self.transactions.values().map(|r| r.completed).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.transactions.values().map(|r| r.failed).sum()
    }

    /// Completed NewOrders per minute.
    pub fn tpm_c(&self) -> f64 {
        self.kind(TransactionKind::NewOrder).completed as f64 * 60.0 / self.elapsed_secs.max(0.001)
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "benchmark results:")?;
        writeln!(f, "  duration_s: {:.2}", self.elapsed_secs)?;
        for (kind, report) in &self.transactions {
            writeln!(
                f,
                "  {:<13} completed={} aborted={} failed={}",
                kind.name(),
                report.completed,
                report.aborted,
                report.failed
            )?;
        }
        writeln!(f, "  tpm_c: {:.2}", self.tpm_c())?;
        writeln!(f, "  latency_us_p50: {}", self.latency_us_p50)?;
        writeln!(f, "  latency_us_p95: {}", self.latency_us_p95)?;
        writeln!(f, "  latency_us_p99: {}", self.latency_us_p99)?;
        write!(
            f,
            "  delivery_skip_rate: {:.4}{}",
            self.delivery_skip_rate,
            if self.delivery_skip_flagged { " (above threshold)" } else { "" }
        )
    }
}

/// Runs the transaction mix from `config.clients` concurrent tasks.
pub async fn run_benchmark(
    engine: Arc<TransactionEngine>,
    scale: ScaleParameters,
    config: BenchConfig,
) -> Result<BenchReport> {
    let clients = config.clients.max(1);
    let counters: Arc<[KindCounters; 5]> = Arc::new(Default::default());
    let per_task_sample = (config.sample_max / clients).max(1);

    #[cfg(feature = "pprof")]
    let pprof_guard = maybe_start_pprof();

    let start = Instant::now();
    let deadline = start + config.duration;
    let mut handles = Vec::with_capacity(clients);

    for client_id in 0..clients {
        let engine = Arc::clone(&engine);
        let counters = Arc::clone(&counters);
        let limit = config.max_transactions_per_client;
        let seed = config.seed ^ (client_id as u64).wrapping_mul(0x9e3779b97f4a7c15);
        let handle = tokio::spawn(async move {
            let mut params = ParameterGenerator::new(scale, seed);
            let mut latencies = Vec::with_capacity(per_task_sample);
            let mut executed = 0u64;
            while Instant::now() < deadline && limit.is_none_or(|limit| executed < limit) {
                let txn = params.next_transaction();
                let slot = &counters[txn.kind() as usize];
                let op_start = Instant::now();
                match engine.execute(&txn).await {
                    Ok(outcome) if outcome.is_completed() => {
                        slot.completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(_) => {
                        slot.aborted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        event!(
                            Level::WARN,
                            client_id,
                            kind = %txn.kind(),
                            error = %err,
                            "transaction failed"
                        );
                        slot.failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                if latencies.len() < per_task_sample {
                    latencies.push(op_start.elapsed().as_micros() as u64);
                }
                executed += 1;
            }
            latencies
        });
        handles.push(handle);
    }

    let mut latencies = Vec::new();
    for handle in handles {
        let mut worker_latencies = handle
            .await
            .map_err(|e| DriverError::Worker(e.to_string()))?;
        latencies.append(&mut worker_latencies);
    }

    let elapsed_secs = start.elapsed().as_secs_f64().max(0.001);
    latencies.sort_unstable();

    #[cfg(feature = "pprof")]
    maybe_write_pprof(pprof_guard)?;

    let transactions = TransactionKind::ALL
        .iter()
        .map(|kind| {
            let slot = &counters[*kind as usize];
            (
                *kind,
                KindReport {
                    completed: slot.completed.load(Ordering::Relaxed),
                    aborted: slot.aborted.load(Ordering::Relaxed),
                    failed: slot.failed.load(Ordering::Relaxed),
                },
            )
        })
        .collect();

    let stats = engine.delivery_stats();
    Ok(BenchReport {
        elapsed_secs,
        transactions,
        latency_us_p50: percentile(&latencies, 0.50),
        latency_us_p95: percentile(&latencies, 0.95),
        latency_us_p99: percentile(&latencies, 0.99),
        delivery_skip_rate: stats.skip_rate(),
        delivery_skip_flagged: stats.exceeds_threshold(),
    })
}

fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx]
}

#[cfg(feature = "pprof")]
fn maybe_start_pprof() -> Option<pprof::ProfilerGuard<'static>> {
    match std::env::var("TPCC_KV_PPROF").ok().as_deref() {
        Some("1") => pprof::ProfilerGuard::new(100).ok(),
        _ => None,
    }
}

#[cfg(feature = "pprof")]
fn maybe_write_pprof(guard: Option<pprof::ProfilerGuard<'static>>) -> Result<()> {
    if let Some(guard) = guard {
        let report = guard
            .report()
            .build()
            .map_err(|e| DriverError::Io(format!("Failed to build profile: {}", e)))?;
        let output =
            std::env::var("TPCC_KV_PPROF_OUTPUT").unwrap_or_else(|_| "pprof.svg".to_string());
        let file = std::fs::File::create(output)?;
        report
            .flamegraph(file)
            .map_err(|e| DriverError::Io(format!("Failed to write flamegraph: {}", e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::percentile;

    #[test]
    fn test_percentile() {
        assert_eq!(percentile(&[], 0.5), 0);
        let sorted: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&sorted, 0.0), 1);
        assert_eq!(percentile(&sorted, 0.5), 51);
        assert_eq!(percentile(&sorted, 1.0), 100);
    }
}
