//! Repeated-check benchmarking and latency statistics.

use crate::gate::AdmissionGate;
use crate::model::{
    Backend, BenchmarkCase, BenchmarkPlan, BenchmarkReport, BenchmarkResult, BenchmarkSummary,
    LatencyStats,
};
use crate::router::{elapsed_ms, Router};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

impl LatencyStats {
    /// Summarizes latency samples; `None` when there are none.
    ///
    /// Percentiles index the sorted samples at `floor(n * q)`, clamped to the
    /// last element so small sample counts never index past the end.
    pub fn from_samples(mut samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f64::total_cmp);

        let n = samples.len();
        let min_ms = samples[0];
        let max_ms = samples[n - 1];
        let mean = samples.iter().sum::<f64>() / n as f64;

        Some(Self {
            min_ms,
            // Summation rounding can push the mean a ulp outside the range.
            avg_ms: mean.clamp(min_ms, max_ms),
            max_ms,
            p95_ms: samples[percentile_index(n, 0.95)],
            p99_ms: samples[percentile_index(n, 0.99)],
        })
    }
}

pub(crate) fn percentile_index(len: usize, quantile: f64) -> usize {
    let idx = (len as f64 * quantile).floor() as usize;
    idx.min(len.saturating_sub(1))
}

#[derive(Debug, Clone)]
pub struct BenchmarkHarness {
    router: Router,
}

impl BenchmarkHarness {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Runs every case `plan.iterations` times. No cases, or a non-positive
    /// iteration count, yields an empty report.
    pub async fn run(&self, plan: &BenchmarkPlan) -> BenchmarkReport {
        let backend = plan.backend.unwrap_or(Backend::Unspecified);
        let iterations = match u32::try_from(plan.iterations) {
            Ok(n) if n > 0 && !plan.cases.is_empty() => n,
            _ => {
                return BenchmarkReport {
                    results: Vec::new(),
                    summary: BenchmarkSummary {
                        backend,
                        ..BenchmarkSummary::default()
                    },
                }
            }
        };

        let started = Instant::now();
        let mut results = Vec::with_capacity(plan.cases.len());
        for case in &plan.cases {
            results.push(
                self.run_case(case, iterations, plan.concurrency, plan.backend)
                    .await,
            );
        }

        let total_time_ms = elapsed_ms(started);
        let total_requests: u32 = results.iter().map(|r| r.total_requests).sum();
        let avg_response_time_ms = if total_requests > 0 {
            total_time_ms / f64::from(total_requests)
        } else {
            0.0
        };
        let throughput_rps = if total_time_ms > 0.0 {
            f64::from(total_requests) / (total_time_ms / 1000.0)
        } else {
            0.0
        };

        tracing::info!(
            cases = results.len(),
            total_requests,
            total_time_ms,
            throughput_rps,
            backend = backend.as_str(),
            "benchmark finished"
        );

        BenchmarkReport {
            results,
            summary: BenchmarkSummary {
                total_requests,
                total_time_ms,
                avg_response_time_ms,
                throughput_rps,
                backend,
            },
        }
    }

    async fn run_case(
        &self,
        case: &BenchmarkCase,
        iterations: u32,
        concurrency: i32,
        hint: Option<Backend>,
    ) -> BenchmarkResult {
        let request = match hint {
            Some(backend) => case.request.clone().with_backend_hint(backend),
            None => case.request.clone(),
        };
        let backend = request.backend_hint();
        let request = Arc::new(request);
        let expected = case.expected;
        let gate = AdmissionGate::for_benchmark(concurrency);
        let matched = Arc::new(AtomicU32::new(0));
        let mismatched = Arc::new(AtomicU32::new(0));
        let mut join_set = JoinSet::new();

        for _ in 0..iterations {
            let permit = gate.admit().await;
            let router = self.router.clone();
            let request = request.clone();
            let matched = matched.clone();
            let mismatched = mismatched.clone();
            join_set.spawn(async move {
                let started = Instant::now();
                let routed = router.dispatch(&request).await;
                let took = elapsed_ms(started);
                drop(permit);
                // A failure never counts as a match, even when `expected` is false.
                if routed.decided && routed.response.allowed == expected {
                    matched.fetch_add(1, Ordering::Relaxed);
                } else {
                    mismatched.fetch_add(1, Ordering::Relaxed);
                }
                took
            });
        }

        let mut samples = Vec::with_capacity(iterations as usize);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(took) => samples.push(took),
                Err(e) => tracing::error!(case = %case.name, error = %e, "benchmark worker terminated"),
            }
        }

        let successful_requests = matched.load(Ordering::Relaxed);
        let failed_requests = iterations - successful_requests;
        if failed_requests > 0 {
            tracing::warn!(
                case = %case.name,
                failed_requests,
                mismatched = mismatched.load(Ordering::Relaxed),
                "benchmark case had unexpected decisions"
            );
        }

        BenchmarkResult {
            name: case.name.clone(),
            success: failed_requests == 0,
            total_requests: iterations,
            successful_requests,
            failed_requests,
            latency: LatencyStats::from_samples(samples).unwrap_or_default(),
            backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_index_is_bounds_checked() {
        assert_eq!(percentile_index(1, 0.95), 0);
        assert_eq!(percentile_index(1, 0.99), 0);
        assert_eq!(percentile_index(2, 0.95), 1);
        assert_eq!(percentile_index(20, 0.95), 19);
        assert_eq!(percentile_index(100, 0.95), 95);
        assert_eq!(percentile_index(100, 0.99), 99);
        assert_eq!(percentile_index(1000, 0.99), 990);
    }

    #[test]
    fn stats_from_single_sample() {
        let stats = LatencyStats::from_samples(vec![4.0]).unwrap();
        assert_eq!(stats.min_ms, 4.0);
        assert_eq!(stats.max_ms, 4.0);
        assert_eq!(stats.avg_ms, 4.0);
        assert_eq!(stats.p95_ms, 4.0);
        assert_eq!(stats.p99_ms, 4.0);
    }

    #[test]
    fn stats_sort_unordered_samples() {
        let stats = LatencyStats::from_samples(vec![9.0, 1.0, 5.0, 3.0]).unwrap();
        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 9.0);
        assert_eq!(stats.avg_ms, 4.5);
        assert_eq!(stats.p95_ms, 9.0);
        assert_eq!(stats.p99_ms, 9.0);
    }

    #[test]
    fn mean_stays_within_range_despite_rounding() {
        let stats = LatencyStats::from_samples(vec![0.1, 0.1, 0.1]).unwrap();
        assert!(stats.min_ms <= stats.avg_ms && stats.avg_ms <= stats.max_ms);
    }

    #[test]
    fn no_samples_no_stats() {
        assert_eq!(LatencyStats::from_samples(Vec::new()), None);
    }
}
