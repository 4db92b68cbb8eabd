use super::bootstrap::build_service;
use super::output::print_json;
use crate::cli::args::{BenchArgs, OutputFormat};
use crate::exit_codes::{EXIT_SUCCESS, EXIT_UNEXPECTED_DECISION};
use anyhow::Context;
use entitlement_core::{BenchmarkPlan, BenchmarkReport};
use std::path::Path;

fn load_plan(args: &BenchArgs) -> anyhow::Result<BenchmarkPlan> {
    let raw = std::fs::read_to_string(&args.plan)
        .with_context(|| format!("failed to read plan {}", args.plan.display()))?;
    let mut plan: BenchmarkPlan = serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid plan {}", args.plan.display()))?;
    if let Some(iterations) = args.iterations {
        plan.iterations = iterations;
    }
    if let Some(concurrency) = args.concurrency {
        plan.concurrency = concurrency;
    }
    if args.backend.is_some() {
        plan.backend = args.backend;
    }
    Ok(plan)
}

fn print_text(report: &BenchmarkReport) {
    for r in &report.results {
        println!(
            "{:<24} {:>6}/{:<6} ok  min {:.2}  avg {:.2}  p95 {:.2}  p99 {:.2}  max {:.2} ms  [{}]",
            r.name,
            r.successful_requests,
            r.total_requests,
            r.latency.min_ms,
            r.latency.avg_ms,
            r.latency.p95_ms,
            r.latency.p99_ms,
            r.latency.max_ms,
            r.backend.as_str()
        );
    }
    let s = &report.summary;
    println!(
        "{} requests in {:.2} ms ({:.1} req/s, {:.3} ms/request)",
        s.total_requests, s.total_time_ms, s.throughput_rps, s.avg_response_time_ms
    );
}

pub async fn run(args: BenchArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let plan = load_plan(&args)?;
    let service = build_service(config)?;
    let report = service.benchmark(&plan).await;

    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_text(&report),
    }

    if report.results.iter().any(|r| !r.success) {
        return Ok(EXIT_UNEXPECTED_DECISION);
    }
    Ok(EXIT_SUCCESS)
}
