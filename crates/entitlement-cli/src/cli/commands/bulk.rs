use super::bootstrap::build_service;
use super::output::{print_json, response_line};
use crate::cli::args::{BulkArgs, OutputFormat};
use crate::exit_codes::EXIT_SUCCESS;
use anyhow::Context;
use entitlement_core::{BatchJob, PermissionRequest};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Either a bare request array or a full job document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BulkInput {
    Job(BatchJob),
    Requests(Vec<PermissionRequest>),
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read requests from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read requests from {}", path.display()))
}

fn parse_job(raw: &str, max_concurrency: Option<i32>) -> anyhow::Result<BatchJob> {
    let input: BulkInput = serde_json::from_str(raw).context("invalid bulk request document")?;
    let mut job = match input {
        BulkInput::Job(job) => job,
        BulkInput::Requests(requests) => BatchJob {
            requests,
            max_concurrency: 0,
        },
    };
    if let Some(ceiling) = max_concurrency {
        job.max_concurrency = ceiling;
    }
    Ok(job)
}

pub async fn run(args: BulkArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let job = parse_job(&read_input(&args.input)?, args.max_concurrency)?;
    let service = build_service(config)?;
    let outcome = service.check_bulk_permissions(job).await;

    match args.format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text => {
            for (idx, resp) in outcome.responses.iter().enumerate() {
                println!("[{idx}] {}", response_line(resp));
            }
            println!(
                "{} succeeded, {} failed in {:.2} ms",
                outcome.success_count, outcome.error_count, outcome.total_time_ms
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
