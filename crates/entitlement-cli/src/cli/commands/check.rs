use super::bootstrap::build_service;
use super::output::{print_json, response_line};
use crate::cli::args::{CheckArgs, OutputFormat};
use crate::exit_codes::{EXIT_SUCCESS, EXIT_UNEXPECTED_DECISION};
use entitlement_core::PermissionRequest;
use std::path::Path;

pub async fn run(args: CheckArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let service = build_service(config)?;

    let mut request = PermissionRequest::new(args.actor, args.resource, args.permission);
    for (key, value) in args.context {
        request = request.with_context(key, value);
    }
    if let Some(backend) = args.backend {
        request = request.with_backend_hint(backend);
    }

    let resp = service.check_permission(&request).await;
    match args.format {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Text => println!(
            "{} {} {}: {}",
            request.actor,
            request.permission,
            request.resource,
            response_line(&resp)
        ),
    }

    if args.fail_on_deny && !resp.allowed {
        return Ok(EXIT_UNEXPECTED_DECISION);
    }
    Ok(EXIT_SUCCESS)
}
