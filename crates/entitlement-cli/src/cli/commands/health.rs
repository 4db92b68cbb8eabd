use super::bootstrap::build_service;
use super::output::print_json;
use crate::cli::args::{HealthArgs, OutputFormat};
use crate::exit_codes::EXIT_SUCCESS;
use std::path::Path;

pub fn run(args: HealthArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let service = build_service(config)?;
    let status = service.health(args.backend);
    match args.format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Text => println!("{} ({})", status.status_message, status.backend.as_str()),
    }
    Ok(EXIT_SUCCESS)
}
