//! JSON-lines in, JSON-lines out. Unparseable lines are logged and skipped;
//! every parsed request gets exactly one output line, in input order.

use super::bootstrap::build_service;
use crate::cli::args::StreamArgs;
use crate::exit_codes::EXIT_SUCCESS;
use anyhow::Context;
use entitlement_core::PermissionRequest;
use futures::future::ready;
use futures::StreamExt;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::LinesStream;

fn parse_line(line: &str) -> Option<PermissionRequest> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(request) => Some(request),
        Err(e) => {
            tracing::warn!(error = %e, "skipping unparseable request line");
            None
        }
    }
}

pub async fn run(args: StreamArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let service = build_service(config)?;

    let source: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let requests = LinesStream::new(BufReader::new(source).lines())
        .take_while(|line| {
            if let Err(e) = line {
                tracing::error!(error = %e, "failed to read request stream");
            }
            ready(line.is_ok())
        })
        .filter_map(|line| ready(line.ok().and_then(|l| parse_line(&l))));

    let mut responses = Box::pin(service.stream_permission_checks(requests));
    let mut stdout = tokio::io::stdout();
    while let Some(resp) = responses.next().await {
        let mut line = serde_json::to_vec(&resp)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_invalid_lines_are_skipped() {
        assert!(parse_line("   ").is_none());
        assert!(parse_line("{not json").is_none());
        let req = parse_line(
            r#"{"actor":"david","resource":"acc123","permission":"can_view_transactions","context":{"implementation":"neo4j"}}"#,
        )
        .unwrap();
        assert_eq!(req.actor, "david");
        assert_eq!(req.context["implementation"], "neo4j");
    }
}
