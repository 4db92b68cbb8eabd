//! Config discovery and service construction shared by every subcommand.

use crate::cli::args::DEFAULT_CONFIG;
use anyhow::Context;
use entitlement_core::{EntitlementService, ServiceConfig};
use std::path::Path;

/// An explicit path must exist. Without one, `./entitlement.yaml` is used when
/// present and an empty configuration (no backends) otherwise.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<ServiceConfig> {
    let mut cfg = match explicit {
        Some(path) => ServiceConfig::load(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                ServiceConfig::load(default)?
            } else {
                tracing::warn!(
                    path = DEFAULT_CONFIG,
                    "no configuration found, starting without backends"
                );
                ServiceConfig::default()
            }
        }
    };
    cfg.apply_env().context("invalid environment override")?;
    Ok(cfg)
}

pub fn build_service(explicit: Option<&Path>) -> anyhow::Result<EntitlementService> {
    let cfg = load_config(explicit)?;
    EntitlementService::from_config(&cfg)
}
