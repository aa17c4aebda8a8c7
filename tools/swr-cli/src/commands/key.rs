//! Derive and print the cache key for a request identity.

use anyhow::{bail, Result};
use clap::Args;

use swr_cache::KeyDeriver;
use swr_core::{CoordinatorConfig, RequestIdentity};

use crate::output::Output;

/// Arguments for the `key` command.
#[derive(Args)]
pub struct KeyArgs {
    /// Request path (e.g., "/trade_summary")
    pub path: String,

    /// Query parameters as NAME=VALUE pairs
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,
}

pub fn run(args: KeyArgs, config: &CoordinatorConfig, output: &Output) -> Result<()> {
    let mut identity = RequestIdentity::new(&args.path);
    for param in &args.params {
        let Some((name, value)) = param.split_once('=') else {
            bail!("invalid parameter '{param}', expected NAME=VALUE");
        };
        identity = identity.with_param(name, value);
    }

    let deriver = KeyDeriver::from_config(config);
    let key = deriver.derive(&identity);

    output.info(&format!("cache key: {key}"));
    output.debug(&format!("refresh marker: {}", key.refresh_marker()));
    if deriver.force_refresh(&identity) {
        output.info("forced refresh requested");
    }
    Ok(())
}
