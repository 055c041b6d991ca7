//! `datalift get` - fetch a published object back to local disk

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::cmd::Store;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct GetArgs {
    pub bucket: String,

    /// Object name, including any prefix
    pub object: String,

    /// Local destination file
    pub dest: PathBuf,
}

pub fn run(args: GetArgs, config: &Config) -> Result<()> {
    let store = Store::from_config(config)?;
    let bytes = store
        .object_store()
        .download(&args.bucket, &args.object, &args.dest)
        .with_context(|| format!("Failed to fetch {}/{}", args.bucket, args.object))?;
    log::info!(
        "Downloaded {}/{} to {} ({})",
        args.bucket,
        args.object,
        args.dest.display(),
        indicatif::HumanBytes(bytes)
    );
    Ok(())
}
