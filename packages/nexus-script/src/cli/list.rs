use std::collections::BTreeSet;

use color_eyre::eyre::{Context as _, Result};
use tracing::{debug, instrument};

use crate::{
    api::{SCRIPT_API_PATH, ScriptSummary},
    cli::{Config, http},
};

/// Fetch the names of the scripts Nexus currently has.
#[instrument(skip(ctx))]
pub async fn existing_scripts(ctx: &Config) -> Result<BTreeSet<String>> {
    let body = http::get(ctx, SCRIPT_API_PATH)
        .await
        .context("list existing scripts")?;
    let names = serde_json::from_str::<Vec<ScriptSummary>>(&body)
        .context("parse script listing")?
        .into_iter()
        .map(|script| script.name)
        .collect::<BTreeSet<_>>();
    debug!(?names, "existing scripts");
    Ok(names)
}
