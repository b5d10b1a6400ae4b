use std::collections::BTreeSet;

use color_eyre::eyre::{Context as _, Result};
use tracing::{info, instrument};

use crate::{
    api::SCRIPT_API_PATH,
    cli::{Config, http, list, script::ScriptFile},
};

/// What an upload did to the remote script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Replaced,
}

/// Create `script` in Nexus, or replace it if `existing` says it's there.
#[instrument(skip(ctx, existing), fields(name = %script.name))]
pub async fn upsert(
    ctx: &Config,
    script: &ScriptFile,
    existing: &BTreeSet<String>,
) -> Result<Upsert> {
    let payload = script.payload().await?;
    if existing.contains(&script.name) {
        http::put(ctx, script.resource_path(), payload)
            .await
            .with_context(|| format!("replace script {:?}", script.name))?;
        info!("script replaced");
        Ok(Upsert::Replaced)
    } else {
        http::post(ctx, SCRIPT_API_PATH, payload)
            .await
            .with_context(|| format!("create script {:?}", script.name))?;
        info!("script created");
        Ok(Upsert::Created)
    }
}

/// Upload every script, stopping at the first failure.
///
/// The listing is fetched once up front.
pub async fn upload_all(ctx: &Config, scripts: &[ScriptFile]) -> Result<Vec<Upsert>> {
    let existing = list::existing_scripts(ctx).await?;
    let mut results = Vec::with_capacity(scripts.len());
    for script in scripts {
        results.push(upsert(ctx, script, &existing).await?);
    }
    Ok(results)
}
