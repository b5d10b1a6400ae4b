use color_eyre::eyre::{Context as _, Result};
use tracing::{debug, info, instrument};

use crate::cli::{Config, http, list, script::ScriptFile};

/// Delete every script that Nexus has, skipping the ones it doesn't.
///
/// Returns the names that were deleted.
#[instrument(skip_all)]
pub async fn delete_all(ctx: &Config, scripts: &[ScriptFile]) -> Result<Vec<String>> {
    let existing = list::existing_scripts(ctx).await?;
    let mut deleted = Vec::new();
    for script in scripts {
        if !existing.contains(&script.name) {
            debug!(name = %script.name, "script not found, nothing to delete");
            continue;
        }
        http::delete(ctx, script.resource_path())
            .await
            .with_context(|| format!("delete script {:?}", script.name))?;
        info!(name = %script.name, "script deleted");
        deleted.push(script.name.clone());
    }
    Ok(deleted)
}
