use std::io::Write;

use color_eyre::eyre::{Context as _, Result};
use tracing::{debug, instrument};

use crate::{
    api::ScriptRunResult,
    cli::{Config, http, script::ScriptFile},
};

/// Run a script, sending `data` as its plain text argument.
///
/// Returns the raw response body.
#[instrument(skip(ctx, data), fields(name = %script.name))]
pub async fn run_script(
    ctx: &Config,
    script: &ScriptFile,
    data: Option<&[u8]>,
) -> Result<String> {
    let body = http::post_text(ctx, script.run_path(), data.unwrap_or_default().to_vec())
        .await
        .with_context(|| format!("run script {:?}", script.name))?;
    if let Ok(ran) = serde_json::from_str::<ScriptRunResult>(&body) {
        debug!(result = %ran.result, "script ran");
    }
    Ok(body)
}

/// Run every script in order, writing each response body to `out` as soon as
/// it arrives.
pub async fn run_all(
    ctx: &Config,
    scripts: &[ScriptFile],
    data: Option<&[u8]>,
    out: &mut impl Write,
) -> Result<()> {
    for script in scripts {
        let body = run_script(ctx, script, data).await?;
        writeln!(out, "{body}").context("write run result")?;
    }
    Ok(())
}
