use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context as _, Result};
use percent_encoding::percent_encode;
use serde::Serialize as _;
use serde_json::ser::PrettyFormatter;

use crate::{
    api::{PATH_SEGMENT_PERCENT_ENCODE_SET, SCRIPT_API_PATH, Script},
    cli::args::ArgumentError,
};

/// A local script file and the name it has in Nexus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    pub path: PathBuf,
    pub name: String,
}

impl ScriptFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ArgumentError> {
        let path = path.into();
        match script_name(&path) {
            Some(name) => Ok(Self { path, name }),
            None => Err(ArgumentError::InvalidFunction(path)),
        }
    }

    /// REST path of this script.
    pub fn resource_path(&self) -> String {
        format!(
            "{SCRIPT_API_PATH}/{}",
            percent_encode(self.name.as_bytes(), PATH_SEGMENT_PERCENT_ENCODE_SET)
        )
    }

    /// REST path that runs this script.
    pub fn run_path(&self) -> String {
        format!("{}/run", self.resource_path())
    }

    /// Read the script and render the JSON body used to create or replace it.
    pub async fn payload(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read script {:?}", self.path))?;
        render_payload(&Script::groovy(&self.name, content))
    }
}

/// File extension removed from script file names.
pub const GROOVY_EXTENSION: &str = ".groovy";

/// The Nexus name of a script: its file name, minus a trailing `.groovy`.
///
/// Other extensions are part of the name.
pub fn script_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy();
    let name = file_name
        .strip_suffix(GROOVY_EXTENSION)
        .unwrap_or(&file_name);
    (!name.is_empty()).then(|| name.to_string())
}

/// Serialize a script with four-space indentation.
pub fn render_payload(script: &Script) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    script.serialize(&mut ser).context("serialize script payload")?;
    String::from_utf8(buf).context("script payload is not UTF-8")
}
