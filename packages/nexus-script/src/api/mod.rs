//! Wire types for the Nexus Repository Manager 3 script API.
//!
//! See `/service/rest/v1/script` in the Nexus REST API reference.

use percent_encoding::{AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

mod error;

pub use error::NexusError;

/// Path of the script collection, relative to the Nexus base URL.
pub const SCRIPT_API_PATH: &str = "service/rest/v1/script";

/// The only script type this tool uploads.
pub const SCRIPT_TYPE_GROOVY: &str = "groovy";

/// Characters that must be escaped when a value is used as a single URL path
/// segment.
///
/// This is the WHATWG path percent-encode set plus `/` and `%`, so that a
/// script name can never introduce extra segments.
pub const PATH_SEGMENT_PERCENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// A script as stored by Nexus.
///
/// This is both the upload body for `POST`/`PUT` and the element type of the
/// listing returned by `GET`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Script {
    pub fn groovy(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            kind: String::from(SCRIPT_TYPE_GROOVY),
        }
    }
}

/// An entry of the script listing.
///
/// Only the name is needed to decide between create and replace, so the rest
/// of each entry is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptSummary {
    pub name: String,
}

/// Response body of `POST /service/rest/v1/script/{name}/run`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptRunResult {
    pub name: String,
    pub result: String,
}
