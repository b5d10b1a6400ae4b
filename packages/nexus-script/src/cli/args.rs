use std::{ffi::OsString, path::PathBuf};

use clap::{ArgAction, Parser};
use lazy_regex::regex_is_match;
use thiserror::Error;

/// Default Nexus base URL.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8081";

/// Environment variable holding extra arguments to prepend to the command
/// line.
pub const CALL_ARGS_ENV: &str = "NEXUS_CALL_ARGS";

/// Upload Groovy scripts to the Nexus 3 scripting endpoint.
///
/// Scripts are created if Nexus doesn't know them yet and replaced otherwise.
/// They can then be run, or deleted. Extra arguments may be supplied through
/// $NEXUS_CALL_ARGS, split on `|` if it contains one and on whitespace
/// otherwise.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nexus-script",
    version,
    max_term_width = 80,
    args_override_self = true
)]
pub struct Args {
    /// A Groovy script to be uploaded as a Nexus function.
    ///
    /// The file name (minus the extension) will be the name of the REST
    /// function in Nexus. May be repeated.
    #[arg(short = 'f', long = "function", value_name = "GROOVY_SCRIPT")]
    pub functions: Vec<PathBuf>,

    /// URL to the Nexus endpoint.
    #[arg(
        short = 'n',
        long = "nexus",
        env = "NEXUS_ENDPOINT",
        default_value = DEFAULT_ENDPOINT,
        value_name = "NEXUS_ENDPOINT"
    )]
    pub endpoint: String,

    /// Path to a pinned CA chain in PEM format.
    ///
    /// Can be self signed to guarantee a secure connection. Its certificates
    /// are trusted in addition to the system roots.
    #[arg(short = 'c', long, env = "NEXUS_CA_FILE", value_name = "CERT_PEM")]
    pub ca_file: Option<PathBuf>,

    /// A SOCKS5 proxy to send traffic through, as `host:port`.
    #[arg(short = 'p', long, env = "NEXUS_SOCKS_PROXY", value_name = "HOST:PORT")]
    pub proxy: Option<String>,

    /// Run each function after uploading it.
    #[arg(short = 'r', long)]
    pub run: bool,

    /// File whose contents get submitted to the function being run.
    ///
    /// Depends on --run. Ignored if more than one function is given.
    #[arg(short = 'd', long, value_name = "DATA_FILE")]
    pub data: Option<PathBuf>,

    /// Delete the functions from Nexus.
    #[arg(long)]
    pub delete: bool,

    /// Skip uploading the functions (and proceed to only run or delete).
    #[arg(short = 's', long = "skip-upload")]
    pub skip_upload: bool,

    /// Increase output verbosity. May be repeated.
    #[arg(short = 'v', long = "verbosity", action = ArgAction::Count)]
    pub verbosity: u8,

    /// Nexus user to authenticate as.
    #[arg(long, env = "NEXUS_USER", default_value = "admin")]
    pub user: String,

    /// Password of the Nexus user.
    #[arg(
        long,
        env = "NEXUS_PASSWORD",
        default_value = "admin123",
        hide_default_value = true,
        hide_env_values = true
    )]
    pub password: String,
}

#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("Must list at least one function to upload via --function option\nSee also --help.")]
    NoFunctions,
    #[error("Invalid --proxy specified: {0}")]
    InvalidProxy(String),
    #[error("Invalid --nexus endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("Cannot derive a function name from {0:?}")]
    InvalidFunction(PathBuf),
    #[error("Could not use --ca-file {path:?}: {reason}")]
    InvalidCaFile { path: PathBuf, reason: String },
}

impl Args {
    /// Check the arguments that clap can't check on its own.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.functions.is_empty() {
            return Err(ArgumentError::NoFunctions);
        }
        self.socks_proxy()?;
        Ok(())
    }

    /// The proxy URL to route traffic through, if any.
    ///
    /// Host names are resolved by the proxy (`socks5h`), so names that only
    /// exist on the far side of the proxy work.
    pub fn socks_proxy(&self) -> Result<Option<String>, ArgumentError> {
        let Some(proxy) = self.proxy.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        if !regex_is_match!(r"^[-0-9a-zA-Z.]+:[0-9]+$", proxy) {
            return Err(ArgumentError::InvalidProxy(proxy.to_string()));
        }
        let port = proxy.rsplit(':').next().unwrap_or_default();
        if port.parse::<u16>().is_err() {
            return Err(ArgumentError::InvalidProxy(proxy.to_string()));
        }
        Ok(Some(format!("socks5h://{proxy}")))
    }

    /// The data file to send to a run, if it applies.
    ///
    /// Data only makes sense for a single function; with several it is
    /// ignored.
    pub fn run_data(&self) -> Option<&PathBuf> {
        let data = self.data.as_ref().filter(|d| !d.as_os_str().is_empty())?;
        if self.functions.len() == 1 {
            Some(data)
        } else {
            tracing::warn!(
                ?data,
                functions = self.functions.len(),
                "ignoring --data: more than one function given"
            );
            None
        }
    }
}

/// Insert the arguments from `call_args` after the program name in `argv`.
///
/// `call_args` is split on `|` when it contains one, so that individual
/// arguments may contain spaces, and on whitespace otherwise.
pub fn with_call_args<I, T>(call_args: Option<&str>, argv: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut argv = argv.into_iter().map(Into::into);
    let mut expanded = Vec::new();
    expanded.extend(argv.next());
    match call_args.map(str::trim).filter(|args| !args.is_empty()) {
        Some(args) if args.contains('|') => expanded.extend(args.split('|').map(OsString::from)),
        Some(args) => expanded.extend(args.split_whitespace().map(OsString::from)),
        None => {}
    }
    expanded.extend(argv);
    expanded
}
