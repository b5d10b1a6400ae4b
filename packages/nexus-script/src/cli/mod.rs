//! Operational code for the `nexus-script` CLI.
//!
//! The binary is a thin wrapper around this module so that everything it does
//! can be exercised in-process against [`crate::testing::MockNexus`].
//!
//! A run is strictly sequential: upload, then run, then delete, one script at
//! a time. The first failure stops the batch.
//!
//! ## Known limitation
//!
//! Whether a script exists is decided from a listing fetched before the
//! writes. Nothing stops another client from creating or deleting the script
//! in between, in which case the create or replace fails with the error Nexus
//! returns.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bon::bon;
use color_eyre::eyre::{Context as _, Result};
use reqwest::{
    Certificate, Client, Proxy, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use tracing::{debug, info, trace};

use crate::cli::{args::ArgumentError, script::ScriptFile};

pub mod args;
pub mod delete;
pub mod http;
pub mod list;
pub mod run;
pub mod script;
pub mod upload;

pub use args::Args;

/// Sent as the `User-Agent` of every request.
pub const USER_AGENT: &str = concat!("nexus-script/", env!("CARGO_PKG_VERSION"));

/// Request context shared by every call of an invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: Client,
    /// Nexus base URL, always ending in `/` so REST paths can be joined onto
    /// it without dropping a context path.
    pub endpoint: Url,
}

#[bon]
impl Config {
    #[builder]
    pub fn new(
        #[builder(into)] endpoint: String,
        #[builder(into)] user: String,
        #[builder(into)] password: String,
        // Proxy URL, e.g. `socks5h://localhost:1080`.
        proxy: Option<String>,
        // PEM file of extra trusted certificates.
        ca_file: Option<PathBuf>,
    ) -> Result<Self> {
        let endpoint = parse_endpoint(&endpoint)?;

        // Set up default headers.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        debug!(%user, "logging in");
        let credentials = BASE64.encode(format!("{user}:{password}"));
        let mut authorization = HeaderValue::try_from(format!("Basic {credentials}"))
            .context("build Authorization header")?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);
        trace!(?headers, "default headers");

        // Only the configured SOCKS proxy applies, never `$HTTP_PROXY` and
        // friends.
        let mut client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .no_proxy();
        if let Some(proxy) = proxy {
            info!(%proxy, "using SOCKS5 proxy");
            let proxy =
                Proxy::all(&proxy).map_err(|_| ArgumentError::InvalidProxy(proxy.clone()))?;
            client = client.proxy(proxy);
        }
        if let Some(path) = ca_file {
            for certificate in load_certificates(&path)? {
                client = client.add_root_certificate(certificate);
            }
        }

        // Build default client.
        let client = client.build().context("build HTTP client")?;
        Ok(Self { client, endpoint })
    }

    /// Build the request context described by command line arguments.
    pub fn from_args(args: &Args) -> Result<Self> {
        Self::builder()
            .endpoint(&args.endpoint)
            .user(&args.user)
            .password(&args.password)
            .maybe_proxy(args.socks_proxy()?)
            .maybe_ca_file(args.ca_file.clone().filter(|p| !p.as_os_str().is_empty()))
            .build()
    }

    /// Resolve a REST path (without leading `/`) against the endpoint.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("join {path:?} onto {}", self.endpoint))
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ArgumentError> {
    let invalid = |reason: String| ArgumentError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(&format!("{}/", endpoint.trim_end_matches('/')))
        .map_err(|err| invalid(err.to_string()))?;
    let scheme = url.scheme().to_string();
    match scheme.as_str() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid(String::from("missing host"))),
        _ => Err(invalid(format!("unsupported scheme {scheme:?}"))),
    }
}

fn load_certificates(path: &Path) -> Result<Vec<Certificate>, ArgumentError> {
    let invalid = |reason: String| ArgumentError::InvalidCaFile {
        path: path.to_path_buf(),
        reason,
    };
    let pem = std::fs::read(path).map_err(|err| invalid(err.to_string()))?;
    let certificates =
        Certificate::from_pem_bundle(&pem).map_err(|err| invalid(err.to_string()))?;
    if certificates.is_empty() {
        return Err(invalid(String::from("no certificates found")));
    }
    debug!(?path, count = certificates.len(), "trusting pinned CA certificates");
    Ok(certificates)
}

/// The log filter for a `-v` count.
pub fn log_filter(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,nexus_script={level}")
}

/// Upload, run, and delete scripts as requested by `args`.
///
/// Run results are written to `out`, one response body per line.
pub async fn execute(args: &Args, out: &mut impl Write) -> Result<()> {
    args.validate()?;
    let scripts = args
        .functions
        .iter()
        .map(ScriptFile::new)
        .collect::<Result<Vec<_>, _>>()?;
    let ctx = Config::from_args(args)?;

    if args.skip_upload {
        debug!("skipping upload");
    } else {
        upload::upload_all(&ctx, &scripts).await?;
    }

    if args.run {
        let data = match args.run_data() {
            Some(path) => Some(
                tokio::fs::read(path)
                    .await
                    .with_context(|| format!("read data file {path:?}"))?,
            ),
            None => None,
        };
        run::run_all(&ctx, &scripts, data.as_deref(), out).await?;
    }

    if args.delete {
        delete::delete_all(&ctx, &scripts).await?;
    }

    Ok(())
}
