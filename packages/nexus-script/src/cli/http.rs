use color_eyre::eyre::{Context as _, Result, bail};
use reqwest::{
    Method,
    header::{CONTENT_TYPE, HeaderValue},
};
use tracing::{debug, info, instrument, trace};

use crate::{api::NexusError, cli::Config};

/// A request body and the content type it is sent with.
#[derive(Debug)]
pub enum RequestBody {
    Empty,
    Json(String),
    Text(Vec<u8>),
}

/// Convenience method for GET requests.
///
/// Returns the response body. Any non-2xx status is a [`NexusError`].
pub async fn get(ctx: &Config, path: impl AsRef<str> + std::fmt::Debug) -> Result<String> {
    run_request(ctx, Method::GET, path.as_ref(), RequestBody::Empty).await
}

/// Convenience method for POST requests with a JSON body.
pub async fn post(
    ctx: &Config,
    path: impl AsRef<str> + std::fmt::Debug,
    json: String,
) -> Result<String> {
    run_request(ctx, Method::POST, path.as_ref(), RequestBody::Json(json)).await
}

/// Convenience method for POST requests with a plain text body.
///
/// The bytes are sent unchanged; they need not be valid UTF-8.
pub async fn post_text(
    ctx: &Config,
    path: impl AsRef<str> + std::fmt::Debug,
    text: Vec<u8>,
) -> Result<String> {
    run_request(ctx, Method::POST, path.as_ref(), RequestBody::Text(text)).await
}

/// Convenience method for PUT requests with a JSON body.
pub async fn put(
    ctx: &Config,
    path: impl AsRef<str> + std::fmt::Debug,
    json: String,
) -> Result<String> {
    run_request(ctx, Method::PUT, path.as_ref(), RequestBody::Json(json)).await
}

/// Convenience method for DELETE requests.
pub async fn delete(ctx: &Config, path: impl AsRef<str> + std::fmt::Debug) -> Result<String> {
    run_request(ctx, Method::DELETE, path.as_ref(), RequestBody::Empty).await
}

#[instrument(skip(ctx, body))]
async fn run_request(
    ctx: &Config,
    method: Method,
    path: &str,
    body: RequestBody,
) -> Result<String> {
    let url = ctx.url(path)?;
    debug!(%method, %url, "sending request");

    let mut req = ctx.client.request(method.clone(), url.clone());
    req = match body {
        RequestBody::Empty => req,
        RequestBody::Json(json) => {
            trace!(%json, "request body");
            req.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(json)
        }
        RequestBody::Text(text) => {
            trace!(text = %String::from_utf8_lossy(&text), "request body");
            req.header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
                .body(text)
        }
    };

    let res = req
        .send()
        .await
        .with_context(|| format!("send {method} {url}"))?;
    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("read response to {method} {url}"))?;
    info!(status = status.as_u16(), %body, "response");

    if !status.is_success() {
        bail!(NexusError::new(status, url.as_str(), body));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::testing::MockNexus;

    #[test_log::test(tokio::test)]
    async fn non_success_is_a_nexus_error() {
        let nexus = MockNexus::new().await;
        let ctx = nexus.config();

        let err = get(&ctx, "service/rest/v1/script/missing")
            .await
            .unwrap_err();
        let err = err.downcast_ref::<NexusError>().expect("NexusError");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.url.ends_with("/service/rest/v1/script/missing"));
    }

    #[test_log::test(tokio::test)]
    async fn bodies_carry_their_content_type() {
        let nexus = MockNexus::new().await;
        let ctx = nexus.config();
        nexus.insert_script("echo", "return args");

        post_text(&ctx, "service/rest/v1/script/echo/run", b"ping".to_vec())
            .await
            .unwrap();
        get(&ctx, "service/rest/v1/script").await.unwrap();

        let requests = nexus.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].content_type.as_deref(), Some("text/plain"));
        assert_eq!(requests[0].body, "ping");
        assert_eq!(requests[1].content_type, None);
        assert!(requests[1].body.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn sends_basic_auth_and_user_agent() {
        let nexus = MockNexus::new().await;
        get(&nexus.config(), "service/rest/v1/script").await.unwrap();

        let request = nexus.requests().remove(0);
        // base64("admin:admin123")
        assert_eq!(
            request.authorization.as_deref(),
            Some("Basic YWRtaW46YWRtaW4xMjM=")
        );
        assert_eq!(
            request.user_agent.as_deref(),
            Some(crate::cli::USER_AGENT)
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let ctx = Config::builder()
            .endpoint("http://127.0.0.1:1")
            .user("admin")
            .password("admin123")
            .build()
            .unwrap();
        let err = get(&ctx, "service/rest/v1/script").await.unwrap_err();
        assert!(err.downcast_ref::<NexusError>().is_none());
        assert!(format!("{err:#}").contains("send GET"));
    }
}
