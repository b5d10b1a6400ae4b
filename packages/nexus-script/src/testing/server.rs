use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_test::TestServer;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::{
    Method, StatusCode, Url,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, USER_AGENT},
};

use crate::{
    api::{Script, ScriptRunResult},
    cli::Config,
};

/// Credentials the mock accepts unless told otherwise.
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
    /// The body, decoded lossily as UTF-8.
    pub body: String,
    pub raw_body: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    scripts: BTreeMap<String, Script>,
    requests: Vec<RecordedRequest>,
    failures: HashMap<(Method, String), (StatusCode, String)>,
    authorization: String,
}

#[derive(Clone, Default)]
struct SharedState(Arc<Mutex<MockState>>);

impl SharedState {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().expect("mock state poisoned")
    }
}

/// An in-memory stand-in for the Nexus script API.
///
/// Listens on an open local port, so both in-process clients and the CLI
/// binary can talk to it. Every request is recorded before it is handled.
pub struct MockNexus {
    /// The test server.
    pub http: TestServer,

    /// The base URL of the test server.
    pub base_url: Url,

    pub user: String,
    pub password: String,

    state: SharedState,
}

impl MockNexus {
    /// Start a mock accepting the default credentials.
    pub async fn new() -> Self {
        Self::with_credentials(DEFAULT_USER, DEFAULT_PASSWORD).await
    }

    /// Start a mock accepting only `user` and `password`.
    pub async fn with_credentials(user: &str, password: &str) -> Self {
        let state = SharedState::default();
        state.lock().authorization = format!(
            "Basic {}",
            BASE64.encode(format!("{user}:{password}"))
        );

        let app = Router::new()
            .route("/service/rest/v1/script", get(list).post(create))
            .route(
                "/service/rest/v1/script/{name}",
                get(info).put(update).delete(remove),
            )
            .route("/service/rest/v1/script/{name}/run", post(run))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let http = TestServer::builder()
            .http_transport()
            .build(app)
            .expect("create test server");
        let base_url = http.server_url("/").expect("construct server base url");

        MockNexus {
            http,
            base_url,
            user: user.to_string(),
            password: password.to_string(),
            state,
        }
    }

    /// A client context pointed at this server with the right credentials.
    pub fn config(&self) -> Config {
        Config::builder()
            .endpoint(self.base_url.as_str())
            .user(&self.user)
            .password(&self.password)
            .build()
            .expect("build config for mock server")
    }

    /// Store a script as if it had been uploaded earlier.
    pub fn insert_script(&self, name: &str, content: &str) {
        self.state
            .lock()
            .scripts
            .insert(name.to_string(), Script::groovy(name, content));
    }

    /// Scripts currently stored, ordered by name.
    pub fn scripts(&self) -> Vec<Script> {
        self.state.lock().scripts.values().cloned().collect()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Answer `method` on `path` with `status` and `body` instead of handling
    /// it.
    pub fn fail_on(&self, method: Method, path: &str, status: StatusCode, body: &str) {
        self.state
            .lock()
            .failures
            .insert((method, path.to_string()), (status, body.to_string()));
    }
}

async fn record(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };
    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(String::from)
    };
    let recorded = RecordedRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        content_type: header(CONTENT_TYPE),
        authorization: header(AUTHORIZATION),
        user_agent: header(USER_AGENT),
        body: String::from_utf8_lossy(&body).into_owned(),
        raw_body: body.to_vec(),
    };

    let (authorized, failure) = {
        let mut state = state.lock();
        let authorized = recorded.authorization.as_deref() == Some(state.authorization.as_str());
        let failure = state
            .failures
            .get(&(recorded.method.clone(), recorded.path.clone()))
            .cloned();
        state.requests.push(recorded);
        (authorized, failure)
    };

    if !authorized {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    if let Some((status, body)) = failure {
        return (status, body).into_response();
    }
    next.run(Request::from_parts(parts, Body::from(body))).await
}

async fn list(State(state): State<SharedState>) -> Json<Vec<Script>> {
    Json(state.lock().scripts.values().cloned().collect())
}

async fn info(State(state): State<SharedState>, Path(name): Path<String>) -> Response {
    match state.lock().scripts.get(&name) {
        Some(script) => Json(script.clone()).into_response(),
        None => not_found(&name),
    }
}

async fn create(State(state): State<SharedState>, Json(script): Json<Script>) -> Response {
    let mut state = state.lock();
    if state.scripts.contains_key(&script.name) {
        return (
            StatusCode::BAD_REQUEST,
            format!("Script '{}' already exists", script.name),
        )
            .into_response();
    }
    state.scripts.insert(script.name.clone(), script);
    StatusCode::NO_CONTENT.into_response()
}

async fn update(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(script): Json<Script>,
) -> Response {
    if script.name != name {
        return (
            StatusCode::BAD_REQUEST,
            format!("Script name '{}' does not match path '{name}'", script.name),
        )
            .into_response();
    }
    let mut state = state.lock();
    match state.scripts.get_mut(&name) {
        Some(existing) => {
            *existing = script;
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(&name),
    }
}

async fn remove(State(state): State<SharedState>, Path(name): Path<String>) -> Response {
    match state.lock().scripts.remove(&name) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(&name),
    }
}

/// Echoes the request body back as the script result.
async fn run(State(state): State<SharedState>, Path(name): Path<String>, body: Bytes) -> Response {
    if !state.lock().scripts.contains_key(&name) {
        return not_found(&name);
    }
    let result = String::from_utf8_lossy(&body).into_owned();
    Json(ScriptRunResult { name, result }).into_response()
}

fn not_found(name: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("Script '{name}' not found")).into_response()
}
