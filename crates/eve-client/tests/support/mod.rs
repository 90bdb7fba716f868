//! In-process mock EVE-NG server for integration tests
//!
//! Routes are registered per method and raw (still percent-encoded) path.
//! Every request is recorded with its query string and `Cookie` header.

use axum::Router;
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use eve_client::{EveConfig, Protocol};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const LOGIN_PATH: &str = "/api/auth/login";

/// A request as seen by the mock server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub cookie: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    /// Value of the `_` cache-busting parameter
    pub fn cache_buster(&self) -> Option<&str> {
        self.query
            .as_deref()?
            .split('&')
            .find_map(|pair| pair.strip_prefix("_="))
    }
}

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    body: String,
    set_cookies: Vec<String>,
    delay: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
struct ServerState {
    routes: Arc<Mutex<HashMap<(String, String), Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    required_cookie: Arc<Mutex<Option<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock EVE-NG server bound to an ephemeral loopback port
#[derive(Debug)]
pub struct MockEveServer {
    addr: SocketAddr,
    state: ServerState,
}

impl MockEveServer {
    /// Bind and serve in the background
    pub async fn start() -> Self {
        init_tracing();

        let state = ServerState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock EVE-NG server");
        let addr = listener.local_addr().expect("mock server address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// `host:port` of the server
    pub fn server(&self) -> String {
        self.addr.to_string()
    }

    /// Client configuration pointing at this server over plain HTTP
    pub fn config(&self) -> EveConfig {
        EveConfig::new(self.server())
            .with_protocol(Protocol::Http)
            .with_credentials("admin", "eve")
            .with_timeout(Duration::from_secs(5))
    }

    /// Answer `method path` with `status` and a JSON body
    pub fn on(&self, method: &str, path: &str, status: u16, body: &Value) {
        self.on_raw(method, path, status, &body.to_string());
    }

    /// Answer `method path` with `status` and a raw body
    pub fn on_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        self.insert(method, path, Route {
            status: StatusCode::from_u16(status).expect("valid status"),
            body: body.to_string(),
            set_cookies: Vec::new(),
            delay: None,
        });
    }

    /// Answer `method path` with a JSON body only after `delay`
    pub fn on_delayed(&self, method: &str, path: &str, body: &Value, delay: Duration) {
        self.insert(method, path, Route {
            status: StatusCode::OK,
            body: body.to_string(),
            set_cookies: Vec::new(),
            delay: Some(delay),
        });
    }

    /// Accept logins and hand out `cookie` (`name=value`); other calls then require it
    pub fn accept_login(&self, cookie: &str) {
        self.accept_login_with(&[format!("{cookie}; path=/; HttpOnly").as_str()], cookie);
    }

    /// Accept logins answering with the given `Set-Cookie` lines; other calls
    /// then require `required` (`name=value`)
    pub fn accept_login_with(&self, set_cookies: &[&str], required: &str) {
        let body = json!({"code": 200, "status": "success", "message": "User logged in (90013)."});
        self.insert("POST", LOGIN_PATH, Route {
            status: StatusCode::OK,
            body: body.to_string(),
            set_cookies: set_cookies.iter().map(ToString::to_string).collect(),
            delay: None,
        });
        *lock(&self.state.required_cookie) = Some(required.to_string());
    }

    /// Reject logins with `status`; other calls require a cookie nobody has
    pub fn reject_login(&self, status: u16) {
        self.on("POST", LOGIN_PATH, status, &json!({
            "code": status,
            "status": "fail",
            "message": "Authentication failed (90002).",
        }));
        *lock(&self.state.required_cookie) = Some("unetlab_session=never-issued".to_string());
    }

    /// Register a lab node list under `/api/labs/{encoded_path}.unl/nodes`
    pub fn with_nodes(&self, encoded_path: &str, data: Value) {
        self.on("GET", &format!("/api/labs/{encoded_path}.unl/nodes"), 200, &json!({
            "code": 200,
            "status": "success",
            "message": "Successfully listed nodes (60026).",
            "data": data,
        }));
    }

    /// All requests received, in arrival order
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for one path
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    fn insert(&self, method: &str, path: &str, route: Route) {
        lock(&self.state.routes).insert((method.to_string(), path.to_string()), route);
    }
}

async fn handle(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let cookie = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    lock(&state.requests).push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        cookie: cookie.clone(),
        headers: headers.clone(),
        body,
    });

    if uri.path() != LOGIN_PATH {
        if let Some(required) = lock(&state.required_cookie).clone() {
            let presented = cookie.as_deref().unwrap_or_default();
            if !presented.split("; ").any(|pair| pair == required) {
                return json_response(StatusCode::PRECONDITION_FAILED, &json!({
                    "code": 412,
                    "status": "unauthorized",
                    "message": "User is not authenticated or session timed out (90001).",
                }).to_string(), &[]);
            }
        }
    }

    let route = lock(&state.routes)
        .get(&(method.to_string(), uri.path().to_string()))
        .cloned();

    match route {
        Some(route) => {
            if let Some(delay) = route.delay {
                tokio::time::sleep(delay).await;
            }
            json_response(route.status, &route.body, &route.set_cookies)
        }
        None => json_response(StatusCode::NOT_FOUND, &json!({
            "code": 404,
            "status": "fail",
            "message": format!("No route for {} {}", method, uri.path()),
        }).to_string(), &[]),
    }
}

fn json_response(status: StatusCode, body: &str, set_cookies: &[String]) -> Response {
    let mut response =
        (status, [(CONTENT_TYPE, "application/json")], body.to_string()).into_response();
    for cookie in set_cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
