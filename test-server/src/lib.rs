//! Loopback fixtures for exercising HTTP clients.
//!
//! # Overview
//! - [`TlsTestServer`]: a disposable HTTPS endpoint that serves exactly one
//!   HTTP/1.0 exchange with a fixed self-signed identity.
//! - [`app`]: a plain-HTTP router whose routes make cookie propagation and
//!   range headers observable without leaving the host.

use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod identity;
pub mod insecure;
pub mod latch;
pub mod tls;

pub use config::{FixtureConfig, HELLO_WORLD};
pub use error::ServeError;
pub use insecure::insecure_client_config;
pub use latch::{Latch, Wake};
pub use tls::TlsTestServer;

/// Name of the single cookie set by `/cookie`.
pub const SESSION_COOKIE: &str = "session";

/// Request headers as seen by the server, keyed by lowercase name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HeaderEcho {
    pub headers: BTreeMap<String, Vec<String>>,
}

impl HeaderEcho {
    pub fn first(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/cookie", get(set_cookie))
        .route("/headers", get(echo_headers))
        .route("/range", get(echo_range))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn set_cookie() -> impl IntoResponse {
    let value = Uuid::new_v4();
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}={value}; Path=/"))],
        "cookie set",
    )
}

async fn echo_headers(headers: HeaderMap) -> Json<HeaderEcho> {
    let mut echo = HeaderEcho::default();
    for (name, value) in &headers {
        echo.headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(echo)
}

async fn echo_range(headers: HeaderMap) -> Result<String, StatusCode> {
    let range = headers.get(header::RANGE).ok_or(StatusCode::BAD_REQUEST)?;
    range
        .to_str()
        .map(str::to_string)
        .map_err(|_| StatusCode::BAD_REQUEST)
}
