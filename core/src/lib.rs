//! Client-side contract for HTTP(S) request/response exchanges.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). Whoever owns the socket,
//! a real client or a raw TLS stream in a test, executes the round-trip.
//!
//! # Design
//! - `WebClient` holds a base URL and a `CookieJar`; built requests carry
//!   matching cookies and parsed pages feed `Set-Cookie` back into the jar.
//! - `Range` headers accumulate through `HttpRequest::add_range`.
//! - `HttpRequest::to_wire` / `HttpResponse::parse` frame HTTP/1.x for
//!   transports that only move bytes.

pub mod client;
pub mod cookie;
pub mod error;
pub mod http;
pub mod range;
pub mod types;

pub use client::WebClient;
pub use cookie::{Cookie, CookieJar};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpVersion};
pub use range::{RangeSpec, DEFAULT_RANGE_UNIT};
pub use types::Page;
