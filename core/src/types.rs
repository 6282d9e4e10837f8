//! Decoded responses handed back to callers.

use std::sync::Arc;

use crate::cookie::Cookie;

/// A successful response with its body decoded as UTF-8 text.
///
/// `cookies` are the cookies this response set, shared with the client's
/// `CookieJar` rather than copied.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub cookies: Vec<Arc<Cookie>>,
}
