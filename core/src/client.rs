//! Request builder and response parser with a cookie jar.
//!
//! # Design
//! `WebClient` holds a base URL and a `CookieJar`. Each exchange is split
//! into a `build_*` method that produces an `HttpRequest` and `parse_page`,
//! which consumes the `HttpResponse`. The caller executes the round-trip in
//! between, so the client stays free of I/O. Cookies flow both ways: built
//! requests carry a `Cookie` header from the jar, parsed responses feed
//! `Set-Cookie` back into it.

use url::Url;

use crate::cookie::CookieJar;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::Page;

#[derive(Debug, Clone)]
pub struct WebClient {
    base_url: Url,
    jar: CookieJar,
}

impl WebClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            jar: CookieJar::new(),
        })
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    pub fn build_get(&self, path: &str) -> Result<HttpRequest, ApiError> {
        self.build(HttpMethod::Get, path)
    }

    pub fn build_post(&self, path: &str, body: Vec<u8>) -> Result<HttpRequest, ApiError> {
        let mut req = self.build(HttpMethod::Post, path)?;
        req.set_header("Content-Type", "application/octet-stream");
        req.body = Some(body);
        Ok(req)
    }

    fn build(&self, method: HttpMethod, path: &str) -> Result<HttpRequest, ApiError> {
        let url = self.url(path)?;
        let mut req = HttpRequest::new(method, url.as_str());
        if let Some(cookies) = self.jar.cookie_header(&url) {
            req.set_header("Cookie", cookies);
        }
        Ok(req)
    }

    /// Accepts 200 and 206, stores any cookies the response set, and decodes
    /// the body as UTF-8.
    pub fn parse_page(&mut self, req: &HttpRequest, response: HttpResponse) -> Result<Page, ApiError> {
        let url = Url::parse(&req.url)?;
        let cookies = response
            .header_values("set-cookie")
            .filter_map(|value| self.jar.store(&url, value))
            .collect();
        check_status(&response, &[200, 206])?;

        Ok(Page {
            status: response.status,
            content_type: response.header("content-type").map(str::to_string),
            body: String::from_utf8(response.body)?,
            cookies,
        })
    }
}

/// Map unaccepted status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, accepted: &[u16]) -> Result<(), ApiError> {
    if accepted.contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    })
}
