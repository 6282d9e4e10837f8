//! HTTP requests and responses as plain data.
//!
//! # Design
//! The contract builds `HttpRequest` values and consumes `HttpResponse`
//! values without touching the network; whoever holds the socket executes
//! the exchange. `to_wire` and `parse` cover the HTTP/1.x framing a raw
//! transport needs: a request head plus fixed-length body out, a status
//! line, headers and a `Content-Length`-bounded body in.

use std::fmt;

use url::Url;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Headers keep insertion order and their original case; lookups are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Replaces every header named `name` with a single value, keeping the
    /// position of the first one.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(index) => {
                self.headers[index].1 = value;
                let mut seen = 0;
                self.headers.retain(|(n, _)| {
                    if !n.eq_ignore_ascii_case(name) {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// Serializes the request head and body.
    ///
    /// Adds `Host` from the URL unless already present, and `Content-Length`
    /// whenever a body is attached. Headers that would split the head (a CR
    /// or LF anywhere, an empty name or a colon in the name) are rejected.
    pub fn to_wire(&self, version: HttpVersion) -> Result<Vec<u8>, ApiError> {
        for (name, value) in &self.headers {
            validate_header(name, value)?;
        }
        let url = Url::parse(&self.url)?;
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let mut head = format!("{} {} {}\r\n", self.method, target, version.as_str());
        if self.header("host").is_none() {
            let host = url
                .host_str()
                .ok_or_else(|| ApiError::InvalidUrl(url::ParseError::EmptyHost))?;
            match url.port() {
                Some(port) => head.push_str(&format!("Host: {host}:{port}\r\n")),
                None => head.push_str(&format!("Host: {host}\r\n")),
            }
        }
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        if let Some(body) = &self.body {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        if let Some(body) = &self.body {
            out.extend_from_slice(body);
        }
        Ok(out)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase from the status line, `None` when the server sent none.
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// Parses a complete HTTP/1.x response.
    ///
    /// The reason phrase is optional (`HTTP/1.0 200` is accepted). The body
    /// is bounded by `Content-Length` when present, otherwise it is the rest
    /// of `raw`. Returns `Incomplete` when more bytes are needed, so a reader
    /// can call this after every chunk.
    pub fn parse(raw: &[u8]) -> Result<Self, ApiError> {
        let head_end = find_subslice(raw, b"\r\n\r\n").ok_or(ApiError::Incomplete)?;
        let head = std::str::from_utf8(&raw[..head_end])
            .map_err(|_| ApiError::MalformedResponse("response head is not UTF-8".into()))?;
        let mut lines = head.split("\r\n");

        let status_line = lines.next().unwrap_or_default();
        let (status, reason) = parse_status_line(status_line)?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ApiError::MalformedResponse(format!("bad header line {line:?}")))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let mut response = HttpResponse {
            status,
            reason,
            headers,
            body: Vec::new(),
        };
        let rest = &raw[head_end + 4..];
        response.body = match response.header("content-length") {
            Some(value) => {
                let declared: usize = value.trim().parse().map_err(|_| {
                    ApiError::MalformedResponse(format!("bad Content-Length {value:?}"))
                })?;
                if rest.len() < declared {
                    return Err(ApiError::Incomplete);
                }
                rest[..declared].to_vec()
            }
            None => rest.to_vec(),
        };
        Ok(response)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn validate_header(name: &str, value: &str) -> Result<(), ApiError> {
    if name.is_empty() || name.contains(|c| matches!(c, '\r' | '\n' | ':')) {
        return Err(ApiError::InvalidHeader(format!("bad header name {name:?}")));
    }
    if value.contains(|c| matches!(c, '\r' | '\n')) {
        return Err(ApiError::InvalidHeader(format!(
            "line break in value of {name}"
        )));
    }
    Ok(())
}

fn parse_status_line(line: &str) -> Result<(u16, Option<String>), ApiError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(ApiError::MalformedResponse(format!(
            "bad status line {line:?}"
        )));
    }
    let code = parts.next().unwrap_or_default();
    if code.len() != 3 {
        return Err(ApiError::MalformedResponse(format!(
            "bad status code {code:?}"
        )));
    }
    let status = code
        .parse()
        .map_err(|_| ApiError::MalformedResponse(format!("bad status code {code:?}")))?;
    let reason = parts
        .next()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string);
    Ok((status, reason))
}
