//! Cookie parsing and storage.
//!
//! # Design
//! Cookies are stored as `Arc<Cookie>`. The jar and every `Page` built from
//! the response that set a cookie hold the same allocation, so a caller can
//! check with `Arc::ptr_eq` that the cookie it was handed is the one the jar
//! will send back. Matching follows RFC 6265: host-only or domain cookies,
//! path-prefix matching, `Secure` only over https. `Expires` is not
//! interpreted; `Max-Age<=0` removes the cookie.

use std::sync::Arc;

use tracing::debug;
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    /// No `Domain` attribute: only the exact origin host matches.
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

enum Parsed {
    Store(Cookie),
    Remove(Cookie),
}

impl Cookie {
    /// Parses a `Set-Cookie` value received from `url`. Returns `None` for
    /// values a user agent must ignore.
    pub fn parse(set_cookie: &str, url: &Url) -> Option<Cookie> {
        match parse_set_cookie(set_cookie, url)? {
            Parsed::Store(cookie) | Parsed::Remove(cookie) => Some(cookie),
        }
    }

    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_match(&host, &self.domain, url)
        };
        domain_ok && path_match(url.path(), &self.path) && (!self.secure || url.scheme() == "https")
    }

    fn same_slot(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

fn parse_set_cookie(set_cookie: &str, url: &Url) -> Option<Parsed> {
    let mut parts = set_cookie.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();

    let mut cookie = Cookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        domain: host.clone(),
        host_only: true,
        path: default_path(url),
        secure: false,
        http_only: false,
    };
    let mut expired = false;

    for attribute in parts {
        let (key, val) = match attribute.split_once('=') {
            Some((key, val)) => (key.trim(), val.trim()),
            None => (attribute.trim(), ""),
        };
        if key.eq_ignore_ascii_case("domain") {
            let domain = val.trim_start_matches('.').to_ascii_lowercase();
            if domain.is_empty() {
                continue;
            }
            if !domain_match(&host, &domain, url) {
                debug!(%domain, %host, "rejecting cookie for foreign domain");
                return None;
            }
            cookie.domain = domain;
            cookie.host_only = false;
        } else if key.eq_ignore_ascii_case("path") {
            if val.starts_with('/') {
                cookie.path = val.to_string();
            }
        } else if key.eq_ignore_ascii_case("secure") {
            cookie.secure = true;
        } else if key.eq_ignore_ascii_case("httponly") {
            cookie.http_only = true;
        } else if key.eq_ignore_ascii_case("max-age") {
            if let Ok(seconds) = val.parse::<i64>() {
                expired = seconds <= 0;
            }
        }
    }

    Some(if expired {
        Parsed::Remove(cookie)
    } else {
        Parsed::Store(cookie)
    })
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn domain_match(host: &str, domain: &str, url: &Url) -> bool {
    if host == domain {
        return true;
    }
    let is_ip = matches!(url.host(), Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)));
    !is_ip && host.ends_with(domain) && host[..host.len() - domain.len()].ends_with('.')
}

fn path_match(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Cookies received so far, shared with the pages that delivered them.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Arc<Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Stores one `Set-Cookie` value received from `url`, replacing any
    /// cookie with the same name, domain and path. Returns the stored
    /// cookie, or `None` when it was rejected or removed.
    pub fn store(&mut self, url: &Url, set_cookie: &str) -> Option<Arc<Cookie>> {
        let parsed = parse_set_cookie(set_cookie, url)?;
        let (cookie, keep) = match parsed {
            Parsed::Store(cookie) => (cookie, true),
            Parsed::Remove(cookie) => (cookie, false),
        };
        self.cookies.retain(|existing| !existing.same_slot(&cookie));
        if !keep {
            debug!(name = %cookie.name, "cookie removed");
            return None;
        }
        debug!(name = %cookie.name, domain = %cookie.domain, path = %cookie.path, "cookie stored");
        let cookie = Arc::new(cookie);
        self.cookies.push(Arc::clone(&cookie));
        Some(cookie)
    }

    /// Cookies to send to `url`, longest path first.
    pub fn cookies_for(&self, url: &Url) -> Vec<Arc<Cookie>> {
        let mut matching: Vec<_> = self
            .cookies
            .iter()
            .filter(|cookie| cookie.matches(url))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
    }

    /// Value for a `Cookie` request header, if any cookie applies.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for(url);
        if cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();
        Some(pairs.join("; "))
    }
}
