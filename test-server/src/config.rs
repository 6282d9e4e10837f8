//! Settings for the single-exchange TLS fixture.
//!
//! The defaults reproduce the fixture's fixed contract: loopback on an
//! OS-assigned port, a backlog of one, a 100-byte request body, a 50 second
//! completion wait and the "Hello World!" page.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Page written back to the client.
pub const HELLO_WORLD: &str = "<html><body><h1>Hello World!</h1></body></html>";

/// Number of body bytes the fixture reads after the request headers.
pub const DEFAULT_BODY_LEN: usize = 100;

/// Upper bound on how long the server thread holds the connection open.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(50);

/// Web name of the ASCII encoding, advertised in `Content-Encoding`.
pub const ASCII_WEB_NAME: &str = "us-ascii";

#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub bind: SocketAddr,
    pub backlog: u32,
    /// Fixed-size read, independent of any `Content-Length` the client sends.
    pub body_len: usize,
    pub wait_timeout: Duration,
    pub body: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            backlog: 1,
            body_len: DEFAULT_BODY_LEN,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            body: HELLO_WORLD.to_string(),
        }
    }
}

impl FixtureConfig {
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_body_len(mut self, body_len: usize) -> Self {
        self.body_len = body_len;
        self
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The complete HTTP/1.0 response, status line through body.
    ///
    /// `Content-Length` is the byte length of `body`, so the declared and
    /// actual lengths always agree.
    pub fn response(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.0 200\r\n\
             Connection: close\r\n\
             Content-Type: text/html\r\n\
             Content-Encoding: {ASCII_WEB_NAME}\r\n\
             Content-Length: {}\r\n\
             \r\n",
            self.body.len()
        );
        let mut out = head.into_bytes();
        out.extend_from_slice(self.body.as_bytes());
        out
    }
}
