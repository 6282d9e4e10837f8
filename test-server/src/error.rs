//! Errors raised while starting or running the TLS fixture.
//!
//! Bind failures surface synchronously from `TlsTestServer::start`. Every
//! other variant is captured on the server thread and handed back through
//! `TlsTestServer::error`; each names the stage of the exchange that failed.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to start the server thread: {0}")]
    Runtime(#[source] io::Error),

    #[error("failed to load the TLS identity: {0}")]
    Identity(#[from] rustls::Error),

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("reading request headers failed: {0}")]
    ReadHeaders(#[source] io::Error),

    /// Also raised when the stream ends before the fixed-size body arrives.
    #[error("reading request body failed: {0}")]
    ReadBody(#[source] io::Error),

    #[error("writing response failed: {0}")]
    WriteResponse(#[source] io::Error),

    /// Neither a complete exchange nor `stop` arrived within the wait bound.
    #[error("no complete exchange within {timeout:?}")]
    Stalled { timeout: Duration },

    #[error("server thread panicked")]
    Panicked,
}
