//! Ephemeral HTTPS endpoint that serves exactly one exchange.
//!
//! # Design
//! `start` binds the listener on the caller's thread so the address is known
//! before it returns, then moves the listener and a single-threaded tokio
//! runtime onto a dedicated service thread. That thread accepts once,
//! handshakes with the fixed identity, discards the request, writes the fixed
//! response and parks on the completion latch until `stop` or the wait
//! timeout. The exchange itself is raced against the same latch and bound,
//! so a client that never connects or stalls mid-handshake cannot pin the
//! thread. Failures on the service thread are captured for `error`, never
//! propagated to the caller.

use std::net::{IpAddr, SocketAddr};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rustls::ServerConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::runtime::Runtime;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::config::FixtureConfig;
use crate::error::ServeError;
use crate::identity;
use crate::latch::{Latch, LatchWaiter, Wake};

type ErrorSlot = Arc<Mutex<Option<Arc<ServeError>>>>;

#[derive(Debug)]
pub struct TlsTestServer {
    addr: SocketAddr,
    latch: Latch,
    error: ErrorSlot,
    done: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl TlsTestServer {
    pub fn start() -> Result<Self, ServeError> {
        Self::start_with(FixtureConfig::default())
    }

    pub fn start_with(config: FixtureConfig) -> Result<Self, ServeError> {
        let tls = identity::server_config()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ServeError::Runtime)?;
        let listener = {
            let _guard = runtime.enter();
            bind(config.bind, config.backlog)?
        };
        let addr = listener.local_addr().map_err(|source| ServeError::Bind {
            addr: config.bind,
            source,
        })?;
        info!(%addr, "tls test server bound");

        let latch = Latch::new();
        let waiter = latch.waiter();
        let error = ErrorSlot::default();
        let slot = Arc::clone(&error);
        let (done_tx, done) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(format!("tls-test-server-{}", addr.port()))
            .spawn(move || {
                let result = run(runtime, listener, tls, config, waiter);
                if let Err(err) = result {
                    warn!(error = %err, "tls test server failed");
                    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(err));
                }
                let _ = done_tx.send(());
            })
            .map_err(ServeError::Runtime)?;

        Ok(Self {
            addr,
            latch,
            error,
            done,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn address(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Releases the server thread from whatever it is waiting on: a client,
    /// a handshake, the request, or the final wait. The thread closes the
    /// connection itself; calling this more than once is harmless.
    pub fn stop(&self) {
        debug!(addr = %self.addr, "stop requested");
        self.latch.set();
    }

    /// Last error captured on the server thread, if any.
    pub fn error(&self) -> Option<Arc<ServeError>> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waits up to `timeout` for the server thread to exit. Returns whether
    /// it did. A panic on the server thread is recorded as `Panicked`.
    pub fn join(&mut self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => return false,
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                *self.error.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::new(ServeError::Panicked));
            }
        }
        true
    }
}

impl Drop for TlsTestServer {
    fn drop(&mut self) {
        self.latch.set();
    }
}

fn bind(addr: SocketAddr, backlog: u32) -> Result<TcpListener, ServeError> {
    let to_bind_error = |source| ServeError::Bind { addr, source };
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(to_bind_error)?;
    socket.bind(addr).map_err(to_bind_error)?;
    socket.listen(backlog).map_err(to_bind_error)
}

fn run(
    runtime: Runtime,
    listener: TcpListener,
    tls: Arc<ServerConfig>,
    config: FixtureConfig,
    waiter: LatchWaiter,
) -> Result<(), ServeError> {
    runtime.block_on(serve_once(listener, tls, config, waiter))
}

async fn serve_once(
    listener: TcpListener,
    tls: Arc<ServerConfig>,
    config: FixtureConfig,
    mut waiter: LatchWaiter,
) -> Result<(), ServeError> {
    let (mut stream, peer) = tokio::select! {
        served = exchange(&listener, tls, &config) => served?,
        wake = waiter.wait_ref(config.wait_timeout) => {
            return match wake {
                Wake::Signaled | Wake::Abandoned => {
                    info!(?wake, "tls test server released before the exchange finished");
                    Ok(())
                }
                Wake::TimedOut => Err(ServeError::Stalled {
                    timeout: config.wait_timeout,
                }),
            };
        }
    };
    drop(listener);

    match waiter.wait(config.wait_timeout).await {
        Wake::Signaled => debug!("released by stop"),
        Wake::TimedOut => warn!(timeout = ?config.wait_timeout, "stop never arrived"),
        Wake::Abandoned => debug!("server handle dropped"),
    }

    if let Err(err) = stream.shutdown().await {
        debug!(error = %err, "close_notify not delivered");
    }
    drop(stream);
    info!(%peer, "tls test server closed");
    Ok(())
}

/// Accept, handshake, discard the request and write the fixed response.
/// Every step may park on the peer, so callers race this against the latch.
async fn exchange(
    listener: &TcpListener,
    tls: Arc<ServerConfig>,
    config: &FixtureConfig,
) -> Result<(BufReader<TlsStream<TcpStream>>, SocketAddr), ServeError> {
    let (tcp, peer) = listener.accept().await.map_err(ServeError::Accept)?;
    debug!(%peer, "accepted connection");

    let stream = TlsAcceptor::from(tls)
        .accept(tcp)
        .await
        .map_err(ServeError::Handshake)?;
    debug!(%peer, "handshake complete");

    let mut stream = BufReader::new(stream);
    let discarded = discard_headers(&mut stream)
        .await
        .map_err(ServeError::ReadHeaders)?;
    debug!(lines = discarded, "request headers discarded");

    let mut body = vec![0u8; config.body_len];
    stream
        .read_exact(&mut body)
        .await
        .map_err(ServeError::ReadBody)?;

    stream
        .write_all(&config.response())
        .await
        .map_err(ServeError::WriteResponse)?;
    stream.flush().await.map_err(ServeError::WriteResponse)?;
    debug!(%peer, "response written");
    Ok((stream, peer))
}

/// Reads header lines up to the blank line ending the head, or end of
/// stream. Returns the number of lines consumed.
async fn discard_headers<R>(reader: &mut BufReader<R>) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let mut count = 0;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(count);
        }
        count += 1;
        if line == b"\r\n" || line == b"\n" {
            return Ok(count);
        }
    }
}
