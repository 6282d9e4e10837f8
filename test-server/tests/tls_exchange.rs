//! Drives `TlsTestServer` with a raw rustls client.
//!
//! # Design
//! Each test starts a fresh server on an OS-assigned loopback port and talks
//! to it over a blocking `rustls::StreamOwned`, so the bytes on the wire are
//! checked exactly. Every socket has a read timeout; a stuck handshake fails
//! the test instead of hanging it.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConnection, StreamOwned};
use test_server::{insecure_client_config, FixtureConfig, ServeError, TlsTestServer};

const IO_TIMEOUT: Duration = Duration::from_secs(10);
const EXPECTED_RESPONSE: &str = "HTTP/1.0 200\r\n\
                                 Connection: close\r\n\
                                 Content-Type: text/html\r\n\
                                 Content-Encoding: us-ascii\r\n\
                                 Content-Length: 47\r\n\
                                 \r\n\
                                 <html><body><h1>Hello World!</h1></body></html>";

fn connect(server: &TlsTestServer) -> StreamOwned<ClientConnection, TcpStream> {
    let tcp = TcpStream::connect(server.local_addr()).unwrap();
    tcp.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    let name = ServerName::from(server.address());
    let conn = ClientConnection::new(insecure_client_config().unwrap(), name).unwrap();
    StreamOwned::new(conn, tcp)
}

fn post_with_body(stream: &mut impl Write, body_len: usize) {
    let head = format!(
        "POST /nothing.html HTTP/1.0\r\nHost: localhost\r\nContent-Length: {body_len}\r\n\r\n"
    );
    stream.write_all(head.as_bytes()).unwrap();
    stream.write_all(&vec![0u8; body_len]).unwrap();
    stream.flush().unwrap();
}

/// Reads until `expected` bytes have arrived. The server holds the
/// connection open until stopped, so reading to end would block.
fn read_exactly(stream: &mut impl Read, expected: usize) -> Vec<u8> {
    let mut buf = vec![0u8; expected];
    stream.read_exact(&mut buf).unwrap();
    buf
}

#[test]
fn single_exchange_returns_fixed_page() {
    let mut server = TlsTestServer::start().unwrap();
    let mut stream = connect(&server);

    post_with_body(&mut stream, 100);
    let response = read_exactly(&mut stream, EXPECTED_RESPONSE.len());
    assert_eq!(String::from_utf8(response).unwrap(), EXPECTED_RESPONSE);

    server.stop();
    assert!(server.join(IO_TIMEOUT), "server thread did not exit after stop");
    assert!(server.error().is_none(), "unexpected error: {:?}", server.error());
}

#[test]
fn connection_closes_after_stop() {
    let mut server = TlsTestServer::start().unwrap();
    let mut stream = connect(&server);

    post_with_body(&mut stream, 100);
    read_exactly(&mut stream, EXPECTED_RESPONSE.len());
    server.stop();

    let mut rest = Vec::new();
    match stream.read_to_end(&mut rest) {
        Ok(_) => assert!(rest.is_empty()),
        Err(err) => assert_eq!(err.kind(), ErrorKind::UnexpectedEof),
    }
    assert!(server.join(IO_TIMEOUT));
}

#[test]
fn handshake_presents_the_embedded_certificate() {
    let server = TlsTestServer::start().unwrap();
    let mut stream = connect(&server);

    post_with_body(&mut stream, 100);
    read_exactly(&mut stream, EXPECTED_RESPONSE.len());

    let presented = stream.conn.peer_certificates().unwrap();
    assert_eq!(presented.len(), 1);
    assert_eq!(presented[0], test_server::identity::certificate());
    server.stop();
}

#[test]
fn identity_ignores_requested_host_name() {
    let server = TlsTestServer::start().unwrap();
    let tcp = TcpStream::connect(server.local_addr()).unwrap();
    tcp.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    let name = ServerName::try_from("some-other-host.example").unwrap();
    let conn = ClientConnection::new(insecure_client_config().unwrap(), name).unwrap();
    let mut stream = StreamOwned::new(conn, tcp);

    post_with_body(&mut stream, 100);
    let response = read_exactly(&mut stream, EXPECTED_RESPONSE.len());
    assert!(response.starts_with(b"HTTP/1.0 200"));
    server.stop();
}

#[test]
fn timeout_releases_server_without_stop() {
    let config = FixtureConfig::default().with_wait_timeout(Duration::from_secs(2));
    let mut server = TlsTestServer::start_with(config).unwrap();
    let mut stream = connect(&server);

    post_with_body(&mut stream, 100);
    read_exactly(&mut stream, EXPECTED_RESPONSE.len());

    assert!(server.join(IO_TIMEOUT), "wait timeout did not release the server");
    assert!(server.error().is_none());
}

#[test]
fn custom_body_and_length_are_honoured() {
    let config = FixtureConfig::default().with_body_len(8).with_body("ok");
    let server = TlsTestServer::start_with(config).unwrap();
    let mut stream = connect(&server);

    post_with_body(&mut stream, 8);
    let expected = "HTTP/1.0 200\r\n\
                    Connection: close\r\n\
                    Content-Type: text/html\r\n\
                    Content-Encoding: us-ascii\r\n\
                    Content-Length: 2\r\n\
                    \r\n\
                    ok";
    let response = read_exactly(&mut stream, expected.len());
    assert_eq!(String::from_utf8(response).unwrap(), expected);
    server.stop();
}

#[test]
fn plaintext_client_is_captured_as_handshake_error() {
    let mut server = TlsTestServer::start().unwrap();
    let mut tcp = TcpStream::connect(server.local_addr()).unwrap();
    tcp.set_read_timeout(Some(IO_TIMEOUT)).unwrap();
    tcp.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();

    let mut rest = Vec::new();
    let _ = tcp.read_to_end(&mut rest);

    assert!(server.join(IO_TIMEOUT));
    let err = server.error().expect("handshake failure should be recorded");
    assert!(matches!(*err, ServeError::Handshake(_)), "got {err}");
}

#[test]
fn request_cut_short_is_captured() {
    let mut server = TlsTestServer::start().unwrap();
    let mut stream = connect(&server);

    stream
        .write_all(b"POST / HTTP/1.0\r\nHost: localhost\r\n\r\nshort")
        .unwrap();
    stream.flush().unwrap();
    stream.conn.send_close_notify();
    stream.flush().unwrap();
    stream.sock.shutdown(std::net::Shutdown::Write).unwrap();

    assert!(server.join(IO_TIMEOUT));
    let err = server.error().expect("short body should be recorded");
    assert!(matches!(*err, ServeError::ReadBody(_)), "got {err}");
}

#[test]
fn stop_releases_server_with_no_client() {
    let mut server = TlsTestServer::start().unwrap();
    server.stop();
    assert!(server.join(IO_TIMEOUT), "server stayed parked in accept");
    assert!(server.error().is_none(), "unexpected error: {:?}", server.error());
}

#[test]
fn stop_releases_server_stalled_in_handshake() {
    let mut server = TlsTestServer::start().unwrap();
    // Connected but silent: the server is left waiting for a ClientHello.
    let tcp = TcpStream::connect(server.local_addr()).unwrap();
    std::thread::sleep(Duration::from_millis(50));

    server.stop();
    assert!(server.join(IO_TIMEOUT), "server stayed parked in the handshake");
    assert!(server.error().is_none(), "unexpected error: {:?}", server.error());
    drop(tcp);
}

#[test]
fn stop_releases_server_waiting_for_body() {
    let mut server = TlsTestServer::start().unwrap();
    let mut stream = connect(&server);
    stream
        .write_all(b"POST / HTTP/1.0\r\nHost: localhost\r\n\r\nfour")
        .unwrap();
    stream.flush().unwrap();
    std::thread::sleep(Duration::from_millis(50));

    server.stop();
    assert!(server.join(IO_TIMEOUT), "server stayed parked reading the body");
    assert!(server.error().is_none());
}

#[test]
fn silent_client_is_captured_as_stalled() {
    let timeout = Duration::from_millis(200);
    let config = FixtureConfig::default().with_wait_timeout(timeout);
    let mut server = TlsTestServer::start_with(config).unwrap();
    let tcp = TcpStream::connect(server.local_addr()).unwrap();

    assert!(server.join(IO_TIMEOUT), "wait bound did not cover the handshake");
    let err = server.error().expect("stalled handshake should be recorded");
    assert!(
        matches!(*err, ServeError::Stalled { timeout: t } if t == timeout),
        "got {err}"
    );
    drop(tcp);
}

#[test]
fn no_client_within_bound_is_captured_as_stalled() {
    let timeout = Duration::from_millis(200);
    let config = FixtureConfig::default().with_wait_timeout(timeout);
    let mut server = TlsTestServer::start_with(config).unwrap();

    assert!(server.join(IO_TIMEOUT), "wait bound did not cover accept");
    let err = server.error().expect("missing client should be recorded");
    assert!(matches!(*err, ServeError::Stalled { .. }), "got {err}");
}
