//! The fixture's fixed TLS identity.
//!
//! One self-signed certificate (CN=localhost, SAN localhost and 127.0.0.1)
//! and its RSA key are embedded as DER blobs, parsed once and shared by every
//! server instance. No chain, no CA: clients must skip verification.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use tracing::trace;

static CERTIFICATE: &[u8] = include_bytes!("../certs/server.crt.der");
static PRIVATE_KEY: &[u8] = include_bytes!("../certs/server.key.der");

static IDENTITY: OnceCell<Arc<CertifiedKey>> = OnceCell::new();

pub fn certificate() -> CertificateDer<'static> {
    CertificateDer::from(CERTIFICATE)
}

pub fn certified_key() -> Result<Arc<CertifiedKey>, rustls::Error> {
    IDENTITY
        .get_or_try_init(|| {
            let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(PRIVATE_KEY));
            let signing_key = rustls::crypto::ring::sign::any_supported_type(&key)?;
            Ok(Arc::new(CertifiedKey::new(vec![certificate()], signing_key)))
        })
        .cloned()
}

/// Hands out the same key for every handshake, whatever host name the
/// client asked for. No virtual hosting.
#[derive(Debug)]
pub struct FixedIdentity {
    key: Arc<CertifiedKey>,
}

impl FixedIdentity {
    pub fn new(key: Arc<CertifiedKey>) -> Self {
        Self { key }
    }
}

impl ResolvesServerCert for FixedIdentity {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        trace!(server_name = ?client_hello.server_name(), "ignoring requested host name");
        Some(Arc::clone(&self.key))
    }
}

/// Server configuration for the fixture: fixed identity, no client auth.
pub fn server_config() -> Result<Arc<ServerConfig>, rustls::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(FixedIdentity::new(certified_key()?)));
    Ok(Arc::new(config))
}
