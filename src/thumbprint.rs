//! Peer certificate thumbprints.
//!
//! NSX registration payloads carry the SHA-1 (lookup service) or SHA-256
//! (vCenter) digest of the peer's TLS certificate. The digest is taken
//! from whatever leaf the peer presents during a handshake; the chain is
//! deliberately not verified, since the thumbprint itself is what
//! establishes trust on the manager side.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// SHA-1 and SHA-256 digests of a peer's leaf certificate, rendered as
/// uppercase colon-separated hex pairs.
#[derive(Debug, Clone)]
pub struct Thumbprints {
    pub sha1: String,
    pub sha256: String,
}

/// Fetch the certificate thumbprints of `address:port`.
///
/// The handshake is plain blocking socket IO, so it runs on the blocking
/// pool.
pub async fn fetch(address: &str, port: u16) -> Result<Thumbprints> {
    let address = address.to_owned();
    tokio::task::spawn_blocking(move || fetch_blocking(&address, port))
        .await
        .map_err(|e| Error::Connection(format!("thumbprint task failed: {e}")))?
}

fn fetch_blocking(address: &str, port: u16) -> Result<Thumbprints> {
    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert::default()))
        .with_no_client_auth();

    let server_name = ServerName::try_from(address.to_owned())
        .map_err(|_| Error::Connection(format!("invalid server name '{address}'")))?;
    let mut conn = ClientConnection::new(Arc::new(config), server_name)?;

    let mut sock = TcpStream::connect((address, port))?;
    sock.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    sock.set_write_timeout(Some(HANDSHAKE_TIMEOUT))?;

    while conn.is_handshaking() {
        conn.complete_io(&mut sock)?;
    }

    let leaf = conn
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| {
            Error::Connection(format!("no peer certificate presented by {address}:{port}"))
        })?;

    Ok(Thumbprints {
        sha1: hex_pairs(&Sha1::digest(leaf)),
        sha256: hex_pairs(&Sha256::digest(leaf)),
    })
}

fn hex_pairs(digest: &[u8]) -> String {
    digest
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Verifier that accepts any certificate so the handshake completes and
/// the peer's chain becomes readable. Signature checks still use the
/// provider's algorithms; only chain validation is skipped.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl Default for AcceptAnyCert {
    fn default() -> Self {
        Self(Arc::new(rustls::crypto::ring::default_provider()))
    }
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
