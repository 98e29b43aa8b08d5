//! The encrypted transport.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::crypto::ring;
use tracing::info;

use crate::config::TlsInfo;
use crate::error::ServerError;

/// Builds an acceptor from a PEM certificate chain and private key.
pub fn load_acceptor(info: &TlsInfo) -> Result<TlsAcceptor, ServerError> {
    let mut cert_reader = open(&info.cert_path)?;
    let cert_chain =
        certs(&mut cert_reader).collect::<Result<Vec<_>, _>>().map_err(|e| ServerError::resource(&info.cert_path, e))?;
    if cert_chain.is_empty() {
        return Err(ServerError::tls(format!("no certificate in {}", info.cert_path.display())));
    }

    let mut key_reader = open(&info.key_path)?;
    let key = private_key(&mut key_reader)
        .map_err(|e| ServerError::resource(&info.key_path, e))?
        .ok_or_else(|| ServerError::tls(format!("no private key in {}", info.key_path.display())))?;

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(ServerError::tls)?
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(ServerError::tls)?;

    info!(cert = %info.cert_path.display(), "tls enabled");
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn open(path: &Path) -> Result<BufReader<File>, ServerError> {
    File::open(path).map(BufReader::new).map_err(|e| ServerError::resource(path, e))
}
