//! TLS for both legs: termination on the listener, verification of
//! `https` upstreams.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::{ClientConfig, RootCertStore};

use crate::config::schema::{TlsConfig, UpstreamTlsConfig};

/// Make aws-lc-rs the process-wide rustls provider. Later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Load the listener's certificate chain and private key (PEM).
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    install_crypto_provider();
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    for (kind, path) in [("Certificate", cert_path), ("Private key", key_path)] {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} file not found: {}", kind, path.display()),
            ));
        }
    }

    tracing::info!(cert = %cert_path.display(), "Loading TLS certificate");
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Client configuration for `https` upstreams: the webpki roots plus the
/// certificates in `ca_cert_path`, if set.
pub fn upstream_client_config(tls: &UpstreamTlsConfig) -> io::Result<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = &tls.ca_cert_path {
        let added = add_pem_certificates(&mut roots, Path::new(path))?;
        tracing::info!(path = %path, certificates = added, "Trusting extra upstream CA certificates");
    }

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}

fn add_pem_certificates(roots: &mut RootCertStore, path: &Path) -> io::Result<usize> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("CA file {}: {}", path.display(), e))
    })?;

    let mut added = 0;
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        roots
            .add(cert?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        added += 1;
    }

    if added == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no certificates found in {}", path.display()),
        ));
    }
    Ok(added)
}
