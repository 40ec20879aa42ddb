// =============================================================================
// TLS Identity Loading
// =============================================================================
//
// Builds the acceptor for the secure subscriber socket from a PEM certificate
// chain and a PEM PKCS#8 private key.  Any failure here is a startup error.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use native_tls::Identity;
use tokio_native_tls::TlsAcceptor;
use tracing::info;

/// Read `cert_path` and `key_path` and build a TLS acceptor.
pub fn load_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let cert = std::fs::read(cert_path)
        .with_context(|| format!("failed to read TLS certificate from {}", cert_path.display()))?;
    let key = std::fs::read(key_path)
        .with_context(|| format!("failed to read TLS key from {}", key_path.display()))?;

    let identity = Identity::from_pkcs8(&cert, &key)
        .context("failed to build TLS identity (expected PEM certificate and PKCS#8 key)")?;
    let acceptor = native_tls::TlsAcceptor::builder(identity)
        .build()
        .context("failed to build TLS acceptor")?;

    info!(cert = %cert_path.display(), "TLS identity loaded");
    Ok(TlsAcceptor::from(acceptor))
}
