//! rustls server configuration wired to the certificate store.

use std::sync::Arc;

use rustls::ServerConfig;

use crate::tls::store::CertificateStore;

/// Build a server config that asks `store` for the certificate on every handshake.
pub fn server_config(store: Arc<CertificateStore>) -> Result<ServerConfig, rustls::Error> {
    let mut config = ServerConfig::builder_with_provider(super::crypto_provider())
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(store);
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}
