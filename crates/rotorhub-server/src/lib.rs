//! rotorhub production server.
//!
//! Wraps [`rotorhub_core`]'s session service with a QUIC transport, a
//! credential-based identity provider, system time and OS randomness.
//!
//! # Components
//!
//! - [`Server`]: accept loop; one task per connection and per stream
//! - [`Dispatcher`]: one request per bidirectional stream, then optional
//!   character streaming
//! - [`CredentialStore`]: static username/password identity provider
//! - [`QuinnTransport`]: QUIC transport via Quinn
//! - [`SystemEnv`]: production environment

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod dispatch;
mod error;
mod system_env;
mod transport;

use std::{net::SocketAddr, sync::Arc};

pub use auth::{CredentialStore, IdentityProvider};
pub use dispatch::{Dispatch, Dispatcher, error_response};
pub use error::ServerError;
use rotorhub_core::{FramedIo, ServiceConfig, SessionService};
pub use system_env::SystemEnv;
pub use transport::{QuinnConnection, QuinnTransport};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4433")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Accepted callers
    pub credentials: CredentialStore,
    /// Session service tuning
    pub service: ServiceConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4433".to_string(),
            cert_path: None,
            key_path: None,
            credentials: CredentialStore::new(),
            service: ServiceConfig::default(),
        }
    }
}

/// Production rotorhub server.
pub struct Server {
    dispatcher: Dispatcher<SystemEnv>,
    transport: QuinnTransport,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if no credentials are configured or the TLS
    ///   material is unusable
    /// - `ServerError::Transport` if the address cannot be bound
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        if config.credentials.is_empty() {
            return Err(ServerError::Config(
                "at least one user must be configured (--user NAME:PASSWORD)".to_string(),
            ));
        }

        let service = Arc::new(SessionService::new(SystemEnv::new(), config.service));
        let dispatcher = Dispatcher::new(service, Arc::new(config.credentials));

        let transport = QuinnTransport::bind(
            &config.bind_address,
            config.cert_path.as_deref(),
            config.key_path.as_deref(),
        )?;

        Ok(Self { dispatcher, transport })
    }

    /// Run the accept loop until [`Server::shutdown`] closes the endpoint.
    ///
    /// # Errors
    ///
    /// `ServerError::Transport` if the local address cannot be read.
    pub async fn run(&self) -> Result<(), ServerError> {
        tracing::info!("server starting on {}", self.transport.local_addr()?);

        loop {
            match self.transport.accept().await {
                Ok(Some(conn)) => {
                    let dispatcher = self.dispatcher.clone();
                    tokio::spawn(async move {
                        handle_connection(conn, dispatcher).await;
                    });
                },
                Ok(None) => {
                    tracing::info!("endpoint closed, server stopping");
                    return Ok(());
                },
                Err(e) => {
                    tracing::error!("accept error: {}", e);
                },
            }
        }
    }

    /// Stop accepting connections and close existing ones.
    pub fn shutdown(&self) {
        self.transport.close();
    }

    /// Local address the server is bound to.
    ///
    /// # Errors
    ///
    /// `ServerError::Transport` if the socket address is unavailable.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Session service backing this server.
    pub fn service(&self) -> &SessionService<SystemEnv> {
        self.dispatcher.service()
    }
}

async fn handle_connection(conn: QuinnConnection, dispatcher: Dispatcher<SystemEnv>) {
    let peer = conn.remote_addr();
    tracing::debug!(%peer, "new connection");

    loop {
        match conn.accept_bi().await {
            Ok((send, recv)) => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let mut framed = FramedIo::new(recv, send);
                    if let Err(e) = dispatcher.serve(&mut framed).await {
                        tracing::debug!(%peer, "stream error: {}", e);
                    }

                    let (_, mut send) = framed.into_parts();
                    if let Err(e) = send.finish() {
                        tracing::debug!(%peer, "finish failed: {}", e);
                    }
                });
            },
            Err(e) => {
                tracing::debug!(%peer, "connection closed: {}", e);
                break;
            },
        }
    }
}
