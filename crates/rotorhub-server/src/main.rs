//! rotorhub server binary.
//!
//! # Usage
//!
//! ```bash
//! # Self-signed certificate (development)
//! rotorhub-server --bind 0.0.0.0:4433 --user alice:secret
//!
//! # TLS certificate (production), users from the environment
//! ROTORHUB_USERS=alice:secret,bob:hunter2 \
//!     rotorhub-server --bind 0.0.0.0:4433 --cert cert.pem --key key.pem
//! ```

use clap::Parser;
use rotorhub_core::{ExistencePolicy, ServiceConfig};
use rotorhub_server::{CredentialStore, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// rotorhub session server
#[derive(Parser, Debug)]
#[command(name = "rotorhub-server")]
#[command(about = "Multi-tenant rotor cipher session server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:4433")]
    bind: String,

    /// Path to TLS certificate (PEM format)
    #[arg(short, long)]
    cert: Option<String>,

    /// Path to TLS private key (PEM format)
    #[arg(short, long)]
    key: Option<String>,

    /// Accepted caller as NAME:PASSWORD (repeatable)
    #[arg(short, long = "user", env = "ROTORHUB_USERS", value_delimiter = ',')]
    users: Vec<String>,

    /// Upper bound on randomly generated wheels per request
    #[arg(long, default_value_t = rotorhub_core::DEFAULT_MAX_WHEELS)]
    max_wheels: usize,

    /// Report other users' sessions as not found instead of forbidden
    #[arg(long)]
    conceal_foreign: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("rotorhub server starting");
    tracing::info!("binding to {}", args.bind);

    if args.cert.is_none() || args.key.is_none() {
        tracing::warn!("no TLS certificate provided, using self-signed certificate");
        tracing::warn!("this is NOT suitable for production use");
    }

    let credentials = CredentialStore::from_specs(&args.users)?;
    tracing::info!(users = credentials.len(), "credentials loaded");

    let existence_policy =
        if args.conceal_foreign { ExistencePolicy::Conceal } else { ExistencePolicy::Disclose };

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        cert_path: args.cert,
        key_path: args.key,
        credentials,
        service: ServiceConfig { max_wheels: args.max_wheels, existence_policy },
    };

    let server = Server::bind(config)?;

    tracing::info!("server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
