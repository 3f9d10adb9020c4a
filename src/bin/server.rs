//! framehub Server Binary
//!
//! Provisions default credentials if needed and starts the TCP hub.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use framehub::config::{IdPolicy, ListStyle, RegistrationGate};
use framehub::provision::{ensure_credentials, FileCredentialStore, WifiCredentials};
use framehub::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// framehub Server
#[derive(Parser, Debug)]
#[command(name = "framehub-server")]
#[command(about = "TCP hub with client registry, command dispatch and frame relay")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:8888")]
    listen: String,

    /// Maximum concurrently connected clients
    #[arg(short, long, default_value = "6")]
    max_clients: usize,

    /// Credential record file
    #[arg(short, long, default_value = "./framehub_data/wifi.cred")]
    credentials: String,

    /// SSID provisioned when no credentials are stored
    #[arg(long, default_value = framehub::provision::DEFAULT_ROUTER_SSID)]
    default_ssid: String,

    /// Password provisioned when no credentials are stored
    #[arg(long, default_value = framehub::provision::DEFAULT_ROUTER_PASSWORD)]
    default_password: String,

    /// How client ids are assigned
    #[arg(long, value_enum, default_value_t = IdArg::PeerAddress)]
    id_policy: IdArg,

    /// Shape of the `list` reply
    #[arg(long, value_enum, default_value_t = ListArg::Array)]
    list_style: ListArg,

    /// Accept every command before a client registers
    #[arg(long)]
    open_registration: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IdArg {
    PeerAddress,
    Sequential,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListArg {
    Array,
    PerClient,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,framehub=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("framehub Server v{}", framehub::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Credential file: {}", args.credentials);

    // Make sure upstream credentials exist before clients can change them
    let store = Arc::new(FileCredentialStore::new(&args.credentials));
    let defaults = match WifiCredentials::new(&args.default_ssid, &args.default_password) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid default credentials: {}", e);
            std::process::exit(1);
        }
    };
    match ensure_credentials(store.as_ref(), &defaults) {
        Ok(c) => tracing::info!("Upstream SSID: {:?}", c.ssid),
        Err(e) => {
            tracing::error!("Failed to provision credentials: {}", e);
            std::process::exit(1);
        }
    }

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_clients(args.max_clients)
        .id_policy(match args.id_policy {
            IdArg::PeerAddress => IdPolicy::PeerAddress,
            IdArg::Sequential => IdPolicy::Sequential,
        })
        .list_style(match args.list_style {
            ListArg::Array => ListStyle::Array,
            ListArg::PerClient => ListStyle::PerClient,
        })
        .registration_gate(if args.open_registration {
            RegistrationGate::Open
        } else {
            RegistrationGate::Strict
        })
        .build();

    // Start server
    let server = match Server::bind(config, store) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
