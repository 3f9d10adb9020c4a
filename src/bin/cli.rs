//! framehub CLI Client
//!
//! Command-line interface for administering a running hub.

use std::time::Duration;

use clap::{Parser, Subcommand};
use framehub::client::{Framing, HubClient};
use serde_json::{json, Value};

/// framehub CLI
#[derive(Parser, Debug)]
#[command(name = "framehub-cli")]
#[command(about = "CLI for a framehub TCP hub")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    server: String,

    /// Name registered before running the command
    #[arg(short, long, default_value = "cli")]
    name: String,

    /// Wrap requests in binary frames instead of bare JSON
    #[arg(short, long)]
    framed: bool,

    /// How long to wait for further replies (milliseconds)
    #[arg(long, default_value = "500")]
    wait_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List connected clients
    List,

    /// Look up the id registered under a name
    Uuid {
        /// The registered name
        name: String,
    },

    /// Change the upstream network credentials
    Router {
        /// Network SSID
        ssid: String,

        /// Network password
        password: String,
    },

    /// Forward a message to another client id
    Transmit {
        /// Destination client id
        id: u8,

        /// Message text
        message: String,
    },

    /// Only register, then print the reply
    Register,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> framehub::Result<()> {
    let framing = if args.framed { Framing::Framed } else { Framing::Legacy };
    let mut client = HubClient::connect(&args.server, framing)?;

    let registered = client.register(&args.name)?;

    let request = match &args.command {
        Commands::Register => {
            print_reply(&registered);
            return Ok(());
        }
        Commands::List => json!({ "command": "list" }),
        Commands::Uuid { name } => json!({ "command": "uuid", "name": name }),
        Commands::Router { ssid, password } => {
            json!({ "command": "router", "ssid": ssid, "pwd": password })
        }
        Commands::Transmit { id, message } => {
            json!({ "transmit": id.to_string(), "data": message })
        }
    };

    client.send_json(&request)?;
    for reply in client.recv_replies(Duration::from_millis(args.wait_ms))? {
        print_reply(&reply);
    }

    Ok(())
}

fn print_reply(reply: &Value) {
    match serde_json::to_string_pretty(reply) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", reply),
    }
}
