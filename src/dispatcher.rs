//! Dispatcher Module
//!
//! Executes administrative commands addressed to the hub.
//!
//! ## Registration Gate
//! A connection starts UNREGISTERED and becomes REGISTERED once
//! `register`/`login` sets its name. Under `RegistrationGate::Strict` every
//! other command from an unregistered connection, unknown ones included, is
//! answered `{"status":"unregister"}`. Bodies that cannot be parsed at all
//! are answered `{"status":"invalid"}` before the gate is consulted.
//!
//! ## Error Mapping
//! Handlers return `Result<Vec<Reply>>`; errors never escape `dispatch`:
//! - `UnregisteredAccess` → `unregister`
//! - `UnknownCommand`     → `unknown`
//! - `Protocol`           → `invalid`
//! - everything else      → `failed`

use std::sync::Arc;

use bytes::Bytes;

use crate::config::{Config, ListStyle, RegistrationGate};
use crate::error::{HubError, Result};
use crate::protocol::{Command, CommandType, LookupKey, Reply};
use crate::provision::{CredentialStore, WifiCredentials};
use crate::registry::{ClientRecord, ClientRegistry, SocketId, MAX_NAME_LEN};
use crate::relay::{Relay, RelayOutcome};

/// Body of a request addressed to the hub
#[derive(Debug, Clone, Copy)]
pub enum Body<'a> {
    /// JSON object (legacy raw JSON or a JSON frame payload)
    Json(&'a [u8]),

    /// argv-style command text
    Text(&'a [u8]),

    /// Binary data; the hub has no binary commands
    Binary,
}

/// One request addressed to the hub
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Sending connection
    pub socket: SocketId,

    pub body: Body<'a>,

    /// The received buffer as it arrived, forwarded verbatim by JSON transmit
    pub raw: &'a [u8],
}

/// Command dispatcher
pub struct Dispatcher {
    registry: Arc<ClientRegistry>,
    relay: Relay,
    store: Arc<dyn CredentialStore>,
    gate: RegistrationGate,
    list_style: ListStyle,
}

impl Dispatcher {
    /// Create a dispatcher over the given registry and credential store
    pub fn new(
        registry: Arc<ClientRegistry>,
        store: Arc<dyn CredentialStore>,
        gate: RegistrationGate,
        list_style: ListStyle,
    ) -> Self {
        Self {
            relay: Relay::new(Arc::clone(&registry)),
            registry,
            store,
            gate,
            list_style,
        }
    }

    /// Create a dispatcher using the gate and list style from `config`
    pub fn from_config(
        config: &Config,
        registry: Arc<ClientRegistry>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self::new(registry, store, config.registration_gate, config.list_style)
    }

    /// Handle one request and produce the replies for the sender
    ///
    /// An empty result means nothing is sent back (the sender is gone).
    pub fn dispatch(&self, request: &Request<'_>) -> Vec<Reply> {
        match self.execute(request) {
            Ok(replies) => replies,
            Err(HubError::UnregisteredAccess(socket)) => {
                tracing::debug!("[sock={}]: command refused, not registered", socket);
                vec![Reply::unregister()]
            }
            Err(HubError::UnknownCommand(word)) => {
                tracing::warn!("[sock={}]: unknown command {:?}", request.socket, word);
                vec![Reply::unknown()]
            }
            Err(HubError::Protocol(msg)) => {
                tracing::warn!("[sock={}]: invalid request: {}", request.socket, msg);
                vec![Reply::invalid()]
            }
            Err(e) => {
                tracing::warn!("[sock={}]: command failed: {}", request.socket, e);
                vec![Reply::failed()]
            }
        }
    }

    /// Parse, gate, and route a request
    fn execute(&self, request: &Request<'_>) -> Result<Vec<Reply>> {
        let Some(client) = self.registry.find_by_socket(request.socket) else {
            tracing::debug!("[sock={}]: sender already closed, dropping request", request.socket);
            return Ok(Vec::new());
        };

        let command = match request.body {
            Body::Json(bytes) => Command::from_json(bytes)?,
            Body::Text(bytes) => Command::from_text(bytes)?,
            Body::Binary => Command::Unknown {
                word: "<binary>".to_string(),
            },
        };

        if self.gate == RegistrationGate::Strict
            && !client.is_registered()
            && command.command_type() != CommandType::Register
        {
            return Err(HubError::UnregisteredAccess(request.socket.get()));
        }

        match command {
            Command::Register { name } => Ok(self.register(&client, name)),
            Command::List => Ok(self.list()),
            Command::Lookup { name, key } => Ok(self.lookup(name, key)),
            Command::Provision { ssid, password } => self.provision(ssid, password),
            Command::Transmit { target, payload } => self.transmit(&client, target, payload, request.raw),
            Command::Unknown { word } => Err(HubError::UnknownCommand(word)),
        }
    }

    // =========================================================================
    // Command Handlers
    // =========================================================================

    /// `register`/`login`: name the sending connection
    fn register(&self, client: &ClientRecord, name: Option<String>) -> Vec<Reply> {
        let name = match name {
            Some(name) if !name.is_empty() && name.len() <= MAX_NAME_LEN => name,
            _ => return vec![Reply::failed()],
        };

        if !self.registry.set_name(client.socket, name.as_str()) {
            return Vec::new();
        }

        tracing::info!("[sock={}]: registered as {:?} (id {})", client.socket, name, client.id);
        vec![Reply::succeed()]
    }

    /// `list`: every connected client in accept order
    fn list(&self) -> Vec<Reply> {
        let clients = self.registry.snapshot();
        match self.list_style {
            ListStyle::Array => vec![Reply::Clients(clients)],
            ListStyle::PerClient => clients.into_iter().map(Reply::Client).collect(),
        }
    }

    /// `uuid`/`mark`: resolve a name to an id
    fn lookup(&self, name: Option<String>, key: LookupKey) -> Vec<Reply> {
        let found = name.and_then(|name| self.registry.find_by_name(&name));
        match (found, key) {
            (Some(record), LookupKey::Id) => vec![Reply::Id(record.id)],
            (Some(record), LookupKey::Mark) => vec![Reply::Mark(record.id)],
            (None, _) => vec![Reply::failed()],
        }
    }

    /// `router`/`wifi`: persist upstream credentials
    fn provision(&self, ssid: Option<String>, password: Option<String>) -> Result<Vec<Reply>> {
        let (Some(ssid), Some(password)) = (ssid, password) else {
            return Ok(vec![Reply::failed()]);
        };

        let credentials = WifiCredentials::new(ssid, password)?;
        self.store.store_credentials(&credentials)?;

        tracing::info!("Upstream credentials updated (SSID {:?})", credentials.ssid);
        Ok(vec![Reply::succeed()])
    }

    /// `transmit`: forward data to another client and acknowledge
    fn transmit(
        &self,
        client: &ClientRecord,
        target: Option<u8>,
        payload: Option<Bytes>,
        raw: &[u8],
    ) -> Result<Vec<Reply>> {
        let Some(target) = target else {
            return Ok(vec![Reply::failed()]);
        };

        let data = payload.as_deref().unwrap_or(raw);
        tracing::debug!("[sock={}]: transmit {} bytes to id {}", client.socket, data.len(), target);

        match self.relay.forward(target, data) {
            RelayOutcome::Delivered(_) => Ok(vec![Reply::succeed()]),
            RelayOutcome::NoTarget => Err(HubError::TargetNotFound(target)),
            RelayOutcome::SendFailed(socket) => Err(HubError::Transport(format!(
                "write to sock {} failed",
                socket
            ))),
        }
    }
}
