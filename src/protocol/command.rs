//! Command definitions
//!
//! Administrative requests addressed to the hub, parsed from a JSON object
//! (`{"command":"list"}`, `{"cmd":"mark","args":["phone"]}`,
//! `{"transmit":"3", ...}`) or from argv-style text (`wifi ssid secret`).

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::{HubError, Result};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Register,
    List,
    Lookup,
    Provision,
    Transmit,
    Unknown,
}

/// Reply key used by a name lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey {
    /// `uuid` answers `{"id": n}`
    Id,

    /// `mark` answers `{"mark": n}`
    Mark,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Associate a display name with the sending connection
    Register { name: Option<String> },

    /// Enumerate connected clients
    List,

    /// Resolve a display name to a client id
    Lookup { name: Option<String>, key: LookupKey },

    /// Persist upstream network credentials
    Provision {
        ssid: Option<String>,
        password: Option<String>,
    },

    /// Forward data to another client. `payload: None` forwards the
    /// received request bytes unchanged.
    Transmit {
        target: Option<u8>,
        payload: Option<Bytes>,
    },

    /// Anything else
    Unknown { word: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Register { .. } => CommandType::Register,
            Command::List => CommandType::List,
            Command::Lookup { .. } => CommandType::Lookup,
            Command::Provision { .. } => CommandType::Provision,
            Command::Transmit { .. } => CommandType::Transmit,
            Command::Unknown { .. } => CommandType::Unknown,
        }
    }

    /// Parse a JSON request body
    ///
    /// Errors only when the body is not a JSON object; an object without a
    /// recognizable command yields `Command::Unknown`.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(trim_request(bytes))
            .map_err(|e| HubError::Protocol(format!("Invalid JSON request: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| HubError::Protocol("JSON request is not an object".to_string()))?;

        // A transmit key wins over any command key
        if let Some(target) = object.get("transmit").and_then(Value::as_str) {
            return Ok(Command::Transmit {
                target: target.trim().parse().ok(),
                payload: None,
            });
        }

        let word = match string_field(object, "command").or_else(|| string_field(object, "cmd")) {
            Some(word) => word,
            None => return Ok(Command::Unknown { word: String::new() }),
        };

        if let Some(args) = object.get("args").and_then(Value::as_array) {
            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push(word);
            argv.extend(args.iter().map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }));
            return Ok(Self::from_argv(&argv));
        }

        Ok(match word.as_str() {
            "register" | "login" => Command::Register {
                name: string_field(object, "name"),
            },
            "list" => Command::List,
            "uuid" => Command::Lookup {
                name: string_field(object, "name"),
                key: LookupKey::Id,
            },
            "mark" => Command::Lookup {
                name: string_field(object, "name"),
                key: LookupKey::Mark,
            },
            "router" | "wifi" => Command::Provision {
                ssid: string_field(object, "ssid"),
                password: string_field(object, "pwd")
                    .or_else(|| string_field(object, "password")),
            },
            "transmit" => Command::Transmit {
                target: None,
                payload: None,
            },
            _ => Command::Unknown { word },
        })
    }

    /// Parse an argv-style text request
    pub fn from_text(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(trim_request(bytes))
            .map_err(|e| HubError::Protocol(format!("Command text is not UTF-8: {}", e)))?;

        let argv: Vec<String> = text.split_whitespace().map(str::to_owned).collect();
        if argv.is_empty() {
            return Err(HubError::Protocol("Empty command text".to_string()));
        }

        let mut command = Self::from_argv(&argv);
        // Forwarded text keeps its own spacing
        if let Command::Transmit {
            payload: Some(payload),
            ..
        } = &mut command
        {
            *payload = Bytes::copy_from_slice(skip_words(text, 2).as_bytes());
        }
        Ok(command)
    }

    /// Interpret an argument vector whose first element is the command word
    pub fn from_argv(argv: &[String]) -> Self {
        let Some((word, rest)) = argv.split_first() else {
            return Command::Unknown { word: String::new() };
        };

        let single = || match rest {
            [arg] => Some(arg.clone()),
            _ => None,
        };

        match word.as_str() {
            "register" | "login" => Command::Register { name: single() },
            "list" => Command::List,
            "uuid" => Command::Lookup {
                name: single(),
                key: LookupKey::Id,
            },
            "mark" => Command::Lookup {
                name: single(),
                key: LookupKey::Mark,
            },
            "router" | "wifi" => match rest {
                [ssid, password] => Command::Provision {
                    ssid: Some(ssid.clone()),
                    password: Some(password.clone()),
                },
                _ => Command::Provision {
                    ssid: None,
                    password: None,
                },
            },
            "transmit" => match rest.split_first() {
                Some((target, data)) => Command::Transmit {
                    target: target.parse().ok(),
                    payload: Some(Bytes::from(data.join(" "))),
                },
                None => Command::Transmit {
                    target: None,
                    payload: None,
                },
            },
            _ => Command::Unknown { word: word.clone() },
        }
    }
}

/// Fetch a string-valued field
fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Text after the first `count` whitespace-separated words
fn skip_words(text: &str, count: usize) -> &str {
    let mut rest = text.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

/// Strip trailing NUL terminators and surrounding whitespace
fn trim_request(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != 0 && !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let start = bytes[..end]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(end);
    &bytes[start..end]
}
