//! Reply definitions
//!
//! Administrative replies sent back to the requesting client as JSON.

use serde_json::{json, Value};

use crate::registry::ClientRecord;

/// Reply status values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Succeed,
    Failed,
    Unregister,
    Unknown,
    Invalid,
}

impl Status {
    /// Wire spelling of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Succeed => "succeed",
            Status::Failed => "failed",
            Status::Unregister => "unregister",
            Status::Unknown => "unknown",
            Status::Invalid => "invalid",
        }
    }
}

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `{"status": "..."}`
    Status(Status),

    /// `{"id": n}`
    Id(u8),

    /// `{"mark": n}`
    Mark(u8),

    /// One client object
    Client(ClientRecord),

    /// Array of client objects
    Clients(Vec<ClientRecord>),
}

impl Reply {
    /// Create a SUCCEED status reply
    pub fn succeed() -> Self {
        Reply::Status(Status::Succeed)
    }

    /// Create a FAILED status reply
    pub fn failed() -> Self {
        Reply::Status(Status::Failed)
    }

    /// Create an UNREGISTER status reply
    pub fn unregister() -> Self {
        Reply::Status(Status::Unregister)
    }

    /// Create an UNKNOWN status reply
    pub fn unknown() -> Self {
        Reply::Status(Status::Unknown)
    }

    /// Create an INVALID status reply
    pub fn invalid() -> Self {
        Reply::Status(Status::Invalid)
    }

    /// The status carried by this reply, if it is a status reply
    pub fn status(&self) -> Option<Status> {
        match self {
            Reply::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// Build the JSON value of this reply
    pub fn to_value(&self) -> Value {
        match self {
            Reply::Status(status) => json!({ "status": status.as_str() }),
            Reply::Id(id) => json!({ "id": id }),
            Reply::Mark(id) => json!({ "mark": id }),
            Reply::Client(record) => client_value(record),
            Reply::Clients(records) => Value::Array(records.iter().map(client_value).collect()),
        }
    }

    /// Serialize this reply to JSON text
    pub fn to_json(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }
}

/// `{"name", "ip", "port", "sock", "id"}` for one client
fn client_value(record: &ClientRecord) -> Value {
    json!({
        "name": record.name.as_deref().unwrap_or(""),
        "ip": record.ip.to_string(),
        "port": record.port,
        "sock": record.socket.get(),
        "id": record.id,
    })
}
