//! engine.io v4 / socket.io v4 framing with the msgpack parser
//!
//! The upstream runs socket.io with `socket.io-msgpack-parser`, so the two
//! layers travel differently over the websocket:
//!
//! - engine.io control packets are text frames: a single type digit and an
//!   optional payload (`0{"sid":...}` open, `2` ping, `3` pong, `1` close).
//! - socket.io packets are binary frames, each one a msgpack map
//!   `{type, nsp, data?, id?}`.
//!
//! ```text
//! text    0{"sid":"...","pingInterval":25000,"pingTimeout":20000}   open
//! text    2                                                        ping
//! binary  {type: 0, nsp: "/"}                                      connect
//! binary  {type: 2, nsp: "/", data: ["saleFeed", {...}]}           event
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "/";

const CONNECT: u8 = 0;
const DISCONNECT: u8 = 1;
const EVENT: u8 = 2;
const ACK: u8 = 3;
const CONNECT_ERROR: u8 = 4;
const BINARY_EVENT: u8 = 5;
const BINARY_ACK: u8 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty frame")]
    Empty,
    #[error("Unknown engine.io packet type {0:?}")]
    UnknownEngineType(char),
    #[error("Unknown socket.io packet type {0}")]
    UnknownSocketType(u8),
    #[error("Binary attachment packets are not supported")]
    BinaryUnsupported,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Failed to encode packet: {0}")]
    Encode(String),
}

/// Handshake parameters sent by the server in the open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

/// engine.io packet carried by a text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    /// Text message; the msgpack parser never produces one.
    Message(String),
    Upgrade,
    Noop,
}

/// socket.io packet carried by a binary frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: Option<u64>,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

/// msgpack wire shape of a socket.io packet.
#[derive(Debug, Serialize, Deserialize)]
struct WirePacket {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default = "default_namespace")]
    nsp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Decode one websocket text frame.
pub fn decode_text(frame: &str) -> Result<EnginePacket, ProtocolError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(EnginePacket::Open)
            .map_err(|e| ProtocolError::InvalidPayload(e.to_string())),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => Ok(EnginePacket::Message(rest.to_string())),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownEngineType(other)),
    }
}

/// Decode one websocket binary frame into a socket.io packet.
pub fn decode_binary(frame: &[u8]) -> Result<SocketPacket, ProtocolError> {
    if frame.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let wire: WirePacket =
        rmp_serde::from_slice(frame).map_err(|e| ProtocolError::InvalidPayload(e.to_string()))?;
    let namespace = wire.nsp;

    match wire.kind {
        CONNECT => Ok(SocketPacket::Connect {
            namespace,
            data: wire.data,
        }),
        DISCONNECT => Ok(SocketPacket::Disconnect { namespace }),
        EVENT => {
            let mut args = into_args(wire.data)?;
            if args.is_empty() {
                return Err(ProtocolError::InvalidPayload("event without name".into()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(ProtocolError::InvalidPayload(format!(
                        "event name {}",
                        other
                    )));
                }
            };
            Ok(SocketPacket::Event {
                namespace,
                ack_id: wire.id,
                name,
                args,
            })
        }
        ACK => Ok(SocketPacket::Ack {
            namespace,
            ack_id: wire.id,
            args: into_args(wire.data)?,
        }),
        CONNECT_ERROR => Ok(SocketPacket::ConnectError {
            namespace,
            data: wire.data,
        }),
        BINARY_EVENT | BINARY_ACK => Err(ProtocolError::BinaryUnsupported),
        other => Err(ProtocolError::UnknownSocketType(other)),
    }
}

fn into_args(data: Option<Value>) -> Result<Vec<Value>, ProtocolError> {
    match data {
        Some(Value::Array(args)) => Ok(args),
        None => Ok(Vec::new()),
        Some(other) => Err(ProtocolError::InvalidPayload(format!(
            "expected argument array, got {}",
            other
        ))),
    }
}

fn encode(packet: &WirePacket) -> Result<Vec<u8>, ProtocolError> {
    rmp_serde::to_vec_named(packet).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Pong answering a server ping, echoing its probe payload.
pub fn encode_pong(payload: &str) -> String {
    format!("3{}", payload)
}

/// Connect to the default namespace.
pub fn encode_connect() -> Result<Vec<u8>, ProtocolError> {
    encode(&WirePacket {
        kind: CONNECT,
        nsp: default_namespace(),
        data: None,
        id: None,
    })
}

/// Emit an event on the default namespace.
pub fn encode_event(name: &str, data: &Value) -> Result<Vec<u8>, ProtocolError> {
    encode(&WirePacket {
        kind: EVENT,
        nsp: default_namespace(),
        data: Some(Value::Array(vec![Value::String(name.to_string()), data.clone()])),
        id: None,
    })
}
