//! JMRI JSON protocol messages
//!
//! Incoming frames are already JSON-decoded by the transport; this module
//! classifies them into [`ServerEvent`]s. Outgoing attribute-change requests
//! are built as [`ServerRequest`]s and serialized with [`ServerRequest::to_json`].

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Default heartbeat when the server's hello does not carry one
pub const DEFAULT_HEARTBEAT_MS: u64 = 15_000;

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has no \"type\" field")]
    MissingType,
    #[error("{kind} message has no usable \"{field}\" field")]
    MissingField { kind: &'static str, field: &'static str },
}

/// A message pushed by the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Hello {
        heartbeat_ms: u64,
    },
    Throttle {
        address: u32,
        data: Map<String, Value>,
    },
    Turnout {
        name: String,
        data: Map<String, Value>,
    },
    Pong,
    Error {
        code: i64,
        message: String,
    },
    Ignored(String),
}

impl ServerEvent {
    pub fn decode(message: &Value) -> Result<Self, ProtocolError> {
        let obj = message.as_object().ok_or(ProtocolError::NotAnObject)?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;
        let data = obj
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match kind {
            "hello" => Ok(ServerEvent::Hello {
                heartbeat_ms: data
                    .get("heartbeat")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_HEARTBEAT_MS),
            }),
            "throttle" => {
                let address = throttle_address(&data).ok_or(ProtocolError::MissingField {
                    kind: "throttle",
                    field: "throttle",
                })?;
                Ok(ServerEvent::Throttle { address, data })
            }
            "turnout" => {
                let name = data
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or(ProtocolError::MissingField {
                        kind: "turnout",
                        field: "name",
                    })?
                    .to_string();
                Ok(ServerEvent::Turnout { name, data })
            }
            "pong" => Ok(ServerEvent::Pong),
            "error" => Ok(ServerEvent::Error {
                code: data.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            other => Ok(ServerEvent::Ignored(other.to_string())),
        }
    }
}

/// Throttles are named "L<address>"; fall back to an explicit address field
fn throttle_address(data: &Map<String, Value>) -> Option<u32> {
    data.get("throttle")
        .and_then(Value::as_str)
        .and_then(|id| id.strip_prefix('L'))
        .and_then(|a| a.parse().ok())
        .or_else(|| {
            data.get("address")
                .and_then(Value::as_u64)
                .and_then(|a| u32::try_from(a).ok())
        })
}

/// Parse a throttle data key of the form "F<n>"
pub fn function_index(key: &str) -> Option<usize> {
    key.strip_prefix('F').and_then(|n| n.parse().ok())
}

/// An attribute-change or bookkeeping request sent to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerRequest {
    AcquireThrottle { address: u32 },
    Speed { address: u32, speed: f32 },
    Direction { address: u32, forward: bool },
    Function { address: u32, index: usize, on: bool },
    SubscribeTurnout { name: String },
    SetTurnout { name: String, state: i64 },
    Ping,
}

impl ServerRequest {
    pub fn to_json(&self) -> Value {
        match self {
            ServerRequest::AcquireThrottle { address } => json!({
                "type": "throttle",
                "data": { "throttle": format!("L{}", address), "address": address }
            }),
            ServerRequest::Speed { address, speed } => json!({
                "type": "throttle",
                "data": { "throttle": format!("L{}", address), "speed": speed }
            }),
            ServerRequest::Direction { address, forward } => json!({
                "type": "throttle",
                "data": { "throttle": format!("L{}", address), "forward": forward }
            }),
            ServerRequest::Function { address, index, on } => {
                let mut data = Map::new();
                data.insert("throttle".into(), json!(format!("L{}", address)));
                data.insert(format!("F{}", index), json!(on));
                json!({ "type": "throttle", "data": data })
            }
            ServerRequest::SubscribeTurnout { name } => json!({
                "type": "turnout",
                "data": { "name": name }
            }),
            ServerRequest::SetTurnout { name, state } => json!({
                "type": "turnout",
                "method": "post",
                "data": { "name": name, "state": state }
            }),
            ServerRequest::Ping => json!({ "type": "ping" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_throttle() {
        let msg = json!({"type": "throttle", "data": {"throttle": "L42", "speed": 0.25, "F3": true}});
        match ServerEvent::decode(&msg).unwrap() {
            ServerEvent::Throttle { address, data } => {
                assert_eq!(address, 42);
                assert_eq!(data.get("speed"), Some(&json!(0.25)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_throttle_without_id_uses_address() {
        let msg = json!({"type": "throttle", "data": {"address": 7, "forward": false}});
        assert!(matches!(
            ServerEvent::decode(&msg),
            Ok(ServerEvent::Throttle { address: 7, .. })
        ));
    }

    #[test]
    fn test_decode_turnout_requires_name() {
        let msg = json!({"type": "turnout", "data": {"state": 2}});
        assert_eq!(
            ServerEvent::decode(&msg),
            Err(ProtocolError::MissingField {
                kind: "turnout",
                field: "name"
            })
        );
    }

    #[test]
    fn test_decode_hello_and_unknown() {
        let hello = json!({"type": "hello", "data": {"JMRI": "5.4", "heartbeat": 13500}});
        assert_eq!(
            ServerEvent::decode(&hello).unwrap(),
            ServerEvent::Hello { heartbeat_ms: 13500 }
        );
        let other = json!({"type": "sensor", "data": {"name": "IS1"}});
        assert_eq!(
            ServerEvent::decode(&other).unwrap(),
            ServerEvent::Ignored("sensor".into())
        );
        assert_eq!(ServerEvent::decode(&json!([1, 2])), Err(ProtocolError::NotAnObject));
        assert_eq!(ServerEvent::decode(&json!({"data": {}})), Err(ProtocolError::MissingType));
    }

    #[test]
    fn test_encode_requests() {
        let f = ServerRequest::Function {
            address: 3,
            index: 12,
            on: true,
        }
        .to_json();
        assert_eq!(f["data"]["F12"], json!(true));
        assert_eq!(f["data"]["throttle"], json!("L3"));

        let t = ServerRequest::SetTurnout {
            name: "LT5".into(),
            state: 4,
        }
        .to_json();
        assert_eq!(t["method"], json!("post"));
        assert_eq!(t["data"]["state"], json!(4));
    }

    #[test]
    fn test_function_index() {
        assert_eq!(function_index("F0"), Some(0));
        assert_eq!(function_index("F28"), Some(28));
        assert_eq!(function_index("speed"), None);
        assert_eq!(function_index("Fx"), None);
    }
}
