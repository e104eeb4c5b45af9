//! Frame (de)serialization at the transport boundary.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::messages::ServerMessage;

/// Protocol error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Frame has no string `type` field")]
    MissingType,
    #[error("Invalid `{kind}` payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A message the core handles itself.
    Message(ServerMessage),
    /// Any other message, passed through verbatim.
    Unrecognized(Value),
}

/// Parse one inbound text frame.
///
/// # Errors
/// Returns error if the frame is not a JSON object with a string `type`,
/// or if a known message type carries an invalid payload.
pub fn parse_server_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !ServerMessage::is_known_type(kind) {
        tracing::trace!(kind, "Passing through unrecognized message");
        return Ok(InboundFrame::Unrecognized(value));
    }

    let kind = kind.to_string();
    serde_json::from_value(value)
        .map(InboundFrame::Message)
        .map_err(|source| ProtocolError::InvalidPayload { kind, source })
}

/// Encode an outbound message as a text frame.
///
/// # Errors
/// Returns error if the message cannot be serialized.
pub fn encode_frame<T: Serialize + ?Sized>(message: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ClientMessage, TerminalChunk};

    #[test]
    fn test_parse_terminal_chunk() {
        let frame = parse_server_frame(r#"{"type":"terminal_chunk","seq":3,"data":"hi"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Message(ServerMessage::TerminalChunk(TerminalChunk {
                seq: 3,
                data: "hi".to_string(),
            }))
        );
    }

    #[test]
    fn test_unrecognized_passes_through_verbatim() {
        let text = r#"{"type":"chat_message","body":{"text":"hello"}}"#;
        let frame = parse_server_frame(text).unwrap();
        let InboundFrame::Unrecognized(value) = frame else {
            panic!("Expected unrecognized frame");
        };
        assert_eq!(value["body"]["text"], "hello");
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_server_frame("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_missing_type() {
        let err = parse_server_frame(r#"{"seq":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingType));
    }

    #[test]
    fn test_known_type_with_bad_payload() {
        let err = parse_server_frame(r#"{"type":"terminal_chunk","seq":"one"}"#).unwrap_err();
        match err {
            ProtocolError::InvalidPayload { kind, .. } => assert_eq!(kind, "terminal_chunk"),
            other => panic!("Unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_frame() {
        let json = encode_frame(&ClientMessage::Ack { ack_seq: 7 }).unwrap();
        assert_eq!(json, r#"{"type":"ack","ack_seq":7}"#);
    }
}
