use serde_json::{Map, Value};
use thiserror::Error;

/// One structured message unit exchanged over the channel.
///
/// The wire format is a JSON object carrying a `type` discriminator plus
/// arbitrary payload fields:
///
/// ```json
/// {"type": "comment", "id": 7, "body": "ship it"}
/// ```
///
/// The envelope is validated at the boundary: inbound text that is not a
/// JSON object with a string `type` field is rejected. The discriminator is
/// stripped before delivery, so handlers see only the payload fields
/// (`{"id": 7, "body": "ship it"}` above).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The `type` discriminator used for handler routing
    pub kind: String,
    /// Remaining fields of the envelope, passed verbatim to handlers
    pub payload: Value,
}

/// Frame envelope errors
#[derive(Debug, Error)]
pub enum FrameError {
    /// The text is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The envelope has no `type` field
    #[error("frame has no `type` field")]
    MissingType,

    /// The `type` field is not a string
    #[error("frame `type` field is not a string")]
    TypeNotAString,

    /// The payload cannot be merged back into an envelope
    #[error("frame payload is not a JSON object")]
    PayloadNotAnObject,
}

impl Frame {
    /// Create a frame from a discriminator and payload object
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// The post-open credential frame: `{"type":"authentication","token":...}`
    pub fn authentication(token: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("token".to_string(), Value::String(token.to_string()));
        Self {
            kind: "authentication".to_string(),
            payload: Value::Object(payload),
        }
    }

    /// Parse an inbound envelope, splitting off the `type` discriminator.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut map) = value else {
            return Err(FrameError::NotAnObject);
        };

        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(_) => return Err(FrameError::TypeNotAString),
            None => return Err(FrameError::MissingType),
        };

        Ok(Self {
            kind,
            payload: Value::Object(map),
        })
    }

    /// Serialize to outbound wire text, merging the discriminator back into
    /// the payload object. A `Null` payload serializes to a bare
    /// `{"type": ...}` envelope.
    pub fn to_text(&self) -> Result<String, FrameError> {
        let mut map = match &self.payload {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => return Err(FrameError::PayloadNotAnObject),
        };
        map.insert("type".to_string(), Value::String(self.kind.clone()));

        serde_json::to_string(&Value::Object(map)).map_err(FrameError::InvalidJson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_splits_discriminator_from_payload() {
        let frame = Frame::parse(r#"{"type":"comment","id":7}"#).unwrap();
        assert_eq!(frame.kind, "comment");
        assert_eq!(frame.payload, json!({"id": 7}));
    }

    #[test]
    fn test_parse_rejects_malformed_envelopes() {
        assert!(matches!(
            Frame::parse("not json"),
            Err(FrameError::InvalidJson(_))
        ));
        assert!(matches!(Frame::parse("[1,2]"), Err(FrameError::NotAnObject)));
        assert!(matches!(
            Frame::parse(r#"{"id":7}"#),
            Err(FrameError::MissingType)
        ));
        assert!(matches!(
            Frame::parse(r#"{"type":3,"id":7}"#),
            Err(FrameError::TypeNotAString)
        ));
    }

    #[test]
    fn test_authentication_frame_shape() {
        let text = Frame::authentication("tok-A").to_text().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "authentication", "token": "tok-A"}));
    }

    #[test]
    fn test_to_text_round_trips() {
        let frame = Frame::new("task", json!({"id": 12, "done": true}));
        let parsed = Frame::parse(&frame.to_text().unwrap()).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_null_payload_serializes_to_bare_envelope() {
        let frame = Frame::new("ping", Value::Null);
        let value: Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();
        assert_eq!(value, json!({"type": "ping"}));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let frame = Frame::new("bad", json!([1, 2, 3]));
        assert!(matches!(
            frame.to_text(),
            Err(FrameError::PayloadNotAnObject)
        ));
    }
}
