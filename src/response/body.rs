//! Canonical `{status, message, data}` envelope builder.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::ResponseStatus;

/// Standard reply shape shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Outcome category.
    pub status: ResponseStatus,
    /// Human-readable message, or a structured payload for diagnostic endpoints.
    pub message: Value,
    /// Payload; `null` unless non-empty.
    pub data: Option<Value>,
}

/// Optional caller input to [`build`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseInput {
    /// Message overriding the status default.
    #[serde(default)]
    pub message: Option<Value>,
    /// Payload to attach.
    #[serde(default)]
    pub data: Option<Value>,
}

impl ResponseInput {
    /// Input carrying only a message.
    pub fn message(message: impl Into<Value>) -> Self {
        Self {
            message: Some(message.into()),
            data: None,
        }
    }

    /// Input carrying only a payload.
    pub fn data(data: impl Into<Value>) -> Self {
        Self {
            message: None,
            data: Some(data.into()),
        }
    }

    /// Attach a payload.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Build the envelope for `status` from optional caller input.
pub fn build(status: ResponseStatus, input: Option<ResponseInput>) -> Envelope {
    let input = input.unwrap_or_default();

    let message = match input.message {
        Some(message) if !is_blank(&message) => message,
        _ => Value::String(status.default_message().to_string()),
    };

    Envelope {
        status,
        message,
        data: input.data.filter(has_entries),
    }
}

fn is_blank(message: &Value) -> bool {
    match message {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn has_entries(data: &Value) -> bool {
    match data {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}
