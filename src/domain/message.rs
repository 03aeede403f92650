// Inbound message model and classifier
use super::event_log::Direction;
use super::telemetry::{ConnectionInfo, FieldValue, TelemetryFrame};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Keys of a telemetry message that are not field values.
pub const KIND_KEY: &str = "kind";
pub const TIMESTAMP_KEY: &str = "timestamp";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("unknown message kind: {0:?}")]
    UnknownKind(Option<String>),

    #[error("telemetry field {0:?} is not numeric")]
    InvalidFieldValue(String),

    #[error("invalid {kind} message: {reason}")]
    InvalidShape { kind: &'static str, reason: String },
}

impl ClassificationError {
    /// Unknown kinds are expected from newer producers and are not worth a warning.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, ClassificationError::UnknownKind(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Config(ConnectionInfo),
    Telemetry(TelemetryFrame),
    Serial { direction: Direction, body: String },
    Ack { body: String },
}

#[derive(Deserialize)]
struct SerialPayload {
    dir: Direction,
    body: String,
}

#[derive(Deserialize)]
struct AckPayload {
    body: String,
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Config(_) => "config",
            InboundMessage::Telemetry(_) => "telemetry",
            InboundMessage::Serial { .. } => "serial",
            InboundMessage::Ack { .. } => "ack",
        }
    }

    /// Wire form of the message, in the same shape `classify` accepts.
    pub fn to_json(&self) -> Value {
        match self {
            InboundMessage::Config(info) => json!({
                "kind": "config",
                "port": info.port,
                "baud": info.baud,
            }),
            InboundMessage::Telemetry(frame) => {
                let mut object = Map::new();
                object.insert(KIND_KEY.to_string(), Value::from("telemetry"));
                object.insert(TIMESTAMP_KEY.to_string(), number(frame.timestamp_ms));
                for field in &frame.fields {
                    object.insert(field.name.clone(), number(field.value));
                }
                Value::Object(object)
            }
            InboundMessage::Serial { direction, body } => json!({
                "kind": "serial",
                "dir": direction.as_str(),
                "body": body,
            }),
            InboundMessage::Ack { body } => json!({
                "kind": "ack",
                "body": body,
            }),
        }
    }

    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}

/// Parse one raw payload into a typed message.
///
/// Telemetry values that cannot be read as numbers do not fail the message; their names
/// end up in `TelemetryFrame::rejected`.
pub fn classify(raw: &str) -> Result<InboundMessage, ClassificationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ClassificationError::MalformedPayload {
            reason: e.to_string(),
        })?;

    let Value::Object(object) = value else {
        return Err(ClassificationError::MalformedPayload {
            reason: "expected a JSON object".to_string(),
        });
    };

    let kind = match object.get(KIND_KEY) {
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => return Err(ClassificationError::UnknownKind(Some(other.to_string()))),
        None => return Err(ClassificationError::UnknownKind(None)),
    };

    match kind.as_str() {
        "config" => {
            let info: ConnectionInfo = from_object("config", object)?;
            Ok(InboundMessage::Config(info))
        }
        "telemetry" => classify_telemetry(&object).map(InboundMessage::Telemetry),
        "serial" => {
            let payload: SerialPayload = from_object("serial", object)?;
            Ok(InboundMessage::Serial {
                direction: payload.dir,
                body: payload.body,
            })
        }
        "ack" => {
            let payload: AckPayload = from_object("ack", object)?;
            Ok(InboundMessage::Ack { body: payload.body })
        }
        _ => Err(ClassificationError::UnknownKind(Some(kind))),
    }
}

fn from_object<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    object: Map<String, Value>,
) -> Result<T, ClassificationError> {
    serde_json::from_value(Value::Object(object)).map_err(|e| ClassificationError::InvalidShape {
        kind,
        reason: e.to_string(),
    })
}

fn classify_telemetry(object: &Map<String, Value>) -> Result<TelemetryFrame, ClassificationError> {
    let timestamp_ms = object
        .get(TIMESTAMP_KEY)
        .and_then(coerce_number)
        .ok_or_else(|| ClassificationError::InvalidShape {
            kind: "telemetry",
            reason: "missing or non-numeric timestamp".to_string(),
        })?;

    let mut frame = TelemetryFrame::new(timestamp_ms, Vec::new());
    for (name, value) in object {
        if name == KIND_KEY || name == TIMESTAMP_KEY {
            continue;
        }
        match coerce_field(name, value) {
            Ok(v) => frame.fields.push(FieldValue::new(name.clone(), v)),
            Err(_) => frame.rejected.push(name.clone()),
        }
    }

    Ok(frame)
}

pub fn coerce_field(name: &str, value: &Value) -> Result<f64, ClassificationError> {
    coerce_number(value).ok_or_else(|| ClassificationError::InvalidFieldValue(name.to_string()))
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    number.filter(|n| n.is_finite())
}

/// Integral values go out as JSON integers so producers and consumers agree on `1000` vs `1000.0`.
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}
