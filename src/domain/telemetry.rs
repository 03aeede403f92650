// Telemetry data domain models

/// One point of a series. Time is milliseconds since the epoch as sent by the producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time_ms: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time_ms: f64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// A single named reading inside a telemetry message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: f64,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A decoded telemetry message: one timestamp shared by every field.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub timestamp_ms: f64,
    pub fields: Vec<FieldValue>,
    /// Field names whose values could not be coerced to a number.
    pub rejected: Vec<String>,
}

impl TelemetryFrame {
    pub fn new(timestamp_ms: f64, fields: Vec<FieldValue>) -> Self {
        Self {
            timestamp_ms,
            fields,
            rejected: Vec::new(),
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = (&str, Sample)> + '_ {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), Sample::new(self.timestamp_ms, f.value)))
    }
}

/// Port and baud rate of the device link, as announced to clients.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConnectionInfo {
    pub port: String,
    /// Integral JSON numbers such as `9600.0` are accepted; fractional or
    /// out-of-range values are rejected.
    #[serde(deserialize_with = "baud_from_number")]
    pub baud: u32,
}

fn baud_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    use serde::de::Error;

    let raw = f64::deserialize(deserializer)?;
    if raw.is_finite() && raw.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&raw) {
        Ok(raw as u32)
    } else {
        Err(D::Error::custom(format!("invalid baud rate {}", raw)))
    }
}

impl ConnectionInfo {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }
}
