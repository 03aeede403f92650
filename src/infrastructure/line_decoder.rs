// CSV line decoder for the device's ASCII telemetry output
use crate::domain::telemetry::{FieldValue, TelemetryFrame};
use thiserror::Error;

pub const COUNTER_EXT_FIELD: &str = "counter_ext";

const COUNTER_MODULUS: i64 = 256;

#[derive(Debug, Error, PartialEq)]
pub enum LineError {
    #[error("empty line")]
    Empty,
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("column {column} has unparsable value {text:?}")]
    Parse { column: String, text: String },
}

/// Decodes `counter,value,value,...` lines.
///
/// The first column is an 8-bit counter that wraps; every wrap is tracked so the
/// extended counter keeps increasing across overflows.
#[derive(Debug, Clone)]
pub struct CsvLineDecoder {
    columns: Vec<String>,
    prev_counter: Option<u8>,
    overflow: u64,
}

impl CsvLineDecoder {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            prev_counter: None,
            overflow: 0,
        }
    }

    pub fn decode(&mut self, line: &str, now_ms: i64) -> Result<TelemetryFrame, LineError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(LineError::Empty);
        }

        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != self.columns.len() {
            return Err(LineError::ColumnCount {
                expected: self.columns.len(),
                found: parts.len(),
            });
        }

        let counter = self.parse_counter(parts[0])?;
        let mut fields = Vec::with_capacity(parts.len() + 1);
        fields.push(FieldValue::new(self.columns[0].clone(), f64::from(counter)));
        for (column, text) in self.columns.iter().zip(&parts).skip(1) {
            let value = text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| LineError::Parse {
                    column: column.clone(),
                    text: text.to_string(),
                })?;
            fields.push(FieldValue::new(column.clone(), value));
        }

        // Only a fully parsed line advances the counter state
        if let Some(prev) = self.prev_counter {
            if counter < prev {
                self.overflow += 1;
            }
        }
        self.prev_counter = Some(counter);
        let counter_ext = self.overflow * COUNTER_MODULUS as u64 + u64::from(counter);
        fields.push(FieldValue::new(COUNTER_EXT_FIELD, counter_ext as f64));

        Ok(TelemetryFrame::new(now_ms as f64, fields))
    }

    fn parse_counter(&self, text: &str) -> Result<u8, LineError> {
        text.trim()
            .parse::<i64>()
            .map(|raw| raw.rem_euclid(COUNTER_MODULUS) as u8)
            .map_err(|_| LineError::Parse {
                column: self.columns[0].clone(),
                text: text.to_string(),
            })
    }
}
