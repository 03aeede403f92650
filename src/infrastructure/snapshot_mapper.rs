// Mapper from stream state to serializable render snapshots
use crate::domain::event_log::{Direction, EventLog, LogEntry};
use crate::domain::series::{Series, SeriesRegistry};
use crate::domain::telemetry::ConnectionInfo;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub connection: Option<ConnectionInfo>,
    pub series_capacity: usize,
    pub log_capacity: usize,
    pub series: Vec<SeriesSnapshot>,
    pub log: Vec<LogEntrySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSnapshot {
    pub name: String,
    pub hue: u16,
    pub color: String,
    pub points: Vec<PointSnapshot>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PointSnapshot {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntrySnapshot {
    pub dir: Direction,
    pub text: String,
}

pub fn to_snapshot(
    series: &SeriesRegistry,
    log: &EventLog,
    connection: Option<ConnectionInfo>,
) -> StateSnapshot {
    StateSnapshot {
        connection,
        series_capacity: series.capacity(),
        log_capacity: log.capacity(),
        series: series.iter().map(series_to_snapshot).collect(),
        log: log.entries().map(entry_to_snapshot).collect(),
    }
}

fn series_to_snapshot(series: &Series) -> SeriesSnapshot {
    let hint = series.hint();
    SeriesSnapshot {
        name: series.name().to_string(),
        hue: hint.hue,
        color: hint.css_color(),
        points: series
            .samples()
            .map(|s| PointSnapshot {
                x: s.time_ms,
                y: s.value,
            })
            .collect(),
    }
}

fn entry_to_snapshot(entry: &LogEntry) -> LogEntrySnapshot {
    LogEntrySnapshot {
        dir: entry.direction,
        text: entry.text.clone(),
    }
}
