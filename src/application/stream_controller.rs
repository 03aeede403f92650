// Stream controller - Routes classified messages into series and log state
use crate::domain::command::OutboundCommand;
use crate::domain::event_log::{Direction, EventLog};
use crate::domain::message::{InboundMessage, classify};
use crate::domain::series::SeriesRegistry;
use crate::domain::telemetry::{ConnectionInfo, TelemetryFrame};
use std::sync::Arc;
use tokio::sync::watch;

/// What a renderer should refresh after a message has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSignal {
    None,
    ConfigUpdated,
    SeriesUpdated,
    LogUpdated,
    Acked,
}

/// Receives the device link description carried by `config` messages.
pub trait ConnectionInfoSink: Send + Sync {
    fn connection_info(&self, info: &ConnectionInfo);
}

impl ConnectionInfoSink for watch::Sender<Option<ConnectionInfo>> {
    fn connection_info(&self, info: &ConnectionInfo) {
        self.send_replace(Some(info.clone()));
    }
}

/// All mutable state of one monitoring session.
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    pub series: SeriesRegistry,
    pub log: EventLog,
}

impl StreamState {
    pub fn new(series_capacity: usize, log_capacity: usize) -> Self {
        Self {
            series: SeriesRegistry::new(series_capacity),
            log: EventLog::new(log_capacity),
        }
    }
}

pub struct StreamController {
    state: StreamState,
    connection_sink: Arc<dyn ConnectionInfoSink>,
}

impl StreamController {
    pub fn new(state: StreamState, connection_sink: Arc<dyn ConnectionInfoSink>) -> Self {
        Self {
            state,
            connection_sink,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Classify and apply one raw payload. Classification failures are logged and dropped.
    pub fn on_message(&mut self, raw: &str) -> RenderSignal {
        match classify(raw) {
            Ok(message) => self.apply(message),
            Err(e) if e.is_ignorable() => {
                tracing::debug!("Ignoring message: {}", e);
                RenderSignal::None
            }
            Err(e) => {
                tracing::warn!("Dropping message: {}", e);
                RenderSignal::None
            }
        }
    }

    pub fn apply(&mut self, message: InboundMessage) -> RenderSignal {
        tracing::trace!("Applying {} message", message.kind());
        match message {
            InboundMessage::Config(info) => {
                self.connection_sink.connection_info(&info);
                RenderSignal::ConfigUpdated
            }
            InboundMessage::Telemetry(frame) => self.apply_telemetry(&frame),
            InboundMessage::Serial { direction, body } => {
                self.state.log.record(direction, body);
                RenderSignal::LogUpdated
            }
            InboundMessage::Ack { body } => {
                tracing::debug!("Ack: {}", body);
                self.state.log.record(Direction::In, body);
                RenderSignal::Acked
            }
        }
    }

    fn apply_telemetry(&mut self, frame: &TelemetryFrame) -> RenderSignal {
        for name in &frame.rejected {
            tracing::warn!(
                "Skipping non-numeric telemetry field {} at {}",
                name,
                frame.timestamp_ms
            );
        }

        if frame.fields.is_empty() {
            return RenderSignal::None;
        }

        for (name, sample) in frame.samples() {
            self.state.series.record(name, sample);
        }
        RenderSignal::SeriesUpdated
    }

    /// Validate user input for the device. A prepared command is recorded as outbound
    /// traffic and handed back for the transport to send.
    pub fn dispatch_command(&mut self, raw: &str) -> Option<OutboundCommand> {
        let command = OutboundCommand::prepare(raw)?;
        self.state.log.record(Direction::Out, command.body());
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::Series;
    use crate::domain::telemetry::Sample;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<ConnectionInfo>>,
    }

    impl ConnectionInfoSink for RecordingSink {
        fn connection_info(&self, info: &ConnectionInfo) {
            self.seen.lock().unwrap().push(info.clone());
        }
    }

    fn controller_with(series_capacity: usize) -> (StreamController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let controller =
            StreamController::new(StreamState::new(series_capacity, 100), sink.clone());
        (controller, sink)
    }

    fn samples(controller: &StreamController, name: &str) -> Vec<Sample> {
        controller
            .state()
            .series
            .get(name)
            .map(|s| s.samples().copied().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_two_telemetry_messages() {
        let (mut controller, _) = controller_with(600);

        let first = controller
            .on_message(r#"{"kind":"telemetry","timestamp":1000,"temp":21.5,"humidity":60}"#);
        let second = controller
            .on_message(r#"{"kind":"telemetry","timestamp":2000,"temp":22.0,"humidity":59}"#);

        assert_eq!(first, RenderSignal::SeriesUpdated);
        assert_eq!(second, RenderSignal::SeriesUpdated);
        assert_eq!(
            samples(&controller, "temp"),
            vec![Sample::new(1000.0, 21.5), Sample::new(2000.0, 22.0)]
        );
        assert_eq!(
            samples(&controller, "humidity"),
            vec![Sample::new(1000.0, 60.0), Sample::new(2000.0, 59.0)]
        );

        let hues: Vec<(&str, u16)> = controller
            .state()
            .series
            .iter()
            .map(|s| (s.name(), s.hint().hue))
            .collect();
        assert_eq!(hues, vec![("temp", 0), ("humidity", 60)]);
    }

    #[test]
    fn test_multi_field_message_shares_timestamp() {
        let (mut controller, _) = controller_with(10);
        controller.on_message(r#"{"kind":"telemetry","timestamp":100,"a":1,"b":2}"#);

        assert_eq!(samples(&controller, "a"), vec![Sample::new(100.0, 1.0)]);
        assert_eq!(samples(&controller, "b"), vec![Sample::new(100.0, 2.0)]);
    }

    #[test]
    fn test_invalid_field_skips_only_that_field() {
        let (mut controller, _) = controller_with(10);
        let signal =
            controller.on_message(r#"{"kind":"telemetry","timestamp":5,"good":1,"bad":"x"}"#);

        assert_eq!(signal, RenderSignal::SeriesUpdated);
        assert_eq!(samples(&controller, "good"), vec![Sample::new(5.0, 1.0)]);
        assert!(controller.state().series.get("bad").is_none());
    }

    #[test]
    fn test_telemetry_without_valid_fields_renders_nothing() {
        let (mut controller, _) = controller_with(10);
        let signal = controller.on_message(r#"{"kind":"telemetry","timestamp":5,"bad":"x"}"#);

        assert_eq!(signal, RenderSignal::None);
        assert!(controller.state().series.is_empty());
    }

    #[test]
    fn test_601_messages_keep_600_samples() {
        let (mut controller, _) = controller_with(600);
        for i in 1..=601 {
            let raw = format!(r#"{{"kind":"telemetry","timestamp":{},"x":{}}}"#, i, i * 10);
            controller.on_message(&raw);
        }

        let series: &Series = controller.state().series.get("x").unwrap();
        assert_eq!(series.len(), 600);
        assert_eq!(series.first(), Some(&Sample::new(2.0, 20.0)));
    }

    #[test]
    fn test_serial_message_is_logged() {
        let (mut controller, _) = controller_with(10);
        let signal = controller.on_message(r#"{"kind":"serial","dir":"out","body":"LED ON"}"#);

        assert_eq!(signal, RenderSignal::LogUpdated);
        let entries: Vec<_> = controller.state().log.entries().cloned().collect();
        assert_eq!(
            entries,
            vec![crate::domain::event_log::LogEntry::new(Direction::Out, "LED ON")]
        );
    }

    #[test]
    fn test_ack_is_logged_as_inbound() {
        let (mut controller, _) = controller_with(10);
        let signal = controller.on_message(r#"{"kind":"ack","body":"LED ON"}"#);

        assert_eq!(signal, RenderSignal::Acked);
        let entry = controller.state().log.entries().next().unwrap();
        assert_eq!(entry.direction, Direction::In);
        assert_eq!(entry.text, "LED ON");
    }

    #[test]
    fn test_config_is_forwarded_verbatim() {
        let (mut controller, sink) = controller_with(10);
        let signal = controller.on_message(r#"{"kind":"config","port":"COM5","baud":9600}"#);

        assert_eq!(signal, RenderSignal::ConfigUpdated);
        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec![ConnectionInfo::new("COM5", 9600)]
        );
        assert!(controller.state().log.is_empty());
        assert!(controller.state().series.is_empty());
    }

    #[test]
    fn test_config_updates_watch_channel() {
        let (tx, rx) = watch::channel(None);
        let mut controller = StreamController::new(StreamState::default(), Arc::new(tx));
        controller.on_message(r#"{"kind":"config","port":"/dev/ttyACM0","baud":115200}"#);

        assert_eq!(
            *rx.borrow(),
            Some(ConnectionInfo::new("/dev/ttyACM0", 115200))
        );
    }

    #[test]
    fn test_bad_payloads_leave_state_untouched() {
        let (mut controller, sink) = controller_with(10);
        for raw in ["garbage", r#"{"kind":"mystery","x":1}"#, r#"{"kind":"config"}"#, "[]"] {
            assert_eq!(controller.on_message(raw), RenderSignal::None);
        }

        assert!(controller.state().series.is_empty());
        assert!(controller.state().log.is_empty());
        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_command_logs_outbound() {
        let (mut controller, _) = controller_with(10);

        let command = controller.dispatch_command("  LED ON  ").unwrap();
        assert_eq!(command.body(), "LED ON");
        assert!(controller.dispatch_command("   ").is_none());
        assert!(controller.dispatch_command("").is_none());

        let texts: Vec<String> = controller.state().log.entries().map(|e| e.to_string()).collect();
        assert_eq!(texts, vec!["< LED ON"]);
    }
}
