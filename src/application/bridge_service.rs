// Bridge service - Serial lines in, encoded messages out to every connected client
use crate::application::stream_controller::{RenderSignal, StreamController, StreamState};
use crate::domain::command::{OutboundCommand, OutboundMessage};
use crate::domain::event_log::Direction;
use crate::domain::message::InboundMessage;
use crate::domain::telemetry::ConnectionInfo;
use crate::infrastructure::config::StreamSettings;
use crate::infrastructure::line_decoder::{CsvLineDecoder, LineError};
use crate::infrastructure::serial_link::CommandWriter;
use crate::infrastructure::snapshot_mapper::{StateSnapshot, to_snapshot};
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};

struct Pipeline {
    decoder: CsvLineDecoder,
    controller: StreamController,
}

/// Decodes device output, fans it out to subscribers and keeps a server-side copy of the
/// stream state. Decode, publish and apply happen under one lock so subscribers and the
/// local state see messages in the same order.
pub struct BridgeService {
    connection: ConnectionInfo,
    pipeline: Mutex<Pipeline>,
    connection_rx: watch::Receiver<Option<ConnectionInfo>>,
    writer: Arc<dyn CommandWriter>,
    tx: broadcast::Sender<String>,
}

impl BridgeService {
    pub fn new(
        connection: ConnectionInfo,
        columns: Vec<String>,
        limits: &StreamSettings,
        writer: Arc<dyn CommandWriter>,
    ) -> Self {
        let (tx, _) = broadcast::channel(limits.broadcast_buffer);
        let (info_tx, connection_rx) = watch::channel(None);

        let mut controller = StreamController::new(
            StreamState::new(limits.series_capacity, limits.log_capacity),
            Arc::new(info_tx),
        );
        controller.apply(InboundMessage::Config(connection.clone()));

        Self {
            connection,
            pipeline: Mutex::new(Pipeline {
                decoder: CsvLineDecoder::new(columns),
                controller,
            }),
            connection_rx,
            writer,
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// The `config` message every client receives first.
    pub fn connection_message(&self) -> String {
        InboundMessage::Config(self.connection.clone()).encode()
    }

    pub async fn ingest_line(&self, line: &str) -> Option<RenderSignal> {
        self.ingest_line_at(line, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Lines that are not telemetry are passed on as inbound serial text.
    pub async fn ingest_line_at(&self, line: &str, now_ms: i64) -> Option<RenderSignal> {
        let mut pipeline = self.pipeline.lock().await;

        let message = match pipeline.decoder.decode(line, now_ms) {
            Ok(frame) => InboundMessage::Telemetry(frame),
            Err(LineError::Empty) => return None,
            Err(e) => {
                tracing::debug!("Forwarding non-telemetry line ({}): {}", e, line.trim());
                InboundMessage::Serial {
                    direction: Direction::In,
                    body: line.trim().to_string(),
                }
            }
        };

        let payload = message.encode();
        let signal = pipeline.controller.on_message(&payload);
        self.publish(payload);
        Some(signal)
    }

    /// Handle a text frame from a client. Returns the command that was written to the
    /// device, or `None` when the frame was ignored.
    pub async fn handle_client_text(&self, text: &str) -> anyhow::Result<Option<OutboundCommand>> {
        let body = match serde_json::from_str::<OutboundMessage>(text) {
            Ok(OutboundMessage::Command { body }) => body,
            Err(e) => {
                tracing::warn!("Ignoring client message: {}", e);
                return Ok(None);
            }
        };

        let command = {
            let mut pipeline = self.pipeline.lock().await;
            match pipeline.controller.dispatch_command(&body) {
                Some(command) => command,
                None => return Ok(None),
            }
        };

        // The device write runs without the pipeline lock so ingest keeps flowing
        let writer = self.writer.clone();
        let line = command.body().to_string();
        tokio::task::spawn_blocking(move || writer.write_line(&line))
            .await
            .context("Serial writer task failed")??;

        tracing::info!("Sent command: {}", command.body());
        self.publish(
            InboundMessage::Ack {
                body: command.body().to_string(),
            }
            .encode(),
        );
        Ok(Some(command))
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        let pipeline = self.pipeline.lock().await;
        let connection = self.connection_rx.borrow().clone();
        let state = pipeline.controller.state();
        to_snapshot(&state.series, &state.log, connection)
    }

    fn publish(&self, payload: String) {
        if self.tx.send(payload).is_err() {
            tracing::trace!("No subscribers for message");
        }
    }
}
