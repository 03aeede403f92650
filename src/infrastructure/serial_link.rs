// Serial port adapter - line reader thread and command writer
use crate::infrastructure::config::SerialSettings;
use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Sends one command line to the device.
pub trait CommandWriter: Send + Sync {
    fn write_line(&self, line: &str) -> Result<()>;
}

pub struct SerialLink {
    name: String,
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let port = serialport::new(&settings.port, settings.baud)
            .timeout(Duration::from_millis(settings.read_timeout_ms))
            .open()
            .with_context(|| format!("Failed to open serial port {}", settings.port))?;

        tracing::info!("Opened serial port {} at {} baud", settings.port, settings.baud);
        Ok(Self {
            name: settings.port.clone(),
            port,
        })
    }

    /// Start the background reader feeding `lines` and return the write half.
    pub fn start(self, lines: mpsc::Sender<String>) -> Result<SerialWriter> {
        let reader = self
            .port
            .try_clone()
            .context("Failed to clone serial port handle")?;

        std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || read_lines(reader, lines))
            .context("Failed to spawn serial reader thread")?;

        Ok(SerialWriter {
            name: self.name,
            port: Mutex::new(self.port),
        })
    }
}

/// Names of the serial ports the OS reports, for diagnostics when opening fails.
pub fn available_port_names() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}

/// Blocking loop: forwards each non-empty line until EOF, a hard I/O error, or until the
/// receiving side goes away. Read timeouts keep any partial line and retry.
pub fn read_lines<R: Read>(reader: R, lines: mpsc::Sender<String>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                tracing::info!("Serial stream ended");
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                buf.clear();
                if line.is_empty() {
                    continue;
                }
                if lines.blocking_send(line).is_err() {
                    tracing::debug!("Line receiver dropped, stopping serial reader");
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => {
                tracing::error!("Serial read failed: {}", e);
                break;
            }
        }
    }
}

pub struct SerialWriter {
    name: String,
    port: Mutex<Box<dyn serialport::SerialPort>>,
}

impl CommandWriter for SerialWriter {
    fn write_line(&self, line: &str) -> Result<()> {
        let mut port = self
            .port
            .lock()
            .map_err(|_| anyhow!("Serial writer for {} is poisoned", self.name))?;
        port.write_all(line.as_bytes())
            .and_then(|_| port.write_all(b"\n"))
            .and_then(|_| port.flush())
            .with_context(|| format!("Failed to write to serial port {}", self.name))
    }
}

/// Stand-in used when the device could not be opened; every write fails.
pub struct DisconnectedWriter {
    pub port: String,
}

impl CommandWriter for DisconnectedWriter {
    fn write_line(&self, _line: &str) -> Result<()> {
        Err(anyhow!("Serial port {} is not open", self.port))
    }
}
