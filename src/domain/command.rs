// Outbound command model
use serde::{Deserialize, Serialize};

/// A validated instruction for the device. The body is trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    body: String,
}

/// Wire form of messages sent from a client towards the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutboundMessage {
    Command { body: String },
}

impl OutboundCommand {
    /// Returns `None` when the text is blank; nothing should be sent or logged then.
    pub fn prepare(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            body: trimmed.to_string(),
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&OutboundMessage::from(self.clone()))
    }
}

impl From<OutboundCommand> for OutboundMessage {
    fn from(command: OutboundCommand) -> Self {
        OutboundMessage::Command {
            body: command.into_body(),
        }
    }
}
