//! Conversation export.
//!
//! Produces a standalone JSON document with the conversation title and
//! the `(role, content, timestamp)` triple of every message, plus a
//! filesystem-safe filename derived from the title.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChatResult;
use crate::types::{Conversation, MessageRole};

/// File extension used for exported conversations
pub const EXPORT_EXTENSION: &str = "json";

/// One exported message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The export document for one conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub title: String,
    pub messages: Vec<ExportedMessage>,
}

impl ExportDocument {
    /// Serialize to indented JSON
    pub fn to_json(&self) -> ChatResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a previously exported document
    pub fn from_json(json: &str) -> ChatResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Filename this document should be written to
    pub fn filename(&self) -> String {
        export_filename(&self.title)
    }

    /// Write the document into a directory and return the file path
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> ChatResult<PathBuf> {
        let path = dir.as_ref().join(self.filename());
        std::fs::write(&path, self.to_json()?)?;
        debug!(path = %path.display(), "exported conversation");
        Ok(path)
    }
}

/// Build the export document for a conversation
pub fn export_conversation(conversation: &Conversation) -> ExportDocument {
    ExportDocument {
        title: conversation.title.clone(),
        messages: conversation
            .messages
            .iter()
            .map(|m| ExportedMessage {
                role: m.role,
                content: m.content.clone(),
                timestamp: m.timestamp,
            })
            .collect(),
    }
}

/// Derive a filename from a conversation title: every non-alphanumeric
/// character becomes an underscore, the extension is fixed.
pub fn export_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.{EXPORT_EXTENSION}")
}
