//! Core types for the conversation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation
pub type ConversationId = String;

/// Unique identifier for a message
pub type MessageId = String;

/// Unique identifier for a persona
pub type PersonaId = String;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A titled reference link attached to a finalized assistant message
/// when search-style options were used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// Display title of the source
    pub title: String,
    /// Link to the source
    pub url: String,
}

/// Modifiers attached to a user submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    /// Answer using a (simulated) web search
    #[serde(default)]
    pub search_web: bool,
    /// Answer using a (simulated) search of a specific site
    #[serde(rename = "searchUrl", skip_serializing_if = "Option::is_none")]
    pub search_url: Option<String>,
    /// References to attached images
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl SendOptions {
    /// Whether any search-style modifier is set
    pub fn wants_search(&self) -> bool {
        self.search_web || self.search_url.is_some()
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID (UUID)
    pub id: MessageId,
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content; empty while the message is provisional
    pub content: String,
    /// When the message was created or finalized
    pub timestamp: DateTime<Utc>,
    /// Intermediate progress lines revealed while the assistant "thinks"
    #[serde(rename = "thinkingSteps", default, skip_serializing_if = "Vec::is_empty")]
    pub thinking_steps: Vec<String>,
    /// True while the assistant message is still under construction
    #[serde(rename = "isProvisional", default)]
    pub is_provisional: bool,
    /// True when the message was finalized with an error instead of content
    #[serde(rename = "isError", default)]
    pub is_error: bool,
    /// Sources cited by a search-backed answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// What the user asked to search for, if anything
    #[serde(rename = "searchDirective", skip_serializing_if = "Option::is_none")]
    pub search_directive: Option<String>,
    /// References to images attached by the user
    #[serde(rename = "attachedImages", default, skip_serializing_if = "Vec::is_empty")]
    pub attached_images: Vec<String>,
}

impl Message {
    /// Create a complete user message from the submitted text and options.
    ///
    /// The search directive mirrors the submission: the message text itself
    /// for a web search, the target URL for a site search.
    pub fn user(content: impl Into<String>, options: &SendOptions) -> Self {
        let content = content.into();
        let search_directive = if options.search_web {
            Some(content.clone())
        } else {
            options.search_url.clone()
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content,
            timestamp: Utc::now(),
            thinking_steps: Vec::new(),
            is_provisional: false,
            is_error: false,
            citations: Vec::new(),
            search_directive,
            attached_images: options.images.clone(),
        }
    }

    /// Create a provisional assistant message showing the first thinking step
    pub fn provisional(id: MessageId, first_step: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            thinking_steps: vec![first_step.into()],
            is_provisional: true,
            is_error: false,
            citations: Vec::new(),
            search_directive: None,
            attached_images: Vec::new(),
        }
    }

    /// Turn this provisional message into its finalized form, keeping the id
    /// and the full thinking history.
    pub fn finalized(mut self, content: impl Into<String>, citations: Vec<Citation>) -> Self {
        self.content = content.into();
        self.citations = citations;
        self.is_provisional = false;
        self.timestamp = Utc::now();
        self
    }

    /// Finalize with an error indication instead of real content
    pub fn finalized_with_error(mut self, description: impl Into<String>) -> Self {
        self.content = description.into();
        self.is_error = true;
        self.is_provisional = false;
        self.timestamp = Utc::now();
        self
    }
}

/// Maximum number of characters taken from the first user message
/// when deriving a conversation title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Title given to conversations before their first message
pub const UNTITLED: &str = "New conversation";

/// An ordered log of messages between the user and one assistant persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID (UUID)
    pub id: ConversationId,
    /// Display title; derived from the first user message until renamed
    pub title: String,
    /// Messages in strict chronological send order
    pub messages: Vec<Message>,
    /// When the conversation last received a user message
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
    /// Persona answering in this conversation (by id, non-owning)
    #[serde(rename = "personaId")]
    pub persona_id: PersonaId,
}

impl Conversation {
    /// Create a new empty conversation bound to the default persona
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: UNTITLED.to_string(),
            messages: Vec::new(),
            last_updated: Utc::now(),
            persona_id: crate::registry::DEFAULT_PERSONA_ID.to_string(),
        }
    }

    /// The provisional assistant message currently in flight, if any
    pub fn provisional_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_provisional)
    }

    /// Derive a title from the first user message text
    pub(crate) fn derive_title(text: &str) -> String {
        text.chars().take(TITLE_MAX_CHARS).collect()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// A named configuration of assistant behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Unique persona ID; `"default"` for the built-in persona
    pub id: PersonaId,
    /// Display name
    pub name: String,
    /// System prompt handed to the synthesizer
    pub system_prompt: String,
    /// Short description shown in pickers
    pub description: String,
    /// Accent color (hex) used by the presentation layer
    pub color: String,
}

/// A persona as submitted for creation, before an id is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaDraft {
    pub name: String,
    pub system_prompt: String,
    pub description: String,
    pub color: String,
}

/// Subscription plan of the active user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

/// The active user identity and running counters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Subscription plan
    pub plan: Plan,
    /// Completed assistant exchanges; increments by one per finalization
    pub message_count: u64,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Guest".to_string(),
            email: String::new(),
            plan: Plan::Free,
            message_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_creation() {
        let msg = Message::user("Hello", &SendOptions::default());
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.is_provisional);
        assert!(msg.search_directive.is_none());
    }

    #[test]
    fn test_search_directive_from_options() {
        let web = SendOptions {
            search_web: true,
            ..Default::default()
        };
        let msg = Message::user("rust async", &web);
        assert_eq!(msg.search_directive.as_deref(), Some("rust async"));

        let site = SendOptions {
            search_url: Some("example.com".to_string()),
            ..Default::default()
        };
        let msg = Message::user("rust async", &site);
        assert_eq!(msg.search_directive.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_provisional_finalize_keeps_id_and_steps() {
        let provisional = Message::provisional("m-1".to_string(), "Reading the question...");
        assert!(provisional.is_provisional);
        assert!(provisional.content.is_empty());

        let finalized = provisional.finalized("Answer.", Vec::new());
        assert_eq!(finalized.id, "m-1");
        assert!(!finalized.is_provisional);
        assert!(!finalized.is_error);
        assert_eq!(finalized.thinking_steps.len(), 1);
        assert_eq!(finalized.content, "Answer.");
    }

    #[test]
    fn test_error_finalization_is_marked() {
        let provisional = Message::provisional("m-2".to_string(), "step");
        let failed = provisional.finalized_with_error("could not answer");
        assert!(failed.is_error);
        assert!(!failed.is_provisional);
    }

    #[test]
    fn test_title_derivation_truncates_by_chars() {
        let title = Conversation::derive_title("a question that is far longer than thirty characters");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);

        // Multi-byte input must not split a character
        let title = Conversation::derive_title(&"多模态".repeat(12));
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_new_conversation_is_untitled_and_empty() {
        let conv = Conversation::new();
        assert_eq!(conv.title, UNTITLED);
        assert!(conv.messages.is_empty());
        assert!(conv.provisional_message().is_none());
    }
}
