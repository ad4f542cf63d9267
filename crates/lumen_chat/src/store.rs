//! In-memory conversation store.
//!
//! The store is the single owner of all conversations and messages.
//! Every mutation goes through one of the operations below, which keep two
//! invariants: the store always contains at least one conversation, and a
//! conversation never holds more than one provisional assistant message.

use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::types::{
    Conversation, ConversationId, Message, MessageId, MessageRole, PersonaId, SendOptions,
    UNTITLED,
};

/// Ordered collection of conversations with one active conversation.
///
/// New conversations are inserted at the head, so the ordering is
/// newest-first as in the sidebar of a chat client.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_id: ConversationId,
}

impl ConversationStore {
    /// Create a store holding a single fresh conversation
    pub fn new() -> Self {
        let conversation = Conversation::new();
        let active_id = conversation.id.clone();
        Self {
            conversations: vec![conversation],
            active_id,
        }
    }

    /// All conversations, newest first
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Number of conversations; always at least one
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// The store is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Id of the active conversation
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// The active conversation
    pub fn active(&self) -> &Conversation {
        self.conversations
            .iter()
            .find(|c| c.id == self.active_id)
            .expect("active conversation must exist")
    }

    /// Look up a conversation by id
    pub fn get(&self, id: &str) -> ChatResult<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ChatError::ConversationNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> ChatResult<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ChatError::ConversationNotFound(id.to_string()))
    }

    /// Insert a new empty conversation at the head and make it active
    pub fn create_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::new();
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.active_id = id.clone();
        debug!(conversation = %id, "created conversation");
        id
    }

    /// Make an existing conversation the active one
    pub fn select_conversation(&mut self, id: &str) -> ChatResult<()> {
        self.get(id)?;
        self.active_id = id.to_string();
        Ok(())
    }

    /// Remove a conversation.
    ///
    /// If the removed conversation was active, the next remaining one (in
    /// the current ordering) becomes active; if none remain a fresh
    /// conversation is created. The store is never empty after this call.
    pub fn delete_conversation(&mut self, id: &str) -> ChatResult<()> {
        let index = self
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ChatError::ConversationNotFound(id.to_string()))?;
        self.conversations.remove(index);
        debug!(conversation = %id, "deleted conversation");

        if self.active_id == id {
            match self.conversations.first() {
                Some(next) => self.active_id = next.id.clone(),
                None => {
                    self.create_conversation();
                }
            }
        }
        assert!(
            !self.conversations.is_empty(),
            "store must never be left empty"
        );
        Ok(())
    }

    /// Remove every conversation and start over with a single fresh one
    pub fn clear_all(&mut self) -> ConversationId {
        self.conversations.clear();
        debug!("cleared all conversations");
        self.create_conversation()
    }

    /// Explicitly rename a conversation
    pub fn rename_conversation(&mut self, id: &str, title: impl Into<String>) -> ChatResult<()> {
        let conversation = self.get_mut(id)?;
        conversation.title = title.into();
        Ok(())
    }

    /// Point a conversation at a different persona
    pub fn set_persona(&mut self, id: &str, persona_id: impl Into<PersonaId>) -> ChatResult<()> {
        let conversation = self.get_mut(id)?;
        conversation.persona_id = persona_id.into();
        Ok(())
    }

    /// Append a complete user message.
    ///
    /// The first user message of a conversation also derives its title.
    pub fn append_user_message(
        &mut self,
        id: &str,
        text: &str,
        options: &SendOptions,
    ) -> ChatResult<MessageId> {
        let conversation = self.get_mut(id)?;
        let message = Message::user(text, options);
        let message_id = message.id.clone();
        if conversation.messages.is_empty() && conversation.title == UNTITLED {
            conversation.title = Conversation::derive_title(text);
        }
        conversation.last_updated = message.timestamp;
        conversation.messages.push(message);
        debug!(conversation = %id, message = %message_id, "appended user message");
        Ok(message_id)
    }

    /// Insert an assistant message, or replace the one with the same id in
    /// place, preserving its position.
    ///
    /// This is how the orchestrator streams updates without reordering
    /// history: growing thinking steps and the final content all arrive
    /// through this single operation.
    pub fn append_or_update_assistant_message(
        &mut self,
        id: &str,
        message: Message,
    ) -> ChatResult<()> {
        let conversation = self.get_mut(id)?;
        match conversation.messages.iter().position(|m| m.id == message.id) {
            Some(index) => {
                assert!(
                    conversation.messages[index].role == MessageRole::Assistant,
                    "user messages are immutable and must not be replaced"
                );
                conversation.messages[index] = message;
            }
            None => {
                if message.is_provisional {
                    assert!(
                        conversation.provisional_message().is_none(),
                        "at most one provisional message per conversation"
                    );
                }
                conversation.messages.push(message);
            }
        }
        Ok(())
    }

    /// Whether a conversation currently holds a provisional message
    pub fn has_provisional(&self, id: &str) -> ChatResult<bool> {
        Ok(self.get(id)?.provisional_message().is_some())
    }

    /// Remove a message by id; used when an exchange is cancelled
    pub fn remove_message(&mut self, id: &str, message_id: &str) -> ChatResult<()> {
        let conversation = self.get_mut(id)?;
        let index = conversation
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))?;
        conversation.messages.remove(index);
        Ok(())
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_starts_with_one_active_conversation() {
        let store = ConversationStore::new();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active().id, store.active_id());
    }

    #[test]
    fn test_create_inserts_at_head_and_activates() {
        let mut store = ConversationStore::new();
        let first = store.active_id().to_string();
        let second = store.create_conversation();
        assert_eq!(store.conversations()[0].id, second);
        assert_eq!(store.conversations()[1].id, first);
        assert_eq!(store.active_id(), second);
    }

    #[test]
    fn test_select_unknown_conversation_fails() {
        let mut store = ConversationStore::new();
        let err = store.select_conversation("nope").unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound(_)));
    }

    #[test]
    fn test_delete_active_activates_next() {
        let mut store = ConversationStore::new();
        let first = store.active_id().to_string();
        let second = store.create_conversation();
        store.delete_conversation(&second).unwrap();
        assert_eq!(store.active_id(), first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_last_conversation_recreates_one() {
        let mut store = ConversationStore::new();
        let only = store.active_id().to_string();
        store.delete_conversation(&only).unwrap();
        assert_eq!(store.len(), 1);
        assert_ne!(store.active_id(), only);
        assert!(store.active().messages.is_empty());
    }

    #[test]
    fn test_clear_all_leaves_one_fresh_conversation() {
        let mut store = ConversationStore::new();
        store.create_conversation();
        store.create_conversation();
        let active = store.active_id().to_string();
        store
            .append_user_message(&active, "hi", &SendOptions::default())
            .unwrap();
        let fresh = store.clear_all();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_id(), fresh);
        assert!(store.active().messages.is_empty());
    }

    #[test]
    fn test_first_message_derives_title() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        store
            .append_user_message(&id, "How do multimodal models work internally?", &SendOptions::default())
            .unwrap();
        let conv = store.get(&id).unwrap();
        // Raw 30-character slice, trailing space included
        assert_eq!(conv.title, "How do multimodal models work ");

        // Second message leaves the title alone
        store
            .append_user_message(&id, "And another thing", &SendOptions::default())
            .unwrap();
        assert_eq!(store.get(&id).unwrap().title, "How do multimodal models work ");
    }

    #[test]
    fn test_explicit_rename_survives_messages() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        store.rename_conversation(&id, "Renamed").unwrap();
        store
            .append_user_message(&id, "hello", &SendOptions::default())
            .unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Renamed");
    }

    #[test]
    fn test_update_in_place_preserves_position() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        store
            .append_user_message(&id, "question", &SendOptions::default())
            .unwrap();
        let provisional = Message::provisional("a-1".to_string(), "step one");
        store
            .append_or_update_assistant_message(&id, provisional.clone())
            .unwrap();
        store
            .append_user_message(&id, "follow-up placeholder", &SendOptions::default())
            .unwrap();

        let finalized = provisional.finalized("done", Vec::new());
        store
            .append_or_update_assistant_message(&id, finalized)
            .unwrap();

        let conv = store.get(&id).unwrap();
        assert_eq!(conv.messages.len(), 3);
        assert_eq!(conv.messages[1].id, "a-1");
        assert_eq!(conv.messages[1].content, "done");
        assert_eq!(conv.messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_finalizing_twice_does_not_duplicate() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        let provisional = Message::provisional("a-1".to_string(), "step");
        store
            .append_or_update_assistant_message(&id, provisional.clone())
            .unwrap();
        let finalized = provisional.finalized("done", Vec::new());
        store
            .append_or_update_assistant_message(&id, finalized.clone())
            .unwrap();
        store
            .append_or_update_assistant_message(&id, finalized)
            .unwrap();
        assert_eq!(store.get(&id).unwrap().messages.len(), 1);
    }

    #[test]
    #[should_panic(expected = "at most one provisional message")]
    fn test_second_provisional_in_one_conversation_panics() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        store
            .append_or_update_assistant_message(&id, Message::provisional("a-1".into(), "s"))
            .unwrap();
        store
            .append_or_update_assistant_message(&id, Message::provisional("a-2".into(), "s"))
            .unwrap();
    }

    #[test]
    #[should_panic(expected = "user messages are immutable")]
    fn test_replacing_a_user_message_in_place_panics() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        let user_id = store
            .append_user_message(&id, "hands off", &SendOptions::default())
            .unwrap();
        let mut colliding = Message::provisional(user_id, "step");
        colliding.is_provisional = false;
        store
            .append_or_update_assistant_message(&id, colliding)
            .unwrap();
    }

    #[test]
    fn test_remove_message() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        store
            .append_or_update_assistant_message(&id, Message::provisional("a-1".into(), "s"))
            .unwrap();
        store.remove_message(&id, "a-1").unwrap();
        assert!(store.get(&id).unwrap().messages.is_empty());
        assert!(matches!(
            store.remove_message(&id, "a-1").unwrap_err(),
            ChatError::MessageNotFound(_)
        ));
    }

    #[test]
    fn test_timestamps_monotonic_within_conversation() {
        let mut store = ConversationStore::new();
        let id = store.active_id().to_string();
        for text in ["one", "two", "three"] {
            store
                .append_user_message(&id, text, &SendOptions::default())
                .unwrap();
        }
        let conv = store.get(&id).unwrap();
        let ordered = conv
            .messages
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp);
        assert!(ordered);
    }
}
