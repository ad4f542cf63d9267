//! Chat engine.
//!
//! The engine is the single explicit owner of all mutable state: the
//! conversation store, the persona registry, the user profile, the
//! settings and the injected random source, each behind its own mutex.
//! There are no ambient globals; consumers hold a `ChatEngine` (cheap to
//! clone) and read state through snapshots.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{ChatError, ChatResult};
use crate::export::{self, ExportDocument};
use crate::orchestrator::{self, ExchangePhase, ExchangeTiming, InFlightGuard};
use crate::registry::PersonaRegistry;
use crate::settings::AppSettings;
use crate::store::ConversationStore;
use crate::types::{
    Conversation, ConversationId, Message, MessageId, Persona, PersonaDraft, PersonaId,
    SendOptions, UserProfile,
};

/// What `submit_to` does when the target conversation does not exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingConversationPolicy {
    /// Return `ConversationNotFound`
    #[default]
    Reject,
    /// Create a fresh conversation and submit there
    AutoCreate,
}

/// Engine construction parameters
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Delays for the staged thinking reveal
    pub timing: ExchangeTiming,
    /// Policy for submissions against a missing conversation
    pub missing_conversation: MissingConversationPolicy,
    /// Seed for the response pool; random when absent
    pub rng_seed: Option<u64>,
    /// Initial user profile
    pub profile: UserProfile,
    /// Initial settings
    pub settings: AppSettings,
}

pub(crate) struct EngineShared {
    pub(crate) store: Mutex<ConversationStore>,
    pub(crate) registry: Mutex<PersonaRegistry>,
    pub(crate) profile: Mutex<UserProfile>,
    pub(crate) settings: Mutex<AppSettings>,
    pub(crate) rng: Mutex<StdRng>,
    pub(crate) in_flight: Mutex<HashSet<ConversationId>>,
    pub(crate) timing: ExchangeTiming,
    missing_conversation: MissingConversationPolicy,
}

/// Handle to one in-flight exchange.
///
/// Dropping the handle detaches the exchange; it keeps running in the
/// background and its conversation keeps updating in the store.
pub struct ExchangeHandle {
    conversation_id: ConversationId,
    message_id: MessageId,
    phase: Arc<Mutex<ExchangePhase>>,
    task: JoinHandle<ChatResult<Message>>,
    shared: Arc<EngineShared>,
}

impl ExchangeHandle {
    /// Conversation this exchange belongs to
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Id the assistant message will carry once visible
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Current phase of the exchange state machine
    pub fn phase(&self) -> ExchangePhase {
        *self.phase.lock().expect("phase lock poisoned")
    }

    /// Wait for the exchange to finish and return the finalized message
    pub async fn finished(self) -> ChatResult<Message> {
        self.task
            .await
            .map_err(|_| ChatError::ExchangeCancelled)?
    }

    /// Cancel the exchange: stop its timers and remove the provisional
    /// message, releasing the conversation for a new submission.
    ///
    /// A no-op when the exchange already reached `Done`: the finalized
    /// message is immutable and stays in place.
    pub async fn cancel(self) -> ChatResult<()> {
        self.task.abort();
        // Wait for the task to actually wind down before touching the
        // store, otherwise a late timer tick could resurrect the message.
        let _ = self.task.await;
        let phase = *self.phase.lock().expect("phase lock poisoned");
        if phase == ExchangePhase::Done {
            return Ok(());
        }
        let mut store = self.shared.store.lock().expect("store lock poisoned");
        match store.remove_message(&self.conversation_id, &self.message_id) {
            Ok(()) => Ok(()),
            // Cancelled before the provisional message appeared, or the
            // conversation itself is gone; nothing to clean up.
            Err(ChatError::MessageNotFound(_)) | Err(ChatError::ConversationNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for ExchangeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeHandle")
            .field("conversation_id", &self.conversation_id)
            .field("message_id", &self.message_id)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Root coordinator for conversations, exchanges and bookkeeping
#[derive(Clone)]
pub struct ChatEngine {
    shared: Arc<EngineShared>,
}

impl ChatEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!("chat engine initialized");
        Self {
            shared: Arc::new(EngineShared {
                store: Mutex::new(ConversationStore::new()),
                registry: Mutex::new(PersonaRegistry::new()),
                profile: Mutex::new(config.profile),
                settings: Mutex::new(config.settings),
                rng: Mutex::new(rng),
                in_flight: Mutex::new(HashSet::new()),
                timing: config.timing,
                missing_conversation: config.missing_conversation,
            }),
        }
    }

    fn store(&self) -> std::sync::MutexGuard<'_, ConversationStore> {
        self.shared.store.lock().expect("store lock poisoned")
    }

    // ------------------------------------------------------------------
    // Conversation operations
    // ------------------------------------------------------------------

    /// Snapshot of all conversations, newest first
    pub fn conversations(&self) -> Vec<Conversation> {
        self.store().conversations().to_vec()
    }

    /// Snapshot of one conversation
    pub fn conversation(&self, id: &str) -> ChatResult<Conversation> {
        Ok(self.store().get(id)?.clone())
    }

    /// Snapshot of the active conversation
    pub fn active_conversation(&self) -> Conversation {
        self.store().active().clone()
    }

    /// Create a new conversation and make it active
    pub fn create_conversation(&self) -> ConversationId {
        self.store().create_conversation()
    }

    /// Switch the active conversation.
    ///
    /// Pending exchanges in other conversations are unaffected; their
    /// provisional messages keep updating in the background.
    pub fn select_conversation(&self, id: &str) -> ChatResult<()> {
        self.store().select_conversation(id)
    }

    /// Delete a conversation; the store is never left empty
    pub fn delete_conversation(&self, id: &str) -> ChatResult<()> {
        self.store().delete_conversation(id)
    }

    /// Delete every conversation and start over with a fresh one
    pub fn clear_all(&self) -> ConversationId {
        self.store().clear_all()
    }

    /// Explicitly rename a conversation
    pub fn rename_conversation(&self, id: &str, title: impl Into<String>) -> ChatResult<()> {
        self.store().rename_conversation(id, title)
    }

    /// Bind a conversation to a persona
    pub fn set_conversation_persona(&self, id: &str, persona_id: &str) -> ChatResult<()> {
        self.store().set_persona(id, persona_id)
    }

    // ------------------------------------------------------------------
    // Exchanges
    // ------------------------------------------------------------------

    /// Submit user input to the active conversation
    pub fn submit(&self, text: &str, options: SendOptions) -> ChatResult<ExchangeHandle> {
        let active = self.store().active_id().to_string();
        self.submit_to(&active, text, options)
    }

    /// Submit user input to a specific conversation.
    ///
    /// Appends the user message immediately and spawns the staged
    /// thinking pipeline. At most one exchange may be in flight per
    /// conversation; a second submission is rejected with
    /// `ExchangeInProgress` instead of interleaving timers.
    pub fn submit_to(
        &self,
        conversation_id: &str,
        text: &str,
        options: SendOptions,
    ) -> ChatResult<ExchangeHandle> {
        let conversation_id = {
            let mut store = self.store();
            match store.get(conversation_id) {
                Ok(conversation) => conversation.id.clone(),
                Err(e) => match self.shared.missing_conversation {
                    MissingConversationPolicy::Reject => return Err(e),
                    MissingConversationPolicy::AutoCreate => store.create_conversation(),
                },
            }
        };

        {
            let mut in_flight = self
                .shared
                .in_flight
                .lock()
                .expect("in-flight lock poisoned");
            if in_flight.contains(&conversation_id) {
                return Err(ChatError::ExchangeInProgress(conversation_id));
            }
            in_flight.insert(conversation_id.clone());
        }
        let guard = InFlightGuard::new(self.shared.clone(), conversation_id.clone());

        self.store()
            .append_user_message(&conversation_id, text, &options)?;

        let message_id: MessageId = uuid::Uuid::new_v4().to_string();
        let phase = Arc::new(Mutex::new(ExchangePhase::Submitted));
        debug!(conversation = %conversation_id, message = %message_id, "exchange submitted");
        let task = tokio::spawn(orchestrator::run_exchange(
            self.shared.clone(),
            conversation_id.clone(),
            message_id.clone(),
            text.to_string(),
            options,
            phase.clone(),
            guard,
        ));

        Ok(ExchangeHandle {
            conversation_id,
            message_id,
            phase,
            task,
            shared: self.shared.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Personas
    // ------------------------------------------------------------------

    /// Snapshot of all personas
    pub fn personas(&self) -> Vec<Persona> {
        self.shared
            .registry
            .lock()
            .expect("registry lock poisoned")
            .list()
            .to_vec()
    }

    /// Register a new persona
    pub fn create_persona(&self, draft: PersonaDraft) -> PersonaId {
        self.shared
            .registry
            .lock()
            .expect("registry lock poisoned")
            .create(draft)
    }

    /// Delete a persona; the default persona is protected
    pub fn delete_persona(&self, id: &str) -> ChatResult<()> {
        self.shared
            .registry
            .lock()
            .expect("registry lock poisoned")
            .delete(id)
    }

    /// Persona answering in the given conversation, resolved through the
    /// default-fallback rule.
    pub fn persona_for(&self, conversation_id: &str) -> ChatResult<Persona> {
        let persona_id = self.store().get(conversation_id)?.persona_id.clone();
        let registry = self
            .shared
            .registry
            .lock()
            .expect("registry lock poisoned");
        Ok(registry.resolve(&persona_id).clone())
    }

    // ------------------------------------------------------------------
    // Profile, settings, export
    // ------------------------------------------------------------------

    /// Snapshot of the user profile
    pub fn profile(&self) -> UserProfile {
        self.shared
            .profile
            .lock()
            .expect("profile lock poisoned")
            .clone()
    }

    /// Apply an update to the user profile
    pub fn update_profile(&self, update: impl FnOnce(&mut UserProfile)) {
        let mut profile = self.shared.profile.lock().expect("profile lock poisoned");
        update(&mut profile);
    }

    /// Snapshot of the settings
    pub fn settings(&self) -> AppSettings {
        self.shared
            .settings
            .lock()
            .expect("settings lock poisoned")
            .clone()
    }

    /// Apply an update to the settings
    pub fn update_settings(&self, update: impl FnOnce(&mut AppSettings)) {
        let mut settings = self.shared.settings.lock().expect("settings lock poisoned");
        update(&mut settings);
    }

    /// Build the export document for a conversation
    pub fn export_conversation(&self, id: &str) -> ChatResult<ExportDocument> {
        let store = self.store();
        Ok(export::export_conversation(store.get(id)?))
    }
}

impl Default for ChatEngine {
    fn default() -> Self {
        Self::new()
    }
}
