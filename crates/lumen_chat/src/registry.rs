//! Persona registry.
//!
//! Holds the set of assistant personas a conversation can be bound to.
//! The built-in default persona always exists and cannot be deleted;
//! conversations pointing at a deleted persona resolve to the default at
//! read time, their stored reference is left untouched.

use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::types::{Persona, PersonaDraft, PersonaId};

/// Id of the built-in persona
pub const DEFAULT_PERSONA_ID: &str = "default";

/// Registry of assistant personas
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// Create a registry seeded with the default persona
    pub fn new() -> Self {
        Self {
            personas: vec![default_persona()],
        }
    }

    /// All personas, default first
    pub fn list(&self) -> &[Persona] {
        &self.personas
    }

    /// Look up a persona by id
    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Resolve a persona reference, falling back to the default persona
    /// when the referenced one no longer exists.
    pub fn resolve(&self, id: &str) -> &Persona {
        self.get(id).unwrap_or_else(|| {
            self.get(DEFAULT_PERSONA_ID)
                .expect("default persona must exist")
        })
    }

    /// Register a new persona and assign it a unique id
    pub fn create(&mut self, draft: PersonaDraft) -> PersonaId {
        let persona = Persona {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name,
            system_prompt: draft.system_prompt,
            description: draft.description,
            color: draft.color,
        };
        let id = persona.id.clone();
        self.personas.push(persona);
        debug!(persona = %id, "created persona");
        id
    }

    /// Remove a persona.
    ///
    /// The default persona is protected and deleting it is a typed
    /// rejection, not a silent no-op.
    pub fn delete(&mut self, id: &str) -> ChatResult<()> {
        if id == DEFAULT_PERSONA_ID {
            return Err(ChatError::DefaultPersonaProtected);
        }
        let index = self
            .personas
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ChatError::PersonaNotFound(id.to_string()))?;
        self.personas.remove(index);
        debug!(persona = %id, "deleted persona");
        Ok(())
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_persona() -> Persona {
    Persona {
        id: DEFAULT_PERSONA_ID.to_string(),
        name: "Lumen".to_string(),
        system_prompt: "You are a friendly, professional assistant focused on giving the user \
                        accurate and useful information."
            .to_string(),
        description: "Default persona".to_string(),
        color: "#6366f1".to_string(),
    }
}
