//! Staged thinking orchestrator.
//!
//! Drives one exchange from submission to a finalized assistant message:
//! after an initial delay a provisional message appears with the first
//! thinking step, further steps are revealed on a fixed interval, and one
//! last delay later the synthesizer's answer replaces the provisional
//! message in place. Each exchange runs on its own task; exchanges in
//! different conversations interleave freely, but all store mutations go
//! through the engine's mutex so they never corrupt each other.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::EngineShared;
use crate::error::ChatResult;
use crate::synthesizer;
use crate::types::{ConversationId, Message, MessageId, SendOptions};

/// Delays used by the staged reveal
#[derive(Debug, Clone, Copy)]
pub struct ExchangeTiming {
    /// Pause before the provisional message appears
    pub initial_delay: Duration,
    /// Interval between revealed thinking steps
    pub step_interval: Duration,
    /// Pause between the last step and the final answer
    pub final_delay: Duration,
}

impl Default for ExchangeTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(600),
            step_interval: Duration::from_millis(800),
            final_delay: Duration::from_millis(500),
        }
    }
}

/// Observable state of one in-flight exchange.
///
/// `Revealing(n)` means thinking steps `0..=n` are visible. No transition
/// skips a step; `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    /// User message appended, provisional reply not yet visible
    Submitted,
    /// Thinking steps up to the given index are visible
    Revealing(usize),
    /// All steps revealed, synthesizing the final answer
    Finalizing,
    /// Finalized message is in the store
    Done,
}

/// Pick the thinking-step script for a submission.
///
/// Image analysis and search both use a four-step script (the search
/// script names its target in step two); everything else gets the
/// three-step knowledge-lookup script.
pub fn thinking_script(options: &SendOptions) -> Vec<String> {
    if !options.images.is_empty() {
        return vec![
            "Analyzing the attached images...".to_string(),
            "Identifying elements in the images...".to_string(),
            "Understanding your question...".to_string(),
            "Composing the answer...".to_string(),
        ];
    }
    if options.wants_search() {
        let target = options
            .search_url
            .as_deref()
            .unwrap_or("the web")
            .to_string();
        return vec![
            "Analyzing the question...".to_string(),
            format!("Searching {target}..."),
            "Organizing the search results...".to_string(),
            "Composing the answer...".to_string(),
        ];
    }
    vec![
        "Reading the question...".to_string(),
        "Consulting the knowledge base...".to_string(),
        "Composing the answer...".to_string(),
    ]
}

/// Releases the per-conversation in-flight slot when the exchange task
/// finishes or is dropped mid-flight.
pub(crate) struct InFlightGuard {
    shared: Arc<EngineShared>,
    conversation_id: ConversationId,
}

impl InFlightGuard {
    pub(crate) fn new(shared: Arc<EngineShared>, conversation_id: ConversationId) -> Self {
        Self {
            shared,
            conversation_id,
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shared
            .in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .remove(&self.conversation_id);
    }
}

/// Drive one exchange to completion.
///
/// Synthesis failures do not leave the message hanging in `Revealing`:
/// the provisional message is finalized with an error indication instead.
/// A deleted conversation aborts the exchange with `ConversationNotFound`.
pub(crate) async fn run_exchange(
    shared: Arc<EngineShared>,
    conversation_id: ConversationId,
    message_id: MessageId,
    input: String,
    options: SendOptions,
    phase: Arc<Mutex<ExchangePhase>>,
    guard: InFlightGuard,
) -> ChatResult<Message> {
    let _guard = guard;
    let timing = shared.timing;
    let script = thinking_script(&options);

    tokio::time::sleep(timing.initial_delay).await;
    let mut message = Message::provisional(message_id, script[0].clone());
    set_phase(&phase, ExchangePhase::Revealing(0));
    shared
        .store
        .lock()
        .expect("store lock poisoned")
        .append_or_update_assistant_message(&conversation_id, message.clone())?;
    debug!(conversation = %conversation_id, message = %message.id, "provisional message visible");

    for step in 1..script.len() {
        tokio::time::sleep(timing.step_interval).await;
        message.thinking_steps = script[..=step].to_vec();
        set_phase(&phase, ExchangePhase::Revealing(step));
        shared
            .store
            .lock()
            .expect("store lock poisoned")
            .append_or_update_assistant_message(&conversation_id, message.clone())?;
    }

    tokio::time::sleep(timing.final_delay).await;
    set_phase(&phase, ExchangePhase::Finalizing);

    let system_prompt = {
        let store = shared.store.lock().expect("store lock poisoned");
        let persona_id = store.get(&conversation_id)?.persona_id.clone();
        let registry = shared.registry.lock().expect("registry lock poisoned");
        registry.resolve(&persona_id).system_prompt.clone()
    };

    let synthesized = {
        let mut rng = shared.rng.lock().expect("rng lock poisoned");
        synthesizer::synthesize(&input, &system_prompt, &options, &mut *rng)
    };

    let finalized = match synthesized {
        Ok(response) => message.finalized(response.content, response.citations),
        Err(e) => {
            warn!(conversation = %conversation_id, error = %e, "synthesis failed");
            message.finalized_with_error(format!(
                "The assistant could not compose an answer: {e}"
            ))
        }
    };

    shared
        .store
        .lock()
        .expect("store lock poisoned")
        .append_or_update_assistant_message(&conversation_id, finalized.clone())?;
    shared
        .profile
        .lock()
        .expect("profile lock poisoned")
        .message_count += 1;
    set_phase(&phase, ExchangePhase::Done);
    debug!(conversation = %conversation_id, message = %finalized.id, "exchange finalized");

    Ok(finalized)
}

fn set_phase(phase: &Mutex<ExchangePhase>, next: ExchangePhase) {
    *phase.lock().expect("phase lock poisoned") = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_script_has_three_steps() {
        let script = thinking_script(&SendOptions::default());
        assert_eq!(script.len(), 3);
    }

    #[test]
    fn test_image_script_has_four_steps_and_wins_over_search() {
        let options = SendOptions {
            search_web: true,
            images: vec!["a.png".to_string()],
            ..Default::default()
        };
        let script = thinking_script(&options);
        assert_eq!(script.len(), 4);
        assert!(script[0].contains("images"));
    }

    #[test]
    fn test_search_script_names_target_in_step_two() {
        let options = SendOptions {
            search_url: Some("example.com".to_string()),
            ..Default::default()
        };
        let script = thinking_script(&options);
        assert_eq!(script.len(), 4);
        assert_eq!(script[1], "Searching example.com...");

        let options = SendOptions {
            search_web: true,
            ..Default::default()
        };
        assert_eq!(thinking_script(&options)[1], "Searching the web...");
    }

    #[test]
    fn test_default_timing_matches_observed_delays() {
        let timing = ExchangeTiming::default();
        assert_eq!(timing.initial_delay, Duration::from_millis(600));
        assert_eq!(timing.step_interval, Duration::from_millis(800));
        assert_eq!(timing.final_delay, Duration::from_millis(500));
    }
}
