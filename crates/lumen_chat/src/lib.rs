//! # lumen_chat - Conversation engine for the Lumen chat client
//!
//! This crate provides the conversation and message lifecycle engine:
//! - Ordered conversations with auto-derived titles and an active selection
//! - A staged "assistant is thinking" pipeline with observable progress
//! - Locally synthesized responses (no network calls) with citations for
//!   search-style submissions
//! - A persona registry with a protected default persona
//! - User profile counters and conversation export
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────────┐
//! │   ChatEngine    │────▶│ Staged Orchestrator  │── timers ──┐
//! └────────┬────────┘     └──────────┬───────────┘            │
//!          │                         │                        ▼
//!          ▼                         ▼              ┌──────────────────┐
//! ┌─────────────────┐     ┌──────────────────────┐  │   Synthesizer    │
//! │ Persona Registry│     │  Conversation Store  │◀─│  (pure, local)   │
//! └─────────────────┘     └──────────────────────┘  └──────────────────┘
//! ```
//!
//! The engine owns all state; the presentation layer reads snapshots and
//! never mutates anything directly. Each submission spawns one exchange
//! task whose timers drive the state machine
//! `Submitted → Revealing(step) → Finalizing → Done`.

pub mod engine;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod registry;
pub mod settings;
pub mod store;
pub mod synthesizer;
pub mod types;

pub use engine::*;
pub use error::*;
pub use export::*;
pub use orchestrator::*;
pub use registry::*;
pub use settings::*;
pub use store::*;
pub use synthesizer::*;
pub use types::*;
