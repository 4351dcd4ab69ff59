//! Battle of Wits core library.
//!
//! Orchestrates a turn-based exchange between two scripted AI personas:
//! a background producer generates debate turns (text + speech) ahead of
//! consumption, a presentation gate releases them one at a time under
//! caller control, and the debate state tracks whose turn it is and when
//! the exchange is complete.

pub mod config;
pub mod error;
pub mod gate;
pub mod generator;
pub mod orchestrator;
pub mod producer;
pub mod prompts;
pub mod state;

pub use config::{ApiSettings, DebateConfig, DebateFormat, Defaults, Persona};
pub use error::{DebateError, RemoteError};
pub use gate::PresentationGate;
pub use generator::{OpenAiGenerator, SpeechRequest, TextRequest, TextResponse, TurnGenerator};
pub use orchestrator::{Advance, DebateOrchestrator, DebateStatus};
pub use producer::RetryPolicy;
pub use state::{DebateState, Message, Speaker, TokenUsage, TurnKind};
