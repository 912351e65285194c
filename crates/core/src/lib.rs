//! Core logic for a moderated debate between emotion personas.
//!
//! The crate is split so that everything time- or network-dependent sits
//! behind a seam: [`debate::Debate`] is a synchronous state machine,
//! [`orchestrator::Orchestrator`] paces it with tokio timers, and
//! [`generator::TextGenerator`] is the only thing that ever talks to a model.

pub mod credentials;
pub mod debate;
pub mod gateway;
pub mod generator;
pub mod orchestrator;
pub mod persona;
pub mod prompts;
pub mod transcript;

pub use credentials::{CredentialError, CredentialResolver, CredentialSource, EnvKey, KeyCommand, KeyFile};
pub use debate::{Commit, Debate, RunState, Step};
pub use gateway::Gateway;
pub use generator::{Generation, GenerationError, GenerationRequest, TextGenerator};
pub use orchestrator::{DebateHandle, DebateSettings, Orchestrator};
pub use persona::{Persona, PersonaId};
pub use prompts::PromptSet;
pub use transcript::{Transcript, Turn};
