//! Resolve inputs for, launch, and collect results from remote platform actors.

pub mod error;
pub mod llm;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod platform;
pub mod resolver;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::{Error, PlatformError, Result};
pub use llm::{InputGenerator, Synthesizer};
pub use model::{Credential, InputSchema, RunRecord, RunStatus, RunnableInput};
pub use normalize::Coercer;
pub use orchestrator::{RunOrchestrator, RunOutcome, RunPolicy};
pub use platform::{ApifyClient, Platform};
pub use resolver::{InputSource, ResolvedInput, SchemaResolver};
pub use service::ActorService;
