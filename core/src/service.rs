//! The three operations callers get: list actors, resolve input, run.
//!
//! Validation here is presence-only. Everything past it is delegated.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::llm::InputGenerator;
use crate::model::Credential;
use crate::normalize::Coercer;
use crate::orchestrator::{RunOrchestrator, RunOutcome, RunPolicy};
use crate::platform::Platform;
use crate::resolver::{ResolvedInput, SchemaResolver};

#[derive(Clone)]
pub struct ActorService {
    platform: Arc<dyn Platform>,
    resolver: SchemaResolver,
    orchestrator: RunOrchestrator,
    coercer: Coercer,
}

impl ActorService {
    pub fn new(
        platform: Arc<dyn Platform>,
        generator: Option<Arc<dyn InputGenerator>>,
        policy: RunPolicy,
    ) -> Self {
        Self {
            resolver: SchemaResolver::new(platform.clone(), generator),
            orchestrator: RunOrchestrator::new(platform.clone(), policy),
            coercer: Coercer::default(),
            platform,
        }
    }

    pub fn with_coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = coercer;
        self
    }

    pub async fn list_actors(&self, api_key: Option<&str>) -> Result<Value> {
        let cred = Credential::parse(api_key).ok_or(Error::MissingCredential)?;

        match self.platform.list_actors(&cred).await {
            Ok(actors) => Ok(actors),
            Err(err) => {
                error!("Error fetching actors for {}: {}", cred.prefix(), err);
                Err(err.into())
            }
        }
    }

    pub async fn resolve_schema(
        &self,
        api_key: Option<&str>,
        actor_id: Option<&str>,
    ) -> Result<ResolvedInput> {
        let cred = Credential::parse(api_key).ok_or(Error::MissingField("apiKey"))?;
        let actor_id = present(actor_id).ok_or(Error::MissingField("actorId"))?;

        info!("Fetching input for: {}", actor_id);
        self.resolver.resolve(&cred, actor_id).await
    }

    /// Coerces `input` into the platform's expected shape, runs the actor and
    /// returns its dataset items. A missing input is sent as `{}`.
    pub async fn run_actor(
        &self,
        api_key: Option<&str>,
        actor_id: Option<&str>,
        input: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let cred = Credential::parse(api_key).ok_or(Error::MissingField("apiKey"))?;
        let actor_id = present(actor_id).ok_or(Error::MissingField("actorId"))?;

        let input = self
            .coercer
            .apply(input.unwrap_or_else(|| Value::Object(Default::default())));

        info!("Executing actor {} with key {}", actor_id, cred.prefix());
        info!("Input payload: {}", input);

        let outcome = self.orchestrator.run(&cred, actor_id, &input, cancel).await;
        if let Err(err) = &outcome {
            error!("Actor execution failed: {}", err);
        }
        outcome
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
