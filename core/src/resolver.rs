//! Works out what input an actor expects, falling back through progressively
//! less authoritative sources until one produces something usable.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::llm::InputGenerator;
use crate::model::{Credential, InputSchema, RunnableInput};
use crate::normalize::extract;
use crate::platform::{BuildDetail, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputSource {
    DeclaredSchema,
    LatestBuild,
    LastRun,
    Generated,
}

impl InputSource {
    pub const CASCADE: [InputSource; 4] = [
        InputSource::DeclaredSchema,
        InputSource::LatestBuild,
        InputSource::LastRun,
        InputSource::Generated,
    ];
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputSource::DeclaredSchema => "declared schema",
            InputSource::LatestBuild => "latest build",
            InputSource::LastRun => "last successful run",
            InputSource::Generated => "generated example",
        })
    }
}

/// What the cascade settled on. `schema` is only set when the actor publishes
/// one directly, so callers can offer it for editing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInput {
    pub source: InputSource,
    pub input: RunnableInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<InputSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
}

impl ResolvedInput {
    fn from_schema(source: InputSource, schema: InputSchema, keep_schema: bool) -> Self {
        let extraction = extract(&schema);
        Self {
            source,
            input: extraction.input,
            schema: keep_schema.then_some(schema),
            missing_required: extraction.missing_required,
        }
    }

    fn from_input(source: InputSource, input: RunnableInput) -> Self {
        Self {
            source,
            input,
            schema: None,
            missing_required: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct SchemaResolver {
    platform: Arc<dyn Platform>,
    generator: Option<Arc<dyn InputGenerator>>,
}

impl SchemaResolver {
    pub fn new(platform: Arc<dyn Platform>, generator: Option<Arc<dyn InputGenerator>>) -> Self {
        Self {
            platform,
            generator,
        }
    }

    /// Only fails when every source is exhausted; individual source errors are
    /// logged and swallowed.
    pub async fn resolve(&self, cred: &Credential, actor_id: &str) -> Result<ResolvedInput> {
        for source in InputSource::CASCADE {
            let attempt = match source {
                InputSource::DeclaredSchema => self.from_declared_schema(cred, actor_id).await,
                InputSource::LatestBuild => self.from_latest_build(cred, actor_id).await,
                InputSource::LastRun => self.from_last_run(cred, actor_id).await,
                InputSource::Generated => self.from_generator(actor_id).await,
            };

            match attempt {
                Ok(Some(resolved)) => {
                    info!("Input for '{}' resolved from {}", actor_id, source);
                    return Ok(resolved);
                }
                Ok(None) => info!("No usable input for '{}' from {}", actor_id, source),
                Err(Error::Remote { status, body }) => {
                    warn!("{} lookup for '{}' failed with {}: {}", source, actor_id, status, body)
                }
                Err(err) => warn!("{} lookup for '{}' failed: {}", source, actor_id, err),
            }
        }

        error!("Every input source exhausted for '{}'", actor_id);
        Err(Error::SchemaResolutionFailed {
            job_id: actor_id.to_string(),
        })
    }

    async fn from_declared_schema(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<Option<ResolvedInput>> {
        let raw = self.platform.input_schema(cred, actor_id).await?;
        Ok(InputSchema::from_value(raw)
            .filter(InputSchema::has_fields)
            .map(|schema| ResolvedInput::from_schema(InputSource::DeclaredSchema, schema, true)))
    }

    async fn from_latest_build(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<Option<ResolvedInput>> {
        let builds = self.platform.list_builds(cred, actor_id).await?;
        let Some(latest) = builds.first() else {
            return Ok(None);
        };

        let detail = self.platform.build(cred, &latest.id).await?;
        Ok(embedded_schema(&detail)
            .filter(InputSchema::has_fields)
            .map(|schema| ResolvedInput::from_schema(InputSource::LatestBuild, schema, false)))
    }

    async fn from_last_run(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<Option<ResolvedInput>> {
        let last = self.platform.last_succeeded_run(cred, actor_id).await?;
        let full = self.platform.run(cred, &last.id).await?;

        if let Some(input) = non_empty_object(full.input) {
            return Ok(Some(ResolvedInput::from_input(InputSource::LastRun, input)));
        }

        // Run records don't always inline the input; it also lives in the
        // run's key-value store.
        let Some(store_id) = full
            .default_key_value_store_id
            .or(last.default_key_value_store_id)
        else {
            return Ok(None);
        };
        let stored = self.platform.input_record(cred, &store_id).await?;
        Ok(non_empty_object(Some(stored))
            .map(|input| ResolvedInput::from_input(InputSource::LastRun, input)))
    }

    async fn from_generator(&self, actor_id: &str) -> Result<Option<ResolvedInput>> {
        let Some(generator) = &self.generator else {
            info!("Generative fallback is not configured");
            return Ok(None);
        };
        let input = generator.generate_input(actor_id).await?;
        Ok(non_empty_object(Some(Value::Object(input)))
            .map(|input| ResolvedInput::from_input(InputSource::Generated, input)))
    }
}

/// A build's input schema, stored either as an object or as JSON text.
/// Unparseable text counts as no schema.
fn embedded_schema(detail: &BuildDetail) -> Option<InputSchema> {
    let raw = detail.input_schema.clone().or_else(|| {
        detail
            .actor_definition
            .as_ref()
            .and_then(|def| def.get("input"))
            .cloned()
    })?;

    match raw {
        Value::String(text) => InputSchema::from_text(&text),
        Value::Object(_) => InputSchema::from_value(raw),
        _ => None,
    }
}

fn non_empty_object(value: Option<Value>) -> Option<RunnableInput> {
    match value? {
        Value::Object(map) if !map.is_empty() => Some(map),
        _ => None,
    }
}
