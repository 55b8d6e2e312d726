use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::RunnableInput;

const INSTRUCTIONS: &str = "You write example inputs for Apify actors. \
Reply with exactly one JSON object that would be a plausible, minimal input \
for the actor the user names. No prose, no explanations, no Markdown.";

/// Last-resort source of an input payload for an actor.
#[async_trait]
pub trait InputGenerator: Send + Sync {
    async fn generate_input(&self, actor_id: &str) -> Result<RunnableInput>;
}

pub struct Synthesizer {
    client: Client<OpenAIConfig>,
    model: String,
}

impl Synthesizer {
    /// The key is injected by the caller; nothing here reads the environment.
    pub fn new(api_key: &str, model: &str, api_base: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        let client = Client::with_config(config).with_backoff(no_retry());

        info!("Synthesizer ready. Model: {}", model);
        Self {
            client,
            model: model.to_string(),
        }
    }

    /// Connectivity check used at startup.
    pub async fn ping(&self) -> Result<String> {
        self.complete(vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content("Reply with 'System Online'.")
                .build()
                .map_err(transport)?,
        )])
        .await
    }

    async fn complete(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.2)
            .build()
            .map_err(transport)?;

        let response = self.client.chat().create(request).await.map_err(transport)?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl InputGenerator for Synthesizer {
    async fn generate_input(&self, actor_id: &str) -> Result<RunnableInput> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(INSTRUCTIONS)
                    .build()
                    .map_err(transport)?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(format!("Actor: {actor_id}"))
                    .build()
                    .map_err(transport)?,
            ),
        ];

        let text = self.complete(messages).await?;
        parse_generated(&text)
    }
}

/// A policy whose elapsed-time budget is already spent on the first failure,
/// so rate-limited answers come straight back instead of being retried.
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn transport(err: async_openai::error::OpenAIError) -> Error {
    Error::Transport(err.to_string())
}

/// Parses a completion into an input object. Tolerates a surrounding code fence.
pub fn parse_generated(text: &str) -> Result<RunnableInput> {
    let body = strip_fence(text.trim());
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::GenerationParseFailed(format!(
            "expected an object, got {other}"
        ))),
        Err(err) => Err(Error::GenerationParseFailed(err.to_string())),
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
