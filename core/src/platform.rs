//! Typed client for the automation platform's REST API.
//!
//! One method per remote capability. Every call carries the caller's credential
//! as a bearer token, and a non-2xx answer surfaces as [`PlatformError::Remote`]
//! with the status and body untouched. Nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::PlatformError;
use crate::model::{Credential, RunRecord};

pub const DEFAULT_API_BASE: &str = "https://api.apify.com/v2";

/// Build entry as it appears in an actor's build listing.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSummary {
    pub id: String,
}

/// Full build metadata. `input_schema` may be an object or serialized JSON text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetail {
    pub id: String,
    #[serde(default)]
    pub input_schema: Option<Value>,
    #[serde(default)]
    pub actor_definition: Option<Value>,
}

#[async_trait]
pub trait Platform: Send + Sync {
    async fn list_actors(&self, cred: &Credential) -> Result<Value, PlatformError>;

    async fn input_schema(&self, cred: &Credential, actor_id: &str)
        -> Result<Value, PlatformError>;

    async fn list_builds(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<Vec<BuildSummary>, PlatformError>;

    async fn build(&self, cred: &Credential, build_id: &str)
        -> Result<BuildDetail, PlatformError>;

    async fn last_succeeded_run(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<RunRecord, PlatformError>;

    async fn run(&self, cred: &Credential, run_id: &str) -> Result<RunRecord, PlatformError>;

    /// The `INPUT` record of a key-value store.
    async fn input_record(&self, cred: &Credential, store_id: &str)
        -> Result<Value, PlatformError>;

    async fn start_run(
        &self,
        cred: &Credential,
        actor_id: &str,
        memory_mbytes: u32,
        input: &Value,
    ) -> Result<RunRecord, PlatformError>;

    async fn dataset_items(
        &self,
        cred: &Credential,
        dataset_id: &str,
    ) -> Result<Vec<Value>, PlatformError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

/// `owner/name` is addressed as `owner~name` in URL paths.
pub fn path_id(actor_id: &str) -> String {
    actor_id.trim().replace('/', "~")
}

#[derive(Debug, Clone)]
pub struct ApifyClient {
    http: Client,
    base_url: String,
}

impl ApifyClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PlatformError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        cred: &Credential,
    ) -> Result<T, PlatformError> {
        let response = request.bearer_auth(cred.expose()).send().await?;
        let status = response.status();
        debug!("Platform answered {} for {}", status, response.url().path());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(PlatformError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        cred: &Credential,
        path: &str,
    ) -> Result<T, PlatformError> {
        self.send(self.http.get(self.url(path)), cred).await
    }
}

/// Some endpoints wrap their payload in `{ "data": ... }`, some don't.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl Platform for ApifyClient {
    async fn list_actors(&self, cred: &Credential) -> Result<Value, PlatformError> {
        self.get(cred, "acts").await
    }

    async fn input_schema(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<Value, PlatformError> {
        let raw: Value = self
            .get(cred, &format!("acts/{}/input-schema", path_id(actor_id)))
            .await?;
        Ok(unwrap_data(raw))
    }

    async fn list_builds(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<Vec<BuildSummary>, PlatformError> {
        // Newest first, so the latest build is on the first page.
        let request = self
            .http
            .get(self.url(&format!("acts/{}/builds", path_id(actor_id))))
            .query(&[("desc", "1"), ("limit", "1")]);
        let page: Envelope<Page<BuildSummary>> = self.send(request, cred).await?;
        Ok(page.data.items)
    }

    async fn build(
        &self,
        cred: &Credential,
        build_id: &str,
    ) -> Result<BuildDetail, PlatformError> {
        let build: Envelope<BuildDetail> =
            self.get(cred, &format!("actor-builds/{build_id}")).await?;
        Ok(build.data)
    }

    async fn last_succeeded_run(
        &self,
        cred: &Credential,
        actor_id: &str,
    ) -> Result<RunRecord, PlatformError> {
        let request = self
            .http
            .get(self.url(&format!("acts/{}/runs/last", path_id(actor_id))))
            .query(&[("status", "SUCCEEDED")]);
        let run: Envelope<RunRecord> = self.send(request, cred).await?;
        Ok(run.data)
    }

    async fn run(&self, cred: &Credential, run_id: &str) -> Result<RunRecord, PlatformError> {
        let run: Envelope<RunRecord> = self.get(cred, &format!("actor-runs/{run_id}")).await?;
        Ok(run.data)
    }

    async fn input_record(
        &self,
        cred: &Credential,
        store_id: &str,
    ) -> Result<Value, PlatformError> {
        self.get(cred, &format!("key-value-stores/{store_id}/records/INPUT"))
            .await
    }

    async fn start_run(
        &self,
        cred: &Credential,
        actor_id: &str,
        memory_mbytes: u32,
        input: &Value,
    ) -> Result<RunRecord, PlatformError> {
        let request = self
            .http
            .post(self.url(&format!("acts/{}/runs", path_id(actor_id))))
            .query(&[("memory", memory_mbytes)])
            .json(input);
        let run: Envelope<RunRecord> = self.send(request, cred).await?;
        Ok(run.data)
    }

    async fn dataset_items(
        &self,
        cred: &Credential,
        dataset_id: &str,
    ) -> Result<Vec<Value>, PlatformError> {
        let request = self
            .http
            .get(self.url(&format!("datasets/{dataset_id}/items")))
            .query(&[("clean", "true")]);
        self.send(request, cred).await
    }
}
