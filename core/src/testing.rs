//! In-memory stand-ins for the remote services.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, PlatformError, Result};
use crate::llm::{parse_generated, InputGenerator};
use crate::model::{Credential, RunRecord, RunStatus, RunnableInput};
use crate::platform::{BuildDetail, BuildSummary, Platform};

pub fn cred() -> Credential {
    Credential::parse(Some("apify_api_testtoken")).unwrap()
}

pub fn record(id: &str, status: RunStatus, dataset: Option<&str>) -> RunRecord {
    RunRecord {
        id: id.to_string(),
        status,
        default_dataset_id: dataset.map(str::to_string),
        default_key_value_store_id: None,
        input: None,
    }
}

fn not_found() -> PlatformError {
    PlatformError::Remote {
        status: 404,
        body: serde_json::json!({ "error": { "type": "record-not-found" } }),
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub actors: Option<Value>,
    pub schema: Option<Value>,
    pub builds: Vec<BuildSummary>,
    pub build_details: HashMap<String, BuildDetail>,
    pub last_run: Option<RunRecord>,
    pub input_records: HashMap<String, Value>,
    pub datasets: HashMap<String, Vec<Value>>,
    pub start: Mutex<Option<std::result::Result<RunRecord, PlatformError>>>,
    pub runs: Mutex<VecDeque<RunRecord>>,
    pub calls: Mutex<Vec<String>>,
    /// `(memory_mbytes, input)` of every submission.
    pub submitted: Mutex<Vec<(u32, Value)>>,
}

impl FakePlatform {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<(u32, Value)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|c| c == name)
    }

    fn log(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn list_actors(&self, _: &Credential) -> std::result::Result<Value, PlatformError> {
        self.log("list_actors");
        self.actors.clone().ok_or_else(not_found)
    }

    async fn input_schema(
        &self,
        _: &Credential,
        _: &str,
    ) -> std::result::Result<Value, PlatformError> {
        self.log("input_schema");
        self.schema.clone().ok_or_else(not_found)
    }

    async fn list_builds(
        &self,
        _: &Credential,
        _: &str,
    ) -> std::result::Result<Vec<BuildSummary>, PlatformError> {
        self.log("list_builds");
        Ok(self.builds.clone())
    }

    async fn build(
        &self,
        _: &Credential,
        build_id: &str,
    ) -> std::result::Result<BuildDetail, PlatformError> {
        self.log("build");
        self.build_details.get(build_id).cloned().ok_or_else(not_found)
    }

    async fn last_succeeded_run(
        &self,
        _: &Credential,
        _: &str,
    ) -> std::result::Result<RunRecord, PlatformError> {
        self.log("last_succeeded_run");
        self.last_run.clone().ok_or_else(not_found)
    }

    async fn run(&self, _: &Credential, _: &str) -> std::result::Result<RunRecord, PlatformError> {
        self.log("run");
        self.runs.lock().unwrap().pop_front().ok_or_else(not_found)
    }

    async fn input_record(
        &self,
        _: &Credential,
        store_id: &str,
    ) -> std::result::Result<Value, PlatformError> {
        self.log("input_record");
        self.input_records.get(store_id).cloned().ok_or_else(not_found)
    }

    async fn start_run(
        &self,
        _: &Credential,
        _: &str,
        memory_mbytes: u32,
        input: &Value,
    ) -> std::result::Result<RunRecord, PlatformError> {
        self.log("start_run");
        self.submitted
            .lock()
            .unwrap()
            .push((memory_mbytes, input.clone()));
        self.start.lock().unwrap().take().unwrap_or_else(|| Err(not_found()))
    }

    async fn dataset_items(
        &self,
        _: &Credential,
        dataset_id: &str,
    ) -> std::result::Result<Vec<Value>, PlatformError> {
        self.log("dataset_items");
        self.datasets.get(dataset_id).cloned().ok_or_else(not_found)
    }
}

/// Answers every prompt with the same completion text.
pub struct FakeGenerator {
    pub reply: String,
    pub calls: Mutex<u32>,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl InputGenerator for FakeGenerator {
    async fn generate_input(&self, _: &str) -> Result<RunnableInput> {
        *self.calls.lock().unwrap() += 1;
        parse_generated(&self.reply)
    }
}

/// Generator whose service is unreachable.
pub struct DownGenerator;

#[async_trait]
impl InputGenerator for DownGenerator {
    async fn generate_input(&self, _: &str) -> Result<RunnableInput> {
        Err(Error::Transport("connection refused".into()))
    }
}
