//! Submit → poll → fetch for a single actor run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{Error, PlatformError, Result};
use crate::model::{Credential, RunRecord, RunStatus};
use crate::platform::Platform;

#[derive(Debug, Clone)]
pub struct RunPolicy {
    pub poll_interval: Duration,
    /// Memory ceiling for every run, in megabytes.
    pub memory_mbytes: u32,
    /// Total time to wait for a terminal status. `None` waits forever.
    pub max_wait: Option<Duration>,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            memory_mbytes: 512,
            max_wait: Some(Duration::from_secs(15 * 60)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run: RunRecord,
    pub items: Vec<Value>,
}

#[derive(Clone)]
pub struct RunOrchestrator {
    platform: Arc<dyn Platform>,
    policy: RunPolicy,
}

impl RunOrchestrator {
    pub fn new(platform: Arc<dyn Platform>, policy: RunPolicy) -> Self {
        Self { platform, policy }
    }

    pub fn policy(&self) -> &RunPolicy {
        &self.policy
    }

    /// Starts the actor and waits for it to leave READY/RUNNING.
    ///
    /// Cancelling `cancel` stops the wait only; the remote run keeps going.
    pub async fn run(
        &self,
        cred: &Credential,
        actor_id: &str,
        input: &Value,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let started = Instant::now();

        let mut run = guarded(
            cancel,
            "<unsubmitted>",
            self.platform
                .start_run(cred, actor_id, self.policy.memory_mbytes, input),
        )
        .await?;
        info!("Actor run started. Run ID: {} ({})", run.id, run.status);

        while run.status.is_active() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled { run_id: run.id });
                }
                _ = sleep(self.policy.poll_interval) => {}
            }

            run = guarded(cancel, &run.id, self.platform.run(cred, &run.id)).await?;
            info!("Polling run {}... status: {}", run.id, run.status);

            if run.status.is_active() && self.budget_spent(started) {
                error!("Run {} still {} after wait budget", run.id, run.status);
                return Err(Error::PollTimeout {
                    run_id: run.id,
                    last_status: run.status.to_string(),
                });
            }
        }

        if run.status != RunStatus::Succeeded {
            error!("Actor failed. Run {} final status: {}", run.id, run.status);
            return Err(Error::RunFailed {
                final_status: run.status.to_string(),
                run_id: run.id,
            });
        }

        let Some(dataset_id) = run.default_dataset_id.clone() else {
            info!("Run {} succeeded without a dataset", run.id);
            return Ok(RunOutcome {
                run,
                items: Vec::new(),
            });
        };

        let items = guarded(
            cancel,
            &run.id,
            self.platform.dataset_items(cred, &dataset_id),
        )
        .await?;
        info!("Run {} produced {} items", run.id, items.len());

        Ok(RunOutcome { run, items })
    }

    fn budget_spent(&self, started: Instant) -> bool {
        self.policy
            .max_wait
            .is_some_and(|budget| started.elapsed() >= budget)
    }
}

/// Races an outbound call against cancellation.
async fn guarded<T>(
    cancel: &CancellationToken,
    run_id: &str,
    call: impl Future<Output = std::result::Result<T, PlatformError>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled { run_id: run_id.to_string() }),
        result = call => Ok(result?),
    }
}
