use serde_json::Value;
use thiserror::Error;

/// Failure of a single call to the remote platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    // The remote answered, but not with a 2xx.
    #[error("platform returned status {status}")]
    Remote { status: u16, body: Value },

    #[error("platform call could not complete: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        PlatformError::Transport(err.to_string())
    }
}

/// Errors that cross the request boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key is required")]
    MissingCredential,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("remote platform returned status {status}")]
    Remote { status: u16, body: Value },

    #[error("remote call failed: {0}")]
    Transport(String),

    #[error("no schema or usable input could be resolved for '{job_id}'")]
    SchemaResolutionFailed { job_id: String },

    #[error("actor did not complete successfully, final status: {final_status}")]
    RunFailed { run_id: String, final_status: String },

    #[error("generated input is not a JSON object: {0}")]
    GenerationParseFailed(String),

    #[error("run {run_id} still {last_status} after the wait budget was spent")]
    PollTimeout { run_id: String, last_status: String },

    #[error("waiting on run {run_id} was cancelled")]
    Cancelled { run_id: String },
}

impl Error {
    /// Stable classification string, safe to hand to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingCredential => "missing_credential",
            Error::MissingField(_) => "missing_field",
            Error::Remote { .. } => "remote_error",
            Error::Transport(_) => "transport_error",
            Error::SchemaResolutionFailed { .. } => "schema_resolution_failed",
            Error::RunFailed { .. } => "run_failed",
            Error::GenerationParseFailed(_) => "generation_parse_failed",
            Error::PollTimeout { .. } => "poll_timeout",
            Error::Cancelled { .. } => "cancelled",
        }
    }

    /// Raw remote body (or identifying context) for diagnosis.
    pub fn details(&self) -> Option<Value> {
        match self {
            Error::Remote { body, .. } if !body.is_null() => Some(body.clone()),
            Error::Transport(message) => Some(Value::String(message.clone())),
            Error::RunFailed { run_id, final_status } => Some(serde_json::json!({
                "runId": run_id,
                "status": final_status,
            })),
            Error::PollTimeout { run_id, last_status } => Some(serde_json::json!({
                "runId": run_id,
                "status": last_status,
            })),
            _ => None,
        }
    }
}

impl From<PlatformError> for Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Remote { status, body } => Error::Remote { status, body },
            PlatformError::Transport(message) => Error::Transport(message),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
