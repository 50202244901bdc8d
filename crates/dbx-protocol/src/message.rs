use dbx_sync::{FileDescriptor, ReconciliationResult, RemoveOptions, UploadOptions, UploadOutcome};
use dbx_types::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest accepted frame payload.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Labels the agent understands.
pub const REQUEST_LABELS: &[&str] = &["synchronize", "upload", "remove"];

/// A request from the control process.
///
/// `handle` is opaque: it is echoed back unchanged on the matching response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum Request {
    Synchronize {
        #[serde(default)]
        handle: Value,
        payload: Vec<FileDescriptor>,
    },
    Upload {
        #[serde(default)]
        handle: Value,
        path: String,
        #[serde(default)]
        options: UploadOptions,
    },
    Remove {
        #[serde(default)]
        handle: Value,
        path: String,
        address: Address,
        #[serde(default)]
        options: RemoveOptions,
    },
}

impl Request {
    pub fn handle(&self) -> &Value {
        match self {
            Self::Synchronize { handle, .. }
            | Self::Upload { handle, .. }
            | Self::Remove { handle, .. } => handle,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Synchronize { .. } => "synchronize",
            Self::Upload { .. } => "upload",
            Self::Remove { .. } => "remove",
        }
    }
}

/// A response to the control process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum Response {
    Synchronized {
        handle: Value,
        payload: ReconciliationResult,
    },
    Uploaded {
        handle: Value,
        payload: UploadOutcome,
    },
    Removed {
        handle: Value,
        payload: Address,
    },
    Failed {
        handle: Value,
        /// The request label that failed.
        request: String,
        error: String,
    },
}

impl Response {
    pub fn failed(request: &Request, error: impl ToString) -> Self {
        Self::Failed {
            handle: request.handle().clone(),
            request: request.label().to_string(),
            error: error.to_string(),
        }
    }

    pub fn handle(&self) -> &Value {
        match self {
            Self::Synchronized { handle, .. }
            | Self::Uploaded { handle, .. }
            | Self::Removed { handle, .. }
            | Self::Failed { handle, .. } => handle,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
