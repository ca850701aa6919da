//! Error types for the sync layer.

use thiserror::Error;

use coursetrack_backend::BackendError;
use coursetrack_core::StoreError;
use coursetrack_models::ItemRef;

/// Errors returned by loading and learner event handling.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A backend request the operation depends on failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The update targeted state that is not tracked in the current view.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Video progress input was out of range.
    #[error("invalid video progress: {0}")]
    InvalidProgress(String),

    /// A learner action could not be persisted and was rolled back.
    #[error("failed to persist {item}: {source}")]
    WriteFailed {
        /// Item the action targeted.
        item: ItemRef,
        /// Backend failure.
        source: BackendError,
    },
}

impl SyncError {
    /// Returns true if this is a rolled-back write.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, SyncError::WriteFailed { .. })
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
