//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur when applying updates to the completion store.
///
/// None of these are fatal: they mean an update targeted state that is not
/// (or no longer) tracked and was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Module is not tracked in the current view.
    #[error("module not tracked: {0}")]
    ModuleNotTracked(String),

    /// Item is not tracked in the current view.
    #[error("item not tracked: {0}")]
    ItemNotTracked(String),

    /// Update was issued for a view that has since been closed or replaced.
    #[error("stale update: issued for view {issued}, current view is {current}")]
    StaleGeneration {
        /// Generation the update was issued under.
        issued: u64,
        /// Current generation of the store.
        current: u64,
    },
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
