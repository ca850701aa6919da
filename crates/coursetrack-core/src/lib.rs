//! Completion reconciliation for course modules.
//!
//! This crate merges what the backend asserts about a module with what can
//! be derived from its items:
//!
//! - [`calculator`]: percentage and category completion from item states
//! - [`predicates`]: per-item completion rules and monotonic merges
//! - [`reconcile`]: the trust-then-fill engine and rollback support
//! - [`store`]: per-view state guarded by a [`Generation`] token

pub mod calculator;
pub mod config;
pub mod error;
pub mod predicates;
pub mod reconcile;
pub mod store;

pub use calculator::{category_completion, compute_percentage, is_module_complete, percentage_of};
pub use config::{EngineConfig, DEFAULT_VIDEO_COMPLETION_THRESHOLD};
pub use error::{Result, StoreError};
pub use predicates::ItemPredicates;
pub use reconcile::{is_forced, Aggregates, ItemSnapshot, Origin, ReconciliationEngine};
pub use store::{CompletionStore, Generation, Update};
