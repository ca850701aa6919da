//! Learning backend adapters.
//!
//! This crate provides the [`LearningBackend`] trait the sync layer talks
//! to, plus two implementations:
//! - [`HttpBackend`]: the backend REST API over `reqwest`
//! - [`MemoryBackend`]: scripted in-memory data with failure injection
//!
//! # Example
//!
//! ```ignore
//! use coursetrack_backend::{BackendConfig, HttpBackend, LearningBackend};
//!
//! let backend = HttpBackend::new(&BackendConfig::from_env()?)?;
//! let modules = backend.list_modules(&"course-1".into()).await?;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use config::BackendConfig;
pub use error::{BackendError, Result};
pub use http::HttpBackend;
pub use memory::{MemoryBackend, Operation};
pub use traits::LearningBackend;
