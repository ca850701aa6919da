//! Loading and learner event handling for course completion tracking.
//!
//! [`CourseView`] ties the pieces together for one course on screen:
//! - [`Loader`] lists modules and fans out item listings and progress fetches
//! - [`EventSync`] applies learner actions optimistically and persists them
//! - [`ProgressEvent`]s are broadcast after every store change
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use coursetrack_backend::HttpBackend;
//! use coursetrack_sync::{CourseView, SyncConfig};
//!
//! let view = CourseView::new(Arc::new(HttpBackend::from_env()?), SyncConfig::default());
//! view.open("course-1").await?;
//! for summary in view.summaries().await {
//!     println!("{}: {:?}%", summary.title, summary.completion_percentage);
//! }
//! ```

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod loader;
pub mod sync;
pub mod view;

pub use command::{ContentViewCommand, OptimisticUpdate, VideoProgressCommand};
pub use config::SyncConfig;
pub use context::SyncContext;
pub use error::{Result, SyncError};
pub use event::ProgressEvent;
pub use loader::{LoadReport, Loader};
pub use sync::{EventSync, VideoTick};
pub use view::CourseView;
