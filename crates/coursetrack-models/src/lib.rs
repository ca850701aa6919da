//! Core data models for course module completion tracking.
//!
//! This crate provides the types shared by the reconciliation engine, the
//! backend adapters and the sync layer: identifiers, the tri-state
//! [`Completion`] flag, modules and their items, and the wire records the
//! backend sends.

pub mod builders;
pub mod completion;
pub mod ids;
pub mod item;
pub mod module;
pub mod records;

// Re-export main types
pub use builders::ModuleRecordBuilder;
pub use completion::Completion;
pub use ids::{ContentId, CourseId, ModuleId, QuizId, VideoId};
pub use item::{Category, ContentItem, ItemRef, ItemState, LearningItem, QuizItem, VideoItem};
pub use module::{Flag, FlagSource, Listed, Module, ModuleSummary, Percentage};
pub use records::{
    ContentProgress, ContentRecord, ModuleRecord, ModuleSnapshot, QuizRecord, QuizSubmission,
    VideoProgress, VideoProgressUpdate, VideoRecord,
};
