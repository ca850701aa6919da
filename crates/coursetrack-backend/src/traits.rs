//! LearningBackend trait definition.
//!
//! The engine never talks to a server directly: every listing, progress
//! fetch and write goes through this trait, so the same sync layer runs
//! against the HTTP adapter in production and the in-memory adapter in
//! tests.

use async_trait::async_trait;

use coursetrack_models::{
    ContentId, ContentProgress, ContentRecord, CourseId, ModuleId, ModuleRecord, ModuleSnapshot,
    QuizId, QuizRecord, QuizSubmission, VideoId, VideoProgress, VideoRecord,
};

use crate::error::Result;

/// Remote source of course structure and learner progress.
#[async_trait]
pub trait LearningBackend: Send + Sync {
    /// Lists the modules of a course.
    ///
    /// Records may carry an authoritative completion snapshot.
    async fn list_modules(&self, course_id: &CourseId) -> Result<Vec<ModuleRecord>>;

    /// Lists the content items of a module.
    async fn list_contents(&self, module_id: &ModuleId, published_only: bool) -> Result<Vec<ContentRecord>>;

    /// Lists the videos of a module.
    async fn list_videos(&self, module_id: &ModuleId, published_only: bool) -> Result<Vec<VideoRecord>>;

    /// Lists the quizzes of a module.
    async fn list_quizzes(&self, module_id: &ModuleId, published_only: bool) -> Result<Vec<QuizRecord>>;

    /// Fetches the learner's progress on a content item.
    async fn get_content_progress(&self, content_id: &ContentId) -> Result<ContentProgress>;

    /// Fetches the learner's progress on a video.
    async fn get_video_progress(&self, video_id: &VideoId) -> Result<VideoProgress>;

    /// Checks whether the learner has submitted a quiz.
    async fn check_quiz_submission(&self, quiz_id: &QuizId) -> Result<QuizSubmission>;

    /// Records that the learner viewed a content item.
    async fn mark_content_viewed(&self, content_id: &ContentId) -> Result<()>;

    /// Records the learner's position in a video.
    async fn update_video_watch_progress(
        &self,
        video_id: &VideoId,
        watched_seconds: f64,
        total_seconds: f64,
    ) -> Result<()>;

    /// Fetches the completion snapshot of a module.
    async fn get_module_progress(&self, module_id: &ModuleId) -> Result<ModuleSnapshot>;
}
