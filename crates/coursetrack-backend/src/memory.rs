//! In-memory learning backend for offline runs and testing.
//!
//! Holds scripted course data and answers from it. Failures and delays can
//! be injected per operation, optionally narrowed to a single target (a
//! course, module or item ID), and every call is counted so tests can
//! assert which requests were made.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use coursetrack_models::{
    ContentId, ContentProgress, ContentRecord, CourseId, ModuleId, ModuleRecord, ModuleSnapshot,
    QuizId, QuizRecord, QuizSubmission, VideoId, VideoProgress, VideoProgressUpdate, VideoRecord,
};

use crate::error::{BackendError, Result};
use crate::traits::LearningBackend;

/// The operations of [`LearningBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListModules,
    ListContents,
    ListVideos,
    ListQuizzes,
    GetContentProgress,
    GetVideoProgress,
    CheckQuizSubmission,
    MarkContentViewed,
    UpdateVideoWatchProgress,
    GetModuleProgress,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListModules => "list_modules",
            Operation::ListContents => "list_contents",
            Operation::ListVideos => "list_videos",
            Operation::ListQuizzes => "list_quizzes",
            Operation::GetContentProgress => "get_content_progress",
            Operation::GetVideoProgress => "get_video_progress",
            Operation::CheckQuizSubmission => "check_quiz_submission",
            Operation::MarkContentViewed => "mark_content_viewed",
            Operation::UpdateVideoWatchProgress => "update_video_watch_progress",
            Operation::GetModuleProgress => "get_module_progress",
        };
        f.write_str(name)
    }
}

/// Injection key: an operation, optionally narrowed to one target ID.
type Key = (Operation, Option<String>);

#[derive(Debug, Default)]
struct MemoryState {
    courses: HashMap<CourseId, Vec<ModuleRecord>>,
    contents: HashMap<ModuleId, Vec<ContentRecord>>,
    videos: HashMap<ModuleId, Vec<VideoRecord>>,
    quizzes: HashMap<ModuleId, Vec<QuizRecord>>,
    content_progress: HashMap<ContentId, ContentProgress>,
    video_progress: HashMap<VideoId, VideoProgress>,
    submissions: HashMap<QuizId, QuizSubmission>,
    module_progress: HashMap<ModuleId, ModuleSnapshot>,
    failures: HashMap<Key, BackendError>,
    delays: HashMap<Key, Duration>,
    calls: HashMap<Key, usize>,
    viewed: Vec<ContentId>,
    video_updates: Vec<(VideoId, VideoProgressUpdate)>,
}

impl MemoryState {
    fn lookup<'a, T>(map: &'a HashMap<Key, T>, op: Operation, target: &str) -> Option<&'a T> {
        map.get(&(op, Some(target.to_string())))
            .or_else(|| map.get(&(op, None)))
    }
}

/// Learning backend answering from scripted in-memory data.
///
/// Unknown courses fail with [`BackendError::NotFound`]. Unknown modules
/// list no items and report an empty snapshot; unknown items report no
/// progress.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a course with its modules.
    pub fn with_course(mut self, course_id: impl Into<CourseId>, modules: Vec<ModuleRecord>) -> Self {
        self.state.get_mut().courses.insert(course_id.into(), modules);
        self
    }

    /// Sets the content listing of a module.
    pub fn with_contents(mut self, module_id: impl Into<ModuleId>, contents: Vec<ContentRecord>) -> Self {
        self.state.get_mut().contents.insert(module_id.into(), contents);
        self
    }

    /// Sets the video listing of a module.
    pub fn with_videos(mut self, module_id: impl Into<ModuleId>, videos: Vec<VideoRecord>) -> Self {
        self.state.get_mut().videos.insert(module_id.into(), videos);
        self
    }

    /// Sets the quiz listing of a module.
    pub fn with_quizzes(mut self, module_id: impl Into<ModuleId>, quizzes: Vec<QuizRecord>) -> Self {
        self.state.get_mut().quizzes.insert(module_id.into(), quizzes);
        self
    }

    /// Sets the progress reported for a content item.
    pub fn with_content_progress(mut self, content_id: impl Into<ContentId>, progress: ContentProgress) -> Self {
        self.state
            .get_mut()
            .content_progress
            .insert(content_id.into(), progress);
        self
    }

    /// Sets the progress reported for a video.
    pub fn with_video_progress(mut self, video_id: impl Into<VideoId>, progress: VideoProgress) -> Self {
        self.state
            .get_mut()
            .video_progress
            .insert(video_id.into(), progress);
        self
    }

    /// Sets the submission reported for a quiz.
    pub fn with_submission(mut self, quiz_id: impl Into<QuizId>, submission: QuizSubmission) -> Self {
        self.state
            .get_mut()
            .submissions
            .insert(quiz_id.into(), submission);
        self
    }

    /// Sets the snapshot reported by the module progress endpoint.
    pub fn with_module_progress(mut self, module_id: impl Into<ModuleId>, snapshot: ModuleSnapshot) -> Self {
        self.state
            .get_mut()
            .module_progress
            .insert(module_id.into(), snapshot);
        self
    }

    /// Delays every call of `op` by `delay`.
    pub fn with_delay(mut self, op: Operation, delay: Duration) -> Self {
        self.state.get_mut().delays.insert((op, None), delay);
        self
    }

    /// Delays calls of `op` for `target` by `delay`.
    pub fn with_delay_for(mut self, op: Operation, target: impl Into<String>, delay: Duration) -> Self {
        self.state
            .get_mut()
            .delays
            .insert((op, Some(target.into())), delay);
        self
    }

    /// Makes every call of `op` fail with `error`.
    pub async fn fail(&self, op: Operation, error: BackendError) {
        self.state.write().await.failures.insert((op, None), error);
    }

    /// Makes calls of `op` for `target` fail with `error`.
    pub async fn fail_for(&self, op: Operation, target: impl Into<String>, error: BackendError) {
        self.state
            .write()
            .await
            .failures
            .insert((op, Some(target.into())), error);
    }

    /// Removes all injected failures.
    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    /// Replaces the snapshot reported by the module progress endpoint.
    pub async fn set_module_progress(&self, module_id: impl Into<ModuleId>, snapshot: ModuleSnapshot) {
        self.state
            .write()
            .await
            .module_progress
            .insert(module_id.into(), snapshot);
    }

    /// Replaces the submission reported for a quiz.
    pub async fn set_submission(&self, quiz_id: impl Into<QuizId>, submission: QuizSubmission) {
        self.state
            .write()
            .await
            .submissions
            .insert(quiz_id.into(), submission);
    }

    /// Number of calls of `op`, failed ones included.
    pub async fn calls(&self, op: Operation) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|((o, _), _)| *o == op)
            .map(|(_, n)| n)
            .sum()
    }

    /// Number of calls of `op` for `target`, failed ones included.
    pub async fn calls_for(&self, op: Operation, target: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .get(&(op, Some(target.to_string())))
            .copied()
            .unwrap_or(0)
    }

    /// Content items successfully marked viewed, in call order.
    pub async fn viewed_contents(&self) -> Vec<ContentId> {
        self.state.read().await.viewed.clone()
    }

    /// Video progress updates successfully recorded, in call order.
    pub async fn video_updates(&self) -> Vec<(VideoId, VideoProgressUpdate)> {
        self.state.read().await.video_updates.clone()
    }

    /// Counts the call, then applies any injected delay and failure.
    async fn enter(&self, op: Operation, target: &str) -> Result<()> {
        let (delay, failure) = {
            let mut state = self.state.write().await;
            *state.calls.entry((op, Some(target.to_string()))).or_insert(0) += 1;
            (
                MemoryState::lookup(&state.delays, op, target).copied(),
                MemoryState::lookup(&state.failures, op, target).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => {
                trace!(op = %op, target = %target, error = %err, "injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LearningBackend for MemoryBackend {
    async fn list_modules(&self, course_id: &CourseId) -> Result<Vec<ModuleRecord>> {
        self.enter(Operation::ListModules, course_id.as_str()).await?;
        self.state
            .read()
            .await
            .courses
            .get(course_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("course {}", course_id)))
    }

    async fn list_contents(&self, module_id: &ModuleId, _published_only: bool) -> Result<Vec<ContentRecord>> {
        self.enter(Operation::ListContents, module_id.as_str()).await?;
        Ok(self
            .state
            .read()
            .await
            .contents
            .get(module_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_videos(&self, module_id: &ModuleId, _published_only: bool) -> Result<Vec<VideoRecord>> {
        self.enter(Operation::ListVideos, module_id.as_str()).await?;
        Ok(self
            .state
            .read()
            .await
            .videos
            .get(module_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_quizzes(&self, module_id: &ModuleId, _published_only: bool) -> Result<Vec<QuizRecord>> {
        self.enter(Operation::ListQuizzes, module_id.as_str()).await?;
        Ok(self
            .state
            .read()
            .await
            .quizzes
            .get(module_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_content_progress(&self, content_id: &ContentId) -> Result<ContentProgress> {
        self.enter(Operation::GetContentProgress, content_id.as_str())
            .await?;
        Ok(self
            .state
            .read()
            .await
            .content_progress
            .get(content_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_video_progress(&self, video_id: &VideoId) -> Result<VideoProgress> {
        self.enter(Operation::GetVideoProgress, video_id.as_str()).await?;
        Ok(self
            .state
            .read()
            .await
            .video_progress
            .get(video_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn check_quiz_submission(&self, quiz_id: &QuizId) -> Result<QuizSubmission> {
        self.enter(Operation::CheckQuizSubmission, quiz_id.as_str())
            .await?;
        Ok(self
            .state
            .read()
            .await
            .submissions
            .get(quiz_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_content_viewed(&self, content_id: &ContentId) -> Result<()> {
        self.enter(Operation::MarkContentViewed, content_id.as_str())
            .await?;
        let mut state = self.state.write().await;
        state.viewed.push(content_id.clone());
        state
            .content_progress
            .entry(content_id.clone())
            .or_default()
            .viewed = true;
        Ok(())
    }

    async fn update_video_watch_progress(
        &self,
        video_id: &VideoId,
        watched_seconds: f64,
        total_seconds: f64,
    ) -> Result<()> {
        self.enter(Operation::UpdateVideoWatchProgress, video_id.as_str())
            .await?;
        let mut state = self.state.write().await;
        state.video_updates.push((
            video_id.clone(),
            VideoProgressUpdate {
                watched_seconds,
                total_seconds,
            },
        ));
        if total_seconds > 0.0 {
            let pct = (100.0 * watched_seconds / total_seconds).clamp(0.0, 100.0);
            let progress = state.video_progress.entry(video_id.clone()).or_default();
            if pct > progress.watched_percentage {
                progress.watched_percentage = pct;
            }
        }
        Ok(())
    }

    async fn get_module_progress(&self, module_id: &ModuleId) -> Result<ModuleSnapshot> {
        self.enter(Operation::GetModuleProgress, module_id.as_str())
            .await?;
        Ok(self
            .state
            .read()
            .await
            .module_progress
            .get(module_id)
            .copied()
            .unwrap_or_default())
    }
}
