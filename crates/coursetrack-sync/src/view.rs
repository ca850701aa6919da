//! CourseView - the handle a UI holds while a course is on screen.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use coursetrack_backend::LearningBackend;
use coursetrack_core::Generation;
use coursetrack_models::{
    ContentId, CourseId, ItemRef, ItemState, Module, ModuleId, ModuleSummary, QuizId, VideoId,
};

use crate::config::SyncConfig;
use crate::context::{item_state, SyncContext};
use crate::error::Result;
use crate::event::ProgressEvent;
use crate::loader::{LoadReport, Loader};
use crate::sync::{EventSync, VideoTick};

/// Reconciled completion state of one course view.
///
/// Opening a course starts a new view generation; results of fetches issued
/// for an earlier view are discarded when they arrive.
pub struct CourseView {
    ctx: SyncContext,
    loader: Loader,
    sync: EventSync,
}

impl CourseView {
    /// Creates a view with nothing open.
    pub fn new(backend: Arc<dyn LearningBackend>, config: SyncConfig) -> Self {
        let ctx = SyncContext::new(backend, config);
        Self {
            loader: Loader::new(ctx.clone()),
            sync: EventSync::new(ctx.clone()),
            ctx,
        }
    }

    /// Opens a course and loads its modules.
    ///
    /// A course already open is left first, flushing its pending video
    /// progress.
    pub async fn open(&self, course_id: impl Into<CourseId>) -> Result<LoadReport> {
        let course_id = course_id.into();
        if self.is_open().await {
            self.leave_view().await;
        }
        let generation = self.ctx.store.write().await.open(course_id.clone());
        info!(course_id = %course_id, generation = %generation, "opening course");
        self.loader.load(&course_id, generation).await
    }

    /// Flushes pending video progress and stops tracking every module.
    ///
    /// Fetches still in flight are discarded when they arrive.
    pub async fn leave_view(&self) {
        let flushed = self.sync.flush().await;
        self.sync.reset().await;
        let mut store = self.ctx.store.write().await;
        let course_id = store.course_id().cloned();
        let generation = store.close();
        if let Some(course_id) = course_id {
            info!(course_id = %course_id, generation = %generation, flushed, "left course");
        }
    }

    /// Returns true if a course is open.
    pub async fn is_open(&self) -> bool {
        self.ctx.store.read().await.course_id().is_some()
    }

    /// Course of the current view.
    pub async fn course_id(&self) -> Option<CourseId> {
        self.ctx.store.read().await.course_id().cloned()
    }

    /// Generation of the current view.
    pub async fn generation(&self) -> Generation {
        self.ctx.generation().await
    }

    /// Summaries of all modules in position order.
    pub async fn summaries(&self) -> Vec<ModuleSummary> {
        self.ctx.store.read().await.summaries()
    }

    /// Copy of a tracked module.
    pub async fn module(&self, module_id: &ModuleId) -> Option<Module> {
        self.ctx.store.read().await.module(module_id).cloned()
    }

    /// Completion percentage of a module, once known.
    pub async fn completion_percentage(&self, module_id: &ModuleId) -> Option<u8> {
        self.ctx
            .store
            .read()
            .await
            .module(module_id)
            .and_then(|m| m.completion_percentage.value)
    }

    /// Returns true if the module is known to be complete.
    pub async fn is_module_completed(&self, module_id: &ModuleId) -> bool {
        self.ctx
            .store
            .read()
            .await
            .module(module_id)
            .is_some_and(Module::is_module_completed)
    }

    /// Whether a tracked content item is completed.
    pub async fn is_content_completed(&self, content_id: &ContentId) -> Option<bool> {
        self.ctx
            .store
            .read()
            .await
            .content(content_id)
            .map(|c| c.is_completed)
    }

    /// Watched percentage of a tracked video.
    pub async fn watched_percentage(&self, video_id: &VideoId) -> Option<f64> {
        self.ctx
            .store
            .read()
            .await
            .video(video_id)
            .map(|v| v.watched_percentage)
    }

    /// Learner-facing state of a tracked item.
    pub async fn item_state(&self, item: &ItemRef) -> Option<ItemState> {
        item_state(&*self.ctx.store.read().await, item)
    }

    /// See [`EventSync::mark_content_viewed`].
    pub async fn mark_content_viewed(&self, content_id: &ContentId) -> Result<()> {
        self.sync.mark_content_viewed(content_id).await
    }

    /// See [`EventSync::record_video_tick`].
    pub async fn record_video_tick(
        &self,
        video_id: &VideoId,
        watched_seconds: f64,
        total_seconds: f64,
    ) -> Result<VideoTick> {
        self.sync
            .record_video_tick(video_id, watched_seconds, total_seconds)
            .await
    }

    /// See [`EventSync::finish_video`].
    pub async fn finish_video(&self, video_id: &VideoId) -> Result<bool> {
        self.sync.finish_video(video_id).await
    }

    /// See [`EventSync::check_quiz_completion`].
    pub async fn check_quiz_completion(&self, quiz_id: &QuizId) -> Result<ItemState> {
        self.sync.check_quiz_completion(quiz_id).await
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.ctx.subscribe()
    }
}
