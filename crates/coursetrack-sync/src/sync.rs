//! EventSync - learner actions with optimistic updates.
//!
//! Each action updates the store immediately, then persists through the
//! backend. A failed write rolls the optimistic change back and is returned
//! to the caller. A successful write triggers a refresh of the owning
//! module's snapshot, merged so that locally known flags are kept.
//!
//! A content view requested again while its first write is in flight
//! waits for that write and reports its outcome.
//!
//! Video progress is persisted in batches: once enough watched time has
//! accumulated since the last write, when a tick completes the video, or
//! when the stream ends.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use coursetrack_backend::BackendError;
use coursetrack_core::{Generation, Origin, StoreError};
use coursetrack_models::{ContentId, ItemRef, ItemState, LearningItem, ModuleId, QuizId, QuizSubmission, VideoId};

use crate::command::{ContentViewCommand, OptimisticUpdate, VideoProgressCommand};
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::event::ProgressEvent;

/// Result of one video progress tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoTick {
    /// Watched percentage held by the store after the tick.
    pub watched_percentage: f64,
    /// Whether the video is completed.
    pub completed: bool,
    /// Whether the tick was written to the backend.
    pub persisted: bool,
}

/// Outcome of a content view write, shared with duplicate requests.
type ContentWrite = std::result::Result<(), BackendError>;

/// Per-video write bookkeeping.
#[derive(Debug, Default)]
struct VideoTracker {
    /// Position of the last successful or in-flight write.
    persisted_seconds: f64,
    /// Furthest position observed.
    last_watched: f64,
    last_total: f64,
    /// Ticks observed since the last write.
    dirty: bool,
    /// Optimistic changes since the last confirmed write.
    unconfirmed: Option<OptimisticUpdate>,
}

/// Handles learner actions for the current view.
pub struct EventSync {
    ctx: SyncContext,
    videos: Mutex<HashMap<VideoId, VideoTracker>>,
    /// Content view writes in flight.
    content_writes: Mutex<HashMap<ContentId, watch::Receiver<Option<ContentWrite>>>>,
}

impl EventSync {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            videos: Mutex::new(HashMap::new()),
            content_writes: Mutex::new(HashMap::new()),
        }
    }

    /// Marks a content item viewed and persists it.
    ///
    /// Content that is already complete is left alone without a write,
    /// unless a write for it is still in flight; the call then returns
    /// that write's outcome.
    pub async fn mark_content_viewed(&self, content_id: &ContentId) -> Result<()> {
        let generation = self.ctx.generation().await;
        let item = ItemRef::Content(content_id.clone());
        let command = ContentViewCommand::new(content_id.clone(), Utc::now());

        // Applying and registering under one lock keeps a duplicate from
        // seeing the optimistic change before the pending write.
        let (optimistic, done) = {
            let mut writes = self.content_writes.lock().await;
            let (_, optimistic) = self
                .ctx
                .apply_with(Some(&item), |store| command.execute(store, generation))
                .await?;
            match optimistic {
                Some(optimistic) => {
                    let (done, pending) = watch::channel(None);
                    writes.insert(content_id.clone(), pending);
                    (optimistic, done)
                }
                None => {
                    let pending = writes.get(content_id).cloned();
                    drop(writes);
                    return match pending {
                        Some(pending) => self.join_content_write(content_id, pending).await,
                        None => {
                            debug!(content_id = %content_id, "content already viewed");
                            Ok(())
                        }
                    };
                }
            }
        };

        let outcome = self.ctx.backend.mark_content_viewed(content_id).await;
        {
            let mut writes = self.content_writes.lock().await;
            if let Err(err) = &outcome {
                warn!(content_id = %content_id, error = %err, "content view write failed, rolling back");
                self.revert(&optimistic).await;
            }
            writes.remove(content_id);
            done.send_replace(Some(outcome.clone()));
        }

        match outcome {
            Ok(()) => {
                info!(content_id = %content_id, "content view persisted");
                self.refresh(generation, &optimistic.module_id).await;
                Ok(())
            }
            Err(err) => {
                self.ctx.emit(ProgressEvent::WriteFailed {
                    item: item.clone(),
                    error: err.to_string(),
                });
                Err(SyncError::WriteFailed { item, source: err })
            }
        }
    }

    /// Waits for an in-flight content view write.
    ///
    /// If its caller went away before the write finished, the view is
    /// written again here.
    async fn join_content_write(
        &self,
        content_id: &ContentId,
        mut pending: watch::Receiver<Option<ContentWrite>>,
    ) -> Result<()> {
        debug!(content_id = %content_id, "content view write in flight, waiting for it");
        let outcome = loop {
            let seen = pending.borrow_and_update().clone();
            if let Some(outcome) = seen {
                break outcome;
            }
            if pending.changed().await.is_err() {
                let last = pending.borrow().clone();
                match last {
                    Some(outcome) => break outcome,
                    None => break self.ctx.backend.mark_content_viewed(content_id).await,
                }
            }
        };
        outcome.map_err(|source| SyncError::WriteFailed {
            item: ItemRef::Content(content_id.clone()),
            source,
        })
    }

    /// Records a video position reported by the player.
    pub async fn record_video_tick(
        &self,
        video_id: &VideoId,
        watched_seconds: f64,
        total_seconds: f64,
    ) -> Result<VideoTick> {
        let percentage = watched_percentage(watched_seconds, total_seconds)?;
        let generation = self.ctx.generation().await;
        let item = ItemRef::Video(video_id.clone());
        let command = VideoProgressCommand::new(video_id.clone(), percentage);
        let (_, optimistic) = self
            .ctx
            .apply_with(Some(&item), |store| command.execute(store, generation))
            .await?;

        let completes = optimistic.completes_item();
        let persist = {
            let mut videos = self.videos.lock().await;
            let tracker = videos.entry(video_id.clone()).or_default();
            tracker.last_watched = tracker.last_watched.max(watched_seconds);
            tracker.last_total = total_seconds;
            tracker.dirty = true;
            tracker.unconfirmed = Some(match tracker.unconfirmed.take() {
                Some(earlier) => earlier.then(optimistic),
                None => optimistic,
            });
            completes || tracker.last_watched - tracker.persisted_seconds >= self.ctx.config.persist_interval_seconds
        };

        let persisted = if persist {
            self.persist_video(video_id).await?
        } else {
            false
        };

        let store = self.ctx.store.read().await;
        let video = store
            .video(video_id)
            .ok_or_else(|| StoreError::ItemNotTracked(item.to_string()))?;
        Ok(VideoTick {
            watched_percentage: video.watched_percentage,
            completed: video.is_completed(),
            persisted,
        })
    }

    /// Persists the last observed position of a video if it was not written yet.
    ///
    /// Returns whether a write was made.
    pub async fn finish_video(&self, video_id: &VideoId) -> Result<bool> {
        self.persist_video(video_id).await
    }

    /// Asks the backend whether a quiz was submitted.
    ///
    /// A failed check is logged, not returned: the quiz then counts as not
    /// submitted unless it is already complete.
    pub async fn check_quiz_completion(&self, quiz_id: &QuizId) -> Result<ItemState> {
        let generation = self.ctx.generation().await;
        let item = ItemRef::Quiz(quiz_id.clone());
        let (submission, origin) = match self.ctx.backend.check_quiz_submission(quiz_id).await {
            Ok(submission) if submission.has_submitted => (submission, Origin::Learner),
            Ok(submission) => (submission, Origin::Fetch),
            Err(err) => {
                warn!(quiz_id = %quiz_id, error = %err, "quiz submission check failed");
                (QuizSubmission::default(), Origin::Fetch)
            }
        };

        self.ctx
            .apply(Some(&item), |store| {
                store.apply_quiz_submission(generation, quiz_id, &submission, origin)
            })
            .await?;

        let state = self
            .ctx
            .store
            .read()
            .await
            .quiz(quiz_id)
            .map(|q| q.state())
            .unwrap_or_default();
        debug!(quiz_id = %quiz_id, state = ?state, "quiz checked");
        Ok(state)
    }

    /// Persists every video with unwritten progress.
    ///
    /// Failures are logged and rolled back; returns the number of videos
    /// written.
    pub async fn flush(&self) -> usize {
        let dirty: Vec<VideoId> = {
            let videos = self.videos.lock().await;
            videos
                .iter()
                .filter(|(_, tracker)| tracker.dirty)
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut written = 0;
        for video_id in dirty {
            match self.persist_video(&video_id).await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(err) => warn!(video_id = %video_id, error = %err, "flushing video progress failed"),
            }
        }
        written
    }

    /// Forgets all per-video and pending write bookkeeping.
    pub async fn reset(&self) {
        self.videos.lock().await.clear();
        self.content_writes.lock().await.clear();
    }

    async fn persist_video(&self, video_id: &VideoId) -> Result<bool> {
        let (watched, total, previous, unconfirmed) = {
            let mut videos = self.videos.lock().await;
            let Some(tracker) = videos.get_mut(video_id) else {
                return Ok(false);
            };
            if !tracker.dirty {
                return Ok(false);
            }
            let previous = tracker.persisted_seconds;
            tracker.persisted_seconds = tracker.last_watched;
            tracker.dirty = false;
            (tracker.last_watched, tracker.last_total, previous, tracker.unconfirmed.take())
        };

        match self
            .ctx
            .backend
            .update_video_watch_progress(video_id, watched, total)
            .await
        {
            Ok(()) => {
                info!(video_id = %video_id, watched_seconds = watched, total_seconds = total, "video progress persisted");
                if let Some(update) = unconfirmed {
                    self.refresh(update.generation, &update.module_id).await;
                }
                Ok(true)
            }
            Err(err) => {
                warn!(video_id = %video_id, error = %err, "video progress write failed, rolling back");
                {
                    let mut videos = self.videos.lock().await;
                    if let Some(tracker) = videos.get_mut(video_id) {
                        if tracker.persisted_seconds == watched {
                            tracker.persisted_seconds = previous;
                        }
                    }
                }
                if let Some(update) = unconfirmed {
                    self.revert(&update).await;
                }
                let item = ItemRef::Video(video_id.clone());
                self.ctx.emit(ProgressEvent::WriteFailed {
                    item: item.clone(),
                    error: err.to_string(),
                });
                Err(SyncError::WriteFailed { item, source: err })
            }
        }
    }

    /// Merges the module snapshot after a successful write.
    async fn refresh(&self, generation: Generation, module_id: &ModuleId) {
        match self.ctx.backend.get_module_progress(module_id).await {
            Ok(snapshot) => {
                let applied = self
                    .ctx
                    .apply(None, |store| store.refresh_module(generation, module_id, &snapshot))
                    .await;
                if let Err(err) = applied {
                    self.ctx.discard(&format!("progress of module {}", module_id), &err);
                }
            }
            Err(err) => warn!(module_id = %module_id, error = %err, "module refresh failed"),
        }
    }

    async fn revert(&self, update: &OptimisticUpdate) {
        let item = update.item();
        if let Err(err) = self.ctx.apply(Some(&item), |store| update.revert(store)).await {
            self.ctx.discard(&item.to_string(), &err);
        }
    }
}

/// Watched percentage of a player position, clamped to [0,100].
fn watched_percentage(watched_seconds: f64, total_seconds: f64) -> Result<f64> {
    if !watched_seconds.is_finite() || !total_seconds.is_finite() {
        return Err(SyncError::InvalidProgress(format!(
            "non-finite position {} / {}",
            watched_seconds, total_seconds
        )));
    }
    if total_seconds <= 0.0 {
        return Err(SyncError::InvalidProgress(format!(
            "total duration must be positive, got {}",
            total_seconds
        )));
    }
    Ok((100.0 * watched_seconds / total_seconds).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watched_percentage() {
        assert_eq!(watched_percentage(30.0, 120.0).unwrap(), 25.0);
        assert_eq!(watched_percentage(130.0, 120.0).unwrap(), 100.0);
        assert_eq!(watched_percentage(-5.0, 120.0).unwrap(), 0.0);
    }

    #[test]
    fn test_watched_percentage_rejects_bad_input() {
        assert!(matches!(watched_percentage(10.0, 0.0), Err(SyncError::InvalidProgress(_))));
        assert!(matches!(watched_percentage(10.0, -3.0), Err(SyncError::InvalidProgress(_))));
        assert!(matches!(watched_percentage(f64::NAN, 60.0), Err(SyncError::InvalidProgress(_))));
        assert!(matches!(
            watched_percentage(10.0, f64::INFINITY),
            Err(SyncError::InvalidProgress(_))
        ));
    }
}
