//! Optimistic learner actions.
//!
//! A command applies a learner action to the store right away and captures
//! the item and module aggregates before and after, so the action can be
//! undone if persisting it fails.

use chrono::{DateTime, Utc};

use coursetrack_core::{Aggregates, CompletionStore, Generation, ItemSnapshot, StoreError, Update};
use coursetrack_models::{ContentId, ItemRef, LearningItem, ModuleId, VideoId};

/// An applied optimistic change and what it replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticUpdate {
    /// View the change was applied in.
    pub generation: Generation,
    /// Owning module of the item.
    pub module_id: ModuleId,
    item_before: ItemSnapshot,
    item_after: ItemSnapshot,
    aggregates_before: Aggregates,
    aggregates_after: Aggregates,
}

impl OptimisticUpdate {
    /// The item the change targeted.
    pub fn item(&self) -> ItemRef {
        self.item_before.item_ref()
    }

    /// Returns true if the change completed the item.
    pub fn completes_item(&self) -> bool {
        !snapshot_completed(&self.item_before) && snapshot_completed(&self.item_after)
    }

    /// Combines two consecutive changes of the same item into one that
    /// reverts to the state before `self`.
    pub fn then(self, later: OptimisticUpdate) -> OptimisticUpdate {
        OptimisticUpdate {
            item_after: later.item_after,
            aggregates_after: later.aggregates_after,
            ..self
        }
    }

    /// Undoes the change where nothing else has touched it since.
    pub fn revert(&self, store: &mut CompletionStore) -> Result<Update, StoreError> {
        store.rollback(
            self.generation,
            &self.item_before,
            &self.item_after,
            &self.aggregates_before,
            &self.aggregates_after,
        )
    }
}

/// Learner opened a content item.
#[derive(Debug, Clone)]
pub struct ContentViewCommand {
    pub content_id: ContentId,
    pub viewed_at: DateTime<Utc>,
}

impl ContentViewCommand {
    pub fn new(content_id: ContentId, viewed_at: DateTime<Utc>) -> Self {
        Self {
            content_id,
            viewed_at,
        }
    }

    /// Marks the content viewed.
    ///
    /// Returns no [`OptimisticUpdate`] when the content was already complete:
    /// there is nothing to persist or undo.
    pub fn execute(
        &self,
        store: &mut CompletionStore,
        generation: Generation,
    ) -> Result<(Update, Option<OptimisticUpdate>), StoreError> {
        let item = ItemRef::Content(self.content_id.clone());
        let content = store
            .content(&self.content_id)
            .ok_or_else(|| StoreError::ItemNotTracked(item.to_string()))?;
        if content.is_completed() {
            let update = Update {
                module_id: content.module_id.clone(),
                changed: false,
            };
            return Ok((update, None));
        }

        let (item_before, aggregates_before) = store.capture(&item)?;
        let update = store.mark_content_viewed(generation, &self.content_id, self.viewed_at)?;
        let (item_after, aggregates_after) = store.capture(&item)?;
        let optimistic = OptimisticUpdate {
            generation,
            module_id: update.module_id.clone(),
            item_before,
            item_after,
            aggregates_before,
            aggregates_after,
        };
        Ok((update, Some(optimistic)))
    }
}

/// Player reported a new position in a video.
#[derive(Debug, Clone)]
pub struct VideoProgressCommand {
    pub video_id: VideoId,
    pub watched_percentage: f64,
}

impl VideoProgressCommand {
    pub fn new(video_id: VideoId, watched_percentage: f64) -> Self {
        Self {
            video_id,
            watched_percentage,
        }
    }

    /// Records the watched percentage.
    pub fn execute(
        &self,
        store: &mut CompletionStore,
        generation: Generation,
    ) -> Result<(Update, OptimisticUpdate), StoreError> {
        let item = ItemRef::Video(self.video_id.clone());
        let (item_before, aggregates_before) = store.capture(&item)?;
        let update = store.observe_video(generation, &self.video_id, self.watched_percentage)?;
        let (item_after, aggregates_after) = store.capture(&item)?;
        let optimistic = OptimisticUpdate {
            generation,
            module_id: update.module_id.clone(),
            item_before,
            item_after,
            aggregates_before,
            aggregates_after,
        };
        Ok((update, optimistic))
    }
}

fn snapshot_completed(snapshot: &ItemSnapshot) -> bool {
    match snapshot {
        ItemSnapshot::Content(item) => item.is_completed(),
        ItemSnapshot::Video(item) => item.is_completed(),
        ItemSnapshot::Quiz(item) => item.is_completed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursetrack_core::EngineConfig;
    use coursetrack_models::{Completion, ContentRecord, CourseId, ModuleRecord, VideoRecord};

    fn store() -> (CompletionStore, Generation) {
        let mut store = CompletionStore::new(&EngineConfig::default());
        let generation = store.open(CourseId::from("course-1"));
        store
            .track_modules(generation, &[ModuleRecord::builder("m1").build()])
            .unwrap();
        let m1 = ModuleId::from("m1");
        store
            .apply_contents(generation, &m1, &[ContentRecord::new("c1").completed(false)])
            .unwrap();
        store
            .apply_videos(generation, &m1, &[VideoRecord::new("v1").watched(0.0)])
            .unwrap();
        store.apply_quizzes(generation, &m1, &[]).unwrap();
        (store, generation)
    }

    #[test]
    fn test_content_view_execute_and_revert() {
        let (mut store, generation) = store();
        let command = ContentViewCommand::new("c1".into(), Utc::now());

        let (update, optimistic) = command.execute(&mut store, generation).unwrap();
        assert!(update.changed);
        let optimistic = optimistic.unwrap();
        assert!(optimistic.completes_item());
        assert_eq!(optimistic.item(), ItemRef::Content("c1".into()));
        assert!(store.content(&"c1".into()).unwrap().is_completed);

        optimistic.revert(&mut store).unwrap();
        assert!(!store.content(&"c1".into()).unwrap().is_completed);
        let module = store.module(&"m1".into()).unwrap();
        assert_eq!(module.content_completed.value, Completion::INCOMPLETE);
    }

    #[test]
    fn test_content_view_already_complete() {
        let (mut store, generation) = store();
        let command = ContentViewCommand::new("c1".into(), Utc::now());
        command.execute(&mut store, generation).unwrap();

        let (update, optimistic) = command.execute(&mut store, generation).unwrap();
        assert!(!update.changed);
        assert!(optimistic.is_none());
    }

    #[test]
    fn test_content_view_untracked() {
        let (mut store, generation) = store();
        let command = ContentViewCommand::new("nope".into(), Utc::now());
        let err = command.execute(&mut store, generation).unwrap_err();
        assert_eq!(err, StoreError::ItemNotTracked("content:nope".to_string()));
    }

    #[test]
    fn test_video_updates_chain_back_to_first() {
        let (mut store, generation) = store();
        let first = VideoProgressCommand::new("v1".into(), 40.0)
            .execute(&mut store, generation)
            .unwrap()
            .1;
        let second = VideoProgressCommand::new("v1".into(), 95.0)
            .execute(&mut store, generation)
            .unwrap()
            .1;
        assert!(!first.completes_item());
        assert!(second.completes_item());

        let combined = first.then(second);
        assert!(combined.completes_item());

        combined.revert(&mut store).unwrap();
        let video = store.video(&"v1".into()).unwrap();
        assert_eq!(video.watched_percentage, 0.0);
        assert!(!video.is_completed);
    }

    #[test]
    fn test_revert_keeps_newer_progress() {
        let (mut store, generation) = store();
        let optimistic = VideoProgressCommand::new("v1".into(), 40.0)
            .execute(&mut store, generation)
            .unwrap()
            .1;
        // A later tick moved the video on before the first write failed.
        store.observe_video(generation, &"v1".into(), 60.0).unwrap();

        optimistic.revert(&mut store).unwrap();
        assert_eq!(store.video(&"v1".into()).unwrap().watched_percentage, 60.0);
    }
}
