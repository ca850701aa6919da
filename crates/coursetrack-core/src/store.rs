//! CompletionStore - in-memory completion state for one course view.
//!
//! The store owns every tracked [`Module`] and routes updates to the
//! [`ReconciliationEngine`]. Each open view gets a fresh [`Generation`];
//! every update carries the generation it was issued under and is rejected
//! once the view it belongs to has been closed or replaced. In-flight
//! fetches are never cancelled, so this is what keeps a late response from
//! landing in the wrong view.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use coursetrack_models::{
    Category, ContentId, ContentItem, ContentProgress, ContentRecord, CourseId, ItemRef,
    LearningItem, Module, ModuleId, ModuleRecord, ModuleSnapshot, ModuleSummary, QuizId,
    QuizItem, QuizRecord, QuizSubmission, VideoId, VideoItem, VideoProgress, VideoRecord,
};

use crate::config::EngineConfig;
use crate::error::{Result, StoreError};
use crate::reconcile::{is_forced, Aggregates, ItemSnapshot, Origin, ReconciliationEngine};

/// Identifies one open view of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    /// Returns the numeric value.
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of applying an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Module the update landed in.
    pub module_id: ModuleId,
    /// Whether anything changed.
    pub changed: bool,
}

/// In-memory completion state of the modules in view.
#[derive(Debug, Default)]
pub struct CompletionStore {
    engine: ReconciliationEngine,
    generation: Generation,
    course_id: Option<CourseId>,
    modules: HashMap<ModuleId, Module>,
    /// Module IDs sorted by position.
    order: Vec<ModuleId>,
    /// Owning module of every listed item.
    owners: HashMap<ItemRef, ModuleId>,
}

impl CompletionStore {
    /// Creates an empty store.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            engine: ReconciliationEngine::new(config),
            ..Self::default()
        }
    }

    /// The engine used for all merges.
    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    /// Generation of the current view.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Course of the current view, if one is open.
    pub fn course_id(&self) -> Option<&CourseId> {
        self.course_id.as_ref()
    }

    /// Starts a new view of `course_id`, discarding all tracked state.
    pub fn open(&mut self, course_id: CourseId) -> Generation {
        self.reset();
        debug!(course_id = %course_id, generation = %self.generation, "view opened");
        self.course_id = Some(course_id);
        self.generation
    }

    /// Ends the current view, discarding all tracked state.
    pub fn close(&mut self) -> Generation {
        self.reset();
        debug!(generation = %self.generation, "view closed");
        self.generation
    }

    /// Returns true if `generation` is the current view.
    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation && self.course_id.is_some()
    }

    /// Tracks the modules of the current course and adopts their snapshots.
    ///
    /// Returns the IDs of the tracked modules in position order.
    pub fn track_modules(&mut self, generation: Generation, records: &[ModuleRecord]) -> Result<Vec<ModuleId>> {
        self.check(generation)?;
        for record in records {
            let module = self
                .modules
                .entry(record.id.clone())
                .or_insert_with(|| Module::new(record.id.clone()));
            module.title = record.title.clone();
            module.position = record.position;
            module.published = record.published;
            self.engine.adopt_snapshot(module, &record.progress);
            trace!(module_id = %record.id, snapshot = ?record.progress, "module tracked");
        }

        let mut order: Vec<&Module> = self.modules.values().collect();
        order.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        self.order = order.into_iter().map(|m| m.id.clone()).collect();
        Ok(self.order.clone())
    }

    /// Merges the content listing of a module.
    pub fn apply_contents(
        &mut self,
        generation: Generation,
        module_id: &ModuleId,
        records: &[ContentRecord],
    ) -> Result<Update> {
        self.check(generation)?;
        let module = tracked_module(&mut self.modules, module_id)?;
        let changed = self.engine.apply_contents(module, records);
        for record in records {
            claim_owner(&mut self.owners, ItemRef::Content(record.id.clone()), module_id);
        }
        Ok(Update {
            module_id: module_id.clone(),
            changed,
        })
    }

    /// Merges the video listing of a module.
    pub fn apply_videos(
        &mut self,
        generation: Generation,
        module_id: &ModuleId,
        records: &[VideoRecord],
    ) -> Result<Update> {
        self.check(generation)?;
        let module = tracked_module(&mut self.modules, module_id)?;
        let changed = self.engine.apply_videos(module, records);
        for record in records {
            claim_owner(&mut self.owners, ItemRef::Video(record.id.clone()), module_id);
        }
        Ok(Update {
            module_id: module_id.clone(),
            changed,
        })
    }

    /// Merges the quiz listing of a module.
    pub fn apply_quizzes(
        &mut self,
        generation: Generation,
        module_id: &ModuleId,
        records: &[QuizRecord],
    ) -> Result<Update> {
        self.check(generation)?;
        let module = tracked_module(&mut self.modules, module_id)?;
        let changed = self.engine.apply_quizzes(module, records);
        for record in records {
            claim_owner(&mut self.owners, ItemRef::Quiz(record.id.clone()), module_id);
        }
        Ok(Update {
            module_id: module_id.clone(),
            changed,
        })
    }

    /// Merges a content progress fetch.
    pub fn apply_content_progress(
        &mut self,
        generation: Generation,
        id: &ContentId,
        progress: &ContentProgress,
    ) -> Result<Update> {
        self.check(generation)?;
        let (module_id, module) = owned_module(&self.owners, &mut self.modules, &ItemRef::Content(id.clone()))?;
        let changed = self.engine.apply_content_progress(module, id, progress)?;
        Ok(Update { module_id, changed })
    }

    /// Merges a video progress fetch.
    pub fn apply_video_progress(
        &mut self,
        generation: Generation,
        id: &VideoId,
        progress: &VideoProgress,
    ) -> Result<Update> {
        self.check(generation)?;
        let (module_id, module) = owned_module(&self.owners, &mut self.modules, &ItemRef::Video(id.clone()))?;
        let changed = self.engine.apply_video_progress(module, id, progress)?;
        Ok(Update { module_id, changed })
    }

    /// Merges a quiz submission check.
    pub fn apply_quiz_submission(
        &mut self,
        generation: Generation,
        id: &QuizId,
        submission: &QuizSubmission,
        origin: Origin,
    ) -> Result<Update> {
        self.check(generation)?;
        let (module_id, module) = owned_module(&self.owners, &mut self.modules, &ItemRef::Quiz(id.clone()))?;
        let changed = self
            .engine
            .apply_quiz_submission(module, id, submission, origin)?;
        Ok(Update { module_id, changed })
    }

    /// Merges a snapshot fetched after a learner action.
    pub fn refresh_module(
        &mut self,
        generation: Generation,
        module_id: &ModuleId,
        snapshot: &ModuleSnapshot,
    ) -> Result<Update> {
        self.check(generation)?;
        let module = tracked_module(&mut self.modules, module_id)?;
        let changed = self.engine.refresh(module, snapshot);
        Ok(Update {
            module_id: module_id.clone(),
            changed,
        })
    }

    /// Marks a content item viewed by the learner.
    pub fn mark_content_viewed(
        &mut self,
        generation: Generation,
        id: &ContentId,
        at: DateTime<Utc>,
    ) -> Result<Update> {
        self.check(generation)?;
        let (module_id, module) = owned_module(&self.owners, &mut self.modules, &ItemRef::Content(id.clone()))?;
        let changed = self.engine.mark_content_viewed(module, id, at)?;
        Ok(Update { module_id, changed })
    }

    /// Records a watched percentage observed by the player.
    pub fn observe_video(&mut self, generation: Generation, id: &VideoId, percentage: f64) -> Result<Update> {
        self.check(generation)?;
        let (module_id, module) = owned_module(&self.owners, &mut self.modules, &ItemRef::Video(id.clone()))?;
        let changed = self.engine.observe_video(module, id, percentage)?;
        Ok(Update { module_id, changed })
    }

    /// Captures an item and its module's aggregates for a later rollback.
    pub fn capture(&self, item: &ItemRef) -> Result<(ItemSnapshot, Aggregates)> {
        let module = self.owner(item)?;
        let snapshot = ItemSnapshot::capture(module, item)
            .ok_or_else(|| StoreError::ItemNotTracked(item.to_string()))?;
        Ok((snapshot, Aggregates::capture(module)))
    }

    /// Undoes an optimistic learner action (see [`ReconciliationEngine::rollback`]).
    pub fn rollback(
        &mut self,
        generation: Generation,
        item_before: &ItemSnapshot,
        item_after: &ItemSnapshot,
        aggregates_before: &Aggregates,
        aggregates_after: &Aggregates,
    ) -> Result<Update> {
        self.check(generation)?;
        let (module_id, module) = owned_module(&self.owners, &mut self.modules, &item_before.item_ref())?;
        let changed = self.engine.rollback(
            module,
            item_before,
            item_after,
            aggregates_before,
            aggregates_after,
        )?;
        Ok(Update { module_id, changed })
    }

    /// Gets a module by ID.
    pub fn module(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    /// Tracked modules in position order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(|id| self.modules.get(id))
    }

    /// Summaries of all tracked modules in position order.
    pub fn summaries(&self) -> Vec<ModuleSummary> {
        self.modules().map(Module::summary).collect()
    }

    /// Owning module of an item.
    pub fn module_of(&self, item: &ItemRef) -> Option<&ModuleId> {
        self.owners.get(item)
    }

    /// Gets a content item by ID.
    pub fn content(&self, id: &ContentId) -> Option<&ContentItem> {
        self.owner(&ItemRef::Content(id.clone()))
            .ok()
            .and_then(|m| m.contents.iter().find(|c| &c.id == id))
    }

    /// Gets a video item by ID.
    pub fn video(&self, id: &VideoId) -> Option<&VideoItem> {
        self.owner(&ItemRef::Video(id.clone()))
            .ok()
            .and_then(|m| m.videos.iter().find(|v| &v.id == id))
    }

    /// Gets a quiz item by ID.
    pub fn quiz(&self, id: &QuizId) -> Option<&QuizItem> {
        self.owner(&ItemRef::Quiz(id.clone()))
            .ok()
            .and_then(|m| m.quizzes.iter().find(|q| &q.id == id))
    }

    /// Items of a module whose completion is still ambiguous.
    ///
    /// Excludes items that already reported and whole categories the
    /// backend asserted complete.
    pub fn pending_progress(&self, module_id: &ModuleId) -> Vec<ItemRef> {
        let Some(module) = self.modules.get(module_id) else {
            return Vec::new();
        };
        let mut pending = Vec::new();
        if !is_forced(module, Category::Content) {
            pending.extend(
                module
                    .contents
                    .iter()
                    .filter(|c| !c.is_reported())
                    .map(|c| ItemRef::Content(c.id.clone())),
            );
        }
        if !is_forced(module, Category::Video) {
            pending.extend(
                module
                    .videos
                    .iter()
                    .filter(|v| !v.is_reported())
                    .map(|v| ItemRef::Video(v.id.clone())),
            );
        }
        if !is_forced(module, Category::Quiz) {
            pending.extend(
                module
                    .quizzes
                    .iter()
                    .filter(|q| !q.is_reported())
                    .map(|q| ItemRef::Quiz(q.id.clone())),
            );
        }
        pending
    }

    /// Number of tracked modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if no module is tracked.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn reset(&mut self) {
        self.generation = self.generation.next();
        self.course_id = None;
        self.modules.clear();
        self.order.clear();
        self.owners.clear();
    }

    fn check(&self, generation: Generation) -> Result<()> {
        if generation != self.generation || self.course_id.is_none() {
            return Err(StoreError::StaleGeneration {
                issued: generation.value(),
                current: self.generation.value(),
            });
        }
        Ok(())
    }

    fn owner(&self, item: &ItemRef) -> Result<&Module> {
        let module_id = self
            .owners
            .get(item)
            .ok_or_else(|| StoreError::ItemNotTracked(item.to_string()))?;
        self.modules
            .get(module_id)
            .ok_or_else(|| StoreError::ModuleNotTracked(module_id.to_string()))
    }
}

fn tracked_module<'a>(modules: &'a mut HashMap<ModuleId, Module>, id: &ModuleId) -> Result<&'a mut Module> {
    modules
        .get_mut(id)
        .ok_or_else(|| StoreError::ModuleNotTracked(id.to_string()))
}

/// Records `module_id` as the owner of `item`; the latest listing wins.
fn claim_owner(owners: &mut HashMap<ItemRef, ModuleId>, item: ItemRef, module_id: &ModuleId) {
    if let Some(previous) = owners.get(&item) {
        if previous != module_id {
            warn!(%item, from = %previous, to = %module_id, "item listed in two modules, moving owner");
        }
    }
    owners.insert(item, module_id.clone());
}

fn owned_module<'a>(
    owners: &HashMap<ItemRef, ModuleId>,
    modules: &'a mut HashMap<ModuleId, Module>,
    item: &ItemRef,
) -> Result<(ModuleId, &'a mut Module)> {
    let module_id = owners
        .get(item)
        .cloned()
        .ok_or_else(|| StoreError::ItemNotTracked(item.to_string()))?;
    let module = tracked_module(modules, &module_id)?;
    Ok((module_id, module))
}
