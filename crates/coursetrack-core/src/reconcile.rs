//! Reconciliation of backend snapshots with locally derived completion.
//!
//! # Trust-then-fill
//!
//! 1. Snapshot fields that are known are adopted as ground truth. A category
//!    asserted complete forces every item in it to completed and later
//!    per-item facts for that category are ignored.
//! 2. Categories the snapshot leaves unknown are derived from their items and
//!    stay `Unknown` until the listing and every item have reported.
//! 3. `module_completed` is adopted only from a snapshot that carries all
//!    four flags; otherwise it is derived from the three categories. Once
//!    all three categories are known it always equals their conjunction.
//! 4. The backend percentage is preferred; otherwise it is computed from
//!    current item states.
//!
//! Fetched facts ([`Origin::Fetch`]) never overwrite a backend-asserted flag.
//! Learner actions ([`Origin::Learner`]) may promote one, joining it with
//! the locally derived value.
//!
//! Refreshing after a learner action only fills fields that are still
//! `Unknown`: a just-written change may not be visible in the backend's
//! response yet.

use chrono::{DateTime, Utc};
use tracing::trace;

use coursetrack_models::{
    Category, Completion, ContentId, ContentItem, ContentProgress, ContentRecord, Flag,
    FlagSource, ItemRef, Module, ModuleSnapshot, Percentage, QuizId, QuizItem,
    QuizRecord, QuizSubmission, VideoId, VideoItem, VideoProgress, VideoRecord,
};

use crate::calculator::{category_completion, compute_percentage, is_module_complete};
use crate::config::EngineConfig;
use crate::error::{Result, StoreError};
use crate::predicates::ItemPredicates;

/// What triggered an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A listing or progress fetch arrived.
    Fetch,
    /// The learner viewed, watched or submitted something.
    Learner,
}

/// The aggregate fields of a module, captured for rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregates {
    pub content: Flag,
    pub video: Flag,
    pub test: Flag,
    pub module: Flag,
    pub percentage: Percentage,
}

impl Aggregates {
    /// Captures the aggregate fields of `module`.
    pub fn capture(module: &Module) -> Self {
        Self {
            content: module.content_completed,
            video: module.video_completed,
            test: module.test_completed,
            module: module.module_completed,
            percentage: module.completion_percentage,
        }
    }

    /// Restores each field of `module` that still equals `expected` to `previous`.
    fn restore_unchanged(module: &mut Module, expected: &Aggregates, previous: &Aggregates) {
        fn restore<T: PartialEq + Copy>(field: &mut T, expected: T, previous: T) {
            if *field == expected {
                *field = previous;
            }
        }
        restore(&mut module.content_completed, expected.content, previous.content);
        restore(&mut module.video_completed, expected.video, previous.video);
        restore(&mut module.test_completed, expected.test, previous.test);
        restore(&mut module.module_completed, expected.module, previous.module);
        restore(&mut module.completion_percentage, expected.percentage, previous.percentage);
    }
}

/// Copy of a single item, captured for rollback.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSnapshot {
    Content(ContentItem),
    Video(VideoItem),
    Quiz(QuizItem),
}

impl ItemSnapshot {
    /// Captures the item `item` of `module`, if tracked.
    pub fn capture(module: &Module, item: &ItemRef) -> Option<Self> {
        match item {
            ItemRef::Content(id) => module
                .contents
                .iter()
                .find(|c| &c.id == id)
                .cloned()
                .map(ItemSnapshot::Content),
            ItemRef::Video(id) => module
                .videos
                .iter()
                .find(|v| &v.id == id)
                .cloned()
                .map(ItemSnapshot::Video),
            ItemRef::Quiz(id) => module
                .quizzes
                .iter()
                .find(|q| &q.id == id)
                .cloned()
                .map(ItemSnapshot::Quiz),
        }
    }

    /// Reference to the captured item.
    pub fn item_ref(&self) -> ItemRef {
        match self {
            ItemSnapshot::Content(c) => ItemRef::Content(c.id.clone()),
            ItemSnapshot::Video(v) => ItemRef::Video(v.id.clone()),
            ItemSnapshot::Quiz(q) => ItemRef::Quiz(q.id.clone()),
        }
    }

    fn write_into(&self, module: &mut Module) {
        match self {
            ItemSnapshot::Content(item) => {
                if let Some(slot) = module.contents.iter_mut().find(|c| c.id == item.id) {
                    *slot = item.clone();
                }
            }
            ItemSnapshot::Video(item) => {
                if let Some(slot) = module.videos.iter_mut().find(|v| v.id == item.id) {
                    *slot = item.clone();
                }
            }
            ItemSnapshot::Quiz(item) => {
                if let Some(slot) = module.quizzes.iter_mut().find(|q| q.id == item.id) {
                    *slot = item.clone();
                }
            }
        }
    }
}

/// Merges backend snapshots and item facts into modules.
///
/// Every method returns whether the module changed. All merges are
/// idempotent: applying the same input twice changes nothing the second
/// time.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    predicates: ItemPredicates,
}

impl ReconciliationEngine {
    /// Creates an engine from configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            predicates: ItemPredicates::new(config),
        }
    }

    /// Item completion predicates used by this engine.
    pub fn predicates(&self) -> &ItemPredicates {
        &self.predicates
    }

    /// Adopts the snapshot a module was loaded with (rules 1, 3 and 4).
    pub fn adopt_snapshot(&self, module: &mut Module, snapshot: &ModuleSnapshot) -> bool {
        let before = module.clone();

        adopt_flag(&mut module.content_completed, snapshot.content_completed);
        adopt_flag(&mut module.video_completed, snapshot.video_completed);
        adopt_flag(&mut module.test_completed, snapshot.test_completed);
        if snapshot.is_complete_snapshot() {
            adopt_flag(&mut module.module_completed, snapshot.module_completed);
        }
        if let Some(pct) = snapshot.percentage() {
            module.completion_percentage = Percentage::backend(pct);
        }

        self.force_asserted(module);
        self.recompute(module, Origin::Fetch);
        *module != before
    }

    /// Merges a snapshot fetched after a learner action.
    ///
    /// Fields already known locally are kept, even if the snapshot disagrees;
    /// only unknown fields are filled. The percentage is accepted when none
    /// is known or it does not go down.
    pub fn refresh(&self, module: &mut Module, snapshot: &ModuleSnapshot) -> bool {
        let before = module.clone();

        fill_unknown(&mut module.content_completed, snapshot.content_completed);
        fill_unknown(&mut module.video_completed, snapshot.video_completed);
        fill_unknown(&mut module.test_completed, snapshot.test_completed);
        if snapshot.is_complete_snapshot() {
            fill_unknown(&mut module.module_completed, snapshot.module_completed);
        }
        if let Some(pct) = snapshot.percentage() {
            let keep_local = module
                .completion_percentage
                .value
                .is_some_and(|current| pct < current);
            if !keep_local {
                module.completion_percentage = Percentage::backend(pct);
            }
        }

        self.force_asserted(module);
        self.recompute(module, Origin::Fetch);
        *module != before
    }

    /// Merges the content listing of a module.
    pub fn apply_contents(&self, module: &mut Module, records: &[ContentRecord]) -> bool {
        let before = module.clone();
        for record in records {
            let idx = match module.contents.iter().position(|c| c.id == record.id) {
                Some(idx) => idx,
                None => {
                    module
                        .contents
                        .push(ContentItem::new(record.id.clone(), module.id.clone()));
                    module.contents.len() - 1
                }
            };
            self.predicates.apply_content_record(&mut module.contents[idx], record);
        }
        module.listed.set(Category::Content);
        self.finish_listing(module, Category::Content);
        *module != before
    }

    /// Merges the video listing of a module.
    pub fn apply_videos(&self, module: &mut Module, records: &[VideoRecord]) -> bool {
        let before = module.clone();
        for record in records {
            let idx = match module.videos.iter().position(|v| v.id == record.id) {
                Some(idx) => idx,
                None => {
                    module
                        .videos
                        .push(VideoItem::new(record.id.clone(), module.id.clone()));
                    module.videos.len() - 1
                }
            };
            self.predicates.apply_video_record(&mut module.videos[idx], record);
        }
        module.listed.set(Category::Video);
        self.finish_listing(module, Category::Video);
        *module != before
    }

    /// Merges the quiz listing of a module.
    pub fn apply_quizzes(&self, module: &mut Module, records: &[QuizRecord]) -> bool {
        let before = module.clone();
        for record in records {
            let idx = match module.quizzes.iter().position(|q| q.id == record.id) {
                Some(idx) => idx,
                None => {
                    module
                        .quizzes
                        .push(QuizItem::new(record.id.clone(), module.id.clone()));
                    module.quizzes.len() - 1
                }
            };
            self.predicates.apply_quiz_record(&mut module.quizzes[idx], record);
        }
        module.listed.set(Category::Quiz);
        self.finish_listing(module, Category::Quiz);
        *module != before
    }

    /// Merges a content progress fetch.
    pub fn apply_content_progress(
        &self,
        module: &mut Module,
        id: &ContentId,
        progress: &ContentProgress,
    ) -> Result<bool> {
        let idx = content_index(module, id)?;
        if is_forced(module, Category::Content) {
            trace!(content_id = %id, "content category asserted complete, ignoring progress");
            return Ok(false);
        }
        let before = module.clone();
        self.predicates.apply_content_progress(&mut module.contents[idx], progress);
        self.recompute(module, Origin::Fetch);
        Ok(*module != before)
    }

    /// Merges a video progress fetch.
    pub fn apply_video_progress(
        &self,
        module: &mut Module,
        id: &VideoId,
        progress: &VideoProgress,
    ) -> Result<bool> {
        let idx = video_index(module, id)?;
        if is_forced(module, Category::Video) {
            trace!(video_id = %id, "video category asserted complete, ignoring progress");
            return Ok(false);
        }
        let before = module.clone();
        self.predicates.apply_video_progress(&mut module.videos[idx], progress);
        self.recompute(module, Origin::Fetch);
        Ok(*module != before)
    }

    /// Merges a quiz submission check.
    pub fn apply_quiz_submission(
        &self,
        module: &mut Module,
        id: &QuizId,
        submission: &QuizSubmission,
        origin: Origin,
    ) -> Result<bool> {
        let idx = quiz_index(module, id)?;
        if is_forced(module, Category::Quiz) {
            trace!(quiz_id = %id, "quiz category asserted complete, ignoring submission");
            return Ok(false);
        }
        let before = module.clone();
        self.predicates.apply_quiz_submission(&mut module.quizzes[idx], submission);
        self.recompute(module, origin);
        Ok(*module != before)
    }

    /// Marks a content item viewed by the learner.
    pub fn mark_content_viewed(
        &self,
        module: &mut Module,
        id: &ContentId,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let idx = content_index(module, id)?;
        let before = module.clone();
        self.predicates.mark_content_viewed(&mut module.contents[idx], at);
        self.recompute(module, Origin::Learner);
        Ok(*module != before)
    }

    /// Records a watched percentage observed by the player.
    pub fn observe_video(&self, module: &mut Module, id: &VideoId, percentage: f64) -> Result<bool> {
        let idx = video_index(module, id)?;
        let before = module.clone();
        self.predicates
            .observe_watched_percentage(&mut module.videos[idx], percentage);
        self.recompute(module, Origin::Learner);
        Ok(*module != before)
    }

    /// Undoes an optimistic learner action.
    ///
    /// The item is restored only if it still holds the optimistic state, and
    /// each aggregate only if it still holds the value the action produced,
    /// so facts that arrived in the meantime survive. Aggregates are then
    /// recomputed from the restored items.
    pub fn rollback(
        &self,
        module: &mut Module,
        item_before: &ItemSnapshot,
        item_after: &ItemSnapshot,
        aggregates_before: &Aggregates,
        aggregates_after: &Aggregates,
    ) -> Result<bool> {
        let item = item_before.item_ref();
        let current = ItemSnapshot::capture(module, &item)
            .ok_or_else(|| StoreError::ItemNotTracked(item.to_string()))?;
        let before = module.clone();

        if current == *item_after {
            item_before.write_into(module);
        } else {
            trace!(item = %item, "item moved on since the action, keeping its state");
        }
        Aggregates::restore_unchanged(module, aggregates_after, aggregates_before);
        self.recompute(module, Origin::Fetch);
        Ok(*module != before)
    }

    /// Recomputes derived flags and the percentage (rules 2–4).
    pub fn recompute(&self, module: &mut Module, origin: Origin) -> bool {
        let before = Aggregates::capture(module);

        for category in Category::ALL {
            let local = local_category(module, category);
            let flag = module.category_flag_mut(category);
            *flag = derive_flag(*flag, local, origin);
        }

        let derived = is_module_complete(
            module.content_completed.value,
            module.video_completed.value,
            module.test_completed.value,
        );
        module.module_completed = derive_module_flag(module.module_completed, derived, origin);

        let any_listed = Category::ALL.iter().any(|c| module.listed.get(*c));
        if any_listed {
            let computed = compute_percentage(&module.contents, &module.videos, &module.quizzes);
            let current = module.completion_percentage;
            module.completion_percentage = match (current.source, origin) {
                (FlagSource::Backend, Origin::Fetch) => current,
                (_, Origin::Fetch) => Percentage::local(computed),
                (_, Origin::Learner) => match current.value {
                    Some(value) if value >= computed => current,
                    _ => Percentage::local(computed),
                },
            };
        }

        let after = Aggregates::capture(module);
        if after != before {
            trace!(
                module_id = %module.id,
                content = ?after.content.value,
                video = ?after.video.value,
                test = ?after.test.value,
                module = ?after.module.value,
                percentage = ?after.percentage.value,
                "module recomputed"
            );
        }
        after != before
    }

    fn finish_listing(&self, module: &mut Module, category: Category) {
        if is_forced(module, category) {
            force_category(module, category);
        }
        self.recompute(module, Origin::Fetch);
    }

    fn force_asserted(&self, module: &mut Module) {
        for category in Category::ALL {
            if is_forced(module, category) {
                force_category(module, category);
            }
        }
    }
}

/// Returns true if the backend asserted `category` complete.
pub fn is_forced(module: &Module, category: Category) -> bool {
    let flag = module.category_flag(category);
    flag.is_backend() && flag.value.is_complete()
}

/// Marks every item of `category` completed.
fn force_category(module: &mut Module, category: Category) {
    match category {
        Category::Content => module.contents.iter_mut().for_each(|c| {
            c.is_completed = true;
            c.reported = true;
        }),
        Category::Video => module.videos.iter_mut().for_each(|v| {
            v.is_completed = true;
            v.reported = true;
        }),
        Category::Quiz => module.quizzes.iter_mut().for_each(|q| {
            q.is_completed = true;
            q.reported = true;
        }),
    }
}

fn local_category(module: &Module, category: Category) -> Completion {
    let listed = module.listed.get(category);
    match category {
        Category::Content => category_completion(listed, &module.contents),
        Category::Video => category_completion(listed, &module.videos),
        Category::Quiz => category_completion(listed, &module.quizzes),
    }
}

/// New value of a flag given its locally derived value.
fn derive_flag(current: Flag, local: Completion, origin: Origin) -> Flag {
    if current.is_backend() {
        let joined = current.value.join(local);
        return match origin {
            Origin::Learner if joined != current.value => Flag::local(joined),
            _ => current,
        };
    }
    if local.is_known() {
        Flag::local(local)
    } else {
        Flag::default()
    }
}

/// New value of the module flag given the conjunction of the categories.
///
/// Three known categories decide the flag; an asserted value only stands
/// while it agrees with them or while a category is still unknown.
fn derive_module_flag(current: Flag, derived: Completion, origin: Origin) -> Flag {
    if !derived.is_known() {
        return derive_flag(current, derived, origin);
    }
    if current.is_backend() && current.value == derived {
        current
    } else {
        Flag::local(derived)
    }
}

fn adopt_flag(flag: &mut Flag, asserted: Completion) {
    if !asserted.is_known() {
        return;
    }
    // A locally promoted value above the assertion is kept.
    if flag.source == FlagSource::Local && flag.value.join(asserted) != asserted {
        return;
    }
    *flag = Flag::backend(asserted);
}

fn fill_unknown(flag: &mut Flag, asserted: Completion) {
    if !flag.value.is_known() && asserted.is_known() {
        *flag = Flag::backend(asserted);
    }
}

fn content_index(module: &Module, id: &ContentId) -> Result<usize> {
    module
        .contents
        .iter()
        .position(|c| &c.id == id)
        .ok_or_else(|| StoreError::ItemNotTracked(ItemRef::Content(id.clone()).to_string()))
}

fn video_index(module: &Module, id: &VideoId) -> Result<usize> {
    module
        .videos
        .iter()
        .position(|v| &v.id == id)
        .ok_or_else(|| StoreError::ItemNotTracked(ItemRef::Video(id.clone()).to_string()))
}

fn quiz_index(module: &Module, id: &QuizId) -> Result<usize> {
    module
        .quizzes
        .iter()
        .position(|q| &q.id == id)
        .ok_or_else(|| StoreError::ItemNotTracked(ItemRef::Quiz(id.clone()).to_string()))
}
