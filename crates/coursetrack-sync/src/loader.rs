//! Loading a course into the store.
//!
//! Lists the modules, then for every module fans out its three item
//! listings and, for items whose completion is still ambiguous, per-item
//! progress fetches. Every arrival is merged as soon as it lands, in
//! whatever order the fetches resolve. A failed fetch only affects its own
//! target: the item stays unreported and everything else carries on.

use futures::future::join_all;
use tracing::{debug, info, warn};

use coursetrack_core::{Generation, Origin, StoreError, Update};
use coursetrack_models::{
    ContentId, CourseId, ItemRef, ModuleId, QuizId, QuizSubmission, VideoId,
};

use crate::context::SyncContext;
use crate::error::Result;

/// Outcome counts of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Modules tracked.
    pub modules: usize,
    /// Listings and progress fetches merged into the store.
    pub merged: usize,
    /// Listings and progress fetches that failed.
    pub failed: usize,
    /// Arrivals dropped because the view changed.
    pub discarded: usize,
}

impl LoadReport {
    fn merge(&mut self, other: LoadReport) {
        self.modules += other.modules;
        self.merged += other.merged;
        self.failed += other.failed;
        self.discarded += other.discarded;
    }

    fn record(&mut self, arrival: Arrival) {
        match arrival {
            Arrival::Merged => self.merged += 1,
            Arrival::Failed => self.failed += 1,
            Arrival::Discarded => self.discarded += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrival {
    Merged,
    Failed,
    Discarded,
}

/// Loads modules and their items.
#[derive(Clone)]
pub struct Loader {
    ctx: SyncContext,
}

impl Loader {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Loads `course_id` into the view identified by `generation`.
    ///
    /// Fails only if the module list cannot be fetched or the view changed
    /// before it arrived.
    pub async fn load(&self, course_id: &CourseId, generation: Generation) -> Result<LoadReport> {
        let records = self.ctx.backend.list_modules(course_id).await?;
        let module_ids = {
            let mut store = self.ctx.store.write().await;
            store.track_modules(generation, &records)?
        };
        info!(course_id = %course_id, modules = module_ids.len(), "modules listed");
        self.ctx.publish_modules(&module_ids).await;

        let reports = join_all(module_ids.iter().map(|id| self.load_module(generation, id))).await;

        let mut report = LoadReport {
            modules: module_ids.len(),
            ..LoadReport::default()
        };
        for module_report in reports {
            report.merge(module_report);
        }
        info!(
            course_id = %course_id,
            merged = report.merged,
            failed = report.failed,
            discarded = report.discarded,
            "course loaded"
        );
        Ok(report)
    }

    async fn load_module(&self, generation: Generation, module_id: &ModuleId) -> LoadReport {
        let (contents, videos, quizzes) = futures::join!(
            self.load_contents(generation, module_id),
            self.load_videos(generation, module_id),
            self.load_quizzes(generation, module_id),
        );
        let mut report = contents;
        report.merge(videos);
        report.merge(quizzes);
        report
    }

    async fn load_contents(&self, generation: Generation, module_id: &ModuleId) -> LoadReport {
        let mut report = LoadReport::default();
        let target = format!("contents of module {}", module_id);
        let records = match self
            .ctx
            .backend
            .list_contents(module_id, self.ctx.config.published_only)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(module_id = %module_id, error = %err, "content listing failed");
                report.record(Arrival::Failed);
                return report;
            }
        };
        debug!(module_id = %module_id, count = records.len(), "contents listed");

        let applied = self
            .ctx
            .apply(None, |store| store.apply_contents(generation, module_id, &records))
            .await;
        let arrival = self.settle(&target, applied);
        report.record(arrival);
        if arrival != Arrival::Merged {
            return report;
        }

        let pending: Vec<ContentId> = self
            .pending(module_id)
            .await
            .into_iter()
            .filter_map(|item| match item {
                ItemRef::Content(id) => Some(id),
                _ => None,
            })
            .collect();
        for arrival in join_all(pending.iter().map(|id| self.fetch_content(generation, id))).await {
            report.record(arrival);
        }
        report
    }

    async fn load_videos(&self, generation: Generation, module_id: &ModuleId) -> LoadReport {
        let mut report = LoadReport::default();
        let target = format!("videos of module {}", module_id);
        let records = match self
            .ctx
            .backend
            .list_videos(module_id, self.ctx.config.published_only)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(module_id = %module_id, error = %err, "video listing failed");
                report.record(Arrival::Failed);
                return report;
            }
        };
        debug!(module_id = %module_id, count = records.len(), "videos listed");

        let applied = self
            .ctx
            .apply(None, |store| store.apply_videos(generation, module_id, &records))
            .await;
        let arrival = self.settle(&target, applied);
        report.record(arrival);
        if arrival != Arrival::Merged {
            return report;
        }

        let pending: Vec<VideoId> = self
            .pending(module_id)
            .await
            .into_iter()
            .filter_map(|item| match item {
                ItemRef::Video(id) => Some(id),
                _ => None,
            })
            .collect();
        for arrival in join_all(pending.iter().map(|id| self.fetch_video(generation, id))).await {
            report.record(arrival);
        }
        report
    }

    async fn load_quizzes(&self, generation: Generation, module_id: &ModuleId) -> LoadReport {
        let mut report = LoadReport::default();
        let target = format!("quizzes of module {}", module_id);
        let records = match self
            .ctx
            .backend
            .list_quizzes(module_id, self.ctx.config.published_only)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(module_id = %module_id, error = %err, "quiz listing failed");
                report.record(Arrival::Failed);
                return report;
            }
        };
        debug!(module_id = %module_id, count = records.len(), "quizzes listed");

        let applied = self
            .ctx
            .apply(None, |store| store.apply_quizzes(generation, module_id, &records))
            .await;
        let arrival = self.settle(&target, applied);
        report.record(arrival);
        if arrival != Arrival::Merged {
            return report;
        }

        let pending: Vec<QuizId> = self
            .pending(module_id)
            .await
            .into_iter()
            .filter_map(|item| match item {
                ItemRef::Quiz(id) => Some(id),
                _ => None,
            })
            .collect();
        for arrival in join_all(pending.iter().map(|id| self.fetch_quiz(generation, id))).await {
            report.record(arrival);
        }
        report
    }

    async fn fetch_content(&self, generation: Generation, id: &ContentId) -> Arrival {
        let item = ItemRef::Content(id.clone());
        match self.ctx.backend.get_content_progress(id).await {
            Ok(progress) => {
                let applied = self
                    .ctx
                    .apply(Some(&item), |store| store.apply_content_progress(generation, id, &progress))
                    .await;
                self.settle(&item.to_string(), applied)
            }
            Err(err) => {
                warn!(content_id = %id, error = %err, "content progress fetch failed");
                Arrival::Failed
            }
        }
    }

    async fn fetch_video(&self, generation: Generation, id: &VideoId) -> Arrival {
        let item = ItemRef::Video(id.clone());
        match self.ctx.backend.get_video_progress(id).await {
            Ok(progress) => {
                let applied = self
                    .ctx
                    .apply(Some(&item), |store| store.apply_video_progress(generation, id, &progress))
                    .await;
                self.settle(&item.to_string(), applied)
            }
            Err(err) => {
                warn!(video_id = %id, error = %err, "video progress fetch failed");
                Arrival::Failed
            }
        }
    }

    /// A failed submission check counts as "not submitted".
    async fn fetch_quiz(&self, generation: Generation, id: &QuizId) -> Arrival {
        let item = ItemRef::Quiz(id.clone());
        let (submission, failed) = match self.ctx.backend.check_quiz_submission(id).await {
            Ok(submission) => (submission, false),
            Err(err) => {
                warn!(quiz_id = %id, error = %err, "quiz submission check failed, treating as not submitted");
                (QuizSubmission::default(), true)
            }
        };
        let applied = self
            .ctx
            .apply(Some(&item), |store| {
                store.apply_quiz_submission(generation, id, &submission, Origin::Fetch)
            })
            .await;
        match self.settle(&item.to_string(), applied) {
            Arrival::Merged if failed => Arrival::Failed,
            arrival => arrival,
        }
    }

    async fn pending(&self, module_id: &ModuleId) -> Vec<ItemRef> {
        self.ctx.store.read().await.pending_progress(module_id)
    }

    fn settle(&self, target: &str, applied: std::result::Result<Update, StoreError>) -> Arrival {
        match applied {
            Ok(_) => Arrival::Merged,
            Err(err) => {
                self.ctx.discard(target, &err);
                Arrival::Discarded
            }
        }
    }
}
