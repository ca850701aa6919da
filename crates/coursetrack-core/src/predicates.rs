//! Per-item completion predicates.
//!
//! Each `apply_*` function merges one fact into an item and returns whether
//! the item changed. Merges only upgrade: a completed item stays completed
//! and a video's watched percentage never decreases. Applying the same fact
//! twice leaves the item as after the first application.

use chrono::{DateTime, Utc};

use coursetrack_models::{
    ContentItem, ContentProgress, ContentRecord, QuizItem, QuizRecord, QuizSubmission, VideoItem,
    VideoProgress, VideoRecord,
};

use crate::config::EngineConfig;

/// Completion rules for the three item kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemPredicates {
    video_threshold: f64,
}

impl ItemPredicates {
    /// Creates predicates from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            video_threshold: config.video_completion_threshold,
        }
    }

    /// Watched percentage at which a video completes.
    pub fn video_threshold(&self) -> f64 {
        self.video_threshold
    }

    /// Content is complete once viewed.
    pub fn content_is_complete(&self, viewed: bool) -> bool {
        viewed
    }

    /// A video is complete once the watched percentage reaches the threshold.
    pub fn video_is_complete(&self, watched_percentage: f64) -> bool {
        watched_percentage >= self.video_threshold
    }

    /// A quiz is complete once the learner has a submission.
    pub fn quiz_is_complete(&self, has_submitted: bool) -> bool {
        has_submitted
    }

    /// Merges listing data into a content item.
    pub fn apply_content_record(&self, item: &mut ContentItem, record: &ContentRecord) -> bool {
        let before = item.clone();
        if item.title.is_empty() && !record.title.is_empty() {
            item.title = record.title.clone();
        }
        if let Some(done) = record.is_completed {
            self.merge_content(item, self.content_is_complete(done), record.viewed_at);
        }
        *item != before
    }

    /// Merges a per-item progress fetch into a content item.
    pub fn apply_content_progress(&self, item: &mut ContentItem, progress: &ContentProgress) -> bool {
        let before = item.clone();
        self.merge_content(item, self.content_is_complete(progress.viewed), progress.viewed_at);
        *item != before
    }

    /// Marks a content item viewed by the learner at `at`.
    pub fn mark_content_viewed(&self, item: &mut ContentItem, at: DateTime<Utc>) -> bool {
        let before = item.clone();
        self.merge_content(item, true, Some(at));
        *item != before
    }

    /// Merges listing data into a video item.
    pub fn apply_video_record(&self, item: &mut VideoItem, record: &VideoRecord) -> bool {
        let before = item.clone();
        if item.title.is_empty() && !record.title.is_empty() {
            item.title = record.title.clone();
        }
        if item.duration_seconds.is_none() {
            item.duration_seconds = record.duration_seconds.filter(|d| d.is_finite() && *d > 0.0);
        }
        if record.is_completed.is_some() || record.watched_percentage.is_some() {
            let pct = record.watched_percentage.unwrap_or(0.0);
            self.merge_video(item, pct, record.is_completed.unwrap_or(false));
        }
        *item != before
    }

    /// Merges a per-item progress fetch into a video item.
    pub fn apply_video_progress(&self, item: &mut VideoItem, progress: &VideoProgress) -> bool {
        let before = item.clone();
        self.merge_video(item, progress.watched_percentage, progress.completed);
        *item != before
    }

    /// Records a locally observed watched percentage.
    pub fn observe_watched_percentage(&self, item: &mut VideoItem, percentage: f64) -> bool {
        let before = item.clone();
        self.merge_video(item, percentage, false);
        *item != before
    }

    /// Merges listing data into a quiz item.
    pub fn apply_quiz_record(&self, item: &mut QuizItem, record: &QuizRecord) -> bool {
        let before = item.clone();
        if item.title.is_empty() && !record.title.is_empty() {
            item.title = record.title.clone();
        }
        if let Some(done) = record.is_completed {
            self.merge_quiz(item, self.quiz_is_complete(done), record.score);
        }
        *item != before
    }

    /// Merges a submission check into a quiz item.
    pub fn apply_quiz_submission(&self, item: &mut QuizItem, submission: &QuizSubmission) -> bool {
        let before = item.clone();
        self.merge_quiz(item, self.quiz_is_complete(submission.has_submitted), submission.score);
        *item != before
    }

    fn merge_content(&self, item: &mut ContentItem, completed: bool, viewed_at: Option<DateTime<Utc>>) {
        item.reported = true;
        if completed && !item.is_completed {
            item.is_completed = true;
        }
        if item.is_completed && item.viewed_at.is_none() {
            item.viewed_at = viewed_at;
        }
    }

    fn merge_video(&self, item: &mut VideoItem, percentage: f64, completed: bool) {
        item.reported = true;
        if percentage.is_finite() {
            let pct = percentage.clamp(0.0, 100.0);
            if pct > item.watched_percentage {
                item.watched_percentage = pct;
            }
        }
        if completed || self.video_is_complete(item.watched_percentage) {
            item.is_completed = true;
        }
    }

    fn merge_quiz(&self, item: &mut QuizItem, completed: bool, score: Option<f64>) {
        item.reported = true;
        if completed {
            item.is_completed = true;
            if score.is_some() {
                item.score = score;
            }
        }
    }
}

impl Default for ItemPredicates {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursetrack_models::LearningItem;

    fn predicates() -> ItemPredicates {
        ItemPredicates::default()
    }

    #[test]
    fn test_video_threshold_boundary() {
        let p = predicates();
        assert!(p.video_is_complete(90.0));
        assert!(!p.video_is_complete(89.99));
        assert!(p.video_is_complete(100.0));
    }

    #[test]
    fn test_video_progress_never_regresses() {
        let p = predicates();
        let mut video = VideoItem::new("v1", "m1");

        assert!(p.observe_watched_percentage(&mut video, 60.0));
        assert!(!p.observe_watched_percentage(&mut video, 30.0));
        assert_eq!(video.watched_percentage, 60.0);
        assert!(!video.is_completed);

        assert!(p.observe_watched_percentage(&mut video, 90.0));
        assert!(video.is_completed);
    }

    #[test]
    fn test_video_progress_fetch() {
        let p = predicates();
        let mut video = VideoItem::new("v1", "m1");

        let progress = VideoProgress {
            completed: false,
            watched_percentage: 50.0,
        };
        assert!(p.apply_video_progress(&mut video, &progress));
        assert!(video.reported);
        assert!(!video.is_completed);

        // Same fact again is a no-op.
        assert!(!p.apply_video_progress(&mut video, &progress));

        let done = VideoProgress {
            completed: true,
            watched_percentage: 50.0,
        };
        assert!(p.apply_video_progress(&mut video, &done));
        assert!(video.is_completed);
    }

    #[test]
    fn test_video_progress_ignores_garbage() {
        let p = predicates();
        let mut video = VideoItem::new("v1", "m1");
        p.observe_watched_percentage(&mut video, f64::NAN);
        assert_eq!(video.watched_percentage, 0.0);
        p.observe_watched_percentage(&mut video, 400.0);
        assert_eq!(video.watched_percentage, 100.0);
        assert!(video.is_completed);
    }

    #[test]
    fn test_content_viewed() {
        let p = predicates();
        let mut content = ContentItem::new("c1", "m1");

        let not_viewed = ContentProgress::default();
        assert!(p.apply_content_progress(&mut content, &not_viewed));
        assert!(content.reported);
        assert!(!content.is_completed);

        let now = Utc::now();
        assert!(p.mark_content_viewed(&mut content, now));
        assert!(content.is_completed);
        assert_eq!(content.viewed_at, Some(now));

        // A late "not viewed" fact does not undo a completion.
        assert!(!p.apply_content_progress(&mut content, &not_viewed));
        assert!(content.is_completed);
    }

    #[test]
    fn test_content_record_without_state_stays_unreported() {
        let p = predicates();
        let mut content = ContentItem::new("c1", "m1");
        let mut record = ContentRecord::new("c1");
        record.title = "Reading".to_string();

        assert!(p.apply_content_record(&mut content, &record));
        assert_eq!(content.title, "Reading");
        assert!(!content.reported);
    }

    #[test]
    fn test_quiz_submission() {
        let p = predicates();
        let mut quiz = QuizItem::new("q1", "m1");

        let none = QuizSubmission::default();
        assert!(p.apply_quiz_submission(&mut quiz, &none));
        assert!(quiz.is_reported());
        assert!(!quiz.is_completed());

        let submitted = QuizSubmission {
            has_submitted: true,
            score: Some(8.5),
        };
        assert!(p.apply_quiz_submission(&mut quiz, &submitted));
        assert!(quiz.is_completed());
        assert_eq!(quiz.score, Some(8.5));

        assert!(!p.apply_quiz_submission(&mut quiz, &none));
        assert!(quiz.is_completed());
    }

    #[test]
    fn test_custom_threshold() {
        let p = ItemPredicates::new(&EngineConfig::new().with_video_completion_threshold(75.0));
        assert!(p.video_is_complete(75.0));
        assert!(!p.video_is_complete(74.9));
    }
}
