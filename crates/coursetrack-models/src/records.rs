//! Wire records exchanged with the learning backend.
//!
//! All records use camelCase JSON. Completion fields are optional on the wire
//! and decode to [`Completion::Unknown`] when missing or `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::Completion;
use crate::ids::{ContentId, ModuleId, QuizId, VideoId};

/// Authoritative completion snapshot for a module.
///
/// Returned embedded in module listings and on its own by the module
/// progress endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSnapshot {
    #[serde(default)]
    pub content_completed: Completion,
    #[serde(default)]
    pub video_completed: Completion,
    #[serde(default)]
    pub test_completed: Completion,
    #[serde(default)]
    pub module_completed: Completion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<f64>,
}

impl ModuleSnapshot {
    /// Returns true if all four completion fields are known.
    pub fn is_complete_snapshot(&self) -> bool {
        self.content_completed.is_known()
            && self.video_completed.is_known()
            && self.test_completed.is_known()
            && self.module_completed.is_known()
    }

    /// Returns true if the snapshot carries nothing at all.
    pub fn is_empty(&self) -> bool {
        !self.content_completed.is_known()
            && !self.video_completed.is_known()
            && !self.test_completed.is_known()
            && !self.module_completed.is_known()
            && self.completion_percentage.is_none()
    }

    /// Percentage rounded and clamped to [0,100]; `None` if missing or not finite.
    pub fn percentage(&self) -> Option<u8> {
        self.completion_percentage
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
    }
}

/// A module as returned by the module listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub id: ModuleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(flatten)]
    pub progress: ModuleSnapshot,
}

fn default_published() -> bool {
    true
}

/// A content item as returned by the content listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: ContentId,
    #[serde(default)]
    pub title: String,
    /// Present when the listing already knows the learner's state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
}

/// A video item as returned by the video listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: VideoId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// A quiz item as returned by the quiz listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: QuizId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Per-learner progress on a content item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProgress {
    /// Older backends send `completed` instead of `viewed`.
    #[serde(default, alias = "completed")]
    pub viewed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
}

/// Per-learner progress on a video.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgress {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub watched_percentage: f64,
}

/// Whether the learner has submitted a quiz.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    #[serde(default)]
    pub has_submitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Body of a video watch progress update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgressUpdate {
    pub watched_seconds: f64,
    pub total_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_record_without_progress() {
        let json = r#"{"id": 3, "title": "Intro", "position": 1}"#;
        let record: ModuleRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id.as_str(), "3");
        assert!(record.published);
        assert!(record.progress.is_empty());
        assert!(!record.progress.is_complete_snapshot());
    }

    #[test]
    fn test_module_record_with_progress() {
        let json = r#"{
            "id": "m1",
            "contentCompleted": true,
            "videoCompleted": false,
            "testCompleted": true,
            "moduleCompleted": false,
            "completionPercentage": 66.6
        }"#;
        let record: ModuleRecord = serde_json::from_str(json).unwrap();

        assert!(record.progress.is_complete_snapshot());
        assert_eq!(record.progress.content_completed, Completion::COMPLETE);
        assert_eq!(record.progress.video_completed, Completion::INCOMPLETE);
        assert_eq!(record.progress.percentage(), Some(67));
    }

    #[test]
    fn test_partial_snapshot() {
        let json = r#"{"contentCompleted": true, "videoCompleted": null}"#;
        let snapshot: ModuleSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.content_completed, Completion::COMPLETE);
        assert_eq!(snapshot.video_completed, Completion::Unknown);
        assert!(!snapshot.is_complete_snapshot());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_percentage_out_of_range() {
        let snapshot = ModuleSnapshot {
            completion_percentage: Some(180.0),
            ..Default::default()
        };
        assert_eq!(snapshot.percentage(), Some(100));

        let snapshot = ModuleSnapshot {
            completion_percentage: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(snapshot.percentage(), None);
    }

    #[test]
    fn test_content_progress_alias() {
        let p: ContentProgress = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert!(p.viewed);
    }

    #[test]
    fn test_quiz_submission_defaults() {
        let s: QuizSubmission = serde_json::from_str("{}").unwrap();
        assert!(!s.has_submitted);
        assert!(s.score.is_none());
    }
}
