//! Learnable items inside a module.
//!
//! A module holds three kinds of items: static content, videos and quizzes.
//! Each item carries its own completion bit plus a `reported` marker that
//! says whether the bit reflects a real fact (listing, progress fetch,
//! backend override or learner action) or is still the default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::completion::Completion;
use crate::ids::{ContentId, ModuleId, QuizId, VideoId};

/// One of the three item categories of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Static content (text, documents).
    Content,
    /// Video lectures.
    Video,
    /// Quizzes, backed by the `test_completed` flag.
    Quiz,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Category::Content, Category::Video, Category::Quiz];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Content => "content",
            Category::Video => "video",
            Category::Quiz => "quiz",
        };
        f.write_str(s)
    }
}

/// Learner-facing state of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Nothing recorded yet.
    #[default]
    NotStarted,
    /// Partially watched video.
    InProgress,
    /// Viewed, watched past the threshold, or submitted.
    Completed,
}

/// Behaviour shared by all item kinds.
pub trait LearningItem {
    /// Whether the item counts as completed.
    fn is_completed(&self) -> bool;

    /// Whether the completion bit reflects a reported fact.
    fn is_reported(&self) -> bool;

    /// Completion as a tri-state flag: `Unknown` until reported.
    fn completion(&self) -> Completion {
        if self.is_reported() {
            Completion::Known(self.is_completed())
        } else {
            Completion::Unknown
        }
    }

    /// Learner-facing state.
    fn state(&self) -> ItemState {
        if self.is_completed() {
            ItemState::Completed
        } else {
            ItemState::NotStarted
        }
    }
}

/// A static content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub module_id: ModuleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reported: bool,
}

impl ContentItem {
    /// Creates an unreported content item.
    pub fn new(id: impl Into<ContentId>, module_id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            module_id: module_id.into(),
            title: String::new(),
            is_completed: false,
            viewed_at: None,
            reported: false,
        }
    }
}

impl LearningItem for ContentItem {
    fn is_completed(&self) -> bool {
        self.is_completed
    }

    fn is_reported(&self) -> bool {
        self.reported
    }
}

/// A video item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: VideoId,
    pub module_id: ModuleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    /// Highest watched percentage observed, in [0,100].
    #[serde(default)]
    pub watched_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub reported: bool,
}

impl VideoItem {
    /// Creates an unreported video item.
    pub fn new(id: impl Into<VideoId>, module_id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            module_id: module_id.into(),
            title: String::new(),
            is_completed: false,
            watched_percentage: 0.0,
            duration_seconds: None,
            reported: false,
        }
    }
}

impl LearningItem for VideoItem {
    fn is_completed(&self) -> bool {
        self.is_completed
    }

    fn is_reported(&self) -> bool {
        self.reported
    }

    fn state(&self) -> ItemState {
        if self.is_completed {
            ItemState::Completed
        } else if self.watched_percentage > 0.0 {
            ItemState::InProgress
        } else {
            ItemState::NotStarted
        }
    }
}

/// A quiz item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub id: QuizId,
    pub module_id: ModuleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub reported: bool,
}

impl QuizItem {
    /// Creates an unreported quiz item.
    pub fn new(id: impl Into<QuizId>, module_id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            module_id: module_id.into(),
            title: String::new(),
            is_completed: false,
            score: None,
            reported: false,
        }
    }
}

impl LearningItem for QuizItem {
    fn is_completed(&self) -> bool {
        self.is_completed
    }

    fn is_reported(&self) -> bool {
        self.reported
    }
}

/// Reference to any item of a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Content(ContentId),
    Video(VideoId),
    Quiz(QuizId),
}

impl ItemRef {
    /// Category the item belongs to.
    pub fn category(&self) -> Category {
        match self {
            ItemRef::Content(_) => Category::Content,
            ItemRef::Video(_) => Category::Video,
            ItemRef::Quiz(_) => Category::Quiz,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Content(id) => write!(f, "content:{}", id),
            ItemRef::Video(id) => write!(f, "video:{}", id),
            ItemRef::Quiz(id) => write!(f, "quiz:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreported_item_is_unknown() {
        let item = ContentItem::new("c1", "m1");
        assert_eq!(item.completion(), Completion::Unknown);
        assert_eq!(item.state(), ItemState::NotStarted);
    }

    #[test]
    fn test_reported_item_is_known() {
        let mut item = QuizItem::new("q1", "m1");
        item.reported = true;
        assert_eq!(item.completion(), Completion::INCOMPLETE);

        item.is_completed = true;
        assert_eq!(item.completion(), Completion::COMPLETE);
        assert_eq!(item.state(), ItemState::Completed);
    }

    #[test]
    fn test_video_state_in_progress() {
        let mut video = VideoItem::new("v1", "m1");
        assert_eq!(video.state(), ItemState::NotStarted);

        video.watched_percentage = 40.0;
        assert_eq!(video.state(), ItemState::InProgress);

        video.is_completed = true;
        assert_eq!(video.state(), ItemState::Completed);
    }

    #[test]
    fn test_item_ref_display() {
        let r = ItemRef::Video(VideoId::from("9"));
        assert_eq!(r.to_string(), "video:9");
        assert_eq!(r.category(), Category::Video);
    }
}
