//! Module types.
//!
//! A module is an ordered container of content, video and quiz items
//! together with its reconciled completion state.

use serde::{Deserialize, Serialize};

use crate::completion::Completion;
use crate::ids::ModuleId;
use crate::item::{Category, ContentItem, LearningItem, QuizItem, VideoItem};

/// Where a reconciled value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    /// Nothing has resolved the value yet.
    #[default]
    Unresolved,
    /// Asserted by a backend snapshot.
    Backend,
    /// Derived from item states.
    Local,
}

/// A completion flag together with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Flag {
    pub value: Completion,
    pub source: FlagSource,
}

impl Flag {
    /// A flag asserted by the backend.
    pub fn backend(value: Completion) -> Self {
        Self {
            value,
            source: FlagSource::Backend,
        }
    }

    /// A locally derived flag.
    pub fn local(value: Completion) -> Self {
        Self {
            value,
            source: FlagSource::Local,
        }
    }

    /// Returns true if the backend asserted this flag.
    pub fn is_backend(&self) -> bool {
        self.source == FlagSource::Backend
    }
}

/// Module completion percentage together with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Percentage {
    /// `None` while unknown, otherwise in [0,100].
    pub value: Option<u8>,
    pub source: FlagSource,
}

impl Percentage {
    /// A percentage supplied by the backend.
    pub fn backend(value: u8) -> Self {
        Self {
            value: Some(value.min(100)),
            source: FlagSource::Backend,
        }
    }

    /// A locally computed percentage.
    pub fn local(value: u8) -> Self {
        Self {
            value: Some(value.min(100)),
            source: FlagSource::Local,
        }
    }
}

/// A course module as tracked for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Unique identifier for the module.
    pub id: ModuleId,

    /// Display title.
    #[serde(default)]
    pub title: String,

    /// Position within the course (ascending).
    #[serde(default)]
    pub position: u32,

    /// Whether the module is published.
    #[serde(default)]
    pub published: bool,

    /// Static content items, in listing order.
    #[serde(default)]
    pub contents: Vec<ContentItem>,

    /// Video items, in listing order.
    #[serde(default)]
    pub videos: Vec<VideoItem>,

    /// Quiz items, in listing order.
    #[serde(default)]
    pub quizzes: Vec<QuizItem>,

    /// Whether each category's item listing has arrived.
    #[serde(default)]
    pub listed: Listed,

    pub content_completed: Flag,
    pub video_completed: Flag,
    pub test_completed: Flag,
    pub module_completed: Flag,

    pub completion_percentage: Percentage,
}

/// Tracks which category listings have arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Listed {
    pub contents: bool,
    pub videos: bool,
    pub quizzes: bool,
}

impl Listed {
    /// Returns true if the listing for `category` has arrived.
    pub fn get(&self, category: Category) -> bool {
        match category {
            Category::Content => self.contents,
            Category::Video => self.videos,
            Category::Quiz => self.quizzes,
        }
    }

    /// Records that the listing for `category` arrived.
    pub fn set(&mut self, category: Category) {
        match category {
            Category::Content => self.contents = true,
            Category::Video => self.videos = true,
            Category::Quiz => self.quizzes = true,
        }
    }
}

impl Module {
    /// Creates an empty, unreconciled module.
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            position: 0,
            published: true,
            contents: Vec::new(),
            videos: Vec::new(),
            quizzes: Vec::new(),
            listed: Listed::default(),
            content_completed: Flag::default(),
            video_completed: Flag::default(),
            test_completed: Flag::default(),
            module_completed: Flag::default(),
            completion_percentage: Percentage::default(),
        }
    }

    /// Returns the completion flag of a category.
    pub fn category_flag(&self, category: Category) -> Flag {
        match category {
            Category::Content => self.content_completed,
            Category::Video => self.video_completed,
            Category::Quiz => self.test_completed,
        }
    }

    /// Returns a mutable reference to the completion flag of a category.
    pub fn category_flag_mut(&mut self, category: Category) -> &mut Flag {
        match category {
            Category::Content => &mut self.content_completed,
            Category::Video => &mut self.video_completed,
            Category::Quiz => &mut self.test_completed,
        }
    }

    /// Returns true if the module is known to be complete.
    pub fn is_module_completed(&self) -> bool {
        self.module_completed.value.is_complete()
    }

    /// Total number of items across all categories.
    pub fn item_count(&self) -> usize {
        self.contents.len() + self.videos.len() + self.quizzes.len()
    }

    /// Number of completed items across all categories.
    pub fn completed_count(&self) -> usize {
        self.contents.iter().filter(|c| c.is_completed()).count()
            + self.videos.iter().filter(|v| v.is_completed()).count()
            + self.quizzes.iter().filter(|q| q.is_completed()).count()
    }

    /// Condensed view for display.
    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            position: self.position,
            content_completed: self.content_completed.value,
            video_completed: self.video_completed.value,
            test_completed: self.test_completed.value,
            module_completed: self.module_completed.value,
            completion_percentage: self.completion_percentage.value,
            items: self.item_count(),
            completed_items: self.completed_count(),
        }
    }
}

/// Read-only summary of a module's reconciled state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub id: ModuleId,
    pub title: String,
    pub position: u32,
    pub content_completed: Completion,
    pub video_completed: Completion,
    pub test_completed: Completion,
    pub module_completed: Completion,
    pub completion_percentage: Option<u8>,
    pub items: usize,
    pub completed_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_module_is_unreconciled() {
        let module = Module::new("m1");
        assert_eq!(module.content_completed.value, Completion::Unknown);
        assert_eq!(module.module_completed.source, FlagSource::Unresolved);
        assert_eq!(module.completion_percentage.value, None);
        assert!(!module.is_module_completed());
        assert!(!module.listed.get(Category::Video));
    }

    #[test]
    fn test_category_flag_mapping() {
        let mut module = Module::new("m1");
        *module.category_flag_mut(Category::Quiz) = Flag::backend(Completion::COMPLETE);

        assert_eq!(module.test_completed.value, Completion::COMPLETE);
        assert!(module.category_flag(Category::Quiz).is_backend());
        assert_eq!(module.category_flag(Category::Content), Flag::default());
    }

    #[test]
    fn test_counts_and_summary() {
        let mut module = Module::new("m1");
        let mut done = ContentItem::new("c1", "m1");
        done.is_completed = true;
        module.contents.push(done);
        module.contents.push(ContentItem::new("c2", "m1"));
        module.videos.push(VideoItem::new("v1", "m1"));

        assert_eq!(module.item_count(), 3);
        assert_eq!(module.completed_count(), 1);

        let summary = module.summary();
        assert_eq!(summary.items, 3);
        assert_eq!(summary.completed_items, 1);
        assert_eq!(summary.module_completed, Completion::Unknown);
    }

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(Percentage::backend(140).value, Some(100));
        assert_eq!(Percentage::local(30).source, FlagSource::Local);
    }
}
