//! Builder patterns for wire records.

use crate::completion::Completion;
use crate::ids::{ContentId, ModuleId, QuizId, VideoId};
use crate::records::{ContentRecord, ModuleRecord, ModuleSnapshot, QuizRecord, VideoRecord};

/// Builder for creating ModuleRecord instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ModuleRecordBuilder {
    id: ModuleId,
    title: String,
    position: u32,
    published: bool,
    progress: ModuleSnapshot,
}

impl ModuleRecordBuilder {
    /// Creates a new builder with required fields.
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            position: 0,
            published: true,
            progress: ModuleSnapshot::default(),
        }
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the position within the course.
    pub fn position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }

    /// Sets the publish state.
    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Sets all four completion flags at once.
    pub fn flags(mut self, content: bool, video: bool, test: bool, module: bool) -> Self {
        self.progress.content_completed = Completion::Known(content);
        self.progress.video_completed = Completion::Known(video);
        self.progress.test_completed = Completion::Known(test);
        self.progress.module_completed = Completion::Known(module);
        self
    }

    /// Sets the content flag.
    pub fn content_completed(mut self, value: impl Into<Completion>) -> Self {
        self.progress.content_completed = value.into();
        self
    }

    /// Sets the video flag.
    pub fn video_completed(mut self, value: impl Into<Completion>) -> Self {
        self.progress.video_completed = value.into();
        self
    }

    /// Sets the quiz flag.
    pub fn test_completed(mut self, value: impl Into<Completion>) -> Self {
        self.progress.test_completed = value.into();
        self
    }

    /// Sets the module flag.
    pub fn module_completed(mut self, value: impl Into<Completion>) -> Self {
        self.progress.module_completed = value.into();
        self
    }

    /// Sets the backend-supplied percentage.
    pub fn percentage(mut self, percentage: f64) -> Self {
        self.progress.completion_percentage = Some(percentage);
        self
    }

    /// Builds the ModuleRecord.
    pub fn build(self) -> ModuleRecord {
        ModuleRecord {
            id: self.id,
            title: self.title,
            position: self.position,
            published: self.published,
            progress: self.progress,
        }
    }
}

impl ModuleRecord {
    /// Creates a builder for a new module record.
    pub fn builder(id: impl Into<ModuleId>) -> ModuleRecordBuilder {
        ModuleRecordBuilder::new(id)
    }
}

impl ContentRecord {
    /// A content record without learner state.
    pub fn new(id: impl Into<ContentId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            is_completed: None,
            viewed_at: None,
        }
    }

    /// Sets the learner's completion state.
    pub fn completed(mut self, completed: bool) -> Self {
        self.is_completed = Some(completed);
        self
    }
}

impl VideoRecord {
    /// A video record without learner state.
    pub fn new(id: impl Into<VideoId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            is_completed: None,
            watched_percentage: None,
            duration_seconds: None,
        }
    }

    /// Sets the watched percentage.
    pub fn watched(mut self, percentage: f64) -> Self {
        self.watched_percentage = Some(percentage);
        self
    }
}

impl QuizRecord {
    /// A quiz record without learner state.
    pub fn new(id: impl Into<QuizId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            is_completed: None,
            score: None,
        }
    }
}
