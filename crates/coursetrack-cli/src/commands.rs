//! Command handlers for CLI subcommands.

use std::fmt::Write;

use tracing::info;

use coursetrack_models::{Completion, ContentId, ModuleSummary, QuizId, VideoId};
use coursetrack_sync::CourseView;

use crate::cli::{Commands, OutputFormat};

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a command against an open course and return what to print.
pub async fn execute(command: Commands, view: &CourseView) -> Result<String> {
    match command {
        Commands::Progress { format } => cmd_progress(view, format).await,
        Commands::ViewContent { content_id } => cmd_view_content(view, content_id).await,
        Commands::Watch {
            video_id,
            watched,
            total,
        } => cmd_watch(view, video_id, watched, total).await,
        Commands::CheckQuiz { quiz_id } => cmd_check_quiz(view, quiz_id).await,
    }
}

async fn cmd_progress(view: &CourseView, format: OutputFormat) -> Result<String> {
    let summaries = view.summaries().await;
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Table => Ok(render_table(&summaries)),
    }
}

async fn cmd_view_content(view: &CourseView, content_id: String) -> Result<String> {
    let content_id: ContentId = content_id.into();
    view.mark_content_viewed(&content_id).await?;
    info!(content_id = %content_id, "content marked viewed");
    Ok(format!("Content {} viewed", content_id))
}

async fn cmd_watch(view: &CourseView, video_id: String, watched: f64, total: f64) -> Result<String> {
    let video_id: VideoId = video_id.into();
    let tick = view.record_video_tick(&video_id, watched, total).await?;
    view.finish_video(&video_id).await?;
    let status = if tick.completed { "completed" } else { "in progress" };
    Ok(format!(
        "Video {}: {:.0}% watched, {}",
        video_id, tick.watched_percentage, status
    ))
}

async fn cmd_check_quiz(view: &CourseView, quiz_id: String) -> Result<String> {
    let quiz_id: QuizId = quiz_id.into();
    let state = view.check_quiz_completion(&quiz_id).await?;
    Ok(format!("Quiz {}: {:?}", quiz_id, state))
}

fn render_table(summaries: &[ModuleSummary]) -> String {
    if summaries.is_empty() {
        return "No modules.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<30} {:>6} {:>8} {:>8} {:>8} {:>8}",
        "#", "MODULE", "DONE", "CONTENT", "VIDEO", "QUIZ", "MODULE"
    );
    for summary in summaries {
        let title = if summary.title.is_empty() {
            summary.id.to_string()
        } else {
            summary.title.clone()
        };
        let percentage = summary
            .completion_percentage
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<4} {:<30} {:>6} {:>8} {:>8} {:>8} {:>8}",
            summary.position,
            truncate(&title, 30),
            percentage,
            flag(summary.content_completed),
            flag(summary.video_completed),
            flag(summary.test_completed),
            flag(summary.module_completed),
        );
    }
    out
}

fn flag(value: Completion) -> &'static str {
    match value {
        Completion::Known(true) => "yes",
        Completion::Known(false) => "no",
        Completion::Unknown => "?",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut short: String = s.chars().take(max.saturating_sub(3)).collect();
        short.push_str("...");
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use coursetrack_backend::{MemoryBackend, Operation};
    use coursetrack_models::{ContentRecord, ModuleRecord, QuizRecord, QuizSubmission, VideoRecord};
    use coursetrack_sync::SyncConfig;

    async fn open_view() -> (CourseView, Arc<MemoryBackend>) {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_course(
                    "course-1",
                    vec![ModuleRecord::builder("m1").title("Getting started").position(1).build()],
                )
                .with_contents("m1", vec![ContentRecord::new("c1").completed(false)])
                .with_videos("m1", vec![VideoRecord::new("v1").watched(0.0)])
                .with_quizzes("m1", vec![QuizRecord::new("q1")])
                .with_submission(
                    "q1",
                    QuizSubmission {
                        has_submitted: true,
                        score: None,
                    },
                ),
        );
        let view = CourseView::new(backend.clone(), SyncConfig::default());
        view.open("course-1").await.unwrap();
        (view, backend)
    }

    #[tokio::test]
    async fn test_progress_table() {
        let (view, _backend) = open_view().await;
        let out = execute(
            Commands::Progress {
                format: OutputFormat::Table,
            },
            &view,
        )
        .await
        .unwrap();
        assert!(out.contains("Getting started"));
        assert!(out.contains("33%"));
    }

    #[tokio::test]
    async fn test_progress_json() {
        let (view, _backend) = open_view().await;
        let out = execute(
            Commands::Progress {
                format: OutputFormat::Json,
            },
            &view,
        )
        .await
        .unwrap();
        let summaries: Vec<ModuleSummary> = serde_json::from_str(&out).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].completion_percentage, Some(33));
    }

    #[tokio::test]
    async fn test_view_content() {
        let (view, backend) = open_view().await;
        let out = execute(
            Commands::ViewContent {
                content_id: "c1".to_string(),
            },
            &view,
        )
        .await
        .unwrap();
        assert_eq!(out, "Content c1 viewed");
        assert_eq!(backend.calls(Operation::MarkContentViewed).await, 1);
    }

    #[tokio::test]
    async fn test_watch_persists_position() {
        let (view, backend) = open_view().await;
        let out = execute(
            Commands::Watch {
                video_id: "v1".to_string(),
                watched: 3.0,
                total: 60.0,
            },
            &view,
        )
        .await
        .unwrap();
        assert_eq!(out, "Video v1: 5% watched, in progress");
        assert_eq!(backend.video_updates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_watch_rejects_zero_length() {
        let (view, _backend) = open_view().await;
        let result = execute(
            Commands::Watch {
                video_id: "v1".to_string(),
                watched: 3.0,
                total: 0.0,
            },
            &view,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_check_quiz() {
        let (view, _backend) = open_view().await;
        let out = execute(
            Commands::CheckQuiz {
                quiz_id: "q1".to_string(),
            },
            &view,
        )
        .await
        .unwrap();
        assert_eq!(out, "Quiz q1: Completed");
    }

    #[test]
    fn test_flag_rendering() {
        assert_eq!(flag(Completion::COMPLETE), "yes");
        assert_eq!(flag(Completion::INCOMPLETE), "no");
        assert_eq!(flag(Completion::Unknown), "?");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long module title", 10), "a very ...");
    }
}
