//! Command-line interface definition using clap.

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use coursetrack_backend::BackendConfig;
use coursetrack_core::EngineConfig;
use coursetrack_sync::SyncConfig;

/// coursetrack - course completion tracking against a learning backend
#[derive(Parser, Debug)]
#[command(name = "coursetrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Course to open
    #[arg(short, long, env = "COURSETRACK_COURSE", global = true)]
    pub course: Option<String>,

    /// Backend base URL
    #[arg(long, env = "COURSETRACK_API_URL", default_value = coursetrack_backend::config::DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Bearer token for the backend
    #[arg(long, env = "COURSETRACK_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "COURSETRACK_TIMEOUT_SECS", default_value_t = coursetrack_backend::config::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Include unpublished items
    #[arg(long)]
    pub include_unpublished: bool,

    /// Watched percentage at which a video counts as completed
    #[arg(long, default_value_t = coursetrack_core::DEFAULT_VIDEO_COMPLETION_THRESHOLD)]
    pub video_threshold: f64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show completion of every module in the course
    Progress {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Mark a content item viewed
    ViewContent {
        /// Content ID
        #[arg(required = true)]
        content_id: String,
    },

    /// Record a video position
    Watch {
        /// Video ID
        #[arg(required = true)]
        video_id: String,

        /// Seconds watched
        #[arg(long)]
        watched: f64,

        /// Total length in seconds
        #[arg(long)]
        total: f64,
    },

    /// Check whether a quiz was submitted
    CheckQuiz {
        /// Quiz ID
        #[arg(required = true)]
        quiz_id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Cli {
    /// Backend connection settings from the command line and environment.
    pub fn backend_config(&self) -> BackendConfig {
        let mut config =
            BackendConfig::new(&self.api_url).with_timeout(Duration::from_secs(self.timeout.max(1)));
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        config
    }

    /// Sync settings from the command line.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_published_only(!self.include_unpublished)
            .with_engine(EngineConfig::new().with_video_completion_threshold(self.video_threshold))
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
