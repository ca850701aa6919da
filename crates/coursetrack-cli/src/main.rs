//! coursetrack CLI entry point.

use std::sync::Arc;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use coursetrack_backend::HttpBackend;
use coursetrack_cli::cli::Cli;
use coursetrack_cli::commands;
use coursetrack_sync::CourseView;

#[tokio::main]
async fn main() {
    // User config first so a local .env can override it.
    if let Some(config_dir) = dirs::config_dir() {
        let _ = dotenvy::from_path(config_dir.join("coursetrack").join(".env"));
    }
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));
    fmt().with_env_filter(filter).with_target(false).init();

    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> commands::Result<String> {
    let course = cli
        .course
        .clone()
        .ok_or("no course given (use --course or COURSETRACK_COURSE)")?;

    let backend = HttpBackend::new(&cli.backend_config())?;
    debug!(base_url = %backend.base_url(), "backend configured");

    let view = CourseView::new(Arc::new(backend), cli.sync_config());
    let report = view.open(course).await?;
    if report.failed > 0 {
        eprintln!("Warning: {} fetches failed, some flags may be unknown", report.failed);
    }

    let output = commands::execute(cli.command, &view).await;
    view.leave_view().await;
    output
}
