use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use editor_core::{
    EditorSession, HttpProjectStore, Notice, NoticeLevel, NotificationSink, PreviewHandOff,
    PreviewPresenter, QUIET_INTERVAL,
};
use shared::domain::{LogoTransform, Project, ProjectId};

mod settings;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    project_id: i64,
    #[arg(long)]
    project_name: String,
    #[arg(long)]
    technique: Option<String>,
}

struct ConsoleNotifications;

impl NotificationSink for ConsoleNotifications {
    fn notify(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        println!("[{tag}] {}: {}", notice.title, notice.message);
    }
}

struct ConsolePresenter;

impl PreviewPresenter for ConsolePresenter {
    fn open(&self, preview: PreviewHandOff) {
        println!(
            "Preview ready for '{}' ({}): {}",
            preview.project_name, preview.technique, preview.result_image_url
        );
    }

    fn close(&self) {
        println!("Preview closed.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = settings::load_settings();

    let store = Arc::new(HttpProjectStore::new(
        settings.api_base_url,
        settings.upload_base_url,
    )?);
    let session = EditorSession::new_with_dependencies(
        store,
        Arc::new(ConsoleNotifications),
        Arc::new(ConsolePresenter),
    );

    if let Ok(techniques) = session.refresh_marking_techniques().await {
        for technique in &techniques {
            println!("technique: {} ({})", technique.display_name, technique.name);
        }
    }

    session
        .select_project(Project::new(ProjectId(args.project_id), args.project_name))
        .await;
    if let Some(technique) = args.technique {
        session.set_marking_technique(technique).await;
    }

    // Nudge the logo once; the debounced save flushes after the quiet
    // interval.
    session.on_transform_change(LogoTransform::default());
    tokio::time::sleep(QUIET_INTERVAL + Duration::from_millis(250)).await;

    if session.can_generate().await {
        session.generate_preview().await;
    } else {
        println!("Generation disabled: upload a product image and pick a technique first.");
    }

    session.shutdown().await;
    Ok(())
}
