use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use clipfinder::kernel::session::JobState;
use clipfinder::view::{result_rows, status_line};
use clipfinder::{Asset, ClientConfig, HttpTransport, JobMode, SessionManager};

const USAGE: &str = "usage: clipfinder <video-path> [audio|scene] [query...]";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let mut args = std::env::args().skip(1);
    let path = args.next().context(USAGE)?;
    let mode = match args.next() {
        Some(raw) => JobMode::parse(&raw).with_context(|| format!("unknown mode '{}'\n{}", raw, USAGE))?,
        None => JobMode::Audio,
    };
    let query = args.collect::<Vec<_>>().join(" ");

    let config = ClientConfig::default();
    config.validate()?;
    let transport = HttpTransport::new(&config)?;
    transport
        .health()
        .await
        .with_context(|| format!("backend at {} is not healthy", config.base()))?;

    let asset = Asset::from_path(&path).await?;
    let mut manager = SessionManager::with_mode(Arc::new(transport), config, mode);
    manager.start_upload(asset)?;

    let mut last_line = None;
    loop {
        let line = status_line(manager.session());
        if line != last_line {
            if let Some(text) = &line {
                println!("{}", text);
            }
            last_line = line;
        }
        if manager.session().state().is_terminal() {
            break;
        }
        if manager.is_submitting() || manager.is_polling() {
            manager.step().await;
        } else if manager.process_pending() == 0 {
            bail!("background work stopped before the job finished");
        }
    }

    if manager.session().state() == JobState::Failed {
        bail!(
            "{}",
            manager.session().error_message().unwrap_or("processing failed")
        );
    }

    if query.trim().is_empty() {
        let job = manager.session().job_id().map(|id| id.to_string()).unwrap_or_default();
        println!("Job {} ready; pass a query to search.", job);
        return Ok(());
    }

    manager.begin_search(&query)?;
    manager.wait_until(|s| !s.is_searching()).await;

    if let Some(text) = status_line(manager.session()) {
        println!("{}", text);
    }
    for row in result_rows(manager.session()) {
        let marker = if row.is_best { "best" } else { "alt " };
        println!("  [{}] {}  {}", marker, row.label, row.summary);
    }
    if let Some(clip) = manager.session().clip_reference() {
        println!("Clip: {}", clip);
    }

    manager.shutdown();
    Ok(())
}
