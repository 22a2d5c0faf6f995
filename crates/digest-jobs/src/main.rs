use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use digest_jobs::{
    JobContext, JobKind, JobsConfig, MonthlyReportJob, Scheduler, SessionReminderJob,
    WeeklyRecapJob,
};
use journal_store::{DocumentJournal, SqliteDocumentStore};
use tokio::signal::unix::SignalKind;
use tokio::time;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  digest-jobs                                 Run the scheduler until stopped");
    eprintln!("  digest-jobs run <weekly|monthly|reminders>  Run one job now and exit");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let one_shot = match args.as_slice() {
        [] => None,
        [cmd, job] if cmd == "run" => Some(JobKind::parse(job).unwrap_or_else(|| usage())),
        _ => usage(),
    };

    let config = JobsConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Database: {}", config.database_url);
    tracing::info!("  Timezone: {}", config.timezone.name());
    tracing::info!("  Tick interval: {}s", config.tick_seconds);

    let docs = SqliteDocumentStore::new(&config.database_url)
        .await
        .with_context(|| format!("Failed to open store at {}", config.database_url))?;
    let journal = Arc::new(DocumentJournal::new(docs));

    let transport = config
        .notification
        .build_transport()
        .context("Failed to configure email transport")?;

    let ctx = Arc::new(JobContext {
        store: journal.clone(),
        sink: journal.clone(),
        transport,
        app_url: config.notification.app_url.clone(),
        win_rate_precision: config.win_rate_precision,
    });

    let scheduler = Scheduler::new(journal.clone(), config.timezone)
        .with_job(Arc::new(WeeklyRecapJob::new(ctx.clone())))
        .with_job(Arc::new(MonthlyReportJob::new(ctx.clone())))
        .with_job(Arc::new(SessionReminderJob::new(ctx)));

    if let Some(kind) = one_shot {
        let summary = scheduler.run_now(kind, chrono::Utc::now()).await?;
        tracing::info!("{} finished: {}", kind.name(), summary);
        return Ok(());
    }

    tracing::info!(
        "Digest scheduler running. Checking every {}s. Press Ctrl+C to stop.",
        config.tick_seconds
    );

    let mut interval = time::interval(Duration::from_secs(config.tick_seconds));
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for (kind, summary) in scheduler.tick(chrono::Utc::now()).await {
                    tracing::info!("{} completed: {}", kind.name(), summary);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, exiting gracefully...");
                break;
            }
        }
    }

    tracing::info!("Digest scheduler shut down.");
    Ok(())
}
