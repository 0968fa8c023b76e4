use anyhow::{Context, Result};
use clap::Parser;
use sqlx::PgPool;
use std::future::Future;
use std::path::{Path, PathBuf};
use uptime_report_rs::db;
use uptime_report_rs::services::locations::ingest::{
    self, LoadSummary, BUSINESS_HOURS_FILE, STATUS_FILE, TIMEZONES_FILE,
};

#[derive(Parser, Debug)]
#[command(
    about = "Load location status polls, business hours and timezones from CSV into Postgres. Tables that already hold rows are left untouched."
)]
struct Args {
    /// Directory holding store_status.csv, menu_hours.csv and timezones.csv.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Falls back to UPTIME_DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,
}

fn resolve_database_url(args: &Args) -> Result<String> {
    args.database_url
        .clone()
        .or_else(|| std::env::var("UPTIME_DATABASE_URL").ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .context("--database-url or UPTIME_DATABASE_URL must be set")
}

async fn load_file<F, Fut>(pool: &PgPool, data_dir: &Path, file: &str, load: F) -> Result<()>
where
    F: FnOnce(PgPool, PathBuf) -> Fut,
    Fut: Future<Output = Result<LoadSummary>>,
{
    let path = data_dir.join(file);
    if !path.exists() {
        tracing::warn!(file, path = %path.display(), "input file missing; skipping");
        return Ok(());
    }
    let summary = load(pool.clone(), path.clone())
        .await
        .with_context(|| format!("failed to load {}", path.display()))?;
    if summary.already_present {
        tracing::info!(file, "table already populated; skipping");
    } else {
        tracing::info!(
            file,
            loaded = summary.loaded,
            skipped = summary.skipped,
            "input file loaded"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let database_url = resolve_database_url(&args)?;
    let pool = db::connect_lazy(&database_url)?;
    db::run_migrations(&pool).await?;

    load_file(&pool, &args.data_dir, STATUS_FILE, |pool, path| async move {
        ingest::load_status(&pool, &path).await
    })
    .await?;
    load_file(&pool, &args.data_dir, BUSINESS_HOURS_FILE, |pool, path| async move {
        ingest::load_business_hours(&pool, &path).await
    })
    .await?;
    load_file(&pool, &args.data_dir, TIMEZONES_FILE, |pool, path| async move {
        ingest::load_timezones(&pool, &path).await
    })
    .await?;

    tracing::info!(data_dir = %args.data_dir.display(), "location data load finished");
    Ok(())
}
