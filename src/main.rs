use chrono::Local;
use tracing_subscriber::EnvFilter;
use tweet_scrap::{info_time, process_site, AppConfig, Result, RunConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tweet_scrap=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let start_time = Local::now();
    let app = AppConfig::from_env()?;
    let run = RunConfig::from_env()?;

    process_site(&app, &run, start_time).await?;
    info_time!(start_time, "SCRAPING COMPLETE");

    Ok(())
}
