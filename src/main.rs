use mapcrawl::{config::CrawlerConfig, crawler, PlaceClient};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn, Level};

/// The main entry point of the application.
///
/// This function loads the configuration, installs the logger for the duration of the run,
/// crawls every keyword and writes the output file.
///
/// # Returns
///
/// `ExitCode::SUCCESS` unless the configuration could not be loaded or the crawl was aborted.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config_path = CrawlerConfig::default_path();
    let config = CrawlerConfig::load(&config_path);

    let verbose = config.as_ref().map(|c| c.verbose).unwrap_or(false);
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if config.ak.trim().is_empty() {
        warn!("No API credential (ak) configured, requests will be rejected by the API");
    }

    let start_time = Instant::now();

    let client = match PlaceClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if crawler::run(&client, &config).await {
        info!("数据抓取成功 ({:.2?})", start_time.elapsed());
        ExitCode::SUCCESS
    } else {
        error!("数据抓取失败");
        ExitCode::FAILURE
    }
}
