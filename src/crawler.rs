use crate::search::{fetch_and_parse, resolve_page_count};
use crate::{writer, CrawlerConfig, DelayRange, PlaceClient, Record, Result, SearchQuery};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// How the crawl of a single keyword ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordOutcome {
    /// The page count could not be resolved; nothing was fetched.
    Skipped,
    /// Every page was fetched.
    Completed { pages: u32 },
    /// Paging stopped at the page that failed.
    Stopped { page: u32 },
}

/// Crawls every configured keyword and writes the deduplicated result.
///
/// Per-keyword failures are logged and the run moves on. Only an unanticipated error aborts
/// the crawl, in which case nothing is written.
///
/// # Arguments
///
/// * `client` - The client used for every request.
/// * `config` - The city, keywords, delays and output path of the run.
///
/// # Returns
///
/// `true` unless the run was aborted.
pub async fn run(client: &PlaceClient, config: &CrawlerConfig) -> bool {
    match crawl(client, config).await {
        Ok(records) => {
            writer::write(records, &config.output_path());
            true
        }
        Err(e) => {
            error!("Crawl aborted: {}", e);
            false
        }
    }
}

/// Runs every keyword in order and returns the collected records.
pub async fn crawl(client: &PlaceClient, config: &CrawlerConfig) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for keyword in &config.keywords {
        info!("Current keyword: {}", keyword);
        let query = SearchQuery::new(keyword.as_str(), config.city.as_str());

        match crawl_keyword(client, &query, &config.page_delay, &mut records).await? {
            KeywordOutcome::Skipped => warn!("Skipped keyword '{}'", keyword),
            KeywordOutcome::Stopped { page } => {
                warn!("Stopped paging '{}' at page {}", keyword, page)
            }
            KeywordOutcome::Completed { pages } => {
                info!("Finished '{}' after {} pages", keyword, pages)
            }
        }
    }

    info!("Collected {} records", records.len());
    Ok(records)
}

/// Resolves the page count for `query` and fetches its pages in order.
#[instrument(skip_all, fields(keyword = query.keyword()))]
pub async fn crawl_keyword(
    client: &PlaceClient,
    query: &SearchQuery,
    page_delay: &DelayRange,
    records: &mut Vec<Record>,
) -> Result<KeywordOutcome> {
    let pages = match resolve_page_count(client, query).await? {
        Some(pages) => pages,
        None => return Ok(KeywordOutcome::Skipped),
    };

    for page in 0..pages {
        if page > 0 {
            sleep(page_delay.sample()).await;
        }
        if !fetch_and_parse(client, query, page, records).await? {
            return Ok(KeywordOutcome::Stopped { page });
        }
    }

    Ok(KeywordOutcome::Completed { pages })
}
