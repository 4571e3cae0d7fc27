use crate::{
    CrawlerError, PlaceClient, PlaceResponse, Record, Result, SearchQuery, MAX_PAGES, PAGE_SIZE,
};
use tracing::{debug, error, info};

/// Number of pages to fetch for `total` matches, capped at `MAX_PAGES`.
pub fn page_count(total: u64) -> u32 {
    let pages = total.div_ceil(u64::from(PAGE_SIZE));
    pages.min(u64::from(MAX_PAGES)) as u32
}

/// Learns how many pages to fetch for a keyword.
///
/// Sends the first page of `query` and reads the reported match count from it.
///
/// # Arguments
///
/// * `client` - The client used for the request.
/// * `query` - The keyword query; its page index is ignored.
///
/// # Returns
///
/// `Ok(Some(pages))` on success, `Ok(None)` if the count could not be resolved (exhausted retries,
/// a malformed body or an API-level error), and `Err` only for unanticipated failures.
pub async fn resolve_page_count(client: &PlaceClient, query: &SearchQuery) -> Result<Option<u32>> {
    let response = match fetch_response(client, &query.with_page(0)).await? {
        Some(response) => response,
        None => return Ok(None),
    };

    let total = response.total.unwrap_or(0);
    let pages = page_count(total);
    info!("Total matches: {}, pages to fetch: {}", total, pages);

    Ok(Some(pages))
}

/// Fetches one page and appends its records to `records`.
///
/// Records are appended in the order the API returns them.
///
/// # Arguments
///
/// * `client` - The client used for the request.
/// * `query` - The keyword query.
/// * `page_index` - The page to fetch.
/// * `records` - The accumulator of the current run.
///
/// # Returns
///
/// `Ok(true)` if the page was parsed, `Ok(false)` if it could not be fetched or parsed.
pub async fn fetch_and_parse(
    client: &PlaceClient,
    query: &SearchQuery,
    page_index: u32,
    records: &mut Vec<Record>,
) -> Result<bool> {
    let response = match fetch_response(client, &query.with_page(page_index)).await? {
        Some(response) => response,
        None => return Ok(false),
    };

    for record in response.results {
        debug!("Fetched: {}", record.name);
        records.push(record);
    }

    Ok(true)
}

/// Requests and decodes one page, downgrading expected failures to `None`.
async fn fetch_response(
    client: &PlaceClient,
    query: &SearchQuery,
) -> Result<Option<PlaceResponse>> {
    let body = match client.request(query).await {
        Ok(body) => body,
        Err(CrawlerError::RetriesExhausted { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    let response: PlaceResponse = match serde_json::from_str(&body) {
        Ok(response) => response,
        Err(e) => {
            error!(
                "Failed to parse page {} of '{}': {}",
                query.page_index(),
                query.keyword(),
                CrawlerError::Parse(e)
            );
            return Ok(None);
        }
    };

    if let Some(message) = response.api_error() {
        error!("API error for '{}': {}", query.keyword(), message);
        return Ok(None);
    }

    Ok(Some(response))
}
