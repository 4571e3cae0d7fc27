use crate::{CrawlerConfig, CrawlerError, DelayRange, Result, SearchQuery};
use reqwest::{Client, StatusCode, Url};
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// The `PlaceClient` struct sends requests to the place search API.
/// Every request goes through a bounded retry loop with a randomized backoff between attempts.
pub struct PlaceClient {
    /// The HTTP client used for making requests.
    client: Client,
    /// The place search endpoint.
    endpoint: String,
    /// The API credential.
    ak: String,
    /// The maximum number of attempts per request.
    max_retries: u32,
    /// The wait between two failed attempts.
    backoff: DelayRange,
}

impl PlaceClient {
    /// Creates a new `PlaceClient` with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration settings for the crawler.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PlaceClient` instance, or an error if the client could not be
    /// created.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .build()
            .map_err(CrawlerError::Request)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            ak: config.ak.clone(),
            max_retries: config.max_retries.max(1),
            backoff: config.retry_backoff,
        })
    }

    /// Fetches the body for a query, retrying failed attempts.
    ///
    /// # Arguments
    ///
    /// * `query` - The query to send.
    ///
    /// # Returns
    ///
    /// The response body, `CrawlerError::RetriesExhausted` once every attempt has failed, or
    /// `CrawlerError::InvalidEndpoint` if no request URL could be built.
    pub async fn request(&self, query: &SearchQuery) -> Result<String> {
        let url = self.url_for(query)?;
        debug!("Request URL: {}", url);

        for attempt in 1..=self.max_retries {
            match self.try_request(url.clone()).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(
                        "Request attempt {}/{} failed: {}",
                        attempt, self.max_retries, e
                    );
                    if attempt < self.max_retries {
                        sleep(self.backoff.sample()).await;
                    }
                }
            }
        }

        // The credential stays out of the logs.
        let mut shown = url;
        shown.set_query(None);
        error!(
            "Giving up on {} (keyword {}, page {})",
            shown,
            query.keyword(),
            query.page_index()
        );
        Err(CrawlerError::RetriesExhausted {
            url: shown.to_string(),
            attempts: self.max_retries,
        })
    }

    /// Performs a single GET and accepts only `200 OK`.
    async fn try_request(&self, url: Url) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CrawlerError::UnexpectedStatus(status));
        }

        Ok(response.text().await?)
    }

    fn url_for(&self, query: &SearchQuery) -> Result<Url> {
        Url::parse_with_params(&self.endpoint, query.params(&self.ak)).map_err(|e| {
            CrawlerError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_config(endpoint: String) -> CrawlerConfig {
        CrawlerConfig {
            ak: "test-ak".to_string(),
            endpoint,
            retry_backoff: DelayRange::zero(),
            page_delay: DelayRange::zero(),
            ..CrawlerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_request_sends_query_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/place/v2/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "火锅".into()),
                Matcher::UrlEncoded("region".into(), "云浮市".into()),
                Matcher::UrlEncoded("page_num".into(), "2".into()),
                Matcher::UrlEncoded("page_size".into(), "20".into()),
                Matcher::UrlEncoded("scope".into(), "1".into()),
                Matcher::UrlEncoded("city_limit".into(), "false".into()),
                Matcher::UrlEncoded("output".into(), "json".into()),
                Matcher::UrlEncoded("ak".into(), "test-ak".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":0}"#)
            .expect(1)
            .create_async()
            .await;

        let client =
            PlaceClient::new(&test_config(format!("{}/place/v2/search", server.url()))).unwrap();
        let body = client
            .request(&SearchQuery::new("火锅", "云浮市").with_page(2))
            .await
            .unwrap();

        assert_eq!(body, r#"{"status":0}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/place/v2/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client =
            PlaceClient::new(&test_config(format!("{}/place/v2/search", server.url()))).unwrap();
        let result = client.request(&SearchQuery::new("A", "X")).await;

        match result {
            Err(CrawlerError::RetriesExhausted { url, attempts }) => {
                assert_eq!(attempts, 3);
                assert!(!url.contains("test-ak"));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let client = PlaceClient::new(&test_config("not a url".to_string())).unwrap();
        let result = client.request(&SearchQuery::new("A", "X")).await;

        assert!(matches!(result, Err(CrawlerError::InvalidEndpoint { .. })));
    }
}
