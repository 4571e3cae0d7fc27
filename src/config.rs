use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CrawlerError, Result};

/// Longest wait a delay range may ask for, in seconds.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Name of the optional configuration file looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = "mapcrawl.toml";

/// The `CrawlerConfig` struct holds the static configuration of a crawl run.
/// It includes the API credential, the target city, the ordered keyword list, and the request
/// and delay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// The API credential (`ak`) sent with every request.
    pub ak: String,
    /// The city whose places are collected.
    pub city: String,
    /// The search keywords, processed in order.
    pub keywords: Vec<String>,
    /// The place search endpoint.
    pub endpoint: String,
    /// Where the CSV is written. Defaults to `<city>美食数据.csv` next to the executable.
    pub output_path: Option<PathBuf>,
    /// The timeout for HTTP requests, in seconds.
    pub timeout_secs: u64,
    /// The maximum number of attempts for a single request.
    pub max_retries: u32,
    /// The user agent string to be used in HTTP requests.
    pub user_agent: String,
    /// Wait between failed attempts of one request.
    pub retry_backoff: DelayRange,
    /// Wait between two page fetches of the same keyword.
    pub page_delay: DelayRange,
    /// Log at debug level.
    pub verbose: bool,
}

/// A closed range of seconds from which a random wait is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// A range that never waits.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Checks that both bounds are finite, non-negative and at most `MAX_DELAY_SECS`.
    fn validate(&self, name: &str) -> Result<()> {
        for bound in [self.min_secs, self.max_secs] {
            if !(0.0..=MAX_DELAY_SECS).contains(&bound) {
                return Err(config_error(format!(
                    "{} bounds must be between 0 and {} seconds, got {}..={}",
                    name, MAX_DELAY_SECS, self.min_secs, self.max_secs
                )));
            }
        }
        Ok(())
    }

    /// Draws a uniformly distributed duration from the range.
    ///
    /// A degenerate or inverted range yields its lower bound.
    pub fn sample(&self) -> Duration {
        let min = self.min_secs.max(0.0);
        if self.max_secs <= min {
            return Duration::from_secs_f64(min);
        }
        let secs = rand::thread_rng().gen_range(min..=self.max_secs);
        Duration::from_secs_f64(secs)
    }
}

impl Default for CrawlerConfig {
    /// Provides default values for the `CrawlerConfig` struct.
    ///
    /// # Returns
    ///
    /// A `CrawlerConfig` instance with default settings.
    fn default() -> Self {
        Self {
            ak: String::new(),
            city: String::from("云浮市"),
            keywords: ["美食", "餐厅", "饭店", "餐馆", "小吃", "火锅", "烧烤", "快餐", "中餐厅"]
                .into_iter()
                .map(String::from)
                .collect(),
            endpoint: String::from(crate::DEFAULT_ENDPOINT),
            output_path: None,
            timeout_secs: crate::DEFAULT_TIMEOUT.as_secs(),
            max_retries: crate::DEFAULT_MAX_RETRIES,
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36",
            ),
            retry_backoff: DelayRange::new(2.0, 5.0),
            page_delay: DelayRange::new(1.5, 3.0),
            verbose: false,
        }
    }
}

impl CrawlerConfig {
    /// Loads the configuration, layering the given TOML file over the defaults.
    ///
    /// A missing file is not an error; every key it does not set keeps its default.
    ///
    /// # Arguments
    ///
    /// * `path` - The configuration file to read.
    ///
    /// # Returns
    ///
    /// A `Result` containing the validated `CrawlerConfig`, or a `CrawlerError::Config` if the
    /// file is malformed, the keyword list is empty, the timeout is zero or a delay range is
    /// out of bounds.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: CrawlerConfig = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// The configuration file next to the running executable, or in the current directory.
    pub fn default_path() -> PathBuf {
        base_dir().join(CONFIG_FILE_NAME)
    }

    fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() {
            return Err(config_error("at least one keyword is required"));
        }
        if self.timeout_secs == 0 {
            return Err(config_error("timeout_secs must be greater than zero"));
        }
        self.retry_backoff.validate("retry_backoff")?;
        self.page_delay.validate("page_delay")
    }

    /// The request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves the CSV output path.
    pub fn output_path(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => path.clone(),
            None => base_dir().join(format!("{}美食数据.csv", self.city)),
        }
    }
}

fn config_error(message: impl Into<String>) -> CrawlerError {
    CrawlerError::Config(::config::ConfigError::Message(message.into()))
}

fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CrawlerConfig::default();

        assert_eq!(config.keywords.len(), 9);
        assert_eq!(config.keywords[0], "美食");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert!(config.output_path().ends_with("云浮市美食数据.csv"));
    }

    #[test]
    fn test_load_missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrawlerConfig::load(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.city, "云浮市");
        assert_eq!(config.endpoint, crate::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_load_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapcrawl.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
ak = "secret"
city = "广州市"
keywords = ["火锅", "烧烤"]
output_path = "out.csv"

[page_delay]
min_secs = 0.0
max_secs = 0.0
"#
        )
        .unwrap();

        let config = CrawlerConfig::load(&path).unwrap();

        assert_eq!(config.ak, "secret");
        assert_eq!(config.city, "广州市");
        assert_eq!(config.keywords, vec!["火锅", "烧烤"]);
        assert_eq!(config.output_path(), PathBuf::from("out.csv"));
        assert_eq!(config.page_delay, DelayRange::zero());
        // untouched keys keep their defaults
        assert_eq!(config.retry_backoff, DelayRange::new(2.0, 5.0));
    }

    #[test]
    fn test_empty_keywords_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapcrawl.toml");
        std::fs::write(&path, "keywords = []\n").unwrap();

        let result = CrawlerConfig::load(&path);

        assert!(matches!(result, Err(CrawlerError::Config(_))));
    }

    #[test]
    fn test_out_of_range_delays_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapcrawl.toml");
        let cases = [
            "[page_delay]\nmin_secs = 1e20\nmax_secs = 2e20\n",
            "[retry_backoff]\nmin_secs = 2.0\nmax_secs = inf\n",
            "[retry_backoff]\nmin_secs = nan\nmax_secs = 5.0\n",
            "[page_delay]\nmin_secs = -1.0\nmax_secs = 3.0\n",
            "timeout_secs = 0\n",
        ];

        for case in cases {
            std::fs::write(&path, case).unwrap();
            let result = CrawlerConfig::load(&path);
            assert!(matches!(result, Err(CrawlerError::Config(_))), "accepted: {}", case);
        }
    }

    #[test]
    fn test_delay_at_limit_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapcrawl.toml");
        std::fs::write(&path, "[page_delay]\nmin_secs = 0\nmax_secs = 3600\n").unwrap();

        let config = CrawlerConfig::load(&path).unwrap();

        assert!(config.page_delay.sample() <= Duration::from_secs(3600));
    }

    #[test]
    fn test_delay_sample_bounds() {
        let range = DelayRange::new(1.5, 3.0);
        for _ in 0..100 {
            let delay = range.sample();
            assert!(delay >= Duration::from_secs_f64(1.5));
            assert!(delay <= Duration::from_secs_f64(3.0));
        }

        assert_eq!(DelayRange::zero().sample(), Duration::ZERO);
        assert_eq!(DelayRange::new(2.0, 1.0).sample(), Duration::from_secs(2));
    }
}
