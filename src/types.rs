use serde::{Deserialize, Deserializer};

use crate::PAGE_SIZE;

/// One request against the place search API: a keyword, the city it is scoped to, and a page index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    keyword: String,
    city: String,
    page_index: u32,
}

impl SearchQuery {
    /// Creates the first-page query for `keyword` in `city`.
    pub fn new(keyword: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            city: city.into(),
            page_index: 0,
        }
    }

    /// Returns a copy of this query pointing at another page.
    pub fn with_page(&self, page_index: u32) -> Self {
        Self {
            page_index,
            ..self.clone()
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Renders the query parameters understood by the API.
    ///
    /// `scope=1` asks for the extended result set, and `city_limit=false` lets results spill
    /// over the region boundary.
    pub fn params(&self, ak: &str) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.keyword.clone()),
            ("region", self.city.clone()),
            ("page_size", PAGE_SIZE.to_string()),
            ("page_num", self.page_index.to_string()),
            ("scope", "1".to_string()),
            ("city_limit", "false".to_string()),
            ("output", "json".to_string()),
            ("ak", ak.to_string()),
        ]
    }
}

/// A single place listing as written to the output file.
///
/// Missing or `null` fields in the payload decode to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub province: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub area: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub address: String,
}

impl Record {
    /// The composite key that identifies a place in the output.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.name, &self.address)
    }
}

/// The body returned by the place search API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaceResponse {
    /// `0` on success; any other value is an API-level error.
    pub status: Option<i64>,
    pub message: Option<String>,
    /// Number of matches across all pages.
    pub total: Option<u64>,
    pub results: Vec<Record>,
}

impl PlaceResponse {
    /// Returns the API error message if the response does not carry a success status.
    pub fn api_error(&self) -> Option<String> {
        match self.status {
            Some(0) => None,
            Some(status) => Some(format!(
                "status {}: {}",
                status,
                self.message.as_deref().unwrap_or("")
            )),
            None => Some("missing status field".to_string()),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
