pub mod models;

pub use self::models::{
    is_text_bearing, BlockData, BlockPage, PageMeta, PageSearchPage, SearchResult,
    TEXT_BLOCK_TYPES,
};

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;

use crate::traits::NotesSource;
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const API_VERSION: &str = "2022-06-28";

/// Normalize a provider timestamp ("2025-08-01T09:15:00.000Z") to the
/// store's "YYYY-MM-DD HH:MM:SS" form. Unparseable values pass through
/// unchanged rather than being dropped.
pub fn normalize_edited_time(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

/// Notion-shaped workspace API client
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NotionClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("notes provider rejected the API key".to_string()));
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl NotesSource for NotionClient {
    async fn search_pages(&self, cursor: Option<&str>) -> Result<PageSearchPage> {
        let mut body = serde_json::json!({ "query": "" });
        if let Some(cursor) = cursor {
            body["start_cursor"] = serde_json::Value::String(cursor.to_string());
        }
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = self.check(response).await?;
        response
            .json::<PageSearchPage>()
            .await
            .map_err(|e| Error::Decode(format!("page search: {}", e)))
    }

    async fn get_page(&self, page_id: &str) -> Result<PageMeta> {
        let response = self
            .http
            .get(format!("{}/pages/{}", self.base_url, page_id))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", API_VERSION)
            .send()
            .await?;
        let response = self.check(response).await?;
        response
            .json::<PageMeta>()
            .await
            .map_err(|e| Error::Decode(format!("page {}: {}", page_id, e)))
    }

    async fn list_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockPage> {
        let mut request = self
            .http
            .get(format!("{}/blocks/{}/children", self.base_url, block_id))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", API_VERSION);
        if let Some(cursor) = cursor {
            request = request.query(&[("start_cursor", cursor)]);
        }
        let response = self.check(request.send().await?).await?;
        response
            .json::<BlockPage>()
            .await
            .map_err(|e| Error::Decode(format!("children of {}: {}", block_id, e)))
    }
}
