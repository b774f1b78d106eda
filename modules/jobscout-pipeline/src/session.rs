//! Trait abstraction over the authenticated browser session.
//!
//! The pipeline only needs "extract current page of postings", "extract
//! posting detail" and the people-search equivalents; clicking, scrolling and
//! waiting stay behind this seam. The secondary context hosts the people
//! search so the results page keeps its scroll position; it must be closed
//! before the next posting is processed.
//!
//! Enables deterministic testing with MockSession: no browser, no network.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use jobscout_common::{PersonCard, RawPostingDetail, RawSearchPage, ScoutError, SearchQuery};

use crate::query::search_url;

#[async_trait]
pub trait BoardSession: Send + Sync {
    /// Load one results page for a query. `page` is zero-based.
    async fn search_page(
        &self,
        query: &SearchQuery,
        page: u32,
    ) -> Result<RawSearchPage, ScoutError>;

    /// Open a posting and extract its detail panel.
    async fn posting_detail(&self, posting_id: &str) -> Result<RawPostingDetail, ScoutError>;

    /// Load one people-search results page. `page` is one-based to match the
    /// source's pagination display.
    async fn people_page(&self, query: &str, page: u32) -> Result<Vec<PersonCard>, ScoutError>;

    /// Click the connect affordance on a person card.
    async fn send_connect(&self, profile_url: &str) -> Result<(), ScoutError>;

    /// Open the dedicated browsing context for people search.
    async fn open_people_context(&self) -> Result<(), ScoutError>;

    /// Close the people-search context and restore focus to the results page.
    async fn close_people_context(&self) -> Result<(), ScoutError>;
}

// ---------------------------------------------------------------------------
// AgentSession — HTTP client to the authenticated session-agent service
// ---------------------------------------------------------------------------

/// Client for the browser session agent: a sidecar service that holds the
/// authenticated browser and answers structured extraction requests. All DOM
/// driving and login live on the agent side.
pub struct AgentSession {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl AgentSession {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ScoutError> {
        let mut endpoint = format!("{}{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        debug!(path, "Session agent request");

        let resp = self
            .http
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScoutError::ExtractionTimeout(format!("{path}: {e}"))
                } else {
                    // Agent unreachable means the browser session is gone.
                    ScoutError::SessionLost(format!("{path}: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ScoutError::SessionLost(format!("{path}: {status}: {message}")),
                408 | 504 => ScoutError::ExtractionTimeout(format!("{path}: {message}")),
                _ => ScoutError::ExtractionFault(format!("{path}: {status}: {message}")),
            });
        }

        resp.json()
            .await
            .map_err(|e| ScoutError::ExtractionFault(format!("{path}: malformed body: {e}")))
    }
}

#[async_trait]
impl BoardSession for AgentSession {
    async fn search_page(
        &self,
        query: &SearchQuery,
        page: u32,
    ) -> Result<RawSearchPage, ScoutError> {
        self.post(
            "/search",
            serde_json::json!({
                "url": search_url(query, page),
                "page": page,
            }),
        )
        .await
    }

    async fn posting_detail(&self, posting_id: &str) -> Result<RawPostingDetail, ScoutError> {
        self.post("/posting", serde_json::json!({ "posting_id": posting_id }))
            .await
    }

    async fn people_page(&self, query: &str, page: u32) -> Result<Vec<PersonCard>, ScoutError> {
        self.post(
            "/people",
            serde_json::json!({ "query": query, "page": page }),
        )
        .await
    }

    async fn send_connect(&self, profile_url: &str) -> Result<(), ScoutError> {
        let _: serde_json::Value = self
            .post("/connect", serde_json::json!({ "profile_url": profile_url }))
            .await?;
        Ok(())
    }

    async fn open_people_context(&self) -> Result<(), ScoutError> {
        let _: serde_json::Value = self
            .post("/context/open", serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn close_people_context(&self) -> Result<(), ScoutError> {
        let _: serde_json::Value = self
            .post("/context/close", serde_json::json!({}))
            .await?;
        Ok(())
    }
}
