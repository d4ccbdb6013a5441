use std::time::Duration;

use super::types::*;
use crate::browser::query::{FetchKey, PAGE_SIZE};

pub struct AnalyticsClient {
    base_url: String,
    agent: ureq::Agent,
}

#[derive(Debug)]
pub enum ApiError {
    Http(String),
    Parse(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Http(e) => write!(f, "HTTP error: {}", e),
            ApiError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl AnalyticsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        AnalyticsClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn read_body(result: Result<ureq::Response, ureq::Error>) -> Result<String, ApiError> {
        match result {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| ApiError::Parse(format!("Failed to read response: {}", e))),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                log_error!("[API] HTTP error {}: {}", code, truncate_str(&body, 200));
                Err(ApiError::Http(format!(
                    "status {}: {}",
                    code,
                    if body.is_empty() {
                        "(empty response)"
                    } else {
                        truncate_str(&body, 200)
                    }
                )))
            }
            Err(e) => {
                log_error!("[API] Connection error: {}", e);
                Err(ApiError::Http(e.to_string()))
            }
        }
    }

    pub fn fetch_analytics(&self) -> Result<Analytics, ApiError> {
        let url = self.url("analytics");
        log_info!("[API] GET {}", url);

        let body = Self::read_body(self.agent.get(&url).call())?;
        let analytics: Analytics = serde_json::from_str(&body).map_err(|e| {
            ApiError::Parse(format!(
                "Failed to parse analytics: {}. Response was: {}",
                e,
                truncate_str(&body, 500)
            ))
        })?;

        log_info!(
            "[API] analytics: {} senders, {} domains",
            analytics.top_senders.len(),
            analytics.top_domains.len()
        );
        Ok(analytics)
    }

    pub fn sync_emails(&self) -> Result<SyncOutcome, ApiError> {
        let url = self.url("sync");
        log_info!("[API] POST {}", url);

        let body = Self::read_body(self.agent.post(&url).call())?;
        if body.trim().is_empty() {
            return Ok(SyncOutcome::default());
        }
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse sync response: {}", e)))?;
        // Anything that is not an object with a message is still a success.
        let outcome = serde_json::from_value(value).unwrap_or_default();

        log_info!("[API] sync finished: {:?}", outcome);
        Ok(outcome)
    }

    pub fn fetch_emails(&self, key: &FetchKey) -> Result<ResultSet, ApiError> {
        let url = self.url("emails");
        log_info!(
            "[API] GET {} (page: {}, sort_by: {}, search: {:?}, after_date: {:?})",
            url,
            key.page,
            key.sort.as_param(),
            key.search,
            key.after_date
        );

        let page = key.page.to_string();
        let page_size = PAGE_SIZE.to_string();
        let mut request = self
            .agent
            .get(&url)
            .query("page", &page)
            .query("page_size", &page_size)
            .query("sort_by", key.sort.as_param());
        if let Some(search) = key.search.as_deref() {
            request = request.query("search", search);
        }
        if let Some(after) = key.after_date.as_deref() {
            request = request.query("after_date", after);
        }

        let body = Self::read_body(request.call())?;
        log_debug!(
            "[API] emails response ({} bytes): {}",
            body.len(),
            truncate_str(&body, 1000)
        );

        let raw: EmailsResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse emails: {}", e)))?;
        let set = ResultSet::from_response(key.sort, raw)
            .map_err(|e| ApiError::Parse(format!("Unexpected results shape: {}", e)))?;

        log_info!("[API] emails: {} rows (total: {})", set.len(), set.total);
        Ok(set)
    }
}

fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
