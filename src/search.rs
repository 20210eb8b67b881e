//! Client for the remote case-search service.
//!
//! One authenticated POST per invocation, first page only, no retries. The
//! service fronts an internal CA, so certificate validation is disabled.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};

use crate::api::{self, ApiAccount, CasesPage, CasesQuery};
use crate::config::SearchParams;
use crate::error::WatchError;

pub trait SearchClient: Send + Sync {
    fn search(&self, query: &str, expression: &str) -> Result<CasesPage, WatchError>;
    fn fetch_account(&self, account_number: &str) -> Result<ApiAccount, WatchError>;
}

#[derive(Clone)]
pub struct SearchHttpClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl SearchHttpClient {
    pub fn new(params: &SearchParams) -> Result<Self, WatchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("casewatch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| WatchError::SearchHttp(err.to_string()))?,
        );
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| WatchError::SearchHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: params.base_url.trim_end_matches('/').to_string(),
            username: params.username.clone(),
            password: params.password.clone(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, WatchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "search request failed".to_string());
        Err(WatchError::SearchStatus { status, message })
    }
}

impl SearchClient for SearchHttpClient {
    fn search(&self, query: &str, expression: &str) -> Result<CasesPage, WatchError> {
        let url = format!("{}/search/v2/cases", self.base_url);
        let body = CasesQuery::first_page(query, expression);
        tracing::debug!(%url, rows = body.rows, "searching cases");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .map_err(|err| WatchError::SearchHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let text = response
            .text()
            .map_err(|err| WatchError::SearchHttp(err.to_string()))?;

        let page = api::parse_cases_page(&text)?;
        tracing::info!(
            num_found = page.num_found,
            start = page.start,
            returned = page.cases.len(),
            "search page received"
        );
        Ok(page)
    }

    fn fetch_account(&self, account_number: &str) -> Result<ApiAccount, WatchError> {
        let url = format!("{}/accounts/{}", self.base_url, account_number);
        tracing::debug!(%url, "fetching account detail");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .map_err(|err| WatchError::SearchHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| WatchError::MalformedResponse(err.to_string()))
    }
}
