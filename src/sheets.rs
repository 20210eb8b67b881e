//! Spreadsheet publishing against the Google Sheets v4 API.
//!
//! Auth is a service-account JWT grant: sign an RS256 assertion with the
//! account's private key, exchange it for a bearer token, then drive the
//! values endpoints with it. Each run ensures the target sheets exist,
//! clears a fixed range, and rewrites header plus one row per case.

use std::time::Duration;

use chrono::NaiveDate;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ServiceAccountKey;
use crate::domain::Case;
use crate::error::WatchError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub const CLOSED_SHEET_NAME: &str = "Closed Cases";

pub trait SheetsClient: Send + Sync {
    /// Create the named sheet if it does not exist. Creation failure is not
    /// fatal: the sheet usually already exists from a previous run.
    fn ensure_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), WatchError>;
    fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), WatchError>;
    fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), WatchError>;
}

pub struct SheetsHttpClient {
    client: Client,
    token: String,
}

impl SheetsHttpClient {
    pub fn new(key: &ServiceAccountKey) -> Result<Self, WatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| WatchError::SheetsHttp(err.to_string()))?;
        let token = exchange_token(&client, key)?;
        Ok(Self { client, token })
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
            .unwrap_or_else(|_| "sheets request failed".to_string());
        Err(WatchError::SheetsStatus { status, message })
    }
}

impl SheetsClient for SheetsHttpClient {
    fn ensure_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), WatchError> {
        let url = format!("{SHEETS_API}/{spreadsheet_id}:batchUpdate");
        let body = json!({
            "requests": [{"addSheet": {"properties": {"title": title}}}]
        });
        let result = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|err| WatchError::SheetsHttp(err.to_string()))
            .and_then(Self::handle_status);
        if let Err(err) = result {
            tracing::debug!(sheet = title, error = %err, "ignoring sheet creation failure");
        }
        Ok(())
    }

    fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), WatchError> {
        let url = format!(
            "{SHEETS_API}/{spreadsheet_id}/values/{}:clear",
            urlencoding::encode(range)
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .map_err(|err| WatchError::SheetsHttp(err.to_string()))?;
        Self::handle_status(response)?;
        Ok(())
    }

    fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), WatchError> {
        let url = format!("{SHEETS_API}/{spreadsheet_id}/values:batchUpdate");
        let body = json!({
            "valueInputOption": "USER_ENTERED",
            "data": [{"range": range, "values": rows}]
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|err| WatchError::SheetsHttp(err.to_string()))?;
        Self::handle_status(response)?;
        tracing::info!(range, rows = rows.len(), "spreadsheet range updated");
        Ok(())
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn exchange_token(client: &Client, key: &ServiceAccountKey) -> Result<String, WatchError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPE,
        aud: TOKEN_URL,
        iat: now,
        exp: now + 3600,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.private_key_id.clone());
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|err| WatchError::SheetsHttp(format!("invalid private key: {err}")))?;
    let assertion = jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|err| WatchError::SheetsHttp(err.to_string()))?;

    let response = client
        .post(TOKEN_URL)
        .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", &assertion)])
        .send()
        .map_err(|err| WatchError::SheetsHttp(err.to_string()))?;
    let response = SheetsHttpClient::handle_status(response)?;
    let token: TokenResponse = response
        .json()
        .map_err(|err| WatchError::SheetsHttp(err.to_string()))?;
    Ok(token.access_token)
}

pub fn open_sheet_name(date: NaiveDate) -> String {
    format!("OpenCases - {}", date.format("%Y-%m-%d"))
}

pub fn sheet_range(sheet_name: &str) -> String {
    format!("{sheet_name}!A1:Z9999")
}

/// Header plus one row per case; the case column links back to the portal.
pub fn case_rows(cases: &[Case]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(cases.len() + 1);
    rows.push(
        [
            "Case", "Status", "Severity", "Type", "Owner", "Contact", "Account", "Created",
            "Last Modified", "Products", "Summary",
        ]
        .iter()
        .map(|cell| cell.to_string())
        .collect(),
    );
    for case in cases {
        rows.push(case_row(case));
    }
    rows
}

fn case_row(case: &Case) -> Vec<String> {
    let products = case
        .products
        .iter()
        .map(|product| product.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        case_link(case),
        case.status.clone(),
        case.severity.clone(),
        case.case_type.clone(),
        case.owner.clone(),
        case.contact_name.clone(),
        case.account_number.clone(),
        format_date(case.created_date),
        format_date(case.last_modified_date),
        products,
        case.summary.clone(),
    ]
}

fn case_link(case: &Case) -> String {
    if case.uri.is_empty() {
        return case.case_number.clone();
    }
    format!("=HYPERLINK(\"{}\",\"{}\")", case.uri, case.case_number)
}

fn format_date(value: Option<chrono::DateTime<chrono::Utc>>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
