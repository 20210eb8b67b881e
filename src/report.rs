//! Derived-view summary over the store, rendered as subject line and HTML.

use chrono::{DateTime, Duration, Local, Utc};

use crate::domain::Case;
use crate::error::WatchError;
use crate::store::Store;

/// Trailing window that counts a case as recently active.
pub const ACTIVE_WINDOW_DAYS: i64 = 7;

const ERROR_PLACEHOLDER: &str = "<h1>Error processing report</h1>";

pub struct Report<'a> {
    store: &'a Store,
    spreadsheet_id: String,
}

impl<'a> Report<'a> {
    pub fn new(store: &'a Store, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            store,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub fn subject_line(&self) -> String {
        format!("Case Report for {}", Local::now().format("%Y-%m-%d"))
    }

    pub fn spreadsheet_url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}",
            self.spreadsheet_id
        )
    }

    pub fn open_cases(&self) -> Result<Vec<Case>, WatchError> {
        self.store.get_open_cases()
    }

    pub fn closed_cases(&self) -> Result<Vec<Case>, WatchError> {
        self.store.get_closed_cases()
    }

    pub fn active_cases_since(&self, since: DateTime<Utc>) -> Result<Vec<Case>, WatchError> {
        self.store.get_cases_active_since(since)
    }

    /// Best-effort rendering: a store failure degrades to a placeholder
    /// instead of failing the surrounding command.
    pub fn to_html(&self) -> String {
        match self.render() {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(error = %err, "report rendering degraded to placeholder");
                ERROR_PLACEHOLDER.to_string()
            }
        }
    }

    fn render(&self) -> Result<String, WatchError> {
        let current_date = Local::now().format("%Y-%m-%d");
        let open = self.open_cases()?;
        let closed = self.closed_cases()?;
        let active = self.active_cases_since(Utc::now() - Duration::days(ACTIVE_WINDOW_DAYS))?;

        Ok(format!(
            "<h1>Department Case Report {current_date}</h1>\
             <p>This email was sent with <a href='{repo}'>casewatch</a></p>\
             <p>{open} Open Cases</p>\
             <p>{active} Active Cases updated in past week</p>\
             <p>{closed} Closed Cases</p>\
             <p>For more details visit the <a href='{url}'>spreadsheet here</a></p>",
            repo = env!("CARGO_PKG_REPOSITORY"),
            open = open.len(),
            active = active.len(),
            closed = closed.len(),
            url = self.spreadsheet_url(),
        ))
    }
}
