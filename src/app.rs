//! Command orchestration: each operation is one batch unit of work over the
//! store and the service clients, returning a summary the binary prints.

use chrono::{Duration, Local, Utc};
use serde::Serialize;

use crate::config::MailParams;
use crate::error::WatchError;
use crate::mail::{MailClient, OutboundMessage};
use crate::mapper;
use crate::report::{ACTIVE_WINDOW_DAYS, Report};
use crate::search::SearchClient;
use crate::sheets::{self, SheetsClient};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub num_found: i64,
    pub stored: usize,
    pub missing_account_numbers: Vec<String>,
    pub enriched_accounts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub subject_line: String,
    pub spreadsheet_url: String,
    pub open_cases: usize,
    pub closed_cases: usize,
    pub active_cases: usize,
    pub distinct_statuses: Vec<String>,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailSummary {
    pub subject: String,
    pub recipients: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpreadsheetSummary {
    pub open_sheet: String,
    pub open_rows: usize,
    pub closed_sheet: String,
    pub closed_rows: usize,
}

pub struct App<S: SearchClient> {
    store: Store,
    search: S,
}

impl<S: SearchClient> App<S> {
    pub fn new(store: Store, search: S) -> Self {
        Self { store, search }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fetch one page of search results, map them into storage form, and
    /// upsert in order. With `enrich`, also fetch account detail for every
    /// account number still missing it; a single account failing is logged
    /// and skipped rather than aborting the batch.
    pub fn search_and_store(
        &self,
        query: &str,
        expression: &str,
        enrich: bool,
    ) -> Result<SearchSummary, WatchError> {
        let page = self.search.search(query, expression)?;
        let cases = mapper::to_storage_cases(&self.store, &page.cases)?;
        self.store.upsert_cases(&cases)?;

        let missing = self.store.get_account_numbers_missing_detail()?;
        tracing::info!(missing = missing.len(), "account numbers without detail");

        let mut enriched = 0;
        if enrich {
            for number in &missing {
                match self.search.fetch_account(number) {
                    Ok(account) => {
                        self.store
                            .upsert_account(&mapper::to_storage_account(&account))?;
                        enriched += 1;
                    }
                    Err(err) => {
                        tracing::warn!(account = %number, error = %err, "account enrichment failed");
                    }
                }
            }
        }

        Ok(SearchSummary {
            num_found: page.num_found,
            stored: cases.len(),
            missing_account_numbers: missing,
            enriched_accounts: enriched,
        })
    }

    pub fn report(&self, spreadsheet_id: &str) -> Result<ReportSummary, WatchError> {
        let report = Report::new(&self.store, spreadsheet_id);
        let since = Utc::now() - Duration::days(ACTIVE_WINDOW_DAYS);

        let active = report.active_cases_since(since)?;
        let open = report.open_cases()?;
        let closed = report.closed_cases()?;
        let distinct_statuses = self.store.get_distinct_status_values()?;

        Ok(ReportSummary {
            subject_line: report.subject_line(),
            spreadsheet_url: report.spreadsheet_url(),
            open_cases: open.len(),
            closed_cases: closed.len(),
            active_cases: active.len(),
            distinct_statuses,
            html: report.to_html(),
        })
    }

    pub fn email<M: MailClient>(
        &self,
        mailer: &M,
        params: &MailParams,
        spreadsheet_id: &str,
    ) -> Result<EmailSummary, WatchError> {
        let report = Report::new(&self.store, spreadsheet_id);
        let message = OutboundMessage {
            sender: params.sender.clone(),
            recipients: params.recipients.clone(),
            subject: report.subject_line(),
            html_body: report.to_html(),
        };
        mailer.send(&message)?;
        Ok(EmailSummary {
            subject: message.subject,
            recipients: message.recipients.len(),
        })
    }

    pub fn spreadsheet<G: SheetsClient>(
        &self,
        sheets: &G,
        spreadsheet_id: &str,
    ) -> Result<SpreadsheetSummary, WatchError> {
        let open = self.store.get_open_cases()?;
        let closed = self.store.get_closed_cases()?;

        let open_sheet = sheets::open_sheet_name(Local::now().date_naive());
        let closed_sheet = sheets::CLOSED_SHEET_NAME.to_string();

        for (sheet, cases) in [(&open_sheet, &open), (&closed_sheet, &closed)] {
            let range = sheets::sheet_range(sheet);
            sheets.ensure_sheet(spreadsheet_id, sheet)?;
            sheets.clear_range(spreadsheet_id, &range)?;
            sheets.write_range(spreadsheet_id, &range, &sheets::case_rows(cases))?;
        }

        Ok(SpreadsheetSummary {
            open_sheet,
            open_rows: open.len(),
            closed_sheet,
            closed_rows: closed.len(),
        })
    }
}
