//! Wire shapes for the remote case-search API.
//!
//! The search endpoint wraps its payload in a `{"response": {...}}` envelope;
//! [`parse_cases_page`] unwraps it and distinguishes a missing envelope key
//! from JSON that does not parse at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WatchError;

/// Fixed page size of the search endpoint. Only the first page is fetched.
pub const PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CasesQuery {
    pub q: String,
    pub start: i64,
    pub rows: i64,
    pub partner_search: bool,
    pub expression: String,
}

impl CasesQuery {
    pub fn first_page(query: &str, expression: &str) -> Self {
        Self {
            q: query.to_string(),
            start: 0,
            rows: PAGE_SIZE,
            partner_search: false,
            expression: expression.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CasesPage {
    #[serde(rename = "numFound", default)]
    pub num_found: i64,
    #[serde(default)]
    pub start: i64,
    #[serde(rename = "docs", default)]
    pub cases: Vec<ApiCase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCase {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uri: String,
    #[serde(rename = "case_createdByName", default)]
    pub created_by_name: String,
    #[serde(rename = "case_contactName", default)]
    pub contact_name: String,
    #[serde(rename = "case_version", default)]
    pub version: String,
    #[serde(rename = "case_product", default)]
    pub products: Vec<String>,
    #[serde(rename = "case_number", default)]
    pub number: String,
    #[serde(rename = "case_last_public_update_by", default)]
    pub last_public_update_by: String,
    #[serde(rename = "case_severity", default)]
    pub severity: String,
    #[serde(rename = "case_owner", default)]
    pub owner: String,
    #[serde(rename = "case_last_public_update_date", default)]
    pub last_public_update_date: Option<DateTime<Utc>>,
    #[serde(rename = "case_createdDate", default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(rename = "case_summary", default)]
    pub summary: String,
    #[serde(rename = "case_lastModifiedDate", default)]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(rename = "case_accountNumber", default)]
    pub account_number: String,
    #[serde(rename = "case_type", default)]
    pub case_type: String,
    #[serde(rename = "case_lastModifiedByName", default)]
    pub last_modified_by_name: String,
    #[serde(rename = "case_customer_escalation", default)]
    pub customer_escalation: bool,
    #[serde(rename = "case_status", default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiAccount {
    pub account_number: String,
    pub name: String,
    pub gscsm_segment: String,
    pub csm_user_id: String,
    pub csm_user_name: String,
    pub csm_user_sso_name: String,
    pub strategic: bool,
    pub has_enhanced_sla: bool,
    pub has_srm: bool,
    pub has_tam: bool,
}

/// Unwrap the `{"response": {...}}` envelope around a search result page.
pub fn parse_cases_page(body: &str) -> Result<CasesPage, WatchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| WatchError::MalformedResponse(err.to_string()))?;
    let Some(response) = value.get("response") else {
        return Err(WatchError::MissingResponseKey);
    };
    serde_json::from_value(response.clone())
        .map_err(|err| WatchError::MalformedResponse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn query_body_field_names() {
        let query = CasesQuery::first_page("team keyword", "fields:id");
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["q"], "team keyword");
        assert_eq!(json["start"], 0);
        assert_eq!(json["rows"], 100);
        assert_eq!(json["partnerSearch"], false);
        assert_eq!(json["expression"], "fields:id");
    }

    #[test]
    fn parse_page_unwraps_envelope() {
        let body = r#"{
            "response": {
                "numFound": 2,
                "start": 0,
                "docs": [
                    {
                        "id": "c1",
                        "case_status": "Closed",
                        "case_product": ["Widget", "Gadget"],
                        "case_lastModifiedDate": "2024-03-01T10:00:00Z"
                    },
                    {"id": "c2"}
                ]
            }
        }"#;
        let page = parse_cases_page(body).unwrap();
        assert_eq!(page.num_found, 2);
        assert_eq!(page.cases.len(), 2);
        assert_eq!(page.cases[0].status, "Closed");
        assert_eq!(page.cases[0].products, vec!["Widget", "Gadget"]);
        assert!(page.cases[0].last_modified_date.is_some());
        assert_eq!(page.cases[1].status, "");
    }

    #[test]
    fn parse_page_missing_envelope_key() {
        let body = r#"{"numFound": 0, "docs": []}"#;
        assert_matches!(parse_cases_page(body), Err(WatchError::MissingResponseKey));
    }

    #[test]
    fn parse_page_rejects_malformed_json() {
        assert_matches!(
            parse_cases_page("not json"),
            Err(WatchError::MalformedResponse(_))
        );
    }
}
