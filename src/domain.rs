use chrono::{DateTime, Utc};

/// Status value the search API uses for resolved cases. Every other status
/// string ("Waiting on Customer", "Unknown", ...) counts as open.
pub const CLOSED_STATUS: &str = "Closed";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Case {
    pub id: String,
    pub account_number: String,
    pub case_number: String,
    pub contact_name: String,
    pub created_by_name: String,
    pub created_date: Option<DateTime<Utc>>,
    pub customer_escalation: bool,
    pub last_modified_by_name: String,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub last_public_update_by: String,
    pub last_public_update_date: Option<DateTime<Utc>>,
    pub owner: String,
    pub products: Vec<Product>,
    pub severity: String,
    pub summary: String,
    pub status: String,
    pub case_type: String,
    pub uri: String,
    pub version: String,
}

impl Case {
    pub fn is_closed(&self) -> bool {
        self.status == CLOSED_STATUS
    }
}

/// A named product association on a case. `id` is the rowid once persisted;
/// a `None` id marks a product the store has not seen yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub id: Option<i64>,
    pub case_id: String,
    pub name: String,
}

/// Enrichment detail for an account, fetched separately from case search.
/// Most cases reference an account number that has no row here yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_is_exact_match() {
        let mut case = Case {
            status: "Closed".to_string(),
            ..Case::default()
        };
        assert!(case.is_closed());

        case.status = "closed".to_string();
        assert!(!case.is_closed());

        case.status = "Waiting on Customer".to_string();
        assert!(!case.is_closed());
    }
}
