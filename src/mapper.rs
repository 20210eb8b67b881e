//! Conversion from the search API representation into the storage shape.
//!
//! The one non-trivial step is product handling: a product name already
//! stored for the same case is reused (keeping its rowid so the store will
//! not insert it again), everything else becomes a fresh unsaved row. A
//! product absent from a later fetch is never removed.

use crate::api::{ApiAccount, ApiCase};
use crate::domain::{Account, Case, Product};
use crate::error::WatchError;
use crate::store::Store;

pub fn to_storage_case(store: &Store, source: &ApiCase) -> Result<Case, WatchError> {
    let mut products = Vec::with_capacity(source.products.len());
    for name in &source.products {
        let product = match store.find_product(&source.id, name)? {
            Some(existing) => existing,
            None => Product {
                id: None,
                case_id: source.id.clone(),
                name: name.clone(),
            },
        };
        products.push(product);
    }

    Ok(Case {
        id: source.id.clone(),
        account_number: source.account_number.clone(),
        case_number: source.number.clone(),
        contact_name: source.contact_name.clone(),
        created_by_name: source.created_by_name.clone(),
        created_date: source.created_date,
        customer_escalation: source.customer_escalation,
        last_modified_by_name: source.last_modified_by_name.clone(),
        last_modified_date: source.last_modified_date,
        last_public_update_by: source.last_public_update_by.clone(),
        last_public_update_date: source.last_public_update_date,
        owner: source.owner.clone(),
        products,
        severity: source.severity.clone(),
        summary: source.summary.clone(),
        status: source.status.clone(),
        case_type: source.case_type.clone(),
        uri: source.uri.clone(),
        version: source.version.clone(),
    })
}

pub fn to_storage_cases(store: &Store, sources: &[ApiCase]) -> Result<Vec<Case>, WatchError> {
    sources
        .iter()
        .map(|source| to_storage_case(store, source))
        .collect()
}

pub fn to_storage_account(source: &ApiAccount) -> Account {
    Account {
        account_number: source.account_number.clone(),
        name: source.name.clone(),
        gscsm_segment: source.gscsm_segment.clone(),
        csm_user_id: source.csm_user_id.clone(),
        csm_user_name: source.csm_user_name.clone(),
        csm_user_sso_name: source.csm_user_sso_name.clone(),
        strategic: source.strategic,
        has_enhanced_sla: source.has_enhanced_sla,
        has_srm: source.has_srm,
        has_tam: source.has_tam,
    }
}
