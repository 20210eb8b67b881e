use chrono::{TimeZone, Utc};

use casewatch::api::{ApiAccount, ApiCase};
use casewatch::mapper::{to_storage_account, to_storage_case, to_storage_cases};
use casewatch::store::Store;

fn api_case(id: &str, products: &[&str]) -> ApiCase {
    ApiCase {
        id: id.to_string(),
        uri: format!("https://cases.example.com/{id}"),
        created_by_name: "jane".to_string(),
        contact_name: "bob smith".to_string(),
        version: "1.2".to_string(),
        products: products.iter().map(|name| name.to_string()).collect(),
        number: "02901".to_string(),
        severity: "3 (Normal)".to_string(),
        owner: "support-team".to_string(),
        created_date: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).single(),
        summary: "widget fails to frobnicate".to_string(),
        last_modified_date: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).single(),
        account_number: "42".to_string(),
        case_type: "Bug".to_string(),
        last_modified_by_name: "jane".to_string(),
        customer_escalation: true,
        status: "Waiting on Customer".to_string(),
        ..ApiCase::default()
    }
}

#[test]
fn copies_every_scalar_field() {
    let store = Store::open_in_memory().unwrap();
    let source = api_case("c1", &[]);

    let case = to_storage_case(&store, &source).unwrap();
    assert_eq!(case.id, "c1");
    assert_eq!(case.uri, "https://cases.example.com/c1");
    assert_eq!(case.created_by_name, "jane");
    assert_eq!(case.contact_name, "bob smith");
    assert_eq!(case.version, "1.2");
    assert_eq!(case.case_number, "02901");
    assert_eq!(case.severity, "3 (Normal)");
    assert_eq!(case.owner, "support-team");
    assert_eq!(case.created_date, source.created_date);
    assert_eq!(case.summary, "widget fails to frobnicate");
    assert_eq!(case.last_modified_date, source.last_modified_date);
    assert_eq!(case.account_number, "42");
    assert_eq!(case.case_type, "Bug");
    assert_eq!(case.last_modified_by_name, "jane");
    assert!(case.customer_escalation);
    assert_eq!(case.status, "Waiting on Customer");
}

#[test]
fn round_trip_keeps_product_names() {
    let store = Store::open_in_memory().unwrap();
    let source = api_case("c1", &["Widget", "Gadget", "Doohickey"]);

    let case = to_storage_case(&store, &source).unwrap();
    assert!(case.products.iter().all(|product| product.id.is_none()));
    store.upsert_case(&case).unwrap();

    let stored = store.get_all_cases().unwrap().remove(0);
    assert_eq!(stored.products.len(), 3);
    let names: Vec<&str> = stored
        .products
        .iter()
        .map(|product| product.name.as_str())
        .collect();
    assert_eq!(names, vec!["Widget", "Gadget", "Doohickey"]);
}

#[test]
fn repeated_ingestion_creates_no_duplicate_products() {
    let store = Store::open_in_memory().unwrap();
    let source = vec![api_case("c1", &["Widget", "Gadget", "Doohickey"])];

    for _ in 0..3 {
        let cases = to_storage_cases(&store, &source).unwrap();
        store.upsert_cases(&cases).unwrap();
    }

    let cases = store.get_all_cases().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].products.len(), 3);
}

#[test]
fn second_mapping_reuses_stored_rows() {
    let store = Store::open_in_memory().unwrap();
    let source = api_case("c1", &["Widget"]);

    let first = to_storage_case(&store, &source).unwrap();
    store.upsert_case(&first).unwrap();

    let second = to_storage_case(&store, &source).unwrap();
    assert_eq!(second.products.len(), 1);
    assert!(second.products[0].id.is_some());
}

#[test]
fn products_dropped_upstream_are_kept() {
    let store = Store::open_in_memory().unwrap();

    let full = api_case("c1", &["Widget", "Gadget"]);
    let case = to_storage_case(&store, &full).unwrap();
    store.upsert_case(&case).unwrap();

    // A later fetch no longer mentions Gadget and adds Sprocket; the stored
    // set is the union of everything ever seen.
    let shrunk = api_case("c1", &["Widget", "Sprocket"]);
    let case = to_storage_case(&store, &shrunk).unwrap();
    store.upsert_case(&case).unwrap();

    let stored = store.get_all_cases().unwrap().remove(0);
    let mut names: Vec<&str> = stored
        .products
        .iter()
        .map(|product| product.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Gadget", "Sprocket", "Widget"]);
}

#[test]
fn account_mapping_copies_fields() {
    let source = ApiAccount {
        account_number: "42".to_string(),
        name: "Example Corp".to_string(),
        gscsm_segment: "Commercial".to_string(),
        csm_user_id: "u-17".to_string(),
        csm_user_name: "pat".to_string(),
        csm_user_sso_name: "pat-sso".to_string(),
        strategic: true,
        has_enhanced_sla: true,
        has_srm: false,
        has_tam: true,
    };

    let account = to_storage_account(&source);
    assert_eq!(account.account_number, "42");
    assert_eq!(account.name, "Example Corp");
    assert_eq!(account.gscsm_segment, "Commercial");
    assert_eq!(account.csm_user_id, "u-17");
    assert_eq!(account.csm_user_name, "pat");
    assert_eq!(account.csm_user_sso_name, "pat-sso");
    assert!(account.strategic);
    assert!(account.has_enhanced_sla);
    assert!(!account.has_srm);
    assert!(account.has_tam);
}
