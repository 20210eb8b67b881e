use camino::Utf8PathBuf;
use chrono::{Duration, Utc};

use casewatch::domain::{Account, Case, Product};
use casewatch::store::Store;

fn open_store(dir: &tempfile::TempDir) -> Store {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("cases.db")).unwrap();
    Store::open(&path).unwrap()
}

fn case_with_status(id: &str, account: &str, status: &str) -> Case {
    Case {
        id: id.to_string(),
        account_number: account.to_string(),
        status: status.to_string(),
        ..Case::default()
    }
}

fn sample_case() -> Case {
    let products = (0..3)
        .map(|index| Product {
            id: None,
            case_id: "myid1".to_string(),
            name: format!("TestName{index}"),
        })
        .collect();
    Case {
        id: "myid1".to_string(),
        summary: "My summary".to_string(),
        contact_name: "bob smith".to_string(),
        products,
        ..Case::default()
    }
}

#[test]
fn stores_case_with_products() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    store.upsert_cases(&[sample_case()]).unwrap();

    let product = store.find_product("myid1", "TestName2").unwrap().unwrap();
    assert_eq!(product.name, "TestName2");
    assert_eq!(product.case_id, "myid1");
    assert!(product.id.is_some());

    let cases = store.get_all_cases().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].products.len(), 3);
}

#[test]
fn upserting_same_stored_value_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    store.upsert_case(&sample_case()).unwrap();

    // Reload so the products carry their rowids, then upsert repeatedly.
    let stored = store.get_all_cases().unwrap().remove(0);
    store.upsert_case(&stored).unwrap();
    store.upsert_case(&stored).unwrap();

    let cases = store.get_all_cases().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].products.len(), 3);
    assert_eq!(cases[0].products, stored.products);
}

#[test]
fn upsert_overwrites_every_scalar_field() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let mut case = case_with_status("case1", "1", "Waiting on Customer");
    case.summary = "first summary".to_string();
    case.severity = "2 (High)".to_string();
    case.last_modified_date = Some(Utc::now() - Duration::days(10));
    store.upsert_case(&case).unwrap();

    case.status = "Closed".to_string();
    case.summary = "resolved".to_string();
    case.severity = String::new();
    case.last_modified_date = Some(Utc::now());
    store.upsert_case(&case).unwrap();

    let cases = store.get_all_cases().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].status, "Closed");
    assert_eq!(cases[0].summary, "resolved");
    assert_eq!(cases[0].severity, "");
}

#[test]
fn open_and_closed_filters() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    store
        .upsert_cases(&[
            case_with_status("case1", "1", "Waiting on Customer"),
            case_with_status("case2", "2", "Unknown"),
            case_with_status("case3", "3", "Closed"),
            case_with_status("case4", "4", "Closed"),
            case_with_status("case5", "5", "Closed"),
        ])
        .unwrap();

    let open = store.get_open_cases().unwrap();
    assert_eq!(open.len(), 2);
    for case in &open {
        assert!(["case1", "case2"].contains(&case.id.as_str()));
    }

    let closed = store.get_closed_cases().unwrap();
    assert_eq!(closed.len(), 3);
    for case in &closed {
        assert!(["case3", "case4", "case5"].contains(&case.id.as_str()));
    }
}

#[test]
fn active_since_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let offsets = [
        ("case1", Duration::days(1)),
        ("case2", Duration::days(25)),
        ("case3", Duration::days(3)),
        ("case4", Duration::days(30)),
        ("case5", Duration::days(365)),
    ];
    for (id, offset) in offsets {
        let mut case = case_with_status(id, "", "Unknown");
        case.last_modified_date = Some(Utc::now() - offset);
        store.upsert_case(&case).unwrap();
    }

    let active = store
        .get_cases_active_since(Utc::now() - Duration::days(7))
        .unwrap();
    assert_eq!(active.len(), 2);
    for case in &active {
        assert!(["case1", "case3"].contains(&case.id.as_str()));
    }
}

#[test]
fn never_modified_cases_are_not_active() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    store
        .upsert_case(&case_with_status("case1", "1", "Unknown"))
        .unwrap();

    let active = store
        .get_cases_active_since(Utc::now() - Duration::days(7))
        .unwrap();
    assert!(active.is_empty());
}

#[test]
fn missing_account_numbers_exclude_empty_and_enriched() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    store
        .upsert_cases(&[
            case_with_status("case1", "1", "Unknown"),
            case_with_status("case2", "2", "Unknown"),
            case_with_status("case3", "", "Unknown"),
            case_with_status("case4", "2", "Closed"),
        ])
        .unwrap();

    let missing = store.get_account_numbers_missing_detail().unwrap();
    assert_eq!(missing, vec!["1".to_string(), "2".to_string()]);

    store
        .upsert_account(&Account {
            account_number: "1".to_string(),
            name: "First Account".to_string(),
            ..Account::default()
        })
        .unwrap();

    let missing = store.get_account_numbers_missing_detail().unwrap();
    assert_eq!(missing, vec!["2".to_string()]);
}

#[test]
fn distinct_statuses_sorted_ascending() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let statuses = [
        ("case1", "Waiting on Customer"),
        ("case2", "Unknown"),
        ("case3", "Foo"),
        ("case4", "Foo"),
        ("case5", "Closed"),
        ("case6", "Closed"),
    ];
    for (id, status) in statuses {
        store
            .upsert_case(&case_with_status(id, "", status))
            .unwrap();
    }

    let values = store.get_distinct_status_values().unwrap();
    assert_eq!(
        values,
        vec![
            "Closed".to_string(),
            "Foo".to_string(),
            "Unknown".to_string(),
            "Waiting on Customer".to_string(),
        ]
    );
}
