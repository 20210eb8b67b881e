//! SQLite-backed record store for cases, products, and account detail.
//!
//! The schema is applied on open and is idempotent. Upserts are
//! full-replace by primary key; there is no wrapping transaction around a
//! batch, so a failure mid-batch leaves earlier rows committed.

use camino::Utf8Path;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{Account, CLOSED_STATUS, Case, Product};
use crate::error::WatchError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cases (
    id TEXT PRIMARY KEY,
    account_number TEXT NOT NULL DEFAULT '',
    case_number TEXT NOT NULL DEFAULT '',
    contact_name TEXT NOT NULL DEFAULT '',
    created_by_name TEXT NOT NULL DEFAULT '',
    created_date TEXT,
    customer_escalation INTEGER NOT NULL DEFAULT 0,
    last_modified_by_name TEXT NOT NULL DEFAULT '',
    last_modified_date TEXT,
    last_public_update_by TEXT NOT NULL DEFAULT '',
    last_public_update_date TEXT,
    owner TEXT NOT NULL DEFAULT '',
    severity TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    case_type TEXT NOT NULL DEFAULT '',
    uri TEXT NOT NULL DEFAULT '',
    version TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status);
CREATE INDEX IF NOT EXISTS idx_cases_last_modified ON cases(last_modified_date);

-- No UNIQUE(case_id, name): dedup is the mapper's lookup-or-create step,
-- and rows missing from a later fetch are kept rather than pruned.
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id TEXT NOT NULL REFERENCES cases(id),
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_case_id ON products(case_id);

CREATE TABLE IF NOT EXISTS accounts (
    account_number TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    gscsm_segment TEXT NOT NULL DEFAULT '',
    csm_user_id TEXT NOT NULL DEFAULT '',
    csm_user_name TEXT NOT NULL DEFAULT '',
    csm_user_sso_name TEXT NOT NULL DEFAULT '',
    strategic INTEGER NOT NULL DEFAULT 0,
    has_enhanced_sla INTEGER NOT NULL DEFAULT 0,
    has_srm INTEGER NOT NULL DEFAULT 0,
    has_tam INTEGER NOT NULL DEFAULT 0
);
"#;

const CASE_COLUMNS: &str = "id, account_number, case_number, contact_name, created_by_name, \
     created_date, customer_escalation, last_modified_by_name, last_modified_date, \
     last_public_update_by, last_public_update_date, owner, severity, summary, status, \
     case_type, uri, version";

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store file and apply the schema.
    pub fn open(path: &Utf8Path) -> Result<Self, WatchError> {
        let conn = Connection::open(path.as_std_path())?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, WatchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Full-replace upsert by primary key. Products on the case are inserted
    /// only when unsaved (`id == None`); existing rows are left untouched.
    pub fn upsert_case(&self, case: &Case) -> Result<(), WatchError> {
        tracing::debug!(id = %case.id, status = %case.status, "storing case");
        self.conn.execute(
            r#"INSERT INTO cases (id, account_number, case_number, contact_name, created_by_name,
                   created_date, customer_escalation, last_modified_by_name, last_modified_date,
                   last_public_update_by, last_public_update_date, owner, severity, summary,
                   status, case_type, uri, version)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
               ON CONFLICT(id) DO UPDATE SET
                   account_number = excluded.account_number,
                   case_number = excluded.case_number,
                   contact_name = excluded.contact_name,
                   created_by_name = excluded.created_by_name,
                   created_date = excluded.created_date,
                   customer_escalation = excluded.customer_escalation,
                   last_modified_by_name = excluded.last_modified_by_name,
                   last_modified_date = excluded.last_modified_date,
                   last_public_update_by = excluded.last_public_update_by,
                   last_public_update_date = excluded.last_public_update_date,
                   owner = excluded.owner,
                   severity = excluded.severity,
                   summary = excluded.summary,
                   status = excluded.status,
                   case_type = excluded.case_type,
                   uri = excluded.uri,
                   version = excluded.version"#,
            params![
                case.id,
                case.account_number,
                case.case_number,
                case.contact_name,
                case.created_by_name,
                encode_timestamp(case.created_date),
                case.customer_escalation,
                case.last_modified_by_name,
                encode_timestamp(case.last_modified_date),
                case.last_public_update_by,
                encode_timestamp(case.last_public_update_date),
                case.owner,
                case.severity,
                case.summary,
                case.status,
                case.case_type,
                case.uri,
                case.version,
            ],
        )?;

        for product in &case.products {
            if product.id.is_none() {
                self.conn.execute(
                    "INSERT INTO products (case_id, name) VALUES (?1, ?2)",
                    params![case.id, product.name],
                )?;
            }
        }
        Ok(())
    }

    /// Upsert each case in input order, failing fast on the first error.
    /// Earlier upserts stay committed.
    pub fn upsert_cases(&self, cases: &[Case]) -> Result<(), WatchError> {
        for case in cases {
            self.upsert_case(case)?;
        }
        Ok(())
    }

    pub fn get_all_cases(&self) -> Result<Vec<Case>, WatchError> {
        self.query_cases(&format!("SELECT {CASE_COLUMNS} FROM cases"), params![])
    }

    pub fn get_open_cases(&self) -> Result<Vec<Case>, WatchError> {
        self.query_cases(
            &format!("SELECT {CASE_COLUMNS} FROM cases WHERE status != ?1"),
            params![CLOSED_STATUS],
        )
    }

    pub fn get_closed_cases(&self) -> Result<Vec<Case>, WatchError> {
        self.query_cases(
            &format!("SELECT {CASE_COLUMNS} FROM cases WHERE status = ?1"),
            params![CLOSED_STATUS],
        )
    }

    /// Cases whose last-modified timestamp is at or after `since`. Rows with
    /// no last-modified timestamp never match.
    pub fn get_cases_active_since(&self, since: DateTime<Utc>) -> Result<Vec<Case>, WatchError> {
        self.query_cases(
            &format!(
                "SELECT {CASE_COLUMNS} FROM cases \
                 WHERE last_modified_date IS NOT NULL AND last_modified_date >= ?1"
            ),
            params![encode_timestamp(Some(since))],
        )
    }

    pub fn get_distinct_status_values(&self) -> Result<Vec<String>, WatchError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT status FROM cases ORDER BY status ASC")?;
        let values = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    /// Non-empty account numbers referenced by cases that have no matching
    /// enrichment row, deduplicated.
    pub fn get_account_numbers_missing_detail(&self) -> Result<Vec<String>, WatchError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT account_number FROM cases \
             WHERE account_number != '' \
               AND account_number NOT IN (SELECT account_number FROM accounts) \
             ORDER BY account_number ASC",
        )?;
        let values = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }

    /// Lookup used by the mapper to reuse an already-stored product row.
    pub fn find_product(&self, case_id: &str, name: &str) -> Result<Option<Product>, WatchError> {
        let product = self
            .conn
            .query_row(
                "SELECT id, case_id, name FROM products WHERE case_id = ?1 AND name = ?2",
                params![case_id, name],
                |row| {
                    Ok(Product {
                        id: row.get(0)?,
                        case_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(product)
    }

    pub fn upsert_account(&self, account: &Account) -> Result<(), WatchError> {
        self.conn.execute(
            r#"INSERT INTO accounts (account_number, name, gscsm_segment, csm_user_id,
                   csm_user_name, csm_user_sso_name, strategic, has_enhanced_sla, has_srm, has_tam)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
               ON CONFLICT(account_number) DO UPDATE SET
                   name = excluded.name,
                   gscsm_segment = excluded.gscsm_segment,
                   csm_user_id = excluded.csm_user_id,
                   csm_user_name = excluded.csm_user_name,
                   csm_user_sso_name = excluded.csm_user_sso_name,
                   strategic = excluded.strategic,
                   has_enhanced_sla = excluded.has_enhanced_sla,
                   has_srm = excluded.has_srm,
                   has_tam = excluded.has_tam"#,
            params![
                account.account_number,
                account.name,
                account.gscsm_segment,
                account.csm_user_id,
                account.csm_user_name,
                account.csm_user_sso_name,
                account.strategic,
                account.has_enhanced_sla,
                account.has_srm,
                account.has_tam,
            ],
        )?;
        Ok(())
    }

    /// Maintenance escape hatch. Runs one or more raw statements.
    pub fn execute_raw(&self, sql: &str) -> Result<(), WatchError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn query_cases(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Case>, WatchError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut cases = stmt
            .query_map(params, case_from_row)?
            .collect::<Result<Vec<Case>, _>>()?;
        for case in &mut cases {
            case.products = self.load_products(&case.id)?;
        }
        Ok(cases)
    }

    fn load_products(&self, case_id: &str) -> Result<Vec<Product>, WatchError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, case_id, name FROM products WHERE case_id = ?1 ORDER BY id")?;
        let products = stmt
            .query_map(params![case_id], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    case_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<Product>, _>>()?;
        Ok(products)
    }
}

fn case_from_row(row: &Row<'_>) -> rusqlite::Result<Case> {
    Ok(Case {
        id: row.get(0)?,
        account_number: row.get(1)?,
        case_number: row.get(2)?,
        contact_name: row.get(3)?,
        created_by_name: row.get(4)?,
        created_date: decode_timestamp(row.get(5)?),
        customer_escalation: row.get(6)?,
        last_modified_by_name: row.get(7)?,
        last_modified_date: decode_timestamp(row.get(8)?),
        last_public_update_by: row.get(9)?,
        last_public_update_date: decode_timestamp(row.get(10)?),
        owner: row.get(11)?,
        products: Vec::new(),
        severity: row.get(12)?,
        summary: row.get(13)?,
        status: row.get(14)?,
        case_type: row.get(15)?,
        uri: row.get(16)?,
        version: row.get(17)?,
    })
}

/// Uniform RFC 3339 text (`Z` suffix, whole seconds) so that SQL string
/// comparison matches chronological order.
fn encode_timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn decode_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|text| {
        DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamp_round_trip_is_sortable() {
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 1).unwrap();

        let encoded_early = encode_timestamp(Some(early)).unwrap();
        let encoded_late = encode_timestamp(Some(late)).unwrap();
        assert!(encoded_early < encoded_late);

        assert_eq!(decode_timestamp(Some(encoded_early)), Some(early));
        assert_eq!(decode_timestamp(None), None);
    }
}
