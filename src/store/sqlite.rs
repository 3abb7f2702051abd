use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::model::*;

use super::schema::*;
use super::{ResourceDirectory, SlotLedger, StoreError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed directory and ledger. One file per tenant.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store file and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // journal_mode returns a row, so it can't go through execute_batch
        let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_TABLES)?;
        let version: Option<String> = conn
            .query_row(SELECT_SCHEMA_VERSION, [], |row| row.get(0))
            .optional()?;
        if version.is_none() {
            conn.execute(INSERT_SCHEMA_VERSION, params![CURRENT_SCHEMA_VERSION.to_string()])?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn schema_version(&self) -> Result<Option<i32>, StoreError> {
        let conn = self.conn.lock().await;
        let version: Option<String> = conn
            .query_row(SELECT_SCHEMA_VERSION, [], |row| row.get(0))
            .optional()?;
        Ok(version.and_then(|v| v.parse().ok()))
    }

    // ── Data entry ───────────────────────────────────────────

    /// Insert or replace a manager together with its attribute sets.
    pub async fn insert_sales_manager(&self, manager: &SalesManager) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(INSERT_SALES_MANAGER, params![manager.id, manager.name])?;
        for (table, values) in [
            (LANGUAGES_TABLE, &manager.languages),
            (PRODUCTS_TABLE, &manager.products),
            (RATINGS_TABLE, &manager.customer_ratings),
        ] {
            tx.execute(&format!("DELETE FROM {table} WHERE sales_manager_id = ?1"), params![manager.id])?;
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {table} (sales_manager_id, value) VALUES (?1, ?2)"
            ))?;
            for value in values {
                stmt.execute(params![manager.id, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a batch of slots atomically.
    pub async fn insert_slots(&self, slots: &[Slot]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_SLOT)?;
            for slot in slots {
                stmt.execute(params![
                    slot.id,
                    slot.sales_manager_id,
                    slot.span.start,
                    slot.span.end,
                    slot.booked
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns false if no slot had this id.
    pub async fn delete_slot(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().await;
        Ok(conn.execute(DELETE_SLOT, params![id])? > 0)
    }

    /// Removes the manager, its attributes and all of its slots.
    pub async fn delete_sales_manager(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(DELETE_SLOTS_OF_MANAGER, params![id])?;
        for table in [LANGUAGES_TABLE, PRODUCTS_TABLE, RATINGS_TABLE] {
            tx.execute(&format!("DELETE FROM {table} WHERE sales_manager_id = ?1"), params![id])?;
        }
        let removed = tx.execute(DELETE_SALES_MANAGER, params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // ── Reads ────────────────────────────────────────────────

    pub async fn list_sales_managers(&self) -> Result<Vec<SalesManager>, StoreError> {
        let conn = self.conn.lock().await;
        let heads = query_heads(&conn, SELECT_ALL_MANAGERS, params![])?;
        hydrate(&conn, heads)
    }

    /// Unbooked slots of the given managers starting on `date`.
    pub async fn find_available_slots(&self, date: NaiveDate, manager_ids: &[i64]) -> Result<Vec<Slot>, StoreError> {
        if manager_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().await;
        query_slots(&conn, SELECT_UNBOOKED_SLOTS_FOR_DAY, day_bounds(date), manager_ids)
    }
}

#[async_trait]
impl ResourceDirectory for SqliteStore {
    async fn find_by_criteria(
        &self,
        language: &str,
        products: &[String],
        rating: &str,
    ) -> Result<Vec<SalesManager>, StoreError> {
        let wanted = json_array(products);
        let conn = self.conn.lock().await;
        let heads = query_heads(&conn, SELECT_MANAGERS_BY_CRITERIA, params![language, rating, wanted])?;
        hydrate(&conn, heads)
    }
}

#[async_trait]
impl SlotLedger for SqliteStore {
    async fn find_all_slots(&self, date: NaiveDate, manager_ids: &[i64]) -> Result<Vec<Slot>, StoreError> {
        if manager_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().await;
        query_slots(&conn, SELECT_SLOTS_FOR_DAY, day_bounds(date), manager_ids)
    }

    async fn find_availability_from_db(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<Vec<AvailabilityEntry>, StoreError> {
        let day = request.day();
        let products = json_array(&request.products);
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(AVAILABILITY_QUERY)?;
        let rows = stmt.query_map(
            params![day.start, day.end, request.language, request.rating, products],
            |row| {
                Ok(AvailabilityEntry {
                    start_date: row.get(0)?,
                    available_count: row.get(1)?,
                })
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// ── Row helpers ──────────────────────────────────────────────

fn json_array<T: serde::Serialize>(values: &[T]) -> String {
    // Serializing strings and integers cannot fail.
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn query_heads<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<(i64, String)>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn query_slots(conn: &Connection, sql: &str, day: Span, manager_ids: &[i64]) -> Result<Vec<Slot>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params![day.start, day.end, json_array(manager_ids)], |row| {
        Ok(Slot {
            id: row.get(0)?,
            sales_manager_id: row.get(1)?,
            span: Span::new(row.get(2)?, row.get(3)?),
            booked: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Attach attribute sets to `(id, name)` rows, preserving row order.
fn hydrate(conn: &Connection, heads: Vec<(i64, String)>) -> Result<Vec<SalesManager>, StoreError> {
    if heads.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = heads.iter().map(|(id, _)| *id).collect();
    let ids_json = json_array(&ids);
    let mut languages = load_attribute(conn, LANGUAGES_TABLE, &ids_json)?;
    let mut products = load_attribute(conn, PRODUCTS_TABLE, &ids_json)?;
    let mut ratings = load_attribute(conn, RATINGS_TABLE, &ids_json)?;

    Ok(heads
        .into_iter()
        .map(|(id, name)| SalesManager {
            id,
            name,
            languages: languages.remove(&id).unwrap_or_default(),
            products: products.remove(&id).unwrap_or_default(),
            customer_ratings: ratings.remove(&id).unwrap_or_default(),
        })
        .collect())
}

fn load_attribute(conn: &Connection, table: &str, ids_json: &str) -> Result<HashMap<i64, BTreeSet<String>>, StoreError> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT sales_manager_id, value FROM {table} WHERE sales_manager_id IN (SELECT value FROM json_each(?1))"
    ))?;
    let rows = stmt.query_map(params![ids_json], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
    let mut out: HashMap<i64, BTreeSet<String>> = HashMap::new();
    for row in rows {
        let (id, value) = row?;
        out.entry(id).or_default().insert(value);
    }
    Ok(out)
}
