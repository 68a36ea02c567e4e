//! SQLite table backend.
//!
//! Emulates the wide table with one SQLite table keyed by `(pk, sk)`. Item
//! bodies are stored as JSON text. Keys compare with SQLite's `BINARY`
//! collation, which orders them the same way as the in-memory table.
//!
//! # Example
//!
//! ```ignore
//! use vellum_tables::SqliteTable;
//!
//! let table = SqliteTable::new("/var/lib/vellum/vellum.db", "vellum")?;
//! ```

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use vellum_core::error::{VellumError, VellumResult};
use vellum_core::traits::{ScanPage, ScanRequest, TableBackend, TableItem};
use vellum_core::types::{FieldMap, ItemKey};

/// Wide table stored in a single SQLite database file.
pub struct SqliteTable {
    /// SQLite connection (wrapped in Mutex for Send + Sync).
    conn: Mutex<Connection>,
    /// Name of the SQLite table holding the items.
    table_name: String,
}

impl SqliteTable {
    /// Open (or create) the database at `path`.
    pub fn new(path: impl AsRef<Path>, table_name: &str) -> VellumResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            VellumError::connection(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::with_connection(conn, table_name)
    }

    /// Create an in-memory table (for testing).
    pub fn in_memory(table_name: &str) -> VellumResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, table_name)
    }

    fn with_connection(conn: Connection, table_name: &str) -> VellumResult<Self> {
        validate_table_name(table_name)?;
        let table = Self {
            conn: Mutex::new(conn),
            table_name: table_name.to_string(),
        };
        table.init_schema()?;
        tracing::debug!(table = table_name, "opened sqlite table");
        Ok(table)
    }

    fn init_schema(&self) -> VellumResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                pk TEXT NOT NULL,
                sk TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (pk, sk)
            ) WITHOUT ROWID;
            "#,
            table = self.table_name
        ))?;
        Ok(())
    }

    fn conn(&self) -> VellumResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VellumError::storage(format!("SQLite connection lock poisoned: {}", e)))
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(name: &str) -> VellumResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(VellumError::Configuration(format!(
            "Invalid table name '{}': use letters, digits, '_' or '-'",
            name
        )))
    }
}

fn decode_row(pk: String, sk: String, body: &str) -> VellumResult<TableItem> {
    let body: FieldMap = serde_json::from_str(body)
        .map_err(|e| VellumError::parse(format!("Item {}/{} has a corrupt body: {}", pk, sk, e)))?;
    Ok(TableItem::new(ItemKey::new(pk, sk), body))
}

#[async_trait]
impl TableBackend for SqliteTable {
    async fn put_item(&self, item: TableItem) -> VellumResult<()> {
        let body = serde_json::to_string(&item.body)?;
        let conn = self.conn()?;
        conn.execute(
            &format!(
                r#"INSERT OR REPLACE INTO "{}" (pk, sk, body) VALUES (?1, ?2, ?3)"#,
                self.table_name
            ),
            params![item.key.pk, item.key.sk, body],
        )?;
        Ok(())
    }

    async fn get_item(&self, key: &ItemKey) -> VellumResult<Option<TableItem>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                &format!(
                    r#"SELECT body FROM "{}" WHERE pk = ?1 AND sk = ?2"#,
                    self.table_name
                ),
                params![key.pk, key.sk],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| decode_row(key.pk.clone(), key.sk.clone(), &body))
            .transpose()
    }

    async fn delete_item(&self, key: &ItemKey) -> VellumResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(r#"DELETE FROM "{}" WHERE pk = ?1 AND sk = ?2"#, self.table_name),
            params![key.pk, key.sk],
        )?;
        Ok(())
    }

    async fn query_partition(&self, pk: &str) -> VellumResult<Vec<TableItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"SELECT pk, sk, body FROM "{}" WHERE pk = ?1 ORDER BY sk"#,
            self.table_name
        ))?;
        let rows = stmt.query_map(params![pk], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (pk, sk, body) = row?;
            items.push(decode_row(pk, sk, &body)?);
        }
        Ok(items)
    }

    async fn scan(&self, request: ScanRequest) -> VellumResult<ScanPage> {
        let mut clauses = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(start) = &request.exclusive_start {
            clauses.push("(pk > ? OR (pk = ? AND sk > ?))");
            args.push(SqlValue::Text(start.pk.clone()));
            args.push(SqlValue::Text(start.pk.clone()));
            args.push(SqlValue::Text(start.sk.clone()));
        }
        if let Some(prefix) = &request.pk_prefix {
            clauses.push("substr(pk, 1, ?) = ?");
            args.push(SqlValue::Integer(prefix.chars().count() as i64));
            args.push(SqlValue::Text(prefix.clone()));
        }
        if let Some(sk) = &request.sort_key {
            clauses.push("sk = ?");
            args.push(SqlValue::Text(sk.clone()));
        }

        let mut sql = format!(r#"SELECT pk, sk, body FROM "{}""#, self.table_name);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY pk, sk");
        // One extra row tells whether another page exists.
        if let Some(limit) = request.limit {
            sql.push_str(" LIMIT ?");
            args.push(SqlValue::Integer(limit.saturating_add(1).min(i64::MAX as usize) as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut page = ScanPage::default();
        let mut has_more = false;
        for row in rows {
            let (pk, sk, body) = row?;
            if request.limit.is_some_and(|limit| page.items.len() >= limit) {
                has_more = true;
                break;
            }
            page.items.push(decode_row(pk, sk, &body)?);
        }

        if has_more {
            page.last_evaluated = page.items.last().map(|item| item.key.clone());
        }
        Ok(page)
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }
}
