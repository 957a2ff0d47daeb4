//! Destination store backed by SQLite.
//!
//! [`ShipmentStore`] is the run session: it owns the one connection a run
//! uses, is passed by reference to the pipeline, and releases the
//! connection when closed or dropped. Every [`Appender::append`] call is its
//! own transaction; nothing spans two appends.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::{StorageError, StorageResult};
use crate::models::{ShipmentRecord, SHIPMENT_COLUMNS};

/// Appends shipment rows to a named persistent table.
pub trait Appender {
    /// Append `rows` to `table`, creating it with the shipment schema if
    /// needed. Returns the number of rows written.
    fn append(&mut self, table: &str, rows: &[ShipmentRecord]) -> StorageResult<usize>;
}

/// A session over one SQLite database file.
pub struct ShipmentStore {
    conn: Connection,
    path: String,
}

impl ShipmentStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().display().to_string();
        let conn = Connection::open(&path).map_err(|e| StorageError::Unavailable {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { conn, path })
    }

    /// Private in-memory database, for tests and dry runs.
    pub fn open_in_memory() -> StorageResult<Self> {
        let path = ":memory:".to_string();
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Unavailable {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether `table` exists in the database.
    pub fn table_exists(&self, table: &str) -> StorageResult<bool> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
            .map_err(|e| write_failed(table, e))
    }

    /// Number of rows in `table`; zero if it does not exist yet.
    pub fn count(&self, table: &str) -> StorageResult<usize> {
        check_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }

        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| write_failed(table, e))
    }

    /// All rows of `table` in insertion order.
    pub fn read_all(&self, table: &str) -> StorageResult<Vec<ShipmentRecord>> {
        check_table_name(table)?;
        if !self.table_exists(table)? {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY rowid",
            SHIPMENT_COLUMNS.join(", "),
            table
        );
        let mut stmt = self.conn.prepare(&sql).map_err(|e| write_failed(table, e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ShipmentRecord {
                    origin: row.get(0)?,
                    destination: row.get(1)?,
                    product_name: row.get(2)?,
                    quantity: row.get(3)?,
                    on_time: row.get(4)?,
                    driver_identifier: row.get(5)?,
                })
            })
            .map_err(|e| write_failed(table, e))?;

        let records = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| write_failed(table, e))?;
        Ok(records)
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> StorageResult<()> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, e)| StorageError::Unavailable { path, source: e })
    }
}

impl Appender for ShipmentStore {
    fn append(&mut self, table: &str, rows: &[ShipmentRecord]) -> StorageResult<usize> {
        check_table_name(table)?;

        let tx = self.conn.transaction().map_err(|e| write_failed(table, e))?;
        tx.execute_batch(&create_table_sql(table))
            .map_err(|e| write_failed(table, e))?;

        {
            let sql = insert_sql(table);
            let mut stmt = tx.prepare(&sql).map_err(|e| write_failed(table, e))?;
            for record in rows {
                stmt.execute(params![
                    record.origin,
                    record.destination,
                    record.product_name,
                    record.quantity,
                    record.on_time,
                    record.driver_identifier,
                ])
                .map_err(|e| write_failed(table, e))?;
            }
        }

        tx.commit().map_err(|e| write_failed(table, e))?;
        Ok(rows.len())
    }
}

/// SQL type of each entry of [`SHIPMENT_COLUMNS`].
const COLUMN_TYPES: [&str; 6] = ["TEXT", "TEXT", "TEXT", "INTEGER", "BOOLEAN", "TEXT"];

/// DDL for the destination table. Column order is fixed.
fn create_table_sql(table: &str) -> String {
    let columns: Vec<String> = SHIPMENT_COLUMNS
        .iter()
        .zip(COLUMN_TYPES)
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect();
    format!("CREATE TABLE IF NOT EXISTS \"{}\" ({});", table, columns.join(", "))
}

fn insert_sql(table: &str) -> String {
    let placeholders: Vec<String> = (1..=SHIPMENT_COLUMNS.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        SHIPMENT_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

fn check_table_name(table: &str) -> StorageResult<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidTableName(table.to_string()))
    }
}

fn write_failed(table: &str, source: rusqlite::Error) -> StorageError {
    StorageError::WriteFailed {
        table: table.to_string(),
        source,
    }
}
