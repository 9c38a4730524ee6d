//! Reads and writes against the lookup table.
//!
//! The LUT is a derived index of `(container_id, wrapper_id, leaf_id)` triples; it is
//! never the system of record and rows are never updated in place.

use crate::error::Result;
use crate::schema::check_identifier;
use lineage_commons::{EntityId, LutColumn, LutRow};
use rusqlite::{params, Connection, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutStore {
    table: String,
}

impl LutStore {
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        check_identifier(&table)?;
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn columns() -> String {
        format!(
            "{}, {}, {}",
            LutColumn::ContainerId,
            LutColumn::WrapperId,
            LutColumn::LeafId
        )
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<LutRow> {
        Ok(LutRow::new(row.get(0)?, row.get(1)?, row.get(2)?))
    }

    pub fn insert(&self, conn: &Connection, row: &LutRow) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?1, ?2, ?3)",
            self.table,
            Self::columns()
        );
        conn.execute(
            &sql,
            params![
                row.container_id.as_i64(),
                row.wrapper_id.as_i64(),
                row.leaf_id.map(|id| id.as_i64())
            ],
        )?;
        Ok(())
    }

    /// Remove every row whose `column` equals `id`. Returns the number of rows removed.
    pub fn delete_by(&self, conn: &Connection, column: LutColumn, id: EntityId) -> Result<usize> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", self.table, column);
        Ok(conn.execute(&sql, params![id.as_i64()])?)
    }

    /// Remove every row. Runs inside the caller's transaction, so a failed rebuild
    /// restores the old contents.
    pub fn truncate(&self, conn: &Connection) -> Result<usize> {
        let sql = format!("DELETE FROM {}", self.table);
        Ok(conn.execute(&sql, [])?)
    }

    pub fn count(&self, conn: &Connection) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// All rows, ordered by container, wrapper, then leaf (sentinels first).
    pub fn rows(&self, conn: &Connection) -> Result<Vec<LutRow>> {
        let sql = format!(
            "SELECT {cols} FROM {table} ORDER BY {cols}",
            cols = Self::columns(),
            table = self.table
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Rows whose `column` equals `id`.
    pub fn rows_where(&self, conn: &Connection, column: LutColumn, id: EntityId) -> Result<Vec<LutRow>> {
        let sql = format!(
            "SELECT {cols} FROM {table} WHERE {column} = ?1 ORDER BY {cols}",
            cols = Self::columns(),
            table = self.table,
            column = column
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![id.as_i64()], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Distinct non-null values of `select` on rows where `filter` equals `id`.
    ///
    /// This is the upward walk: `related_ids(WrapperId, LeafId, f)` yields the wrappers
    /// referencing leaf `f`.
    pub fn related_ids(
        &self,
        conn: &Connection,
        select: LutColumn,
        filter: LutColumn,
        id: EntityId,
    ) -> Result<Vec<EntityId>> {
        let sql = format!(
            "SELECT DISTINCT {select} FROM {table} WHERE {filter} = ?1 AND {select} IS NOT NULL ORDER BY {select}",
            select = select,
            table = self.table,
            filter = filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![id.as_i64()], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(EntityId::new))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}
