//! LUT generation
//!
//! Derives `(container, wrapper, leaf)` rows from the live entity graph with a single
//! `INSERT ... SELECT`. The statement is assembled from the configured storage schema
//! and the leaf-bearing wrapper fields, which are discovered once per generator.

use crate::error::Result;
use lineage_commons::{EntityId, LutColumn};
use lineage_configs::{BundleSettings, KindSchema, LineageConfig, SchemaSettings};
use lineage_store::{Database, LutStore};
use once_cell::sync::OnceCell;
use rusqlite::{params, Connection};
use std::sync::Arc;

const CONTAINER_ALIAS: &str = "c";
const CONTAINER_REF_ALIAS: &str = "cref";
const WRAPPER_ALIAS: &str = "w";
const LEAF_ALIAS: &str = "l";

/// Rebuilds and extends the lookup table.
pub struct LutGenerator {
    db: Arc<Database>,
    lut: LutStore,
    schema: SchemaSettings,
    bundles: Vec<BundleSettings>,
    leaf_fields: OnceCell<Vec<String>>,
}

impl LutGenerator {
    pub fn new(db: Arc<Database>, config: &LineageConfig) -> Result<Self> {
        Ok(Self {
            db,
            lut: LutStore::new(config.lut.table_name.clone())?,
            schema: config.schema.clone(),
            bundles: config.bundles.clone(),
            leaf_fields: OnceCell::new(),
        })
    }

    pub fn lut(&self) -> &LutStore {
        &self.lut
    }

    /// Wrapper fields referencing leaves, discovered from the bundle catalog on first use.
    ///
    /// A field qualifies when some bundle uses it as its source and its target handler
    /// is the configured leaf handler. Duplicates are dropped, first occurrence wins.
    pub fn leaf_fields(&self) -> &[String] {
        self.leaf_fields.get_or_init(|| {
            let mut fields: Vec<String> = Vec::new();
            for bundle in &self.bundles {
                let is_leaf_bearing =
                    bundle.target_handler.as_deref() == Some(self.schema.leaf_handler.as_str());
                if is_leaf_bearing && !fields.contains(&bundle.source_field) {
                    fields.push(bundle.source_field.clone());
                }
            }
            log::debug!("Discovered {} leaf-bearing wrapper field(s): {:?}", fields.len(), fields);
            fields
        })
    }

    /// Insert rows for one wrapper, or for the whole graph when `wrapper` is `None`.
    ///
    /// Runs in its own transaction. Not idempotent: the caller removes the scope's
    /// previous rows first.
    pub fn generate(&self, wrapper: Option<EntityId>) -> Result<usize> {
        self.db.transaction(|tx| self.generate_with(tx, wrapper))
    }

    /// [`LutGenerator::generate`] on a connection the caller already holds, typically
    /// an open transaction.
    pub fn generate_with(&self, conn: &Connection, wrapper: Option<EntityId>) -> Result<usize> {
        let Some(sql) = self.generation_sql(wrapper.is_some()) else {
            log::debug!("No leaf-bearing wrapper fields configured; nothing to generate");
            return Ok(0);
        };

        let inserted = match wrapper {
            Some(id) => conn.execute(&sql, params![id.as_i64()])?,
            None => conn.execute(&sql, [])?,
        };

        match wrapper {
            Some(id) => log::debug!("Generated {} LUT row(s) for wrapper {}", inserted, id),
            None => log::debug!("Generated {} LUT row(s)", inserted),
        }
        Ok(inserted)
    }

    /// Truncate and rebuild the whole table in one transaction.
    ///
    /// A failure rolls back the truncation too, so the previous contents survive.
    /// Readers on other connections may still observe the table mid-rebuild.
    pub fn regenerate(&self) -> Result<usize> {
        let inserted = self.db.transaction(|tx| -> Result<usize> {
            let removed = self.lut.truncate(tx)?;
            log::debug!("Removed {} LUT row(s) before regeneration", removed);
            self.generate_with(tx, None)
        })?;
        log::info!("Regenerated lookup table with {} row(s)", inserted);
        Ok(inserted)
    }

    /// The generation statement, or `None` when no leaf-bearing field exists.
    ///
    /// A scoped statement takes the wrapper id as `?1`.
    fn generation_sql(&self, scoped: bool) -> Option<String> {
        let fields = self.leaf_fields();
        if fields.is_empty() {
            return None;
        }

        let container = &self.schema.container;
        let wrapper = &self.schema.wrapper;
        let leaf = &self.schema.leaf;
        let reference = &self.schema.container_reference_field;

        let mut joins = Vec::with_capacity(fields.len());
        let mut leaf_matches = Vec::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            let alias = format!("lf{}", index);
            joins.push(format!(
                "LEFT JOIN {table} {alias} ON {alias}.entity_id = {w}.{wid}",
                table = wrapper.field_table(field),
                alias = alias,
                w = WRAPPER_ALIAS,
                wid = wrapper.id_column
            ));
            leaf_matches.push(format!(
                "{l}.{lid} = {alias}.{target}",
                l = LEAF_ALIAS,
                lid = leaf.id_column,
                alias = alias,
                target = KindSchema::field_target_column(field)
            ));
        }

        let scope = if scoped {
            format!(" WHERE {}.{} = ?1", WRAPPER_ALIAS, wrapper.id_column)
        } else {
            String::new()
        };

        Some(format!(
            "WITH candidates AS (\
             SELECT {c}.{cid} AS {container_col}, {w}.{wid} AS {wrapper_col}, {l}.{lid} AS {leaf_col} \
             FROM {container_table} {c} \
             INNER JOIN {ref_table} {cref} ON {cref}.{ref_target} = {c}.{cid} \
             INNER JOIN {wrapper_table} {w} ON {w}.{wid} = {cref}.entity_id \
             {joins} \
             LEFT JOIN {leaf_table} {l} ON {leaf_matches}{scope}) \
             INSERT INTO {lut} ({container_col}, {wrapper_col}, {leaf_col}) \
             SELECT DISTINCT cand.{container_col}, cand.{wrapper_col}, cand.{leaf_col} FROM candidates cand \
             WHERE cand.{leaf_col} IS NOT NULL OR NOT EXISTS (\
             SELECT 1 FROM candidates resolved \
             WHERE resolved.{container_col} = cand.{container_col} \
             AND resolved.{wrapper_col} = cand.{wrapper_col} \
             AND resolved.{leaf_col} IS NOT NULL)",
            c = CONTAINER_ALIAS,
            cid = container.id_column,
            w = WRAPPER_ALIAS,
            wid = wrapper.id_column,
            l = LEAF_ALIAS,
            lid = leaf.id_column,
            cref = CONTAINER_REF_ALIAS,
            container_col = LutColumn::ContainerId,
            wrapper_col = LutColumn::WrapperId,
            leaf_col = LutColumn::LeafId,
            container_table = container.base_table,
            ref_table = wrapper.field_table(reference),
            ref_target = KindSchema::field_target_column(reference),
            wrapper_table = wrapper.base_table,
            joins = joins.join(" "),
            leaf_table = leaf.base_table,
            leaf_matches = leaf_matches.join(" OR "),
            scope = scope,
            lut = self.lut.table(),
        ))
    }
}
