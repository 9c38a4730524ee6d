//! Listing-query tagging
//!
//! Rewrites a wrapper or leaf listing query so that every returned row is either
//! outside the lookup table entirely or reachable from an ancestor the per-kind
//! alterers let through. The injected conjunct is
//!
//! ```sql
//! (NOT EXISTS (SELECT 1 FROM lut lut_null WHERE lut_null.<col> IN (<targets>))
//!  OR EXISTS (SELECT 1 FROM lut lut_exist
//!             WHERE lut_exist.<col> IN (<targets>)
//!               AND EXISTS (<parent probe>) ...))
//! ```
//!
//! where `<targets>` are the id columns of every table of the tagged kind in `FROM`.
//! Later calls with the same [`TaggingContext`] reuse the pair: they extend the `IN`
//! filters and fold in the ancestor probes of kinds not tagged before.

use super::hooks::{QueryAlterer, TaggingDispatcher};
use super::query::{ListingQuery, TaggingContext};
use super::sql;
use crate::error::{LineageError, Result};
use lineage_commons::{AccountId, EntityKind, LutColumn};
use lineage_configs::{KindSchema, LineageConfig, LutSettings, SchemaSettings};
use sqlparser::ast::{BinaryOperator, Expr, Ident, Query, Select, TableAlias, TableFactor};
use std::sync::Arc;

/// Key column of a satellite field table.
const FIELD_TABLE_KEY: &str = "entity_id";

pub struct QueryTagger {
    schema: SchemaSettings,
    lut: LutSettings,
    alterer: Arc<dyn QueryAlterer>,
    dispatcher: Arc<TaggingDispatcher>,
}

impl QueryTagger {
    pub fn new(
        config: &LineageConfig,
        alterer: Arc<dyn QueryAlterer>,
        dispatcher: Arc<TaggingDispatcher>,
    ) -> Self {
        Self {
            schema: config.schema.clone(),
            lut: config.lut.clone(),
            alterer,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<TaggingDispatcher> {
        &self.dispatcher
    }

    /// Tag `query` using the kind recorded on it.
    pub fn tag_listing(&self, query: &mut ListingQuery, ctx: &mut TaggingContext) -> Result<()> {
        let kind = query.kind().ok_or_else(|| {
            LineageError::InvalidArgument("listing query carries no entity kind".to_string())
        })?;
        self.tag(query, ctx, kind)
    }

    /// Parse, tag and render in one call. `kind` accepts the names understood by
    /// [`EntityKind`]'s `FromStr` (`media`, `file`, ...).
    pub fn tag_sql(&self, sql: &str, kind: &str, account: &AccountId) -> Result<String> {
        let kind: EntityKind = kind.parse()?;
        let mut query = ListingQuery::parse(sql)?
            .with_kind(kind)
            .with_account(account.clone());
        let mut ctx = TaggingContext::new();
        self.tag(&mut query, &mut ctx, kind)?;
        Ok(query.to_sql())
    }

    /// Constrain `query`, which lists entities of `kind`, to rows reachable from an
    /// accessible ancestor.
    pub fn tag(&self, query: &mut ListingQuery, ctx: &mut TaggingContext, kind: EntityKind) -> Result<()> {
        if !kind.is_taggable() {
            return Err(LineageError::InvalidArgument(format!(
                "Unrecognized type '{}'.",
                kind
            )));
        }
        if query.is_subquery() {
            log::trace!("Skipping internal {} subquery", kind);
            return Ok(());
        }

        let schema = self.schema.kind(kind);
        let targets = {
            let select = query.select_mut()?;
            sql::normalize_conjunction(&mut select.selection);
            discover_targets(select, schema, ctx)
        };
        if targets.is_empty() {
            log::trace!("No new {} tables to tag", kind);
            return Ok(());
        }

        let column = kind.lut_column();
        let null_filter = in_list(&self.lut.null_alias, column, &targets);
        let exist_filter = in_list(&self.lut.existence_alias, column, &targets);
        let constraints = self.ancestor_constraints(kind, query.account(), ctx)?;

        if ctx.probes_installed() {
            let selection = query.select_mut()?.selection.as_mut();
            let Some((null_probe, existence_probe)) = selection.and_then(|expr| self.probe_pair_mut(expr)) else {
                return Err(LineageError::InvalidArgument(
                    "tagging context does not belong to this query: probe pair not found".to_string(),
                ));
            };
            if let Some(select) = sql::select_of_mut(null_probe) {
                sql::disjoin(&mut select.selection, null_filter);
            }
            let select = existence_select(existence_probe)?;
            sql::conjoin(&mut select.selection, exist_filter);
            for constraint in constraints {
                sql::conjoin(&mut select.selection, constraint);
            }
            log::debug!("Extended {} probe filters with {} target(s)", kind, targets.len());
        } else {
            let null_probe = self.lut_probe(&self.lut.null_alias, null_filter)?;
            let mut existence_probe = self.lut_probe(&self.lut.existence_alias, exist_filter)?;
            let select = existence_select(&mut existence_probe)?;
            for constraint in constraints {
                sql::conjoin(&mut select.selection, constraint);
            }

            let pair = Expr::Nested(Box::new(sql::binary(
                Expr::Exists {
                    subquery: Box::new(null_probe),
                    negated: true,
                },
                BinaryOperator::Or,
                Expr::Exists {
                    subquery: Box::new(existence_probe),
                    negated: false,
                },
            )));
            query.add_condition(pair)?;
            ctx.mark_probes_installed();
            log::debug!("Tagged {} listing query with {} target(s)", kind, targets.len());
        }

        // Listeners see the query with its probes attached.
        for level in std::iter::once(kind).chain(kind.ancestors()) {
            if ctx.mark_visited(level) {
                self.dispatcher.dispatch(level, query);
            }
        }
        Ok(())
    }

    /// `EXISTS` probes for the ancestors of `kind` not yet offered to the alterer.
    /// Probes the alterer left unconstrained are dropped.
    fn ancestor_constraints(
        &self,
        kind: EntityKind,
        account: &AccountId,
        ctx: &mut TaggingContext,
    ) -> Result<Vec<Expr>> {
        let mut constraints = Vec::new();
        for parent in kind.ancestors() {
            if !ctx.mark_ancestor_checked(parent) {
                continue;
            }
            let mut probe = self.ancestor_probe(parent, account.clone())?;
            if self.alterer.alter(parent, &mut probe)? {
                constraints.push(Expr::Exists {
                    subquery: Box::new(probe.into_query()),
                    negated: false,
                });
                log::trace!("Folded {} access constraints into existence probe", parent);
            } else {
                log::trace!("No {} access constraints; probe dropped", parent);
            }
        }
        Ok(constraints)
    }

    /// `SELECT 1 FROM <lut> <alias> WHERE <filter>`
    fn lut_probe(&self, alias: &str, filter: Expr) -> Result<Query> {
        let mut probe = sql::parse_query(&format!(
            "SELECT 1 FROM {} AS {}",
            self.lut.table_name, alias
        ))?;
        if let Some(select) = sql::select_of_mut(&mut probe) {
            select.selection = Some(filter);
        }
        Ok(probe)
    }

    /// Probe selecting `parent`'s base table, correlated to the existence probe's row.
    fn ancestor_probe(&self, parent: EntityKind, account: AccountId) -> Result<ListingQuery> {
        let schema = self.schema.kind(parent);
        let alias = format!("base_{}", schema.base_table);
        let query = sql::parse_query(&format!(
            "SELECT 1 AS {kind}_existence FROM {table} AS {alias} WHERE {exist}.{column} = {alias}.{id}",
            kind = parent,
            table = schema.base_table,
            alias = alias,
            exist = self.lut.existence_alias,
            column = parent.lut_column(),
            id = schema.id_column
        ))?;
        Ok(ListingQuery::probe(parent, &alias, query, account))
    }

    /// The installed `(null probe, existence probe)` pair within the top-level
    /// conjunction of `expr`.
    fn probe_pair_mut<'a>(&self, expr: &'a mut Expr) -> Option<(&'a mut Query, &'a mut Query)> {
        if self.is_probe_pair(expr) {
            let Expr::Nested(inner) = expr else {
                return None;
            };
            let Expr::BinaryOp { left, right, .. } = inner.as_mut() else {
                return None;
            };
            let (
                Expr::Exists {
                    subquery: null_probe, ..
                },
                Expr::Exists {
                    subquery: existence_probe,
                    ..
                },
            ) = (left.as_mut(), right.as_mut())
            else {
                return None;
            };
            return Some((null_probe.as_mut(), existence_probe.as_mut()));
        }

        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                if self.contains_probe_pair(left) {
                    self.probe_pair_mut(left)
                } else {
                    self.probe_pair_mut(right)
                }
            },
            _ => None,
        }
    }

    fn contains_probe_pair(&self, expr: &Expr) -> bool {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => self.contains_probe_pair(left) || self.contains_probe_pair(right),
            other => self.is_probe_pair(other),
        }
    }

    /// `(NOT EXISTS (... lut_null ...) OR EXISTS (... lut_exist ...))`
    fn is_probe_pair(&self, expr: &Expr) -> bool {
        let Expr::Nested(inner) = expr else {
            return false;
        };
        let Expr::BinaryOp {
            left,
            op: BinaryOperator::Or,
            right,
        } = inner.as_ref()
        else {
            return false;
        };
        match (left.as_ref(), right.as_ref()) {
            (
                Expr::Exists {
                    subquery: null_probe,
                    negated: true,
                },
                Expr::Exists {
                    subquery: existence_probe,
                    negated: false,
                },
            ) => {
                probe_alias(null_probe).as_deref() == Some(self.lut.null_alias.as_str())
                    && probe_alias(existence_probe).as_deref() == Some(self.lut.existence_alias.as_str())
            },
            _ => false,
        }
    }
}

fn existence_select(probe: &mut Query) -> Result<&mut Select> {
    sql::select_of_mut(probe)
        .ok_or_else(|| LineageError::UnsupportedQuery("existence probe is not a SELECT".to_string()))
}

/// Record every not-yet-tagged table of `schema` in `FROM` and return its id column.
fn discover_targets(select: &Select, schema: &KindSchema, ctx: &mut TaggingContext) -> Vec<Expr> {
    let mut targets = Vec::new();
    for table in &select.from {
        collect_targets(&table.relation, schema, ctx, &mut targets);
        for join in &table.joins {
            collect_targets(&join.relation, schema, ctx, &mut targets);
        }
    }
    targets
}

fn collect_targets(relation: &TableFactor, schema: &KindSchema, ctx: &mut TaggingContext, targets: &mut Vec<Expr>) {
    match relation {
        TableFactor::Table { name, alias, .. } => {
            let parts = sql::name_parts(name);
            let Some(table) = parts.last() else {
                return;
            };
            if !schema.owns_table(&table.value) {
                return;
            }

            let key = if schema.is_field_table(&table.value) {
                FIELD_TABLE_KEY
            } else {
                schema.id_column.as_str()
            };
            let alias_ident = table_alias(alias.as_ref(), table);
            if ctx.mark_tagged(&alias_ident.value) {
                targets.push(sql::column_ref(alias_ident, key));
            }
        },
        TableFactor::NestedJoin { table_with_joins, .. } => {
            collect_targets(&table_with_joins.relation, schema, ctx, targets);
            for join in &table_with_joins.joins {
                collect_targets(&join.relation, schema, ctx, targets);
            }
        },
        // Derived tables and table functions have their own scope.
        _ => {},
    }
}

fn table_alias(alias: Option<&TableAlias>, table: &Ident) -> Ident {
    alias.map(|alias| alias.name.clone()).unwrap_or_else(|| table.clone())
}

/// Alias of a probe's single `FROM` relation.
fn probe_alias(query: &Query) -> Option<String> {
    let select = sql::select_of(query)?;
    match &select.from.first()?.relation {
        TableFactor::Table { alias: Some(alias), .. } => Some(alias.name.value.clone()),
        _ => None,
    }
}

/// `<lut_alias>.<column> IN (<targets>)`
fn in_list(lut_alias: &str, column: LutColumn, targets: &[Expr]) -> Expr {
    Expr::InList {
        expr: Box::new(sql::column_ref(Ident::new(lut_alias), column.as_str())),
        list: targets.to_vec(),
        negated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::hooks::NoopAlterer;
    use parking_lot::Mutex;

    fn tagger_with(alterer: Arc<dyn QueryAlterer>) -> QueryTagger {
        QueryTagger::new(&LineageConfig::default(), alterer, Arc::new(TaggingDispatcher::new()))
    }

    fn container_alterer() -> Arc<dyn QueryAlterer> {
        Arc::new(|kind: EntityKind, probe: &mut ListingQuery| -> Result<bool> {
            if kind != EntityKind::Container {
                return Ok(false);
            }
            let alias = probe.base_alias().unwrap_or("base_node").to_string();
            probe.add_condition_sql(&format!("{}.status = 1", alias))?;
            Ok(true)
        })
    }

    #[test]
    fn test_tag_leaf_listing() {
        let tagger = tagger_with(container_alterer());
        let sql = tagger
            .tag_sql("SELECT f.fid FROM file_managed f", "file", &AccountId::anonymous())
            .unwrap();

        assert!(sql.contains("NOT EXISTS (SELECT 1 FROM hierarchical_access_lut AS lut_null WHERE lut_null.leaf_id IN (f.fid))"));
        assert!(sql.contains("lut_exist.leaf_id IN (f.fid)"));
        assert!(sql.contains("lut_exist.container_id = base_node.nid"));
        assert!(sql.contains("base_node.status = 1"));
        // The wrapper level asserted nothing, so its probe is dropped.
        assert!(!sql.contains("base_media"));
    }

    #[test]
    fn test_tag_wrapper_listing_uses_field_table_key() {
        let tagger = tagger_with(Arc::new(NoopAlterer));
        let sql = tagger
            .tag_sql(
                "SELECT m.mid FROM media m JOIN media__field_media_of mo ON mo.entity_id = m.mid",
                "media",
                &AccountId::anonymous(),
            )
            .unwrap();

        assert!(sql.contains("lut_null.wrapper_id IN (m.mid, mo.entity_id)"));
        assert!(sql.contains("lut_exist.wrapper_id IN (m.mid, mo.entity_id)"));
        assert!(!sql.contains("base_node"));
    }

    #[test]
    fn test_disjunctive_where_is_preserved() {
        let tagger = tagger_with(Arc::new(NoopAlterer));
        let sql = tagger
            .tag_sql(
                "SELECT m.mid FROM media m WHERE m.status = 1 OR m.uid = 7",
                "wrapper",
                &AccountId::anonymous(),
            )
            .unwrap();
        assert!(sql.contains("WHERE (m.status = 1 OR m.uid = 7) AND (NOT EXISTS"));
    }

    #[test]
    fn test_tagging_twice_is_idempotent() {
        let tagger = tagger_with(container_alterer());
        let mut query = ListingQuery::parse("SELECT f.fid FROM file_managed f")
            .unwrap()
            .with_kind(EntityKind::Leaf);
        let mut ctx = TaggingContext::new();

        tagger.tag_listing(&mut query, &mut ctx).unwrap();
        let once = query.to_sql();
        tagger.tag_listing(&mut query, &mut ctx).unwrap();

        assert_eq!(query.to_sql(), once);
        assert_eq!(once.matches("lut_exist.container_id = base_node.nid").count(), 1);
    }

    #[test]
    fn test_new_alias_extends_existing_probes() {
        let tagger = tagger_with(container_alterer());
        let mut query = ListingQuery::parse("SELECT f.fid FROM file_managed f").unwrap();
        let mut ctx = TaggingContext::new();
        tagger.tag(&mut query, &mut ctx, EntityKind::Leaf).unwrap();

        // The caller joins another leaf table after the first pass.
        let joined = sql::parse_query(
            "SELECT 1 FROM file_managed f LEFT JOIN file__field_alt alt ON alt.entity_id = f.fid",
        )
        .unwrap();
        let join = sql::select_of(&joined).unwrap().from[0].joins[0].clone();
        query.select_mut().unwrap().from[0].joins.push(join);
        tagger.tag(&mut query, &mut ctx, EntityKind::Leaf).unwrap();

        let sql = query.to_sql();
        assert!(sql.contains("lut_null.leaf_id IN (f.fid) OR lut_null.leaf_id IN (alt.entity_id)"));
        assert!(sql.contains("lut_exist.leaf_id IN (alt.entity_id)"));
        assert_eq!(sql.matches("NOT EXISTS").count(), 1);
        assert_eq!(sql.matches("base_node.status = 1").count(), 1);
        assert_eq!(ctx.tagged_aliases(), &["f".to_string(), "alt".to_string()]);
    }

    #[test]
    fn test_second_kind_folds_its_ancestors() {
        let alterer = |_kind: EntityKind, probe: &mut ListingQuery| -> Result<bool> {
            let alias = probe.base_alias().unwrap_or_default().to_string();
            probe.add_condition_sql(&format!("{}.status = 1", alias))?;
            Ok(true)
        };
        let tagger = tagger_with(Arc::new(alterer));
        let mut query = ListingQuery::parse(
            "SELECT f.fid FROM file_managed f \
             JOIN media__field_media_file mf ON mf.field_media_file_target_id = f.fid \
             JOIN media m ON m.mid = mf.entity_id",
        )
        .unwrap();
        let mut ctx = TaggingContext::new();

        tagger.tag(&mut query, &mut ctx, EntityKind::Wrapper).unwrap();
        assert!(!query.to_sql().contains("base_media"));
        tagger.tag(&mut query, &mut ctx, EntityKind::Leaf).unwrap();

        let sql = query.to_sql();
        assert_eq!(sql.matches("NOT EXISTS").count(), 1);
        assert!(sql.contains("lut_exist.leaf_id IN (f.fid)"));
        assert_eq!(sql.matches("lut_exist.wrapper_id = base_media.mid").count(), 1);
        assert_eq!(sql.matches("lut_exist.container_id = base_node.nid").count(), 1);
        assert_eq!(
            ctx.visited_levels(),
            &[EntityKind::Wrapper, EntityKind::Container, EntityKind::Leaf]
        );
    }

    #[test]
    fn test_foreign_context_is_rejected() {
        let tagger = tagger_with(Arc::new(NoopAlterer));
        let mut tagged = ListingQuery::parse("SELECT f.fid FROM file_managed f").unwrap();
        let mut ctx = TaggingContext::new();
        tagger.tag(&mut tagged, &mut ctx, EntityKind::Leaf).unwrap();

        let mut other = ListingQuery::parse("SELECT m.mid FROM media m").unwrap();
        let err = tagger.tag(&mut other, &mut ctx, EntityKind::Wrapper).unwrap_err();
        assert!(matches!(err, LineageError::InvalidArgument(_)));
    }

    #[test]
    fn test_subquery_is_skipped() {
        let tagger = tagger_with(Arc::new(NoopAlterer));
        let mut query = ListingQuery::parse("SELECT m.mid FROM media m").unwrap();
        query.mark_subquery();
        let before = query.to_sql();
        tagger
            .tag(&mut query, &mut TaggingContext::new(), EntityKind::Wrapper)
            .unwrap();
        assert_eq!(query.to_sql(), before);
    }

    #[test]
    fn test_unrelated_tables_untouched() {
        let tagger = tagger_with(Arc::new(NoopAlterer));
        let sql = tagger
            .tag_sql("SELECT n.nid FROM node n", "media", &AccountId::anonymous())
            .unwrap();
        assert!(!sql.contains("lut_null"));
    }

    #[test]
    fn test_derived_tables_skipped() {
        let tagger = tagger_with(Arc::new(NoopAlterer));
        let sql = tagger
            .tag_sql("SELECT d.mid FROM (SELECT mid FROM media) d", "media", &AccountId::anonymous())
            .unwrap();
        assert!(!sql.contains("lut_null"));
    }

    #[test]
    fn test_invalid_kinds_rejected() {
        let tagger = tagger_with(Arc::new(NoopAlterer));
        let account = AccountId::anonymous();

        let err = tagger.tag_sql("SELECT n.nid FROM node n", "node", &account).unwrap_err();
        assert!(matches!(err, LineageError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "Invalid argument: Unrecognized type 'container'.");

        let err = tagger.tag_sql("SELECT 1", "taxonomy_term", &account).unwrap_err();
        assert!(matches!(err, LineageError::KindParse(_)));
        assert!(err.is_invalid_input());
        assert_eq!(err.to_string(), "Unrecognized type 'taxonomy_term'.");

        let mut untyped = ListingQuery::parse("SELECT m.mid FROM media m").unwrap();
        let err = tagger.tag_listing(&mut untyped, &mut TaggingContext::new()).unwrap_err();
        assert!(matches!(err, LineageError::InvalidArgument(_)));
    }

    #[test]
    fn test_listeners_notified_per_level() {
        let dispatcher = Arc::new(TaggingDispatcher::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        dispatcher.register(Arc::new(move |kind: EntityKind, _query: &mut ListingQuery| {
            recorder.lock().push(kind);
        }));
        let tagger = QueryTagger::new(&LineageConfig::default(), Arc::new(NoopAlterer), dispatcher);

        tagger
            .tag_sql("SELECT f.fid FROM file_managed f", "leaf", &AccountId::anonymous())
            .unwrap();
        assert_eq!(
            *seen.lock(),
            vec![EntityKind::Leaf, EntityKind::Wrapper, EntityKind::Container]
        );
    }

    #[test]
    fn test_listeners_see_attached_probes() {
        let dispatcher = Arc::new(TaggingDispatcher::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        dispatcher.register(Arc::new(move |kind: EntityKind, query: &mut ListingQuery| {
            recorder.lock().push((kind, query.to_sql().contains("lut_exist")));
        }));
        let tagger = QueryTagger::new(&LineageConfig::default(), Arc::new(NoopAlterer), dispatcher);

        tagger
            .tag_sql("SELECT m.mid FROM media m", "wrapper", &AccountId::anonymous())
            .unwrap();
        assert_eq!(
            *seen.lock(),
            vec![(EntityKind::Wrapper, true), (EntityKind::Container, true)]
        );
    }

    #[test]
    fn test_probe_carries_metadata() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let alterer = move |kind: EntityKind, probe: &mut ListingQuery| -> Result<bool> {
            recorder.lock().push((
                kind,
                probe.is_subquery(),
                probe.base_alias().map(str::to_string),
                probe.account().clone(),
            ));
            Ok(false)
        };
        let tagger = tagger_with(Arc::new(alterer));
        tagger
            .tag_sql("SELECT m.mid FROM media m", "media", &AccountId::new("alice"))
            .unwrap();

        assert_eq!(
            *seen.lock(),
            vec![(
                EntityKind::Container,
                true,
                Some("base_node".to_string()),
                AccountId::new("alice")
            )]
        );
    }
}
