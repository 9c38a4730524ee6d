//! Listing queries and the per-query tagging context.

use super::sql;
use crate::error::{LineageError, Result};
use lineage_commons::{AccountId, EntityKind};
use sqlparser::ast::{Expr, Query, Select};
use std::fmt;

/// A parsed listing query plus the metadata the tagger needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    query: Query,
    kind: Option<EntityKind>,
    subquery: bool,
    base_alias: Option<String>,
    account: AccountId,
}

impl ListingQuery {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            kind: None,
            subquery: false,
            base_alias: None,
            account: AccountId::anonymous(),
        }
    }

    /// Parse a single `SELECT` statement.
    pub fn parse(sql: &str) -> Result<Self> {
        let query = sql::parse_query(sql)?;
        if sql::select_of(&query).is_none() {
            return Err(LineageError::UnsupportedQuery(
                "only plain SELECT listing queries can be tagged".to_string(),
            ));
        }
        Ok(Self::new(query))
    }

    /// Internal probe against a parent kind's base table, never tagged itself.
    pub(crate) fn probe(kind: EntityKind, base_alias: &str, query: Query, account: AccountId) -> Self {
        Self {
            query,
            kind: Some(kind),
            subquery: true,
            base_alias: Some(base_alias.to_string()),
            account,
        }
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_account(mut self, account: AccountId) -> Self {
        self.account = account;
        self
    }

    /// Mark as internal so that tagging skips it.
    pub fn mark_subquery(&mut self) {
        self.subquery = true;
    }

    /// Kind of entity this query lists.
    pub fn kind(&self) -> Option<EntityKind> {
        self.kind
    }

    pub fn is_subquery(&self) -> bool {
        self.subquery
    }

    /// Alias of the base table in a probe, e.g. `base_node`.
    pub fn base_alias(&self) -> Option<&str> {
        self.base_alias.as_deref()
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn into_query(self) -> Query {
        self.query
    }

    pub fn select(&self) -> Result<&Select> {
        sql::select_of(&self.query).ok_or_else(not_a_select)
    }

    pub fn select_mut(&mut self) -> Result<&mut Select> {
        sql::select_of_mut(&mut self.query).ok_or_else(not_a_select)
    }

    /// AND a condition onto the query's `WHERE`.
    pub fn add_condition(&mut self, condition: Expr) -> Result<()> {
        let select = self.select_mut()?;
        sql::conjoin(&mut select.selection, condition);
        Ok(())
    }

    /// Parse and AND a condition, e.g. `base_node.status = 1`.
    pub fn add_condition_sql(&mut self, condition: &str) -> Result<()> {
        let expr = sql::parse_expr(condition)?;
        self.add_condition(expr)
    }

    pub fn to_sql(&self) -> String {
        self.query.to_string()
    }
}

impl fmt::Display for ListingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)
    }
}

fn not_a_select() -> LineageError {
    LineageError::UnsupportedQuery("query body is not a plain SELECT".to_string())
}

/// State carried across tagging calls on one query.
///
/// Records which table aliases already contributed targets, whether the LUT probe
/// pair has been attached, and which hierarchy levels have been visited. Scoped to
/// one query; never shared.
#[derive(Debug, Clone, Default)]
pub struct TaggingContext {
    tagged_aliases: Vec<String>,
    probes_installed: bool,
    visited_levels: Vec<EntityKind>,
    checked_ancestors: Vec<EntityKind>,
}

impl TaggingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tagged_aliases(&self) -> &[String] {
        &self.tagged_aliases
    }

    pub fn is_tagged(&self, alias: &str) -> bool {
        self.tagged_aliases.iter().any(|tagged| tagged == alias)
    }

    /// Record `alias`; returns `false` when it was already recorded.
    pub(crate) fn mark_tagged(&mut self, alias: &str) -> bool {
        if self.is_tagged(alias) {
            return false;
        }
        self.tagged_aliases.push(alias.to_string());
        true
    }

    /// Whether the query already carries the probe pair built under this context.
    pub fn probes_installed(&self) -> bool {
        self.probes_installed
    }

    pub(crate) fn mark_probes_installed(&mut self) {
        self.probes_installed = true;
    }

    /// Levels whose listeners have been notified, in visiting order.
    pub fn visited_levels(&self) -> &[EntityKind] {
        &self.visited_levels
    }

    /// Record a visit to `kind`; returns `false` when it was already visited.
    pub(crate) fn mark_visited(&mut self, kind: EntityKind) -> bool {
        if self.visited_levels.contains(&kind) {
            return false;
        }
        self.visited_levels.push(kind);
        true
    }

    /// Record that `kind`'s ancestor probe was offered to the alterer; returns
    /// `false` when it already was.
    pub(crate) fn mark_ancestor_checked(&mut self, kind: EntityKind) -> bool {
        if self.checked_ancestors.contains(&kind) {
            return false;
        }
        self.checked_ancestors.push(kind);
        true
    }
}
