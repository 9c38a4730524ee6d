//! sqlparser helpers shared by the tagger.

use crate::error::{LineageError, Result};
use sqlparser::ast::{BinaryOperator, Expr, Ident, ObjectName, ObjectNamePart, Query, Select, SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError, ParserOptions};

const DEFAULT_SQL_RECURSION_LIMIT: usize = 512;

/// Default sqlparser options for listing queries.
pub fn parser_options() -> ParserOptions {
    ParserOptions::new().with_trailing_commas(true)
}

/// Parse SQL into statements with the default options and recursion limit.
pub fn parse_sql_statements(sql: &str) -> std::result::Result<Vec<Statement>, ParserError> {
    let dialect = GenericDialect {};
    Parser::new(&dialect)
        .with_options(parser_options())
        .with_recursion_limit(DEFAULT_SQL_RECURSION_LIMIT)
        .try_with_sql(sql)?
        .parse_statements()
}

/// Parse exactly one query statement.
pub fn parse_query(sql: &str) -> Result<Query> {
    let mut statements = parse_sql_statements(sql)?;
    if statements.len() != 1 {
        return Err(LineageError::UnsupportedQuery(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )));
    }

    match statements.remove(0) {
        Statement::Query(query) => Ok(*query),
        other => Err(LineageError::UnsupportedQuery(format!(
            "not a query: {}",
            other
        ))),
    }
}

/// Parse a standalone expression, e.g. `base_node.nid IN (1, 2)`.
pub fn parse_expr(sql: &str) -> Result<Expr> {
    let dialect = GenericDialect {};
    let expr = Parser::new(&dialect)
        .with_options(parser_options())
        .with_recursion_limit(DEFAULT_SQL_RECURSION_LIMIT)
        .try_with_sql(sql)?
        .parse_expr()?;
    Ok(expr)
}

/// Identifier parts of an object name, skipping non-identifier parts.
pub fn name_parts(name: &ObjectName) -> Vec<&Ident> {
    name.0
        .iter()
        .filter_map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(ident),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .collect()
}

pub fn select_of(query: &Query) -> Option<&Select> {
    match query.body.as_ref() {
        SetExpr::Select(select) => Some(select.as_ref()),
        _ => None,
    }
}

pub fn select_of_mut(query: &mut Query) -> Option<&mut Select> {
    match query.body.as_mut() {
        SetExpr::Select(select) => Some(select.as_mut()),
        _ => None,
    }
}

pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// `alias.column`
pub fn column_ref(alias: Ident, column: &str) -> Expr {
    Expr::CompoundIdentifier(vec![alias, Ident::new(column)])
}

/// Whether `expr` is rooted at a disjunction, so that appending `AND x` would bind
/// only to its last operand.
pub fn is_disjunction(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::BinaryOp {
            op: BinaryOperator::Or | BinaryOperator::Xor,
            ..
        }
    )
}

/// Parenthesize an OR/XOR-rooted condition so new conditions are additive.
pub fn normalize_conjunction(selection: &mut Option<Expr>) {
    if selection.as_ref().is_some_and(is_disjunction) {
        if let Some(existing) = selection.take() {
            *selection = Some(Expr::Nested(Box::new(existing)));
        }
    }
}

/// AND `expr` onto `selection`.
pub fn conjoin(selection: &mut Option<Expr>, expr: Expr) {
    normalize_conjunction(selection);
    *selection = Some(match selection.take() {
        Some(existing) => binary(existing, BinaryOperator::And, expr),
        None => expr,
    });
}

/// OR `expr` onto `selection`.
pub fn disjoin(selection: &mut Option<Expr>, expr: Expr) {
    *selection = Some(match selection.take() {
        Some(existing) => binary(existing, BinaryOperator::Or, expr),
        None => expr,
    });
}
