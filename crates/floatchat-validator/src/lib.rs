//! Validator: a three-check, AST-based gate on candidate SQL —
//! syntax, read-only, table allow-list — plus non-fatal spatial-cast
//! advisories. Never substring matching; every check walks the parsed AST.

use std::collections::HashSet;
use std::ops::ControlFlow;

use sqlparser::ast::{visit_expressions, visit_relations, visit_statements, Expr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Which of the three checks failed, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailed {
    Syntax,
    Readonly,
    Whitelist,
}

impl CheckFailed {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckFailed::Syntax => "syntax",
            CheckFailed::Readonly => "readonly",
            CheckFailed::Whitelist => "whitelist",
        }
    }
}

/// Outcome of [`validate_sql`].
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
    pub check_failed: Option<CheckFailed>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn fail(check: CheckFailed, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            check_failed: Some(check),
            warnings: Vec::new(),
        }
    }

    fn pass(warnings: Vec<String>) -> Self {
        Self {
            valid: true,
            error: None,
            check_failed: None,
            warnings,
        }
    }
}

const SPATIAL_FUNCTIONS_GEOGRAPHY: &[&str] = &["st_dwithin"];
const SPATIAL_FUNCTIONS_GEOMETRY: &[&str] = &["st_contains", "st_within"];

/// Run the 3-check validation pipeline, falling back to
/// [`floatchat_schema::allowed_tables`] when `allowed_tables` is `None`.
pub fn validate_sql(sql: &str, allowed_tables: Option<&HashSet<&str>>) -> ValidationResult {
    let default_tables = floatchat_schema::allowed_tables();
    let allowed: HashSet<String> = match allowed_tables {
        Some(set) => set.iter().map(|s| s.to_lowercase()).collect(),
        None => default_tables.iter().map(|s| s.to_lowercase()).collect(),
    };

    // Check 1: syntax.
    let dialect = PostgreSqlDialect {};
    let statements = match Parser::parse_sql(&dialect, sql) {
        Ok(statements) => statements,
        Err(e) => {
            return ValidationResult::fail(CheckFailed::Syntax, format!("SQL syntax error: {e}"));
        }
    };

    if statements.is_empty() {
        return ValidationResult::fail(CheckFailed::Syntax, "Empty SQL — no statements parsed.");
    }
    if statements.len() != 1 {
        return ValidationResult::fail(
            CheckFailed::Syntax,
            format!(
                "Only a single SELECT statement is allowed. Got {} statements.",
                statements.len()
            ),
        );
    }

    let top = &statements[0];

    // Check 2: read-only, AST-structural.
    if let Err(result) = check_readonly(top) {
        return result;
    }

    // Check 3: table allow-list.
    let whitelist_result = check_whitelist(top, &allowed);
    if !whitelist_result.valid {
        return whitelist_result;
    }

    // Advisories: spatial casts.
    let warnings = check_geography_casts(top);

    ValidationResult::pass(warnings)
}

fn check_readonly(top: &Statement) -> Result<(), ValidationResult> {
    if !matches!(top, Statement::Query(_)) {
        return Err(ValidationResult::fail(
            CheckFailed::Readonly,
            format!("Only SELECT statements are allowed. Got: {top}", top = statement_kind(top)),
        ));
    }

    // Walk every nested statement (a WITH clause may bind a writable CTE in
    // the Postgres dialect, e.g. `WITH t AS (INSERT ... RETURNING ...)`).
    let flow = visit_statements(top, |stmt| {
        if !matches!(stmt, Statement::Query(_)) {
            return ControlFlow::Break(statement_kind(stmt));
        }
        ControlFlow::Continue(())
    });

    if let ControlFlow::Break(kind) = flow {
        return Err(ValidationResult::fail(
            CheckFailed::Readonly,
            format!("Write operation detected: {kind}. Only SELECT is allowed."),
        ));
    }

    Ok(())
}

fn statement_kind(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Query(_) => "Query",
        Statement::Insert(_) => "Insert",
        Statement::Update { .. } => "Update",
        Statement::Delete(_) => "Delete",
        Statement::Drop { .. } => "Drop",
        Statement::CreateTable(_) => "CreateTable",
        Statement::AlterTable { .. } => "AlterTable",
        Statement::Merge { .. } => "Merge",
        Statement::Truncate { .. } => "Truncate",
        Statement::Grant { .. } => "Grant",
        Statement::Revoke { .. } => "Revoke",
        _ => "Command",
    }
}

fn check_whitelist(top: &Statement, allowed: &HashSet<String>) -> ValidationResult {
    let mut referenced: HashSet<String> = HashSet::new();
    let _ = visit_relations(top, |relation| {
        if let Some(ident) = relation.0.last() {
            referenced.insert(ident.value.to_lowercase());
        }
        ControlFlow::<()>::Continue(())
    });

    let cte_aliases = collect_cte_aliases(top);
    let real_tables: HashSet<&String> = referenced.difference(&cte_aliases).collect();

    let disallowed: Vec<&String> = real_tables
        .into_iter()
        .filter(|name| !allowed.contains(name.as_str()))
        .collect();

    if disallowed.is_empty() {
        return ValidationResult::pass(Vec::new());
    }

    let mut names: Vec<String> = disallowed.into_iter().cloned().collect();
    names.sort();
    ValidationResult::fail(
        CheckFailed::Whitelist,
        format!("Referenced tables not in whitelist: {}", names.join(", ")),
    )
}

fn collect_cte_aliases(top: &Statement) -> HashSet<String> {
    let mut aliases = HashSet::new();
    if let Statement::Query(query) = top {
        collect_cte_aliases_from_query(query, &mut aliases);
    }
    aliases
}

fn collect_cte_aliases_from_query(
    query: &sqlparser::ast::Query,
    aliases: &mut HashSet<String>,
) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            aliases.insert(cte.alias.name.value.to_lowercase());
            collect_cte_aliases_from_query(&cte.query, aliases);
        }
    }
}

fn check_geography_casts(top: &Statement) -> Vec<String> {
    let mut warnings = Vec::new();
    let _ = visit_expressions(top, |expr| {
        if let Expr::Function(func) = expr {
            let name = func.name.to_string().to_lowercase();
            let fragment = func.to_string();
            if SPATIAL_FUNCTIONS_GEOGRAPHY.contains(&name.as_str())
                && !fragment.contains("::geography")
            {
                warnings.push(format!(
                    "{} used without ::geography cast. For distance calculations, cast arguments to ::geography.",
                    name.to_uppercase()
                ));
            }
            if SPATIAL_FUNCTIONS_GEOMETRY.contains(&name.as_str())
                && !fragment.contains("::geometry")
            {
                warnings.push(format!(
                    "{} used without ::geometry cast. For containment checks, cast arguments to ::geometry.",
                    name.to_uppercase()
                ));
            }
        }
        ControlFlow::<()>::Continue(())
    });
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        let result = validate_sql("SELECT * FROM floats LIMIT 10", None);
        assert!(result.valid, "{:?}", result.error);
    }

    #[test]
    fn rejects_malformed_syntax() {
        let result = validate_sql("SELECT FROM WHERE", None);
        assert!(!result.valid);
        assert_eq!(result.check_failed, Some(CheckFailed::Syntax));
    }

    #[test]
    fn rejects_multiple_statements() {
        let result = validate_sql("SELECT 1; SELECT 2;", None);
        assert!(!result.valid);
        assert_eq!(result.check_failed, Some(CheckFailed::Syntax));
    }

    #[test]
    fn rejects_write_statements() {
        let result = validate_sql("DELETE FROM floats WHERE float_id = 1", None);
        assert!(!result.valid);
        assert_eq!(result.check_failed, Some(CheckFailed::Readonly));
    }

    #[test]
    fn rejects_non_whitelisted_table() {
        let result = validate_sql("SELECT * FROM pg_shadow", None);
        assert!(!result.valid);
        assert_eq!(result.check_failed, Some(CheckFailed::Whitelist));
        assert!(result.error.unwrap().contains("pg_shadow"));
    }

    #[test]
    fn cte_alias_is_excluded_from_whitelist_check() {
        let result = validate_sql(
            "WITH recent AS (SELECT * FROM profiles) SELECT * FROM recent",
            None,
        );
        assert!(result.valid, "{:?}", result.error);
    }

    #[test]
    fn warns_on_missing_geography_cast() {
        let result = validate_sql(
            "SELECT * FROM profiles p WHERE ST_DWithin(p.geom, ST_MakePoint(1, 2), 1000)",
            None,
        );
        assert!(result.valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn no_warning_when_geography_cast_present() {
        let result = validate_sql(
            "SELECT * FROM profiles p WHERE ST_DWithin(p.geom::geography, ST_MakePoint(1, 2)::geography, 1000)",
            None,
        );
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }
}
