//! Converts one filter directive into a predicate fragment plus its bound
//! values. Fragments use `?` markers that the assembler renumbers into
//! `$1..$n`; user-supplied values only ever travel through [`BindValue`],
//! never through the SQL text itself.

use crate::catalog::Column;
use crate::filters::{FilterDirective, FilterLogic};
use tokio_postgres::types::ToSql;

static NULL_TEXT: Option<String> = None;
static NULL_INT: Option<i64> = None;
static NULL_FLOAT: Option<f64> = None;

/// A value bound to one `?` marker.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Int(i64),
    Float(f64),
    NullText,
    NullInt,
    NullFloat,
}

impl BindValue {
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Text(value) => value,
            Self::Int(value) => value,
            Self::Float(value) => value,
            Self::NullText => &NULL_TEXT,
            Self::NullInt => &NULL_INT,
            Self::NullFloat => &NULL_FLOAT,
        }
    }
}

/// Borrows a bind slice in the form the driver wants.
pub fn sql_params(binds: &[BindValue]) -> Vec<&(dyn ToSql + Sync)> {
    binds.iter().map(BindValue::as_sql).collect()
}

/// One predicate fragment and its binds, in marker order.
pub type Clause = (String, Vec<BindValue>);

/// Builds the predicate for one directive, or nothing when the directive
/// degrades (blank value, numeric logic on a text column, unparseable
/// number). Degrading is deliberate: the grid must keep rendering.
pub fn column_clause(column: &Column, directive: &FilterDirective) -> Option<Clause> {
    let expr = column.expr;

    match directive.logic {
        FilterLogic::Empty => {
            return Some((
                format!("({expr} IS NULL OR TRIM(CAST({expr} AS TEXT)) = '')"),
                Vec::new(),
            ));
        }
        FilterLogic::NotEmpty => {
            return Some((
                format!("({expr} IS NOT NULL AND TRIM(CAST({expr} AS TEXT)) <> '')"),
                Vec::new(),
            ));
        }
        _ => {}
    }

    let value = directive.value.trim();
    if value.is_empty() {
        return None;
    }
    let value = value.to_lowercase();

    let numeric_eligible = directive.numeric_hint && column.numeric;
    let wants_numeric =
        directive.logic.is_magnitude() || (numeric_eligible && is_equality(directive.logic));

    if wants_numeric {
        // A magnitude logic without a numeric column, or an unparseable
        // number, drops the predicate rather than failing the request.
        if !numeric_eligible {
            return None;
        }
        let number: f64 = value.parse().ok()?;
        let op = match directive.logic {
            FilterLogic::Equal => "=",
            FilterLogic::NotEqual => "<>",
            FilterLogic::Greater => ">",
            FilterLogic::GreaterOrEqual => ">=",
            FilterLogic::Less => "<",
            FilterLogic::LessOrEqual => "<=",
            _ => unreachable!("guarded by is_magnitude and is_equality"),
        };
        return Some((
            format!("CAST({expr} AS NUMERIC) {op} ?::float8"),
            vec![BindValue::Float(number)],
        ));
    }

    let text_expr = format!("LOWER(CAST({expr} AS TEXT))");
    let clause = match directive.logic {
        FilterLogic::Equal => (format!("{text_expr} = ?"), BindValue::Text(value)),
        FilterLogic::NotEqual => (format!("{text_expr} <> ?"), BindValue::Text(value)),
        FilterLogic::Starts => (
            format!("{text_expr} LIKE ?"),
            BindValue::Text(format!("{value}%")),
        ),
        FilterLogic::Ends => (
            format!("{text_expr} LIKE ?"),
            BindValue::Text(format!("%{value}")),
        ),
        FilterLogic::NotContains => (
            format!("{text_expr} NOT LIKE ?"),
            BindValue::Text(format!("%{value}%")),
        ),
        _ => (
            format!("{text_expr} LIKE ?"),
            BindValue::Text(format!("%{value}%")),
        ),
    };

    Some((clause.0, vec![clause.1]))
}

fn is_equality(logic: FilterLogic) -> bool {
    matches!(logic, FilterLogic::Equal | FilterLogic::NotEqual)
}

/// OR-group applying the contains rule across every searchable column.
/// Returns nothing for a blank term.
pub fn search_clause(exprs: &[&str], term: &str) -> Option<Clause> {
    let term = term.trim().to_lowercase();
    if term.is_empty() || exprs.is_empty() {
        return None;
    }

    let like = format!("%{term}%");
    let parts: Vec<String> = exprs
        .iter()
        .map(|expr| format!("LOWER(CAST({expr} AS TEXT)) LIKE ?"))
        .collect();
    let binds = vec![BindValue::Text(like); parts.len()];

    Some((format!("({})", parts.join(" OR ")), binds))
}
