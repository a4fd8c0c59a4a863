//! Assembles count, page and export queries from predicate fragments.
//!
//! Fragments accumulate with `?` markers and a parallel bind list; the final
//! text is renumbered to `$1..$n` once, so fragment builders never need to
//! know their position in the statement.

use crate::catalog::{self, Column, BASE_FROM};
use crate::clause::{self, BindValue, Clause};
use crate::filters::{FilterDirective, GridQuery, RestQuery, SortRequest};

/// Grid default ordering: first catalog column ascending.
const GRID_DEFAULT_ORDER: &str = " ORDER BY z.lokacija ASC";
/// Export ordering: district name, then location.
pub const EXPORT_ORDER: &str = " ORDER BY g.naziv_gc ASC, z.lokacija ASC";
const REST_ORDER: &str = " ORDER BY z.id ASC";

/// Conjunction of predicate fragments with their binds kept in step.
#[derive(Debug, Default)]
pub struct WhereClause {
    clauses: Vec<String>,
    binds: Vec<BindValue>,
}

impl WhereClause {
    pub fn push(&mut self, clause: Clause) {
        let (sql, binds) = clause;
        self.clauses.push(sql);
        self.binds.extend(binds);
    }

    pub fn push_opt(&mut self, clause: Option<Clause>) {
        if let Some(clause) = clause {
            self.push(clause);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// ` WHERE a AND b AND c`, or nothing when unconditioned.
    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Statement text plus binds, ready for the driver.
#[derive(Debug)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

pub fn rewrite_placeholders(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut index = 1;
    for ch in sql.chars() {
        if ch == '?' {
            result.push('$');
            result.push_str(&index.to_string());
            index += 1;
        } else {
            result.push(ch);
        }
    }
    result
}

/// WHERE for a grid request: the global-search OR-group first, then each
/// column predicate in catalog order. AND is commutative; the order only
/// keeps statements deterministic.
pub fn grid_where(query: &GridQuery) -> WhereClause {
    let mut filter = WhereClause::default();
    filter.push_opt(clause::search_clause(
        &catalog::grid_search_exprs(),
        &query.search,
    ));
    for directive in &query.directives {
        filter.push_opt(grid_directive_clause(directive));
    }
    filter
}

fn grid_directive_clause(directive: &FilterDirective) -> Option<Clause> {
    let column = catalog::grid_column(directive.column_index)?;
    clause::column_clause(column, directive)
}

/// WHERE for a REST collection request.
pub fn rest_where(query: &RestQuery) -> WhereClause {
    let mut filter = WhereClause::default();
    filter.push_opt(clause::search_clause(
        &catalog::rest_search_exprs(),
        &query.search,
    ));
    if let Some(district_id) = query.district_id {
        filter.push((
            "z.naziv_gc_id = ?::int8".to_string(),
            vec![BindValue::Int(district_id)],
        ));
    }
    if let Some(status) = &query.status {
        filter.push((
            "LOWER(z.status_odrz) = ?".to_string(),
            vec![BindValue::Text(status.clone())],
        ));
    }
    if let Some(active) = &query.active {
        filter.push((
            "LOWER(z.aktivan_da_ne) = ?".to_string(),
            vec![BindValue::Text(active.clone())],
        ));
    }
    filter
}

fn order_clause(sort: Option<SortRequest>) -> String {
    let Some(sort) = sort else {
        return GRID_DEFAULT_ORDER.to_string();
    };
    let Some(column) = catalog::grid_column(sort.column_index) else {
        return GRID_DEFAULT_ORDER.to_string();
    };
    let direction = if sort.descending { "DESC" } else { "ASC" };
    format!(" ORDER BY {} {}", column.expr, direction)
}

/// Count over the base source, with or without predicates. Carries no ORDER
/// BY or LIMIT.
pub fn count_query(filter: &WhereClause) -> Statement {
    Statement {
        sql: rewrite_placeholders(&format!("SELECT COUNT(*) {BASE_FROM}{}", filter.sql())),
        binds: filter.binds.clone(),
    }
}

pub const UNFILTERED: WhereClause = WhereClause {
    clauses: Vec::new(),
    binds: Vec::new(),
};

/// Ordered, paged grid row set. `length = -1` selects every filtered row.
pub fn grid_page_query(query: &GridQuery, filter: &WhereClause) -> Statement {
    let select = catalog::select_list(catalog::GRID_COLUMNS);
    let order = order_clause(query.sort);
    let mut sql = format!("SELECT {select} {BASE_FROM}{}{order}", filter.sql());
    let mut binds = filter.binds.clone();

    if query.length != -1 {
        sql.push_str(" LIMIT ? OFFSET ?");
        binds.push(BindValue::Int(query.length));
        binds.push(BindValue::Int(query.start));
    }

    Statement {
        sql: rewrite_placeholders(&sql),
        binds,
    }
}

/// Full-dataset (or filtered) export rows: fixed order, no paging.
pub fn export_query(filter: &WhereClause) -> Statement {
    let select = catalog::select_list(catalog::GRID_COLUMNS);
    Statement {
        sql: rewrite_placeholders(&format!(
            "SELECT {select} {BASE_FROM}{}{EXPORT_ORDER}",
            filter.sql()
        )),
        binds: filter.binds.clone(),
    }
}

/// REST collection page: id order, limit/offset always bound.
pub fn rest_page_query(filter: &WhereClause, limit: i64, offset: i64) -> Statement {
    let select = catalog::select_list(catalog::REST_COLUMNS);
    let mut binds = filter.binds.clone();
    binds.push(BindValue::Int(limit));
    binds.push(BindValue::Int(offset));
    Statement {
        sql: rewrite_placeholders(&format!(
            "SELECT {select} {BASE_FROM}{}{REST_ORDER} LIMIT ? OFFSET ?",
            filter.sql()
        )),
        binds,
    }
}

pub fn rest_get_query(id: i64) -> Statement {
    let select = catalog::select_list(catalog::REST_COLUMNS);
    Statement {
        sql: rewrite_placeholders(&format!("SELECT {select} {BASE_FROM} WHERE z.id = ?::int8")),
        binds: vec![BindValue::Int(id)],
    }
}

/// Coordinate rows for the map: both coordinates present, id order, paged.
pub fn coordinates_query(limit: i64, offset: i64) -> Statement {
    let select = catalog::select_list(catalog::MAP_COLUMNS);
    Statement {
        sql: rewrite_placeholders(&format!(
            "SELECT {select} {BASE_FROM} WHERE z.lon IS NOT NULL AND z.lat IS NOT NULL{REST_ORDER} LIMIT ? OFFSET ?"
        )),
        binds: vec![BindValue::Int(limit), BindValue::Int(offset)],
    }
}

pub fn max_dollar_placeholder(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut max = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }

        i += 1;
        if i >= bytes.len() || !bytes[i].is_ascii_digit() {
            continue;
        }

        let mut value = 0usize;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            value = value * 10 + (bytes[i] - b'0') as usize;
            i += 1;
        }

        max = max.max(value);
    }

    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{parse_grid_query, parse_rest_query, FilterLogic};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn grid(pairs: &[(&str, &str)]) -> GridQuery {
        parse_grid_query(&params(pairs), catalog::GRID_COLUMNS.len())
    }

    #[test]
    fn placeholders_are_renumbered_left_to_right() {
        assert_eq!(
            rewrite_placeholders("a = ? AND b LIKE ? OR c = ?::float8"),
            "a = $1 AND b LIKE $2 OR c = $3::float8"
        );
    }

    #[test]
    fn unconditioned_count_has_no_where() {
        let stmt = count_query(&UNFILTERED);
        assert_eq!(stmt.sql, format!("SELECT COUNT(*) {BASE_FROM}"));
        assert!(stmt.binds.is_empty());
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let query = grid(&[
            ("search[value]", "foo"),
            ("order[0][column]", "2"),
            ("length", "10"),
        ]);
        let stmt = count_query(&grid_where(&query));
        assert!(!stmt.sql.contains("ORDER BY"));
        assert!(!stmt.sql.contains("LIMIT"));
        assert_eq!(max_dollar_placeholder(&stmt.sql), stmt.binds.len());
    }

    #[test]
    fn grid_scenario_column_filter_and_descending_sort() {
        let query = grid(&[
            ("columns[0][search][value]", "foo"),
            ("order[0][column]", "0"),
            ("order[0][dir]", "desc"),
        ]);
        let filter = grid_where(&query);
        let stmt = grid_page_query(&query, &filter);

        assert!(stmt
            .sql
            .contains("LOWER(CAST(z.lokacija AS TEXT)) LIKE $1"));
        assert!(stmt.sql.contains("ORDER BY z.lokacija DESC"));
        assert_eq!(stmt.binds[0], BindValue::Text("%foo%".into()));
        // limit + offset follow the filter bind
        assert_eq!(stmt.binds.len(), 3);
        assert_eq!(max_dollar_placeholder(&stmt.sql), stmt.binds.len());
    }

    #[test]
    fn length_minus_one_means_all_rows_still_filtered() {
        let query = grid(&[("search[value]", "foo"), ("length", "-1")]);
        let filter = grid_where(&query);
        let stmt = grid_page_query(&query, &filter);
        assert!(!stmt.sql.contains("LIMIT"));
        assert!(stmt.sql.contains("WHERE"));
    }

    #[test]
    fn invalid_sort_falls_back_to_default_order() {
        let query = grid(&[("order[0][column]", "99"), ("order[0][dir]", "desc")]);
        let stmt = grid_page_query(&query, &grid_where(&query));
        assert!(stmt.sql.contains("ORDER BY z.lokacija ASC"));
    }

    #[test]
    fn directives_and_search_are_anded_in_catalog_order() {
        let query = grid(&[
            ("search[value]", "voda"),
            ("columns[3][search][value]", "aktivan"),
            ("columns[0][columnControl][search][logic]", "notEmpty"),
        ]);
        let filter = grid_where(&query);
        let stmt = count_query(&filter);

        let search_at = stmt.sql.find("LIKE $1").unwrap();
        let lokacija_at = stmt.sql.find("z.lokacija IS NOT NULL").unwrap();
        let status_at = stmt.sql.rfind("z.status_odrz").unwrap();
        assert!(search_at < lokacija_at && lokacija_at < status_at);
        assert_eq!(max_dollar_placeholder(&stmt.sql), stmt.binds.len());
    }

    #[test]
    fn numeric_directive_binds_one_float() {
        let query = grid(&[
            ("columns[13][columnControl][search][value]", "45.8"),
            ("columns[13][columnControl][search][logic]", "less"),
            ("columns[13][columnControl][search][type]", "num"),
        ]);
        assert_eq!(query.directives[0].logic, FilterLogic::Less);
        let filter = grid_where(&query);
        let stmt = count_query(&filter);
        assert!(stmt.sql.contains("CAST(z.lat AS NUMERIC) < $1::float8"));
        assert_eq!(stmt.binds, vec![BindValue::Float(45.8)]);
    }

    #[test]
    fn rest_where_combines_search_and_equality_filters() {
        let query = parse_rest_query(&params(&[
            ("search", "Trg"),
            ("naziv_gc_id", "4"),
            ("status_odrz", "Aktivan"),
            ("aktivan_da_ne", "da"),
        ]))
        .unwrap();
        let filter = rest_where(&query);
        let stmt = rest_page_query(&filter, query.limit, query.offset);

        assert!(stmt.sql.contains("z.naziv_gc_id = $"));
        assert!(stmt.sql.contains("LOWER(z.status_odrz) = $"));
        assert!(stmt.sql.contains("LOWER(z.aktivan_da_ne) = $"));
        assert!(stmt.sql.contains("ORDER BY z.id ASC"));
        assert!(stmt.sql.ends_with("OFFSET $19"));
        assert_eq!(max_dollar_placeholder(&stmt.sql), stmt.binds.len());
        // search term is bound once per searchable column (14), then the
        // three equality binds, then limit and offset.
        assert_eq!(stmt.binds.len(), 14 + 3 + 2);
    }

    #[test]
    fn export_query_forces_fixed_order_without_limit() {
        let query = grid(&[("search[value]", "foo"), ("length", "5"), ("start", "10")]);
        let stmt = export_query(&grid_where(&query));
        assert!(stmt.sql.contains("ORDER BY g.naziv_gc ASC, z.lokacija ASC"));
        assert!(!stmt.sql.contains("LIMIT"));
    }

    #[test]
    fn coordinates_query_requires_both_coordinates() {
        let stmt = coordinates_query(50, 0);
        assert!(stmt
            .sql
            .contains("z.lon IS NOT NULL AND z.lat IS NOT NULL"));
        assert_eq!(stmt.binds.len(), 2);
        assert_eq!(max_dollar_placeholder(&stmt.sql), 2);
    }
}
