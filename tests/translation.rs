//! End-to-end translation tests: request parameters in, statement text and
//! binds out. No database involved; these pin the query contract.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use well_registry::catalog::GRID_COLUMNS;
use well_registry::clause::BindValue;
use well_registry::filters::{parse_grid_query, parse_rest_query};
use well_registry::sql::{
    count_query, export_query, grid_page_query, grid_where, max_dollar_placeholder,
    rest_page_query, rest_where,
};

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn grid_request_translates_to_filtered_sorted_page() {
    let query = parse_grid_query(
        &params(&[
            ("draw", "3"),
            ("start", "20"),
            ("length", "10"),
            ("columns[0][search][value]", "foo"),
            ("order[0][column]", "0"),
            ("order[0][dir]", "desc"),
        ]),
        GRID_COLUMNS.len(),
    );
    let filter = grid_where(&query);
    let page = grid_page_query(&query, &filter);

    assert!(page.sql.contains("LOWER(CAST(z.lokacija AS TEXT)) LIKE $1"));
    assert!(page.sql.contains("ORDER BY z.lokacija DESC"));
    assert!(page.sql.ends_with("LIMIT $2 OFFSET $3"));
    assert_eq!(
        page.binds,
        vec![
            BindValue::Text("%foo%".into()),
            BindValue::Int(10),
            BindValue::Int(20),
        ]
    );

    let count = count_query(&filter);
    assert!(!count.sql.contains("ORDER BY"));
    assert!(!count.sql.contains("LIMIT"));
    assert_eq!(count.binds, vec![BindValue::Text("%foo%".into())]);
}

#[test]
fn placeholder_arity_matches_binds_across_surfaces() {
    let grid_cases: Vec<HashMap<String, String>> = vec![
        params(&[]),
        params(&[("search[value]", "voda"), ("length", "-1")]),
        params(&[
            ("search[value]", "voda"),
            ("columns[3][search][value]", "aktivan"),
            ("columns[12][columnControl][search][value]", "15.5"),
            ("columns[12][columnControl][search][logic]", "greater"),
            ("columns[12][columnControl][search][type]", "num"),
            ("columns[5][columnControl][search][logic]", "empty"),
        ]),
    ];

    for case in grid_cases {
        let query = parse_grid_query(&case, GRID_COLUMNS.len());
        let filter = grid_where(&query);
        for stmt in [
            count_query(&filter),
            grid_page_query(&query, &filter),
            export_query(&filter),
        ] {
            assert_eq!(
                max_dollar_placeholder(&stmt.sql),
                stmt.binds.len(),
                "placeholders must match binds, sql: {}",
                stmt.sql
            );
        }
    }

    let rest = parse_rest_query(&params(&[
        ("search", "trg"),
        ("naziv_gc_id", "2"),
        ("limit", "25"),
        ("offset", "50"),
    ]))
    .unwrap();
    let filter = rest_where(&rest);
    let stmt = rest_page_query(&filter, rest.limit, rest.offset);
    assert_eq!(max_dollar_placeholder(&stmt.sql), stmt.binds.len());
    assert_eq!(
        stmt.binds.last(),
        Some(&BindValue::Int(50)),
        "offset is the final bind"
    );
}

#[test]
fn hostile_input_stays_out_of_sql_text() {
    let hostile = "'; DROP TABLE zdenac; --";
    let query = parse_grid_query(
        &params(&[
            ("search[value]", hostile),
            ("columns[1][search][value]", hostile),
        ]),
        GRID_COLUMNS.len(),
    );
    let filter = grid_where(&query);
    let stmt = grid_page_query(&query, &filter);

    assert!(!stmt.sql.contains("DROP"));
    assert!(stmt
        .binds
        .iter()
        .filter(|bind| matches!(bind, BindValue::Text(text) if text.contains("drop table")))
        .count() > 0);
}

#[test]
fn rest_district_filter_rejects_non_integers_before_translation() {
    let err = parse_rest_query(&params(&[("naziv_gc_id", "abc")])).unwrap_err();
    assert!(err.to_string().contains("integer"));
}
