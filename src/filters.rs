//! Request-parameter parsing for the grid and REST surfaces.
//!
//! The two surfaces deliberately disagree on failure policy: the grid is an
//! interactive client, so malformed input degrades to "no filter"; the REST
//! surface is a programmatic contract and rejects bad paging or a
//! non-integer district id with a request-level error.

use crate::error::{Result, ServiceError};
use std::collections::HashMap;

pub const REST_DEFAULT_LIMIT: i64 = 50;
pub const REST_MAX_LIMIT: i64 = 200;
pub const GRID_DEFAULT_LENGTH: i64 = 50;

/// Closed set of column-filter comparison logics. Unknown wire strings fall
/// back to `Contains` so a stale client can never break the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterLogic {
    Contains,
    Equal,
    NotEqual,
    Starts,
    Ends,
    NotContains,
    Empty,
    NotEmpty,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl FilterLogic {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "equal" => Self::Equal,
            "notEqual" => Self::NotEqual,
            "starts" => Self::Starts,
            "ends" => Self::Ends,
            "notContains" => Self::NotContains,
            "empty" => Self::Empty,
            "notEmpty" => Self::NotEmpty,
            "greater" => Self::Greater,
            "greaterOrEqual" => Self::GreaterOrEqual,
            "less" => Self::Less,
            "lessOrEqual" => Self::LessOrEqual,
            _ => Self::Contains,
        }
    }

    /// Magnitude-only logics; meaningless without a numeric column.
    pub fn is_magnitude(self) -> bool {
        matches!(
            self,
            Self::Greater | Self::GreaterOrEqual | Self::Less | Self::LessOrEqual
        )
    }

    /// Logics that ignore any supplied value.
    pub fn is_presence(self) -> bool {
        matches!(self, Self::Empty | Self::NotEmpty)
    }
}

/// One parsed per-column filter, addressed by grid position.
#[derive(Debug, Clone)]
pub struct FilterDirective {
    pub column_index: usize,
    pub logic: FilterLogic,
    pub value: String,
    pub numeric_hint: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SortRequest {
    pub column_index: usize,
    pub descending: bool,
}

/// Everything the grid endpoint reads from its query string. Parsing never
/// fails; anything malformed is dropped or replaced by a default.
#[derive(Debug, Clone)]
pub struct GridQuery {
    pub draw: i64,
    pub start: i64,
    /// `-1` means all rows, still filtered.
    pub length: i64,
    pub search: String,
    pub directives: Vec<FilterDirective>,
    pub sort: Option<SortRequest>,
}

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or("")
}

fn int_param(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

pub fn parse_grid_query(params: &HashMap<String, String>, column_count: usize) -> GridQuery {
    let draw = int_param(params, "draw", 0);
    let start = int_param(params, "start", 0).max(0);
    let length = int_param(params, "length", GRID_DEFAULT_LENGTH).max(-1);
    let search = param(params, "search[value]").trim().to_lowercase();

    let mut directives = Vec::new();
    for index in 0..column_count {
        if let Some(directive) = parse_column_directive(params, index) {
            directives.push(directive);
        }
    }

    let sort = parse_sort(params, column_count);

    GridQuery {
        draw,
        start,
        length,
        search,
        directives,
        sort,
    }
}

/// Reads the plain search value and the logic-qualified triple for one
/// column position. A supplied logic takes precedence over the plain value
/// and is kept when it is a presence check or carries a non-blank value;
/// otherwise the column is skipped.
fn parse_column_directive(
    params: &HashMap<String, String>,
    index: usize,
) -> Option<FilterDirective> {
    let value = param(params, &format!("columns[{index}][search][value]")).trim();
    let cc_value = param(
        params,
        &format!("columns[{index}][columnControl][search][value]"),
    )
    .trim();
    let cc_logic = param(
        params,
        &format!("columns[{index}][columnControl][search][logic]"),
    )
    .trim();
    let cc_type = param(
        params,
        &format!("columns[{index}][columnControl][search][type]"),
    )
    .trim();

    if !cc_logic.is_empty() {
        let logic = FilterLogic::parse(cc_logic);
        if !cc_value.is_empty() || logic.is_presence() {
            return Some(FilterDirective {
                column_index: index,
                logic,
                value: cc_value.to_string(),
                numeric_hint: cc_type.eq_ignore_ascii_case("num"),
            });
        }
        return None;
    }

    if value.is_empty() {
        return None;
    }

    Some(FilterDirective {
        column_index: index,
        logic: FilterLogic::Contains,
        value: value.to_string(),
        numeric_hint: false,
    })
}

fn parse_sort(params: &HashMap<String, String>, column_count: usize) -> Option<SortRequest> {
    let index: usize = params.get("order[0][column]")?.trim().parse().ok()?;
    if index >= column_count {
        return None;
    }
    let descending = param(params, "order[0][dir]").eq_ignore_ascii_case("desc");
    Some(SortRequest {
        column_index: index,
        descending,
    })
}

/// Parsed REST collection parameters.
#[derive(Debug, Clone)]
pub struct RestQuery {
    pub search: String,
    pub district_id: Option<i64>,
    pub status: Option<String>,
    pub active: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

pub fn parse_rest_query(params: &HashMap<String, String>) -> Result<RestQuery> {
    let (limit, offset) = parse_paging(params)?;
    let search = param(params, "search").trim().to_lowercase();

    let district_id = match params.get("naziv_gc_id").map(|raw| raw.trim()) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ServiceError::InvalidQuery("naziv_gc_id must be an integer.".into())
        })?),
    };

    let status = non_blank(params.get("status_odrz"));
    let active = non_blank(params.get("aktivan_da_ne"));

    Ok(RestQuery {
        search,
        district_id,
        status,
        active,
        limit,
        offset,
    })
}

pub fn parse_paging(params: &HashMap<String, String>) -> Result<(i64, i64)> {
    let limit = match params.get("limit").map(|raw| raw.trim()) {
        None | Some("") => REST_DEFAULT_LIMIT,
        Some(raw) => raw.parse().map_err(|_| {
            ServiceError::InvalidQuery("limit and offset must be integers.".into())
        })?,
    };
    let offset = match params.get("offset").map(|raw| raw.trim()) {
        None | Some("") => 0,
        Some(raw) => raw.parse().map_err(|_| {
            ServiceError::InvalidQuery("limit and offset must be integers.".into())
        })?,
    };

    if !(1..=REST_MAX_LIMIT).contains(&limit) {
        return Err(ServiceError::InvalidQuery(format!(
            "limit must be between 1 and {REST_MAX_LIMIT}."
        )));
    }
    if offset < 0 {
        return Err(ServiceError::InvalidQuery(
            "offset must be zero or greater.".into(),
        ));
    }

    Ok((limit, offset))
}

fn non_blank(raw: Option<&String>) -> Option<String> {
    raw.map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GRID_COLUMNS;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn grid_defaults_on_empty_input() {
        let query = parse_grid_query(&params(&[]), GRID_COLUMNS.len());
        assert_eq!(query.draw, 0);
        assert_eq!(query.start, 0);
        assert_eq!(query.length, GRID_DEFAULT_LENGTH);
        assert!(query.search.is_empty());
        assert!(query.directives.is_empty());
        assert!(query.sort.is_none());
    }

    #[test]
    fn grid_never_fails_on_garbage() {
        let query = parse_grid_query(
            &params(&[
                ("start", "abc"),
                ("length", "!!"),
                ("order[0][column]", "99"),
                ("order[0][dir]", "sideways"),
            ]),
            GRID_COLUMNS.len(),
        );
        assert_eq!(query.start, 0);
        assert_eq!(query.length, GRID_DEFAULT_LENGTH);
        assert!(query.sort.is_none());
    }

    #[test]
    fn logic_triple_takes_precedence_over_plain_value() {
        let query = parse_grid_query(
            &params(&[
                ("columns[0][search][value]", "plain"),
                ("columns[0][columnControl][search][value]", "qualified"),
                ("columns[0][columnControl][search][logic]", "starts"),
            ]),
            GRID_COLUMNS.len(),
        );
        assert_eq!(query.directives.len(), 1);
        assert_eq!(query.directives[0].logic, FilterLogic::Starts);
        assert_eq!(query.directives[0].value, "qualified");
    }

    #[test]
    fn presence_logic_needs_no_value_other_logics_do() {
        let query = parse_grid_query(
            &params(&[
                ("columns[0][columnControl][search][logic]", "empty"),
                ("columns[1][columnControl][search][logic]", "equal"),
            ]),
            GRID_COLUMNS.len(),
        );
        assert_eq!(query.directives.len(), 1);
        assert_eq!(query.directives[0].column_index, 0);
        assert_eq!(query.directives[0].logic, FilterLogic::Empty);
    }

    #[test]
    fn unknown_logic_falls_back_to_contains() {
        assert_eq!(FilterLogic::parse("fuzzyMatch"), FilterLogic::Contains);
    }

    #[test]
    fn numeric_type_hint_is_recorded() {
        let query = parse_grid_query(
            &params(&[
                ("columns[12][columnControl][search][value]", "15.9"),
                ("columns[12][columnControl][search][logic]", "greater"),
                ("columns[12][columnControl][search][type]", "num"),
            ]),
            GRID_COLUMNS.len(),
        );
        assert!(query.directives[0].numeric_hint);
    }

    #[test]
    fn sort_out_of_range_is_dropped() {
        let query = parse_grid_query(
            &params(&[("order[0][column]", "14"), ("order[0][dir]", "desc")]),
            GRID_COLUMNS.len(),
        );
        assert!(query.sort.is_none());
    }

    #[test]
    fn rest_rejects_non_integer_district_id() {
        let err = parse_rest_query(&params(&[("naziv_gc_id", "abc")])).unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn rest_paging_bounds() {
        assert!(parse_paging(&params(&[("limit", "0")])).is_err());
        assert!(parse_paging(&params(&[("limit", "201")])).is_err());
        assert!(parse_paging(&params(&[("offset", "-1")])).is_err());
        assert!(parse_paging(&params(&[("limit", "abc")])).is_err());

        let (limit, offset) = parse_paging(&params(&[])).unwrap();
        assert_eq!((limit, offset), (REST_DEFAULT_LIMIT, 0));

        let (limit, offset) =
            parse_paging(&params(&[("limit", "200"), ("offset", "30")])).unwrap();
        assert_eq!((limit, offset), (200, 30));
    }

    #[test]
    fn rest_equality_filters_are_lowercased() {
        let query = parse_rest_query(&params(&[
            ("status_odrz", " Aktivan "),
            ("aktivan_da_ne", "DA"),
            ("naziv_gc_id", " 7 "),
        ]))
        .unwrap();
        assert_eq!(query.status.as_deref(), Some("aktivan"));
        assert_eq!(query.active.as_deref(), Some("da"));
        assert_eq!(query.district_id, Some(7));
    }
}
