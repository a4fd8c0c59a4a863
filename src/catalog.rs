//! Fixed column catalogs for the well registry.
//!
//! Two catalogs share the same base source: the grid catalog is positional
//! (filters address columns by index, a compatibility surface with the grid
//! client), the REST catalog additionally exposes the raw identifier and the
//! district foreign key. Both are process-wide constants.

/// One logical column: key on the wire, expression in storage.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub key: &'static str,
    pub expr: &'static str,
    pub searchable: bool,
    pub numeric: bool,
}

const fn col(key: &'static str, expr: &'static str) -> Column {
    Column {
        key,
        expr,
        searchable: true,
        numeric: false,
    }
}

const fn num_col(key: &'static str, expr: &'static str) -> Column {
    Column {
        key,
        expr,
        searchable: true,
        numeric: true,
    }
}

// Identifier columns are integer-typed and decode natively; the numeric
// flag marks decimal storage only.
const fn id_col(key: &'static str, expr: &'static str) -> Column {
    Column {
        key,
        expr,
        searchable: false,
        numeric: false,
    }
}

pub const BASE_FROM: &str =
    "FROM zdenac z LEFT JOIN gradska_cetvrt g ON z.naziv_gc_id = g.id";

/// Grid catalog, in client column order. Index-addressed filters depend on
/// this exact ordering.
pub const GRID_COLUMNS: &[Column] = &[
    col("lokacija", "z.lokacija"),
    col("naziv_gc", "g.naziv_gc"),
    col("tip_zdenca", "z.tip_zdenca"),
    col("status_odrz", "z.status_odrz"),
    col("aktivan_da_ne", "z.aktivan_da_ne"),
    col("teren_dane", "z.teren_dane"),
    col("vlasnik_ki", "z.vlasnik_ki"),
    col("odrzava_ki", "z.odrzava_ki"),
    col("zkc_oznaka", "z.zkc_oznaka"),
    col("broj_vodomjera", "z.broj_vodomjera"),
    col("napomena_teren", "z.napomena_teren"),
    col("pozicija_tocnost", "z.pozicija_tocnost"),
    num_col("lon", "z.lon"),
    num_col("lat", "z.lat"),
];

/// REST catalog: the grid columns plus identifier and foreign key.
pub const REST_COLUMNS: &[Column] = &[
    id_col("id", "z.id"),
    col("lokacija", "z.lokacija"),
    col("tip_zdenca", "z.tip_zdenca"),
    col("status_odrz", "z.status_odrz"),
    col("aktivan_da_ne", "z.aktivan_da_ne"),
    col("teren_dane", "z.teren_dane"),
    col("vlasnik_ki", "z.vlasnik_ki"),
    col("odrzava_ki", "z.odrzava_ki"),
    col("zkc_oznaka", "z.zkc_oznaka"),
    col("broj_vodomjera", "z.broj_vodomjera"),
    col("napomena_teren", "z.napomena_teren"),
    col("pozicija_tocnost", "z.pozicija_tocnost"),
    num_col("lon", "z.lon"),
    num_col("lat", "z.lat"),
    id_col("naziv_gc_id", "z.naziv_gc_id"),
    col("naziv_gc", "g.naziv_gc"),
];

/// Columns returned by the coordinates endpoint.
pub const MAP_COLUMNS: &[Column] = &[
    id_col("id", "z.id"),
    col("lokacija", "z.lokacija"),
    num_col("lon", "z.lon"),
    num_col("lat", "z.lat"),
    col("naziv_gc", "g.naziv_gc"),
];

/// Fixed CSV export column order.
pub const CSV_COLUMNS: &[&str] = &[
    "naziv_gc",
    "lokacija",
    "tip_zdenca",
    "status_odrz",
    "aktivan_da_ne",
    "teren_dane",
    "vlasnik_ki",
    "odrzava_ki",
    "zkc_oznaka",
    "broj_vodomjera",
    "napomena_teren",
    "pozicija_tocnost",
    "lon",
    "lat",
];

/// Per-record keys in the grouped JSON export (district name is the group
/// key, so it is not repeated per item).
pub const JSON_EXPORT_KEYS: &[&str] = &[
    "lokacija",
    "tip_zdenca",
    "status_odrz",
    "aktivan_da_ne",
    "teren_dane",
    "vlasnik_ki",
    "odrzava_ki",
    "zkc_oznaka",
    "broj_vodomjera",
    "napomena_teren",
    "pozicija_tocnost",
    "lon",
    "lat",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Int,
    Num,
}

/// Writable-field whitelist for REST payloads, in normalization order.
pub const PAYLOAD_FIELDS: &[(&str, FieldType)] = &[
    ("id", FieldType::Int),
    ("lokacija", FieldType::Text),
    ("tip_zdenca", FieldType::Text),
    ("status_odrz", FieldType::Text),
    ("aktivan_da_ne", FieldType::Text),
    ("teren_dane", FieldType::Text),
    ("vlasnik_ki", FieldType::Text),
    ("odrzava_ki", FieldType::Text),
    ("zkc_oznaka", FieldType::Text),
    ("broj_vodomjera", FieldType::Text),
    ("napomena_teren", FieldType::Text),
    ("pozicija_tocnost", FieldType::Text),
    ("lon", FieldType::Num),
    ("lat", FieldType::Num),
    ("naziv_gc_id", FieldType::Int),
];

pub fn payload_field(key: &str) -> Option<(&'static str, FieldType)> {
    PAYLOAD_FIELDS
        .iter()
        .find(|(name, _)| *name == key)
        .copied()
}

/// Grid column at a client-supplied position, if in range.
pub fn grid_column(index: usize) -> Option<&'static Column> {
    GRID_COLUMNS.get(index)
}

/// `SELECT` list for a catalog. Numeric storage is `DECIMAL`; casting to
/// `float8` here keeps arbitrary-precision values out of row decoding.
pub fn select_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| {
            if column.numeric {
                format!("CAST({} AS FLOAT8) AS {}", column.expr, column.key)
            } else {
                format!("{} AS {}", column.expr, column.key)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Storage expressions eligible for the REST global search. Identifier and
/// foreign-key columns are excluded.
pub fn rest_search_exprs() -> Vec<&'static str> {
    REST_COLUMNS
        .iter()
        .filter(|column| column.searchable)
        .map(|column| column.expr)
        .collect()
}

/// Storage expressions searched by the grid global search (every column).
pub fn grid_search_exprs() -> Vec<&'static str> {
    GRID_COLUMNS.iter().map(|column| column.expr).collect()
}
