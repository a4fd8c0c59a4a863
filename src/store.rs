//! Database-facing operations. Every mutating statement sequence runs
//! inside a transaction: commit exactly once on success, rollback on drop
//! for any failure, so a partial write is never visible.

use crate::clause::sql_params;
use crate::db::{self, PgPool};
use crate::error::{Result, ServiceError};
use crate::filters::{GridQuery, RestQuery};
use crate::payload::NormalizedPayload;
use crate::sql::{self, Statement, WhereClause};
use serde_json::Value;
use tracing::debug;

#[derive(Clone)]
pub struct WellStore {
    pool: PgPool,
}

/// One resolved grid page plus its counts.
#[derive(Debug)]
pub struct GridPage {
    pub total: i64,
    pub filtered: i64,
    pub rows: Vec<Value>,
}

impl WellStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<bb8::PooledConnection<'_, crate::db::PgConnectionManager>> {
        self.pool.get().await.map_err(|err| {
            ServiceError::Storage(format!("failed to acquire database connection: {err}"))
        })
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<tokio_postgres::Row>> {
        debug!(sql = %statement.sql, binds = statement.binds.len(), "executing query");
        let conn = self.conn().await?;
        let rows = conn
            .query(statement.sql.as_str(), &sql_params(&statement.binds))
            .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &WhereClause) -> Result<i64> {
        let rows = self.query(&sql::count_query(filter)).await?;
        Ok(db::first_i64(&rows))
    }

    /// Counts and page rows for the grid surface: unfiltered total, filtered
    /// count (equal to total when unconditioned), then the ordered page.
    pub async fn grid_page(&self, query: &GridQuery) -> Result<GridPage> {
        let filter = sql::grid_where(query);
        let total = self.count(&sql::UNFILTERED).await?;
        let filtered = if filter.is_empty() {
            total
        } else {
            self.count(&filter).await?
        };
        let rows = self.query(&sql::grid_page_query(query, &filter)).await?;

        Ok(GridPage {
            total,
            filtered,
            rows: db::rows_to_json(&rows),
        })
    }

    /// Export rows: same filters as the grid, fixed order, no paging.
    pub async fn export_rows(&self, query: &GridQuery) -> Result<Vec<Value>> {
        let filter = sql::grid_where(query);
        let rows = self.query(&sql::export_query(&filter)).await?;
        Ok(db::rows_to_json(&rows))
    }

    /// Full snapshot rows: the whole dataset in export order.
    pub async fn snapshot_rows(&self) -> Result<Vec<Value>> {
        let rows = self.query(&sql::export_query(&sql::UNFILTERED)).await?;
        Ok(db::rows_to_json(&rows))
    }

    pub async fn rest_list(&self, query: &RestQuery) -> Result<(i64, Vec<Value>)> {
        let filter = sql::rest_where(query);
        let total = self.count(&filter).await?;
        let rows = self
            .query(&sql::rest_page_query(&filter, query.limit, query.offset))
            .await?;
        Ok((total, db::rows_to_json(&rows)))
    }

    pub async fn get(&self, id: i64) -> Result<Option<Value>> {
        let rows = self.query(&sql::rest_get_query(id)).await?;
        Ok(rows.first().map(db::row_to_json))
    }

    pub async fn district_exists(&self, id: i64) -> Result<bool> {
        let conn = self.conn().await?;
        let rows = conn
            .query("SELECT 1 FROM gradska_cetvrt WHERE id = $1::int8", &[&id])
            .await?;
        Ok(!rows.is_empty())
    }

    /// Inserts a validated payload and reads the stored resource back.
    pub async fn create(&self, payload: &NormalizedPayload) -> Result<Value> {
        let (statement, binds) = insert_statement(payload);

        let new_id = {
            let mut conn = self.conn().await?;
            let tx = conn.transaction().await?;
            let row = tx.query_one(statement.as_str(), &sql_params(&binds)).await?;
            tx.commit().await?;
            i64::from(row.get::<_, i32>(0))
        };

        self.get(new_id).await?.ok_or_else(|| {
            ServiceError::Storage(format!("created row {new_id} could not be read back"))
        })
    }

    /// Applies a partial update, 404 when the identifier does not exist.
    pub async fn update(&self, id: i64, payload: &NormalizedPayload) -> Result<Value> {
        let (statement, binds) = update_statement(id, payload);

        {
            let mut conn = self.conn().await?;
            let tx = conn.transaction().await?;
            let rows = tx.query(statement.as_str(), &sql_params(&binds)).await?;
            if rows.is_empty() {
                // Dropping the transaction rolls it back.
                return Err(not_found(id));
            }
            tx.commit().await?;
        }

        self.get(id)
            .await?
            .ok_or_else(|| ServiceError::Storage(format!("updated row {id} could not be read back")))
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await?;
        let rows = tx
            .query("DELETE FROM zdenac WHERE id = $1::int8 RETURNING id", &[&id])
            .await?;
        if rows.is_empty() {
            return Err(not_found(id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Record counts grouped by maintenance status, most frequent first.
    pub async fn status_summary(&self) -> Result<Vec<Value>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT COALESCE(status_odrz, 'Unknown') AS status, COUNT(*) AS total \
                 FROM zdenac GROUP BY status ORDER BY total DESC",
                &[],
            )
            .await?;
        Ok(db::rows_to_json(&rows))
    }

    pub async fn coordinates(&self, limit: i64, offset: i64) -> Result<Vec<Value>> {
        let rows = self.query(&sql::coordinates_query(limit, offset)).await?;
        Ok(db::rows_to_json(&rows))
    }

    /// District list with child record counts, ordered by name.
    pub async fn districts(&self) -> Result<Vec<Value>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT g.id AS id, g.naziv_gc AS naziv_gc, COUNT(z.id) AS total_wells \
                 FROM gradska_cetvrt g LEFT JOIN zdenac z ON z.naziv_gc_id = g.id \
                 GROUP BY g.id, g.naziv_gc ORDER BY g.naziv_gc ASC",
                &[],
            )
            .await?;
        Ok(db::rows_to_json(&rows))
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Well {id} not found."))
}

/// Column names come from the static whitelist, values travel as binds with
/// per-type placeholder casts.
fn insert_statement(payload: &NormalizedPayload) -> (String, Vec<crate::clause::BindValue>) {
    let columns: Vec<&str> = payload.iter().map(|(key, _)| *key).collect();
    let placeholders: Vec<&str> = payload
        .iter()
        .map(|(_, value)| value.placeholder())
        .collect();
    let binds = payload.iter().map(|(_, value)| value.bind()).collect();

    let statement = sql::rewrite_placeholders(&format!(
        "INSERT INTO zdenac ({}) VALUES ({}) RETURNING id",
        columns.join(", "),
        placeholders.join(", ")
    ));
    (statement, binds)
}

fn update_statement(id: i64, payload: &NormalizedPayload) -> (String, Vec<crate::clause::BindValue>) {
    let assignments: Vec<String> = payload
        .iter()
        .map(|(key, value)| format!("{key} = {}", value.placeholder()))
        .collect();
    let mut binds: Vec<crate::clause::BindValue> =
        payload.iter().map(|(_, value)| value.bind()).collect();
    binds.push(crate::clause::BindValue::Int(id));

    let statement = sql::rewrite_placeholders(&format!(
        "UPDATE zdenac SET {} WHERE id = ?::int8 RETURNING id",
        assignments.join(", ")
    ));
    (statement, binds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldType;
    use crate::clause::BindValue;
    use crate::payload::FieldValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_statement_casts_each_placeholder() {
        let payload: NormalizedPayload = vec![
            ("lokacija", FieldValue::Text("Trg".into())),
            ("lon", FieldValue::Num(15.9)),
            ("naziv_gc_id", FieldValue::Null(FieldType::Int)),
        ];
        let (sql, binds) = insert_statement(&payload);
        assert_eq!(
            sql,
            "INSERT INTO zdenac (lokacija, lon, naziv_gc_id) \
             VALUES ($1::text, $2::float8, $3::int8) RETURNING id"
        );
        assert_eq!(
            binds,
            vec![
                BindValue::Text("Trg".into()),
                BindValue::Float(15.9),
                BindValue::NullInt,
            ]
        );
    }

    #[test]
    fn update_statement_appends_path_identifier() {
        let payload: NormalizedPayload = vec![("status_odrz", FieldValue::Text("aktivan".into()))];
        let (sql, binds) = update_statement(12, &payload);
        assert_eq!(
            sql,
            "UPDATE zdenac SET status_odrz = $1::text WHERE id = $2::int8 RETURNING id"
        );
        assert_eq!(
            binds,
            vec![BindValue::Text("aktivan".into()), BindValue::Int(12)]
        );
    }
}
