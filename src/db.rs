//! Connection pool and row decoding.
//!
//! The pool handle is an explicitly injected capability; nothing in the
//! crate holds a module-level connection.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bb8::{ManageConnection, Pool};
use serde_json::{Map, Number, Value};
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Config as PgConfig, NoTls, Row};
use tracing::{error, info};

pub type PgPool = Pool<PgConnectionManager>;

pub async fn connect_pool(config: &AppConfig) -> Result<PgPool> {
    let manager = PgConnectionManager::new(&config.database_url)?;
    let pool = Pool::builder()
        .max_size(config.max_pool_size)
        .build(manager)
        .await
        .context("failed to build PostgreSQL connection pool")?;

    // Perform a one-time connectivity check so we fail fast if credentials are wrong.
    match pool.get().await {
        Ok(_) => info!("database connectivity check succeeded"),
        Err(err) => error!(error = ?err, "initial database connectivity check failed"),
    }

    Ok(pool)
}

#[derive(Clone)]
pub struct PgConnectionManager {
    config: PgConfig,
}

impl PgConnectionManager {
    fn new(database_url: &str) -> Result<Self> {
        let config = database_url
            .parse::<PgConfig>()
            .context("invalid DATABASE_URL")?;
        Ok(Self { config })
    }
}

#[async_trait]
impl ManageConnection for PgConnectionManager {
    type Connection = Client;
    type Error = tokio_postgres::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let (client, connection) = self.config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "database connection task ended");
            }
        });
        Ok(client)
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.batch_execute("SELECT 1").await
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}

/// Decodes one row into an ordered JSON object keyed by the select-list
/// aliases. Numeric storage reaches this point already cast to `float8`, so
/// no arbitrary-precision value ever leaves as an opaque type.
pub fn row_to_json(row: &Row) -> Value {
    let mut object = Map::with_capacity(row.columns().len());
    for (index, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), decode_value(row, index));
    }
    Value::Object(object)
}

pub fn rows_to_json(rows: &[Row]) -> Vec<Value> {
    rows.iter().map(row_to_json).collect()
}

fn decode_value(row: &Row, index: usize) -> Value {
    let column_type = row.columns()[index].type_();
    if *column_type == Type::INT2 {
        row.get::<_, Option<i16>>(index)
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null)
    } else if *column_type == Type::INT4 {
        row.get::<_, Option<i32>>(index)
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null)
    } else if *column_type == Type::INT8 {
        row.get::<_, Option<i64>>(index)
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null)
    } else if *column_type == Type::FLOAT4 {
        float_value(row.get::<_, Option<f32>>(index).map(f64::from))
    } else if *column_type == Type::FLOAT8 {
        float_value(row.get::<_, Option<f64>>(index))
    } else if *column_type == Type::BOOL {
        row.get::<_, Option<bool>>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null)
    } else {
        row.get::<_, Option<String>>(index)
            .map(Value::String)
            .unwrap_or(Value::Null)
    }
}

fn float_value(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Reads a single `COUNT(*)`-style result.
pub fn first_i64(rows: &[Row]) -> i64 {
    rows.first().map(|row| row.get::<_, i64>(0)).unwrap_or(0)
}
