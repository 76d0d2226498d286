use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde_json::Value;
use sqlx::mssql::{Mssql, MssqlArguments, MssqlPool, MssqlRow};
use sqlx::query::Query;
use sqlx::{Column as _, Row as _};

use super::{Executor, SqlResult};
use crate::statement::Statement;
use crate::value::SqlValue;
use crate::{QueryError, QueryResult};

/// [Executor] over a `sqlx` SQL Server pool.
#[derive(Clone, Debug)]
pub struct MssqlExecutor {
    pool: MssqlPool,
}

impl MssqlExecutor {
    pub fn new(pool: MssqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> QueryResult<Self> {
        Ok(Self::new(MssqlPool::connect(url).await?))
    }

    pub fn pool(&self) -> &MssqlPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for MssqlExecutor {
    async fn execute(&self, statement: &Statement) -> QueryResult<SqlResult> {
        let mut query = sqlx::query(statement.sql());
        for value in statement.params() {
            query = bind(query, value);
        }

        let mut rows = query.fetch(&self.pool);
        let mut result = SqlResult::default();
        while let Some(row) = rows.try_next().await? {
            if result.columns.is_empty() {
                result.columns = row
                    .columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect();
            }
            let mut cells = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                cells.push(decode(&row, index)?);
            }
            result.rows.push(cells);
        }
        Ok(result)
    }
}

fn bind<'q>(
    query: Query<'q, Mssql, MssqlArguments>,
    value: &SqlValue,
) -> Query<'q, Mssql, MssqlArguments> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Bool(value) => query.bind(*value),
        SqlValue::Int(value) => query.bind(*value),
        SqlValue::Float(value) => query.bind(*value),
        SqlValue::Text(value) => query.bind(value.clone()),
    }
}

/// Try each supported type in turn; `try_get` fails on a type mismatch.
macro_rules! decode_as {
    ($row:expr, $index:expr, $ty:ty, $into:expr) => {
        if let Ok(value) = $row.try_get::<Option<$ty>, _>($index) {
            return Ok(value.map($into).unwrap_or(Value::Null));
        }
    };
}

fn decode(row: &MssqlRow, index: usize) -> QueryResult<Value> {
    decode_as!(row, index, i64, Value::from);
    decode_as!(row, index, i32, Value::from);
    decode_as!(row, index, i16, Value::from);
    decode_as!(row, index, bool, Value::from);
    decode_as!(row, index, String, Value::from);
    decode_as!(row, index, f64, float);
    decode_as!(row, index, f32, |value: f32| float(f64::from(value)));

    Err(QueryError::UnsupportedValue {
        column: row
            .columns()
            .get(index)
            .map(|column| column.name().to_string())
            .unwrap_or_else(|| index.to_string()),
    })
}

fn float(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
