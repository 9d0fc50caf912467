//! [`RecordStore`] over a pooled SQLite database.
//!
//! Queries are compiled to parameterised SQL; identifiers are only ever taken
//! from the table's column whitelist, values always travel as parameters.

use super::{Filter, Order, Pool, Query, RecordStore, Row, Scalar, StoreError, Table};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::Value;

/// SQL name of the Unicode lower-casing function. SQLite's own `LOWER`
/// only folds ASCII, so `É` would never match `é`.
pub(crate) const FOLD_CASE: &str = "fold_case";

/// Register the scalar functions compiled queries rely on. Must run on every
/// pooled connection.
pub(crate) fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(t) => Some(String::from_utf8_lossy(t).to_lowercase()),
                _ => None,
            })
        },
    )
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    async fn select(&self, query: Query) -> Result<Vec<Row>, StoreError> {
        query.validate()?;
        self.with_conn(move |conn| {
            let (sql, params) = build_select(&query, false);
            let mut stmt = conn.prepare(&sql)?;
            let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

            let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
                let mut out = Row::new();
                for (i, name) in names.iter().enumerate() {
                    out.insert(name.clone(), to_json(row.get_ref(i)?));
                }
                Ok(out)
            })?;

            let mut result = Vec::new();
            for r in rows {
                result.push(r?);
            }
            Ok(result)
        })
        .await
    }

    async fn count(&self, query: Query) -> Result<u64, StoreError> {
        query.validate()?;
        self.with_conn(move |conn| {
            let (sql, params) = build_select(&query, true);
            let n: i64 = conn.query_row(&sql, rusqlite::params_from_iter(params), |row| {
                row.get(0)
            })?;
            Ok(n.max(0) as u64)
        })
        .await
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<usize, StoreError> {
        for row in &rows {
            if row.is_empty() {
                return Err(StoreError::EmptyRow(table.name()));
            }
            for column in row.keys() {
                table.check(column)?;
            }
        }

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            for row in &rows {
                let columns: Vec<&str> = row.keys().map(String::as_str).collect();
                let placeholders: Vec<String> =
                    (1..=columns.len()).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table.name(),
                    columns.join(", "),
                    placeholders.join(", ")
                );
                let params: Vec<SqlValue> = row.values().map(from_json).collect();
                inserted += tx.execute(&sql, rusqlite::params_from_iter(params))?;
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn update(&self, table: Table, key: &str, changes: Row) -> Result<usize, StoreError> {
        if changes.is_empty() {
            return Err(StoreError::EmptyRow(table.name()));
        }
        for column in changes.keys() {
            table.check(column)?;
        }

        let key = key.to_string();
        self.with_conn(move |conn| {
            let sets: Vec<String> = changes
                .keys()
                .enumerate()
                .map(|(i, c)| format!("{c} = ?{}", i + 1))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?{}",
                table.name(),
                sets.join(", "),
                table.key(),
                changes.len() + 1
            );
            let mut params: Vec<SqlValue> = changes.values().map(from_json).collect();
            params.push(SqlValue::Text(key));
            Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
        })
        .await
    }
}

/// Compile `query` to SQL plus positional parameters.
///
/// With `count` set the projection, ordering and limit are replaced by
/// `COUNT(*)`.
pub(crate) fn build_select(query: &Query, count: bool) -> (String, Vec<SqlValue>) {
    let projection = if count {
        "COUNT(*)".to_string()
    } else {
        match &query.columns {
            Some(cols) if !cols.is_empty() => cols.join(", "),
            _ => "*".to_string(),
        }
    };

    let mut sql = format!("SELECT {projection} FROM {}", query.table.name());
    let mut params: Vec<SqlValue> = Vec::new();

    let mut clauses = Vec::new();
    for filter in &query.filters {
        clauses.push(compile_filter(filter, &mut params));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    if !count {
        if !query.order.is_empty() {
            let terms: Vec<String> = query
                .order
                .iter()
                .map(|(c, o)| match o {
                    Order::Asc => format!("{c} ASC"),
                    Order::Desc => format!("{c} DESC"),
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if let Some(limit) = query.limit {
            params.push(SqlValue::Integer(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }
    }

    (sql, params)
}

fn compile_filter(filter: &Filter, params: &mut Vec<SqlValue>) -> String {
    fn bind(v: &Scalar, params: &mut Vec<SqlValue>) -> String {
        params.push(to_sql(v));
        format!("?{}", params.len())
    }

    match filter {
        Filter::Eq(c, v) => format!("{c} = {}", bind(v, params)),
        Filter::Neq(c, v) => format!("{c} != {}", bind(v, params)),
        Filter::Gt(c, v) => format!("{c} > {}", bind(v, params)),
        Filter::Gte(c, v) => format!("{c} >= {}", bind(v, params)),
        Filter::Lt(c, v) => format!("{c} < {}", bind(v, params)),
        Filter::Lte(c, v) => format!("{c} <= {}", bind(v, params)),
        Filter::In(c, values) => {
            if values.is_empty() {
                // IN () matches nothing
                return "0 = 1".to_string();
            }
            let slots: Vec<String> = values.iter().map(|v| bind(v, params)).collect();
            format!("{c} IN ({})", slots.join(", "))
        }
        Filter::ILike(c, pattern) => {
            let escaped = pattern
                .to_lowercase()
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            params.push(SqlValue::Text(format!("%{escaped}%")));
            format!("{FOLD_CASE}({c}) LIKE ?{} ESCAPE '\\'", params.len())
        }
        Filter::IsNull(c) => format!("{c} IS NULL"),
        Filter::NotNull(c) => format!("{c} IS NOT NULL"),
    }
}

fn to_sql(v: &Scalar) -> SqlValue {
    match v {
        Scalar::Null => SqlValue::Null,
        Scalar::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Scalar::Int(i) => SqlValue::Integer(*i),
        Scalar::Real(f) => SqlValue::Real(*f),
        Scalar::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_json(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn to_json(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}
