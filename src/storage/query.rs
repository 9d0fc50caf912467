//! Backend-neutral query description: filters, projection, ordering, limit.

use super::StoreError;
use crate::model::AnomalyStatus;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Tables reachable through the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Anomalies,
    MaintenanceWindows,
    ChatConversations,
    Profiles,
    ImportBatches,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Anomalies => "anomalies",
            Table::MaintenanceWindows => "maintenance_windows",
            Table::ChatConversations => "chat_conversations",
            Table::Profiles => "profiles",
            Table::ImportBatches => "import_batches",
        }
    }

    /// Column used to address a single row.
    pub fn key(&self) -> &'static str {
        match self {
            Table::Profiles => "email",
            _ => "id",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Anomalies => &[
                "id",
                "status",
                "created_at",
                "updated_at",
                "equipment_id",
                "description",
                "system_id",
                "service",
                "source",
                "final_fiabilite_integrite",
                "final_disponibilite",
                "final_process_safety",
                "user_fiabilite_integrite",
                "user_disponibilite",
                "user_process_safety",
                "use_user_scores",
                "estimated_hours",
                "maintenance_window_id",
                "import_batch_id",
            ],
            Table::MaintenanceWindows => &[
                "id",
                "start_date",
                "duration_days",
                "status",
                "window_type",
                "description",
            ],
            Table::ChatConversations => &["id", "message", "response", "context", "created_at"],
            Table::Profiles => &[
                "email",
                "name",
                "phone",
                "department",
                "role",
                "avatar",
                "last_login",
                "updated_at",
            ],
            Table::ImportBatches => &["id", "filename", "total_records", "status", "created_at"],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Reject `column` unless it belongs to this table.
    pub fn check(&self, column: &str) -> Result<(), StoreError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                table: self.name(),
                column: column.to_string(),
            })
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Real(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<AnomalyStatus> for Scalar {
    fn from(v: AnomalyStatus) -> Self {
        Scalar::Text(v.as_str().to_string())
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(v: DateTime<Utc>) -> Self {
        Scalar::Text(v.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl From<NaiveDate> for Scalar {
    fn from(v: NaiveDate) -> Self {
        Scalar::Text(v.format("%Y-%m-%d").to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, Scalar),
    Neq(&'static str, Scalar),
    Gt(&'static str, Scalar),
    Gte(&'static str, Scalar),
    Lt(&'static str, Scalar),
    Lte(&'static str, Scalar),
    In(&'static str, Vec<Scalar>),
    /// Case-insensitive substring match.
    ILike(&'static str, String),
    IsNull(&'static str),
    NotNull(&'static str),
}

impl Filter {
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::Gt(c, _)
            | Filter::Gte(c, _)
            | Filter::Lt(c, _)
            | Filter::Lte(c, _)
            | Filter::In(c, _)
            | Filter::ILike(c, _)
            | Filter::IsNull(c)
            | Filter::NotNull(c) => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    /// `None` selects every column.
    pub columns: Option<Vec<&'static str>>,
    pub filters: Vec<Filter>,
    pub order: Vec<(&'static str, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: &[&'static str]) -> Self {
        self.columns = Some(columns.to_vec());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filter(Filter::Eq(column, value.into()))
    }

    pub fn neq(self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filter(Filter::Neq(column, value.into()))
    }

    pub fn gt(self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filter(Filter::Gt(column, value.into()))
    }

    pub fn gte(self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filter(Filter::Gte(column, value.into()))
    }

    pub fn lt(self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filter(Filter::Lt(column, value.into()))
    }

    pub fn lte(self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filter(Filter::Lte(column, value.into()))
    }

    pub fn in_list<V: Into<Scalar>>(
        self,
        column: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filter(Filter::In(
            column,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn ilike(self, column: &'static str, pattern: impl Into<String>) -> Self {
        self.filter(Filter::ILike(column, pattern.into()))
    }

    pub fn is_null(self, column: &'static str) -> Self {
        self.filter(Filter::IsNull(column))
    }

    pub fn not_null(self, column: &'static str) -> Self {
        self.filter(Filter::NotNull(column))
    }

    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order.push((column, order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Every referenced column must belong to the table.
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(cols) = &self.columns {
            for c in cols {
                self.table.check(c)?;
            }
        }
        for f in &self.filters {
            self.table.check(f.column())?;
        }
        for (c, _) in &self.order {
            self.table.check(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_filters() {
        let q = Query::table(Table::Anomalies)
            .select(&["id", "status"])
            .in_list("status", AnomalyStatus::OPEN)
            .ilike("equipment_id", "P-101")
            .order_by("created_at", Order::Desc)
            .limit(5);

        assert_eq!(q.filters.len(), 2);
        assert_eq!(
            q.filters[0],
            Filter::In(
                "status",
                vec![Scalar::from("new"), Scalar::from("in_progress")]
            )
        );
        assert_eq!(q.limit, Some(5));
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_table_starts_unfiltered() {
        let q = Query::table(Table::ImportBatches);
        assert_eq!(q.table, Table::ImportBatches);
        assert_eq!(q.columns, None);
        assert!(q.filters.is_empty() && q.order.is_empty());
        assert_eq!(q.limit, None);
    }

    #[test]
    fn test_validate_rejects_unknown_column() {
        let q = Query::table(Table::MaintenanceWindows).eq("equipment_id", "P-1");
        let err = q.validate().unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { table: "maintenance_windows", .. }));
    }

    #[test]
    fn test_datetime_scalar_is_utc_seconds() {
        let dt = DateTime::parse_from_rfc3339("2025-01-15T10:30:00.456+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Scalar::from(dt), Scalar::Text("2025-01-15T08:30:00Z".into()));
    }
}
