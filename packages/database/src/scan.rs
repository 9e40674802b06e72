//! Conjunctive scan builder over a zipcode table.

use std::fmt::Write as _;

use duckdb::types::Value;
use duckdb::{Connection, params_from_iter};

use crate::DbError;
use crate::table::ZipcodeTable;

/// A filtered, ordered, bounded SELECT against one zipcode table.
///
/// Clauses combine with AND and values are always bound parameters.
/// Clause text and order-by columns come from the query layer's fixed
/// predicate set, never from caller input.
#[derive(Debug, Default)]
pub struct Scan {
    clauses: Vec<String>,
    params: Vec<Value>,
    order_by: Option<(String, bool)>,
    limit: Option<usize>,
}

impl Scan {
    /// Creates an unfiltered scan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an AND clause with its bound parameters.
    #[must_use]
    pub fn and_where(mut self, clause: &str, params: impl IntoIterator<Item = Value>) -> Self {
        self.clauses.push(clause.to_string());
        self.params.extend(params);
        self
    }

    /// Orders results by `column`, ascending or descending, with a
    /// `zipcode` tiebreak for stable output on equal keys.
    #[must_use]
    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order_by = Some((column.to_string(), ascending));
        self
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Executes the scan, decoding each row into a record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or any row fails to decode;
    /// a corrupt row aborts the scan with its key attached rather than
    /// being dropped.
    pub fn fetch<T: ZipcodeTable>(&self, conn: &Connection) -> Result<Vec<T>, DbError> {
        let sql = self.to_sql::<T>();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(self.params.clone()))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(T::from_row(row)?);
        }

        log::debug!("Scan over {} returned {} rows", T::TABLE, records.len());

        Ok(records)
    }

    fn to_sql<T: ZipcodeTable>(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", T::COLUMNS.join(", "), T::TABLE);

        if !self.clauses.is_empty() {
            let _ = write!(sql, " WHERE {}", self.clauses.join(" AND "));
        }

        if let Some((column, ascending)) = &self.order_by {
            let direction = if *ascending { "ASC" } else { "DESC" };
            let _ = write!(sql, " ORDER BY {column} {direction}");
            if column != "zipcode" {
                sql.push_str(", zipcode ASC");
            }
        }

        if let Some(limit) = self.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use zip_atlas_models::SimpleZipcode;

    use super::*;

    #[test]
    fn builds_bare_select() {
        let sql = Scan::new().to_sql::<SimpleZipcode>();
        assert!(sql.starts_with("SELECT zipcode, zipcode_type"));
        assert!(sql.ends_with("FROM simple_zipcode"));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn joins_clauses_with_and() {
        let sql = Scan::new()
            .and_where("lat BETWEEN ? AND ?", [Value::Double(1.0), Value::Double(2.0)])
            .and_where("lng BETWEEN ? AND ?", [Value::Double(3.0), Value::Double(4.0)])
            .to_sql::<SimpleZipcode>();
        assert!(sql.contains("WHERE lat BETWEEN ? AND ? AND lng BETWEEN ? AND ?"));
    }

    #[test]
    fn orders_with_zipcode_tiebreak() {
        let sql = Scan::new()
            .order_by("population", false)
            .limit(10)
            .to_sql::<SimpleZipcode>();
        assert!(sql.ends_with("ORDER BY population DESC, zipcode ASC LIMIT 10"));
    }

    #[test]
    fn zipcode_order_has_no_tiebreak() {
        let sql = Scan::new().order_by("zipcode", true).to_sql::<SimpleZipcode>();
        assert!(sql.ends_with("ORDER BY zipcode ASC"));
    }
}
