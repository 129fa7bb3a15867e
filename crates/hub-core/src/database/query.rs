//! SELECT statement builder.
//!
//! Accumulates WHERE fragments with `?` placeholders and their bind values,
//! ORDER BY clauses, and paging. A list bind is expanded so that `IN ?`
//! becomes `IN (?, ?, ...)` when the statement is rendered.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue};

/// Bind value produced by filters and handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Boolean(bool),
    Text(String),
    List(Vec<SqlValue>),
}

impl SqlValue {
    /// Flatten into SQLite values; lists yield their members.
    fn flatten(&self, out: &mut Vec<SqliteValue>) {
        match self {
            SqlValue::Null => out.push(SqliteValue::Null),
            SqlValue::Integer(n) => out.push(SqliteValue::Integer(*n)),
            SqlValue::Boolean(b) => out.push(SqliteValue::Integer(i64::from(*b))),
            SqlValue::Text(s) => out.push(SqliteValue::Text(s.clone())),
            SqlValue::List(items) => items.iter().for_each(|v| v.flatten(out)),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<u64> for SqlValue {
    fn from(n: u64) -> Self {
        SqlValue::Integer(n as i64)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Boolean(b)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(items: Vec<T>) -> Self {
        SqlValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let mut values = Vec::with_capacity(1);
        self.flatten(&mut values);
        match (self, values.pop()) {
            (SqlValue::List(_), _) | (_, None) => Err(rusqlite::Error::ToSqlConversionFailure(
                "list values must be expanded before binding".into(),
            )),
            (_, Some(value)) => Ok(ToSqlOutput::Owned(value)),
        }
    }
}

#[derive(Debug, Clone)]
struct Clause {
    sql: String,
    binds: Vec<SqlValue>,
}

/// SELECT statement under construction.
#[derive(Debug, Clone)]
pub struct Query {
    from: String,
    columns: String,
    clauses: Vec<Clause>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    /// Select all columns from `from` (a table name or join expression).
    pub fn select(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            columns: "*".to_string(),
            clauses: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Replace the select list.
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Add a WHERE fragment; fragments are joined with AND.
    pub fn filter(mut self, sql: impl Into<String>, binds: Vec<SqlValue>) -> Self {
        self.clauses.push(Clause {
            sql: sql.into(),
            binds,
        });
        self
    }

    /// Append an ORDER BY clause.
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order.push(clause.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// True when ORDER BY clauses were added.
    pub fn is_ordered(&self) -> bool {
        !self.order.is_empty()
    }

    /// Render the WHERE clause (including the keyword) and its binds.
    pub fn where_sql(&self) -> (String, Vec<SqliteValue>) {
        let mut values = Vec::new();
        if self.clauses.is_empty() {
            return (String::new(), values);
        }
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| format!("({})", expand(clause, &mut values)))
            .collect();
        (format!(" WHERE {}", parts.join(" AND ")), values)
    }

    /// Render the full statement and its flattened binds.
    pub fn to_sql(&self) -> (String, Vec<SqliteValue>) {
        let (where_sql, values) = self.where_sql();
        let mut sql = format!("SELECT {} FROM {}{}", self.columns, self.from, where_sql);
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(","));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }
        (sql, values)
    }

    /// Render a COUNT(*) over the same FROM and WHERE.
    pub fn count_sql(&self) -> (String, Vec<SqliteValue>) {
        let (where_sql, values) = self.where_sql();
        (format!("SELECT COUNT(*) FROM {}{}", self.from, where_sql), values)
    }
}

/// Replace each `?` by its bind; list binds become `(?, ?, ...)`.
fn expand(clause: &Clause, values: &mut Vec<SqliteValue>) -> String {
    let mut binds = clause.binds.iter();
    let mut sql = String::with_capacity(clause.sql.len());
    for ch in clause.sql.chars() {
        if ch != '?' {
            sql.push(ch);
            continue;
        }
        match binds.next() {
            Some(SqlValue::List(items)) => {
                if items.is_empty() {
                    sql.push_str("(NULL)");
                    continue;
                }
                let marks = vec!["?"; items.len()].join(", ");
                sql.push('(');
                sql.push_str(&marks);
                sql.push(')');
                items.iter().for_each(|v| v.flatten(values));
            }
            Some(value) => {
                sql.push('?');
                value.flatten(values);
            }
            None => sql.push('?'),
        }
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_plain() {
        let (sql, values) = Query::select("tag").to_sql();
        assert_eq!(sql, "SELECT * FROM tag");
        assert!(values.is_empty());
    }

    #[test]
    fn test_list_expansion() {
        let query = Query::select("tag")
            .filter("name = ?", vec!["a".into()])
            .filter("id IN ?", vec![SqlValue::from(vec![1i64, 2, 3])])
            .order_by("name COLLATE NOCASE");
        let (sql, values) = query.to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM tag WHERE (name = ?) AND (id IN (?, ?, ?)) ORDER BY name COLLATE NOCASE"
        );
        assert_eq!(
            values,
            vec![
                SqliteValue::Text("a".into()),
                SqliteValue::Integer(1),
                SqliteValue::Integer(2),
                SqliteValue::Integer(3),
            ]
        );
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let query = Query::select("tag").filter("id IN ?", vec![SqlValue::List(vec![])]);
        assert_eq!(query.to_sql().0, "SELECT * FROM tag WHERE (id IN (NULL))");
    }

    #[test]
    fn test_paging_and_count() {
        let query = Query::select("tag")
            .filter("category_id = ?", vec![SqlValue::Integer(4)])
            .limit(10)
            .offset(20);
        assert_eq!(
            query.to_sql().0,
            "SELECT * FROM tag WHERE (category_id = ?) LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            query.count_sql().0,
            "SELECT COUNT(*) FROM tag WHERE (category_id = ?)"
        );
    }

    #[test]
    fn test_boolean_binds_as_integer() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let n: i64 = conn
            .query_row("SELECT ?", [SqlValue::Boolean(true)], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
        assert!(conn
            .query_row("SELECT ?", [SqlValue::List(vec![])], |row| row.get::<_, i64>(0))
            .is_err());
    }
}
