//! Sort compiler.
//!
//! `sort=<clause>(,<clause>)*` where a clause is `[dir:]name` and `dir` is
//! one of `a`, `asc`, `d` or `desc` (ascending when omitted). Names are
//! validated against the table's columns plus registered virtual fields and
//! aliases, then emitted as case-insensitive `ORDER BY` clauses.

use crate::database::Query;
use crate::error::{HubError, Result};
use crate::schema::Table;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    name: String,
    descending: bool,
}

/// Sort builder for one table.
#[derive(Debug, Clone, Default)]
pub struct Sort {
    /// Accepted (lowercased) name -> emitted column.
    fields: HashMap<String, String>,
    clauses: Vec<Clause>,
}

impl Sort {
    /// Accept the columns of `table`, by column name (`create_time`) or by
    /// its camelCase form (`createTime`).
    pub fn new(table: &Table) -> Self {
        let mut fields = HashMap::new();
        for column in table.column_names() {
            fields.insert(column.to_lowercase(), column.to_string());
            fields.insert(column.replace('_', "").to_lowercase(), column.to_string());
        }
        Self {
            fields,
            clauses: Vec::new(),
        }
    }

    /// Register a virtual field `name` reachable through `aliases`.
    pub fn add(mut self, name: &str, aliases: &[&str]) -> Self {
        self.fields.insert(name.to_lowercase(), name.to_string());
        for alias in aliases {
            self.fields.insert(alias.to_lowercase(), name.to_string());
        }
        self
    }

    /// Parse a `sort` parameter; empty input sorts nothing.
    pub fn with(mut self, param: &str) -> Result<Self> {
        if param.trim().is_empty() {
            return Ok(self);
        }
        for part in param.split(',') {
            let part = part.trim().to_lowercase();
            let (direction, name) = match part.find(':') {
                Some(mark) => (&part[..mark], &part[mark + 1..]),
                None => ("", part.as_str()),
            };
            let descending = match direction {
                "" | "a" | "asc" => false,
                "d" | "desc" => true,
                other => {
                    return Err(HubError::Sort {
                        name: other.to_string(),
                    })
                }
            };
            let resolved = self
                .fields
                .get(name)
                .ok_or_else(|| HubError::Sort {
                    name: name.to_string(),
                })?
                .clone();
            self.clauses.push(Clause {
                name: resolved,
                descending,
            });
        }
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Append the ORDER BY clauses to `query`.
    pub fn sorted(&self, mut query: Query) -> Query {
        for clause in &self.clauses {
            let mut sql = format!("{} COLLATE NOCASE", clause.name);
            if clause.descending {
                sql.push_str(" DESC");
            }
            query = query.order_by(sql);
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn test_sorted() {
        let sort = Sort::new(&schema::APPLICATION)
            .with("name,d:createTime,asc:id")
            .unwrap();
        let (sql, _) = sort.sorted(Query::select("application")).to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM application ORDER BY name COLLATE NOCASE,create_time COLLATE NOCASE DESC,id COLLATE NOCASE"
        );
    }

    #[test]
    fn test_unknown_field() {
        let err = Sort::new(&schema::TAG).with("name,color").unwrap_err();
        assert_eq!(err.to_string(), "'color' not supported.");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_unknown_direction() {
        let err = Sort::new(&schema::TAG).with("x:name").unwrap_err();
        assert_eq!(err.to_string(), "'x' not supported.");
        assert!(Sort::new(&schema::TAG).with("descending:name").is_err());
        assert!(Sort::new(&schema::TAG).with("a:name,D:id").is_ok());
    }

    #[test]
    fn test_alias() {
        let sort = Sort::new(&schema::TAG)
            .add("tag_category.name", &["category", "category.name"])
            .with("desc:Category")
            .unwrap();
        let (sql, _) = sort.sorted(Query::select("tag")).to_sql();
        assert!(sql.ends_with("ORDER BY tag_category.name COLLATE NOCASE DESC"));
    }

    #[test]
    fn test_empty() {
        let sort = Sort::new(&schema::TAG).with("").unwrap();
        assert!(sort.is_empty());
    }
}
