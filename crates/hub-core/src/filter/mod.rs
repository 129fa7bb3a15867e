//! URL filter language.
//!
//! A filter is a comma-separated list of `field op value` predicates carried
//! in the `filter` query parameter:
//!
//! ```text
//! name:elmer,category=(one|two),age>20,tag.id:(1,2),name~app*
//! ```
//!
//! Predicates are validated against a whitelist of [`Assert`]s and compiled
//! to parameterized SQL fragments attached to a [`Query`].

pub mod lexer;
pub mod parser;

pub use lexer::{Token, TokenKind};
pub use parser::{Predicate, Value};

use crate::database::{Query, SqlValue};
use crate::error::{HubError, Result};
use lexer::{AND, COLON, LIKE};

/// Parsed filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// Parse a filter expression.
    pub fn parse(filter: &str) -> Result<Self> {
        Ok(Self {
            predicates: parser::parse(filter)?,
        })
    }

    /// Parse repeated `filter` query parameters joined with `,`.
    pub fn from_params<S: AsRef<str>>(params: &[S]) -> Result<Self> {
        let joined: Vec<&str> = params
            .iter()
            .map(AsRef::as_ref)
            .filter(|s| !s.is_empty())
            .collect();
        Self::parse(&joined.join(","))
    }

    /// Parse and validate in one step.
    pub fn with_asserts<S: AsRef<str>>(params: &[S], asserts: &[Assert]) -> Result<Self> {
        let filter = Self::from_params(params)?;
        filter.validate(asserts)?;
        Ok(filter)
    }

    /// Validate predicates against the whitelist.
    ///
    /// An empty whitelist admits everything.
    pub fn validate(&self, asserts: &[Assert]) -> Result<()> {
        if asserts.is_empty() {
            return Ok(());
        }
        for predicate in &self.predicates {
            let name = &predicate.field.value;
            let assert = asserts
                .iter()
                .find(|a| a.field.eq_ignore_ascii_case(name))
                .ok_or_else(|| HubError::Validation {
                    field: name.clone(),
                    message: format!("'{}' not supported.", name),
                })?;
            assert.check(predicate)?;
        }
        Ok(())
    }

    /// First field named `name` (case-insensitive).
    pub fn field(&self, name: &str) -> Option<Field> {
        self.predicates
            .iter()
            .find(|p| p.field.value.eq_ignore_ascii_case(name))
            .map(|p| Field::new(p.clone()))
    }

    /// All fields named `name` (case-insensitive).
    pub fn fields(&self, name: &str) -> Vec<Field> {
        self.predicates
            .iter()
            .filter(|p| p.field.value.eq_ignore_ascii_case(name))
            .map(|p| Field::new(p.clone()))
            .collect()
    }

    /// Predicates scoped to `resource`, with the resource prefix stripped.
    pub fn resource(&self, resource: &str) -> Filter {
        let predicates = self
            .predicates
            .iter()
            .filter_map(|p| {
                let field = Field::new(p.clone());
                let (scope, name) = field.split();
                if !scope.eq_ignore_ascii_case(resource) || scope.is_empty() {
                    return None;
                }
                let mut p = p.clone();
                p.field.value = name;
                Some(p)
            })
            .collect();
        Filter { predicates }
    }

    /// Predicates matched by the field selector.
    pub fn with(&self, selector: &[&str]) -> Filter {
        let selector = FieldSelector::new(selector);
        let predicates = self
            .predicates
            .iter()
            .filter(|p| selector.matches(&Field::new((*p).clone())))
            .cloned()
            .collect();
        Filter { predicates }
    }

    /// Copy with fields named `name` renamed to `renamed`.
    pub fn renamed(&self, name: &str, renamed: &str) -> Filter {
        let predicates = self
            .predicates
            .iter()
            .cloned()
            .map(|mut p| {
                if p.field.value == name {
                    p.field.value = renamed.to_string();
                }
                p
            })
            .collect();
        Filter { predicates }
    }

    /// Copy with the value of fields named `name` replaced.
    pub fn revalued(&self, name: &str, value: Value) -> Filter {
        let predicates = self
            .predicates
            .iter()
            .cloned()
            .map(|mut p| {
                if p.field.value == name {
                    p.value = value.clone();
                }
                p
            })
            .collect();
        Filter { predicates }
    }

    /// Remove fields named `name`; returns true when any were removed.
    pub fn delete(&mut self, name: &str) -> bool {
        let before = self.predicates.len();
        self.predicates
            .retain(|p| !p.field.value.eq_ignore_ascii_case(name));
        self.predicates.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Attach a WHERE fragment for each unqualified predicate matched by the
    /// selector.
    pub fn apply(&self, mut query: Query, selector: &[&str]) -> Query {
        let selector = FieldSelector::new(selector);
        for predicate in &self.predicates {
            let field = Field::new(predicate.clone());
            if !selector.matches(&field) {
                continue;
            }
            if let Some((sql, binds)) = field.sql() {
                tracing::debug!("filter: {} {:?}", sql, binds);
                query = query.filter(sql, binds);
            }
        }
        query
    }
}

/// Field selector.
///
/// Names prefixed with `+` (or bare) are included, names prefixed with `-`
/// are excluded. An empty selector includes all; resource-qualified fields
/// never match.
#[derive(Debug, Clone, Default)]
pub struct FieldSelector {
    included: Vec<String>,
    excluded: Vec<String>,
}

impl FieldSelector {
    pub fn new(selector: &[&str]) -> Self {
        let mut out = Self::default();
        for s in selector.iter().map(|s| s.to_lowercase()) {
            if let Some(name) = s.strip_prefix('-') {
                out.excluded.push(name.to_string());
            } else if let Some(name) = s.strip_prefix('+') {
                out.included.push(name.to_string());
            } else if !s.is_empty() {
                out.included.push(s);
            }
        }
        out
    }

    pub fn matches(&self, field: &Field) -> bool {
        if !field.resource().is_empty() {
            return false;
        }
        let name = field.predicate.field.value.to_lowercase();
        if self.excluded.contains(&name) {
            return false;
        }
        self.included.is_empty() || self.included.contains(&name)
    }
}

/// A single predicate viewed as a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub predicate: Predicate,
}

impl Field {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }

    /// Field name without the resource prefix.
    pub fn name(&self) -> String {
        self.split().1
    }

    /// Resource prefix; empty when unqualified.
    pub fn resource(&self) -> String {
        self.split().0
    }

    /// Copy with the field renamed.
    pub fn renamed(&self, name: &str) -> Field {
        let mut field = self.clone();
        field.predicate.field.value = name.to_string();
        field
    }

    pub fn value(&self) -> &Value {
        &self.predicate.value
    }

    pub fn operator(&self) -> &str {
        &self.predicate.operator.value
    }

    /// One single-valued field per atom of a list.
    pub fn expand(&self) -> Vec<Field> {
        self.predicate
            .value
            .atoms()
            .into_iter()
            .map(|token| {
                let mut predicate = self.predicate.clone();
                predicate.value = Value::atom(token.clone());
                Field::new(predicate)
            })
            .collect()
    }

    /// True for a `(a,b)` list, where every value must hold.
    pub fn is_and_list(&self) -> bool {
        self.predicate.value.atoms().len() > 1 && self.predicate.value.separated_by(AND)
    }

    /// Compile to a SQL fragment and binds; `None` when the predicate
    /// cannot be expressed (no values, or an AND list).
    pub fn sql(&self) -> Option<(String, Vec<SqlValue>)> {
        let name = self.name();
        let values = &self.predicate.value;
        match values.0.len() {
            0 => None,
            1 => {
                let token = &values.0[0];
                if self.is_like() {
                    let pattern = token.value.replace('*', "%");
                    Some((format!("{} LIKE ?", name), vec![SqlValue::Text(pattern)]))
                } else {
                    Some((
                        format!("{} {} ?", name, self.sql_operator()),
                        vec![as_value(token)],
                    ))
                }
            }
            _ => {
                if values.separated_by(AND) {
                    return None;
                }
                if self.is_like() {
                    let mut clauses = Vec::new();
                    let mut binds = Vec::new();
                    for field in self.expand() {
                        if let Some((sql, mut values)) = field.sql() {
                            clauses.push(sql);
                            binds.append(&mut values);
                        }
                    }
                    return Some((format!("({})", clauses.join(" OR ")), binds));
                }
                let list = values.atoms().into_iter().map(as_value).collect();
                let op = if self.operator().starts_with('!') {
                    "NOT IN"
                } else {
                    "IN"
                };
                Some((format!("{} {} ?", name, op), vec![SqlValue::List(list)]))
            }
        }
    }

    fn is_like(&self) -> bool {
        self.operator() == LIKE.to_string()
    }

    fn sql_operator(&self) -> String {
        let op = self.operator();
        if op == COLON.to_string() {
            "=".to_string()
        } else {
            op.to_string()
        }
    }

    /// Split into `(resource, name)` on the first unescaped `.`.
    fn split(&self) -> (String, String) {
        let s = &self.predicate.field.value;
        let Some(mark) = s.find('.') else {
            return (String::new(), s.clone());
        };
        if mark > 0 && s[..mark].ends_with('\\') {
            return (String::new(), format!("{}{}", &s[..mark - 1], &s[mark..]));
        }
        (s[..mark].to_string(), s[mark + 1..].to_string())
    }
}

/// Field admissibility rule.
#[derive(Debug, Clone)]
pub struct Assert {
    pub field: String,
    /// Expected value kind; `Literal` forbids `~`.
    pub kind: TokenKind,
    /// Allow `(a,b)` AND lists.
    pub and: bool,
}

impl Assert {
    pub fn new(field: &str, kind: TokenKind) -> Self {
        Self {
            field: field.to_string(),
            kind,
            and: false,
        }
    }

    /// Literal (numeric/boolean) field.
    pub fn literal(field: &str) -> Self {
        Self::new(field, TokenKind::Literal)
    }

    /// String field.
    pub fn string(field: &str) -> Self {
        Self::new(field, TokenKind::String)
    }

    /// Allow AND lists on this field.
    pub fn with_and(mut self) -> Self {
        self.and = true;
        self
    }

    fn check(&self, predicate: &Predicate) -> Result<()> {
        let name = &predicate.field.value;
        if self.kind == TokenKind::Literal && predicate.operator.value == LIKE.to_string() {
            return Err(HubError::Validation {
                field: name.clone(),
                message: format!("'~' cannot be used with '{}'.", name),
            });
        }
        if !self.and && predicate.value.separated_by(AND) {
            return Err(HubError::Validation {
                field: name.clone(),
                message: format!("(,,) cannot be used with '{}'.", name),
            });
        }
        Ok(())
    }
}

/// Typed bind value of a token: literals are promoted to integer, then
/// boolean; quoted strings stay strings.
pub fn as_value(token: &Token) -> SqlValue {
    if token.kind == TokenKind::Literal {
        if let Ok(n) = token.value.parse::<i64>() {
            return SqlValue::Integer(n);
        }
        match token.value.as_str() {
            "true" | "True" | "TRUE" => return SqlValue::Boolean(true),
            "false" | "False" | "FALSE" => return SqlValue::Boolean(false),
            _ => {}
        }
    }
    SqlValue::Text(token.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_of(filter: &str, name: &str) -> (String, Vec<SqlValue>) {
        Filter::parse(filter)
            .unwrap()
            .field(name)
            .unwrap()
            .sql()
            .unwrap()
    }

    #[test]
    fn test_sql_equality() {
        assert_eq!(
            sql_of("name:elmer", "name"),
            ("name = ?".to_string(), vec![SqlValue::Text("elmer".into())])
        );
        assert_eq!(
            sql_of(r#"name="elmer""#, "name"),
            ("name = ?".to_string(), vec![SqlValue::Text("elmer".into())])
        );
    }

    #[test]
    fn test_sql_comparison() {
        assert_eq!(
            sql_of("age>=20", "age"),
            ("age >= ?".to_string(), vec![SqlValue::Integer(20)])
        );
        assert_eq!(
            sql_of("age!=20", "age"),
            ("age != ?".to_string(), vec![SqlValue::Integer(20)])
        );
    }

    #[test]
    fn test_sql_like() {
        assert_eq!(
            sql_of("name~elmer*", "name"),
            ("name LIKE ?".to_string(), vec![SqlValue::Text("elmer%".into())])
        );
        assert_eq!(
            sql_of("category~(a|b*)", "category"),
            (
                "(category LIKE ? OR category LIKE ?)".to_string(),
                vec![SqlValue::Text("a".into()), SqlValue::Text("b%".into())]
            )
        );
    }

    #[test]
    fn test_sql_in() {
        assert_eq!(
            sql_of("category=(one|two)", "category"),
            (
                "category IN ?".to_string(),
                vec![SqlValue::List(vec![
                    SqlValue::Text("one".into()),
                    SqlValue::Text("two".into())
                ])]
            )
        );
        assert_eq!(
            sql_of("id!=(1|2)", "id").0,
            "id NOT IN ?".to_string()
        );
    }

    #[test]
    fn test_sql_and_list_dropped() {
        let filter = Filter::parse("id:(1,2)").unwrap();
        assert_eq!(filter.field("id").unwrap().sql(), None);
        assert!(!Filter::parse("id:(1|2)").unwrap().field("id").unwrap().is_and_list());
        assert!(!Filter::parse("id:1").unwrap().field("id").unwrap().is_and_list());
        let (sql, _) = filter.apply(Query::select("t"), &[]).to_sql();
        assert_eq!(sql, "SELECT * FROM t");
    }

    #[test]
    fn test_value_typing() {
        assert_eq!(as_value(&Token::literal("20")), SqlValue::Integer(20));
        assert_eq!(as_value(&Token::literal("true")), SqlValue::Boolean(true));
        assert_eq!(as_value(&Token::literal("elmer")), SqlValue::Text("elmer".into()));
        assert_eq!(as_value(&Token::string("20")), SqlValue::Text("20".into()));
    }

    #[test]
    fn test_field_lookup_case_insensitive() {
        let filter = Filter::parse("Name:a,age:1,name:b").unwrap();
        assert_eq!(filter.field("NAME").unwrap().value().strings(), vec!["a"]);
        assert_eq!(filter.fields("name").len(), 2);
        assert!(filter.field("color").is_none());
    }

    #[test]
    fn test_resource() {
        let filter = Filter::parse("name:a,app.name:b,app.tag.id:1,App.id:2").unwrap();
        let app = filter.resource("app");
        assert_eq!(app.predicates().len(), 3);
        assert_eq!(app.predicates()[0].field.value, "name");
        assert_eq!(app.predicates()[1].field.value, "tag.id");
        assert_eq!(app.predicates()[2].field.value, "id");
        assert!(filter.resource("tag").is_empty());
    }

    #[test]
    fn test_resource_and_list() {
        let filter = Filter::parse("tag.id:(1,2)").unwrap().resource("tag");
        let field = filter.field("id").unwrap();
        assert!(field.is_and_list());
        assert_eq!(field.value().integers(), vec![1, 2]);
        let fields: Vec<(String, Vec<SqlValue>)> =
            field.expand().iter().filter_map(Field::sql).collect();
        assert_eq!(
            fields,
            vec![
                ("id = ?".to_string(), vec![SqlValue::Integer(1)]),
                ("id = ?".to_string(), vec![SqlValue::Integer(2)]),
            ]
        );
    }

    #[test]
    fn test_escaped_dot() {
        let filter = Filter::parse(r"a\.b:1").unwrap();
        let field = &filter.fields(r"a\.b")[0];
        assert_eq!(field.resource(), "");
        assert_eq!(field.name(), "a.b");
    }

    #[test]
    fn test_field_selector() {
        let filter = Filter::parse("zero:0,one:1,two:2,resource.one:3").unwrap();
        let names = |selector: &[&str]| -> Vec<String> {
            filter
                .with(selector)
                .predicates()
                .iter()
                .map(|p| p.field.value.clone())
                .collect()
        };
        assert_eq!(names(&[]), vec!["zero", "one", "two"]);
        assert_eq!(names(&["zero", "-one", "-two"]), vec!["zero"]);
        assert_eq!(names(&["-one"]), vec!["zero", "two"]);
        assert_eq!(names(&["+One", "two", "-two"]), vec!["one"]);
        assert_eq!(names(&["resource.one", "two"]), vec!["two"]);
    }

    #[test]
    fn test_with_name_selectors() {
        let filter = Filter::parse("name:elmer,age:20,category=(a|b)").unwrap();
        assert_eq!(filter.with(&["-name"]).predicates().len(), 2);
        assert_eq!(filter.with(&["+name", "+age"]).predicates().len(), 2);
    }

    #[test]
    fn test_apply() {
        let filter = Filter::parse("name~app*,platform.id:3,age:4").unwrap();
        let (sql, values) = filter
            .renamed("platform.id", "platform_id")
            .apply(Query::select("application"), &["-age"])
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM application WHERE (name LIKE ?) AND (platform_id = ?)"
        );
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_revalued_and_delete() {
        let mut filter = Filter::parse("id:1,name:a").unwrap();
        let revalued = filter.revalued("id", Value::atom(Token::literal("9")));
        assert_eq!(revalued.field("id").unwrap().value().integers(), vec![9]);
        assert!(filter.delete("ID"));
        assert!(!filter.delete("id"));
        assert_eq!(filter.predicates().len(), 1);
    }

    #[test]
    fn test_validate() {
        let asserts = vec![Assert::string("name"), Assert::literal("id")];
        assert!(Filter::parse("NAME~a*,id:(1|2)").unwrap().validate(&asserts).is_ok());

        let err = Filter::parse("color:red").unwrap().validate(&asserts).unwrap_err();
        assert_eq!(err.to_string(), "'color' not supported.");

        let err = Filter::parse("id~1*").unwrap().validate(&asserts).unwrap_err();
        assert_eq!(err.to_string(), "'~' cannot be used with 'id'.");

        let err = Filter::parse("id:(1,2)").unwrap().validate(&asserts).unwrap_err();
        assert_eq!(err.to_string(), "(,,) cannot be used with 'id'.");

        let asserts = vec![Assert::literal("id").with_and()];
        assert!(Filter::parse("id:(1,2)").unwrap().validate(&asserts).is_ok());
        assert!(Filter::parse("anything:1").unwrap().validate(&[]).is_ok());
    }

    #[test]
    fn test_from_params() {
        let filter = Filter::from_params(&["name:a", "", "age:2"]).unwrap();
        assert_eq!(filter.predicates().len(), 2);
        assert!(Filter::from_params::<&str>(&[]).unwrap().is_empty());
    }
}
