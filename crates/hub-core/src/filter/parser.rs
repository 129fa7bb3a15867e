//! Filter parser.
//!
//! Builds a flat predicate list from the token stream. A synthetic leading
//! `,` is lexed in front of the input so every predicate arrives as a
//! uniform `(sep, field, op, value)` tuple.

use super::lexer::{Lexer, Token, TokenKind, AND, COMMA, OR};
use crate::error::{HubError, Result};

/// Filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Separator preceding the predicate (always `,`).
    pub sep: Token,
    pub field: Token,
    pub operator: Token,
    pub value: Value,
}

/// Predicate value: a single atom, or the atoms and separators of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value(pub Vec<Token>);

impl Value {
    pub fn atom(token: Token) -> Self {
        Self(vec![token])
    }

    /// Tokens of the given kinds.
    pub fn by_kind(&self, kinds: &[TokenKind]) -> Vec<&Token> {
        self.0.iter().filter(|t| kinds.contains(&t.kind)).collect()
    }

    /// Literal and string tokens.
    pub fn atoms(&self) -> Vec<&Token> {
        self.by_kind(&[TokenKind::Literal, TokenKind::String])
    }

    /// True when the first separator of the list is `operator`.
    pub fn separated_by(&self, operator: char) -> bool {
        self.0
            .iter()
            .find(|t| t.kind == TokenKind::Operator)
            .and_then(Token::operator_char)
            == Some(operator)
    }

    /// Rebuild the list with a different separator.
    pub fn join(&self, operator: char) -> Value {
        let mut out = Vec::new();
        for (i, token) in self.atoms().into_iter().enumerate() {
            if i > 0 {
                out.push(Token::operator(operator.to_string()));
            }
            out.push(token.clone());
        }
        Value(out)
    }

    /// Atom values as strings.
    pub fn strings(&self) -> Vec<String> {
        self.atoms().into_iter().map(|t| t.value.clone()).collect()
    }

    /// Atom values parseable as integers; others are skipped.
    pub fn integers(&self) -> Vec<i64> {
        self.atoms()
            .into_iter()
            .filter_map(|t| t.value.parse().ok())
            .collect()
    }
}

fn syntax_error() -> HubError {
    HubError::Parse {
        message: "Syntax error.".to_string(),
    }
}

/// Parse a filter expression into predicates.
pub fn parse(filter: &str) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::new();
    if filter.is_empty() {
        return Ok(predicates);
    }
    let mut lexer = Lexer::new(&format!("{}{}", COMMA, filter))?;
    let mut buffer: Vec<Token> = Vec::with_capacity(3);
    while let Some(token) = lexer.next_token() {
        if buffer.len() < 3 {
            buffer.push(token);
            continue;
        }
        if buffer[0].kind != TokenKind::Operator || buffer[2].kind != TokenKind::Operator {
            return Err(syntax_error());
        }
        let value = match token.kind {
            TokenKind::Literal | TokenKind::String => Value::atom(token),
            TokenKind::LParen => build_list(&mut lexer)?,
            _ => return Err(syntax_error()),
        };
        let mut slots = buffer.drain(..);
        if let (Some(sep), Some(field), Some(operator)) = (slots.next(), slots.next(), slots.next()) {
            predicates.push(Predicate {
                sep,
                field,
                operator,
                value,
            });
        }
    }
    if !buffer.is_empty() {
        return Err(syntax_error());
    }
    Ok(predicates)
}

/// Consume a parenthesized value list; the `(` has been consumed.
fn build_list(lexer: &mut Lexer) -> Result<Value> {
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        match token.kind {
            TokenKind::Literal | TokenKind::String => tokens.push(token),
            TokenKind::Operator => {
                if token.value == AND.to_string() || token.value == OR.to_string() {
                    tokens.push(token);
                } else {
                    return Err(HubError::Parse {
                        message: "List separator must be ',' or '|'.".to_string(),
                    });
                }
            }
            // Nested lists are flattened.
            TokenKind::LParen => {}
            TokenKind::RParen => {
                validate_list(&tokens)?;
                return Ok(Value(tokens));
            }
        }
    }
    Err(HubError::Parse {
        message: "End ')' not found.".to_string(),
    })
}

fn validate_list(tokens: &[Token]) -> Result<()> {
    let mut last_op: Option<char> = None;
    for (i, token) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            if !token.is_atom() {
                return Err(HubError::Parse {
                    message: format!("'{}' not expected in ().", token.value),
                });
            }
            continue;
        }
        let Some(op) = token.operator_char() else {
            return Err(HubError::Parse {
                message: format!("'{}' not expected in (); separator expected.", token.value),
            });
        };
        if matches!(last_op, Some(last) if last != op) {
            return Err(HubError::Parse {
                message: "Mixed operator detected in ().".to_string(),
            });
        }
        last_op = Some(op);
    }
    if tokens.is_empty() {
        return Err(HubError::Parse {
            message: "List cannot be empty.".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_predicates() {
        let predicates = parse("name:elmer,category=(one|two|three),age:20").unwrap();
        assert_eq!(predicates.len(), 3);
        assert_eq!(predicates[0].field.value, "name");
        assert_eq!(predicates[0].operator.value, ":");
        assert_eq!(predicates[0].value, Value::atom(Token::literal("elmer")));
        assert_eq!(
            predicates[1].value,
            Value(vec![
                Token::literal("one"),
                Token::operator("|"),
                Token::literal("two"),
                Token::operator("|"),
                Token::literal("three"),
            ])
        );
        assert_eq!(predicates[2].field.value, "age");
        assert_eq!(predicates[2].value.0[0], Token::literal("20"));
        for p in &predicates {
            assert_eq!(p.sep, Token::operator(","));
        }
    }

    #[test]
    fn test_parse_quoted_and_spaces() {
        let predicates = parse(r#"name = "elmer fudd" , age > 20"#).unwrap();
        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[0].value.0[0], Token::string("elmer fudd"));
        assert_eq!(predicates[1].operator.value, ">");
    }

    #[test]
    fn test_parse_and_list() {
        let predicates = parse("tag.id:(1,2)").unwrap();
        assert_eq!(predicates.len(), 1);
        assert!(predicates[0].value.separated_by(','));
        assert_eq!(predicates[0].value.integers(), vec![1, 2]);
    }

    #[test]
    fn test_parse_long_list() {
        let items: Vec<String> = (0..50).map(|n| n.to_string()).collect();
        let predicates = parse(&format!("id=({})", items.join("|"))).unwrap();
        assert_eq!(predicates[0].value.atoms().len(), 50);
    }

    #[test]
    fn test_parse_nested_paren_flattened() {
        let predicates = parse("id=(1|(2|3)").unwrap();
        assert_eq!(predicates[0].value.integers(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_errors() {
        let message = |s: &str| parse(s).unwrap_err().to_string();
        assert_eq!(message("id=(1|2,3)"), "Mixed operator detected in ().");
        assert_eq!(message("id=()"), "List cannot be empty.");
        assert_eq!(message("id=(1|2"), "End ')' not found.");
        assert_eq!(message("id=(1>2)"), "List separator must be ',' or '|'.");
        assert_eq!(message("name:elmer,age"), "Syntax error.");
        assert_eq!(message("name elmer age"), "Syntax error.");
        assert_eq!(message("name:elmer,"), "End of operator not found.");
    }

    #[test]
    fn test_value_join() {
        let predicates = parse("id=(1|2|3)").unwrap();
        let joined = predicates[0].value.join(',');
        assert!(joined.separated_by(','));
        assert_eq!(joined.integers(), vec![1, 2, 3]);
    }
}
