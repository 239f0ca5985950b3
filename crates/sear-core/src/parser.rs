//! Boolean query parser.
//!
//! Parsing runs in two stages. The first pass scans the query text into a
//! token list ([`tokenize`]): words, quoted literals, property comparisons,
//! function calls, parenthesized groups, negations and the `and`/`or`
//! keywords. The second pass ([`parse_query`]) reduces the token list into a
//! binary [`QueryNode`] tree with left-associative folding, inserting an
//! implicit AND between adjacent operands.
//!
//! The grammar, informally:
//!
//! ```text
//! query    := sequence
//! sequence := (operand | "and" | "or")*
//! operand  := word | literal | property | function | group | negation
//! property := name OP value        OP := ":" "!=" ">=" "<=" "=" "<" ">"
//! group    := "(" sequence ")"
//! negation := ("-" | "not") operand
//! ```
//!
//! `and`, `or` and `not` are keywords only when followed by a token
//! boundary, so `android` parses as a word.

use crate::error::{QueryError, QueryErrorKind};

/// Comparison operator of a property token, in the order the scanner
/// searches for them inside a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOp {
    /// `:` loose match (words and prefixes for strings, equality for numbers)
    Contains,
    /// `!=`
    NotEqual,
    /// `>=`
    GreaterEq,
    /// `<=`
    LessEq,
    /// `=`
    Equal,
    /// `<`
    Less,
    /// `>`
    Greater,
}

const PROPERTY_OPS: &[(&str, PropertyOp)] = &[
    (":", PropertyOp::Contains),
    ("!=", PropertyOp::NotEqual),
    (">=", PropertyOp::GreaterEq),
    ("<=", PropertyOp::LessEq),
    ("=", PropertyOp::Equal),
    ("<", PropertyOp::Less),
    (">", PropertyOp::Greater),
];

/// A token produced by the first parsing stage.
///
/// Every token keeps the source text it was scanned from in `identifier`,
/// which error reporting and word evaluation use verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    /// A bare word
    Word { identifier: String },
    /// A quoted literal; `value` has quotes and escapes resolved
    Literal { value: String, identifier: String },
    /// `name OP value`; the value is the single child token
    Property {
        name: String,
        op: PropertyOp,
        children: Vec<QueryToken>,
        identifier: String,
    },
    /// `name(args)`; `value` is the raw argument text
    Function {
        name: String,
        value: String,
        identifier: String,
    },
    /// A parenthesized sub-sequence
    Group {
        children: Vec<QueryToken>,
        identifier: String,
    },
    /// The `and` keyword
    And { identifier: String },
    /// The `or` keyword
    Or { identifier: String },
    /// `-` or `not`; empty children means the operand was missing
    Not {
        children: Vec<QueryToken>,
        identifier: String,
    },
}

/// A node of the reduced query tree handed to the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// A word match; `exact` words skip prefix expansion
    Word { value: String, exact: bool },
    /// A property comparison
    Property {
        name: String,
        op: PropertyOp,
        value: String,
    },
    /// A function call, forwarded to the evaluation handler
    Function { name: String, value: String },
    Not(Box<QueryNode>),
    And(Box<QueryNode>, Box<QueryNode>),
    Or(Box<QueryNode>, Box<QueryNode>),
    /// Tree root; `None` for an empty query
    Root(Option<Box<QueryNode>>),
}

/// Scan a query string into a token list.
pub fn tokenize(query: &str) -> Result<Vec<QueryToken>, QueryError> {
    let mut scanner = Scanner {
        input: query,
        pos: 0,
    };
    scanner.parse_sequence(false)
}

/// Parse a query string into its evaluation tree.
pub fn parse_query(query: &str) -> Result<QueryNode, QueryError> {
    let tokens = tokenize(query)?;
    let node = build_sequence(&tokens)?;
    Ok(QueryNode::Root(node.map(Box::new)))
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse_sequence(&mut self, in_group: bool) -> Result<Vec<QueryToken>, QueryError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_spaces();
            let Some(c) = self.peek() else {
                if in_group {
                    return Err(QueryError::new(
                        QueryErrorKind::UnexpectedGroupEnd,
                        self.input,
                        "Unterminated group",
                    ));
                }
                return Ok(tokens);
            };
            match c {
                ')' => {
                    if in_group {
                        self.bump();
                        return Ok(tokens);
                    }
                    return Err(QueryError::new(
                        QueryErrorKind::UnexpectedGroupEnd,
                        self.rest(),
                        "Unexpected group end",
                    ));
                }
                '(' => {
                    let group = self.parse_group()?;
                    tokens.push(group);
                }
                '-' => {
                    self.bump();
                    let not = self.parse_negation("-")?;
                    tokens.push(not);
                }
                '"' | '\'' => {
                    let literal = self.parse_literal(c)?;
                    tokens.push(literal);
                }
                _ => {
                    if let Some(keyword) = self.match_keyword()? {
                        tokens.push(keyword);
                    } else {
                        let variable = self.parse_variable()?;
                        tokens.push(variable);
                    }
                }
            }
        }
    }

    fn parse_group(&mut self) -> Result<QueryToken, QueryError> {
        let start = self.pos;
        self.bump();
        let children = self.parse_sequence(true)?;
        Ok(QueryToken::Group {
            children,
            identifier: self.input[start..self.pos].to_string(),
        })
    }

    /// Parse the operand of `-` or `not`. A missing operand yields an empty
    /// negation, rejected during reduction.
    fn parse_negation(&mut self, keyword: &str) -> Result<QueryToken, QueryError> {
        self.skip_spaces();
        let child = match self.peek() {
            None | Some(')') => None,
            Some('(') => Some(self.parse_group()?),
            Some(c @ ('"' | '\'')) => Some(self.parse_literal(c)?),
            Some('-') => {
                self.bump();
                Some(self.parse_negation("-")?)
            }
            Some(_) => Some(self.parse_variable()?),
        };
        Ok(QueryToken::Not {
            children: child.into_iter().collect(),
            identifier: keyword.to_string(),
        })
    }

    fn parse_literal(&mut self, quote: char) -> Result<QueryToken, QueryError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(QueryError::new(
                        QueryErrorKind::UnexpectedQuoteEnd,
                        &self.input[start..],
                        "Unterminated quote",
                    ));
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(QueryToken::Literal {
                        value,
                        identifier: self.input[start..self.pos].to_string(),
                    });
                }
                Some('\\') => {
                    self.bump();
                    if let Some(escaped) = self.peek() {
                        value.push(escaped);
                        self.bump();
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Recognize `and`, `or` or `not` at the current position. Keywords
    /// require a boundary after them so that words like `android` or
    /// `oracle` are not split.
    fn match_keyword(&mut self) -> Result<Option<QueryToken>, QueryError> {
        for keyword in ["and", "not", "or"] {
            let rest = self.rest();
            let Some(head) = rest.get(..keyword.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(keyword) {
                continue;
            }
            let tail = &rest[keyword.len()..];
            let boundary = match tail.chars().next() {
                None => true,
                Some(c) => c.is_whitespace() || matches!(c, '(' | ')' | '-' | '"' | '\''),
            };
            if !boundary {
                continue;
            }
            let identifier = head.to_string();
            self.pos += keyword.len();
            let token = match keyword {
                "and" => QueryToken::And { identifier },
                "or" => QueryToken::Or { identifier },
                _ => self.parse_negation(&identifier)?,
            };
            return Ok(Some(token));
        }
        Ok(None)
    }

    /// Parse a word, property comparison or function call. The token is
    /// first delimited by whitespace or a group end; property values and
    /// function arguments may then extend past that boundary (quoted values
    /// span spaces, argument lists contain anything up to the matching
    /// parenthesis).
    fn parse_variable(&mut self) -> Result<QueryToken, QueryError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != ')')
        {
            self.bump();
        }
        let raw = &self.input[start..self.pos];

        // Operators are searched past the first character so a leading
        // operator character stays part of the word.
        let search_from = raw.chars().next().map_or(1, char::len_utf8);
        if raw.len() > search_from {
            for (text, op) in PROPERTY_OPS {
                if let Some(found) = raw[search_from..].find(text) {
                    let at = search_from + found;
                    let name = raw[..at].to_string();
                    self.pos = start + at + text.len();
                    let child = self.parse_property_value(raw)?;
                    return Ok(QueryToken::Property {
                        name,
                        op: *op,
                        children: vec![child],
                        identifier: raw.to_string(),
                    });
                }
            }
        }

        if let Some(paren) = raw.find('(') {
            if paren >= 2 {
                let name = raw[..paren].to_string();
                self.pos = start + paren;
                let value = self.parse_function_args(raw)?;
                return Ok(QueryToken::Function {
                    name,
                    value,
                    identifier: self.input[start..self.pos].to_string(),
                });
            }
        }

        Ok(QueryToken::Word {
            identifier: raw.to_string(),
        })
    }

    fn parse_property_value(&mut self, token: &str) -> Result<QueryToken, QueryError> {
        match self.peek() {
            None | Some(')') => Err(QueryError::new(
                QueryErrorKind::MissingPropertyValue,
                token,
                "Missing property value",
            )),
            Some(c) if c.is_whitespace() => Err(QueryError::new(
                QueryErrorKind::MissingPropertyValue,
                token,
                "Missing property value",
            )),
            Some(c @ ('"' | '\'')) => self.parse_literal(c),
            Some(_) => self.parse_variable(),
        }
    }

    /// Consume a balanced `(...)` argument list, returning the inner text.
    /// A backslash escapes the following character, so escaped parentheses
    /// do not affect nesting.
    fn parse_function_args(&mut self, token: &str) -> Result<String, QueryError> {
        self.bump();
        let inner_start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '\\' => self.bump(),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = self.input[inner_start..self.pos].trim().to_string();
                        self.bump();
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.bump();
        }
        Err(QueryError::new(
            QueryErrorKind::MissingFunctionGroup,
            token,
            "Missing function argument group",
        ))
    }
}

#[derive(Clone, Copy)]
enum BinaryOp {
    And,
    Or,
}

/// Reduce a token sequence into a single node. Returns `None` for an empty
/// sequence.
fn build_sequence(tokens: &[QueryToken]) -> Result<Option<QueryNode>, QueryError> {
    let mut left: Option<QueryNode> = None;
    let mut pending: Option<(BinaryOp, &str)> = None;

    for token in tokens {
        match token {
            QueryToken::And { identifier } | QueryToken::Or { identifier } => {
                if pending.is_some() {
                    return Err(QueryError::new(
                        QueryErrorKind::UnexpectedOperator,
                        identifier.as_str(),
                        "Unexpected operator",
                    ));
                }
                if left.is_none() {
                    return Err(QueryError::new(
                        QueryErrorKind::MissingLeftOperand,
                        identifier.as_str(),
                        "Missing left operand",
                    ));
                }
                let op = match token {
                    QueryToken::And { .. } => BinaryOp::And,
                    _ => BinaryOp::Or,
                };
                pending = Some((op, identifier));
            }
            _ => {
                let node = build_operand(token)?;
                left = Some(match (left.take(), pending.take()) {
                    (None, _) => node,
                    (Some(l), None | Some((BinaryOp::And, _))) => {
                        QueryNode::And(Box::new(l), Box::new(node))
                    }
                    (Some(l), Some((BinaryOp::Or, _))) => {
                        QueryNode::Or(Box::new(l), Box::new(node))
                    }
                });
            }
        }
    }

    match pending {
        Some((BinaryOp::And, identifier)) => Err(QueryError::new(
            QueryErrorKind::MissingAndRightOperand,
            identifier,
            "Missing right operand for `and`",
        )),
        Some((BinaryOp::Or, identifier)) => Err(QueryError::new(
            QueryErrorKind::MissingOrRightOperand,
            identifier,
            "Missing right operand for `or`",
        )),
        None => Ok(left),
    }
}

fn build_operand(token: &QueryToken) -> Result<QueryNode, QueryError> {
    match token {
        QueryToken::Word { identifier } => Ok(QueryNode::Word {
            value: identifier.clone(),
            exact: false,
        }),
        QueryToken::Literal { value, .. } => Ok(QueryNode::Word {
            value: value.clone(),
            exact: true,
        }),
        QueryToken::Property {
            name,
            op,
            children,
            identifier,
        } => {
            let value = match children.first() {
                Some(QueryToken::Word { identifier }) => identifier.clone(),
                Some(QueryToken::Literal { value, .. }) => value.clone(),
                _ => {
                    return Err(QueryError::new(
                        QueryErrorKind::InvalidPropertyDeclaration,
                        identifier.as_str(),
                        "Property value must be a word or quoted literal",
                    ));
                }
            };
            Ok(QueryNode::Property {
                name: name.clone(),
                op: *op,
                value,
            })
        }
        QueryToken::Function { name, value, .. } => Ok(QueryNode::Function {
            name: name.clone(),
            value: value.clone(),
        }),
        QueryToken::Group {
            children,
            identifier,
        } => match build_sequence(children)? {
            Some(node) => Ok(node),
            None => Err(QueryError::new(
                QueryErrorKind::InvalidLeafNode,
                identifier.as_str(),
                "Empty group",
            )),
        },
        QueryToken::Not {
            children,
            identifier,
        } => match children.first() {
            Some(child) => Ok(QueryNode::Not(Box::new(build_operand(child)?))),
            None => Err(QueryError::new(
                QueryErrorKind::MissingNotRightOperand,
                identifier.as_str(),
                "Missing operand for negation",
            )),
        },
        QueryToken::And { identifier } | QueryToken::Or { identifier } => Err(QueryError::new(
            QueryErrorKind::UnexpectedOperand,
            identifier.as_str(),
            "Operator in operand position",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_nested_negations() {
        let tokens = tokenize("\"number > 32\" -(-joe -last!=smith)").unwrap();
        assert_eq!(tokens.len(), 2);

        let QueryToken::Literal { value, .. } = &tokens[0] else {
            panic!("expected literal, got {:?}", tokens[0]);
        };
        assert_eq!(value, "number > 32");

        let QueryToken::Not { children, .. } = &tokens[1] else {
            panic!("expected negation, got {:?}", tokens[1]);
        };
        let QueryToken::Group { children, .. } = &children[0] else {
            panic!("expected group, got {:?}", children[0]);
        };
        assert_eq!(children.len(), 2);
        let QueryToken::Not { children: first, .. } = &children[0] else {
            panic!("expected negation, got {:?}", children[0]);
        };
        assert!(matches!(&first[0], QueryToken::Word { identifier } if identifier == "joe"));
        let QueryToken::Not { children: second, .. } = &children[1] else {
            panic!("expected negation, got {:?}", children[1]);
        };
        let QueryToken::Property { name, op, .. } = &second[0] else {
            panic!("expected property, got {:?}", second[0]);
        };
        assert_eq!(name, "last");
        assert_eq!(*op, PropertyOp::NotEqual);
    }

    #[test]
    fn test_group_with_keyword_and_function() {
        let tokens = tokenize("(bob and func(smith))").unwrap();
        assert_eq!(tokens.len(), 1);
        let QueryToken::Group { children, .. } = &tokens[0] else {
            panic!("expected group, got {:?}", tokens[0]);
        };
        assert_eq!(children.len(), 3);
        assert!(matches!(&children[0], QueryToken::Word { identifier } if identifier == "bob"));
        assert!(matches!(&children[1], QueryToken::And { .. }));
        let QueryToken::Function { name, value, .. } = &children[2] else {
            panic!("expected function, got {:?}", children[2]);
        };
        assert_eq!(name, "func");
        assert_eq!(value, "smith");
    }

    #[test]
    fn test_function_args_keep_escaped_parens() {
        let tokens = tokenize(r"func(a\) b) after").unwrap();
        assert_eq!(tokens.len(), 2);
        let QueryToken::Function { name, value, .. } = &tokens[0] else {
            panic!("expected function, got {:?}", tokens[0]);
        };
        assert_eq!(name, "func");
        assert_eq!(value, r"a\) b");
        assert!(matches!(&tokens[1], QueryToken::Word { identifier } if identifier == "after"));
    }

    #[test]
    fn test_negations_properties_and_or() {
        let tokens = tokenize("-will - space age<=10 or age>=20").unwrap();
        assert_eq!(tokens.len(), 5);
        let QueryToken::Not { children, .. } = &tokens[0] else {
            panic!("expected negation, got {:?}", tokens[0]);
        };
        assert!(matches!(&children[0], QueryToken::Word { identifier } if identifier == "will"));
        let QueryToken::Not { children, .. } = &tokens[1] else {
            panic!("expected negation, got {:?}", tokens[1]);
        };
        assert!(matches!(&children[0], QueryToken::Word { identifier } if identifier == "space"));
        assert!(matches!(
            &tokens[2],
            QueryToken::Property {
                op: PropertyOp::LessEq,
                ..
            }
        ));
        assert!(matches!(&tokens[3], QueryToken::Or { .. }));
        assert!(matches!(
            &tokens[4],
            QueryToken::Property {
                op: PropertyOp::GreaterEq,
                ..
            }
        ));
    }

    #[test]
    fn test_property_value_is_single_word_child() {
        let tokens = tokenize("age>=20").unwrap();
        assert_eq!(tokens.len(), 1);
        let QueryToken::Property {
            name,
            op,
            children,
            ..
        } = &tokens[0]
        else {
            panic!("expected property, got {:?}", tokens[0]);
        };
        assert_eq!(name, "age");
        assert_eq!(*op, PropertyOp::GreaterEq);
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0], QueryToken::Word { identifier } if identifier == "20"));
    }

    #[test]
    fn test_quoted_property_value_spans_spaces() {
        let tokens = tokenize("name=\"john smith\" age>2").unwrap();
        assert_eq!(tokens.len(), 2);
        let QueryToken::Property { children, .. } = &tokens[0] else {
            panic!("expected property, got {:?}", tokens[0]);
        };
        assert!(
            matches!(&children[0], QueryToken::Literal { value, .. } if value == "john smith")
        );
    }

    #[test]
    fn test_keywords_require_boundary() {
        let tokens = tokenize("android oracle nothing").unwrap();
        assert_eq!(tokens.len(), 3);
        for token in &tokens {
            assert!(matches!(token, QueryToken::Word { .. }), "{token:?}");
        }
    }

    #[test]
    fn test_build_implicit_and() {
        let node = parse_query("joe smith").unwrap();
        let QueryNode::Root(Some(root)) = node else {
            panic!("expected non-empty root");
        };
        let QueryNode::And(left, right) = *root else {
            panic!("expected implicit and");
        };
        assert!(matches!(*left, QueryNode::Word { ref value, .. } if value == "joe"));
        assert!(matches!(*right, QueryNode::Word { ref value, .. } if value == "smith"));
    }

    #[test]
    fn test_build_left_associative_fold() {
        let node = parse_query("a or b c").unwrap();
        let QueryNode::Root(Some(root)) = node else {
            panic!("expected non-empty root");
        };
        // ((a or b) and c)
        let QueryNode::And(left, _) = *root else {
            panic!("expected and at the top");
        };
        assert!(matches!(*left, QueryNode::Or(_, _)));
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(parse_query("").unwrap(), QueryNode::Root(None));
        assert_eq!(parse_query("   ").unwrap(), QueryNode::Root(None));
    }

    #[test]
    fn test_parse_errors() {
        let kind = |q: &str| parse_query(q).unwrap_err().kind;
        assert_eq!(kind("(unterminated"), QueryErrorKind::UnexpectedGroupEnd);
        assert_eq!(kind("stray)"), QueryErrorKind::UnexpectedGroupEnd);
        assert_eq!(kind("\"open"), QueryErrorKind::UnexpectedQuoteEnd);
        assert_eq!(kind("a and"), QueryErrorKind::MissingAndRightOperand);
        assert_eq!(kind("a or"), QueryErrorKind::MissingOrRightOperand);
        assert_eq!(kind("or b"), QueryErrorKind::MissingLeftOperand);
        assert_eq!(kind("a and or b"), QueryErrorKind::UnexpectedOperator);
        assert_eq!(kind("-"), QueryErrorKind::MissingNotRightOperand);
        assert_eq!(kind("not"), QueryErrorKind::MissingNotRightOperand);
        assert_eq!(kind("age="), QueryErrorKind::MissingPropertyValue);
        assert_eq!(kind("()"), QueryErrorKind::InvalidLeafNode);
        assert_eq!(kind("func("), QueryErrorKind::MissingFunctionGroup);
    }
}
