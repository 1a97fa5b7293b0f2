//! Decoding and encoding values against a [`CompiledValidator`](crate::CompiledValidator).
//!
//! Neither direction panics on malformed input, every problem is reported as a [`ValidationIssue`].

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::compiler::{CompiledValidator, Node, Pattern};

pub type ParseResult = Result<Value, ValidationErrors>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, ".{key}"),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationIssue>);

impl ValidationErrors {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let issues = self.0.iter().map(ToString::to_string).collect::<Vec<_>>();
        f.write_str(&issues.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Decode,
    Encode,
}

struct Walker {
    direction: Direction,
    path: Vec<PathSegment>,
    issues: Vec<ValidationIssue>,
}

pub(crate) fn decode(validator: &CompiledValidator, value: &Value) -> ParseResult {
    run(validator, value, Direction::Decode)
}

pub(crate) fn encode(validator: &CompiledValidator, value: &Value) -> ParseResult {
    run(validator, value, Direction::Encode)
}

fn run(validator: &CompiledValidator, value: &Value, direction: Direction) -> ParseResult {
    let mut walker = Walker {
        direction,
        path: Vec::new(),
        issues: Vec::new(),
    };

    match walker.walk(&validator.root, value) {
        Some(value) if walker.issues.is_empty() => Ok(value),
        _ => Err(ValidationErrors(walker.issues)),
    }
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Walker {
    fn issue(&mut self, message: impl Into<String>) -> Option<Value> {
        self.issues.push(ValidationIssue {
            path: self.path.clone(),
            message: message.into(),
        });
        None
    }

    fn walk(&mut self, node: &Node, value: &Value) -> Option<Value> {
        match node {
            Node::Any => Some(value.clone()),
            Node::Never => self.issue("no value is allowed here"),
            Node::Null => match value {
                Value::Null => Some(Value::Null),
                other => self.issue(format!("expected null, received {}", type_of(other))),
            },
            Node::Boolean => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                other => self.issue(format!("expected boolean, received {}", type_of(other))),
            },
            Node::String {
                min_length,
                max_length,
                pattern,
            } => {
                let Value::String(s) = value else {
                    return self.issue(format!("expected string, received {}", type_of(value)));
                };

                let len = s.chars().count();
                if let Some(min) = min_length.filter(|min| len < *min) {
                    return self.issue(format!("expected at least {min} characters, received {len}"));
                }
                if let Some(max) = max_length.filter(|max| len > *max) {
                    return self.issue(format!("expected at most {max} characters, received {len}"));
                }
                match pattern {
                    Some(Pattern::Valid(regex)) if !regex.is_match(s) => {
                        self.issue(format!("expected a string matching `{}`", regex.as_str()))
                    }
                    Some(Pattern::Invalid(p)) => {
                        self.issue(format!("the schema pattern `{p}` is not a valid regular expression"))
                    }
                    _ => Some(value.clone()),
                }
            }
            Node::Number(rules) => {
                let Value::Number(n) = value else {
                    let expected = if rules.integer { "integer" } else { "number" };
                    return self.issue(format!("expected {expected}, received {}", type_of(value)));
                };

                let Some(f) = n.as_f64() else {
                    return self.issue("expected a finite number");
                };
                if rules.integer && !(n.is_i64() || n.is_u64() || f.fract() == 0.0) {
                    return self.issue(format!("expected integer, received {f}"));
                }
                if let Some(min) = rules.minimum.filter(|min| f < *min) {
                    return self.issue(format!("expected a number >= {min}, received {f}"));
                }
                if let Some(max) = rules.maximum.filter(|max| f > *max) {
                    return self.issue(format!("expected a number <= {max}, received {f}"));
                }
                Some(value.clone())
            }
            Node::Literal(expected) => {
                if value == expected {
                    Some(value.clone())
                } else {
                    self.issue(format!("expected {expected}, received {value}"))
                }
            }
            Node::Array {
                item,
                min_items,
                max_items,
            } => {
                let Value::Array(items) = value else {
                    return self.issue(format!("expected array, received {}", type_of(value)));
                };

                if let Some(min) = min_items.filter(|min| items.len() < *min) {
                    return self.issue(format!("expected at least {min} items, received {}", items.len()));
                }
                if let Some(max) = max_items.filter(|max| items.len() > *max) {
                    return self.issue(format!("expected at most {max} items, received {}", items.len()));
                }

                let mut out = Vec::with_capacity(items.len());
                let mut failed = false;
                for (i, v) in items.iter().enumerate() {
                    self.path.push(PathSegment::Index(i));
                    match self.walk(item, v) {
                        Some(v) => out.push(v),
                        None => failed = true,
                    }
                    self.path.pop();
                }
                (!failed).then_some(Value::Array(out))
            }
            Node::Object {
                fields,
                known,
                strict,
            } => {
                let Value::Object(map) = value else {
                    return self.issue(format!("expected object, received {}", type_of(value)));
                };

                let mut out = Map::new();
                let mut failed = false;
                for field in fields {
                    self.path.push(PathSegment::Key(field.name.clone()));
                    match map.get(&field.name) {
                        Some(v) => match self.walk(&field.node, v) {
                            Some(v) => {
                                out.insert(field.name.clone(), v);
                            }
                            None => failed = true,
                        },
                        None if field.required => {
                            self.issue("required");
                            failed = true;
                        }
                        None => {}
                    }
                    self.path.pop();
                }

                if *strict {
                    for key in map.keys().filter(|k| !known.contains(*k)) {
                        self.path.push(PathSegment::Key(key.clone()));
                        self.issue("unknown field");
                        self.path.pop();
                        failed = true;
                    }
                }

                (!failed).then_some(Value::Object(out))
            }
            Node::Union(variants) => {
                for variant in variants {
                    let mut attempt = Walker {
                        direction: self.direction,
                        path: self.path.clone(),
                        issues: Vec::new(),
                    };
                    if let Some(v) = attempt.walk(variant, value) {
                        if attempt.issues.is_empty() {
                            return Some(v);
                        }
                    }
                }
                self.issue("the value didn't match any of the allowed variants")
            }
            Node::Nullable(inner) => match value {
                Value::Null => Some(Value::Null),
                other => self.walk(inner, other),
            },
            Node::Transform { wire, codec } => match self.direction {
                Direction::Decode => {
                    let wire_value = self.walk(wire, value)?;
                    match codec.decode(wire_value) {
                        Ok(v) => Some(v),
                        Err(err) => self.issue(err.to_string()),
                    }
                }
                Direction::Encode => match codec.encode(value.clone()) {
                    Ok(v) => self.walk(wire, &v),
                    Err(err) => self.issue(err.to_string()),
                },
            },
        }
    }
}
