//! Minimal JSONPath support for payload shapes that are not modelled as
//! typed structures.
//!
//! Supported syntax:
//!
//! | Expression     | Meaning                                   |
//! |----------------|-------------------------------------------|
//! | `$`            | document root                             |
//! | `.key`         | object member                             |
//! | `['key']`      | object member (quoted)                    |
//! | `[3]`          | array element                             |
//! | `[*]` / `.*`   | every array element or object member      |
//! | `..key`        | member `key` at any depth below the node  |

use serde_json::Value;
use std::fmt;

use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
    Descendant(String),
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a path expression such as `$[*].tasks[*].name`.
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |reason: &str| ProxyError::InvalidPath {
            path: expr.to_string(),
            reason: reason.to_string(),
        };

        let rest = expr
            .strip_prefix('$')
            .ok_or_else(|| invalid("path must start with '$'"))?;
        let chars: Vec<char> = rest.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' if chars.get(i + 1) == Some(&'.') => {
                    let (key, next) = read_identifier(&chars, i + 2);
                    if key.is_empty() {
                        return Err(invalid("'..' must be followed by a member name"));
                    }
                    segments.push(Segment::Descendant(key));
                    i = next;
                }
                '.' if chars.get(i + 1) == Some(&'*') => {
                    segments.push(Segment::Wildcard);
                    i += 2;
                }
                '.' => {
                    let (key, next) = read_identifier(&chars, i + 1);
                    if key.is_empty() {
                        return Err(invalid("'.' must be followed by a member name"));
                    }
                    segments.push(Segment::Key(key));
                    i = next;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|p| p + i)
                        .ok_or_else(|| invalid("unterminated '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(parse_bracket(&inner).ok_or_else(|| invalid("bad bracket selector"))?);
                    i = close + 1;
                }
                _ => return Err(invalid("unexpected character")),
            }
        }

        Ok(Self {
            source: expr.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The member name selected by the final segment, if it names one.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last()? {
            Segment::Key(key) | Segment::Descendant(key) => Some(key),
            _ => None,
        }
    }

    /// Apply `f` to every value the path addresses, stopping on the first
    /// error. Returns the number of visited values.
    pub fn for_each_mut<F>(&self, root: &mut Value, mut f: F) -> Result<usize>
    where
        F: FnMut(&mut Value) -> Result<()>,
    {
        let mut visited = 0;
        visit_mut(&self.segments, root, &mut |value: &mut Value| {
            visited += 1;
            f(value)
        })?;
        Ok(visited)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn read_identifier(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn parse_bracket(inner: &str) -> Option<Segment> {
    let inner = inner.trim();
    if inner == "*" {
        return Some(Segment::Wildcard);
    }
    if let Ok(index) = inner.parse::<usize>() {
        return Some(Segment::Index(index));
    }
    let quoted = inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
    Some(Segment::Key(quoted.to_string()))
}

fn visit_mut(
    segments: &[Segment],
    node: &mut Value,
    f: &mut dyn FnMut(&mut Value) -> Result<()>,
) -> Result<()> {
    let Some((head, rest)) = segments.split_first() else {
        return f(node);
    };

    match head {
        Segment::Key(key) => {
            if let Some(child) = node.get_mut(key.as_str()) {
                visit_mut(rest, child, f)?;
            }
        }
        Segment::Index(index) => {
            if let Some(child) = node.as_array_mut().and_then(|a| a.get_mut(*index)) {
                visit_mut(rest, child, f)?;
            }
        }
        Segment::Wildcard => match node {
            Value::Array(items) => {
                for child in items.iter_mut() {
                    visit_mut(rest, child, f)?;
                }
            }
            Value::Object(map) => {
                for child in map.values_mut() {
                    visit_mut(rest, child, f)?;
                }
            }
            _ => {}
        },
        Segment::Descendant(key) => {
            if let Some(child) = node.get_mut(key.as_str()) {
                visit_mut(rest, child, f)?;
            }
            match node {
                Value::Array(items) => {
                    for child in items.iter_mut() {
                        visit_mut(segments, child, f)?;
                    }
                }
                Value::Object(map) => {
                    for child in map.values_mut() {
                        visit_mut(segments, child, f)?;
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}
