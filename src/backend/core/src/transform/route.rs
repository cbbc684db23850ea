//! Route patterns of the form `/api/workflow/:workflowId/pause`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ProxyError, Result};

/// Path parameters captured by a match, percent-decoded.
pub type PathParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Param(String),
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    parts: Vec<Part>,
}

impl RoutePattern {
    pub fn new(pattern: &str) -> Self {
        let parts = segments(pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Part::Param(name.to_string()),
                None => Part::Literal(segment.to_string()),
            })
            .collect();
        Self {
            source: pattern.to_string(),
            parts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of literal segments. More literals means a more specific route.
    pub fn specificity(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, Part::Literal(_)))
            .count()
    }

    /// Match a request path, ignoring empty segments.
    ///
    /// Returns `None` when the path does not match or a parameter is not
    /// valid percent-encoded UTF-8.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut segments = segments(path);

        for part in &self.parts {
            let segment = segments.next()?;
            match part {
                Part::Literal(literal) if literal == segment => {}
                Part::Literal(_) => return None,
                Part::Param(name) => {
                    let value = urlencoding::decode(segment).ok()?;
                    params.insert(name.clone(), value.into_owned());
                }
            }
        }

        if segments.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Build a concrete path, percent-encoding each parameter.
    pub fn render(&self, params: &PathParams) -> Result<String> {
        let mut path = String::new();
        for part in &self.parts {
            let segment: Cow<'_, str> = match part {
                Part::Literal(literal) => Cow::Borrowed(literal.as_str()),
                Part::Param(name) => {
                    let value = params.get(name).ok_or_else(|| ProxyError::InvalidPath {
                        path: self.source.clone(),
                        reason: format!("missing parameter '{name}'"),
                    })?;
                    urlencoding::encode(value)
                }
            };
            path.push('/');
            path.push_str(&segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
