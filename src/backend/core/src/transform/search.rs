//! Constraints on backend search queries.
//!
//! Search endpoints receive a free-form `query` parameter. The constrained
//! query is `<clause> AND <clause> ... AND (<caller query>)`, so the caller's
//! expression can only narrow the result set. A caller expression with
//! unbalanced parentheses or quotes could close the group early and is
//! rejected.

use url::form_urlencoded;

use crate::error::{ProxyError, Result};

/// Name of the query-string parameter carrying the search expression.
pub const QUERY_PARAM: &str = "query";

/// `<field> STARTS_WITH '<prefix>'`
pub fn starts_with_clause(field: &str, prefix: &str) -> Result<String> {
    Ok(format!("{field} STARTS_WITH {}", quoted(prefix)?))
}

/// `<field> = '<value>'`
pub fn equals_clause(field: &str, value: &str) -> Result<String> {
    Ok(format!("{field} = {}", quoted(value)?))
}

/// Rewrite a raw query string so every clause holds.
///
/// Parameters other than [`QUERY_PARAM`] are kept in order.
pub fn constrain_query(raw_query: Option<&str>, clauses: &[String]) -> Result<String> {
    let mut caller_query: Option<String> = None;
    let mut others = Vec::new();

    for (key, value) in form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes()) {
        if key == QUERY_PARAM {
            caller_query = Some(value.into_owned());
        } else {
            others.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut constraint = clauses.join(" AND ");
    if let Some(query) = caller_query.filter(|q| !q.trim().is_empty()) {
        assert_balanced(&query)?;
        constraint = format!("{constraint} AND ({query})");
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &others {
        serializer.append_pair(key, value);
    }
    serializer.append_pair(QUERY_PARAM, &constraint);
    Ok(serializer.finish())
}

fn quoted(value: &str) -> Result<String> {
    if value.contains('\'') {
        return Err(ProxyError::unrecognized(format!(
            "search value must not contain quotes: '{value}'"
        )));
    }
    Ok(format!("'{value}'"))
}

fn assert_balanced(query: &str) -> Result<()> {
    let mut depth: usize = 0;
    let mut in_quote = false;

    for c in query.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ProxyError::unrecognized("unbalanced parentheses in search query"))?;
            }
            _ => {}
        }
    }

    if depth != 0 || in_quote {
        return Err(ProxyError::unrecognized("unbalanced search query"));
    }
    Ok(())
}
