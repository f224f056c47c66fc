//! `:name` placeholder handling shared by the store backends.

use serde_json::Value;

use super::store::{Params, StoreError};

/// Rewrite `:name` placeholders to positional `?` markers.
///
/// Returns the rewritten query and the parameter values in bind order. A
/// name used twice is bound twice. Placeholders inside single-quoted
/// literals and `::` casts are left alone.
pub fn to_positional(query: &str, params: &Params) -> Result<(String, Vec<Value>), StoreError> {
    let mut sql = String::with_capacity(query.len());
    let mut values = Vec::new();
    let mut chars = query.char_indices().peekable();
    let mut in_literal = false;
    let mut prev = '\0';

    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            in_literal = !in_literal;
        }
        let starts_name = chars
            .peek()
            .is_some_and(|&(_, n)| n.is_ascii_alphabetic() || n == '_');
        if c == ':' && !in_literal && prev != ':' && starts_name {
            let start = i + 1;
            let mut end = start;
            while let Some(&(j, n)) = chars.peek() {
                if n.is_ascii_alphanumeric() || n == '_' {
                    end = j + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let name = &query[start..end];
            let value = params
                .get(name)
                .ok_or_else(|| StoreError::MissingParam(name.to_string()))?;
            values.push(value.clone());
            sql.push('?');
            prev = 'x';
            continue;
        }
        sql.push(c);
        prev = c;
    }
    Ok((sql, values))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::store::params;

    #[test]
    fn rewrites_in_order_and_repeats() {
        let p = params([("w", json!("w1")), ("u", json!("u1"))]);
        let (sql, values) =
            to_positional("SELECT * FROM t WHERE a = :w AND b = :u OR c = :w", &p).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b = ? OR c = ?");
        assert_eq!(values, vec![json!("w1"), json!("u1"), json!("w1")]);
    }

    #[test]
    fn literals_and_casts_are_untouched() {
        let p = params([("id", json!(1))]);
        let (sql, values) =
            to_positional("SELECT ':nope', x::text FROM t WHERE id = :id;", &p).unwrap();
        assert_eq!(sql, "SELECT ':nope', x::text FROM t WHERE id = ?;");
        assert_eq!(values, vec![json!(1)]);
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let err = to_positional("SELECT :missing", &Params::new()).unwrap_err();
        assert!(matches!(err, StoreError::MissingParam(name) if name == "missing"));
    }
}
