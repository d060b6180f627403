//! `--arg key=value` parsing for `submit-task`.
//!
//! Every value arrives as a string from the shell; it's coerced to the
//! most specific JSON type it parses as, falling back to a plain string.
//! Order matters: an int literal must not become a float, and the literal
//! strings `true`/`false` must not become the word "true".

use crate::error::CliError;

/// Parse one `key=value` pair into a `(key, coerced JSON value)`.
pub fn parse_kv(raw: &str) -> Result<(String, serde_json::Value), CliError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::InvalidArgFormat(raw.to_string()))?;
    Ok((key.to_string(), coerce(value)))
}

/// Build a `kwargs` object from a list of `key=value` strings.
pub fn parse_kwargs(raw: &[String]) -> Result<serde_json::Value, CliError> {
    let mut map = serde_json::Map::new();
    for entry in raw {
        let (key, value) = parse_kv(entry)?;
        map.insert(key, value);
    }
    Ok(serde_json::Value::Object(map))
}

fn coerce(value: &str) -> serde_json::Value {
    if let Ok(i) = value.parse::<i64>() {
        return serde_json::json!(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return serde_json::json!(f);
    }
    match value {
        "true" => return serde_json::json!(true),
        "false" => return serde_json::json!(false),
        _ => {}
    }
    serde_json::json!(value)
}
