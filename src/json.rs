//! Field accessors shared by the `from_json` constructors.
//!
//! The canonical renderings themselves live next to the types they
//! serialize; these helpers only turn missing or mistyped fields into
//! [`Error::InvalidJson`] values.

use crate::error::{Error, Result};
use serde_json::Value;

pub(crate) fn get<'v>(value: &'v Value, key: &str) -> Result<&'v Value> {
    value
        .get(key)
        .ok_or_else(|| Error::InvalidJson(format!("missing field `{}`", key)))
}

pub(crate) fn get_usize(value: &Value, key: &str) -> Result<usize> {
    get(value, key)?
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| Error::InvalidJson(format!("field `{}` is not an unsigned integer", key)))
}

pub(crate) fn get_i64(value: &Value, key: &str) -> Result<i64> {
    get(value, key)?
        .as_i64()
        .ok_or_else(|| Error::InvalidJson(format!("field `{}` is not an integer", key)))
}

pub(crate) fn get_str<'v>(value: &'v Value, key: &str) -> Result<&'v str> {
    get(value, key)?
        .as_str()
        .ok_or_else(|| Error::InvalidJson(format!("field `{}` is not a string", key)))
}

pub(crate) fn get_bool(value: &Value, key: &str) -> Result<bool> {
    get(value, key)?
        .as_bool()
        .ok_or_else(|| Error::InvalidJson(format!("field `{}` is not a boolean", key)))
}

pub(crate) fn get_array<'v>(value: &'v Value, key: &str) -> Result<&'v Vec<Value>> {
    get(value, key)?
        .as_array()
        .ok_or_else(|| Error::InvalidJson(format!("field `{}` is not an array", key)))
}

/// Checks the `type` tag automata renderings carry.
pub(crate) fn expect_type(value: &Value, expected: &str) -> Result<()> {
    let tag = get_str(value, "type")?;
    if tag == expected {
        Ok(())
    } else {
        Err(Error::InvalidJson(format!(
            "expected type `{}`, found `{}`",
            expected, tag
        )))
    }
}

/// Parses a single-character string field into a byte.
pub(crate) fn get_byte(value: &Value, key: &str) -> Result<u8> {
    let s = get_str(value, key)?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if (c as u32) < 0x100 => Ok(c as u8),
        _ => Err(Error::InvalidJson(format!(
            "field `{}` is not a single character",
            key
        ))),
    }
}
