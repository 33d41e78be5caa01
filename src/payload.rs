//! CBOR payload decoding and generic field extraction.
//!
//! mcumgr payloads are self-describing CBOR maps. This module wraps the
//! [`ciborium`] codec and provides the typed field extractors that response
//! records are built from. Extraction is deliberately lenient: a key that is
//! absent, or present with an unexpected kind, yields `None` rather than an
//! error, because peers omit or reshape fields depending on firmware
//! version.

use std::collections::HashMap;

use ciborium::Value;

use crate::error::{Error, Result};
use crate::response::FromPayload;

/// Decode a byte buffer into a CBOR value.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    ciborium::de::from_reader(bytes).map_err(|e| Error::invalid_payload_owned(e.to_string()))
}

/// Encode a CBOR value into its byte form.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Look up `key` in a CBOR map value.
///
/// Returns `None` if the value is not a map or the key is not present with
/// a text key.
pub fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

/// Extract an unsigned integer field.
pub fn uint_field(payload: Option<&Value>, key: &str) -> Option<u64> {
    let value = map_get(payload?, key)?;
    u64::try_from(value.as_integer()?).ok()
}

/// Extract a text field.
pub fn text_field(payload: Option<&Value>, key: &str) -> Option<String> {
    let value = map_get(payload?, key)?;
    value.as_text().map(str::to_owned)
}

/// Extract a byte-string field.
pub fn bytes_field(payload: Option<&Value>, key: &str) -> Option<Vec<u8>> {
    let value = map_get(payload?, key)?;
    value.as_bytes().cloned()
}

/// Extract a boolean field.
pub fn bool_field(payload: Option<&Value>, key: &str) -> Option<bool> {
    let value = map_get(payload?, key)?;
    value.as_bool()
}

/// Extract an array of nested records, preserving source order.
///
/// Elements that fail to map are skipped; the rest of the array still
/// decodes.
pub fn record_array<T: FromPayload>(payload: Option<&Value>, key: &str) -> Option<Vec<T>> {
    let items = map_get(payload?, key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| T::from_payload(Some(item)).ok())
            .collect(),
    )
}

/// Extract a map of text keys to nested records.
///
/// Entries with non-text keys or unmappable values are skipped.
pub fn record_map<T: FromPayload>(payload: Option<&Value>, key: &str) -> Option<HashMap<String, T>> {
    let entries = map_get(payload?, key)?.as_map()?;
    Some(
        entries
            .iter()
            .filter_map(|(k, v)| {
                let name = k.as_text()?.to_owned();
                let record = T::from_payload(Some(v)).ok()?;
                Some((name, record))
            })
            .collect(),
    )
}
