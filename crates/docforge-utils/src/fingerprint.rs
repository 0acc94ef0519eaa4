//! Content fingerprints for outbound request de-duplication
//!
//! A fingerprint is the BLAKE3 hex digest of the JCS-canonical (RFC 8785)
//! JSON encoding of the `(verb, path, params, body)` tuple. JCS makes the
//! digest independent of field ordering in the source structs, so identical
//! requests always collapse to the same cache key.

use anyhow::{Context, Result};
use blake3::Hasher;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct RequestTuple<'a> {
    verb: &'a str,
    path: &'a str,
    params: &'a Value,
    body: &'a Value,
}

/// Emit a value as JCS-canonical JSON (RFC 8785).
///
/// # Errors
///
/// Returns an error if the value cannot be serialized to JSON or the
/// canonicalizer rejects it (e.g. non-finite floats).
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String> {
    let json_value =
        serde_json::to_value(value).with_context(|| "Failed to serialize value to JSON")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize JSON using JCS")?;
    String::from_utf8(json_bytes).with_context(|| "JCS output contained invalid UTF-8")
}

/// Compute the fingerprint of an outbound request.
///
/// Pure: identical inputs always yield identical fingerprints, and any field
/// change yields a different fingerprint with overwhelming probability.
/// Pass `Value::Null` for an absent params or body.
#[must_use]
pub fn fingerprint_of(verb: &str, path: &str, params: &Value, body: &Value) -> String {
    let tuple = RequestTuple {
        verb,
        path,
        params,
        body,
    };
    // The tuple is plain strings and JSON values; canonicalization cannot
    // fail for it, so fall back to the non-canonical encoding rather than
    // propagate an error from a hash function.
    let canonical = emit_jcs(&tuple)
        .unwrap_or_else(|_| format!("{verb}\u{0}{path}\u{0}{params}\u{0}{body}"));

    let mut hasher = Hasher::new();
    hasher.update(canonical.as_bytes());
    hasher.finalize().to_hex().to_string()
}
