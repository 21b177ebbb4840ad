//! Result envelope shared by the ordination wrappers.
//!
//! An [`ordina_core::OrdinaError`] crosses the boundary as its display
//! message under `"error"`; a successful value is serialized under `"ok"`.
//! JSON arguments that fail to parse are reported with the argument name
//! so callers can tell `samples` from `config` problems.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize a success value as `{"ok": val}`.
pub fn wasm_ok<T: Serialize>(val: &T) -> String {
    #[derive(Serialize)]
    struct Ok<'a, T: Serialize> {
        ok: &'a T,
    }
    serde_json::to_string(&Ok { ok: val }).unwrap_or_else(wasm_err)
}

/// Serialize an error as `{"error": "msg"}`.
pub fn wasm_err(msg: impl Display) -> String {
    #[derive(Serialize)]
    struct Err {
        error: String,
    }
    serde_json::to_string(&Err {
        error: msg.to_string(),
    })
    .unwrap_or_else(|_| r#"{"error":"serialization failed"}"#.into())
}

/// Map an `ordina_core::Result<T>` into the JSON envelope.
pub fn wasm_result<T: Serialize>(r: ordina_core::Result<T>) -> String {
    match r {
        Ok(val) => wasm_ok(&val),
        Err(e) => wasm_err(e),
    }
}

/// Parse a JSON argument, naming it in the error message.
pub(crate) fn parse_json<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| {
        tracing::debug!(argument = what, error = %e, "rejected JSON argument");
        format!("invalid {what} JSON: {e}")
    })
}
