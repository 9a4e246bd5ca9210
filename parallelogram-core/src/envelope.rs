use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation tag carried in every request envelope. Serializes to the
/// lowercase ASCII strings the spec's wire protocol names
/// (`"map"` / `"filter"` / `"reduce"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Map,
    Filter,
    Reduce,
}

/// An opaque, self-contained reference to a user-registered handler.
///
/// §9's design note observes that a literal closure can't cross the wire in
/// a language without Python's pickling of arbitrary code objects. This
/// resolves that per SPEC_FULL §10.5: the caller registers a named handler
/// with every worker ahead of time (`HandlerRegistry::register_*`), and the
/// wire-level token is just the handler's name plus whatever bound
/// arguments the caller wants shipped alongside each chunk (the original's
/// `func` dict entry, e.g. a predicate's divisor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnToken {
    pub name: String,
    #[serde(default)]
    pub bound_args: Value,
}

impl FnToken {
    pub fn new(name: impl Into<String>) -> Self {
        FnToken {
            name: name.into(),
            bound_args: Value::Null,
        }
    }

    pub fn with_args(name: impl Into<String>, bound_args: Value) -> Self {
        FnToken {
            name: name.into(),
            bound_args,
        }
    }
}

/// Client -> worker. One envelope per chunk, per round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub op: Operation,
    pub fn_token: FnToken,
    pub chunk: Vec<Value>,
    pub index: u32,
}

/// Worker -> client. `chunk` is a sequence for map/filter and a
/// one-element sequence containing the fold result for reduce.
///
/// `Error` is the §9/§4.8 upgrade of the reference worker's "return a
/// human-readable diagnostic string" defect: an unrecognized `op` (or a
/// `fn_token.name` with no registered handler) gets a distinct error
/// variant instead of being silently answered as if it were data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
    #[serde(rename = "ok")]
    Ok { index: u32, chunk: Vec<Value> },
    #[serde(rename = "error")]
    Error { index: u32, message: String },
}
