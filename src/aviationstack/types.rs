//! Normalized success envelope, insulating callers from provider quirks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::PROVIDER;

/// Result-set metadata lifted from the provider's `pagination` object.
///
/// Optional fields serialize as explicit nulls so the envelope shape is
/// stable across endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub provider: String,
    pub resource: String,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub total: Option<u64>,
}

/// Normalized successful payload returned from the Aviationstack API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    pub meta: Meta,
    /// Always a sequence; a singleton response body is wrapped.
    pub items: Vec<Value>,
    /// The full, unmodified provider response body.
    pub raw: Value,
}

/// Maps the raw Aviationstack shape into the stable envelope.
pub fn normalize(resource: &str, body: Value) -> SuccessEnvelope {
    let items = match body.get("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(list)) => list.clone(),
        // Some endpoints return a single object instead of a list.
        Some(single) => vec![single.clone()],
    };

    let pagination = body.get("pagination");
    let field = |name: &str| pagination.and_then(|p| p.get(name)).and_then(Value::as_u64);

    SuccessEnvelope {
        meta: Meta {
            provider: PROVIDER.to_string(),
            resource: resource.to_string(),
            page: field("current_page"),
            per_page: field("limit"),
            total: field("total"),
        },
        items,
        raw: body,
    }
}
