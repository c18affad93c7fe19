//! Records API request and response types.
//!
//! Every response is wrapped in a `{"code": 0, "data": {...}, "msg": "..."}`
//! envelope. Record fields are kept as raw JSON so normalization can apply
//! defaults field by field instead of failing the whole decode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// POST body for a forward page of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordsQuery {
    /// Epoch milliseconds of the first date to return.
    #[serde(rename = "fromDate")]
    pub from_date: i64,
    pub page_size: u32,
}

/// Top-level envelope for every records API response.
#[derive(Debug, Deserialize)]
pub struct RecordsEnvelope {
    /// `0` on success. A body without a code is not a records API reply.
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<RecordsPage>,
}

/// `data` payload: `{ "items": [...] }`. The API omits `items` (or sends
/// `null`) when nothing matches.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsPage {
    #[serde(default)]
    pub items: Option<Vec<RawRecord>>,
}

/// One raw record: `{ "fields": { "Date": ..., "Model": [{"text": ...}], ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawRecord {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
