use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{Schema, SchemaViolation};

/// Reserved keys of the wire envelope.
pub mod keys {
    /// Type tag selecting the payload schema and handler set
    pub const TYPE: &str = "type";
    /// Type-specific payload
    pub const DATA: &str = "data";
    /// Correlation identifier, present only on query/response pairs
    pub const ID: &str = "id";
}

/// Opaque identifier pairing a query with its response.
///
/// Generated by the sender and echoed verbatim by the responder; unique within
/// the lifetime of one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The message unit crossing the script/host boundary.
///
/// On the wire: `{ "type": <tag>, "data": <payload>, "id"?: <string> }`. A
/// missing `data` key is read as `null`, which is how an "undefined" payload
/// travels.
///
/// # Examples
///
/// ```
/// use framebridge_core::{CorrelationId, Envelope};
/// use serde_json::json;
///
/// let query = Envelope::query("setPlayerOutline", json!({"red": 255, "green": 0, "blue": 0}), CorrelationId::new("q-1"));
/// let wire = query.to_value();
/// assert_eq!(wire["type"], "setPlayerOutline");
/// assert_eq!(wire["id"], "q-1");
///
/// let answer = Envelope::parse(json!({"type": "setPlayerOutline", "id": "q-1"})).unwrap();
/// assert!(answer.data.is_null());
/// assert_eq!(answer.id, Some(CorrelationId::new("q-1")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
}

impl Envelope {
    /// One-way notification, no id.
    pub fn event(type_tag: impl Into<String>, data: Value) -> Self {
        Self {
            type_tag: type_tag.into(),
            data,
            id: None,
        }
    }

    pub fn query(type_tag: impl Into<String>, data: Value, id: CorrelationId) -> Self {
        Self {
            type_tag: type_tag.into(),
            data,
            id: Some(id),
        }
    }

    /// Builds the answer to this envelope: same type tag, same id.
    pub fn response(&self, data: Value) -> Self {
        Self {
            type_tag: self.type_tag.clone(),
            data,
            id: self.id.clone(),
        }
    }

    pub fn is_correlated(&self) -> bool {
        self.id.is_some()
    }

    /// Structural check of the envelope itself. The payload is not inspected
    /// here; that is the job of the schema registered for the type tag.
    pub fn parse(raw: Value) -> Result<Self, SchemaViolation> {
        envelope_schema().validate(&raw).map_err(|mut v| {
            v.path = v.path.replacen("data", "message", 1);
            v
        })?;
        serde_json::from_value(raw).map_err(|e| SchemaViolation {
            path: "message".into(),
            expected: "envelope".into(),
            found: e.to_string(),
        })
    }

    /// Wire form of the envelope.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(keys::TYPE.into(), Value::String(self.type_tag.clone()));
        map.insert(keys::DATA.into(), self.data.clone());
        if let Some(id) = &self.id {
            map.insert(keys::ID.into(), Value::String(id.as_str().to_string()));
        }
        Value::Object(map)
    }
}

fn envelope_schema() -> Schema {
    Schema::object()
        .field(keys::TYPE, Schema::string())
        .field(keys::DATA, Schema::any().optional())
        .field(keys::ID, Schema::string().optional())
        .build()
}
