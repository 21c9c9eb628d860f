use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Structural description of an inbound payload.
///
/// A `Schema` is a plain value, so the validator for a type tag can be stored,
/// cloned and composed before any message arrives. Validation only checks
/// presence and primitive kind; narrowing into a concrete Rust type happens
/// afterwards (see [`crate::payload::narrow`]).
///
/// Objects accept extra properties. Optional fields are absent-or-correct-kind:
/// an explicit `null` is rejected unless the inner schema is [`Schema::Null`].
///
/// # Examples
///
/// ```
/// use framebridge_core::Schema;
/// use serde_json::json;
///
/// let open_co_website = Schema::object()
///     .field("url", Schema::string())
///     .field("allowApi", Schema::boolean().optional())
///     .field("allowPolicy", Schema::string().optional())
///     .field("position", Schema::number().optional())
///     .build();
///
/// assert!(open_co_website.validate(&json!({"url": "https://example.org"})).is_ok());
/// assert!(open_co_website.validate(&json!({"url": 42})).is_err());
/// assert!(open_co_website.validate(&json!({"url": "x", "allowApi": "yes"})).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Any,
    Null,
    Bool,
    Number,
    String,
    Array(Box<Schema>),
    Object(Vec<(String, Schema)>),
    Optional(Box<Schema>),
}

impl Schema {
    pub fn any() -> Self {
        Schema::Any
    }

    pub fn null() -> Self {
        Schema::Null
    }

    pub fn boolean() -> Self {
        Schema::Bool
    }

    pub fn number() -> Self {
        Schema::Number
    }

    pub fn string() -> Self {
        Schema::String
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn object() -> ObjectSchema {
        ObjectSchema { fields: Vec::new() }
    }

    /// Wraps the schema in the optionality combinator. Idempotent.
    pub fn optional(self) -> Self {
        match self {
            Schema::Optional(_) => self,
            other => Schema::Optional(Box::new(other)),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Schema::Optional(_))
    }

    /// Validates a payload. The reported path is rooted at `data`.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.check(value, "data")
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        let ok = match self {
            Schema::Any => true,
            Schema::Null => value.is_null(),
            Schema::Bool => value.is_boolean(),
            Schema::Number => value.is_number(),
            Schema::String => value.is_string(),
            Schema::Array(items) => {
                let Some(elements) = value.as_array() else {
                    return Err(SchemaViolation::mismatch(path, self, value));
                };
                for (i, element) in elements.iter().enumerate() {
                    items.check(element, &format!("{path}[{i}]"))?;
                }
                true
            }
            Schema::Object(fields) => {
                let Some(object) = value.as_object() else {
                    return Err(SchemaViolation::mismatch(path, self, value));
                };
                for (name, field) in fields {
                    let field_path = format!("{path}.{name}");
                    match (object.get(name), field) {
                        (None, Schema::Optional(_)) => {}
                        (None, _) => return Err(SchemaViolation::missing(&field_path, field)),
                        // A present optional field must match its inner kind.
                        (Some(v), Schema::Optional(inner)) => inner.check(v, &field_path)?,
                        (Some(v), _) => field.check(v, &field_path)?,
                    }
                }
                true
            }
            // Outside of an object, JSON can only express "absent" as null.
            Schema::Optional(inner) => value.is_null() || inner.check(value, path).is_ok(),
        };

        if ok {
            Ok(())
        } else {
            Err(SchemaViolation::mismatch(path, self, value))
        }
    }

    /// Human readable name of the expected shape, used in violations.
    pub fn describe(&self) -> String {
        match self {
            Schema::Any => "any value".into(),
            Schema::Null => "null".into(),
            Schema::Bool => "boolean".into(),
            Schema::Number => "number".into(),
            Schema::String => "string".into(),
            Schema::Array(items) => format!("array of {}", items.describe()),
            Schema::Object(_) => "object".into(),
            Schema::Optional(inner) => format!("optional {}", inner.describe()),
        }
    }
}

/// Builder for [`Schema::Object`].
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, Schema)>,
}

impl ObjectSchema {
    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push((name.into(), schema));
        self
    }

    pub fn build(self) -> Schema {
        Schema::Object(self.fields)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        object.build()
    }
}

/// Reason a payload was rejected at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("at `{path}`: expected {expected}, found {found}")]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl SchemaViolation {
    fn mismatch(path: &str, schema: &Schema, value: &Value) -> Self {
        Self {
            path: path.to_string(),
            expected: schema.describe(),
            found: kind_of(value).to_string(),
        }
    }

    fn missing(path: &str, schema: &Schema) -> Self {
        Self {
            path: path.to_string(),
            expected: schema.describe(),
            found: "nothing".to_string(),
        }
    }

    /// The type tag has no schema, so nothing about the payload can be trusted.
    pub fn unregistered(type_tag: &str) -> Self {
        Self {
            path: "type".to_string(),
            expected: "a registered type tag".to_string(),
            found: format!("`{type_tag}`"),
        }
    }
}

/// JSON kind of a value, as reported in violations.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Type tag → schema table consulted at the boundary.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, replacing any previous one for the tag.
    pub fn register(&self, type_tag: impl Into<String>, schema: Schema) -> Option<Schema> {
        let type_tag = type_tag.into();
        debug!(target: "schema", type_tag = %type_tag, expected = %schema.describe(), "Registering schema");
        self.schemas.insert(type_tag, schema)
    }

    /// Registers a schema only if the tag has none yet. Returns true on insert.
    pub fn ensure(&self, type_tag: &str, schema: Schema) -> bool {
        if self.schemas.contains_key(type_tag) {
            return false;
        }
        self.register(type_tag, schema);
        true
    }

    pub fn get(&self, type_tag: &str) -> Option<Schema> {
        self.schemas.get(type_tag).map(|s| s.clone())
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.schemas.contains_key(type_tag)
    }

    /// Checks `data` against the schema registered for `type_tag`.
    pub fn check(&self, type_tag: &str, data: &Value) -> Result<(), SchemaViolation> {
        match self.schemas.get(type_tag) {
            Some(schema) => schema.validate(data),
            None => Err(SchemaViolation::unregistered(type_tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn moved() -> Schema {
        Schema::object()
            .field("direction", Schema::string())
            .field("moving", Schema::boolean())
            .field("x", Schema::number())
            .field("y", Schema::number())
            .build()
    }

    #[test]
    fn accepts_complete_payload_with_extra_fields() {
        let payload = json!({"direction": "up", "moving": true, "x": 1, "y": 2.5, "extra": []});
        assert!(moved().validate(&payload).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = moved()
            .validate(&json!({"direction": "up", "moving": true, "x": 1}))
            .unwrap_err();
        assert_eq!(err.path, "data.y");
        assert_eq!(err.found, "nothing");
    }

    #[test]
    fn rejects_wrong_kind() {
        let err = moved()
            .validate(&json!({"direction": "up", "moving": "yes", "x": 1, "y": 2}))
            .unwrap_err();
        assert_eq!(err.path, "data.moving");
        assert_eq!(err.expected, "boolean");
        assert_eq!(err.found, "string");
    }

    #[test]
    fn optional_is_absent_or_correct_kind() {
        let schema = Schema::object()
            .field("url", Schema::string())
            .field("position", Schema::number().optional())
            .build();

        assert!(schema.validate(&json!({"url": "a"})).is_ok());
        assert!(schema.validate(&json!({"url": "a", "position": 2})).is_ok());
        assert!(schema.validate(&json!({"url": "a", "position": "2"})).is_err());
        assert!(schema.validate(&json!({"url": "a", "position": null})).is_err());
    }

    #[test]
    fn nested_arrays_report_index() {
        let schema = Schema::object()
            .field("tags", Schema::array(Schema::string()))
            .build();
        let err = schema
            .validate(&json!({"tags": ["admin", 3]}))
            .unwrap_err();
        assert_eq!(err.path, "data.tags[1]");
    }

    #[test]
    fn non_object_payload_rejected_by_object_schema() {
        assert!(moved().validate(&json!("moved")).is_err());
        assert!(moved().validate(&Value::Null).is_err());
    }

    #[test]
    fn optional_is_idempotent() {
        assert_eq!(
            Schema::string().optional().optional(),
            Schema::Optional(Box::new(Schema::String))
        );
    }

    #[test]
    fn registry_rejects_unregistered_tags() {
        let registry = SchemaRegistry::new();
        assert!(registry.ensure("hasPlayerMoved", moved()));
        assert!(!registry.ensure("hasPlayerMoved", Schema::any()));

        let err = registry.check("unknown", &json!({})).unwrap_err();
        assert_eq!(err.path, "type");
        assert!(registry
            .check("hasPlayerMoved", &json!({"direction": "up", "moving": false, "x": 0, "y": 0}))
            .is_ok());
    }
}
