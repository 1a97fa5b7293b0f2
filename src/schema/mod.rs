//! Declarative descriptions of the values an endpoint accepts and returns.
//!
//! A [`Schema`] is cheap to clone and compared structurally through its [`fingerprint`](Schema::fingerprint). Schemas are compiled into validators by the [`Compiler`](crate::Compiler), which is where decoding and encoding actually happen.

mod codec;
mod merge;
pub(crate) mod parser;

use std::{fmt, sync::Arc, sync::OnceLock};

use serde_json::{json, Map, Value};

pub use codec::{Codec, CodecError, DateCodec, FnCodec};
pub use merge::MergeError;
pub use parser::{ParseResult, PathSegment, ValidationErrors, ValidationIssue};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberRules {
    pub integer: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

/// The fields of an object schema in declaration order.
///
/// Unknown keys are stripped while decoding unless the object is `strict`, in which case they are rejected.
#[derive(Debug, Clone, Default)]
pub struct ObjectShape {
    pub fields: Vec<Field>,
    pub strict: bool,
}

impl ObjectShape {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone)]
#[non_exhaustive]
pub enum SchemaKind {
    Any,
    Never,
    Null,
    Boolean,
    String(StringRules),
    Number(NumberRules),
    Literal(Value),
    Array {
        item: Schema,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object(ObjectShape),
    /// The first variant that decodes wins.
    Union(Vec<Schema>),
    Nullable(Schema),
    /// `wire` describes the value on the wire, `codec` converts between it and the internal value.
    Transform {
        wire: Schema,
        codec: Arc<dyn Codec>,
    },
}

impl SchemaKind {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Any => "any",
            SchemaKind::Never => "never",
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::String(_) => "string",
            SchemaKind::Number(_) => "number",
            SchemaKind::Literal(_) => "literal",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object(_) => "object",
            SchemaKind::Union(_) => "union",
            SchemaKind::Nullable(_) => "nullable",
            SchemaKind::Transform { .. } => "transform",
        }
    }
}

impl fmt::Debug for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(rules) => f.debug_tuple("String").field(rules).finish(),
            Self::Number(rules) => f.debug_tuple("Number").field(rules).finish(),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Array {
                item,
                min_items,
                max_items,
            } => f
                .debug_struct("Array")
                .field("item", item)
                .field("min_items", min_items)
                .field("max_items", max_items)
                .finish(),
            Self::Object(shape) => f.debug_tuple("Object").field(shape).finish(),
            Self::Union(variants) => f.debug_tuple("Union").field(variants).finish(),
            Self::Nullable(inner) => f.debug_tuple("Nullable").field(inner).finish(),
            Self::Transform { wire, codec } => f
                .debug_struct("Transform")
                .field("wire", wire)
                .field("codec", &codec.name())
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Clone)]
struct Inner {
    kind: SchemaKind,
    description: Option<String>,
    fingerprint: OnceLock<String>,
}

/// A structural description of a value.
///
/// ```rust
/// use ptsq::Schema;
///
/// let args = Schema::object()
///     .field("name", Schema::string().min_length(1))
///     .optional_field("age", Schema::integer().minimum(0.0));
///
/// let same = Schema::object()
///     .optional_field("age", Schema::integer().minimum(0.0))
///     .field("name", Schema::string().min_length(1));
///
/// assert_eq!(args.fingerprint(), same.fingerprint());
/// ```
#[derive(Clone)]
pub struct Schema(Arc<Inner>);

impl Schema {
    pub fn from_kind(kind: SchemaKind) -> Self {
        Self(Arc::new(Inner {
            kind,
            description: None,
            fingerprint: OnceLock::new(),
        }))
    }

    pub fn any() -> Self {
        Self::from_kind(SchemaKind::Any)
    }

    /// Matches nothing. Used by introspection for endpoints without arguments.
    pub fn never() -> Self {
        Self::from_kind(SchemaKind::Never)
    }

    pub fn null() -> Self {
        Self::from_kind(SchemaKind::Null)
    }

    pub fn boolean() -> Self {
        Self::from_kind(SchemaKind::Boolean)
    }

    pub fn string() -> Self {
        Self::from_kind(SchemaKind::String(StringRules::default()))
    }

    pub fn number() -> Self {
        Self::from_kind(SchemaKind::Number(NumberRules::default()))
    }

    pub fn integer() -> Self {
        Self::from_kind(SchemaKind::Number(NumberRules {
            integer: true,
            ..Default::default()
        }))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::from_kind(SchemaKind::Literal(value.into()))
    }

    pub fn array(item: Schema) -> Self {
        Self::from_kind(SchemaKind::Array {
            item,
            min_items: None,
            max_items: None,
        })
    }

    pub fn object() -> Self {
        Self::from_kind(SchemaKind::Object(ObjectShape::default()))
    }

    pub fn union(variants: impl IntoIterator<Item = Schema>) -> Self {
        Self::from_kind(SchemaKind::Union(variants.into_iter().collect()))
    }

    /// An RFC 3339 string on the wire, normalised to UTC internally.
    pub fn date() -> Self {
        Self::transform(Self::string(), DateCodec)
    }

    pub fn transform(wire: Schema, codec: impl Codec) -> Self {
        Self::from_kind(SchemaKind::Transform {
            wire,
            codec: Arc::new(codec),
        })
    }

    pub fn transform_fn<D, E>(name: impl Into<String>, wire: Schema, decode: D, encode: E) -> Self
    where
        D: Fn(Value) -> Result<Value, CodecError> + Send + Sync + 'static,
        E: Fn(Value) -> Result<Value, CodecError> + Send + Sync + 'static,
    {
        Self::transform(wire, FnCodec::new(name, decode, encode))
    }

    pub fn nullable(self) -> Self {
        Self::from_kind(SchemaKind::Nullable(self))
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.edit(|inner| inner.description = Some(description))
    }

    /// No effect unless this is a string schema.
    pub fn min_length(self, min: usize) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::String(rules) = kind {
                rules.min_length = Some(min);
            }
        })
    }

    /// No effect unless this is a string schema.
    pub fn max_length(self, max: usize) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::String(rules) = kind {
                rules.max_length = Some(max);
            }
        })
    }

    /// No effect unless this is a string schema. The pattern is checked when the router is built.
    pub fn pattern(self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.edit_kind(|kind| {
            if let SchemaKind::String(rules) = kind {
                rules.pattern = Some(pattern);
            }
        })
    }

    /// No effect unless this is a number schema.
    pub fn minimum(self, min: f64) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::Number(rules) = kind {
                rules.minimum = Some(min);
            }
        })
    }

    /// No effect unless this is a number schema.
    pub fn maximum(self, max: f64) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::Number(rules) = kind {
                rules.maximum = Some(max);
            }
        })
    }

    /// No effect unless this is an array schema.
    pub fn min_items(self, min: usize) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::Array { min_items, .. } = kind {
                *min_items = Some(min);
            }
        })
    }

    /// No effect unless this is an array schema.
    pub fn max_items(self, max: usize) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::Array { max_items, .. } = kind {
                *max_items = Some(max);
            }
        })
    }

    /// Add a required field. Redeclaring a field replaces it. No effect unless this is an object schema.
    pub fn field(self, name: impl Into<String>, schema: Schema) -> Self {
        self.push_field(name.into(), schema, true)
    }

    /// Add an optional field. Redeclaring a field replaces it. No effect unless this is an object schema.
    pub fn optional_field(self, name: impl Into<String>, schema: Schema) -> Self {
        self.push_field(name.into(), schema, false)
    }

    /// Reject unknown keys instead of stripping them. No effect unless this is an object schema.
    pub fn strict(self) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::Object(shape) = kind {
                shape.strict = true;
            }
        })
    }

    /// This schema with `strict` cleared on every object inside it.
    pub(crate) fn lenient(&self) -> Self {
        let kind = match self.kind() {
            SchemaKind::Object(shape) => SchemaKind::Object(ObjectShape {
                fields: shape
                    .fields
                    .iter()
                    .map(|field| Field {
                        schema: field.schema.lenient(),
                        ..field.clone()
                    })
                    .collect(),
                strict: false,
            }),
            SchemaKind::Array {
                item,
                min_items,
                max_items,
            } => SchemaKind::Array {
                item: item.lenient(),
                min_items: *min_items,
                max_items: *max_items,
            },
            SchemaKind::Union(variants) => {
                SchemaKind::Union(variants.iter().map(Schema::lenient).collect())
            }
            SchemaKind::Nullable(inner) => SchemaKind::Nullable(inner.lenient()),
            SchemaKind::Transform { wire, codec } => SchemaKind::Transform {
                wire: wire.lenient(),
                codec: codec.clone(),
            },
            _ => return self.clone(),
        };
        self.clone().edit_kind(|k| *k = kind)
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.0.kind
    }

    pub fn get_description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// The canonical structural serialization of this schema.
    ///
    /// Two schemas with the same fingerprint validate identically. Descriptions aren't part of it and object fields are ordered by name.
    pub fn fingerprint(&self) -> &str {
        self.0
            .fingerprint
            .get_or_init(|| self.canonical().to_string())
    }

    /// The wire-side JSON Schema of this schema.
    pub fn json_schema(&self) -> Value {
        let mut schema = match self.kind() {
            SchemaKind::Any => json!({}),
            SchemaKind::Never => json!({ "not": {} }),
            SchemaKind::Null => json!({ "type": "null" }),
            SchemaKind::Boolean => json!({ "type": "boolean" }),
            SchemaKind::String(rules) => {
                let mut s = Map::new();
                s.insert("type".into(), "string".into());
                if let Some(min) = rules.min_length {
                    s.insert("minLength".into(), min.into());
                }
                if let Some(max) = rules.max_length {
                    s.insert("maxLength".into(), max.into());
                }
                if let Some(pattern) = &rules.pattern {
                    s.insert("pattern".into(), pattern.clone().into());
                }
                Value::Object(s)
            }
            SchemaKind::Number(rules) => {
                let mut s = Map::new();
                let ty = if rules.integer { "integer" } else { "number" };
                s.insert("type".into(), ty.into());
                if let Some(min) = rules.minimum {
                    s.insert("minimum".into(), min.into());
                }
                if let Some(max) = rules.maximum {
                    s.insert("maximum".into(), max.into());
                }
                Value::Object(s)
            }
            SchemaKind::Literal(value) => json!({ "const": value }),
            SchemaKind::Array {
                item,
                min_items,
                max_items,
            } => {
                let mut s = Map::new();
                s.insert("type".into(), "array".into());
                s.insert("items".into(), item.json_schema());
                if let Some(min) = min_items {
                    s.insert("minItems".into(), (*min).into());
                }
                if let Some(max) = max_items {
                    s.insert("maxItems".into(), (*max).into());
                }
                Value::Object(s)
            }
            SchemaKind::Object(shape) => {
                let properties = shape
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.schema.json_schema()))
                    .collect::<Map<_, _>>();
                let required = shape
                    .fields
                    .iter()
                    .filter(|f| f.required)
                    .map(|f| Value::from(f.name.clone()))
                    .collect::<Vec<_>>();

                let mut s = Map::new();
                s.insert("type".into(), "object".into());
                s.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    s.insert("required".into(), Value::Array(required));
                }
                if shape.strict {
                    s.insert("additionalProperties".into(), false.into());
                }
                Value::Object(s)
            }
            SchemaKind::Union(variants) => {
                json!({ "anyOf": variants.iter().map(Schema::json_schema).collect::<Vec<_>>() })
            }
            SchemaKind::Nullable(inner) => {
                json!({ "anyOf": [inner.json_schema(), { "type": "null" }] })
            }
            SchemaKind::Transform { wire, .. } => wire.json_schema(),
        };

        if let (Some(description), Value::Object(map)) = (self.get_description(), &mut schema) {
            map.insert("description".into(), description.into());
        }
        schema
    }

    /// Every regex pattern declared anywhere in this schema.
    pub(crate) fn patterns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_patterns(&mut out);
        out
    }

    fn collect_patterns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self.kind() {
            SchemaKind::String(StringRules {
                pattern: Some(pattern),
                ..
            }) => out.push(pattern),
            SchemaKind::Array { item, .. } => item.collect_patterns(out),
            SchemaKind::Object(shape) => shape
                .fields
                .iter()
                .for_each(|f| f.schema.collect_patterns(out)),
            SchemaKind::Union(variants) => variants.iter().for_each(|v| v.collect_patterns(out)),
            SchemaKind::Nullable(inner) => inner.collect_patterns(out),
            SchemaKind::Transform { wire, .. } => wire.collect_patterns(out),
            _ => {}
        }
    }

    fn canonical(&self) -> Value {
        match self.kind() {
            SchemaKind::String(rules) => json!({
                "kind": "string",
                "minLength": rules.min_length,
                "maxLength": rules.max_length,
                "pattern": rules.pattern,
            }),
            SchemaKind::Number(rules) => json!({
                "kind": "number",
                "integer": rules.integer,
                "minimum": rules.minimum,
                "maximum": rules.maximum,
            }),
            SchemaKind::Literal(value) => json!({ "kind": "literal", "value": value }),
            SchemaKind::Array {
                item,
                min_items,
                max_items,
            } => json!({
                "kind": "array",
                "item": item.canonical(),
                "minItems": min_items,
                "maxItems": max_items,
            }),
            SchemaKind::Object(shape) => {
                let mut fields = shape.fields.iter().collect::<Vec<_>>();
                fields.sort_by(|a, b| a.name.cmp(&b.name));
                json!({
                    "kind": "object",
                    "strict": shape.strict,
                    "fields": fields
                        .into_iter()
                        .map(|f| json!([f.name, f.required, f.schema.canonical()]))
                        .collect::<Vec<_>>(),
                })
            }
            SchemaKind::Union(variants) => json!({
                "kind": "union",
                "variants": variants.iter().map(Schema::canonical).collect::<Vec<_>>(),
            }),
            SchemaKind::Nullable(inner) => json!({ "kind": "nullable", "inner": inner.canonical() }),
            SchemaKind::Transform { wire, codec } => json!({
                "kind": "transform",
                "codec": codec.name(),
                "wire": wire.canonical(),
            }),
            other => json!({ "kind": other.name() }),
        }
    }

    fn push_field(self, name: String, schema: Schema, required: bool) -> Self {
        self.edit_kind(|kind| {
            if let SchemaKind::Object(shape) = kind {
                let field = Field {
                    name,
                    schema,
                    required,
                };
                match shape.fields.iter_mut().find(|f| f.name == field.name) {
                    Some(existing) => *existing = field,
                    None => shape.fields.push(field),
                }
            }
        })
    }

    fn edit_kind(self, func: impl FnOnce(&mut SchemaKind)) -> Self {
        self.edit(|inner| func(&mut inner.kind))
    }

    fn edit(self, func: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone());
        func(&mut inner);
        inner.fingerprint = OnceLock::new();
        Self(Arc::new(inner))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_description() {
            Some(description) => f
                .debug_struct("Schema")
                .field("kind", self.kind())
                .field("description", &description)
                .finish(),
            None => fmt::Debug::fmt(self.kind(), f),
        }
    }
}

/// Structural equality, based on [`Schema::fingerprint`].
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.fingerprint() == other.fingerprint()
    }
}

impl Eq for Schema {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_field_order_and_description() {
        let a = Schema::object()
            .field("a", Schema::string())
            .field("b", Schema::number())
            .description("first");
        let b = Schema::object()
            .field("b", Schema::number())
            .field("a", Schema::string());

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_sees_constraints() {
        assert_ne!(
            Schema::string().fingerprint(),
            Schema::string().min_length(1).fingerprint()
        );
        assert_ne!(
            Schema::object().field("a", Schema::string()).fingerprint(),
            Schema::object()
                .optional_field("a", Schema::string())
                .fingerprint()
        );
        assert_ne!(
            Schema::date().fingerprint(),
            Schema::string().fingerprint()
        );
    }

    #[test]
    fn edits_do_not_touch_shared_schemas() {
        let base = Schema::object().field("a", Schema::string());
        let _ = base.fingerprint();
        let extended = base.clone().field("b", Schema::boolean());

        match base.kind() {
            SchemaKind::Object(shape) => assert_eq!(shape.fields.len(), 1),
            _ => unreachable!(),
        }
        match extended.kind() {
            SchemaKind::Object(shape) => assert_eq!(shape.fields.len(), 2),
            _ => unreachable!(),
        }
        assert_ne!(base.fingerprint(), extended.fingerprint());
    }

    #[test]
    fn rules_ignore_other_kinds() {
        let s = Schema::boolean().min_length(3).maximum(1.0);
        assert_eq!(s, Schema::boolean());
    }

    #[test]
    fn json_schema() {
        let schema = Schema::object()
            .field("name", Schema::string().min_length(1))
            .optional_field("tags", Schema::array(Schema::string()).max_items(3))
            .field("createdAt", Schema::date())
            .field("kind", Schema::union([Schema::literal("a"), Schema::literal("b")]))
            .strict();

        assert_eq!(
            schema.json_schema(),
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "tags": { "type": "array", "items": { "type": "string" }, "maxItems": 3 },
                    "createdAt": { "type": "string" },
                    "kind": { "anyOf": [{ "const": "a" }, { "const": "b" }] },
                },
                "required": ["name", "createdAt", "kind"],
                "additionalProperties": false,
            })
        );

        assert_eq!(
            Schema::integer().nullable().description("maybe").json_schema(),
            json!({
                "anyOf": [{ "type": "integer" }, { "type": "null" }],
                "description": "maybe",
            })
        );
        assert_eq!(Schema::never().json_schema(), json!({ "not": {} }));
    }

    #[test]
    fn collects_nested_patterns() {
        let schema = Schema::object()
            .field("a", Schema::string().pattern("^a+$"))
            .field("b", Schema::array(Schema::string().pattern("^b$")).nullable());
        assert_eq!(schema.patterns(), vec!["^a+$", "^b$"]);
    }

    #[test]
    fn lenient_clears_nested_strictness() {
        let schema = Schema::object()
            .field("a", Schema::array(Schema::object().field("b", Schema::string()).strict()).nullable())
            .strict()
            .description("outer");
        let expected = Schema::object()
            .field("a", Schema::array(Schema::object().field("b", Schema::string())).nullable());

        assert_eq!(schema.lenient(), expected);
        assert_eq!(schema.lenient().get_description(), Some("outer"));
        assert_eq!(Schema::string().lenient(), Schema::string());
    }
}
