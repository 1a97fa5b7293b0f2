use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use moka::sync::Cache;
use regex::Regex;
use serde_json::Value;

use crate::schema::{parser, Codec, NumberRules, ParseResult, Schema, SchemaKind};

pub(crate) enum Pattern {
    Valid(Regex),
    // Patterns are checked by `Router::build` so this only happens for schemas compiled outside a router.
    Invalid(String),
}

pub(crate) struct CompiledField {
    pub(crate) name: String,
    pub(crate) node: Node,
    pub(crate) required: bool,
}

pub(crate) enum Node {
    Any,
    Never,
    Null,
    Boolean,
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Pattern>,
    },
    Number(NumberRules),
    Literal(Value),
    Array {
        item: Box<Node>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        fields: Vec<CompiledField>,
        known: HashSet<String>,
        strict: bool,
    },
    Union(Vec<Node>),
    Nullable(Box<Node>),
    Transform {
        wire: Box<Node>,
        codec: Arc<dyn Codec>,
    },
}

impl Node {
    fn compile(schema: &Schema) -> Self {
        match schema.kind() {
            SchemaKind::Any => Node::Any,
            SchemaKind::Never => Node::Never,
            SchemaKind::Null => Node::Null,
            SchemaKind::Boolean => Node::Boolean,
            SchemaKind::String(rules) => Node::String {
                min_length: rules.min_length,
                max_length: rules.max_length,
                pattern: rules.pattern.as_ref().map(|p| match Regex::new(p) {
                    Ok(regex) => Pattern::Valid(regex),
                    Err(_) => Pattern::Invalid(p.clone()),
                }),
            },
            SchemaKind::Number(rules) => Node::Number(rules.clone()),
            SchemaKind::Literal(value) => Node::Literal(value.clone()),
            SchemaKind::Array {
                item,
                min_items,
                max_items,
            } => Node::Array {
                item: Box::new(Node::compile(item)),
                min_items: *min_items,
                max_items: *max_items,
            },
            SchemaKind::Object(shape) => Node::Object {
                fields: shape
                    .fields
                    .iter()
                    .map(|f| CompiledField {
                        name: f.name.clone(),
                        node: Node::compile(&f.schema),
                        required: f.required,
                    })
                    .collect(),
                known: shape.fields.iter().map(|f| f.name.clone()).collect(),
                strict: shape.strict,
            },
            SchemaKind::Union(variants) => Node::Union(variants.iter().map(Node::compile).collect()),
            SchemaKind::Nullable(inner) => Node::Nullable(Box::new(Node::compile(inner))),
            SchemaKind::Transform { wire, codec } => Node::Transform {
                wire: Box::new(Node::compile(wire)),
                codec: codec.clone(),
            },
        }
    }
}

/// A schema compiled into a ready-to-run validator.
///
/// Compiled validators are immutable and shared between every request that uses a structurally identical schema.
pub struct CompiledValidator {
    fingerprint: String,
    pub(crate) root: Node,
}

impl CompiledValidator {
    pub fn compile(schema: &Schema) -> Self {
        Self {
            fingerprint: schema.fingerprint().to_string(),
            root: Node::compile(schema),
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Validate a wire value and convert it into its internal form.
    pub fn decode(&self, value: &Value) -> ParseResult {
        parser::decode(self, value)
    }

    /// Convert an internal value into its wire form and validate it.
    pub fn encode(&self, value: &Value) -> ParseResult {
        parser::encode(self, value)
    }
}

impl fmt::Debug for CompiledValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledValidator")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Memoises [`CompiledValidator`]s by schema fingerprint.
///
/// The cache is unbounded and lives as long as the compiler. Two requests compiling the same new schema at the same time both compile it and the last insert wins.
pub struct Compiler {
    cache: Cache<String, Arc<CompiledValidator>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            cache: Cache::builder().build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new, empty cache behind an [`Arc`]. Nothing is shared with other compilers.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, schema: &Schema) -> Arc<CompiledValidator> {
        let key = schema.fingerprint();
        if let Some(compiled) = self.cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return compiled;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::trace!("compiling schema {key}");

        let compiled = Arc::new(CompiledValidator::compile(schema));
        self.cache.insert(key.to_string(), compiled.clone());
        compiled
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// The number of distinct schemas compiled so far.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
