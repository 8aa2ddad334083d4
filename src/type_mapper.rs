use crate::parser::SCHEMA_REF_PREFIX;
use crate::schema_resolver::{SchemaEntry, SchemaResolver, COMMON_ZONE};
use crate::string_tools::python_repr;
use crate::type_expr::TypeExpr;
use log::{debug, warn};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Share of field names two same-titled schemas must have in common to be considered the same.
pub const TITLE_MATCH_THRESHOLD: f64 = 0.8;

/// Minimum shared field names for matching an inline object against every known record.
pub const MIN_SHARED_FIELDS: usize = 3;

/// Names endpoint modules import after `from ..models import *`, hiding common models of the
/// same name.
const ENDPOINT_RESERVED: &[&str] = &[
    "Any", "Dict", "List", "Literal", "Optional", "Union", "Param", "ParamKind", "Transport",
];

/// Keys that carry no type information.
const ANNOTATION_KEYS: &[&str] = &[
    "title",
    "description",
    "default",
    "example",
    "examples",
    "deprecated",
    "readOnly",
    "writeOnly",
    "nullable",
];

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub name: String,
    /// Dereferenced shape.
    pub schema: Value,
    /// Shape as written in the document, with `$ref`s intact.
    pub raw: Option<Value>,
}

impl CatalogEntry {
    pub fn original(&self) -> &Value {
        self.raw.as_ref().unwrap_or(&self.schema)
    }
}

/// Definitions of every registered schema, in registration order.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, schema: Value, raw: Option<Value>) {
        let entry = CatalogEntry {
            name: name.to_owned(),
            schema,
            raw,
        };

        match self.index.get(name) {
            Some(&position) => self.entries[position] = entry,
            None => {
                self.index.insert(name.to_owned(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }
}

/// The enum values of a schema as a comparable set.
pub fn enum_values(schema: &Value) -> Option<BTreeSet<String>> {
    schema
        .get("enum")
        .and_then(|e| e.as_array())
        .map(|values| values.iter().map(|v| v.to_string()).collect())
}

/// `additionalProperties` when it carries a value schema; `false` counts as absent.
pub fn additional_properties(schema: &Value) -> Option<&Value> {
    schema
        .get("additionalProperties")
        .filter(|v| !matches!(v, Value::Bool(false) | Value::Null))
}

pub fn has_properties(schema: &Value) -> bool {
    schema.get("properties").is_some_and(|p| p.is_object())
}

/// Objects made of nothing but `additionalProperties` never become classes.
pub fn is_additional_only(schema: &Value) -> bool {
    additional_properties(schema).is_some() && !has_properties(schema)
}

/// Schemas that are declared as record classes.
pub fn is_record(schema: &Value) -> bool {
    schema.get("enum").is_none()
        && !is_additional_only(schema)
        && (schema_type(schema) == Some("object") || schema.get("allOf").is_some())
}

pub fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null"),
        _ if has_properties(schema) || additional_properties(schema).is_some() => Some("object"),
        _ => None,
    }
}

pub fn is_null_schema(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == "null",
        Some(Value::Array(types)) => types.iter().all(|t| t.as_str() == Some("null")),
        _ => schema
            .get("enum")
            .and_then(|e| e.as_array())
            .is_some_and(|e| e.len() == 1 && e[0].is_null()),
    }
}

fn is_nullable(schema: &Value) -> bool {
    schema.get("nullable").and_then(|n| n.as_bool()) == Some(true)
        || schema
            .get("type")
            .and_then(|t| t.as_array())
            .is_some_and(|types| types.iter().any(|t| t.as_str() == Some("null")))
}

fn is_empty_schema(schema: &Value) -> bool {
    match schema {
        Value::Object(map) => map.keys().all(|k| ANNOTATION_KEYS.contains(&k.as_str())),
        Value::Bool(_) | Value::Null => true,
        _ => false,
    }
}

fn property_names(schema: &Value) -> BTreeSet<&str> {
    schema
        .get("properties")
        .and_then(|p| p.as_object())
        .map(|p| p.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// `|A ∩ B| / max(|A|, |B|)`, zero when both are empty.
pub fn overlap_ratio(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let largest = a.len().max(b.len());
    if largest == 0 {
        return 0.0;
    }

    a.intersection(b).count() as f64 / largest as f64
}

/// Named types a model depends on, in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct Dependencies {
    entries: Vec<SchemaEntry>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, entry: &SchemaEntry) {
        let seen = self
            .entries
            .iter()
            .any(|e| e.zone == entry.zone && e.slug == entry.slug);
        if !seen {
            self.entries.push(entry.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.iter()
    }
}

enum Mode<'d> {
    /// Always qualified, resolved relative to the empty zone.
    Endpoint,
    /// Bare forward references relative to the model's zone, every hit is recorded.
    ModelField {
        zone: &'d str,
        deps: &'d mut Dependencies,
    },
}

impl Mode<'_> {
    fn zone(&self) -> &str {
        match self {
            Mode::Endpoint => "",
            Mode::ModelField { zone, .. } => *zone,
        }
    }
}

/// Maps JSON-Schema fragments to python type expressions.
pub struct TypeMapper<'a> {
    resolver: &'a SchemaResolver,
    catalog: &'a SchemaCatalog,
}

impl<'a> TypeMapper<'a> {
    pub fn new(resolver: &'a SchemaResolver, catalog: &'a SchemaCatalog) -> Self {
        Self { resolver, catalog }
    }

    /// Types for endpoint signatures, which live outside the model package and always
    /// reference models through their zone.
    pub fn map_endpoint(&self, schema: &Value) -> TypeExpr {
        self.map(schema, &mut Mode::Endpoint)
    }

    /// Types for model fields: forward references relative to `zone`, recorded into `deps`.
    pub fn map_field(&self, schema: &Value, zone: &str, deps: &mut Dependencies) -> TypeExpr {
        let mut mode = Mode::ModelField { zone, deps };
        self.map(schema, &mut mode)
    }

    /// The endpoint-side name of a registered schema.
    pub fn endpoint_name(&self, entry: &SchemaEntry) -> TypeExpr {
        if entry.zone == COMMON_ZONE && ENDPOINT_RESERVED.contains(&entry.clean_name.as_str()) {
            return TypeExpr::Name(format!("{}.{}", COMMON_ZONE, entry.clean_name));
        }

        TypeExpr::Name(self.resolver.resolve(&entry.original_name, ""))
    }

    fn named(&self, entry: &SchemaEntry, mode: &mut Mode<'_>) -> TypeExpr {
        match mode {
            Mode::Endpoint => self.endpoint_name(entry),
            Mode::ModelField { zone, deps } => {
                deps.track(entry);
                TypeExpr::Forward(
                    self.resolver
                        .resolve_with(&entry.original_name, *zone, false),
                )
            }
        }
    }

    fn map(&self, schema: &Value, mode: &mut Mode<'_>) -> TypeExpr {
        if is_empty_schema(schema) {
            return TypeExpr::any();
        }

        let mapped = self.map_shape(schema, mode);

        if is_nullable(schema) {
            mapped.optional()
        } else {
            mapped
        }
    }

    fn map_shape(&self, schema: &Value, mode: &mut Mode<'_>) -> TypeExpr {
        if let Some(reference) = schema.get("$ref").and_then(|r| r.as_str()) {
            return self.map_ref(reference, mode);
        }

        if let Some(values) = schema.get("enum").and_then(|e| e.as_array()) {
            return self.map_enum(schema, values, mode);
        }

        let kind = schema_type(schema);

        if kind == Some("array") {
            return match schema.get("items") {
                Some(items) => TypeExpr::list(self.map(items, mode)),
                None => TypeExpr::list(TypeExpr::any()),
            };
        }

        for key in ["anyOf", "oneOf"] {
            if let Some(variants) = schema.get(key).and_then(|v| v.as_array()) {
                return self.map_variants(variants, mode);
            }
        }

        if let Some(parts) = schema.get("allOf").and_then(|v| v.as_array()) {
            return match parts.as_slice() {
                [single] => self.map(single, mode),
                _ => TypeExpr::name("dict"),
            };
        }

        if kind == Some("object") {
            if let Some(additional) = additional_properties(schema) {
                return TypeExpr::dict(self.map(additional, mode));
            }

            if let Some(title) = schema.get("title").and_then(|t| t.as_str()) {
                return self.match_title(title, schema, mode);
            }
        }

        scalar(schema, kind)
    }

    fn map_ref(&self, reference: &str, mode: &mut Mode<'_>) -> TypeExpr {
        let name = match reference.strip_prefix(SCHEMA_REF_PREFIX) {
            Some(n) => n,
            None => {
                warn!("Unsupported reference {}, using Any", reference);
                return TypeExpr::any();
            }
        };

        if let Some(target) = self.catalog.get(name) {
            if is_additional_only(&target.schema) {
                let value = additional_properties(target.original())
                    .or_else(|| additional_properties(&target.schema));
                return TypeExpr::dict(value.map_or_else(TypeExpr::any, |v| self.map(v, mode)));
            }
        }

        match self.resolver.lookup(name) {
            Some(entry) => self.named(entry, mode),
            None => {
                warn!("Reference to unknown schema {}, using Any", name);
                TypeExpr::any()
            }
        }
    }

    fn map_enum(&self, schema: &Value, values: &[Value], mode: &mut Mode<'_>) -> TypeExpr {
        let wanted = enum_values(schema);

        let existing = self
            .catalog
            .iter()
            .find(|c| enum_values(&c.schema).is_some() && enum_values(&c.schema) == wanted)
            .and_then(|c| self.resolver.lookup(&c.name));

        if let Some(entry) = existing {
            return self.named(entry, mode);
        }

        let literals = values
            .iter()
            .filter(|v| !v.is_null())
            .map(python_repr)
            .collect::<Vec<_>>();

        if literals.is_empty() {
            return TypeExpr::any();
        }

        let literal = TypeExpr::literal(literals);
        if values.iter().any(|v| v.is_null()) {
            literal.optional()
        } else {
            literal
        }
    }

    fn map_variants(&self, variants: &[Value], mode: &mut Mode<'_>) -> TypeExpr {
        let mut has_null = false;
        let mut mapped = vec![];

        for variant in variants {
            if is_null_schema(variant) {
                has_null = true;
                continue;
            }
            mapped.push(self.map(variant, mode));
        }

        if mapped.is_empty() {
            return TypeExpr::any();
        }

        let result = TypeExpr::union(mapped);
        if has_null {
            result.optional()
        } else {
            result
        }
    }

    /// Resolves an inline titled object to the registered schema it was expanded from.
    fn match_title(&self, title: &str, schema: &Value, mode: &mut Mode<'_>) -> TypeExpr {
        if let Some(entry) = self.find_by_title(title, schema) {
            return self.named(entry, mode);
        }

        if let Some(entry) = self.resolver.lookup_or_generic(title, mode.zone()) {
            return self.named(entry, mode);
        }

        // Nothing is declared under this name, so it stays a string annotation and no
        // import is recorded for it.
        let name = self.resolver.resolve_with(title, mode.zone(), false);
        warn!(
            "No registered schema matches inline object {:?}, annotating it as {:?}",
            title, name
        );
        TypeExpr::Forward(name)
    }

    /// Scores registered records against an inline object.
    ///
    /// Same-titled candidates win outright on an identical key set, otherwise on the highest
    /// overlap ratio above [`TITLE_MATCH_THRESHOLD`]. With no same-titled candidate every
    /// record is scored by shared field count, needing at least [`MIN_SHARED_FIELDS`].
    pub fn find_by_title(&self, title: &str, schema: &Value) -> Option<&'a SchemaEntry> {
        let keys = property_names(schema);

        let candidates = self
            .catalog
            .iter()
            .filter(|c| is_record(&c.schema))
            .filter(|c| c.schema.get("title").and_then(|t| t.as_str()) == Some(title))
            .collect::<Vec<_>>();

        if let Some(exact) = candidates
            .iter()
            .find(|c| property_names(&c.schema) == keys)
        {
            debug!("Inline object {:?} matched {} exactly", title, exact.name);
            return self.resolver.lookup(&exact.name);
        }

        let mut best: Option<(&CatalogEntry, f64)> = None;
        for candidate in candidates.iter().copied() {
            let score = overlap_ratio(&keys, &property_names(&candidate.schema));
            if score > TITLE_MATCH_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }

        if let Some((candidate, score)) = best {
            debug!(
                "Inline object {:?} matched {} with score {:.2}",
                title, candidate.name, score
            );
            return self.resolver.lookup(&candidate.name);
        }

        if !candidates.is_empty() || keys.is_empty() {
            return None;
        }

        let mut best: Option<(&CatalogEntry, usize)> = None;
        for candidate in self.catalog.iter().filter(|c| is_record(&c.schema)) {
            let shared = keys
                .intersection(&property_names(&candidate.schema))
                .count();
            if shared >= MIN_SHARED_FIELDS && best.map_or(true, |(_, s)| shared > s) {
                best = Some((candidate, shared));
            }
        }

        best.and_then(|(candidate, shared)| {
            debug!(
                "Inline object {:?} matched {} on {} shared fields",
                title, candidate.name, shared
            );
            self.resolver.lookup(&candidate.name)
        })
    }
}

fn scalar(schema: &Value, kind: Option<&str>) -> TypeExpr {
    match schema.get("format").and_then(|f| f.as_str()) {
        Some("date-time") | Some("datetime") => return TypeExpr::name("datetime"),
        Some("date") => return TypeExpr::name("date"),
        Some("binary") | Some("byte") => return TypeExpr::name("bytes"),
        _ => {}
    }

    let name = match kind {
        Some("string") => "str",
        Some("integer") => "int",
        Some("boolean") => "bool",
        Some("number") => "float",
        Some("object") => "dict",
        Some("null") => "None",
        _ => "str",
    };

    TypeExpr::name(name)
}
