use crate::module_codegen::import_tracker::ImportTracker;
use crate::module_codegen::{docstring, GENERATED_HEADER};
use crate::parser::endpoint::OperationDescriptor;
use crate::parser::{component_schemas, schema_ref_name};
use crate::project::{ClassDecl, Declaration, SourceFile};
use crate::schema_resolver::{SchemaEntry, SchemaResolver, COMMON_ZONE};
use crate::string_tools::{python_identifier, python_repr, python_string};
use crate::type_mapper::{
    enum_values, has_properties, is_additional_only, is_record, CatalogEntry, Dependencies,
    SchemaCatalog, TypeMapper,
};
use crate::zone_classifier::ZoneClassifier;
use itertools::Itertools;
use log::{debug, info};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write;

/// Every schema name known to the generator, with its definition.
///
/// Built in a single pass before anything is emitted, read-only afterwards.
pub struct SchemaRegistry {
    pub resolver: SchemaResolver,
    pub catalog: SchemaCatalog,
    aliases: HashSet<String>,
}

impl SchemaRegistry {
    pub fn build(spec: &Value, raw: &Value, operations: &[OperationDescriptor]) -> Self {
        let mut registry = Self {
            resolver: SchemaResolver::new(),
            catalog: SchemaCatalog::new(),
            aliases: HashSet::new(),
        };

        let classifier = ZoneClassifier::new(operations);
        let raw_schemas = component_schemas(raw);

        if let Some(schemas) = component_schemas(spec) {
            for (name, schema) in schemas {
                let raw_schema = raw_schemas.and_then(|s| s.get(name)).cloned();
                registry.register_component(name, schema, raw_schema, &classifier);
            }
        }

        for operation in operations {
            registry.register_inline_responses(operation);
        }

        info!(
            "Registered {} schemas, {} of them enum duplicates",
            registry.resolver.len(),
            registry.aliases.len()
        );

        registry
    }

    pub fn mapper(&self) -> TypeMapper<'_> {
        TypeMapper::new(&self.resolver, &self.catalog)
    }

    /// Whether `original_name` was folded into an earlier declaration.
    pub fn is_alias(&self, original_name: &str) -> bool {
        self.aliases.contains(original_name)
    }

    fn register_component(
        &mut self,
        name: &str,
        schema: &Value,
        raw: Option<Value>,
        classifier: &ZoneClassifier,
    ) {
        if let Some(values) = enum_values(schema) {
            let existing = self
                .catalog
                .iter()
                .filter(|c| !self.aliases.contains(&c.name))
                .find(|c| enum_values(&c.schema).as_ref() == Some(&values))
                .and_then(|c| self.resolver.lookup(&c.name))
                .cloned();

            if let Some(target) = existing {
                debug!(
                    "Enum {} has the same values as {}, reusing {}",
                    name, target.original_name, target.clean_name
                );
                self.resolver.register_alias(name, &target);
                self.aliases.insert(name.to_owned());
                self.catalog.insert(name, schema.clone(), raw);
                return;
            }
        }

        let zone = classifier.zone_for_schema(name);
        self.resolver
            .register(name, &SchemaResolver::clean(name), &zone);
        self.catalog.insert(name, schema.clone(), raw);
    }

    /// Titled response objects declared inline become models of the operation's zone.
    fn register_inline_responses(&mut self, operation: &OperationDescriptor) {
        let zone = ZoneClassifier::zone_for_operation(operation);

        for media in operation.success_responses().flat_map(|r| r.content.iter()) {
            if media.original().get("$ref").is_some() || !has_properties(&media.schema) {
                continue;
            }

            let title = match media.schema.get("title").and_then(|t| t.as_str()) {
                Some(t) => t,
                None => continue,
            };

            if self.resolver.lookup_or_generic(title, &zone).is_some()
                || self.mapper().find_by_title(title, &media.schema).is_some()
            {
                continue;
            }

            let entry = self
                .resolver
                .register(title, &SchemaResolver::clean(title), &zone);
            debug!(
                "Inline response {:?} of {} {} registered as {}.{}",
                title, operation.endpoint_type, operation.path, entry.zone, entry.clean_name
            );
            self.catalog
                .insert(title, media.schema.clone(), media.raw.clone());
        }
    }
}

/// The `models/` package of the generated client.
pub struct ModelFiles {
    pub files: Vec<SourceFile>,
    /// Zones that received at least one model, in first-seen order.
    pub zones: Vec<String>,
    /// Models with forward references, rebuilt once every package is imported.
    pub deferred: Vec<SchemaEntry>,
}

pub fn create_model_files(registry: &SchemaRegistry) -> Result<ModelFiles, std::fmt::Error> {
    let mapper = registry.mapper();

    let mut files = vec![];
    let mut deferred = vec![];
    let mut members: Vec<(String, Vec<SchemaEntry>)> = vec![];

    for entry in registry.resolver.entries() {
        if registry.is_alias(&entry.original_name) {
            continue;
        }

        let definition = match registry.catalog.get(&entry.original_name) {
            Some(d) => d,
            None => continue,
        };

        let file = if definition.schema.get("enum").is_some() {
            enum_file(entry, &definition.schema)?
        } else if is_additional_only(&definition.schema) {
            debug!(
                "Skipping {}, it only declares additionalProperties",
                entry.original_name
            );
            continue;
        } else if is_record(&definition.schema) {
            let (file, needs_rebuild) = record_file(entry, definition, registry, &mapper)?;
            if needs_rebuild {
                deferred.push(entry.clone());
            }
            file
        } else {
            alias_file(entry, definition, &mapper)?
        };

        files.push(file);

        match members.iter_mut().find(|(zone, _)| *zone == entry.zone) {
            Some((_, entries)) => entries.push(entry.clone()),
            None => members.push((entry.zone.clone(), vec![entry.clone()])),
        }
    }

    for (zone, entries) in &members {
        files.push(zone_package(zone, entries)?);
    }

    let zones = members.into_iter().map(|(zone, _)| zone).collect::<Vec<_>>();
    files.push(models_package(&zones, &deferred)?);

    info!(
        "Emitted {} models in {} zones, {} need a rebuild",
        files.len() - zones.len() - 1,
        zones.len(),
        deferred.len()
    );

    Ok(ModelFiles {
        files,
        zones,
        deferred,
    })
}

fn model_path(entry: &SchemaEntry) -> String {
    format!("models/{}/{}.py", entry.zone, entry.slug)
}

/// Import of `target` as seen from the module of `from`.
fn import_line(from: &SchemaEntry, target: &SchemaEntry) -> String {
    if from.zone == target.zone {
        format!("from .{} import {}", target.slug, target.clean_name)
    } else {
        format!(
            "from ..{}.{} import {}",
            target.zone, target.slug, target.clean_name
        )
    }
}

fn enum_file(entry: &SchemaEntry, schema: &Value) -> Result<SourceFile, std::fmt::Error> {
    let values = schema
        .get("enum")
        .and_then(|e| e.as_array())
        .map(|values| values.iter().filter(|v| !v.is_null()).collect::<Vec<_>>())
        .unwrap_or_default();

    let bases = if !values.is_empty() && values.iter().all(|v| v.is_string()) {
        vec!["str", "Enum"]
    } else if !values.is_empty() && values.iter().all(|v| v.is_i64() || v.is_u64()) {
        vec!["int", "Enum"]
    } else {
        vec!["Enum"]
    };

    let mut used = HashSet::new();
    let mut body = String::new();
    for value in values {
        writeln!(body, "{} = {}", member_name(value, &mut used), python_repr(value))?;
    }

    let mut file = SourceFile::new(model_path(entry));
    file.push(Declaration::Raw(format!(
        "{}\nfrom enum import Enum",
        GENERATED_HEADER
    )));
    file.push(Declaration::Class(ClassDecl {
        name: entry.clean_name.clone(),
        bases: bases.into_iter().map(|b| b.to_owned()).collect(),
        docstring: docstring(schema),
        body: non_empty(body),
    }));

    Ok(file)
}

/// `in-progress` -> `IN_PROGRESS`, `1st` -> `VALUE_1ST`, made unique within the enum.
fn member_name(value: &Value, used: &mut HashSet<String>) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let mut name = python_identifier(&text.to_uppercase()).to_uppercase();
    if name.starts_with('_') {
        name = format!("VALUE{}", name);
    }

    unique(name, used, "_")
}

fn unique(name: String, used: &mut HashSet<String>, separator: &str) -> String {
    let mut candidate = name.clone();
    let mut counter = 2;
    while used.contains(&candidate) {
        candidate = format!("{}{}{}", name, separator, counter);
        counter += 1;
    }

    used.insert(candidate.clone());
    candidate
}

fn non_empty(body: String) -> Vec<Declaration> {
    if body.trim().is_empty() {
        vec![]
    } else {
        vec![Declaration::Raw(body)]
    }
}

/// A pydantic model. The flag is set when its forward references need `model_rebuild()`.
fn record_file(
    entry: &SchemaEntry,
    definition: &CatalogEntry,
    registry: &SchemaRegistry,
    mapper: &TypeMapper,
) -> Result<(SourceFile, bool), std::fmt::Error> {
    let mut fields = Fields::default();
    let mut visiting = vec![entry.original_name.clone()];
    fields.collect(
        registry,
        definition.original(),
        &definition.schema,
        &mut visiting,
    );

    let mut deps = Dependencies::new();
    let mut imports = ImportTracker::new();
    let mut used = HashSet::new();
    let mut needs_alias = false;
    let mut lines = String::new();

    for (wire_name, schema) in &fields.properties {
        let mut annotation = mapper.map_field(schema, &entry.zone, &mut deps);
        let required = fields.required.contains(wire_name);
        if !required {
            annotation = annotation.optional();
        }
        imports.track_type(&annotation);

        let name = field_name(wire_name, &mut used);
        let default = match (name == *wire_name, required) {
            (true, true) => String::new(),
            (true, false) => " = None".to_owned(),
            (false, true) => format!(" = Field(alias={})", python_string(wire_name)),
            (false, false) => format!(
                " = Field(default=None, alias={})",
                python_string(wire_name)
            ),
        };
        needs_alias |= name != *wire_name;

        writeln!(lines, "{}: {}{}", name, annotation, default)?;
    }

    let mut header = String::new();
    writeln!(header, "{}", GENERATED_HEADER)?;
    imports.write_imports(&mut header)?;
    if header.lines().count() > 1 {
        header.push('\n');
    }
    if needs_alias {
        writeln!(header, "from pydantic import BaseModel, ConfigDict, Field")?;
    } else {
        writeln!(header, "from pydantic import BaseModel")?;
    }

    let body = if needs_alias {
        format!(
            "model_config = ConfigDict(populate_by_name=True)\n\n{}",
            lines
        )
    } else {
        lines
    };

    let mut file = SourceFile::new(model_path(entry));
    file.push(Declaration::Raw(header));
    file.push(Declaration::Class(ClassDecl {
        name: entry.clean_name.clone(),
        bases: vec!["BaseModel".to_owned()],
        docstring: docstring(&definition.schema),
        body: non_empty(body),
    }));

    let pending = deps
        .iter()
        .filter(|d| !(d.zone == entry.zone && d.slug == entry.slug))
        .map(|d| format!("{}  # noqa: E402", import_line(entry, d)))
        .collect::<Vec<_>>();

    if !pending.is_empty() {
        file.push(Declaration::Raw(format!(
            "# Deferred imports, resolved by model_rebuild() in models/__init__.py\n{}",
            pending.join("\n")
        )));
    }

    Ok((file, !deps.is_empty()))
}

/// Property names that are not identifiers keep their wire name through a pydantic alias.
fn field_name(wire_name: &str, used: &mut HashSet<String>) -> String {
    let mut name = python_identifier(wire_name);
    // pydantic treats leading underscores as private attributes
    if name.starts_with('_') {
        name = format!("field{}", name);
    }

    unique(name, used, "_")
}

/// Properties of a record, including the ones inherited through `allOf`.
#[derive(Default)]
struct Fields {
    properties: Vec<(String, Value)>,
    required: BTreeSet<String>,
}

impl Fields {
    /// `raw` is the schema as written, `expanded` its dereferenced twin. Field types come
    /// from the former so references stay visible to the mapper.
    fn collect(
        &mut self,
        registry: &SchemaRegistry,
        raw: &Value,
        expanded: &Value,
        visiting: &mut Vec<String>,
    ) {
        if let Some(name) = schema_ref_name(raw) {
            if visiting.iter().any(|v| v == name) {
                return;
            }

            if let Some(target) = registry.catalog.get(name) {
                visiting.push(name.to_owned());
                self.collect(registry, target.original(), &target.schema, visiting);
                visiting.pop();
                return;
            }
        }

        if let Some(parts) = raw.get("allOf").and_then(|p| p.as_array()) {
            let expanded_parts = expanded.get("allOf").and_then(|p| p.as_array());
            for (index, part) in parts.iter().enumerate() {
                let expanded_part = expanded_parts
                    .and_then(|p| p.get(index))
                    .unwrap_or(part);
                self.collect(registry, part, expanded_part, visiting);
            }
        }

        let properties = expanded
            .get("properties")
            .or_else(|| raw.get("properties"))
            .and_then(|p| p.as_object());

        if let Some(properties) = properties {
            for (name, expanded_property) in properties {
                let property = raw
                    .get("properties")
                    .and_then(|p| p.get(name))
                    .unwrap_or(expanded_property)
                    .clone();

                match self.properties.iter_mut().find(|(n, _)| n == name) {
                    Some(existing) => existing.1 = property,
                    None => self.properties.push((name.clone(), property)),
                }
            }
        }

        let required = expanded
            .get("required")
            .or_else(|| raw.get("required"))
            .and_then(|r| r.as_array());

        for name in required.into_iter().flatten().filter_map(|r| r.as_str()) {
            self.required.insert(name.to_owned());
        }
    }
}

/// Component schemas that are neither records nor enums, e.g. `Tags = List[str]`.
fn alias_file(
    entry: &SchemaEntry,
    definition: &CatalogEntry,
    mapper: &TypeMapper,
) -> Result<SourceFile, std::fmt::Error> {
    let mut deps = Dependencies::new();
    let annotation = mapper
        .map_field(definition.original(), &entry.zone, &mut deps)
        .into_eager();

    let mut imports = ImportTracker::new();
    imports.track_type(&annotation);

    let mut header = String::new();
    writeln!(header, "{}", GENERATED_HEADER)?;
    imports.write_imports(&mut header)?;

    for dep in deps
        .iter()
        .filter(|d| !(d.zone == entry.zone && d.slug == entry.slug))
    {
        writeln!(header, "{}", import_line(entry, dep))?;
    }

    let mut file = SourceFile::new(model_path(entry));
    file.push(Declaration::Raw(header));
    file.push(Declaration::Raw(format!(
        "\n{} = {}",
        entry.clean_name, annotation
    )));

    Ok(file)
}

fn zone_package(zone: &str, entries: &[SchemaEntry]) -> Result<SourceFile, std::fmt::Error> {
    let mut code = String::new();
    writeln!(code, "{}", GENERATED_HEADER)?;
    for entry in entries {
        writeln!(code, "from .{} import {}", entry.slug, entry.clean_name)?;
    }

    writeln!(code, "\n__all__ = [")?;
    for entry in entries {
        writeln!(code, "    \"{}\",", entry.clean_name)?;
    }
    writeln!(code, "]")?;

    let mut file = SourceFile::new(format!("models/{}/__init__.py", zone));
    file.push(Declaration::Raw(code));

    Ok(file)
}

fn models_package(zones: &[String], deferred: &[SchemaEntry]) -> Result<SourceFile, std::fmt::Error> {
    let mut code = String::new();
    writeln!(code, "{}", GENERATED_HEADER)?;

    if !zones.is_empty() {
        writeln!(code, "from . import {}", zones.iter().join(", "))?;
    }

    if zones.iter().any(|z| z == COMMON_ZONE) {
        writeln!(code, "from .{} import *", COMMON_ZONE)?;
    }

    if !deferred.is_empty() {
        code.push('\n');
        for entry in deferred {
            writeln!(code, "{}.{}.model_rebuild()", entry.zone, entry.clean_name)?;
        }
    }

    let mut file = SourceFile::new("models/__init__.py");
    file.push(Declaration::Raw(code));

    Ok(file)
}
