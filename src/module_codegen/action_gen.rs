use crate::module_codegen::types_gen::SchemaRegistry;
use crate::module_codegen::{ImportTracker, GENERATED_HEADER};
use crate::parser::endpoint::{MediaSchema, OperationDescriptor, ParamDescriptor, ParamLocation};
use crate::parser::zone::{Zone, Zones};
use crate::project::{ClassDecl, Declaration, FunctionDecl, ParamDecl, SourceFile};
use crate::schema_resolver::{SchemaEntry, SchemaResolver};
use crate::string_tools::{capitalize, pascal_case, python_identifier, snake_case};
use crate::type_expr::TypeExpr;
use crate::type_mapper::{additional_properties, has_properties, is_null_schema, schema_type, TypeMapper};
use crate::zone_classifier::ZoneClassifier;
use log::{debug, info, warn};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());

const NOT_SET: &str = "NOT_SET";

/// Request body content types, most preferred first.
const BODY_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "multipart/form-data",
    "application/x-www-form-urlencoded",
];

/// Mirrors `ParamKind` in the generated `utils.py`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ParamKind {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    Form,
    File,
}

impl ParamKind {
    fn python(&self) -> &'static str {
        match self {
            ParamKind::Path => "ParamKind.PATH",
            ParamKind::Query => "ParamKind.QUERY",
            ParamKind::Header => "ParamKind.HEADER",
            ParamKind::Cookie => "ParamKind.COOKIE",
            ParamKind::Body => "ParamKind.BODY",
            ParamKind::Form => "ParamKind.FORM",
            ParamKind::File => "ParamKind.FILE",
        }
    }

    fn from_location(location: ParamLocation) -> Self {
        match location {
            ParamLocation::Path => ParamKind::Path,
            ParamLocation::Query => ParamKind::Query,
            ParamLocation::Header => ParamKind::Header,
            ParamLocation::Cookie => ParamKind::Cookie,
        }
    }

    fn from_content_type(content_type: &str) -> Self {
        match content_type {
            "multipart/form-data" => ParamKind::File,
            "application/x-www-form-urlencoded" => ParamKind::Form,
            _ => ParamKind::Body,
        }
    }
}

/// One argument of a generated endpoint method.
#[derive(Debug, Clone)]
struct CallParam {
    /// Name on the wire; `None` when the value is the whole request body.
    wire_name: Option<String>,
    kind: ParamKind,
    local: String,
    annotation: TypeExpr,
    has_default: bool,
}

impl CallParam {
    fn declaration(&self) -> ParamDecl {
        let decl = ParamDecl::annotated(self.local.clone(), self.annotation.to_string());
        if self.has_default {
            decl.with_default(NOT_SET)
        } else {
            decl
        }
    }

    fn forward(&self) -> String {
        let wire_name = match &self.wire_name {
            Some(name) => python_double_quoted(name),
            None => "None".to_owned(),
        };

        format!("Param({}, {}, {}),", wire_name, self.kind.python(), self.local)
    }
}

/// The `endpoints/` package of the generated client.
pub struct EndpointFiles {
    pub files: Vec<SourceFile>,
    /// Zones with at least one endpoint, in first-seen order.
    pub zones: Vec<String>,
    /// Zones dropped because no operation ended up in them.
    pub pruned: Vec<String>,
}

/// Turns operations into async methods grouped in one class per zone.
pub struct EndpointEmitter<'a> {
    registry: &'a SchemaRegistry,
    mapper: TypeMapper<'a>,
    zones: Zones,
    imports: HashMap<String, ImportTracker>,
}

impl<'a> EndpointEmitter<'a> {
    pub fn new(registry: &'a SchemaRegistry, zones: Zones) -> Self {
        Self {
            registry,
            mapper: registry.mapper(),
            zones,
            imports: HashMap::new(),
        }
    }

    pub fn add_operation(&mut self, operation: &OperationDescriptor) {
        let zone_name = ZoneClassifier::zone_for_operation(operation);

        let mut params = self.parameters(operation);
        params.extend(self.body_parameters(operation, &params));
        // required first, declaration order kept inside both groups
        params.sort_by_key(|p| p.has_default);

        let returns = self.response_type(operation, &zone_name);

        let imports = self.imports.entry(zone_name.clone()).or_default();
        for param in &params {
            imports.track_type(&param.annotation);
        }
        imports.track_type(&returns.0);

        let zone = self.zones.entry(&zone_name);
        let name = zone.unique_method_name(&method_name(operation));
        debug!(
            "{} {} emitted as {}.{}",
            operation.endpoint_type, operation.path, zone_name, name
        );

        let method = method(name, operation, &params, returns);
        zone.add_method(method);
    }

    pub fn finish(mut self) -> Result<EndpointFiles, std::fmt::Error> {
        let pruned = self
            .zones
            .prune()
            .into_iter()
            .map(|zone| {
                if !zone.model_names.is_empty() {
                    debug!(
                        "Zone {} has no endpoints, its models stay in models/{}: {}",
                        zone.name,
                        zone.name,
                        zone.model_names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
                    );
                }
                zone.name
            })
            .collect::<Vec<_>>();

        let mut files = vec![];
        for zone in self.zones.iter() {
            let imports = self.imports.remove(&zone.name).unwrap_or_default();
            files.push(zone_file(zone, &imports)?);
        }

        let zones = self
            .zones
            .iter()
            .map(|z| z.name.clone())
            .collect::<Vec<_>>();
        files.push(endpoints_package(&zones)?);

        info!(
            "Emitted {} endpoint methods in {} zones",
            self.zones.iter().map(|z| z.endpoint_methods.len()).sum::<usize>(),
            zones.len()
        );

        Ok(EndpointFiles {
            files,
            zones,
            pruned,
        })
    }

    /// Path, query, header and cookie parameters, path ones first.
    fn parameters(&self, operation: &OperationDescriptor) -> Vec<CallParam> {
        let descriptors = with_path_placeholders(operation);

        let mut used = ["self", "path"]
            .into_iter()
            .map(|s| s.to_owned())
            .collect::<HashSet<_>>();

        let (path, other): (Vec<_>, Vec<_>) = descriptors
            .iter()
            .partition(|p| p.location == ParamLocation::Path);

        path.into_iter()
            .chain(other)
            .map(|descriptor| {
                let base = snake_case(&descriptor.name);
                let local = match descriptor.location {
                    ParamLocation::Path => format!("{}_path", base),
                    ParamLocation::Query => format!("{}_query", base),
                    ParamLocation::Header | ParamLocation::Cookie => base,
                };

                let annotation = self.mapper.map_endpoint(descriptor.original());
                self.call_param(
                    Some(descriptor.name.clone()),
                    ParamKind::from_location(descriptor.location),
                    unique_local(&local, &mut used),
                    annotation,
                    descriptor.required,
                )
            })
            .collect()
    }

    fn body_parameters(
        &self,
        operation: &OperationDescriptor,
        existing: &[CallParam],
    ) -> Vec<CallParam> {
        let body = match &operation.request_body {
            Some(b) => b,
            None => return vec![],
        };

        let media = match preferred_media(&body.content) {
            Some(m) => m,
            None => return vec![],
        };

        let kind = ParamKind::from_content_type(&media.content_type);
        let original = media.original();

        let mut used = existing
            .iter()
            .map(|p| p.local.clone())
            .chain(["self".to_owned(), "path".to_owned()])
            .collect::<HashSet<_>>();

        if original.get("$ref").is_some() || !has_properties(&media.schema) {
            let mut annotation = self.mapper.map_endpoint(original);
            if !body.required {
                annotation = annotation.optional();
            }

            return vec![CallParam {
                wire_name: None,
                kind,
                local: unique_local("request_body", &mut used),
                annotation,
                has_default: true,
            }];
        }

        let required = media
            .schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect::<HashSet<_>>())
            .unwrap_or_default();

        let suffix = if kind == ParamKind::File { "file" } else { "body" };

        media
            .schema
            .get("properties")
            .and_then(|p| p.as_object())
            .into_iter()
            .flatten()
            .map(|(name, expanded)| {
                let property = original
                    .get("properties")
                    .and_then(|p| p.get(name))
                    .unwrap_or(expanded);

                let local = format!("{}_{}", snake_case(name), suffix);
                self.call_param(
                    Some(name.clone()),
                    kind,
                    unique_local(&local, &mut used),
                    self.mapper.map_endpoint(property),
                    required.contains(name.as_str()),
                )
            })
            .collect()
    }

    fn call_param(
        &self,
        wire_name: Option<String>,
        kind: ParamKind,
        local: String,
        annotation: TypeExpr,
        required: bool,
    ) -> CallParam {
        CallParam {
            wire_name,
            kind,
            local,
            annotation: if required {
                annotation
            } else {
                annotation.optional()
            },
            has_default: !required,
        }
    }

    /// The return annotation, plus whether it is specific enough to coerce the response into.
    fn response_type(&self, operation: &OperationDescriptor, zone: &str) -> (TypeExpr, bool) {
        let mut shapes: Vec<TypeExpr> = vec![];

        for response in operation.success_responses() {
            if let Some(media) = preferred_media(&response.content) {
                let shape = self.infer_response(media.original(), &media.schema, zone);
                if !shapes.contains(&shape) {
                    shapes.push(shape);
                }
            }
        }

        if shapes.is_empty() {
            return (TypeExpr::any(), false);
        }

        let shape = TypeExpr::union(shapes);
        let specific = !shape.is_any();
        (shape, specific)
    }

    fn infer_response(&self, original: &Value, expanded: &Value, zone: &str) -> TypeExpr {
        if original.get("$ref").is_some() {
            return self.mapper.map_endpoint(original);
        }

        if schema_type(original) == Some("array") {
            return match original.get("items") {
                Some(items) => TypeExpr::list(self.infer_response(
                    items,
                    expanded.get("items").unwrap_or(items),
                    zone,
                )),
                None => TypeExpr::list(TypeExpr::any()),
            };
        }

        for key in ["anyOf", "oneOf"] {
            if let Some(variants) = original.get(key).and_then(|v| v.as_array()) {
                let expanded_variants = expanded.get(key).and_then(|v| v.as_array());

                let mut has_null = false;
                let mut mapped = vec![];
                for (index, variant) in variants.iter().enumerate() {
                    if is_null_schema(variant) {
                        has_null = true;
                        continue;
                    }

                    let expanded_variant = expanded_variants
                        .and_then(|v| v.get(index))
                        .unwrap_or(variant);
                    mapped.push(self.infer_response(variant, expanded_variant, zone));
                }

                if mapped.is_empty() {
                    return TypeExpr::any();
                }

                let result = TypeExpr::union(mapped);
                return if has_null { result.optional() } else { result };
            }
        }

        let title = expanded.get("title").and_then(|t| t.as_str());
        if let (Some(title), Some("object"), None) = (
            title,
            schema_type(expanded),
            additional_properties(expanded),
        ) {
            return match self.response_model(title, expanded, zone) {
                Some(entry) => self.mapper.endpoint_name(entry),
                None => {
                    warn!(
                        "No model found for response {:?} in zone {}, using Any",
                        title, zone
                    );
                    TypeExpr::any()
                }
            };
        }

        self.mapper.map_endpoint(original)
    }

    /// Zone-prefixed names win over same-zone ones, so a `Paginated` response of `orders`
    /// resolves to `OrdersPaginated`.
    fn response_model(&self, title: &str, schema: &Value, zone: &str) -> Option<&'a SchemaEntry> {
        let resolver = &self.registry.resolver;
        let clean = SchemaResolver::clean(title);

        resolver
            .find_in_zone(&format!("{}{}", capitalize(zone), clean), zone)
            .or_else(|| resolver.find_in_zone(&clean, zone))
            .or_else(|| self.mapper.find_by_title(title, schema))
            .or_else(|| resolver.lookup(title))
    }
}

/// Operation parameters with malformed path declarations repaired.
///
/// A single placeholder missing from the declared path parameters is taken as a path
/// parameter when the only other declared parameter is a query one.
fn with_path_placeholders(operation: &OperationDescriptor) -> Vec<ParamDescriptor> {
    let mut params = operation.parameters.clone();

    let undeclared = placeholders(&operation.path)
        .into_iter()
        .filter(|name| {
            !params
                .iter()
                .any(|p| p.location == ParamLocation::Path && p.name == *name)
        })
        .collect::<Vec<_>>();

    if let [name] = undeclared.as_slice() {
        let others = params
            .iter()
            .filter(|p| p.location != ParamLocation::Path)
            .collect::<Vec<_>>();

        let single_query = matches!(
            others.as_slice(),
            [other] if other.location == ParamLocation::Query
        );

        if single_query {
            match params
                .iter_mut()
                .find(|p| p.location == ParamLocation::Query && p.name == *name)
            {
                Some(param) => {
                    debug!(
                        "Query parameter {} of {} treated as a path parameter",
                        name, operation.path
                    );
                    param.location = ParamLocation::Path;
                    param.required = true;
                }
                None => {
                    debug!(
                        "Undeclared placeholder {} of {} added as a path parameter",
                        name, operation.path
                    );
                    params.insert(
                        0,
                        ParamDescriptor {
                            name: name.clone(),
                            location: ParamLocation::Path,
                            schema: json!({"type": "string"}),
                            raw: None,
                            required: true,
                        },
                    );
                }
            }

            return params;
        }
    }

    for name in undeclared {
        warn!(
            "Placeholder {{{}}} of {} {} is not a declared path parameter, it is sent as is",
            name, operation.endpoint_type, operation.path
        );
    }

    params
}

fn placeholders(path: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(path)
        .map(|c| c[1].to_owned())
        .collect()
}

fn preferred_media(content: &[MediaSchema]) -> Option<&MediaSchema> {
    BODY_CONTENT_TYPES
        .iter()
        .find_map(|ct| content.iter().find(|m| m.content_type == *ct))
        .or_else(|| content.first())
}

/// `snake_case(operationId)`, or `<method>_<path>` when the operation has no id.
fn method_name(operation: &OperationDescriptor) -> String {
    let base = operation
        .operation_id
        .as_deref()
        .map(snake_case)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            let path = snake_case(&PLACEHOLDER.replace_all(&operation.path, ""));
            if path.is_empty() {
                operation.endpoint_type.key().to_owned()
            } else {
                format!("{}_{}", operation.endpoint_type.key(), path)
            }
        });

    python_identifier(&base)
}

fn unique_local(local: &str, used: &mut HashSet<String>) -> String {
    let base = python_identifier(local);
    let mut candidate = base.clone();
    let mut counter = 2;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", base, counter);
        counter += 1;
    }

    used.insert(candidate.clone());
    candidate
}

fn python_double_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `path = f"/items/{item_id_path}"`, unknown placeholders kept as literal braces.
fn path_expression(operation: &OperationDescriptor, params: &[CallParam]) -> String {
    let escaped = operation.path.replace('\\', "\\\\").replace('"', "\\\"");
    let mut substituted = false;

    let mut expression = String::with_capacity(escaped.len() + 16);
    let mut rest = escaped.as_str();
    while let Some(found) = PLACEHOLDER.captures(rest) {
        let whole = found.get(0).map_or(0..0, |m| m.range());
        expression.push_str(&rest[..whole.start]);

        let name = &found[1];
        let local = params
            .iter()
            .find(|p| p.kind == ParamKind::Path && p.wire_name.as_deref() == Some(name));

        match local {
            Some(param) => {
                substituted = true;
                expression.push('{');
                expression.push_str(&param.local);
                expression.push('}');
            }
            None => {
                expression.push_str("{{");
                expression.push_str(name);
                expression.push_str("}}");
            }
        }

        rest = &rest[whole.end..];
    }
    expression.push_str(rest);

    if substituted {
        format!("path = f\"{}\"", expression)
    } else {
        // braces were only doubled for the f-string
        format!("path = \"{}\"", escaped)
    }
}

fn method(
    name: String,
    operation: &OperationDescriptor,
    params: &[CallParam],
    (returns, coerce): (TypeExpr, bool),
) -> FunctionDecl {
    let method_literal = python_double_quoted(&operation.endpoint_type.to_string());

    let mut body = vec![
        path_expression(operation, params),
        "return await handle_request(".to_owned(),
        "    self.client,".to_owned(),
        format!("    {},", method_literal),
        "    path,".to_owned(),
    ];

    if params.is_empty() {
        body.push("    [],".to_owned());
    } else {
        body.push("    [".to_owned());
        body.extend(params.iter().map(|p| format!("        {}", p.forward())));
        body.push("    ],".to_owned());
    }

    if coerce {
        body.push(format!("    response_model={},", returns));
    }
    body.push(")".to_owned());

    let mut signature = vec![ParamDecl::new("self")];
    signature.extend(params.iter().map(CallParam::declaration));

    FunctionDecl {
        name,
        is_async: true,
        decorators: vec![format!(
            "operation({}, {})",
            method_literal,
            python_double_quoted(&operation.path)
        )],
        params: signature,
        returns: Some(returns.to_string()),
        body,
    }
}

pub fn zone_class_name(zone: &str) -> String {
    let name = pascal_case(zone);
    if name.is_empty() {
        "Endpoints".to_owned()
    } else {
        name
    }
}

fn zone_file(zone: &Zone, imports: &ImportTracker) -> Result<SourceFile, std::fmt::Error> {
    let mut header = String::new();
    writeln!(header, "{}", GENERATED_HEADER)?;
    // everything imported below wins over same-named common models
    writeln!(header, "from ..models import *\n")?;
    let typing_start = header.len();
    imports.write_imports(&mut header)?;
    if header.len() > typing_start {
        header.push('\n');
    }

    writeln!(header, "from ..client import Transport")?;
    let zones = imports.zones().collect::<Vec<_>>();
    if !zones.is_empty() {
        writeln!(header, "from ..models import {}", zones.join(", "))?;
    }
    writeln!(
        header,
        "from ..utils import NOT_SET, Param, ParamKind, handle_request, operation"
    )?;

    let mut body = vec![Declaration::Function(FunctionDecl {
        name: "__init__".to_owned(),
        params: vec![
            ParamDecl::new("self"),
            ParamDecl::annotated("client", "Transport"),
        ],
        returns: Some("None".to_owned()),
        body: vec!["self.client = client".to_owned()],
        ..Default::default()
    })];
    body.extend(
        zone.endpoint_methods
            .iter()
            .map(|(_, method)| Declaration::Function(method.clone())),
    );

    let mut file = SourceFile::new(format!("endpoints/{}.py", zone.name));
    file.push(Declaration::Raw(header));
    file.push(Declaration::Class(ClassDecl {
        name: zone_class_name(&zone.name),
        bases: vec![],
        docstring: None,
        body,
    }));

    Ok(file)
}

fn endpoints_package(zones: &[String]) -> Result<SourceFile, std::fmt::Error> {
    let mut code = String::new();
    writeln!(code, "{}", GENERATED_HEADER)?;
    for zone in zones {
        writeln!(code, "from .{} import {}", zone, zone_class_name(zone))?;
    }

    writeln!(code, "\n__all__ = [")?;
    for zone in zones {
        writeln!(code, "    \"{}\",", zone_class_name(zone))?;
    }
    writeln!(code, "]")?;

    let mut file = SourceFile::new("endpoints/__init__.py");
    file.push(Declaration::Raw(code));

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dereference::dereference;
    use crate::formatter::Formatter;
    use crate::parser::SwaggerParser;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn emit(doc: &Value, zones: Zones) -> EndpointFiles {
        let expanded = dereference(doc);
        let operations = SwaggerParser::new(&expanded, doc).parse_operations();
        let registry = SchemaRegistry::build(&expanded, doc, &operations);

        let mut emitter = EndpointEmitter::new(&registry, zones);
        for operation in &operations {
            emitter.add_operation(operation);
        }
        emitter.finish().unwrap()
    }

    fn emit_paths(paths: Value, schemas: Value) -> EndpointFiles {
        let doc = json!({"openapi": "3.0.0", "paths": paths, "components": {"schemas": schemas}});
        emit(&doc, Zones::new())
    }

    fn method_of<'f>(files: &'f EndpointFiles, zone: &str, name: &str) -> &'f FunctionDecl {
        files
            .files
            .iter()
            .find(|f| f.file_name == format!("endpoints/{}.py", zone))
            .and_then(|f| f.class(&zone_class_name(zone)))
            .and_then(|c| c.method(name))
            .unwrap_or_else(|| panic!("missing {}.{}", zone, name))
    }

    fn signature(method: &FunctionDecl) -> Vec<String> {
        method
            .params
            .iter()
            .map(|p| match (&p.annotation, &p.default) {
                (Some(a), Some(d)) => format!("{}: {} = {}", p.name, a, d),
                (Some(a), None) => format!("{}: {}", p.name, a),
                _ => p.name.clone(),
            })
            .collect()
    }

    fn user_schemas() -> Value {
        json!({
            "User": {
                "type": "object",
                "required": ["id", "name"],
                "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
            }
        })
    }

    #[test]
    fn list_endpoint_renders_a_zone_class() {
        let files = emit_paths(
            json!({"/users": {"get": {
                "tags": ["users"],
                "responses": {"200": {"content": {"application/json": {"schema": {
                    "type": "array", "items": {"$ref": "#/components/schemas/User"}
                }}}}}
            }}}),
            user_schemas(),
        );

        let file = files
            .files
            .iter()
            .find(|f| f.file_name == "endpoints/users.py")
            .unwrap();

        assert_eq!(
            Formatter::new().format(file).unwrap(),
            indoc! {r#"
                # Auto generated file, do not modify
                from ..models import *

                from typing import List

                from ..client import Transport
                from ..models import users
                from ..utils import NOT_SET, Param, ParamKind, handle_request, operation


                class Users:
                    def __init__(self, client: Transport) -> None:
                        self.client = client

                    @operation("GET", "/users")
                    async def get_users(self) -> List[users.User]:
                        path = "/users"
                        return await handle_request(
                            self.client,
                            "GET",
                            path,
                            [],
                            response_model=List[users.User],
                        )
            "#}
        );
        assert_eq!(files.zones, vec!["users"]);
    }

    #[test]
    fn path_and_body_parameters() {
        let files = emit_paths(
            json!({"/items/{item_id}": {"post": {
                "tags": ["items"],
                "operationId": "createItem",
                "parameters": [{"name": "item_id", "in": "path", "required": true, "schema": {"type": "integer"}}],
                "requestBody": {"content": {"application/json": {"schema": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {"note": {"type": "string"}, "name": {"type": "string"}}
                }}}},
                "responses": {"204": {"description": "done"}}
            }}}),
            json!({}),
        );

        let method = method_of(&files, "items", "create_item");
        assert_eq!(
            signature(method),
            vec![
                "self",
                "item_id_path: int",
                "name_body: str",
                "note_body: Optional[str] = NOT_SET",
            ]
        );
        assert_eq!(method.returns.as_deref(), Some("Any"));
        assert_eq!(method.body[0], "path = f\"/items/{item_id_path}\"");
        assert!(method.body.contains(&"        Param(\"item_id\", ParamKind.PATH, item_id_path),".to_owned()));
        assert!(method.body.contains(&"        Param(\"note\", ParamKind.BODY, note_body),".to_owned()));
        assert!(!method.body.iter().any(|l| l.contains("response_model")));
    }

    #[test]
    fn referenced_bodies_become_request_body() {
        let files = emit_paths(
            json!({"/users": {"post": {
                "tags": ["users"],
                "operationId": "create_user",
                "requestBody": {"required": true, "content": {"application/json": {"schema": {
                    "$ref": "#/components/schemas/User"
                }}}},
                "responses": {"201": {"content": {"application/json": {"schema": {
                    "$ref": "#/components/schemas/User"
                }}}}}
            }}}),
            user_schemas(),
        );

        let method = method_of(&files, "users", "create_user");
        assert_eq!(
            signature(method),
            vec!["self", "request_body: users.User = NOT_SET"]
        );
        assert!(method.body.contains(&"        Param(None, ParamKind.BODY, request_body),".to_owned()));
        assert!(method.body.contains(&"    response_model=users.User,".to_owned()));
    }

    #[test]
    fn multipart_properties_are_files() {
        let files = emit_paths(
            json!({"/files": {"post": {
                "tags": ["files"],
                "operationId": "upload",
                "requestBody": {"content": {"multipart/form-data": {"schema": {
                    "type": "object",
                    "required": ["file"],
                    "properties": {"file": {"type": "string", "format": "binary"}}
                }}}},
                "responses": {"200": {"content": {"application/json": {"schema": {}}}}}
            }}}),
            json!({}),
        );

        let method = method_of(&files, "files", "upload");
        assert_eq!(signature(method), vec!["self", "file_file: bytes"]);
        assert!(method.body.contains(&"        Param(\"file\", ParamKind.FILE, file_file),".to_owned()));
    }

    #[test]
    fn undeclared_placeholders_are_repaired() {
        let files = emit_paths(
            json!({
                "/things/{thing_id}": {"get": {
                    "tags": ["things"],
                    "operationId": "get_thing",
                    "parameters": [{"name": "thing_id", "in": "query", "schema": {"type": "integer"}}],
                    "responses": {}
                }},
                "/things/{slug}/parts": {"get": {
                    "tags": ["things"],
                    "operationId": "get_parts",
                    "parameters": [{"name": "verbose", "in": "query", "schema": {"type": "boolean"}}],
                    "responses": {}
                }},
                "/things/{slug}": {"get": {
                    "tags": ["things"],
                    "operationId": "get_bare",
                    "responses": {}
                }},
                "/things/{a}/{b}": {"get": {
                    "tags": ["things"],
                    "operationId": "get_pair",
                    "responses": {}
                }}
            }),
            json!({}),
        );

        let converted = method_of(&files, "things", "get_thing");
        assert_eq!(signature(converted), vec!["self", "thing_id_path: int"]);

        let synthesized = method_of(&files, "things", "get_parts");
        assert_eq!(
            signature(synthesized),
            vec!["self", "slug_path: str", "verbose_query: Optional[bool] = NOT_SET"]
        );
        assert_eq!(synthesized.body[0], "path = f\"/things/{slug_path}/parts\"");

        // nothing else declared, so there is no query parameter to take the place of
        let bare = method_of(&files, "things", "get_bare");
        assert_eq!(signature(bare), vec!["self"]);
        assert_eq!(bare.body[0], "path = \"/things/{slug}\"");

        let literal = method_of(&files, "things", "get_pair");
        assert_eq!(signature(literal), vec!["self"]);
        assert_eq!(literal.body[0], "path = \"/things/{a}/{b}\"");
    }

    #[test]
    fn referenced_parameter_schemas_keep_their_model() {
        let files = emit_paths(
            json!({"/search": {"get": {
                "tags": ["search"],
                "operationId": "search",
                "parameters": [
                    {"name": "filter", "in": "query", "schema": {"$ref": "#/components/schemas/Filter"}},
                    {"name": "X-User-Id", "in": "header", "schema": {"$ref": "#/components/schemas/UserId"}},
                    {"name": "param", "in": "query", "schema": {"$ref": "#/components/schemas/Param"}}
                ],
                "responses": {"200": {"content": {"application/json": {"schema": {
                    "$ref": "#/components/schemas/Filter"
                }}}}}
            }}}),
            json!({
                "Filter": {"type": "object", "properties": {"term": {"type": "string"}}},
                "UserId": {"type": "string"},
                "Param": {"type": "object", "properties": {"a": {"type": "string"}}}
            }),
        );

        let method = method_of(&files, "search", "search");
        assert_eq!(
            signature(method),
            vec![
                "self",
                "filter_query: Optional[search.Filter] = NOT_SET",
                "x_user_id: Optional[UserId] = NOT_SET",
                "param_query: Optional[common.Param] = NOT_SET",
            ]
        );

        let file = files
            .files
            .iter()
            .find(|f| f.file_name == "endpoints/search.py")
            .unwrap();
        let text = Formatter::new().format(file).unwrap();
        assert!(text.starts_with("# Auto generated file, do not modify\nfrom ..models import *\n\n"));
        assert!(text.contains("from ..models import common, search\n"));
    }

    #[test]
    fn optional_parameters_follow_required_ones() {
        let files = emit_paths(
            json!({"/search": {"get": {
                "tags": ["search"],
                "operationId": "search",
                "parameters": [
                    {"name": "limit", "in": "query", "schema": {"type": "integer"}},
                    {"name": "q", "in": "query", "required": true, "schema": {"type": "string"}},
                    {"name": "X-Request-ID", "in": "header", "schema": {"type": "string"}}
                ],
                "responses": {}
            }}}),
            json!({}),
        );

        let method = method_of(&files, "search", "search");
        assert_eq!(
            signature(method),
            vec![
                "self",
                "q_query: str",
                "limit_query: Optional[int] = NOT_SET",
                "x_request_id: Optional[str] = NOT_SET",
            ]
        );
        assert!(method.body.contains(&"        Param(\"X-Request-ID\", ParamKind.HEADER, x_request_id),".to_owned()));
    }

    #[test]
    fn paginated_responses_resolve_to_the_zone_variant() {
        let paginated = |item: &str| {
            json!({"type": "object", "title": "Paginated", "properties": {
                "items": {"type": "array", "items": {"type": "string"}},
                "total": {"type": "integer"},
                "kind": {"type": "string", "description": item}
            }})
        };

        let files = emit_paths(
            json!({"/orders": {"get": {
                "tags": ["orders"],
                "operationId": "list_orders",
                "responses": {"200": {"content": {"application/json": {"schema": {
                    "type": "object", "title": "Paginated",
                    "properties": {"items": {"type": "array", "items": {}}, "page": {"type": "integer"}}
                }}}}}
            }}}),
            json!({
                "app__routers__users__Paginated": paginated("users"),
                "app__routers__orders__Paginated": paginated("orders")
            }),
        );

        let method = method_of(&files, "orders", "list_orders");
        assert_eq!(method.returns.as_deref(), Some("orders.OrdersPaginated"));
    }

    #[test]
    fn distinct_success_shapes_are_unioned() {
        let files = emit_paths(
            json!({"/users/{id}": {"get": {
                "tags": ["users"],
                "operationId": "get_user",
                "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}],
                "responses": {
                    "200": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/User"}}}},
                    "202": {"content": {"application/json": {"schema": {"type": "string"}}}},
                    "203": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/User"}}}},
                    "404": {"content": {"application/json": {"schema": {"type": "integer"}}}}
                }
            }}}),
            user_schemas(),
        );

        let method = method_of(&files, "users", "get_user");
        assert_eq!(method.returns.as_deref(), Some("Union[users.User, str]"));
    }

    #[test]
    fn zones_without_endpoints_are_pruned() {
        let mut zones = Zones::new();
        zones.entry("reports").model_names.insert("Report".to_owned());

        let doc = json!({
            "openapi": "3.0.0",
            "paths": {"/ping": {"get": {"operationId": "ping", "responses": {}}}},
            "components": {"schemas": {}}
        });
        let files = emit(&doc, zones);

        assert_eq!(files.pruned, vec!["reports"]);
        assert_eq!(files.zones, vec!["default"]);
        assert!(files.files.iter().all(|f| f.file_name != "endpoints/reports.py"));
        assert!(method_of(&files, "default", "ping").body.contains(&"    [],".to_owned()));
    }

    #[test]
    fn duplicate_method_names_get_a_suffix() {
        let files = emit_paths(
            json!({
                "/a": {"get": {"tags": ["x"], "operationId": "fetch", "responses": {}}},
                "/b": {"get": {"tags": ["x"], "operationId": "fetch", "responses": {}}},
                "/c/{id}": {"delete": {"tags": ["x"], "responses": {}}}
            }),
            json!({}),
        );

        method_of(&files, "x", "fetch");
        method_of(&files, "x", "fetch_2");
        method_of(&files, "x", "delete_c");
    }
}
