use log::{debug, warn};
use serde_json::{Map, Value};

use endpoint::{
    EndpointType, MediaSchema, OperationDescriptor, ParamDescriptor, ParamLocation, RequestBody,
    ResponseDescriptor,
};

pub mod endpoint;
pub mod zone;

pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Name of the component schema a `{"$ref": "#/components/schemas/X"}` points at.
pub fn schema_ref_name(value: &Value) -> Option<&str> {
    value
        .get("$ref")
        .and_then(|v| v.as_str())
        .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
}

/// Follows a single local `$ref` hop, returning the node itself when there is none.
pub fn follow_ref<'a>(root: &'a Value, node: &'a Value) -> &'a Value {
    node.get("$ref")
        .and_then(|v| v.as_str())
        .and_then(|r| r.strip_prefix('#'))
        .and_then(|pointer| root.pointer(pointer))
        .unwrap_or(node)
}

pub fn component_schemas(doc: &Value) -> Option<&Map<String, Value>> {
    doc.get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(|s| s.as_object())
}

/// Reads `paths` into operation descriptors, in document order.
pub struct SwaggerParser<'a> {
    spec: &'a Value,
    raw: &'a Value,
}

impl<'a> SwaggerParser<'a> {
    pub fn new(spec: &'a Value, raw: &'a Value) -> Self {
        Self { spec, raw }
    }

    pub fn parse_operations(&self) -> Vec<OperationDescriptor> {
        let mut operations = vec![];

        let paths = match self.spec.get("paths").and_then(|p| p.as_object()) {
            Some(p) => p,
            None => return operations,
        };

        for (endpoint_path, path_item) in paths {
            let raw_path_item = self
                .raw
                .get("paths")
                .and_then(|p| p.get(endpoint_path))
                .map(|item| follow_ref(self.raw, item));

            for endpoint_type in EndpointType::ALL {
                if let Some(op) =
                    self.parse_endpoint(endpoint_path, path_item, raw_path_item, endpoint_type)
                {
                    operations.push(op);
                }
            }
        }

        debug!("Parsed {} operations", operations.len());

        operations
    }

    fn parse_endpoint(
        &self,
        endpoint_path: &str,
        path_item: &Value,
        raw_path_item: Option<&Value>,
        endpoint_type: EndpointType,
    ) -> Option<OperationDescriptor> {
        let endpoint = path_item.get(endpoint_type.key())?.as_object()?;
        let raw_endpoint = raw_path_item.and_then(|item| item.get(endpoint_type.key()));

        let tags = endpoint
            .get("tags")
            .and_then(|t| t.as_array())
            .map(|t| {
                t.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_owned()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let operation_id = endpoint
            .get("operationId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_owned());

        let mut parameters: Vec<ParamDescriptor> = vec![];
        let shared = with_raw(
            path_item.get("parameters"),
            raw_path_item.and_then(|item| item.get("parameters")),
        );
        let own = with_raw(
            endpoint.get("parameters"),
            raw_endpoint.and_then(|e| e.get("parameters")),
        );

        for (param, raw_param) in shared.chain(own) {
            let raw_param = raw_param.map(|r| follow_ref(self.raw, r));
            let param = match parse_param(param, raw_param) {
                Some(p) => p,
                None => {
                    warn!(
                        "Skipping malformed parameter on {} {}: {}",
                        endpoint_type, endpoint_path, param
                    );
                    continue;
                }
            };

            // operation level parameters override path level ones
            parameters.retain(|p| !(p.name == param.name && p.location == param.location));
            parameters.push(param);
        }

        let request_body = endpoint.get("requestBody").map(|body| {
            let raw_body = raw_endpoint
                .and_then(|e| e.get("requestBody"))
                .map(|b| follow_ref(self.raw, b));

            RequestBody {
                required: body
                    .get("required")
                    .and_then(|r| r.as_bool())
                    .unwrap_or(false),
                content: self.parse_content(body, raw_body),
            }
        });

        let mut responses = vec![];
        if let Some(items) = endpoint.get("responses").and_then(|r| r.as_object()) {
            for (status, response) in items {
                let raw_response = raw_endpoint
                    .and_then(|e| e.get("responses"))
                    .and_then(|r| r.get(status))
                    .map(|r| follow_ref(self.raw, r));

                responses.push(ResponseDescriptor {
                    status: status.to_owned(),
                    content: self.parse_content(response, raw_response),
                });
            }
        }

        Some(OperationDescriptor {
            endpoint_type,
            path: endpoint_path.to_owned(),
            operation_id,
            parameters,
            request_body,
            responses,
            tags,
        })
    }

    fn parse_content(&self, holder: &Value, raw_holder: Option<&Value>) -> Vec<MediaSchema> {
        let content = match holder.get("content").and_then(|c| c.as_object()) {
            Some(c) => c,
            None => return vec![],
        };

        content
            .iter()
            .map(|(content_type, media)| {
                let raw = raw_holder
                    .and_then(|h| h.get("content"))
                    .and_then(|c| c.get(content_type))
                    .and_then(|m| m.get("schema"))
                    .cloned();

                MediaSchema {
                    content_type: content_type.to_owned(),
                    schema: media.get("schema").cloned().unwrap_or(Value::Null),
                    raw,
                }
            })
            .collect()
    }
}

/// Pairs every parameter with its counterpart in the raw document, which shares its position.
fn with_raw<'a>(
    params: Option<&'a Value>,
    raw_params: Option<&'a Value>,
) -> impl Iterator<Item = (&'a Value, Option<&'a Value>)> {
    let raw_params = raw_params.and_then(|p| p.as_array());

    params
        .and_then(|p| p.as_array())
        .into_iter()
        .flatten()
        .enumerate()
        .map(move |(index, param)| (param, raw_params.and_then(|r| r.get(index))))
}

/// `schema`, or the schema of the first `content` entry.
fn param_schema(param: &Value) -> Option<&Value> {
    param.get("schema").or_else(|| {
        param
            .get("content")
            .and_then(|c| c.as_object())
            .and_then(|c| c.values().next())
            .and_then(|m| m.get("schema"))
    })
}

fn parse_param(param: &Value, raw_param: Option<&Value>) -> Option<ParamDescriptor> {
    let name = param.get("name")?.as_str()?.to_owned();
    let location = ParamLocation::parse(param.get("in")?.as_str()?)?;

    let schema = param_schema(param).cloned().unwrap_or(Value::Null);
    let raw = raw_param.and_then(param_schema).cloned();

    let required = location == ParamLocation::Path
        || param
            .get("required")
            .and_then(|r| r.as_bool())
            .unwrap_or(false);

    Some(ParamDescriptor {
        name,
        location,
        schema,
        raw,
        required,
    })
}
