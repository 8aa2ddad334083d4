use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EndpointType {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl EndpointType {
    pub const ALL: [EndpointType; 8] = [
        EndpointType::Get,
        EndpointType::Put,
        EndpointType::Post,
        EndpointType::Delete,
        EndpointType::Options,
        EndpointType::Head,
        EndpointType::Patch,
        EndpointType::Trace,
    ];

    /// Key of the operation inside an OpenAPI path item.
    pub fn key(&self) -> &'static str {
        match self {
            EndpointType::Get => "get",
            EndpointType::Put => "put",
            EndpointType::Post => "post",
            EndpointType::Delete => "delete",
            EndpointType::Options => "options",
            EndpointType::Head => "head",
            EndpointType::Patch => "patch",
            EndpointType::Trace => "trace",
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key().to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: String,
    pub location: ParamLocation,
    pub schema: Value,
    pub raw: Option<Value>,
    pub required: bool,
}

impl ParamDescriptor {
    /// The non-dereferenced schema when available, so `$ref`s are still visible.
    pub fn original(&self) -> &Value {
        self.raw.as_ref().unwrap_or(&self.schema)
    }
}

/// A schema under a content type, in both its dereferenced and original shape.
#[derive(Debug, Clone)]
pub struct MediaSchema {
    pub content_type: String,
    pub schema: Value,
    pub raw: Option<Value>,
}

impl MediaSchema {
    /// The non-dereferenced schema when available, so `$ref`s are still visible.
    pub fn original(&self) -> &Value {
        self.raw.as_ref().unwrap_or(&self.schema)
    }
}

#[derive(Debug, Clone)]
pub struct RequestBody {
    pub required: bool,
    pub content: Vec<MediaSchema>,
}

#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    pub status: String,
    pub content: Vec<MediaSchema>,
}

impl ResponseDescriptor {
    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }
}

#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub endpoint_type: EndpointType,
    pub path: String,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParamDescriptor>,
    pub request_body: Option<RequestBody>,
    pub responses: Vec<ResponseDescriptor>,
    pub tags: Vec<String>,
}

impl OperationDescriptor {
    pub fn first_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    pub fn success_responses(&self) -> impl Iterator<Item = &ResponseDescriptor> {
        self.responses.iter().filter(|r| r.is_success())
    }
}
