use crate::parser::endpoint::OperationDescriptor;
use crate::parser::schema_ref_name;
use crate::schema_resolver::COMMON_ZONE;
use crate::string_tools::{python_identifier, snake_case};
use log::debug;
use serde_json::Value;

/// Zone of operations without any tag.
pub const DEFAULT_ZONE: &str = "default";

/// Decides which zone (tag derived module) schemas and operations belong to.
pub struct ZoneClassifier<'a> {
    operations: &'a [OperationDescriptor],
}

impl<'a> ZoneClassifier<'a> {
    pub fn new(operations: &'a [OperationDescriptor]) -> Self {
        Self { operations }
    }

    /// Zones double as python package names, so they are always valid identifiers.
    pub fn zone_for_operation(operation: &OperationDescriptor) -> String {
        operation
            .first_tag()
            .map(snake_case)
            .filter(|z| !z.is_empty())
            .map(|z| python_identifier(&z))
            .unwrap_or_else(|| DEFAULT_ZONE.to_owned())
    }

    pub fn zone_for_schema(&self, original_name: &str) -> String {
        let zone = python_identifier(&self.classify(original_name));
        debug!("Schema {} classified into zone {}", original_name, zone);
        zone
    }

    fn classify(&self, original_name: &str) -> String {
        if let Some(zone) = zone_from_segments(original_name) {
            return zone;
        }

        let lower = original_name.to_lowercase();
        if lower.contains("error") || lower.contains("validation") {
            return COMMON_ZONE.to_owned();
        }

        if original_name.contains(' ') {
            if let Some(zone) = self.zone_from_operation_id(original_name) {
                return zone;
            }
        } else if original_name.contains('_') {
            if let Some(zone) = zone_from_tokens(original_name) {
                return zone;
            }
        } else if let Some(zone) = self.zone_from_usage(original_name) {
            return zone;
        }

        COMMON_ZONE.to_owned()
    }

    /// Titles such as `Response Get User Users Id Get` embed the operation id.
    fn zone_from_operation_id(&self, original_name: &str) -> Option<String> {
        let haystack = normalize_words(original_name);

        self.operations
            .iter()
            .find(|op| {
                op.operation_id
                    .as_deref()
                    .map(normalize_words)
                    .is_some_and(|id| !id.is_empty() && haystack.contains(&id))
            })
            .map(Self::zone_for_operation)
    }

    /// First operation whose body or responses structurally reference the schema.
    fn zone_from_usage(&self, original_name: &str) -> Option<String> {
        self.operations
            .iter()
            .find(|op| {
                let bodies = op.request_body.iter().flat_map(|b| b.content.iter());
                let responses = op.responses.iter().flat_map(|r| r.content.iter());

                bodies
                    .chain(responses)
                    .any(|media| references_schema(media.original(), original_name))
            })
            .map(Self::zone_for_operation)
    }
}

/// `app__routers__orders__Read` -> `orders`
fn zone_from_segments(original_name: &str) -> Option<String> {
    let segments = original_name.split("__").collect::<Vec<_>>();
    if segments.len() < 4 {
        return None;
    }

    let meaningful = segments
        .into_iter()
        .filter(|s| !s.is_empty() && !s.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>();

    if meaningful.len() < 2 {
        return None;
    }

    let candidate = meaningful[meaningful.len() - 2];
    let candidate = candidate
        .split('_')
        .find(|s| !s.is_empty())
        .unwrap_or(candidate);

    Some(snake_case(candidate)).filter(|z| !z.is_empty())
}

/// `items_create_items_post` -> `items`, `Body_upload_file` -> `body`
fn zone_from_tokens(original_name: &str) -> Option<String> {
    let parts = original_name
        .split('_')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>();

    let repeated = parts
        .iter()
        .find(|part| parts.iter().filter(|p| p == part).count() > 1);

    repeated
        .or_else(|| parts.iter().find(|p| p.chars().count() > 2))
        .map(|p| snake_case(p))
        .filter(|z| !z.is_empty())
}

fn normalize_words(value: &str) -> String {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `schema` points at `name` directly or through anyOf/oneOf, array items or properties.
pub fn references_schema(schema: &Value, name: &str) -> bool {
    if schema_ref_name(schema) == Some(name) {
        return true;
    }

    for key in ["anyOf", "oneOf"] {
        if let Some(variants) = schema.get(key).and_then(|v| v.as_array()) {
            if variants.iter().any(|v| references_schema(v, name)) {
                return true;
            }
        }
    }

    if let Some(items) = schema.get("items") {
        if references_schema(items, name) {
            return true;
        }
    }

    schema
        .get("properties")
        .and_then(|p| p.as_object())
        .is_some_and(|props| props.values().any(|p| references_schema(p, name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::endpoint::{EndpointType, MediaSchema, ResponseDescriptor};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn op(tag: Option<&str>, operation_id: Option<&str>, response: Value) -> OperationDescriptor {
        OperationDescriptor {
            endpoint_type: EndpointType::Get,
            path: "/x".to_owned(),
            operation_id: operation_id.map(|s| s.to_owned()),
            parameters: vec![],
            request_body: None,
            responses: vec![ResponseDescriptor {
                status: "200".to_owned(),
                content: vec![MediaSchema {
                    content_type: "application/json".to_owned(),
                    schema: response.clone(),
                    raw: Some(response),
                }],
            }],
            tags: tag.into_iter().map(|t| t.to_owned()).collect(),
        }
    }

    #[test]
    fn operation_zone_is_snake_cased_first_tag() {
        assert_eq!(
            ZoneClassifier::zone_for_operation(&op(Some("User Accounts"), None, json!({}))),
            "user_accounts"
        );
        assert_eq!(
            ZoneClassifier::zone_for_operation(&op(None, None, json!({}))),
            DEFAULT_ZONE
        );
        assert_eq!(
            ZoneClassifier::zone_for_operation(&op(Some("import"), None, json!({}))),
            "import_"
        );
    }

    #[test]
    fn deep_segment_names_use_the_second_to_last_segment() {
        let classifier = ZoneClassifier::new(&[]);
        assert_eq!(classifier.zone_for_schema("app__routers__orders__Read"), "orders");
        assert_eq!(
            classifier.zone_for_schema("app__routers__order_items__Read"),
            "order"
        );
        assert_eq!(
            classifier.zone_for_schema("app__v2__users__123__Create"),
            "users"
        );
    }

    #[test]
    fn errors_land_in_common() {
        let classifier = ZoneClassifier::new(&[]);
        assert_eq!(classifier.zone_for_schema("HTTPValidationError"), COMMON_ZONE);
        assert_eq!(classifier.zone_for_schema("ValidationIssue"), COMMON_ZONE);
    }

    #[test]
    fn titles_with_spaces_match_operation_ids() {
        let ops = [op(Some("Users"), Some("get_user_users__id__get"), json!({}))];
        let classifier = ZoneClassifier::new(&ops);
        assert_eq!(
            classifier.zone_for_schema("Response Get User Users  Id Get"),
            "users"
        );
        assert_eq!(classifier.zone_for_schema("Something Else"), COMMON_ZONE);
    }

    #[test]
    fn underscore_names_prefer_repeated_tokens() {
        let classifier = ZoneClassifier::new(&[]);
        assert_eq!(classifier.zone_for_schema("items_create_items_post"), "items");
        assert_eq!(classifier.zone_for_schema("Body_upload_file_files_post"), "body");
        assert_eq!(classifier.zone_for_schema("a_b"), COMMON_ZONE);
    }

    #[test]
    fn plain_names_follow_their_first_usage() {
        let ops = [
            op(Some("misc"), None, json!({"type": "string"})),
            op(
                Some("Orders"),
                None,
                json!({"anyOf": [{"type": "array", "items": {"$ref": "#/components/schemas/Order"}}, {"type": "null"}]}),
            ),
        ];
        let classifier = ZoneClassifier::new(&ops);
        assert_eq!(classifier.zone_for_schema("Order"), "orders");
        assert_eq!(classifier.zone_for_schema("Unused"), COMMON_ZONE);
    }
}
