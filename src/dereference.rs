use log::warn;
use serde_json::{Map, Value};

/// Returns a copy of `doc` with every local `$ref` replaced by its target.
///
/// Keys next to a `$ref` are laid over the resolved target. A reference that is already being
/// expanded further up the chain is left as a `$ref`, which keeps recursive schemas finite.
pub fn dereference(doc: &Value) -> Value {
    let mut stack = vec![];
    expand(doc, doc, &mut stack)
}

fn expand(root: &Value, node: &Value, stack: &mut Vec<String>) -> Value {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(|r| r.as_str()) {
                return expand_ref(root, map, reference, stack);
            }

            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), expand(root, value, stack));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| expand(root, v, stack)).collect()),
        other => other.clone(),
    }
}

fn expand_ref(
    root: &Value,
    map: &Map<String, Value>,
    reference: &str,
    stack: &mut Vec<String>,
) -> Value {
    if stack.iter().any(|r| r == reference) {
        return Value::Object(map.clone());
    }

    let target = match reference.strip_prefix('#').and_then(|p| root.pointer(p)) {
        Some(t) => t,
        None => {
            warn!("Unable to resolve reference {}", reference);
            return Value::Object(map.clone());
        }
    };

    stack.push(reference.to_owned());
    let mut resolved = expand(root, target, stack);
    stack.pop();

    if let Value::Object(resolved_map) = &mut resolved {
        for (key, value) in map {
            if key != "$ref" {
                resolved_map.insert(key.clone(), expand(root, value, stack));
            }
        }
    }

    resolved
}
