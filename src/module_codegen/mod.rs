use serde_json::Value;

pub mod action_gen;
mod import_tracker;
pub mod types_gen;

pub use import_tracker::ImportTracker;

pub const GENERATED_HEADER: &str = "# Auto generated file, do not modify";

/// First line of a schema's description, safe to put between triple quotes.
pub(crate) fn docstring(schema: &Value) -> Option<String> {
    let line = schema
        .get("description")
        .and_then(|d| d.as_str())?
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?;

    let mut text = line.replace('\\', "\\\\").replace("\"\"\"", "'''");
    if text.ends_with('"') {
        text.push(' ');
    }

    Some(text)
}
