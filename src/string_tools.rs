use regex::Regex;
use std::sync::LazyLock;

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());
static LOWER_UPPER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static ACRONYM_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Upper-cases the first character and leaves the rest untouched.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `HTTPError` -> `http_error`, `userProfile` -> `user_profile`, `User Accounts` -> `user_accounts`.
pub fn snake_case(value: &str) -> String {
    let spaced = NON_ALNUM.replace_all(value, "_");
    let step = LOWER_UPPER.replace_all(&spaced, "${1}_${2}");
    let step = ACRONYM_WORD.replace_all(&step, "${1}_${2}");
    let step = UNDERSCORES.replace_all(&step, "_");

    step.trim_matches('_').to_lowercase()
}

/// `user accounts` -> `UserAccounts`
pub fn pascal_case(value: &str) -> String {
    NON_ALNUM
        .split(value)
        .filter(|token| !token.is_empty())
        .map(capitalize)
        .collect()
}

pub fn is_python_keyword(value: &str) -> bool {
    PYTHON_KEYWORDS.contains(&value)
}

/// Turns an arbitrary wire name into something usable as a python identifier.
pub fn python_identifier(value: &str) -> String {
    let mut ident = NON_ALNUM.replace_all(value, "_").to_string();

    if ident.is_empty() {
        ident.push_str("value");
    }

    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }

    if is_python_keyword(&ident) {
        ident.push('_');
    }

    ident
}

pub fn python_repr(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "None".to_owned(),
        serde_json::Value::Bool(true) => "True".to_owned(),
        serde_json::Value::Bool(false) => "False".to_owned(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => python_string(s),
        other => python_string(&other.to_string()),
    }
}

pub fn python_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn snake_case_splits_acronyms_as_a_single_word() {
        assert_eq!(snake_case("HTTPError"), "http_error");
        assert_eq!(snake_case("getHTTPResponse"), "get_http_response");
        assert_eq!(snake_case("UserProfile"), "user_profile");
        assert_eq!(snake_case("User Accounts"), "user_accounts");
        assert_eq!(snake_case("already__snake"), "already_snake");
        assert_eq!(snake_case("Item2Id"), "item2_id");
    }

    #[test]
    fn capitalize_only_touches_first_letter() {
        assert_eq!(capitalize("orders"), "Orders");
        assert_eq!(capitalize("userProfile"), "UserProfile");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn python_identifiers_are_valid() {
        assert_eq!(python_identifier("x-request-id"), "x_request_id");
        assert_eq!(python_identifier("from"), "from_");
        assert_eq!(python_identifier("2fa"), "_2fa");
        assert_eq!(python_identifier("name"), "name");
    }

    #[test]
    fn python_repr_quotes_strings() {
        assert_eq!(python_repr(&json!("it's")), "'it\\'s'");
        assert_eq!(python_repr(&json!(3)), "3");
        assert_eq!(python_repr(&json!(true)), "True");
        assert_eq!(python_repr(&json!(null)), "None");
    }
}
