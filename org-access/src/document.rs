//! Offline structural checks for Service Control Policy documents.

use serde::Serialize;
use serde_json::{Map, Value};

/// Largest SCP document the provider accepts, in characters.
pub const MAX_SCP_SIZE: usize = 5120;
/// Only policy language version accepted for new documents.
pub const POLICY_LANGUAGE_VERSION: &str = "2012-10-17";

const TOP_LEVEL_KEYS: [&str; 3] = ["Version", "Id", "Statement"];
const STATEMENT_KEYS: [&str; 7] = [
    "Sid",
    "Effect",
    "Action",
    "NotAction",
    "Resource",
    "NotResource",
    "Condition",
];

/// Outcome of validating a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when no problems were found.
    pub valid: bool,
    /// Every problem found, in document order.
    pub errors: Vec<String>,
    /// Number of statements in the document.
    pub statement_count: usize,
    /// Document size in characters.
    pub size: usize,
}

/// Validates the structure of an SCP document without contacting the provider.
///
/// Reports every problem found rather than stopping at the first.
#[must_use]
pub fn validate_policy_document(content: &str) -> ValidationReport {
    let size = content.chars().count();
    let mut errors = Vec::new();

    if size > MAX_SCP_SIZE {
        errors.push(format!(
            "document is {size} characters; the limit is {MAX_SCP_SIZE}"
        ));
    }

    let statement_count = match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(document)) => check_document(&document, &mut errors),
        Ok(_) => {
            errors.push("document must be a JSON object".to_owned());
            0
        }
        Err(err) => {
            errors.push(format!("document is not valid JSON: {err}"));
            0
        }
    };

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        statement_count,
        size,
    }
}

fn check_document(document: &Map<String, Value>, errors: &mut Vec<String>) -> usize {
    for key in document.keys() {
        if !TOP_LEVEL_KEYS.contains(&key.as_str()) {
            errors.push(format!("unsupported top-level element `{key}`"));
        }
    }

    match document.get("Version") {
        None => {}
        Some(Value::String(version)) if version == POLICY_LANGUAGE_VERSION => {}
        Some(other) => errors.push(format!(
            "Version must be \"{POLICY_LANGUAGE_VERSION}\", found {other}"
        )),
    }

    let statements: Vec<&Value> = match document.get("Statement") {
        None => {
            errors.push("Statement is required".to_owned());
            return 0;
        }
        Some(Value::Array(items)) if items.is_empty() => {
            errors.push("Statement must not be empty".to_owned());
            return 0;
        }
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        Some(_) => {
            errors.push("Statement must be an object or an array of objects".to_owned());
            return 0;
        }
    };

    for (index, statement) in statements.iter().enumerate() {
        match statement {
            Value::Object(fields) => check_statement(index, fields, errors),
            _ => errors.push(format!("Statement[{index}] must be an object")),
        }
    }

    statements.len()
}

fn check_statement(index: usize, fields: &Map<String, Value>, errors: &mut Vec<String>) {
    let label = fields
        .get("Sid")
        .and_then(Value::as_str)
        .map_or_else(|| format!("Statement[{index}]"), |sid| format!("Statement[{index}] ({sid})"));

    for key in fields.keys() {
        if key == "Principal" || key == "NotPrincipal" {
            errors.push(format!("{label}: {key} is not supported in service control policies"));
        } else if !STATEMENT_KEYS.contains(&key.as_str()) {
            errors.push(format!("{label}: unsupported element `{key}`"));
        }
    }

    match fields.get("Effect").and_then(Value::as_str) {
        Some("Allow" | "Deny") => {}
        Some(other) => errors.push(format!("{label}: Effect must be Allow or Deny, found `{other}`")),
        None => errors.push(format!("{label}: Effect is required")),
    }

    match (fields.get("Action"), fields.get("NotAction")) {
        (Some(_), Some(_)) => {
            errors.push(format!("{label}: Action and NotAction are mutually exclusive"));
        }
        (None, None) => errors.push(format!("{label}: Action or NotAction is required")),
        (Some(value), None) => check_string_list(&label, "Action", value, errors),
        (None, Some(value)) => check_string_list(&label, "NotAction", value, errors),
    }

    for key in ["Resource", "NotResource"] {
        if let Some(value) = fields.get(key) {
            check_string_list(&label, key, value, errors);
        }
    }

    if let Some(condition) = fields.get("Condition") {
        if !condition.is_object() {
            errors.push(format!("{label}: Condition must be an object"));
        }
    }
}

fn check_string_list(label: &str, key: &str, value: &Value, errors: &mut Vec<String>) {
    let valid = match value {
        Value::String(item) => !item.is_empty(),
        Value::Array(items) => {
            !items.is_empty() && items.iter().all(|item| item.as_str().is_some_and(|s| !s.is_empty()))
        }
        _ => false,
    };

    if !valid {
        errors.push(format!(
            "{label}: {key} must be a non-empty string or array of non-empty strings"
        ));
    }
}
