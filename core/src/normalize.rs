//! Input normalization: schema → values, and shape fixes before submission.

use serde_json::{json, Value};
use tracing::warn;

use crate::model::{InputSchema, RunnableInput};

/// Values pulled out of a schema, plus the required fields it could not fill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub input: RunnableInput,
    pub missing_required: Vec<String>,
}

/// Builds a runnable input from a schema: `prefill`, else `default`, else the
/// field is omitted. Missing required fields are reported, not fatal.
pub fn extract(schema: &InputSchema) -> Extraction {
    let mut input = RunnableInput::new();

    for (name, field) in &schema.properties {
        if let Some(value) = field.prefill.as_ref().or(field.default.as_ref()) {
            input.insert(name.clone(), value.clone());
        }
    }

    let missing_required: Vec<String> = schema
        .required
        .iter()
        .filter(|name| !input.contains_key(name.as_str()))
        .cloned()
        .collect();

    for name in &missing_required {
        warn!("Required field '{}' has no prefill or default", name);
    }

    Extraction {
        input,
        missing_required,
    }
}

/// Boolean options that editors commonly hand back as text.
pub const BOOLEAN_FIELDS: &[&str] = &[
    "keepUrlFragments",
    "respectRobotsTxtFile",
    "debugLog",
    "ignoreSslErrors",
    "forceResponseEncoding",
    "downloadMedia",
    "downloadCss",
    "closeCookieModals",
    "headless",
    "browserLog",
    "useChrome",
    "ignoreCorsAndCsp",
];

pub type Transform = fn(Value) -> Value;

/// One entry of the coercion table: a field name and what to do with it.
#[derive(Clone, Copy)]
pub struct CoercionRule {
    pub field: &'static str,
    pub transform: Transform,
}

/// Ordered table of best-effort shape fixes applied before a run is submitted.
/// Unknown fields and unexpected shapes pass through untouched.
#[derive(Clone)]
pub struct Coercer {
    rules: Vec<CoercionRule>,
}

impl Default for Coercer {
    fn default() -> Self {
        let mut rules: Vec<CoercionRule> = BOOLEAN_FIELDS
            .iter()
            .map(|&field| CoercionRule {
                field,
                transform: text_to_bool,
            })
            .collect();
        rules.push(CoercionRule {
            field: "startUrls",
            transform: wrap_start_urls,
        });
        rules.push(CoercionRule {
            field: "proxyConfiguration",
            transform: managed_proxy,
        });
        Self { rules }
    }
}

impl Coercer {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, field: &'static str, transform: Transform) -> Self {
        self.rules.push(CoercionRule { field, transform });
        self
    }

    pub fn apply(&self, input: Value) -> Value {
        let Value::Object(mut map) = input else {
            return input;
        };
        for rule in &self.rules {
            if let Some(slot) = map.get_mut(rule.field) {
                *slot = (rule.transform)(slot.take());
            }
        }
        Value::Object(map)
    }
}

fn text_to_bool(value: Value) -> Value {
    match value {
        Value::String(text) if text.eq_ignore_ascii_case("true") => Value::Bool(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Value::Bool(false),
        other => other,
    }
}

fn wrap_start_urls(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(url) => json!({ "url": url }),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn managed_proxy(value: Value) -> Value {
    match value {
        Value::String(_) => json!({ "useApifyProxy": true }),
        other => other,
    }
}
