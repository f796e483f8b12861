use serde_json::{Map, Value};

/// The JSON document returned by one provider request, untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload(pub Value);

impl RawPayload {
    /// A payload meaning "the provider has no data for this request".
    pub fn empty() -> Self {
        RawPayload(Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Finds every object in the document, at any depth, where `key` holds `value`.
    pub fn find_branches<'a>(&'a self, key: &str, value: &Value) -> Vec<&'a Map<String, Value>> {
        let mut found = Vec::new();
        collect_branches(&self.0, key, value, &mut found);
        found
    }
}

fn collect_branches<'a>(
    node: &'a Value,
    key: &str,
    value: &Value,
    found: &mut Vec<&'a Map<String, Value>>,
) {
    match node {
        Value::Object(map) => {
            if map.get(key) == Some(value) {
                found.push(map);
            }
            for child in map.values() {
                collect_branches(child, key, value, found);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_branches(child, key, value, found);
            }
        }
        _ => {}
    }
}
