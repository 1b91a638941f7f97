pub mod app;
pub mod auth;
pub mod debit_note;
pub mod lookups;
pub mod metrics;
pub mod settlement;

use serde::Deserialize;
use serde_json::Value;

/// Single-field edit sent by the form on every change.
#[derive(Debug, Deserialize)]
pub struct FieldEdit<F> {
    pub field: F,
    #[serde(default)]
    pub value: Value,
}

impl<F> FieldEdit<F> {
    /// Raw text as typed. Numbers and booleans are rendered back to text so
    /// the draft applies its own parse-with-default rules.
    pub fn raw(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_renders_json_scalars_as_text() {
        let edit: FieldEdit<String> =
            serde_json::from_value(json!({"field": "appliedAmount", "value": 12.5})).unwrap();
        assert_eq!(edit.raw(), "12.5");

        let edit: FieldEdit<String> =
            serde_json::from_value(json!({"field": "adminOverride", "value": true})).unwrap();
        assert_eq!(edit.raw(), "true");

        let edit: FieldEdit<String> = serde_json::from_value(json!({"field": "memo"})).unwrap();
        assert_eq!(edit.raw(), "");
    }
}
