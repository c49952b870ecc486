/*!
Example values for schema properties.

When example generation is enabled, a property without a literal example is
given whatever the configured [`ExampleResolver`] returns for its key. The
key is `SchemaName.fieldName` unless the field names an explicit one.
*/

use crate::{error::OpenApiResult, registry::FieldDef, specification::Schema};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Maps an example key to an example value
pub trait ExampleResolver: Send + Sync {
    /// `None` leaves the property without an example
    fn resolve(&self, key: &str) -> Option<String>;
}

impl<F> ExampleResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve(&self, key: &str) -> Option<String> {
        self(key)
    }
}

impl ExampleResolver for HashMap<String, String> {
    fn resolve(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Load a JSON object of example keys to example values
pub fn load_examples<P: AsRef<Path>>(path: P) -> OpenApiResult<HashMap<String, String>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Key handed to the resolver for a property
pub fn example_key(schema_name: &str, field: &FieldDef) -> String {
    field
        .example_key
        .clone()
        .unwrap_or_else(|| format!("{}.{}", schema_name, field.name))
}

/// Example for a property: the field's literal example, else the resolver's
/// value for its key.
pub fn example_for(
    schema_name: &str,
    field: &FieldDef,
    schema: &Schema,
    resolver: Option<&dyn ExampleResolver>,
) -> Option<Value> {
    if let Some(literal) = &field.example {
        return Some(literal_value(literal, schema));
    }
    resolver
        .and_then(|r| r.resolve(&example_key(schema_name, field)))
        .map(Value::String)
}

/// Literal examples keep their JSON type for numeric and boolean properties
fn literal_value(literal: &str, schema: &Schema) -> Value {
    match schema.schema_type.as_deref() {
        Some("integer" | "number" | "boolean") => {
            serde_json::from_str(literal).unwrap_or_else(|_| Value::String(literal.to_string()))
        }
        _ => Value::String(literal.to_string()),
    }
}
