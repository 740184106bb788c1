//! JSON Schema for the configuration file.

use crate::config::TerrapaperConfig;

/// Location the published schema is served from.
pub const SCHEMA_ID: &str =
    "https://raw.githubusercontent.com/terrapaper/terrapaper/main/terrapaper.schema.json";

/// Generates the schema, including every option's description and default.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(TerrapaperConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(SCHEMA_ID));
    }

    schema
}

/// Pretty-printed schema.
#[must_use]
pub fn print_schema() -> String { serde_json::to_string_pretty(&generate_schema()).unwrap_or_default() }
