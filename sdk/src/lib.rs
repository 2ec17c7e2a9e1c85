//! minibuf
//!
//! This crate provides runtime support for working with Minibuf-encoded data.
//!
//! - `wire`, the module generated Rust code calls into
//! - A dynamic codec converting records to and from JSON for any compiled schema
//!
//! ```
//! let set = minibuf::compile_schema("Point {\n  x: number\n  y: number = 5\n}\n").unwrap();
//! let json = minibuf::decode_to_json(&set, "Point", "[2]3").unwrap();
//! assert_eq!(json, serde_json::json!({ "x": 3, "y": 5 }));
//! assert_eq!(minibuf::encode_from_json(&set, "Point", &json).unwrap(), "[2]3;5");
//! ```

pub use minibuf_compiler::{compile_files, compile_schema, MinibufError};
pub use minibuf_schema::{wire, DataType, Field, Schema, SchemaSet, Value, WireError};

use serde_json::{Map, Value as Json};

pub mod error {
    pub use minibuf_compiler::error::MinibufError;
    pub use minibuf_schema::WireError;
}

pub mod schema {
    pub use minibuf_schema::{DataType, DefaultValue, Field, Schema, SchemaSet, Value};
}

fn find_schema<'a>(set: &'a SchemaSet, name: &str) -> Result<&'a Schema, MinibufError> {
    set.get(name).ok_or_else(|| MinibufError::UnknownSchema(name.to_string()))
}

/// Decode one record of `schema_name` into a JSON object keyed by field name.
pub fn decode_to_json(set: &SchemaSet, schema_name: &str, input: &str) -> Result<Json, MinibufError> {
    let schema = find_schema(set, schema_name)?;
    let values = Value::decode_record(schema, input)?;
    let mut object = Map::new();
    for (field, value) in schema.fields.iter().zip(values) {
        object.insert(field.name.clone(), serde_json::to_value(value)?);
    }
    Ok(Json::Object(object))
}

fn value_from_json(field: &Field, json: &Json) -> Option<Value> {
    match field.data_type {
        DataType::Bool => json.as_bool().map(Value::Bool),
        DataType::Number => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Number),
        DataType::Float => json.as_f64().map(Value::Float),
        DataType::String => json.as_str().map(|s| Value::String(s.to_string())),
    }
}

/// Encode a JSON object as one record of `schema_name`. Missing fields take
/// their default; keys that name no field are rejected.
pub fn encode_from_json(set: &SchemaSet, schema_name: &str, json: &Json) -> Result<String, MinibufError> {
    let schema = find_schema(set, schema_name)?;
    let object = json.as_object().ok_or_else(|| {
        MinibufError::InvalidValue(format!("expected a JSON object for schema \"{}\"", schema.name))
    })?;

    if let Some(key) = object.keys().find(|key| schema.field(key).is_none()) {
        return Err(MinibufError::InvalidValue(format!(
            "schema \"{}\" has no field \"{}\"",
            schema.name, key
        )));
    }

    let mut values = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let value = match object.get(&field.name) {
            Some(json) => value_from_json(field, json).ok_or_else(|| {
                MinibufError::InvalidValue(format!(
                    "field \"{}\" expects a {}, found {}",
                    field.name, field.data_type, json
                ))
            })?,
            None => Value::default_for(schema, field),
        };
        values.push(value);
    }

    Ok(Value::encode_record_to_string(schema, &values, set.float_precision()))
}
