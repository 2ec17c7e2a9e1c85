use crate::{
    schema::{DataType, DefaultValue, Field, Schema},
    wire::{decode_bool, decode_float, decode_number, Frame, WireError, WireWriter},
};

use std::fmt;

use serde::Serialize;

/// This type holds one dynamically typed field value.
///
/// A record is a `Vec<Value>` in field order. Decoding and encoding follow the
/// same rules as generated code, so this is the reference implementation the
/// other targets are checked against.
#[derive(Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(i32),
    Float(f64),
    String(String),
}

impl Value {
    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// A convenience method to extract the value out of a [Number](#variant.Number).
    /// Returns `0` for other value kinds.
    pub fn as_number(&self) -> i32 {
        match *self {
            Value::Number(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Float](#variant.Float).
    /// Returns `0.0` for other value kinds.
    pub fn as_float(&self) -> f64 {
        match *self {
            Value::Float(value) => value,
            _ => 0.0,
        }
    }

    /// A convenience method to extract the value out of a [String](#variant.String).
    /// Returns `""` for other value kinds.
    pub fn as_string(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            _ => "",
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Number(_) => DataType::Number,
            Value::Float(_) => DataType::Float,
            Value::String(_) => DataType::String,
        }
    }

    /// The type-zero value: `false`, `0`, `0.0` or `""`.
    pub fn zero(data_type: DataType) -> Value {
        match data_type {
            DataType::Bool => Value::Bool(false),
            DataType::Number => Value::Number(0),
            DataType::Float => Value::Float(0.0),
            DataType::String => Value::String(String::new()),
        }
    }

    /// The value a decoder starts from: the declared default if there is one,
    /// the type-zero value otherwise.
    pub fn default_for(schema: &Schema, field: &Field) -> Value {
        match schema.default_for(&field.name) {
            Some(DefaultValue::Bool(value)) => Value::Bool(*value),
            Some(DefaultValue::Number(value)) => Value::Number(*value as i32),
            Some(DefaultValue::Float(value)) => Value::Float(*value),
            Some(DefaultValue::String(value)) => Value::String(value.clone()),
            None => Value::zero(field.data_type),
        }
    }

    pub fn decode_token(data_type: DataType, token: &str) -> Value {
        match data_type {
            DataType::Bool => Value::Bool(decode_bool(token)),
            DataType::Number => Value::Number(decode_number(token)),
            DataType::Float => Value::Float(decode_float(token)),
            DataType::String => Value::String(token.to_string()),
        }
    }

    /// Decodes one record. Missing trailing tokens leave defaults in place and
    /// extra tokens are ignored.
    pub fn decode_record(schema: &Schema, input: &str) -> Result<Vec<Value>, WireError> {
        let frame = Frame::parse(input)?;
        let mut values: Vec<Value> = schema
            .fields
            .iter()
            .map(|field| Value::default_for(schema, field))
            .collect();
        for (value, (field, token)) in values.iter_mut().zip(schema.fields.iter().zip(frame.tokens())) {
            *value = Value::decode_token(field.data_type, token);
        }
        Ok(values)
    }

    /// Encodes the current value as a single token.
    pub fn encode_token(&self, writer: &mut WireWriter, precision: u32) -> Result<(), WireError> {
        match *self {
            Value::Bool(value) => writer.write_bool(value),
            Value::Number(value) => writer.write_number(value),
            Value::Float(value) => writer.write_float(value, precision),
            Value::String(ref value) => writer.write_string(value),
        }
    }

    /// Encodes `values` as one record of `schema`. A value missing at the end
    /// of `values` is encoded as that field's default.
    pub fn write_record(
        schema: &Schema,
        values: &[Value],
        writer: &mut WireWriter,
        precision: u32,
    ) -> Result<(), WireError> {
        writer.write_header(schema.fields.len())?;
        for (index, field) in schema.fields.iter().enumerate() {
            if index > 0 {
                writer.write_separator()?;
            }
            match values.get(index) {
                Some(value) => value.encode_token(writer, precision)?,
                None => Value::default_for(schema, field).encode_token(writer, precision)?,
            }
        }
        Ok(())
    }

    /// Encodes into `buf` and returns the number of bytes written.
    pub fn encode_record(
        schema: &Schema,
        values: &[Value],
        buf: &mut [u8],
        precision: u32,
    ) -> Result<usize, WireError> {
        let mut writer = WireWriter::new(buf);
        Value::write_record(schema, values, &mut writer, precision)?;
        Ok(writer.len())
    }

    pub fn encode_record_to_string(schema: &Schema, values: &[Value], precision: u32) -> String {
        let mut writer = WireWriter::growable();
        // A growable writer never reports BufferTooSmall.
        let _ = Value::write_record(schema, values, &mut writer, precision);
        writer.into_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::Number(value) => value.fmt(f),
            Value::Float(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
        }
    }
}
