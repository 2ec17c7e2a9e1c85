use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::{DEFAULT_FLOAT_PRECISION, FLOAT_PRECISION_KEY, MAX_FLOAT_PRECISION, MIN_FLOAT_PRECISION};

/// The four scalar types a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Number,
    Float,
    String,
}

impl DataType {
    pub const ALL: [DataType; 4] = [DataType::Bool, DataType::Number, DataType::Float, DataType::String];

    /// Looks up a type by the name used in schema sources.
    pub fn from_name(name: &str) -> Option<DataType> {
        DataType::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Number => "number",
            DataType::Float => "float",
            DataType::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed default attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Number(i64),
    Float(f64),
    String(String),
}

impl DefaultValue {
    pub fn data_type(&self) -> DataType {
        match self {
            DefaultValue::Bool(_) => DataType::Bool,
            DefaultValue::Number(_) => DataType::Number,
            DefaultValue::Float(_) => DataType::Float,
            DefaultValue::String(_) => DataType::String,
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DefaultValue::Bool(value) => value.fmt(f),
            DefaultValue::Number(value) => value.fmt(f),
            DefaultValue::Float(value) => write!(f, "{:?}", value),
            DefaultValue::String(value) => write!(f, "{:?}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:      String,
    pub data_type: DataType,
    pub line:      usize,
    pub column:    usize,
}

impl Field {
    /// Creates a field with no source location, mostly useful in tests and
    /// when building schemas by hand.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Field {
        Field {
            name: name.into(),
            data_type,
            line: 0,
            column: 0,
        }
    }
}

/// A named record type. Field order is the positional order on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub name:     String,
    pub source:   String,
    pub line:     usize,
    pub column:   usize,
    pub fields:   Vec<Field>,
    pub defaults: BTreeMap<String, DefaultValue>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Schema {
        Schema {
            name: name.into(),
            source: String::new(),
            line: 0,
            column: 0,
            fields,
            defaults: BTreeMap::new(),
        }
    }

    pub fn with_default(mut self, field: impl Into<String>, value: DefaultValue) -> Schema {
        self.defaults.insert(field.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn default_for(&self, field: &str) -> Option<&DefaultValue> {
        self.defaults.get(field)
    }
}

/// A top-level `key = value` assignment, typed by trying integer, then
/// float, then falling back to text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ConfigValue {
    pub fn parse(text: &str) -> ConfigValue {
        if let Ok(value) = text.parse::<i64>() {
            ConfigValue::Int(value)
        } else if let Ok(value) = text.parse::<f64>() {
            ConfigValue::Float(value)
        } else {
            ConfigValue::Text(text.to_string())
        }
    }

    /// Returns the value as a whole number if it is an integer or an integral
    /// float.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            ConfigValue::Int(value) => Some(value),
            ConfigValue::Float(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                Some(value as i64)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigValue::Int(value) => value.fmt(f),
            ConfigValue::Float(value) => value.fmt(f),
            ConfigValue::Text(value) => value.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GlobalConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl GlobalConfig {
    pub fn new() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// Later assignments to the same key win.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.values.iter()
    }

    /// The configured precision, or the default when unset or out of range.
    /// The verifier rejects out-of-range values before emission.
    pub fn float_precision(&self) -> u32 {
        self.get(FLOAT_PRECISION_KEY)
            .and_then(ConfigValue::as_integer)
            .filter(|p| (MIN_FLOAT_PRECISION as i64..=MAX_FLOAT_PRECISION as i64).contains(p))
            .map(|p| p as u32)
            .unwrap_or(DEFAULT_FLOAT_PRECISION)
    }
}

/// Everything one compilation run produced: schemas in source order and the
/// global configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaSet {
    pub schemas: Vec<Schema>,
    pub config:  GlobalConfig,
}

impl SchemaSet {
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    pub fn float_precision(&self) -> u32 {
        self.config.float_precision()
    }
}
