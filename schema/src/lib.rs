//! This is a Rust library with the schema model and runtime helpers for the
//! Minibuf text wire format. A record is encoded as `[<field count>]` followed
//! by one token per field, in declaration order, joined by `;`.
//!
//! ```
//! use minibuf_schema::*;
//!
//! let schema = Schema::new("Point", vec![
//!     Field::new("x", DataType::Number),
//!     Field::new("y", DataType::Number),
//! ])
//! .with_default("y", DefaultValue::Number(5));
//!
//! let values = Value::decode_record(&schema, "[2]3").unwrap();
//! assert_eq!(values, [Value::Number(3), Value::Number(5)]);
//! assert_eq!(
//!     Value::encode_record_to_string(&schema, &values, DEFAULT_FLOAT_PRECISION),
//!     "[2]3;5"
//! );
//! ```

pub mod schema;
pub mod value;
pub mod wire;

pub use schema::*;
pub use value::*;
pub use wire::*;

/// File extension every schema source must carry.
pub const FILE_EXTENSION: &str = "mb";

/// Config key controlling the number of fractional digits of `float` tokens.
pub const FLOAT_PRECISION_KEY: &str = "float_precision";
pub const DEFAULT_FLOAT_PRECISION: u32 = 3;
pub const MIN_FLOAT_PRECISION: u32 = 1;
pub const MAX_FLOAT_PRECISION: u32 = 9;
