use std::collections::HashMap;

use minibuf_schema::{
    ConfigValue, DataType, DefaultValue, SchemaSet, FLOAT_PRECISION_KEY, MAX_FLOAT_PRECISION,
    MIN_FLOAT_PRECISION,
};
use tracing::warn;

use crate::{
    error::MinibufError,
    gen_c::escape_c_keyword,
    gen_rust::escape_rust_keyword,
    gen_ts::escape_ts_type_name,
    utils::quote,
};

pub const KNOWN_CONFIG_KEYS: [&str; 1] = [FLOAT_PRECISION_KEY];

type Escape = fn(&str) -> String;

const FIELD_ESCAPES: [(&str, Escape); 2] = [("C", escape_c_keyword), ("Rust", escape_rust_keyword)];
const SCHEMA_ESCAPES: [(&str, Escape); 2] = [("Rust", escape_rust_keyword), ("TypeScript", escape_ts_type_name)];

fn verifier_error(msg: String) -> MinibufError {
    MinibufError::VerifierError(msg)
}

/// Finds two distinct names that the same target escapes to one identifier.
fn escaped_collision<'a>(
    names: impl Iterator<Item = &'a str> + Clone,
    escapes: &[(&'static str, Escape)],
) -> Option<(&'a str, &'a str, &'static str)> {
    for &(target, escape) in escapes {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for name in names.clone() {
            if let Some(previous) = seen.insert(escape(name), name) {
                if previous != name {
                    return Some((previous, name, target));
                }
            }
        }
    }
    None
}

/// Returns `Ok(())` if verification passed, or `Err(MinibufError::VerifierError(_))`
/// on the first violated invariant.
pub fn verify_schema(set: &SchemaSet) -> Result<(), MinibufError> {
    // 1) Schema names are unique, also after ASCII case folding since the C
    //    target lowercases them.
    let mut schema_names: HashMap<String, (&str, &str, usize)> = HashMap::new();
    for schema in &set.schemas {
        let key = schema.name.to_ascii_lowercase();
        if let Some((name, source, line)) = schema_names.get(&key) {
            let what = if *name == schema.name { "duplicate schema name" } else { "schema names collide" };
            return Err(verifier_error(format!(
                "{} {} ({}:{} and {}:{})",
                what,
                if *name == schema.name { quote(name) } else { format!("{} and {}", quote(name), quote(&schema.name)) },
                source,
                line,
                schema.source,
                schema.line
            )));
        }
        schema_names.insert(key, (schema.name.as_str(), schema.source.as_str(), schema.line));
    }
    if let Some((first, second, target)) =
        escaped_collision(set.schemas.iter().map(|schema| schema.name.as_str()), &SCHEMA_ESCAPES)
    {
        return Err(verifier_error(format!(
            "schema names {} and {} collide in {} output",
            quote(first),
            quote(second),
            target
        )));
    }

    for schema in &set.schemas {
        // 2) Field names are unique within a schema
        let mut field_names: HashMap<&str, usize> = HashMap::new();
        for field in &schema.fields {
            if let Some(line) = field_names.get(field.name.as_str()) {
                return Err(verifier_error(format!(
                    "duplicate field name {} in schema {} (lines {} and {})",
                    quote(&field.name),
                    quote(&schema.name),
                    line,
                    field.line
                )));
            }
            field_names.insert(field.name.as_str(), field.line);
        }
        if let Some((first, second, target)) =
            escaped_collision(schema.fields.iter().map(|field| field.name.as_str()), &FIELD_ESCAPES)
        {
            return Err(verifier_error(format!(
                "field names {} and {} in schema {} collide in {} output",
                quote(first),
                quote(second),
                quote(&schema.name),
                target
            )));
        }

        // 3) Defaults name a declared field and match its type
        for (name, value) in &schema.defaults {
            let field = schema.field(name).ok_or_else(|| {
                verifier_error(format!(
                    "default for unknown field {} in schema {}",
                    quote(name),
                    quote(&schema.name)
                ))
            })?;
            if value.data_type() != field.data_type {
                return Err(verifier_error(format!(
                    "default {} for field {} in schema {} is not a {}",
                    value,
                    quote(name),
                    quote(&schema.name),
                    field.data_type
                )));
            }
            if let DefaultValue::Number(number) = value {
                if i32::try_from(*number).is_err() {
                    return Err(verifier_error(format!(
                        "default {} for field {} in schema {} does not fit a 32-bit {}",
                        number,
                        quote(name),
                        quote(&schema.name),
                        DataType::Number
                    )));
                }
            }
        }
    }

    // 4) Global config
    if let Some(value) = set.config.get(FLOAT_PRECISION_KEY) {
        let valid = value
            .as_integer()
            .map(|p| (MIN_FLOAT_PRECISION as i64..=MAX_FLOAT_PRECISION as i64).contains(&p))
            .unwrap_or(false);
        if !valid {
            let shown = match value {
                ConfigValue::Text(text) => quote(text),
                other => other.to_string(),
            };
            return Err(verifier_error(format!(
                "{} must be an integer between {} and {}, found {}",
                FLOAT_PRECISION_KEY, MIN_FLOAT_PRECISION, MAX_FLOAT_PRECISION, shown
            )));
        }
    }
    for (key, value) in set.config.iter() {
        if !KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
            warn!(key = %key, value = %value, "Ignoring unknown config key");
        }
    }

    Ok(())
}
