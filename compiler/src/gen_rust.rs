use minibuf_schema::{DataType, DefaultValue, Field, Schema, SchemaSet};
use tracing::debug;

use crate::traits::{Emitter, GeneratedCode, Target};

const BANNER: &str = "// Generated by minibufc. Do not edit.";

const WIRE: &str = "::minibuf::wire";

/// Emits `minibuf_types.rs` and `minibuf.rs`.
///
/// Both files are meant to be pulled in with `include!`, each inside its own
/// module, so neither carries inner attributes. `types_module` is the path the
/// codec file imports the types from.
#[derive(Debug, Clone)]
pub struct RustEmitter {
    pub types_module: String,
}

impl Default for RustEmitter {
    fn default() -> RustEmitter {
        RustEmitter { types_module: "super::minibuf_types".to_string() }
    }
}

impl Emitter for RustEmitter {
    fn target(&self) -> Target {
        Target::Rust
    }

    fn file_names(&self) -> (&'static str, &'static str) {
        ("minibuf_types.rs", "minibuf.rs")
    }

    fn emit(&self, set: &SchemaSet) -> GeneratedCode {
        debug!(schemas = set.schemas.len(), "Emitting Rust");
        GeneratedCode {
            interface:      generate_types(set),
            implementation: self.generate_codec(set),
        }
    }
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
pub(crate) fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn",
        "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
        "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
        "self", "Self", "static", "struct", "super", "trait", "true", "try",
        "type", "unsafe", "use", "where", "while",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// Maps schema types to Rust types. Paths are absolute so a schema named
/// `String` cannot shadow the standard type.
fn map_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Bool => "bool",
        DataType::Number => "i32",
        DataType::Float => "f64",
        DataType::String => "::std::string::String",
    }
}

fn default_expr(schema: &Schema, field: &Field) -> String {
    match schema.default_for(&field.name) {
        Some(DefaultValue::Bool(value)) => value.to_string(),
        Some(DefaultValue::Number(value)) => value.to_string(),
        Some(DefaultValue::Float(value)) => format!("{:?}", value),
        Some(DefaultValue::String(value)) => format!("::std::string::String::from({:?})", value),
        None => match field.data_type {
            DataType::Bool => "false".to_string(),
            DataType::Number => "0".to_string(),
            DataType::Float => "0.0".to_string(),
            DataType::String => "::std::string::String::new()".to_string(),
        },
    }
}

/// Generates the struct definitions, one per schema, plus the precision
/// constant the codec formats floats with.
pub fn generate_types(set: &SchemaSet) -> String {
    let mut rust_code: Vec<String> = Vec::new();

    rust_code.push(BANNER.to_string());
    rust_code.push("".to_string());
    rust_code.push(format!("pub const FLOAT_PRECISION: u32 = {};", set.float_precision()));

    for schema in &set.schemas {
        let mut fields = Vec::new();
        for field in &schema.fields {
            fields.push(format!(
                "    pub {}: {},",
                escape_rust_keyword(&field.name),
                map_type(field.data_type)
            ));
        }

        rust_code.push("".to_string());
        rust_code.push(format!("/// {} ({}:{})", schema.name, schema.source, schema.line));
        rust_code.push("#[allow(non_camel_case_types, non_snake_case)]".to_string());
        rust_code.push("#[derive(Debug, Clone, PartialEq)]".to_string());
        if fields.is_empty() {
            rust_code.push(format!("pub struct {} {{}}", escape_rust_keyword(&schema.name)));
        } else {
            rust_code.push(format!(
                "pub struct {} {{\n{}\n}}",
                escape_rust_keyword(&schema.name),
                fields.join("\n")
            ));
        }
    }
    rust_code.push("".to_string());

    rust_code.join("\n")
}

impl RustEmitter {
    pub fn generate_codec(&self, set: &SchemaSet) -> String {
        let mut rust_code: Vec<String> = Vec::new();

        rust_code.push(BANNER.to_string());
        rust_code.push(format!("#[allow(unused_imports)]\nuse {}::*;", self.types_module));

        for schema in &set.schemas {
            rust_code.push("".to_string());
            rust_code.push(generate_default(schema));
            rust_code.push("".to_string());
            rust_code.push(generate_impl(schema));
        }
        rust_code.push("".to_string());

        rust_code.join("\n")
    }
}

fn generate_default(schema: &Schema) -> String {
    let struct_name = escape_rust_keyword(&schema.name);
    let mut impl_lines = Vec::new();

    impl_lines.push(format!("impl ::core::default::Default for {} {{", struct_name));
    impl_lines.push(format!("    fn default() -> {} {{", struct_name));
    if schema.fields.is_empty() {
        impl_lines.push(format!("        {} {{}}", struct_name));
    } else {
        impl_lines.push(format!("        {} {{", struct_name));
        for field in &schema.fields {
            impl_lines.push(format!(
                "            {}: {},",
                escape_rust_keyword(&field.name),
                default_expr(schema, field)
            ));
        }
        impl_lines.push("        }".to_string());
    }
    impl_lines.push("    }".to_string());
    impl_lines.push("}".to_string());

    impl_lines.join("\n")
}

fn generate_impl(schema: &Schema) -> String {
    let struct_name = escape_rust_keyword(&schema.name);
    let result = |ok: &str| format!("::core::result::Result<{}, {}::WireError>", ok, WIRE);
    let mut impl_lines = Vec::new();

    impl_lines.push(format!("impl {} {{", struct_name));
    impl_lines.push(format!("    pub const FIELD_COUNT: usize = {};", schema.fields.len()));
    impl_lines.push("".to_string());

    // parse
    impl_lines.push("    /// Decodes one record. Fields without a token keep their default.".to_string());
    impl_lines.push(format!("    pub fn parse(buf: &str) -> {} {{", result(&struct_name)));
    if schema.fields.is_empty() {
        impl_lines.push(format!("        {}::Frame::parse(buf)?;", WIRE));
        impl_lines.push(format!("        ::core::result::Result::Ok({} {{}})", struct_name));
    } else {
        impl_lines.push(format!("        let frame = {}::Frame::parse(buf)?;", WIRE));
        impl_lines.push(format!("        let mut value = <{} as ::core::default::Default>::default();", struct_name));
        impl_lines.push("        let mut tokens = frame.tokens();".to_string());
        for field in &schema.fields {
            let decoded = match field.data_type {
                DataType::Bool => format!("{}::decode_bool(token)", WIRE),
                DataType::Number => format!("{}::decode_number(token)", WIRE),
                DataType::Float => format!("{}::decode_float(token)", WIRE),
                DataType::String => "::std::string::String::from(token)".to_string(),
            };
            impl_lines.push("        if let ::core::option::Option::Some(token) = tokens.next() {".to_string());
            impl_lines.push(format!("            value.{} = {};", escape_rust_keyword(&field.name), decoded));
            impl_lines.push("        }".to_string());
        }
        impl_lines.push("        ::core::result::Result::Ok(value)".to_string());
    }
    impl_lines.push("    }".to_string());
    impl_lines.push("".to_string());

    // serialize
    impl_lines.push("    /// Encodes into `buf` and returns the number of bytes written.".to_string());
    impl_lines.push(format!("    pub fn serialize(&self, buf: &mut [u8]) -> {} {{", result("usize")));
    impl_lines.push(format!("        let mut writer = {}::WireWriter::new(buf);", WIRE));
    impl_lines.push("        self.write_to(&mut writer)?;".to_string());
    impl_lines.push("        ::core::result::Result::Ok(writer.len())".to_string());
    impl_lines.push("    }".to_string());
    impl_lines.push("".to_string());

    impl_lines.push("    pub fn to_wire(&self) -> ::std::string::String {".to_string());
    impl_lines.push(format!("        let mut writer = {}::WireWriter::growable();", WIRE));
    impl_lines.push("        // A growable writer never reports BufferTooSmall.".to_string());
    impl_lines.push("        let _ = self.write_to(&mut writer);".to_string());
    impl_lines.push("        writer.into_string()".to_string());
    impl_lines.push("    }".to_string());
    impl_lines.push("".to_string());

    impl_lines.push(format!(
        "    fn write_to(&self, writer: &mut {}::WireWriter<'_>) -> {} {{",
        WIRE,
        result("()")
    ));
    impl_lines.push(format!("        writer.write_header({}::FIELD_COUNT)?;", struct_name));
    for (index, field) in schema.fields.iter().enumerate() {
        if index > 0 {
            impl_lines.push("        writer.write_separator()?;".to_string());
        }
        let name = escape_rust_keyword(&field.name);
        impl_lines.push(match field.data_type {
            DataType::Bool => format!("        writer.write_bool(self.{})?;", name),
            DataType::Number => format!("        writer.write_number(self.{})?;", name),
            DataType::Float => format!("        writer.write_float(self.{}, FLOAT_PRECISION)?;", name),
            DataType::String => format!("        writer.write_string(&self.{})?;", name),
        });
    }
    impl_lines.push("        ::core::result::Result::Ok(())".to_string());
    impl_lines.push("    }".to_string());
    impl_lines.push("}".to_string());

    impl_lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn point() -> Schema {
        Schema::new("Point", vec![
            Field::new("x", DataType::Number),
            Field::new("y", DataType::Number),
        ])
        .with_default("y", DefaultValue::Number(5))
    }

    #[test]
    fn test_escape_rust_keyword() {
        assert_eq!(escape_rust_keyword("type"), "type_");
        assert_eq!(escape_rust_keyword("async"), "async_");
        assert_eq!(escape_rust_keyword("name"), "name");
    }

    #[test]
    fn test_generate_types() {
        let mut set = SchemaSet::default();
        set.schemas.push(point());
        let expected = "// Generated by minibufc. Do not edit.

pub const FLOAT_PRECISION: u32 = 3;

/// Point (:0)
#[allow(non_camel_case_types, non_snake_case)]
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}
";
        assert_eq!(generate_types(&set), expected);
    }

    #[test]
    fn test_generate_default() {
        let schema = point()
            .with_default("y", DefaultValue::Number(-7));
        let expected = "impl ::core::default::Default for Point {
    fn default() -> Point {
        Point {
            x: 0,
            y: -7,
        }
    }
}";
        assert_eq!(generate_default(&schema), expected);
    }

    #[test]
    fn test_generate_impl() {
        let generated = generate_impl(&point());
        assert!(generated.contains("    pub const FIELD_COUNT: usize = 2;\n"));
        assert!(generated.contains(
            "        if let ::core::option::Option::Some(token) = tokens.next() {\n            value.y = ::minibuf::wire::decode_number(token);\n        }\n"
        ));
        assert!(generated.contains(
            "        writer.write_number(self.x)?;\n        writer.write_separator()?;\n        writer.write_number(self.y)?;\n"
        ));
    }

    #[test]
    fn test_string_and_float_fields() {
        let schema = Schema::new("User", vec![
            Field::new("type", DataType::String),
            Field::new("score", DataType::Float),
        ])
        .with_default("type", DefaultValue::String("a \"b\"".into()))
        .with_default("score", DefaultValue::Float(2.0));
        let default = generate_default(&schema);
        assert!(default.contains("            type_: ::std::string::String::from(\"a \\\"b\\\"\"),\n"));
        assert!(default.contains("            score: 2.0,\n"));

        let generated = generate_impl(&schema);
        assert!(generated.contains("value.type_ = ::std::string::String::from(token);"));
        assert!(generated.contains("writer.write_float(self.score, FLOAT_PRECISION)?;"));
    }

    #[test]
    fn test_codec_imports_types_module() {
        let emitter = RustEmitter { types_module: "crate::types".to_string() };
        let codec = emitter.generate_codec(&SchemaSet::default());
        assert!(codec.contains("use crate::types::*;"));
        assert!(!codec.contains("#!["));
    }

    #[test]
    fn test_empty_schema() {
        let schema = Schema::new("Ping", vec![]);
        let generated = generate_impl(&schema);
        assert!(generated.contains("        ::core::result::Result::Ok(Ping {})"));
        assert!(generate_default(&schema).contains("        Ping {}"));
    }
}
