use std::collections::BTreeSet;

use minibuf_schema::{DataType, DefaultValue, Field, Schema, SchemaSet};
use tracing::debug;

use crate::{
    traits::{Emitter, GeneratedCode, Target},
    utils::{header, quote},
};

const BANNER: &str = "// Generated by minibufc. Do not edit.";

/// Emits `minibuf.types.ts` and `minibuf.ts`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsEmitter;

impl Emitter for TsEmitter {
    fn target(&self) -> Target {
        Target::TypeScript
    }

    fn file_names(&self) -> (&'static str, &'static str) {
        ("minibuf.types.ts", "minibuf.ts")
    }

    fn emit(&self, set: &SchemaSet) -> GeneratedCode {
        debug!(schemas = set.schemas.len(), "Emitting TypeScript");
        GeneratedCode {
            interface:      generate_types(set),
            implementation: generate_codec(set),
        }
    }
}

/// Names that cannot be used for an interface get an underscore suffix. This
/// covers keywords, primitive types and the names the generated files export.
pub(crate) fn escape_ts_type_name(s: &str) -> String {
    let reserved = [
        "any", "boolean", "break", "case", "catch", "class", "const", "continue",
        "debugger", "default", "delete", "do", "else", "enum", "export", "extends",
        "false", "finally", "for", "function", "if", "implements", "import", "in",
        "instanceof", "interface", "let", "never", "new", "null", "number", "object",
        "package", "private", "protected", "public", "return", "static", "string",
        "super", "switch", "symbol", "this", "throw", "true", "try", "typeof",
        "undefined", "unknown", "var", "void", "while", "with", "yield",
        "ErrorCode", "ParseResult", "SerializeResult", "MbWriter",
    ];
    if reserved.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

fn map_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Bool => "boolean",
        DataType::Number | DataType::Float => "number",
        DataType::String => "string",
    }
}

fn initial_value(schema: &Schema, field: &Field) -> String {
    match schema.default_for(&field.name) {
        Some(DefaultValue::Bool(value)) => value.to_string(),
        Some(DefaultValue::Number(value)) => value.to_string(),
        Some(DefaultValue::Float(value)) => format!("{:?}", value),
        Some(DefaultValue::String(value)) => quote(value),
        None => match field.data_type {
            DataType::Bool => "false".to_string(),
            DataType::Number => "0".to_string(),
            DataType::Float => "0.0".to_string(),
            DataType::String => "\"\"".to_string(),
        },
    }
}

pub fn generate_types(set: &SchemaSet) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(BANNER.to_string());
    lines.push("".to_string());
    lines.push(format!("export const FLOAT_PRECISION = {};", set.float_precision()));
    lines.push("".to_string());
    lines.push("export const ErrorCode = {".to_string());
    lines.push("  OK: 0,".to_string());
    lines.push("  INVALID_FORMAT: 1,".to_string());
    lines.push("  BUFFER_TOO_SMALL: 2,".to_string());
    lines.push("} as const;".to_string());
    lines.push("".to_string());
    lines.push("export type ErrorCode = (typeof ErrorCode)[keyof typeof ErrorCode];".to_string());
    lines.push("".to_string());
    lines.push("/** `value` is null when `code` is not `ErrorCode.OK`. */".to_string());
    lines.push("export interface ParseResult<T> {".to_string());
    lines.push("  code: ErrorCode;".to_string());
    lines.push("  value: T | null;".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());
    lines.push("/** `bytesWritten` counts UTF-8 bytes of `text`. */".to_string());
    lines.push("export interface SerializeResult {".to_string());
    lines.push("  code: ErrorCode;".to_string());
    lines.push("  text: string;".to_string());
    lines.push("  bytesWritten: number;".to_string());
    lines.push("}".to_string());

    for schema in &set.schemas {
        lines.push("".to_string());
        lines.push(format!("/** {} ({}:{}) */", schema.name, schema.source, schema.line));
        lines.push(format!("export interface {} {{", escape_ts_type_name(&schema.name)));
        for field in &schema.fields {
            lines.push(format!("  {}: {};", field.name, map_type(field.data_type)));
        }
        lines.push("}".to_string());
    }
    lines.push("".to_string());

    lines.join("\n")
}

const FRAME_HELPERS: &str = r#"const encoder = new TextEncoder();

/** Tokens after the `]` that closes the first `[`, or null without one. */
function mbSplitFrame(buf: string): string[] | null {
  const open = buf.indexOf("[");
  if (open < 0) return null;
  const close = buf.indexOf("]", open + 1);
  if (close < 0) return null;
  const body = buf.slice(close + 1);
  return body.length === 0 ? [] : body.split(";");
}

class MbWriter {
  private readonly capacity: number;
  private parts: string[] = [];
  length = 0;

  constructor(capacity: number) {
    this.capacity = capacity;
  }

  write(text: string): boolean {
    const n = encoder.encode(text).length;
    if (this.length + n > this.capacity) return false;
    this.parts.push(text);
    this.length += n;
    return true;
  }

  text(): string {
    return this.parts.join("");
  }
}

function mbTooSmall(): SerializeResult {
  return { code: ErrorCode.BUFFER_TOO_SMALL, text: "", bytesWritten: 0 };
}
"#;

const BOOL_HELPERS: &str = r#"function mbDecodeBool(token: string): boolean {
  return token === "T";
}
"#;

const NUMBER_HELPERS: &str = r#"/** Leading [+-]?digits like atoi; overflow wraps to 32 bits. */
function mbDecodeNumber(token: string): number {
  const text = token.trimStart();
  let i = 0;
  let negative = false;
  if (text[0] === "+" || text[0] === "-") {
    negative = text[0] === "-";
    i = 1;
  }
  let value = 0;
  for (; i < text.length; i++) {
    const digit = text.charCodeAt(i) - 48;
    if (digit < 0 || digit > 9) break;
    value = (Math.imul(value, 10) + digit) | 0;
  }
  return negative ? -value | 0 : value;
}
"#;

const FLOAT_HELPERS: &str = r#"const FLOAT_PREFIX = /^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?/;

function mbDecodeFloat(token: string): number {
  const match = FLOAT_PREFIX.exec(token.trimStart());
  return match ? Number(match[0]) : 0;
}

/** BigInt prints every digit of the integer part, never exponent notation. */
function mbFormatFixed(value: number): string {
  const magnitude = Math.abs(value);
  let whole = Math.trunc(magnitude);
  let fraction = Math.floor((magnitude - whole) * FLOAT_SCALE + 0.5);
  if (fraction >= FLOAT_SCALE) {
    whole += 1;
    fraction -= FLOAT_SCALE;
  }
  const sign = value < 0 ? "-" : "";
  const digits = Number.isFinite(whole) ? BigInt(whole).toString() : String(whole);
  return `${sign}${digits}.${String(fraction).padStart(FLOAT_PRECISION, "0")}`;
}
"#;

pub fn generate_codec(set: &SchemaSet) -> String {
    let mut lines: Vec<String> = Vec::new();
    let used: BTreeSet<DataType> = set
        .schemas
        .iter()
        .flat_map(|schema| schema.fields.iter().map(|field| field.data_type))
        .collect();

    let mut type_imports = vec!["ParseResult".to_string(), "SerializeResult".to_string()];
    type_imports.extend(set.schemas.iter().map(|schema| escape_ts_type_name(&schema.name)));

    lines.push(BANNER.to_string());
    lines.push("import { ErrorCode, FLOAT_PRECISION } from \"./minibuf.types\";".to_string());
    lines.push(format!(
        "import type {{ {} }} from \"./minibuf.types\";",
        type_imports.join(", ")
    ));
    lines.push("".to_string());
    lines.push("export * from \"./minibuf.types\";".to_string());
    lines.push("".to_string());
    lines.push(format!("const FLOAT_SCALE = {};", 10i64.pow(set.float_precision())));
    lines.push("".to_string());

    lines.push(FRAME_HELPERS.to_string());
    for (data_type, helpers) in [
        (DataType::Bool, BOOL_HELPERS),
        (DataType::Number, NUMBER_HELPERS),
        (DataType::Float, FLOAT_HELPERS),
    ] {
        if used.contains(&data_type) {
            lines.push(helpers.to_string());
        }
    }

    for schema in &set.schemas {
        lines.push(generate_parse(schema));
        lines.push(generate_serialize(schema));
    }

    lines.join("\n")
}

fn generate_parse(schema: &Schema) -> String {
    let type_name = escape_ts_type_name(&schema.name);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "export function {}Parse(buf: string): ParseResult<{}> {{",
        schema.name, type_name
    ));
    lines.push("  const tokens = mbSplitFrame(buf);".to_string());
    lines.push("  if (tokens === null) {".to_string());
    lines.push("    return { code: ErrorCode.INVALID_FORMAT, value: null };".to_string());
    lines.push("  }".to_string());
    if schema.fields.is_empty() {
        lines.push(format!("  const value: {} = {{}};", type_name));
    } else {
        lines.push(format!("  const value: {} = {{", type_name));
        for field in &schema.fields {
            lines.push(format!("    {}: {},", field.name, initial_value(schema, field)));
        }
        lines.push("  };".to_string());
    }
    for (index, field) in schema.fields.iter().enumerate() {
        let decoded = match field.data_type {
            DataType::Bool => format!("mbDecodeBool(tokens[{}])", index),
            DataType::Number => format!("mbDecodeNumber(tokens[{}])", index),
            DataType::Float => format!("mbDecodeFloat(tokens[{}])", index),
            DataType::String => format!("tokens[{}]", index),
        };
        lines.push(format!(
            "  if (tokens.length > {}) value.{} = {};",
            index, field.name, decoded
        ));
    }
    lines.push("  return { code: ErrorCode.OK, value };".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.join("\n")
}

fn generate_serialize(schema: &Schema) -> String {
    let type_name = escape_ts_type_name(&schema.name);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "export function {}Serialize(value: {}, capacity: number = Number.MAX_SAFE_INTEGER): SerializeResult {{",
        schema.name, type_name
    ));
    lines.push("  const w = new MbWriter(capacity);".to_string());
    if schema.fields.is_empty() {
        lines.push("  void value;".to_string());
    }
    lines.push(format!("  if (!w.write({})) return mbTooSmall();", quote(&header(schema.fields.len()))));
    for (index, field) in schema.fields.iter().enumerate() {
        if index > 0 {
            lines.push("  if (!w.write(\";\")) return mbTooSmall();".to_string());
        }
        let encoded = match field.data_type {
            DataType::Bool => format!("value.{} ? \"T\" : \"F\"", field.name),
            DataType::Number => format!("String(value.{} | 0)", field.name),
            DataType::Float => format!("mbFormatFixed(value.{})", field.name),
            DataType::String => format!("value.{}", field.name),
        };
        lines.push(format!("  if (!w.write({})) return mbTooSmall();", encoded));
    }
    lines.push("  return { code: ErrorCode.OK, text: w.text(), bytesWritten: w.length };".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn point() -> SchemaSet {
        let mut set = SchemaSet::default();
        let mut schema = Schema::new("Point", vec![
            Field::new("x", DataType::Number),
            Field::new("y", DataType::Number),
        ])
        .with_default("y", DefaultValue::Number(5));
        schema.source = "point.mb".to_string();
        schema.line = 1;
        set.schemas.push(schema);
        set
    }

    #[test]
    fn types_file() {
        let types = generate_types(&point());
        assert!(types.starts_with(BANNER));
        assert!(types.contains("export const FLOAT_PRECISION = 3;\n"));
        assert!(types.ends_with(
            "/** Point (point.mb:1) */\nexport interface Point {\n  x: number;\n  y: number;\n}\n"
        ));
    }

    #[test]
    fn parse_function() {
        let codec = generate_codec(&point());
        let expected = r#"export function PointParse(buf: string): ParseResult<Point> {
  const tokens = mbSplitFrame(buf);
  if (tokens === null) {
    return { code: ErrorCode.INVALID_FORMAT, value: null };
  }
  const value: Point = {
    x: 0,
    y: 5,
  };
  if (tokens.length > 0) value.x = mbDecodeNumber(tokens[0]);
  if (tokens.length > 1) value.y = mbDecodeNumber(tokens[1]);
  return { code: ErrorCode.OK, value };
}
"#;
        assert_eq!(generate_parse(&point().schemas[0]), expected);
        assert!(codec.contains(expected));
        assert!(codec.contains("import type { ParseResult, SerializeResult, Point } from \"./minibuf.types\";"));
        assert!(!codec.contains("mbDecodeFloat"));
    }

    #[test]
    fn serialize_function() {
        let expected = r#"export function PointSerialize(value: Point, capacity: number = Number.MAX_SAFE_INTEGER): SerializeResult {
  const w = new MbWriter(capacity);
  if (!w.write("[2]")) return mbTooSmall();
  if (!w.write(String(value.x | 0))) return mbTooSmall();
  if (!w.write(";")) return mbTooSmall();
  if (!w.write(String(value.y | 0))) return mbTooSmall();
  return { code: ErrorCode.OK, text: w.text(), bytesWritten: w.length };
}
"#;
        assert_eq!(generate_serialize(&point().schemas[0]), expected);
    }

    #[test]
    fn string_and_float_defaults() {
        let schema = Schema::new("User", vec![
            Field::new("name", DataType::String),
            Field::new("score", DataType::Float),
            Field::new("active", DataType::Bool),
        ])
        .with_default("name", DefaultValue::String("say \"hi\"".into()))
        .with_default("score", DefaultValue::Float(1.5));
        let parse = generate_parse(&schema);
        assert!(parse.contains("    name: \"say \\\"hi\\\"\",\n"));
        assert!(parse.contains("    score: 1.5,\n"));
        assert!(parse.contains("    active: false,\n"));
        assert!(parse.contains("value.name = tokens[0];"));
    }

    #[test]
    fn reserved_schema_names() {
        let mut set = SchemaSet::default();
        set.schemas.push(Schema::new("string", vec![]));
        assert!(generate_types(&set).contains("export interface string_ {"));
        assert!(generate_codec(&set).contains("export function stringParse(buf: string): ParseResult<string_>"));
    }

    #[test]
    fn exported_names_are_escaped() {
        let mut set = SchemaSet::default();
        for name in ["ErrorCode", "ParseResult", "SerializeResult"] {
            set.schemas.push(Schema::new(name, vec![Field::new("x", DataType::Number)]));
        }
        let types = generate_types(&set);
        assert!(types.contains("export interface ErrorCode_ {"));
        assert!(types.contains("export interface ParseResult_ {"));
        assert!(types.contains("export interface SerializeResult_ {"));
        assert!(types.contains("export interface ParseResult<T> {"));

        let codec = generate_codec(&set);
        assert!(codec.contains(
            "import type { ParseResult, SerializeResult, ErrorCode_, ParseResult_, SerializeResult_ } from"
        ));
        assert!(codec.contains("export function ErrorCodeParse(buf: string): ParseResult<ErrorCode_> {"));
        assert!(codec.contains(
            "export function SerializeResultSerialize(value: SerializeResult_, capacity: number = Number.MAX_SAFE_INTEGER): SerializeResult {"
        ));
    }

    #[test]
    fn generated_code_uses_erasable_syntax() {
        let mut set = point();
        set.schemas.push(Schema::new("Vector", vec![Field::new("x", DataType::Float)]));
        let types = generate_types(&set);
        assert!(types.contains("export const ErrorCode = {\n  OK: 0,\n"));
        assert!(!types.contains("enum"));
        let codec = generate_codec(&set);
        assert!(!codec.contains("constructor(private"));
        assert!(codec.contains("BigInt(whole).toString()"));
    }
}
