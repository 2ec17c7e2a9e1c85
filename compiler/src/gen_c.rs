use std::collections::BTreeSet;

use minibuf_schema::{DataType, DefaultValue, Schema, SchemaSet};
use tracing::debug;

use crate::{
    traits::{Emitter, GeneratedCode, Target},
    utils::header,
};

/// Fixed capacity of every C string member, terminator included.
pub const STRING_CAPACITY: usize = 256;

const BANNER: &str = "/* Generated by minibufc. Do not edit. */";

/// Emits `minibuf.h` and `minibuf.c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CEmitter;

impl Emitter for CEmitter {
    fn target(&self) -> Target {
        Target::C
    }

    fn file_names(&self) -> (&'static str, &'static str) {
        ("minibuf.h", "minibuf.c")
    }

    fn emit(&self, set: &SchemaSet) -> GeneratedCode {
        debug!(schemas = set.schemas.len(), "Emitting C");
        GeneratedCode {
            interface:      generate_header(set),
            implementation: generate_source(set),
        }
    }
}

/// Escapes C reserved words by suffixing with an underscore.
pub(crate) fn escape_c_keyword(s: &str) -> String {
    let keywords = [
        "auto", "bool", "break", "case", "char", "const", "continue", "default",
        "do", "double", "else", "enum", "extern", "false", "float", "for", "goto",
        "if", "inline", "int", "long", "register", "restrict", "return", "short",
        "signed", "sizeof", "static", "struct", "switch", "true", "typedef",
        "union", "unsigned", "void", "volatile", "while",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// `Point` becomes `point`, giving `point_t` and `mb_point_parse`.
fn c_name(schema: &Schema) -> String {
    schema.name.to_ascii_lowercase()
}

fn map_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Bool => "bool",
        DataType::Number => "int32_t",
        DataType::Float => "double",
        DataType::String => "char",
    }
}

/// Escapes text as a C string literal body. Non-printable and non-ASCII
/// bytes use three-digit octal escapes, which never run into the next byte.
fn escape_c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for &b in text.as_bytes() {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            b'?' => out.push_str("\\?"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out
}

fn c_number_literal(value: i64) -> String {
    if value == i64::from(i32::MIN) {
        "(-2147483647 - 1)".to_string()
    } else {
        value.to_string()
    }
}

fn function_prototypes(schema: &Schema) -> (String, String) {
    let name = c_name(schema);
    (
        format!("int mb_{}_parse(const char* buf, {}_t* out)", name, name),
        format!(
            "int mb_{}_serialize(const {}_t* in, char* buf, size_t buf_size, size_t* out_len)",
            name, name
        ),
    )
}

pub fn generate_header(set: &SchemaSet) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(BANNER.to_string());
    lines.push("#ifndef MINIBUF_H".to_string());
    lines.push("#define MINIBUF_H".to_string());
    lines.push("".to_string());
    lines.push("#include <stdbool.h>".to_string());
    lines.push("#include <stddef.h>".to_string());
    lines.push("#include <stdint.h>".to_string());
    lines.push("".to_string());
    lines.push("#ifdef __cplusplus".to_string());
    lines.push("extern \"C\" {".to_string());
    lines.push("#endif".to_string());
    lines.push("".to_string());
    lines.push("#define MB_OK 0".to_string());
    lines.push("#define MB_ERR_INVALID_FORMAT 1".to_string());
    lines.push("#define MB_ERR_BUFFER_TOO_SMALL 2".to_string());
    lines.push("".to_string());
    lines.push(format!("#define MB_FLOAT_PRECISION {}", set.float_precision()));
    lines.push(format!("#define MB_STRING_CAPACITY {}", STRING_CAPACITY));
    lines.push("".to_string());

    for schema in &set.schemas {
        let name = c_name(schema);
        lines.push(format!("/* {} ({}:{}) */", schema.name, schema.source, schema.line));
        lines.push("typedef struct {".to_string());
        if schema.fields.is_empty() {
            lines.push("    char mb_empty;".to_string());
        }
        for field in &schema.fields {
            let suffix = if field.data_type == DataType::String { "[MB_STRING_CAPACITY]" } else { "" };
            lines.push(format!(
                "    {} {}{};",
                map_type(field.data_type),
                escape_c_keyword(&field.name),
                suffix
            ));
        }
        lines.push(format!("}} {}_t;", name));
        lines.push("".to_string());

        let (parse, serialize) = function_prototypes(schema);
        lines.push(format!("{};", parse));
        lines.push(format!("{};", serialize));
        lines.push("".to_string());
    }

    lines.push("#ifdef __cplusplus".to_string());
    lines.push("}".to_string());
    lines.push("#endif".to_string());
    lines.push("".to_string());
    lines.push("#endif /* MINIBUF_H */".to_string());
    lines.push("".to_string());

    lines.join("\n")
}

const FIND_BODY: &str = r#"/* Returns the text after the `]` that closes the first `[`, or NULL. */
static const char* mb_find_body(const char* buf) {
    const char* open = strchr(buf, '[');
    const char* close;
    if (open == NULL) return NULL;
    close = strchr(open + 1, ']');
    if (close == NULL) return NULL;
    return close + 1;
}

static int mb_write(char* buf, size_t buf_size, size_t* len, const char* text, size_t n) {
    if (*len + n >= buf_size) return MB_ERR_BUFFER_TOO_SMALL;
    memcpy(buf + *len, text, n);
    *len += n;
    buf[*len] = '\0';
    return MB_OK;
}

static int mb_write_str(char* buf, size_t buf_size, size_t* len, const char* text) {
    return mb_write(buf, buf_size, len, text, strlen(text));
}
"#;

const BOOL_HELPERS: &str = r#"static bool mb_decode_bool(const char* token, size_t len) {
    return len == 1 && token[0] == 'T';
}
"#;

const NUMBER_HELPERS: &str = r#"/* Leading [+-]?digits like atoi; overflow wraps. */
static int32_t mb_decode_number(const char* token, size_t len) {
    size_t i = 0;
    uint64_t value = 0;
    bool negative = false;
    while (i < len && isspace((unsigned char)token[i])) i++;
    if (i < len && (token[i] == '+' || token[i] == '-')) {
        negative = token[i] == '-';
        i++;
    }
    while (i < len && isdigit((unsigned char)token[i])) {
        value = value * 10u + (uint64_t)(token[i] - '0');
        i++;
    }
    if (negative) value = 0u - value;
    return (int32_t)(uint32_t)value;
}

static int mb_write_number(char* buf, size_t buf_size, size_t* len, int32_t value) {
    char tmp[16];
    int n = snprintf(tmp, sizeof(tmp), "%" PRId32, value);
    return mb_write(buf, buf_size, len, tmp, (size_t)n);
}
"#;

const FLOAT_HELPERS: &str = r#"/* Longest decimal prefix; no prefix gives 0.0. */
static double mb_decode_float(const char* token, size_t len) {
    char small[64];
    char* copy;
    double value;
    size_t start = 0, end, digits = 0, n;
    while (start < len && isspace((unsigned char)token[start])) start++;
    end = start;
    if (end < len && (token[end] == '+' || token[end] == '-')) end++;
    while (end < len && isdigit((unsigned char)token[end])) { end++; digits++; }
    if (end < len && token[end] == '.') {
        end++;
        while (end < len && isdigit((unsigned char)token[end])) { end++; digits++; }
    }
    if (digits == 0) return 0.0;
    if (end < len && (token[end] == 'e' || token[end] == 'E')) {
        size_t exp = end + 1;
        if (exp < len && (token[exp] == '+' || token[exp] == '-')) exp++;
        if (exp < len && isdigit((unsigned char)token[exp])) {
            while (exp < len && isdigit((unsigned char)token[exp])) exp++;
            end = exp;
        }
    }
    n = end - start;
    copy = n < sizeof(small) ? small : (char*)malloc(n + 1);
    if (copy == NULL) return 0.0;
    memcpy(copy, token + start, n);
    copy[n] = '\0';
    value = strtod(copy, NULL);
    if (copy != small) free(copy);
    return value;
}

/* The integer part stays a double so large values print exactly. */
static int mb_write_float(char* buf, size_t buf_size, size_t* len, double value) {
    char tmp[MB_FLOAT_DIGITS];
    double scale = (double)MB_FLOAT_SCALE;
    double magnitude = fabs(value);
    double whole = trunc(magnitude);
    double fraction = floor((magnitude - whole) * scale + 0.5);
    int n;
    if (fraction >= scale) {
        whole += 1.0;
        fraction -= scale;
    }
    n = snprintf(tmp, sizeof(tmp), "%s%.0f.%0*lld", value < 0.0 ? "-" : "", whole,
                 MB_FLOAT_PRECISION, (long long)fraction);
    if (n < 0 || (size_t)n >= sizeof(tmp)) return MB_ERR_INVALID_FORMAT;
    return mb_write(buf, buf_size, len, tmp, (size_t)n);
}
"#;

const STRING_HELPERS: &str = r#"/* Copies at most MB_STRING_CAPACITY - 1 bytes and terminates. */
static void mb_decode_string(char* dst, const char* token, size_t len) {
    if (len > MB_STRING_CAPACITY - 1) len = MB_STRING_CAPACITY - 1;
    memcpy(dst, token, len);
    dst[len] = '\0';
}

static size_t mb_string_length(const char* text) {
    size_t n = 0;
    while (n < MB_STRING_CAPACITY - 1 && text[n] != '\0') n++;
    return n;
}
"#;

pub fn generate_source(set: &SchemaSet) -> String {
    let mut lines: Vec<String> = Vec::new();
    let used: BTreeSet<DataType> = set
        .schemas
        .iter()
        .flat_map(|schema| schema.fields.iter().map(|field| field.data_type))
        .collect();

    lines.push(BANNER.to_string());
    lines.push("#include \"minibuf.h\"".to_string());
    lines.push("".to_string());
    lines.push("#include <ctype.h>".to_string());
    lines.push("#include <inttypes.h>".to_string());
    lines.push("#include <math.h>".to_string());
    lines.push("#include <stdio.h>".to_string());
    lines.push("#include <stdlib.h>".to_string());
    lines.push("#include <string.h>".to_string());
    lines.push("".to_string());
    lines.push(format!("#define MB_FLOAT_SCALE {}LL", 10i64.pow(set.float_precision())));
    // sign, up to 309 integer digits of DBL_MAX, point, fraction and NUL
    lines.push(format!("#define MB_FLOAT_DIGITS {}", 312 + set.float_precision()));
    lines.push("".to_string());
    lines.push(
        "#define MB_TRY(expr) do { int mb_rc_ = (expr); if (mb_rc_ != MB_OK) return mb_rc_; } while (0)"
            .to_string(),
    );
    lines.push("".to_string());

    if !set.schemas.is_empty() {
        lines.push(FIND_BODY.to_string());
    }
    for (data_type, helpers) in [
        (DataType::Bool, BOOL_HELPERS),
        (DataType::Number, NUMBER_HELPERS),
        (DataType::Float, FLOAT_HELPERS),
        (DataType::String, STRING_HELPERS),
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
    let (prototype, _) = function_prototypes(schema);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("{} {{", prototype));
    lines.push("    const char* p;".to_string());
    if !schema.fields.is_empty() {
        lines.push("    size_t index;".to_string());
    }
    lines.push("    if (buf == NULL || out == NULL) return MB_ERR_INVALID_FORMAT;".to_string());
    lines.push("    p = mb_find_body(buf);".to_string());
    lines.push("    if (p == NULL) return MB_ERR_INVALID_FORMAT;".to_string());
    lines.push("".to_string());
    lines.push("    memset(out, 0, sizeof(*out));".to_string());

    for field in &schema.fields {
        let member = escape_c_keyword(&field.name);
        match schema.default_for(&field.name) {
            Some(DefaultValue::Bool(value)) => {
                lines.push(format!("    out->{} = {};", member, value));
            }
            Some(DefaultValue::Number(value)) => {
                lines.push(format!("    out->{} = {};", member, c_number_literal(*value)));
            }
            Some(DefaultValue::Float(value)) => {
                lines.push(format!("    out->{} = {:?};", member, value));
            }
            Some(DefaultValue::String(value)) => {
                lines.push(format!(
                    "    mb_decode_string(out->{}, \"{}\", {});",
                    member,
                    escape_c_string(value),
                    value.len()
                ));
            }
            None => {}
        }
    }

    if schema.fields.is_empty() {
        lines.push("    (void)p;".to_string());
        lines.push("    return MB_OK;".to_string());
        lines.push("}".to_string());
        lines.push("".to_string());
        return lines.join("\n");
    }

    lines.push("".to_string());
    lines.push("    if (*p == '\\0') return MB_OK;".to_string());
    lines.push(format!("    for (index = 0; index < {}; index++) {{", schema.fields.len()));
    lines.push("        size_t n = strcspn(p, \";\");".to_string());
    lines.push("        switch (index) {".to_string());
    for (index, field) in schema.fields.iter().enumerate() {
        let member = escape_c_keyword(&field.name);
        let statement = match field.data_type {
            DataType::Bool => format!("out->{} = mb_decode_bool(p, n);", member),
            DataType::Number => format!("out->{} = mb_decode_number(p, n);", member),
            DataType::Float => format!("out->{} = mb_decode_float(p, n);", member),
            DataType::String => format!("mb_decode_string(out->{}, p, n);", member),
        };
        lines.push(format!("        case {}: {} break;", index, statement));
    }
    lines.push("        default: break;".to_string());
    lines.push("        }".to_string());
    lines.push("        if (p[n] != ';') break;".to_string());
    lines.push("        p += n + 1;".to_string());
    lines.push("    }".to_string());
    lines.push("    return MB_OK;".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.join("\n")
}

fn generate_serialize(schema: &Schema) -> String {
    let (_, prototype) = function_prototypes(schema);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("{} {{", prototype));
    lines.push("    size_t len = 0;".to_string());
    lines.push("    if (out_len != NULL) *out_len = 0;".to_string());
    lines.push("    if (in == NULL || buf == NULL) return MB_ERR_INVALID_FORMAT;".to_string());
    if schema.fields.is_empty() {
        lines.push("    (void)in;".to_string());
    }
    lines.push(format!(
        "    MB_TRY(mb_write_str(buf, buf_size, &len, \"{}\"));",
        header(schema.fields.len())
    ));

    for (index, field) in schema.fields.iter().enumerate() {
        if index > 0 {
            lines.push("    MB_TRY(mb_write_str(buf, buf_size, &len, \";\"));".to_string());
        }
        let member = escape_c_keyword(&field.name);
        let statement = match field.data_type {
            DataType::Bool => {
                format!("mb_write_str(buf, buf_size, &len, in->{} ? \"T\" : \"F\")", member)
            }
            DataType::Number => format!("mb_write_number(buf, buf_size, &len, in->{})", member),
            DataType::Float => format!("mb_write_float(buf, buf_size, &len, in->{})", member),
            DataType::String => format!(
                "mb_write(buf, buf_size, &len, in->{}, mb_string_length(in->{}))",
                member, member
            ),
        };
        lines.push(format!("    MB_TRY({});", statement));
    }

    lines.push("    if (out_len != NULL) *out_len = len;".to_string());
    lines.push("    return MB_OK;".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use minibuf_schema::{ConfigValue, Field};

    fn sample() -> SchemaSet {
        let mut set = SchemaSet::default();
        set.config.insert("float_precision", ConfigValue::Int(2));
        set.schemas.push(
            Schema::new("Config", vec![
                Field::new("auto_restart", DataType::Bool),
                Field::new("id", DataType::Number),
                Field::new("user_name", DataType::String),
                Field::new("score", DataType::Float),
                Field::new("default", DataType::Number),
            ])
            .with_default("score", DefaultValue::Float(0.5))
            .with_default("user_name", DefaultValue::String("a\"b".into()))
            .with_default("id", DefaultValue::Number(i64::from(i32::MIN))),
        );
        set
    }

    #[test]
    fn header_declares_structs_and_functions() {
        let header = generate_header(&sample());
        assert!(header.contains("#define MB_FLOAT_PRECISION 2\n"));
        assert!(header.contains("#define MB_ERR_BUFFER_TOO_SMALL 2\n"));
        assert!(header.contains(
            "typedef struct {\n    bool auto_restart;\n    int32_t id;\n    char user_name[MB_STRING_CAPACITY];\n    double score;\n    int32_t default_;\n} config_t;"
        ));
        assert!(header.contains("int mb_config_parse(const char* buf, config_t* out);"));
        assert!(header.contains(
            "int mb_config_serialize(const config_t* in, char* buf, size_t buf_size, size_t* out_len);"
        ));
    }

    #[test]
    fn source_applies_defaults_before_tokens() {
        let source = generate_source(&sample());
        assert!(source.contains("#define MB_FLOAT_SCALE 100LL"));
        assert!(source.contains("    out->id = (-2147483647 - 1);"));
        assert!(source.contains("    mb_decode_string(out->user_name, \"a\\\"b\", 3);"));
        assert!(source.contains("    out->score = 0.5;"));
        assert!(source.contains("        case 4: out->default_ = mb_decode_number(p, n); break;"));
        assert!(source.contains("    MB_TRY(mb_write_str(buf, buf_size, &len, \"[5]\"));"));

        let memset = source.find("memset(out, 0").unwrap();
        let body_check = source.find("if (p == NULL) return MB_ERR_INVALID_FORMAT;").unwrap();
        assert!(body_check < memset);
    }

    #[test]
    fn source_only_emits_used_helpers() {
        let mut set = SchemaSet::default();
        set.schemas.push(Schema::new("Flag", vec![Field::new("on", DataType::Bool)]));
        let source = generate_source(&set);
        assert!(source.contains("mb_decode_bool"));
        assert!(!source.contains("mb_decode_float"));
        assert!(!source.contains("mb_decode_string"));
    }

    #[test]
    fn float_writer_keeps_the_integer_part_a_double() {
        let source = generate_source(&sample());
        assert!(source.contains("#define MB_FLOAT_DIGITS 314\n"));
        assert!(source.contains("    double whole = trunc(magnitude);\n"));
        assert!(source.contains("\"%s%.0f.%0*lld\""));
        assert!(!source.contains("(long long)whole"));
    }

    #[test]
    fn empty_schema_has_placeholder_member() {
        let mut set = SchemaSet::default();
        set.schemas.push(Schema::new("Ping", vec![]));
        assert!(generate_header(&set).contains("    char mb_empty;\n} ping_t;"));
        assert!(generate_source(&set).contains("\"[0]\""));
    }

    #[test]
    fn escapes_c_strings() {
        assert_eq!(escape_c_string("tab\there"), "tab\\there");
        assert_eq!(escape_c_string("é"), "\\303\\251");
        assert_eq!(escape_c_string("??="), "\\?\\?=");
    }
}
