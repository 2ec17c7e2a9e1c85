use crate::{
    error::MinibufError,
    tokenizer::{Token, TokenKind},
    utils::{error, quote},
};
use lazy_static::lazy_static;
use minibuf_schema::{ConfigValue, DataType, DefaultValue, Field, Schema, SchemaSet};
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref BOOLEAN: Regex = Regex::new(r"(?i)^(true|false)$").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref FLOAT:   Regex = Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

const CONFIG_KEYWORD: &str = "config";

static EOF_TOKEN: Token = Token {
    kind:   TokenKind::Eof,
    text:   String::new(),
    line:   0,
    column: 0,
};

/// Type-checks a default literal against the declared field type. Returns
/// `None` when the literal is not valid for that type.
pub fn parse_default(data_type: DataType, literal: &str) -> Option<DefaultValue> {
    match data_type {
        DataType::Bool if BOOLEAN.is_match(literal) => {
            Some(DefaultValue::Bool(literal.eq_ignore_ascii_case("true")))
        }
        DataType::Number if INTEGER.is_match(literal) => {
            literal.parse::<i64>().ok().map(DefaultValue::Number)
        }
        DataType::Float if FLOAT.is_match(literal) => literal
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(DefaultValue::Float),
        DataType::String => {
            let unquoted = if literal.len() >= 2 && literal.starts_with('"') && literal.ends_with('"') {
                &literal[1..literal.len() - 1]
            } else {
                literal
            };
            Some(DefaultValue::String(unquoted.to_string()))
        }
        _ => None,
    }
}

/// Parses the tokens of one source into schemas and config assignments.
/// `file` labels errors and is recorded on every schema.
pub fn parse_schema(file: &str, tokens: &[Token]) -> Result<SchemaSet, MinibufError> {
    let mut set   = SchemaSet::default();
    let mut index = 0;

    fn current_token(tokens: &[Token], index: usize) -> &Token {
        tokens.get(index).unwrap_or(&EOF_TOKEN)
    }

    fn eat(tokens: &[Token], index: &mut usize, kind: TokenKind) -> bool {
        if current_token(tokens, *index).kind == kind {
            *index += 1;
            true
        } else {
            false
        }
    }

    fn describe(tok: &Token) -> String {
        match tok.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            _ => quote(&tok.text),
        }
    }

    fn expect<'a>(
        file: &str,
        tokens: &'a [Token],
        index: &mut usize,
        kind: TokenKind,
        expected: &str,
    ) -> Result<&'a Token, MinibufError> {
        let tok = current_token(tokens, *index);
        if tok.kind != kind {
            return Err(error(
                &format!("Expected {} but found {}", expected, describe(tok)),
                file,
                tok.line,
                tok.column,
            ));
        }
        *index += 1;
        Ok(tok)
    }

    fn unexpected_token(file: &str, tok: &Token) -> MinibufError {
        error(&format!("Unexpected token {}", describe(tok)), file, tok.line, tok.column)
    }

    /// A declaration ends at `;` or end of line. A `}` or end of file also
    /// ends it but is left for the caller.
    fn end_of_declaration(file: &str, tokens: &[Token], index: &mut usize) -> Result<(), MinibufError> {
        let tok = current_token(tokens, *index);
        match tok.kind {
            TokenKind::Semicolon | TokenKind::Newline => {
                *index += 1;
                Ok(())
            }
            TokenKind::RightBrace | TokenKind::Eof => Ok(()),
            _ => Err(error(
                &format!("Expected \";\" but found {}", describe(tok)),
                file,
                tok.line,
                tok.column,
            )),
        }
    }

    loop {
        while eat(tokens, &mut index, TokenKind::Newline) || eat(tokens, &mut index, TokenKind::Semicolon) {}

        let tok = current_token(tokens, index);
        match tok.kind {
            TokenKind::Eof => break,
            TokenKind::Identifier => {}
            _ => return Err(unexpected_token(file, tok)),
        }

        let next = current_token(tokens, index + 1);
        if next.kind == TokenKind::LeftBrace {
            let schema = parse_definition(file, tokens, &mut index)?;
            debug!(file, schema = %schema.name, fields = schema.fields.len(), "Parsed schema");
            set.schemas.push(schema);
            continue;
        }

        // `[config] key = value`
        if tok.text == CONFIG_KEYWORD && next.kind == TokenKind::Identifier {
            index += 1;
        }
        let key = expect(file, tokens, &mut index, TokenKind::Identifier, "identifier")?;
        expect(file, tokens, &mut index, TokenKind::Equals, "\"=\" or \"{\"")?;
        let value = expect(file, tokens, &mut index, TokenKind::Literal, "value")?;
        if value.text.is_empty() {
            return Err(error(
                &format!("Missing value for config key {}", quote(&key.text)),
                file,
                value.line,
                value.column,
            ));
        }
        end_of_declaration(file, tokens, &mut index)?;
        let value = ConfigValue::parse(&value.text);
        debug!(file, key = %key.text, value = %value, "Parsed config assignment");
        set.config.insert(key.text.clone(), value);
    }

    fn parse_definition(file: &str, tokens: &[Token], index: &mut usize) -> Result<Schema, MinibufError> {
        let name_tok = expect(file, tokens, index, TokenKind::Identifier, "identifier")?;
        expect(file, tokens, index, TokenKind::LeftBrace, "\"{\"")?;

        let mut schema = Schema::new(name_tok.text.clone(), Vec::new());
        schema.source = file.to_string();
        schema.line   = name_tok.line;
        schema.column = name_tok.column;

        loop {
            while eat(tokens, index, TokenKind::Newline) || eat(tokens, index, TokenKind::Semicolon) {}

            if eat(tokens, index, TokenKind::RightBrace) {
                return Ok(schema);
            }

            let tok = current_token(tokens, *index);
            if tok.kind == TokenKind::Eof {
                return Err(error(
                    &format!(
                        "Unterminated schema {} (opened at line {}, column {})",
                        quote(&schema.name),
                        schema.line,
                        schema.column
                    ),
                    file,
                    tok.line,
                    tok.column,
                ));
            }

            // name : type [= default]
            let f_tok = expect(file, tokens, index, TokenKind::Identifier, "field name")?;
            expect(file, tokens, index, TokenKind::Colon, "\":\"")?;
            let t_tok = expect(file, tokens, index, TokenKind::Identifier, "data type")?;
            let data_type = DataType::from_name(&t_tok.text).ok_or_else(|| {
                error(
                    &format!(
                        "Invalid data type {} for field {} in schema {}",
                        quote(&t_tok.text),
                        quote(&f_tok.text),
                        quote(&schema.name)
                    ),
                    file,
                    t_tok.line,
                    t_tok.column,
                )
            })?;

            if eat(tokens, index, TokenKind::Equals) {
                let v_tok = expect(file, tokens, index, TokenKind::Literal, "default value")?;
                if v_tok.text.is_empty() {
                    return Err(error(
                        &format!("Missing default value for field {}", quote(&f_tok.text)),
                        file,
                        v_tok.line,
                        v_tok.column,
                    ));
                }
                let value = parse_default(data_type, &v_tok.text).ok_or_else(|| {
                    error(
                        &format!(
                            "Invalid {} value {} for field {}",
                            data_type,
                            quote(&v_tok.text),
                            quote(&f_tok.text)
                        ),
                        file,
                        v_tok.line,
                        v_tok.column,
                    )
                })?;
                schema.defaults.insert(f_tok.text.clone(), value);
            }

            end_of_declaration(file, tokens, index)?;

            schema.fields.push(Field {
                name:      f_tok.text.clone(),
                data_type,
                line:      f_tok.line,
                column:    f_tok.column,
            });
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_schema;

    fn parse(text: &str) -> Result<SchemaSet, MinibufError> {
        parse_schema("test.mb", &tokenize_schema("test.mb", text)?)
    }

    fn parse_err(text: &str) -> (String, usize, usize) {
        match parse(text) {
            Err(MinibufError::ParseError { msg, line, column, .. }) => (msg, line, column),
            other => panic!("expected a ParseError but got {:?}", other),
        }
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(parse_default(DataType::Bool, "true"), Some(DefaultValue::Bool(true)));
        assert_eq!(parse_default(DataType::Bool, "FALSE"), Some(DefaultValue::Bool(false)));
        assert_eq!(parse_default(DataType::Bool, "yes"), None);
        assert_eq!(parse_default(DataType::Number, "-42"), Some(DefaultValue::Number(-42)));
        assert_eq!(parse_default(DataType::Number, "+7"), Some(DefaultValue::Number(7)));
        assert_eq!(parse_default(DataType::Number, "4.5"), None);
        assert_eq!(parse_default(DataType::Number, "99999999999999999999"), None);
        assert_eq!(parse_default(DataType::Float, "0.0"), Some(DefaultValue::Float(0.0)));
        assert_eq!(parse_default(DataType::Float, "12"), Some(DefaultValue::Float(12.0)));
        assert_eq!(parse_default(DataType::Float, "-1.5e3"), Some(DefaultValue::Float(-1500.0)));
        assert_eq!(parse_default(DataType::Float, "1e999"), None);
        assert_eq!(parse_default(DataType::Float, "inf"), None);
        assert_eq!(parse_default(DataType::Float, "abc"), None);
        assert_eq!(
            parse_default(DataType::String, "hello world"),
            Some(DefaultValue::String("hello world".into()))
        );
        assert_eq!(parse_default(DataType::String, "\"\""), Some(DefaultValue::String("".into())));
        assert_eq!(parse_default(DataType::String, "\"x"), Some(DefaultValue::String("\"x".into())));
    }

    #[test]
    fn test_parse_original_example() {
        let set = parse(
            r#"
            config float_precision = 3;

            Vector {
              x: float;
              y: float;
              z: float;
            }

            Config {
              auto_restart: bool;
              id: number;
              user_name: string;
              score: float = 0.0;      // default value for backward compatibility
            }
            "#,
        )
        .unwrap();

        assert_eq!(set.config.get("float_precision"), Some(&ConfigValue::Int(3)));
        assert_eq!(set.schemas.len(), 2);

        let vector = &set.schemas[0];
        assert_eq!(vector.name, "Vector");
        assert_eq!(vector.source, "test.mb");
        let names: Vec<_> = vector.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["x", "y", "z"]);
        assert!(vector.fields.iter().all(|f| f.data_type == DataType::Float));
        assert!(vector.defaults.is_empty());

        let config = &set.schemas[1];
        assert_eq!(config.name, "Config");
        let types: Vec<_> = config.fields.iter().map(|f| f.data_type).collect();
        assert_eq!(types, [DataType::Bool, DataType::Number, DataType::String, DataType::Float]);
        assert_eq!(config.default_for("score"), Some(&DefaultValue::Float(0.0)));
        assert_eq!(config.defaults.len(), 1);
        assert_eq!((config.fields[3].line, config.fields[3].column), (14, 15));
    }

    #[test]
    fn test_parse_single_line_schema() {
        let set = parse("Point { x: number; y: number = 5; }").unwrap();
        let point = &set.schemas[0];
        assert_eq!(point.fields.len(), 2);
        assert_eq!(point.default_for("y"), Some(&DefaultValue::Number(5)));
    }

    #[test]
    fn test_parse_optional_semicolons() {
        let set = parse("A {\n  a: bool = true\n  b: string = two words\n}\nprecision_hint = fine").unwrap();
        let a = &set.schemas[0];
        assert_eq!(a.default_for("a"), Some(&DefaultValue::Bool(true)));
        assert_eq!(a.default_for("b"), Some(&DefaultValue::String("two words".into())));
        assert_eq!(set.config.get("precision_hint"), Some(&ConfigValue::Text("fine".into())));
    }

    #[test]
    fn test_parse_config_forms() {
        let set = parse("float_precision = 2\nconfig ratio = 0.5;\nconfig name = minibuf;").unwrap();
        assert_eq!(set.config.get("float_precision"), Some(&ConfigValue::Int(2)));
        assert_eq!(set.config.get("ratio"), Some(&ConfigValue::Float(0.5)));
        assert_eq!(set.config.get("name"), Some(&ConfigValue::Text("minibuf".into())));
        assert!(set.schemas.is_empty());
    }

    #[test]
    fn test_parse_schema_named_config() {
        let set = parse("config {\n  on: bool\n}").unwrap();
        assert_eq!(set.schemas[0].name, "config");
    }

    #[test]
    fn test_parse_unknown_type() {
        let (msg, line, column) = parse_err("Vector {\n  x: int;\n}");
        assert!(msg.contains("Invalid data type \"int\""), "{}", msg);
        assert_eq!((line, column), (2, 6));
    }

    #[test]
    fn test_parse_bad_default() {
        let (msg, line, column) = parse_err("A {\n  n: number = 1.5;\n}");
        assert!(msg.contains("Invalid number value \"1.5\""), "{}", msg);
        assert_eq!((line, column), (2, 15));

        let (msg, _, _) = parse_err("A { b: bool = yes; }");
        assert!(msg.contains("Invalid bool value"), "{}", msg);

        let (msg, _, _) = parse_err("A { f: float = ; }");
        assert!(msg.contains("Missing default value"), "{}", msg);
    }

    #[test]
    fn test_parse_unterminated_schema() {
        let (msg, line, _) = parse_err("Vector {\n  x: float;\n");
        assert!(msg.contains("Unterminated schema \"Vector\""), "{}", msg);
        assert_eq!(line, 3);
    }

    #[test]
    fn test_parse_missing_colon() {
        let (msg, line, column) = parse_err("A {\n  x float;\n}");
        assert_eq!(msg, "Expected \":\" but found \"float\"");
        assert_eq!((line, column), (2, 5));
    }

    #[test]
    fn test_parse_junk_after_declaration() {
        let (msg, _, _) = parse_err("A { x: float extra; }");
        assert_eq!(msg, "Expected \";\" but found \"extra\"");
    }

    #[test]
    fn test_parse_stray_tokens() {
        let (msg, _, _) = parse_err("}");
        assert_eq!(msg, "Unexpected token \"}\"");

        let (msg, _, _) = parse_err("lonely");
        assert_eq!(msg, "Expected \"=\" or \"{\" but found end of file");

        let (msg, _, _) = parse_err("key =\n");
        assert!(msg.contains("Missing value for config key \"key\""), "{}", msg);
    }

    #[test]
    fn test_parse_empty_schema() {
        let set = parse("Empty {}").unwrap();
        assert!(set.schemas[0].fields.is_empty());
    }
}
