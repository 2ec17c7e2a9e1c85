use crate::error::MinibufError;

/// Quotes `text` as a JSON string literal, which is also a valid TypeScript
/// string literal.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, file: &str, line: usize, column: usize) -> MinibufError {
    MinibufError::ParseError {
        msg:    msg.to_string(),
        file:   file.to_string(),
        line,
        column,
    }
}

/// The `[<count>]` header that starts every encoded record.
pub fn header(field_count: usize) -> String {
    format!("[{}]", field_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("abc"), "\"abc\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn error_location() {
        let err = error("bad", "a.mb", 3, 7);
        assert_eq!(err.to_string(), "Parse error in a.mb at line 3, column 7: bad");
    }
}
