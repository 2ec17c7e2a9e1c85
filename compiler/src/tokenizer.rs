use crate::error::MinibufError;
use crate::utils::{error, quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    /// Raw text after `=`, up to `;`, `}`, a ` //` comment or end of line.
    Literal,
    LeftBrace,
    RightBrace,
    Colon,
    Equals,
    Semicolon,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Token {
        Token { kind, text: text.into(), line, column }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r'
}

/// `//` starts a comment at the beginning of a token or after whitespace.
fn starts_comment(chars: &[char], i: usize, token_start: usize) -> bool {
    chars[i] == '/'
        && chars.get(i + 1) == Some(&'/')
        && (i == token_start || chars[i - 1].is_whitespace())
}

/// Splits one schema source into tokens. `file` only labels errors.
///
/// Lines whose first non-blank character is `#` are comments, as is anything
/// after `//`. Newlines are kept as tokens because a declaration may end at
/// the end of its line.
pub fn tokenize_schema(file: &str, text: &str) -> Result<Vec<Token>, MinibufError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;
    let mut column = 1;
    let mut line_started = false;
    let mut literal_next = false;

    while i < chars.len() {
        let c = chars[i];

        if literal_next {
            literal_next = false;
            while i < chars.len() && is_blank(chars[i]) {
                i += 1;
                column += 1;
            }
            let start = i;
            let start_column = column;
            while i < chars.len()
                && !matches!(chars[i], ';' | '}' | '\n')
                && !starts_comment(&chars, i, start)
            {
                i += 1;
                column += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Token::new(TokenKind::Literal, literal.trim_end(), line, start_column));
            continue;
        }

        if c == '\n' {
            tokens.push(Token::new(TokenKind::Newline, "\n", line, column));
            i += 1;
            line += 1;
            column = 1;
            line_started = false;
            continue;
        }

        if is_blank(c) {
            i += 1;
            column += 1;
            continue;
        }

        if (c == '#' && !line_started) || starts_comment(&chars, i, i) {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
                column += 1;
            }
            continue;
        }

        line_started = true;

        let punctuation = match c {
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            ':' => Some(TokenKind::Colon),
            '=' => Some(TokenKind::Equals),
            ';' => Some(TokenKind::Semicolon),
            _ => None,
        };
        if let Some(kind) = punctuation {
            tokens.push(Token::new(kind, c.to_string(), line, column));
            literal_next = kind == TokenKind::Equals;
            i += 1;
            column += 1;
            continue;
        }

        if is_identifier_start(c) {
            let start = i;
            let start_column = column;
            while i < chars.len() && is_identifier_part(chars[i]) {
                i += 1;
                column += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(Token::new(TokenKind::Identifier, word, line, start_column));
            continue;
        }

        return Err(error(
            &format!("Syntax error: unexpected character {}", quote(&c.to_string())),
            file,
            line,
            column,
        ));
    }

    // `=` at the very end of the input still owes a (possibly empty) literal.
    if literal_next {
        tokens.push(Token::new(TokenKind::Literal, "", line, column));
    }

    tokens.push(Token::new(TokenKind::Eof, "", line, column));
    Ok(tokens)
}
