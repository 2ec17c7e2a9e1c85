use std::str;

use thiserror::Error;

/// Errors reported by decode and encode routines. Generated code for other
/// targets reports the same conditions through `code()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("invalid format: expected a `[count]` header")]
    InvalidFormat,

    #[error("buffer too small")]
    BufferTooSmall,
}

impl WireError {
    pub const OK: i32 = 0;

    /// The numeric code shared with the C and TypeScript targets.
    pub fn code(&self) -> i32 {
        match self {
            WireError::InvalidFormat => 1,
            WireError::BufferTooSmall => 2,
        }
    }
}

pub const SEPARATOR: char = ';';

/// A decoded frame: the bracketed count and the positional token text that
/// follows it.
///
/// ```
/// let frame = minibuf_schema::Frame::parse("[3]T;42;hi").unwrap();
/// assert_eq!(frame.declared_count(), Some(3));
/// assert_eq!(frame.tokens().collect::<Vec<_>>(), ["T", "42", "hi"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame<'a> {
    count: &'a str,
    body:  &'a str,
}

impl<'a> Frame<'a> {
    /// Locates the first `[` and the `]` after it. Anything before the `[` is
    /// ignored.
    pub fn parse(input: &'a str) -> Result<Frame<'a>, WireError> {
        let start = input.find('[').ok_or(WireError::InvalidFormat)? + 1;
        let end = input[start..].find(']').ok_or(WireError::InvalidFormat)? + start;
        Ok(Frame {
            count: &input[start..end],
            body:  &input[end + 1..],
        })
    }

    /// The count written by the encoder. Decoders never rely on it.
    pub fn declared_count(&self) -> Option<usize> {
        self.count.trim().parse().ok()
    }

    pub fn body(&self) -> &'a str {
        self.body
    }

    /// Positional tokens. An empty body has no tokens at all, while empty
    /// tokens between separators are kept.
    pub fn tokens(&self) -> Tokens<'a> {
        Tokens {
            inner: if self.body.is_empty() {
                None
            } else {
                Some(self.body.split(SEPARATOR))
            },
        }
    }
}

pub struct Tokens<'a> {
    inner: Option<str::Split<'a, char>>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.inner.as_mut()?.next()
    }
}

pub fn decode_bool(token: &str) -> bool {
    token == "T"
}

/// Parses the leading `[+-]?digits` prefix the way `atoi` does, yielding 0
/// when there is none. Overflow wraps.
pub fn decode_number(token: &str) -> i32 {
    let bytes = token.trim_start().as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = value.wrapping_mul(10).wrapping_add((b - b'0') as i64);
    }
    if negative {
        value = value.wrapping_neg();
    }
    value as i32
}

/// Parses the longest floating-point prefix, yielding 0.0 when there is none.
pub fn decode_float(token: &str) -> f64 {
    let text = token.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    text[..end].parse().unwrap_or(0.0)
}

/// Renders `value` with exactly `precision` fractional digits. The fraction
/// is the fractional magnitude scaled by `10^precision` and rounded half-up;
/// a fraction that rounds up to `10^precision` carries into the integer part.
///
/// ```
/// use minibuf_schema::format_fixed;
/// assert_eq!(format_fixed(3.14159, 2), "3.14");
/// assert_eq!(format_fixed(3.14159, 4), "3.1416");
/// assert_eq!(format_fixed(-0.5, 2), "-0.50");
/// ```
pub fn format_fixed(value: f64, precision: u32) -> String {
    let scale = 10f64.powi(precision as i32);
    let magnitude = value.abs();
    let mut whole = magnitude.trunc();
    let mut fraction = ((magnitude - whole) * scale + 0.5).floor();
    if fraction >= scale {
        whole += 1.0;
        fraction -= scale;
    }
    let sign = if value < 0.0 { "-" } else { "" };
    // The integer part stays an f64 so values past i64::MAX print exactly.
    format!("{}{:.0}.{:0width$}", sign, whole, fraction as u64, width = precision as usize)
}

enum Output<'a> {
    Slice(&'a mut [u8]),
    Growable(Vec<u8>),
}

/// A capacity-checked writer for encoded records.
///
/// Every write is checked on its own, so a record that does not fit fails on
/// the first token that would overrun the buffer.
///
/// ```
/// let mut buf = [0u8; 8];
/// let mut w = minibuf_schema::WireWriter::new(&mut buf);
/// w.write_header(2).unwrap();
/// w.write_number(3).unwrap();
/// w.write_separator().unwrap();
/// w.write_bool(true).unwrap();
/// assert_eq!(w.as_str(), "[2]3;T");
/// ```
pub struct WireWriter<'a> {
    out: Output<'a>,
    len: usize,
}

impl<'a> WireWriter<'a> {
    /// Writes into a caller-supplied buffer; its length is the capacity.
    pub fn new(buf: &'a mut [u8]) -> WireWriter<'a> {
        WireWriter { out: Output::Slice(buf), len: 0 }
    }

    /// Writes into an internal buffer that never runs out of room.
    pub fn growable() -> WireWriter<'static> {
        WireWriter { out: Output::Growable(Vec::new()), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        match &self.out {
            Output::Slice(buf) => Some(buf.len()),
            Output::Growable(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.out {
            Output::Slice(buf) => &buf[..self.len],
            Output::Growable(buf) => buf,
        }
    }

    /// Only whole `&str` values are ever written, so the prefix is UTF-8.
    pub fn as_str(&self) -> &str {
        str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn into_string(self) -> String {
        match self.out {
            Output::Slice(buf) => String::from_utf8_lossy(&buf[..self.len]).into_owned(),
            Output::Growable(buf) => String::from_utf8(buf).unwrap_or_default(),
        }
    }

    pub fn write_str(&mut self, text: &str) -> Result<(), WireError> {
        let end = self.len + text.len();
        match &mut self.out {
            Output::Slice(buf) => {
                if end > buf.len() {
                    return Err(WireError::BufferTooSmall);
                }
                buf[self.len..end].copy_from_slice(text.as_bytes());
            }
            Output::Growable(buf) => buf.extend_from_slice(text.as_bytes()),
        }
        self.len = end;
        Ok(())
    }

    pub fn write_header(&mut self, field_count: usize) -> Result<(), WireError> {
        self.write_str(&format!("[{}]", field_count))
    }

    pub fn write_separator(&mut self) -> Result<(), WireError> {
        self.write_str(";")
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        self.write_str(if value { "T" } else { "F" })
    }

    pub fn write_number(&mut self, value: i32) -> Result<(), WireError> {
        self.write_str(&value.to_string())
    }

    pub fn write_float(&mut self, value: f64, precision: u32) -> Result<(), WireError> {
        self.write_str(&format_fixed(value, precision))
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        self.write_str(value)
    }
}

#[test]
fn frame_parse() {
    assert_eq!(Frame::parse(""), Err(WireError::InvalidFormat));
    assert_eq!(Frame::parse("3;4"), Err(WireError::InvalidFormat));
    assert_eq!(Frame::parse("[2"), Err(WireError::InvalidFormat));
    assert_eq!(Frame::parse("]2["), Err(WireError::InvalidFormat));

    let frame = Frame::parse("junk[2]1;2").unwrap();
    assert_eq!(frame.declared_count(), Some(2));
    assert_eq!(frame.body(), "1;2");

    let frame = Frame::parse("[x]1").unwrap();
    assert_eq!(frame.declared_count(), None);
    assert_eq!(frame.body(), "1");
}

#[test]
fn frame_tokens() {
    let tokens = |input| Frame::parse(input).unwrap().tokens().collect::<Vec<_>>();
    assert_eq!(tokens("[0]"), Vec::<&str>::new());
    assert_eq!(tokens("[1]a"), ["a"]);
    assert_eq!(tokens("[3]a;;c"), ["a", "", "c"]);
    assert_eq!(tokens("[2]a;"), ["a", ""]);
    assert_eq!(tokens("[1]a]b"), ["a]b"]);
}

#[test]
fn decode_bool_only_accepts_t() {
    assert!(decode_bool("T"));
    assert!(!decode_bool("F"));
    assert!(!decode_bool("t"));
    assert!(!decode_bool("true"));
    assert!(!decode_bool(""));
}

#[test]
fn decode_number_is_lenient() {
    assert_eq!(decode_number("42"), 42);
    assert_eq!(decode_number("-17"), -17);
    assert_eq!(decode_number("+8"), 8);
    assert_eq!(decode_number("  12"), 12);
    assert_eq!(decode_number("12abc"), 12);
    assert_eq!(decode_number("abc"), 0);
    assert_eq!(decode_number(""), 0);
    assert_eq!(decode_number("-"), 0);
    assert_eq!(decode_number("2147483647"), i32::MAX);
    assert_eq!(decode_number("-2147483648"), i32::MIN);
}

#[test]
fn decode_float_is_lenient() {
    assert_eq!(decode_float("1.5"), 1.5);
    assert_eq!(decode_float("-0.250"), -0.25);
    assert_eq!(decode_float("3"), 3.0);
    assert_eq!(decode_float(".5"), 0.5);
    assert_eq!(decode_float("5."), 5.0);
    assert_eq!(decode_float("1e3"), 1000.0);
    assert_eq!(decode_float("2.5e"), 2.5);
    assert_eq!(decode_float("7.25xyz"), 7.25);
    assert_eq!(decode_float("abc"), 0.0);
    assert_eq!(decode_float("-"), 0.0);
    assert_eq!(decode_float("."), 0.0);
    assert_eq!(decode_float(""), 0.0);
}

#[test]
fn format_fixed_rounding() {
    assert_eq!(format_fixed(3.14159, 2), "3.14");
    assert_eq!(format_fixed(3.14159, 4), "3.1416");
    assert_eq!(format_fixed(-0.5, 2), "-0.50");
    assert_eq!(format_fixed(0.0, 3), "0.000");
    assert_eq!(format_fixed(-0.0, 3), "0.000");
    assert_eq!(format_fixed(100.0, 3), "100.000");
    assert_eq!(format_fixed(1.0005, 1), "1.0");
    assert_eq!(format_fixed(0.25, 1), "0.3");
    assert_eq!(format_fixed(-2.75, 1), "-2.8");
    assert_eq!(format_fixed(0.9996, 3), "1.000");
    assert_eq!(format_fixed(-1.99999, 2), "-2.00");
    assert_eq!(format_fixed(0.05, 3), "0.050");
    assert_eq!(format_fixed(-0.0004, 3), "-0.000");
}

#[test]
fn format_fixed_large_values() {
    assert_eq!(format_fixed(1e19, 3), "10000000000000000000.000");
    assert_eq!(format_fixed(-1e19, 2), "-10000000000000000000.00");
    assert_eq!(format_fixed(1e22, 3), "10000000000000000000000.000");
    assert_eq!(format_fixed(9007199254740993.0, 1), "9007199254740992.0");
    for value in [1e19, -1e19, 1e22, 123456789012345680000.0] {
        assert_eq!(decode_float(&format_fixed(value, 3)), value);
    }
}

#[test]
fn writer_checks_every_write() {
    let mut buf = [0u8; 5];
    let mut w = WireWriter::new(&mut buf);
    assert_eq!(w.capacity(), Some(5));
    assert_eq!(w.write_header(2), Ok(()));
    assert_eq!(w.write_number(7), Ok(()));
    assert_eq!(w.write_separator(), Ok(()));
    assert_eq!(w.write_string("ab"), Err(WireError::BufferTooSmall));
    assert_eq!(w.as_str(), "[2]7;");
    assert_eq!(w.len(), 5);
}

#[test]
fn writer_exact_fit() {
    let mut buf = [0u8; 9];
    let mut w = WireWriter::new(&mut buf);
    w.write_header(2).unwrap();
    w.write_float(1.5, 2).unwrap();
    w.write_separator().unwrap();
    w.write_bool(false).unwrap();
    assert_eq!(w.into_string(), "[2]1.50;F");
}

#[test]
fn writer_growable() {
    let mut w = WireWriter::growable();
    assert!(w.is_empty());
    assert_eq!(w.capacity(), None);
    w.write_header(1).unwrap();
    w.write_string("héllo").unwrap();
    assert_eq!(w.as_str(), "[1]héllo");
    assert_eq!(w.len(), "[1]héllo".len());
}

#[test]
fn error_codes() {
    assert_eq!(WireError::OK, 0);
    assert_eq!(WireError::InvalidFormat.code(), 1);
    assert_eq!(WireError::BufferTooSmall.code(), 2);
}
