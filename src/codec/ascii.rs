//! JSON output restricted to visible ASCII, so it is a legal header value.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Compact formatter escaping every non-ASCII character and DEL as `\uXXXX`.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.bytes().all(is_header_safe) {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() && is_header_safe(ch as u8) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Control characters below 0x20 are escaped by serde_json before they reach
/// the formatter; DEL is not.
fn is_header_safe(byte: u8) -> bool {
    byte.is_ascii() && byte != 0x7f
}

/// Serialize `value` as compact, ASCII-only JSON.
pub fn to_ascii_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| serde_json::Error::custom(format!("non-UTF-8 output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_non_ascii() {
        let text = to_ascii_json(&serde_json::json!({ "k": "héllo 🎈" })).unwrap();
        assert!(text.is_ascii());
        assert_eq!(text, r#"{"k":"h\u00e9llo \ud83c\udf88"}"#);

        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["k"], "héllo 🎈");
    }

    #[test]
    fn test_control_characters_still_escaped() {
        let text = to_ascii_json("a\nb").unwrap();
        assert_eq!(text, r#""a\nb""#);
    }

    #[test]
    fn test_del_is_escaped_into_a_legal_header_value() {
        let text = to_ascii_json(&serde_json::json!({ "note": "a\u{7f}b" })).unwrap();
        assert_eq!(text, r#"{"note":"a\u007fb"}"#);
        assert!(axum::http::HeaderValue::from_str(&text).is_ok());

        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["note"], "a\u{7f}b");
    }
}
