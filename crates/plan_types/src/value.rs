//! Literal scalar values produced by the expression builder.

use std::fmt;

use crate::SqlType;

/// A decoded literal value, paired with the [`SqlType`] the builder assigned
/// it (see `SqlType::INTEGER_WIDTH_ORDER` for the integer decoding rule).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    /// A float literal. `decimal_text` is retained when the source text had a
    /// fractional part that does not round-trip identically through
    /// `f64::to_string`, so that re-rendering the literal is lossless.
    Float {
        value: f64,
        decimal_text: Option<String>,
    },
    String(String),
    Bytes(Vec<u8>),
    /// A `b'...'` or `0b...` bit literal with an explicit bit width.
    Bit { value: u64, width: u32 },
}

impl Value {
    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::Null => SqlType::Null,
            Value::Boolean(_) => SqlType::Boolean,
            Value::I8(_) => SqlType::TinyInt,
            Value::U8(_) => SqlType::UnsignedTinyInt,
            Value::I16(_) => SqlType::SmallInt,
            Value::U16(_) => SqlType::UnsignedSmallInt,
            Value::I32(_) => SqlType::Int,
            Value::U32(_) => SqlType::UnsignedInt,
            Value::I64(_) => SqlType::BigInt,
            Value::U64(_) => SqlType::UnsignedBigInt,
            Value::Float { .. } => SqlType::Double,
            Value::String(_) => SqlType::Text,
            Value::Bytes(_) => SqlType::Blob,
            Value::Bit { width, .. } => SqlType::Bit(*width),
        }
    }

    /// Decode an unparsed integer literal's text into the smallest type in
    /// `{i8,u8,i16,u16,i32,u32,i64,u64}` (in that order) that fits it.
    ///
    /// A leading `-` restricts the search to signed variants.
    pub fn decode_integer(text: &str) -> Option<Value> {
        let negative = text.starts_with('-');

        if negative {
            let n: i64 = text.parse().ok()?;
            if let Ok(v) = i8::try_from(n) {
                return Some(Value::I8(v));
            }
            if let Ok(v) = i16::try_from(n) {
                return Some(Value::I16(v));
            }
            if let Ok(v) = i32::try_from(n) {
                return Some(Value::I32(v));
            }
            return Some(Value::I64(n));
        }

        let n: u64 = text.parse().ok()?;
        if let Ok(v) = i8::try_from(n) {
            return Some(Value::I8(v));
        }
        if let Ok(v) = u8::try_from(n) {
            return Some(Value::U8(v));
        }
        if let Ok(v) = i16::try_from(n) {
            return Some(Value::I16(v));
        }
        if let Ok(v) = u16::try_from(n) {
            return Some(Value::U16(v));
        }
        if let Ok(v) = i32::try_from(n) {
            return Some(Value::I32(v));
        }
        if let Ok(v) = u32::try_from(n) {
            return Some(Value::U32(v));
        }
        if let Ok(v) = i64::try_from(n) {
            return Some(Value::I64(v));
        }
        Some(Value::U64(n))
    }

    /// Decode a float literal, retaining the source text when round-tripping
    /// it through `f64` loses precision or changes the rendered form.
    pub fn decode_float(text: &str) -> Option<Value> {
        let value: f64 = text.parse().ok()?;
        let round_trips = value.to_string() == text;
        Some(Value::Float {
            value,
            decimal_text: if round_trips {
                None
            } else {
                Some(text.to_string())
            },
        })
    }

    /// Decode a `0x...` or `x'...'` hex literal into bytes.
    pub fn decode_hex(text: &str) -> Option<Value> {
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.len() % 2 != 0 {
            return None;
        }
        let mut bytes = Vec::with_capacity(cleaned.len() / 2);
        let chars: Vec<char> = cleaned.chars().collect();
        for pair in chars.chunks(2) {
            let byte_str: String = pair.iter().collect();
            bytes.push(u8::from_str_radix(&byte_str, 16).ok()?);
        }
        Some(Value::Bytes(bytes))
    }

    /// Decode a `b'...'` or `0b...` bit literal.
    pub fn decode_bit(text: &str) -> Option<Value> {
        if text.is_empty() || !text.chars().all(|c| c == '0' || c == '1') {
            return None;
        }
        let width = text.len() as u32;
        let value = u64::from_str_radix(text, 2).ok()?;
        Some(Value::Bit { value, width })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::Float { decimal_text, value } => match decimal_text {
                Some(t) => write!(f, "{t}"),
                None => write!(f, "{value}"),
            },
            Value::String(s) => write!(f, "'{s}'"),
            Value::Bytes(b) => write!(f, "0x{}", hex_string(b)),
            Value::Bit { value, width } => write!(f, "b'{value:0width$b}'", width = *width as usize),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_integer_picks_smallest_unsigned_width() {
        assert_eq!(Value::decode_integer("5"), Some(Value::I8(5)));
        assert_eq!(Value::decode_integer("200"), Some(Value::U8(200)));
        assert_eq!(Value::decode_integer("40000"), Some(Value::I32(40000)));
        assert_eq!(
            Value::decode_integer("18446744073709551615"),
            Some(Value::U64(18446744073709551615))
        );
    }

    #[test]
    fn decode_integer_negative_stays_signed() {
        assert_eq!(Value::decode_integer("-5"), Some(Value::I8(-5)));
        assert_eq!(Value::decode_integer("-200"), Some(Value::I16(-200)));
    }

    #[test]
    fn decode_hex_two_forms() {
        assert_eq!(Value::decode_hex("0xFF00"), Some(Value::Bytes(vec![0xFF, 0x00])));
        assert_eq!(Value::decode_hex("ff00"), Some(Value::Bytes(vec![0xFF, 0x00])));
    }

    #[test]
    fn decode_bit_literal() {
        assert_eq!(
            Value::decode_bit("101"),
            Some(Value::Bit { value: 5, width: 3 })
        );
    }

    #[test]
    fn float_round_trip_preserves_odd_text() {
        let v = Value::decode_float("1.50").unwrap();
        match v {
            Value::Float { decimal_text, .. } => assert_eq!(decimal_text.as_deref(), Some("1.50")),
            _ => panic!("expected float"),
        }
    }
}
