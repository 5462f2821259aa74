//! Literal encodings that turn source literals into compile-time values.
//!
//! All functions are pure and bit-exact across platforms.

use rust_decimal::Decimal;

use crate::{constants::MAX_ASCII_CHARS, error::EncodingError};

/// CRC-32 (IEEE) of the ASCII bytes of `input`, as a signed 32-bit value.
///
/// Non-ASCII characters are hashed as `?`, the replacement used by ASCII encoders.
#[must_use]
pub fn hash(input: &str) -> Decimal {
    let bytes: Vec<u8> = input
        .chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect();
    Decimal::from(crc32fast::hash(&bytes) as i32)
}

/// Packs up to six characters into one integer, most significant character first.
///
/// A backslash takes the next character literally.
pub fn to_ascii(input: &str) -> Result<Decimal, EncodingError> {
    let mut chars = input.chars();
    let mut count = 0;
    let mut result: i64 = 0;

    while let Some(mut c) = chars.next() {
        if c == '\\' {
            c = chars.next().ok_or(EncodingError::TrailingEscape)?;
        }

        count += 1;
        if count > MAX_ASCII_CHARS {
            return Err(EncodingError::StringTooLong {
                max: MAX_ASCII_CHARS,
            });
        }

        if !c.is_ascii() {
            return Err(EncodingError::NonAsciiCharacter(c));
        }

        result = (result << 8) | i64::from(c as u8);
    }

    Ok(Decimal::from(result))
}

/// Parses a `0x`-prefixed literal with optional `_` separators.
pub fn parse_hex(input: &str) -> Result<Decimal, EncodingError> {
    parse_radix(input, 16)
}

/// Parses a `0b`-prefixed literal with optional `_` separators.
pub fn parse_binary(input: &str) -> Result<Decimal, EncodingError> {
    parse_radix(input, 2)
}

fn parse_radix(input: &str, radix: u32) -> Result<Decimal, EncodingError> {
    let digits: String = input.chars().skip(2).filter(|&c| c != '_').collect();
    // Full-width literals wrap into the negative range, as two's complement.
    let value = u64::from_str_radix(&digits, radix)? as i64;
    Ok(Decimal::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::prelude::ToPrimitive;

    #[test]
    fn test_hash_is_stable() {
        // CRC-32 check value of "123456789" is 0xCBF43926.
        assert_eq!(hash("123456789"), Decimal::from(0xCBF4_3926_u32 as i32));
        assert_eq!(hash("123456789"), Decimal::from(-873_187_034));
        assert_eq!(hash(""), Decimal::ZERO);
    }

    #[test]
    fn test_hash_is_deterministic_and_discriminating() {
        assert_eq!(hash("StructureGasSensor"), hash("StructureGasSensor"));
        assert_ne!(hash("StructureGasSensor"), hash("StructureGasTank"));
    }

    #[test]
    fn test_to_ascii_packs_most_significant_first() {
        assert_eq!(to_ascii("AB").unwrap(), Decimal::from(16706));
        assert_eq!(to_ascii("A").unwrap(), Decimal::from(65));
        assert_eq!(to_ascii("").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_to_ascii_escapes() {
        assert_eq!(to_ascii(r"\\").unwrap(), Decimal::from(i64::from(b'\\')));
        assert_eq!(to_ascii(r#"\""#).unwrap(), Decimal::from(i64::from(b'"')));
        assert_eq!(
            to_ascii(r"a\bc").unwrap(),
            Decimal::from((97 << 16) | (98 << 8) | 99)
        );
    }

    #[test]
    fn test_to_ascii_errors() {
        assert_eq!(to_ascii(r"ab\"), Err(EncodingError::TrailingEscape));
        assert_eq!(
            to_ascii("ABCDEFG"),
            Err(EncodingError::StringTooLong { max: 6 })
        );
        assert_eq!(to_ascii("é"), Err(EncodingError::NonAsciiCharacter('é')));
        // Escapes count as a single character.
        assert!(to_ascii(r"ABCDE\F").is_ok());
    }

    #[test]
    fn test_parse_hex_and_binary() {
        assert_eq!(parse_hex("0xFF").unwrap(), Decimal::from(255));
        assert_eq!(parse_hex("0x_dead_BEEF").unwrap(), Decimal::from(0xDEAD_BEEF_i64));
        assert_eq!(parse_binary("0b1010_1010").unwrap(), Decimal::from(170));
        assert_eq!(parse_hex("0xFFFFFFFFFFFFFFFF").unwrap(), Decimal::from(-1));
    }

    #[test]
    fn test_parse_malformed_digits() {
        assert!(matches!(
            parse_hex("0xZZ"),
            Err(EncodingError::MalformedNumber(_))
        ));
        assert!(matches!(
            parse_binary("0b102"),
            Err(EncodingError::MalformedNumber(_))
        ));
        assert!(matches!(
            parse_hex("0x"),
            Err(EncodingError::MalformedNumber(_))
        ));
    }

    fn unpack(mut value: i64, len: usize) -> String {
        let mut bytes = vec![0u8; len];
        for byte in bytes.iter_mut().rev() {
            *byte = (value & 0xFF) as u8;
            value >>= 8;
        }
        String::from_utf8(bytes).unwrap()
    }

    proptest! {
        #[test]
        fn test_to_ascii_round_trips_plain_strings(input in "[ -\\[\\]-~]{1,6}") {
            let packed = to_ascii(&input).unwrap();
            let packed = packed.to_i64().unwrap();
            prop_assert_eq!(unpack(packed, input.len()), input);
        }

        #[test]
        fn test_to_ascii_rejects_seven_plain_chars(input in "[a-zA-Z0-9]{7}") {
            prop_assert_eq!(to_ascii(&input), Err(EncodingError::StringTooLong { max: 6 }));
        }
    }
}
