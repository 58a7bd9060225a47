//! Human-readable byte sizes such as `64M` or `1g`.
//!
//! A size is a decimal number followed by an optional unit letter. Units are
//! case-insensitive and scale by 1024: `b` (bytes), `k`, `m`, `g`. A missing
//! unit means bytes. Fractions are allowed but the result is truncated to a
//! whole number of bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ConfigError;

const KIB: i64 = 1024;
const MIB: i64 = 1024 * KIB;
const GIB: i64 = 1024 * MIB;

/// Parses a size string into a byte count.
///
/// ```
/// use daemon_config::config::parse_quantity;
///
/// assert_eq!(parse_quantity("64M").unwrap(), 64 * 1024 * 1024);
/// assert!(parse_quantity("-1").is_err());
/// ```
pub fn parse_quantity(text: &str) -> Result<i64, ConfigError> {
    let invalid = || ConfigError::InvalidQuantity {
        text: text.to_string(),
    };

    let trimmed = text.trim();
    let (number, shift) = match trimmed.char_indices().last() {
        Some((idx, unit)) if unit.is_ascii_alphabetic() => {
            (&trimmed[..idx], unit_shift(unit).ok_or_else(invalid)?)
        }
        Some(_) => (trimmed, 0),
        None => return Err(invalid()),
    };

    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };

    // Rejects signs as well, so negative sizes never get this far.
    if !is_digits(whole) {
        return Err(invalid());
    }
    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let mut bytes = whole.checked_mul(1 << shift).ok_or_else(invalid)?;

    if let Some(fraction) = fraction {
        if !is_digits(fraction) {
            return Err(invalid());
        }
        bytes = bytes
            .checked_add(fraction_bytes(fraction, shift))
            .ok_or_else(invalid)?;
    }

    Ok(bytes)
}

/// Unit as a power of two: `b` = 2^0 up to `g` = 2^30.
fn unit_shift(unit: char) -> Option<u32> {
    match unit.to_ascii_lowercase() {
        'b' => Some(0),
        'k' => Some(10),
        'm' => Some(20),
        'g' => Some(30),
        _ => None,
    }
}

/// Whole bytes in `0.<digits>` units of 2^`shift` bytes, truncated.
///
/// With the fraction cut or zero-padded to exactly `shift` digits `n`,
/// `n * 2^shift / 10^shift == n / 5^shift`, and dropping digits past `shift`
/// cannot change the truncated result.
fn fraction_bytes(digits: &str, shift: u32) -> i64 {
    let width = shift as usize;
    let numerator = digits
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(width)
        .fold(0u128, |acc, d| acc * 10 + u128::from(d - b'0'));
    // Below 2^shift, so it always fits.
    (numerator / 5u128.pow(shift)) as i64
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// A byte count, as parsed from a size string.
///
/// Serializes as a plain integer. Deserializes from either an integer or a
/// size string, so config files may write `"default-shm-size": "1g"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    pub const fn from_bytes(bytes: i64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(self) -> i64 {
        self.0
    }
}

impl FromStr for Quantity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quantity(s).map(Self)
    }
}

impl fmt::Display for Quantity {
    /// Formats with the largest unit that divides the value exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        if bytes != 0 && bytes % GIB == 0 {
            write!(f, "{}g", bytes / GIB)
        } else if bytes != 0 && bytes % MIB == 0 {
            write!(f, "{}m", bytes / MIB)
        } else if bytes != 0 && bytes % KIB == 0 {
            write!(f, "{}k", bytes / KIB)
        } else {
            write!(f, "{bytes}")
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bytes(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bytes(bytes) if bytes < 0 => Err(serde::de::Error::custom(format!(
                "size must not be negative, got {bytes}"
            ))),
            Repr::Bytes(bytes) => Ok(Self(bytes)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("1", 1)]
    #[case("1b", 1)]
    #[case("1k", 1024)]
    #[case("1K", 1024)]
    #[case("2M", 2_097_152)]
    #[case("64m", 67_108_864)]
    #[case("128M", 134_217_728)]
    #[case("1g", 1_073_741_824)]
    #[case(" 3k ", 3072)]
    #[case("1.5k", 1536)]
    #[case("0.5b", 0)]
    #[case("0.99999999999999999999k", 1023)]
    #[case("0.000000000931322574615478515625g", 1)]
    #[case("0.000000000931322574615478515624g", 0)]
    #[case("2.25m", 2_359_296)]
    fn test_parse_valid(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(parse_quantity(text).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("bad")]
    #[case("-1")]
    #[case("+1")]
    #[case("k")]
    #[case("1x")]
    #[case("1kb")]
    #[case("1.")]
    #[case(".5k")]
    #[case("1.2.3")]
    #[case("99999999999g")]
    fn test_parse_invalid(#[case] text: &str) {
        let result = parse_quantity(text);
        assert!(
            matches!(&result, Err(ConfigError::InvalidQuantity { text: t }) if t == text),
            "expected InvalidQuantity for {text:?}, got {result:?}"
        );
    }

    #[test]
    fn test_display_uses_largest_exact_unit() {
        assert_eq!(Quantity::from_bytes(64 * MIB).to_string(), "64m");
        assert_eq!(Quantity::from_bytes(GIB).to_string(), "1g");
        assert_eq!(Quantity::from_bytes(1536).to_string(), "1536");
        assert_eq!(Quantity::from_bytes(0).to_string(), "0");
    }

    #[test]
    fn test_deserialize_from_string_or_integer() {
        let from_text: Quantity = serde_json::from_str("\"1g\"").unwrap();
        assert_eq!(from_text.bytes(), GIB);

        let from_int: Quantity = serde_json::from_str("4096").unwrap();
        assert_eq!(from_int.bytes(), 4096);

        assert!(serde_json::from_str::<Quantity>("-5").is_err());
        assert!(serde_json::from_str::<Quantity>("\"lots\"").is_err());
    }
}
