//! Arbitrary-precision non-negative integers stored as decimal text.
//!
//! Fibonacci numbers outgrow every native integer width after a few hundred
//! terms, so the engine keeps each value as its canonical decimal
//! representation and adds them digit by digit. The text form is also exactly
//! what the wire format carries, so no conversion is needed on the way out.

use core::{fmt, ops::Add, ops::Deref, str::FromStr};

/// A canonical decimal numeral for a non-negative integer of any magnitude.
///
/// The contained text is non-empty, consists only of ASCII digits, is ordered
/// most-significant digit first, and has no leading zero unless the value is
/// zero itself (`"0"`). Every constructor upholds this, so the invariant holds
/// for every value the engine hands out.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct DigitString(String);

/// Why a piece of text is not a [`DigitString`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseDigitsError {
    #[error("empty input")]
    Empty,

    #[error("invalid digit {found:?} at position {position}")]
    InvalidDigit { position: usize, found: char },

    #[error("leading zero")]
    LeadingZero,
}

impl DigitString {
    /// The value `0`.
    pub fn zero() -> Self {
        Self(String::from("0"))
    }

    /// The value `1`.
    pub fn one() -> Self {
        Self(String::from("1"))
    }

    /// Validates `text` as a canonical decimal numeral.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseDigitsError`] if `text` is empty, contains anything
    /// other than `0-9`, or has a leading zero.
    pub fn parse(text: impl Into<String>) -> Result<Self, ParseDigitsError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ParseDigitsError::Empty);
        }
        if let Some((position, found)) = text.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            return Err(ParseDigitsError::InvalidDigit { position, found });
        }
        if text.len() > 1 && text.starts_with('0') {
            return Err(ParseDigitsError::LeadingZero);
        }
        Ok(Self(text))
    }

    /// Borrows the decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps the decimal text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of decimal digits.
    pub fn digits(&self) -> usize {
        self.0.len()
    }
}

/// Adds two non-negative decimal numerals.
///
/// Grade-school addition from the least-significant digit with a single carry.
/// Exhausted positions of the shorter operand count as `0`, and a carry out of
/// the most significant position contributes one leading `1`, so the sum of
/// two canonical numerals is canonical.
pub fn add_digits(a: &DigitString, b: &DigitString) -> DigitString {
    let (a, b) = (a.0.as_bytes(), b.0.as_bytes());
    let mut out = Vec::with_capacity(a.len().max(b.len()) + 1);
    let mut lhs = a.iter().rev();
    let mut rhs = b.iter().rev();
    let mut carry = false;

    loop {
        let (x, y) = (lhs.next(), rhs.next());
        if x.is_none() && y.is_none() && !carry {
            break;
        }

        let mut sum = u8::from(carry);
        if let Some(d) = x {
            sum += d - b'0';
        }
        if let Some(d) = y {
            sum += d - b'0';
        }

        carry = sum > 9;
        if carry {
            sum -= 10;
        }
        out.push(b'0' + sum);
    }

    DigitString(out.into_iter().rev().map(char::from).collect())
}

impl Default for DigitString {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for DigitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for DigitString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DigitString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for DigitString {
    type Err = ParseDigitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DigitString {
    type Error = ParseDigitsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DigitString> for String {
    fn from(value: DigitString) -> Self {
        value.0
    }
}

impl From<u64> for DigitString {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Add for &DigitString {
    type Output = DigitString;

    fn add(self, rhs: Self) -> DigitString {
        add_digits(self, rhs)
    }
}

impl PartialEq<&str> for DigitString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<str> for DigitString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(a: &str, b: &str) -> DigitString {
        add_digits(&a.parse().unwrap(), &b.parse().unwrap())
    }

    #[test]
    fn adds_small_values() {
        assert_eq!(sum("0", "0"), "0");
        assert_eq!(sum("0", "1"), "1");
        assert_eq!(sum("2", "3"), "5");
        assert_eq!(sum("5", "8"), "13");
    }

    #[test]
    fn carry_out_of_the_top_digit_adds_a_single_one() {
        assert_eq!(sum("999999999999999999", "1"), "1000000000000000000");
        assert_eq!(sum("1", "999"), "1000");
        assert_eq!(sum("99", "99"), "198");
    }

    #[test]
    fn operands_of_different_lengths() {
        assert_eq!(sum("123456789", "11"), "123456800");
        assert_eq!(sum("11", "123456789"), "123456800");
    }

    #[test]
    fn exceeds_native_integer_range() {
        let max = u128::MAX.to_string();
        assert_eq!(
            sum(&max, &max),
            "680564733841876926926749214863536422910"
        );
    }

    #[test]
    fn sums_of_parsed_values_stay_canonical() {
        let operands = ["0", "1", "7", "9", "10", "99", "100", "999999", "1000001"];
        for a in operands {
            for b in operands {
                let total = sum(a, b);
                assert_eq!(
                    DigitString::parse(total.as_str()),
                    Ok(total.clone()),
                    "{a} + {b}"
                );
            }
        }
    }

    #[test]
    fn non_canonical_text_never_reaches_the_adder() {
        assert!("007".parse::<DigitString>().is_err());
        assert!("1a".parse::<DigitString>().is_err());
    }

    #[test]
    fn matches_native_addition() {
        let cases = [
            (0_u64, 0_u64),
            (7, 3),
            (18_446_744_073_709_551, 1),
            (4_294_967_295, 4_294_967_296),
            (u64::MAX / 2, u64::MAX / 2),
        ];
        for (a, b) in cases {
            let sum = &DigitString::from(a) + &DigitString::from(b);
            assert_eq!(sum.as_str(), (u128::from(a) + u128::from(b)).to_string());
        }
    }

    #[test]
    fn parse_rejects_non_canonical_text() {
        assert_eq!(DigitString::parse(""), Err(ParseDigitsError::Empty));
        assert_eq!(DigitString::parse("007"), Err(ParseDigitsError::LeadingZero));
        assert_eq!(
            "-1".parse::<DigitString>(),
            Err(ParseDigitsError::InvalidDigit {
                position: 0,
                found: '-'
            })
        );
        assert_eq!(
            DigitString::parse("12a"),
            Err(ParseDigitsError::InvalidDigit {
                position: 2,
                found: 'a'
            })
        );
        assert_eq!(DigitString::parse("0"), Ok(DigitString::zero()));
        assert_eq!(DigitString::parse("10").map(String::from), Ok("10".into()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trips_as_a_json_string() {
        let value = DigitString::parse("354224848179261915075").unwrap();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"354224848179261915075\"");
        assert_eq!(serde_json::from_str::<DigitString>(&json).unwrap(), value);
        assert!(serde_json::from_str::<DigitString>("\"0123\"").is_err());
    }
}
