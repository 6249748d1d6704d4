use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Amount in minor units (cents), stored as BIGINT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(i64);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MoneyError {
    #[error("A valid number is required.")]
    Invalid,

    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimals,

    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,

    #[error("Ensure that there are no more than 16 digits before the decimal point.")]
    TooLarge,
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(MoneyError::Negative);
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(MoneyError::Invalid);
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyError::Invalid);
        }
        if fraction.len() > 2 {
            return Err(MoneyError::TooManyDecimals);
        }
        if whole.trim_start_matches('0').len() > 16 {
            return Err(MoneyError::TooLarge);
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| MoneyError::TooLarge)?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| MoneyError::Invalid)? * 10,
            _ => fraction.parse().map_err(|_| MoneyError::Invalid)?,
        };

        Ok(Money(whole * 100 + fraction))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct MoneyVisitor;

impl<'de> de::Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative amount with at most two decimal places")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom(MoneyError::Invalid));
        }
        // Display yields the shortest round-tripping form, e.g. 299.5
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amounts() {
        assert_eq!("300".parse::<Money>().unwrap(), Money::from_cents(30_000));
        assert_eq!("299.5".parse::<Money>().unwrap(), Money::from_cents(29_950));
        assert_eq!("0.07".parse::<Money>().unwrap(), Money::from_cents(7));
        assert_eq!(".5".parse::<Money>().unwrap(), Money::from_cents(50));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!("12.345".parse::<Money>(), Err(MoneyError::TooManyDecimals));
        assert_eq!("-1".parse::<Money>(), Err(MoneyError::Negative));
        assert_eq!("abc".parse::<Money>(), Err(MoneyError::Invalid));
        assert_eq!(".".parse::<Money>(), Err(MoneyError::Invalid));
        assert_eq!("1e5".parse::<Money>(), Err(MoneyError::Invalid));
    }

    #[test]
    fn test_display_has_two_decimals() {
        assert_eq!(Money::from_cents(30_000).to_string(), "300.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_json_accepts_numbers_and_strings() {
        let from_int: Money = serde_json::from_str("300").unwrap();
        let from_float: Money = serde_json::from_str("280.25").unwrap();
        let from_str: Money = serde_json::from_str("\"250.00\"").unwrap();

        assert_eq!(from_int, Money::from_cents(30_000));
        assert_eq!(from_float, Money::from_cents(28_025));
        assert_eq!(from_str, Money::from_cents(25_000));
        assert!(serde_json::from_str::<Money>("true").is_err());
        assert!(serde_json::from_str::<Money>("-5").is_err());
    }

    #[test]
    fn test_json_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_cents(28_000)).unwrap();
        assert_eq!(json, "\"280.00\"");
    }
}
