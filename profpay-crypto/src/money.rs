//! Fixed-scale money type for dues and stipend amounts.
//!
//! Stored and sealed as a canonical two-decimal string ("1234.50", no
//! locale formatting, no thousands separators), held in memory as minor
//! units to keep arithmetic exact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A monetary amount with a fixed scale of two decimal places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    /// Minor units (e.g. kopeks). `1050` is `10.50`.
    minor: i64,
}

impl Money {
    pub fn from_minor_units(minor: i64) -> Self {
        Self { minor }
    }

    pub fn minor_units(&self) -> i64 {
        self.minor
    }
}

impl fmt::Display for Money {
    /// Canonical form: optional sign, integer part, '.', exactly two digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Error parsing a decimal money string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoneyError(pub String);

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid money value: {}", self.0)
    }
}

impl std::error::Error for ParseMoneyError {}

impl FromStr for Money {
    type Err = ParseMoneyError;

    /// Accepts `-?digits(.d{1,2})?`. Anything with more than two decimal
    /// places is rejected rather than rounded; the system only ever
    /// writes two.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoneyError(s.to_string());

        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (int_part, frac_part) = match rest.split_once('.') {
            Some((_, "")) => return Err(err()),
            Some((i, f)) => (i, f),
            None => (rest, ""),
        };

        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if frac_part.len() > 2 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let whole: i64 = int_part.parse().map_err(|_| err())?;
        let frac: i64 = if frac_part.is_empty() {
            0
        } else {
            // "5" means 50 minor units, "05" means 5
            let parsed: i64 = frac_part.parse().map_err(|_| err())?;
            if frac_part.len() == 1 {
                parsed * 10
            } else {
                parsed
            }
        };

        let minor = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(err)?;

        Ok(Self {
            minor: if negative { -minor } else { minor },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_display() {
        assert_eq!(Money::from_minor_units(1050).to_string(), "10.50");
        assert_eq!(Money::from_minor_units(5).to_string(), "0.05");
        assert_eq!(Money::from_minor_units(-70000).to_string(), "-700.00");
        assert_eq!(Money::from_minor_units(0).to_string(), "0.00");
    }

    #[test]
    fn parse_accepts_short_fractions() {
        assert_eq!("10.5".parse::<Money>().unwrap().minor_units(), 1050);
        assert_eq!("10".parse::<Money>().unwrap().minor_units(), 1000);
        assert_eq!("0.05".parse::<Money>().unwrap().minor_units(), 5);
        assert_eq!("-3.20".parse::<Money>().unwrap().minor_units(), -320);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "-", "1.234", "1,50", "abc", "1.", ".5", "1.5.0", "1e3"] {
            assert!(bad.parse::<Money>().is_err(), "should reject {bad:?}");
        }
    }

    #[test]
    fn display_parse_round_trip() {
        for minor in [0i64, 1, 99, 100, 12345, -12345, i64::MAX / 100] {
            let m = Money::from_minor_units(minor);
            let back: Money = m.to_string().parse().unwrap();
            assert_eq!(m, back);
        }
    }
}
