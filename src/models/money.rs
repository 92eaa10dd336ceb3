//! Currency amounts in integer cents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// An amount of money stored as cents
///
/// Income, expenses, debts and payments all use this type, so balances are
/// exact and serialize as plain integers (`1050` is $10.50).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude `parse` accepts: ten billion units
    pub const MAX: Money = Money(1_000_000_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `self`, or zero if negative
    pub fn at_least_zero(self) -> Self {
        Self(self.0.max(0))
    }

    /// Parse user input such as `12`, `12.5`, `$12.50` or `-3.05`
    ///
    /// More than two decimal places is rejected rather than rounded.
    pub fn parse(input: &str) -> Result<Self, MoneyParseError> {
        let invalid = || MoneyParseError::InvalidFormat(input.trim().to_string());

        let trimmed = input.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let unsigned = unsigned.strip_prefix('$').unwrap_or(unsigned).replace(',', "");

        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned.as_str(), ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 {
            return Err(MoneyParseError::TooPrecise(input.trim().to_string()));
        }

        let units: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let total = units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .ok_or_else(invalid)?;
        if total > Self::MAX.0 {
            return Err(MoneyParseError::TooLarge(input.trim().to_string()));
        }
        Ok(Self(if negative { -total } else { total }))
    }

    /// Render with a configurable currency symbol, e.g. `€12.50`
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}{}.{:02}", sign, symbol, abs / 100, abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with_symbol("$"))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Why an amount could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("Invalid amount: {0:?}")]
    InvalidFormat(String),

    #[error("Amount has more than two decimal places: {0:?}")]
    TooPrecise(String),

    #[error("Amount is too large: {0:?}")]
    TooLarge(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_forms() {
        assert_eq!(Money::parse("12").unwrap().cents(), 1200);
        assert_eq!(Money::parse("12.5").unwrap().cents(), 1250);
        assert_eq!(Money::parse(" $12.50 ").unwrap().cents(), 1250);
        assert_eq!(Money::parse("-3.05").unwrap().cents(), -305);
        assert_eq!(Money::parse(".75").unwrap().cents(), 75);
        assert_eq!(Money::parse("1,250.00").unwrap().cents(), 125000);
    }

    #[test]
    fn test_parse_rejections() {
        assert!(Money::parse("").is_err());
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("1.2.3").is_err());
        assert!(matches!(
            Money::parse("1.999"),
            Err(MoneyParseError::TooPrecise(_))
        ));
        assert!(matches!(
            Money::parse("92233720368547758"),
            Err(MoneyParseError::TooLarge(_))
        ));
        assert_eq!(Money::parse("10000000000").unwrap(), Money::MAX);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Money::from_cents(i64::MAX - 1);
        assert_eq!((huge + huge).cents(), i64::MAX);
        assert_eq!((-huge - huge).cents(), i64::MIN);
        let total: Money = [huge, huge, Money::from_cents(5)].iter().sum();
        assert_eq!(total.cents(), i64::MAX);
    }

    #[test]
    fn test_display_and_symbol() {
        assert_eq!(Money::from_cents(1050).to_string(), "$10.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
        assert_eq!(Money::from_cents(99900).format_with_symbol("€"), "€999.00");
    }

    #[test]
    fn test_sum_and_clamp() {
        let amounts = [Money::from_cents(100), Money::from_cents(250)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.cents(), 350);
        assert_eq!((Money::ZERO - total).at_least_zero(), Money::ZERO);
    }

    #[test]
    fn test_serializes_as_cents() {
        assert_eq!(serde_json::to_string(&Money::from_cents(1050)).unwrap(), "1050");
    }
}
