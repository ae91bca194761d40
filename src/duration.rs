//! Durations written as `30s`, `1m30s` or `1.5h`.
//!
//! Stage flags accept signed durations so validation can reject a negative
//! value with a message instead of the parser failing on the sign.
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Errors from parsing a [`SignedDuration`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// The input is not a sequence of `<number><unit>` pairs.
    #[error("invalid duration {0:?}")]
    Invalid(String),

    /// A number was not followed by a unit.
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    /// A unit other than `ns`, `us`, `µs`, `ms`, `s`, `m` or `h`.
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit {
        /// The unrecognized unit.
        unit: String,
        /// The whole input.
        input: String,
    },

    /// The value does not fit in 64-bit nanoseconds.
    #[error("duration {0:?} is out of range")]
    Overflow(String),
}

/// A signed span of time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SignedDuration {
    nanos: i64,
}

impl SignedDuration {
    /// The zero duration.
    pub const ZERO: Self = Self { nanos: 0 };

    /// Build a duration from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    /// Build a duration from whole seconds, saturating on overflow.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self {
            nanos: secs.saturating_mul(NANOS_PER_SEC),
        }
    }

    /// Total nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.nanos
    }

    /// Whether the duration is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.nanos < 0
    }

    /// Whole seconds, truncated toward zero.
    #[must_use]
    pub const fn whole_seconds(self) -> i64 {
        self.nanos / NANOS_PER_SEC
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 60 * 60 * 1_000_000_000,
        _ => return None,
    })
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

impl FromStr for SignedDuration {
    type Err = DurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };
        if body == "0" {
            return Ok(Self::ZERO);
        }
        if body.is_empty() {
            return Err(DurationError::Invalid(input.to_string()));
        }

        let overflow = || DurationError::Overflow(input.to_string());
        let limit = u128::from(i64::MAX.unsigned_abs());
        let mut total: u128 = 0;
        let mut rest = body;
        while !rest.is_empty() {
            let (whole, after) = split_digits(rest);
            let (fraction, after) = match after.strip_prefix('.') {
                Some(tail) => split_digits(tail),
                None => ("", after),
            };
            if whole.is_empty() && fraction.is_empty() {
                return Err(DurationError::Invalid(input.to_string()));
            }

            let unit_end = after
                .find(|c: char| c == '.' || c.is_ascii_digit())
                .unwrap_or(after.len());
            let (unit, remainder) = after.split_at(unit_end);
            let scale = match unit_nanos(unit) {
                Some(scale) => scale,
                None if unit.is_empty() => {
                    return Err(DurationError::MissingUnit(input.to_string()));
                }
                None => {
                    return Err(DurationError::UnknownUnit {
                        unit: unit.to_string(),
                        input: input.to_string(),
                    });
                }
            };

            let whole: u128 = if whole.is_empty() {
                0
            } else {
                whole.parse().map_err(|_| overflow())?
            };
            let mut value = whole.checked_mul(scale).ok_or_else(overflow)?;

            if !fraction.is_empty() {
                // Digits past nanosecond precision of an hour cannot matter.
                let digits = fraction.get(..fraction.len().min(18)).unwrap_or(fraction);
                let numerator: u128 = digits.parse().map_err(|_| overflow())?;
                let denominator = digits.bytes().fold(1_u128, |acc, _| acc * 10);
                value += numerator * scale / denominator;
            }

            total = total.checked_add(value).ok_or_else(overflow)?;
            if total > limit {
                return Err(overflow());
            }
            rest = remainder;
        }

        let nanos = i64::try_from(total).map_err(|_| overflow())?;
        Ok(Self::from_nanos(if negative { -nanos } else { nanos }))
    }
}

impl fmt::Display for SignedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos % NANOS_PER_SEC == 0 {
            write!(f, "{}s", self.whole_seconds())
        } else {
            write!(f, "{}ns", self.nanos)
        }
    }
}

/// Formats a duration as a decimal count of whole seconds (`90`, not `1m30s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seconds(pub SignedDuration);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.whole_seconds())
    }
}
