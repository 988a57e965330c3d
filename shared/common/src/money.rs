//! Monetary amounts in integer minor units
//!
//! Balances, reservations and transfer amounts are all exact fixed-point
//! values. Internally they are `i64` minor units (cents); the wire carries
//! the same integer. Arithmetic is checked so that no path can silently
//! overflow or drive a balance negative.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An exact monetary amount in minor units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor_units(units: i64) -> Self {
        Amount(units)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// True for amounts usable as a transfer value (strictly positive).
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Amount {
    fn from(units: i64) -> Self {
        Amount(units)
    }
}
