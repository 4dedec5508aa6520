//! Fixed-point treasury math
//!
//! Amounts are integer counts of the smallest unit, one coin being 10^18 units.
//! Every derived amount is truncated toward zero so a payout can never exceed
//! what the basis-point formula dictates.

use crate::errors::AmountParseError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Fractional digits carried by every amount
pub const DECIMALS: usize = 18;

/// Smallest units per coin
pub const UNIT: u128 = 1_000_000_000_000_000_000;

pub const BPS_DENOM: u128 = 10_000;
pub const HOUSE_EDGE_BPS: u128 = 250;
pub const WIN_MULTIPLIER_BPS: u128 = 9_750;

/// Minimum single-flip wager (0.01)
pub const MIN_BET: Amount = Amount(UNIT / 100);
/// Maximum single-flip wager (10)
pub const MAX_BET: Amount = Amount(10 * UNIT);

/// Double-flip wagers are bounded tighter than single flips: [0.05, 5]
pub const DOUBLE_FLIP_MIN_BET: Amount = Amount(5 * UNIT / 100);
pub const DOUBLE_FLIP_MAX_BET: Amount = Amount(5 * UNIT);
/// Two wins in a double flip pay the standard payout times 1.9
pub const DOUBLE_WIN_BONUS_BPS: u128 = 19_000;

pub const STREAK_BONUS_THRESHOLD: u32 = 3;
pub const STREAK_BONUS_STEP_BPS: u128 = 50;
pub const STREAK_BONUS_CAP_BPS: u128 = 500;

/// Non-negative monetary amount in smallest units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_smallest_unit(units: u128) -> Self {
        Amount(units)
    }

    pub const fn to_smallest_unit(self) -> u128 {
        self.0
    }

    /// Whole coins, for scale conversions from the display unit
    pub const fn from_coins(coins: u64) -> Self {
        Amount(coins as u128 * UNIT)
    }

    /// Whole coins contained in this amount, fractional part truncated
    pub const fn whole_coins(self) -> u128 {
        self.0 / UNIT
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `self × bps / 10000`, truncated.
    ///
    /// Split as `q·D + r` so the product never overflows for any amount.
    pub const fn apply_bps(self, bps: u128) -> Amount {
        let quotient = self.0 / BPS_DENOM;
        let remainder = self.0 % BPS_DENOM;
        Amount(quotient * bps + remainder * bps / BPS_DENOM)
    }

    /// Multiply by a fixed-point multiplier, truncated.
    pub const fn mul_multiplier(self, multiplier: Multiplier) -> Amount {
        self.apply_bps(multiplier.as_bps())
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

/// Saturating, like every other amount addition in the crate
impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        self.saturating_add(other)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, other: Amount) {
        *self = self.saturating_add(other);
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

fn write_fixed(f: &mut fmt::Formatter<'_>, negative: bool, units: u128) -> fmt::Result {
    let whole = units / UNIT;
    let frac = units % UNIT;
    let sign = if negative { "-" } else { "" };
    let text = if frac == 0 {
        format!("{}{}", sign, whole)
    } else {
        let digits = format!("{:018}", frac);
        format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    };
    f.pad(&text)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, false, self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountParseError::InvalidDigit(s.to_string()));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(AmountParseError::InvalidDigit(s.to_string()));
        }
        if frac.len() > DECIMALS {
            return Err(AmountParseError::TooManyDecimals(s.to_string()));
        }

        let overflow = || AmountParseError::Overflow(s.to_string());
        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| overflow())?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow((DECIMALS - frac.len()) as u32);
            frac.parse::<u128>().map_err(|_| overflow())? * scale
        };

        whole_units
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(overflow)
    }
}

// Amounts travel as decimal strings so exports never lose precision.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Signed amount, used for net profit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignedAmount(i128);

impl SignedAmount {
    pub const ZERO: SignedAmount = SignedAmount(0);

    /// `gain − cost`, saturating at the i128 range.
    pub fn difference(gain: Amount, cost: Amount) -> Self {
        let gain = i128::try_from(gain.0).unwrap_or(i128::MAX);
        let cost = i128::try_from(cost.0).unwrap_or(i128::MAX);
        SignedAmount(gain.saturating_sub(cost))
    }

    pub const fn to_smallest_unit(self) -> i128 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0 < 0, self.0.unsigned_abs())
    }
}

impl FromStr for SignedAmount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, magnitude) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let units = i128::try_from(magnitude.parse::<Amount>()?.0)
            .map_err(|_| AmountParseError::Overflow(s.to_string()))?;
        Ok(SignedAmount(if negative { -units } else { units }))
    }
}

impl Serialize for SignedAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SignedAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Fixed-point payout multiplier in basis points of unity (10000 = 1.0)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Multiplier(u128);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(BPS_DENOM);

    pub const fn from_bps(bps: u128) -> Self {
        Multiplier(bps)
    }

    pub const fn as_bps(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1 bps of unity is 10^14 smallest units
        write_fixed(f, false, self.0 * (UNIT / BPS_DENOM))
    }
}

/// House edge retained from a wager: `wager × 250 / 10000`
pub const fn house_edge_amount(wager: Amount) -> Amount {
    wager.apply_bps(HOUSE_EDGE_BPS)
}

/// Winnings paid on a winning flip: `wager × 9750 / 10000`
pub const fn win_payout(wager: Amount) -> Amount {
    wager.apply_bps(WIN_MULTIPLIER_BPS)
}

/// Amount booked as house-collected when a wager loses
pub fn house_take_on_loss(wager: Amount) -> Amount {
    wager.saturating_sub(house_edge_amount(wager))
}
