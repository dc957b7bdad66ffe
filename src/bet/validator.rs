//! Anti-cheat validation and total-stake computation.
//!
//! Both functions are pure. [`compute_total_stake`] trusts the grouping
//! invariants that [`validate`] enforces, so callers must validate first.

use super::wager::{GroupedFamily, NumberBet, Wager};

/// Reason a wager was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BetRejection {
    /// A grouped family's entry count is not a multiple of its group size.
    #[error("{family} must contain groups of {group_size}")]
    IncompleteGroup {
        /// Wire name of the offending family.
        family: &'static str,
        /// Expected group size.
        group_size: usize,
    },

    /// Entries within one group carry different amounts.
    #[error("{family} has unequal amounts within a group")]
    UnevenGroup {
        /// Wire name of the offending family.
        family: &'static str,
    },

    /// Both sides of a single-sided family were staked.
    #[error("{family} cannot cover both outcomes")]
    BothSides {
        /// Wire name of the offending family.
        family: &'static str,
    },

    /// An amount is zero, negative or not finite.
    #[error("stake amounts must be positive")]
    NonPositiveAmount,

    /// Every family is empty.
    #[error("no stakes placed")]
    NoStakes,

    /// The message carries no `bet` field.
    #[error("bet is missing")]
    Missing,

    /// The `bet` field does not decode into a wager.
    #[error("malformed bet: {0}")]
    Malformed(String),
}

/// Validates a wager, returning the first rule it breaks.
///
/// Rules, in order: grouped families form complete groups of equal amounts;
/// amounts are positive; no single-sided family (parity, color, half-range)
/// covers both outcomes; at least one family is non-empty.
///
/// # Errors
///
/// Returns the [`BetRejection`] describing the first failed rule.
pub fn validate(wager: &Wager) -> Result<(), BetRejection> {
    for family in GroupedFamily::ALL {
        check_groups(wager.grouped(family), family)?;
    }

    if wager.all_amounts().any(|amount| !(amount.is_finite() && amount > 0.0)) {
        return Err(BetRejection::NonPositiveAmount);
    }

    let single_sided = [
        ("even_odd", wager.even_odd.len()),
        ("color", wager.color.len()),
        ("chanceSimple", wager.chance_simple.len()),
    ];
    if let Some((family, _)) = single_sided.iter().find(|(_, len)| *len == 2) {
        return Err(BetRejection::BothSides { family });
    }

    if wager.is_empty() {
        return Err(BetRejection::NoStakes);
    }

    Ok(())
}

/// Returns `true` if the wager passes [`validate`].
#[must_use]
pub fn is_valid(wager: &Wager) -> bool {
    validate(wager).is_ok()
}

/// Computes the amount actually staked, rounded to two decimals.
///
/// Grouped families are charged once per group using the first entry of
/// each full window; a trailing partial window is ignored. Divisibility and
/// equal amounts are not re-checked here: run [`validate`] first.
#[must_use]
pub fn compute_total_stake(wager: &Wager) -> f64 {
    let grouped: f64 = GroupedFamily::ALL
        .iter()
        .map(|family| group_charge(wager.grouped(*family), family.group_size()))
        .sum();
    let per_entry: f64 = wager.per_entry_amounts().sum();
    round_cents(grouped + per_entry)
}

fn group_charge(entries: &[NumberBet], group_size: usize) -> f64 {
    entries
        .chunks_exact(group_size)
        .filter_map(|window| window.first())
        .map(|bet| bet.amount)
        .sum()
}

fn check_groups(entries: &[NumberBet], family: GroupedFamily) -> Result<(), BetRejection> {
    let group_size = family.group_size();
    if entries.len() % group_size != 0 {
        return Err(BetRejection::IncompleteGroup {
            family: family.field_name(),
            group_size,
        });
    }
    #[allow(clippy::float_cmp)]
    let uneven = entries.chunks_exact(group_size).any(|window| {
        window
            .first()
            .is_some_and(|first| window.iter().any(|bet| bet.amount != first.amount))
    });
    if uneven {
        return Err(BetRejection::UnevenGroup {
            family: family.field_name(),
        });
    }
    Ok(())
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
