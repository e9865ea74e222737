//! Split calculator
//!
//! Converts an expense total and a split rule into per-participant owed
//! amounts in integer minor units.
//!
//! # Rounding
//!
//! Every policy reconstructs the total exactly:
//!
//! - **Equal**: `total / n` each, the first `total % n` participants (input
//!   order) receive one extra cent.
//! - **Percentage / Shares**: `floor(total * weight / Σweight)` each, the
//!   leftover cents go to the largest fractional remainders first, ties broken
//!   by input order (largest-remainder method).
//! - **Exact**: amounts are taken as given and must already sum to the total.
//!
//! ```text
//! 100 split equally among [A, B, C]   → A=34, B=33, C=33
//! 101 split 33% / 33% / 34%           → 33, 33, 35
//! ```

use crate::{
    types::{Cents, MemberId, Split, SplitPolicy},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Split policy together with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// Divide evenly
    Equal,
    /// Explicit amount per participant
    Exact(HashMap<MemberId, Cents>),
    /// Integer percentage per participant, summing to 100
    Percentage(HashMap<MemberId, i64>),
    /// Integer share weight per participant
    Shares(HashMap<MemberId, i64>),
}

impl SplitRule {
    /// Policy tag stored on the expense
    pub fn policy(&self) -> SplitPolicy {
        match self {
            SplitRule::Equal => SplitPolicy::Equal,
            SplitRule::Exact(_) => SplitPolicy::Exact,
            SplitRule::Percentage(_) => SplitPolicy::Percentage,
            SplitRule::Shares(_) => SplitPolicy::Shares,
        }
    }
}

/// Compute each participant's owed share of `total_cents`
///
/// The result has one entry per participant, in input order, and always sums
/// to `total_cents`.
pub fn compute_shares(
    total_cents: Cents,
    participants: &[MemberId],
    rule: &SplitRule,
) -> Result<Vec<Split>> {
    if participants.is_empty() {
        return Err(Error::InvalidPolicyParams(
            "Participant list is empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for participant in participants {
        if !seen.insert(participant) {
            return Err(Error::InvalidPolicyParams(format!(
                "Participant {} listed more than once",
                participant
            )));
        }
    }

    if total_cents < 0 {
        return Err(Error::InvalidPolicyParams(format!(
            "Total {} is negative",
            total_cents
        )));
    }

    let amounts = match rule {
        SplitRule::Equal => split_equal(total_cents, participants.len()),
        SplitRule::Exact(amounts) => {
            let amounts = params_in_order(participants, amounts, "amount")?;
            let sum: i128 = amounts.iter().copied().map(i128::from).sum();
            if sum != i128::from(total_cents) {
                return Err(Error::SplitMismatch {
                    expected: total_cents,
                    actual: i64::try_from(sum).unwrap_or(i64::MAX),
                });
            }
            amounts
        }
        SplitRule::Percentage(percentages) => {
            let percentages = params_in_order(participants, percentages, "percentage")?;
            let sum: i128 = percentages.iter().copied().map(i128::from).sum();
            if sum != 100 {
                return Err(Error::InvalidPolicyParams(format!(
                    "Percentages sum to {}, expected 100",
                    sum
                )));
            }
            allocate_largest_remainder(total_cents, &percentages)?
        }
        SplitRule::Shares(shares) => {
            let shares = params_in_order(participants, shares, "share")?;
            allocate_largest_remainder(total_cents, &shares)?
        }
    };

    Ok(participants
        .iter()
        .zip(amounts)
        .map(|(member_id, amount_cents)| Split {
            member_id: member_id.clone(),
            amount_cents,
        })
        .collect())
}

/// Distribute `total` proportionally to `weights` with the largest-remainder method
///
/// Weights must be non-negative with a positive sum. The result sums to
/// `total` exactly; leftover cents go to the largest fractional remainders,
/// ties resolved by position.
pub fn allocate_largest_remainder(total: Cents, weights: &[i64]) -> Result<Vec<Cents>> {
    if weights.iter().any(|w| *w < 0) {
        return Err(Error::InvalidPolicyParams(
            "Weights must not be negative".to_string(),
        ));
    }

    let weight_sum: i128 = weights.iter().copied().map(i128::from).sum();
    if weight_sum == 0 {
        return Err(Error::InvalidPolicyParams(
            "Weights sum to zero".to_string(),
        ));
    }

    let total_wide = i128::from(total);
    let mut amounts = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());

    for (index, weight) in weights.iter().enumerate() {
        let scaled = total_wide * i128::from(*weight);
        amounts.push(scaled.div_euclid(weight_sum));
        remainders.push((scaled.rem_euclid(weight_sum), index));
    }

    // Largest remainder first, earlier position wins ties
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let leftover = total_wide - amounts.iter().sum::<i128>();
    for (_, index) in remainders.iter().take(leftover as usize) {
        amounts[*index] += 1;
    }

    // Each amount lies between 0 and |total|, so it fits back into i64
    Ok(amounts.into_iter().map(|a| a as Cents).collect())
}

fn split_equal(total: Cents, count: usize) -> Vec<Cents> {
    let count = count as i64;
    let base = total / count;
    let remainder = total % count;

    (0..count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Resolve per-participant parameters in participant order
fn params_in_order(
    participants: &[MemberId],
    params: &HashMap<MemberId, i64>,
    kind: &str,
) -> Result<Vec<i64>> {
    let mut values = Vec::with_capacity(participants.len());

    for participant in participants {
        let value = params.get(participant).copied().ok_or_else(|| {
            Error::InvalidPolicyParams(format!("Missing {} for {}", kind, participant))
        })?;

        if value < 0 {
            return Err(Error::InvalidPolicyParams(format!(
                "Negative {} {} for {}",
                kind, value, participant
            )));
        }

        values.push(value);
    }

    if params.len() != participants.len() {
        let stray = params
            .keys()
            .find(|k| !participants.contains(k))
            .map(|k| k.to_string())
            .unwrap_or_default();
        return Err(Error::InvalidPolicyParams(format!(
            "{} given for non-participant {}",
            kind, stray
        )));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(ids: &[&str]) -> Vec<MemberId> {
        ids.iter().map(|id| MemberId::new(*id)).collect()
    }

    fn params(entries: &[(&str, i64)]) -> HashMap<MemberId, i64> {
        entries
            .iter()
            .map(|(id, value)| (MemberId::new(*id), *value))
            .collect()
    }

    fn amounts(splits: &[Split]) -> Vec<Cents> {
        splits.iter().map(|s| s.amount_cents).collect()
    }

    #[test]
    fn test_equal_split_remainder_goes_to_first() {
        let splits = compute_shares(100, &members(&["a", "b", "c"]), &SplitRule::Equal).unwrap();

        assert_eq!(amounts(&splits), vec![34, 33, 33]);
        assert_eq!(splits[0].member_id, MemberId::new("a"));
    }

    #[test]
    fn test_equal_split_two_cent_remainder() {
        let splits =
            compute_shares(302, &members(&["a", "b", "c", "d"]), &SplitRule::Equal).unwrap();
        assert_eq!(amounts(&splits), vec![76, 76, 75, 75]);
    }

    #[test]
    fn test_equal_split_of_zero() {
        let splits = compute_shares(0, &members(&["a", "b"]), &SplitRule::Equal).unwrap();
        assert_eq!(amounts(&splits), vec![0, 0]);
    }

    #[test]
    fn test_exact_split() {
        let rule = SplitRule::Exact(params(&[("a", 40), ("b", 60)]));
        let splits = compute_shares(100, &members(&["a", "b"]), &rule).unwrap();
        assert_eq!(amounts(&splits), vec![40, 60]);
    }

    #[test]
    fn test_exact_split_mismatch() {
        let rule = SplitRule::Exact(params(&[("a", 40), ("b", 50)]));
        let result = compute_shares(100, &members(&["a", "b"]), &rule);

        match result {
            Err(Error::SplitMismatch { expected, actual }) => {
                assert_eq!(expected, 100);
                assert_eq!(actual, 90);
            }
            other => panic!("expected SplitMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_percentage_split() {
        let rule = SplitRule::Percentage(params(&[("a", 33), ("b", 67)]));
        let splits = compute_shares(1000, &members(&["a", "b"]), &rule).unwrap();
        assert_eq!(amounts(&splits), vec![330, 670]);

        let rule = SplitRule::Percentage(params(&[("a", 50), ("b", 50)]));
        let splits = compute_shares(100, &members(&["a", "b"]), &rule).unwrap();
        assert_eq!(amounts(&splits), vec![50, 50]);
    }

    #[test]
    fn test_percentage_split_largest_remainder() {
        let rule = SplitRule::Percentage(params(&[("a", 33), ("b", 33), ("c", 34)]));
        let splits = compute_shares(101, &members(&["a", "b", "c"]), &rule).unwrap();
        assert_eq!(amounts(&splits), vec![33, 33, 35]);
    }

    #[test]
    fn test_percentage_must_sum_to_100() {
        let rule = SplitRule::Percentage(params(&[("a", 50), ("b", 40)]));
        let result = compute_shares(100, &members(&["a", "b"]), &rule);
        assert!(matches!(result, Err(Error::InvalidPolicyParams(_))));
    }

    #[test]
    fn test_shares_split() {
        let rule = SplitRule::Shares(params(&[("a", 2), ("b", 1)]));
        let splits = compute_shares(10, &members(&["a", "b"]), &rule).unwrap();
        assert_eq!(amounts(&splits), vec![7, 3]);

        let rule = SplitRule::Shares(params(&[("a", 1), ("b", 1), ("c", 1)]));
        let splits = compute_shares(1000, &members(&["a", "b", "c"]), &rule).unwrap();
        assert_eq!(amounts(&splits), vec![334, 333, 333]);
    }

    #[test]
    fn test_shares_zero_weight_participant() {
        let rule = SplitRule::Shares(params(&[("a", 0), ("b", 3)]));
        let splits = compute_shares(100, &members(&["a", "b"]), &rule).unwrap();
        assert_eq!(amounts(&splits), vec![0, 100]);
    }

    #[test]
    fn test_shares_must_not_sum_to_zero() {
        let rule = SplitRule::Shares(params(&[("a", 0), ("b", 0)]));
        let result = compute_shares(100, &members(&["a", "b"]), &rule);
        assert!(matches!(result, Err(Error::InvalidPolicyParams(_))));
    }

    #[test]
    fn test_invalid_params() {
        // Empty participants
        assert!(matches!(
            compute_shares(100, &[], &SplitRule::Equal),
            Err(Error::InvalidPolicyParams(_))
        ));

        // Duplicate participant
        assert!(matches!(
            compute_shares(100, &members(&["a", "a"]), &SplitRule::Equal),
            Err(Error::InvalidPolicyParams(_))
        ));

        // Negative total
        assert!(matches!(
            compute_shares(-1, &members(&["a"]), &SplitRule::Equal),
            Err(Error::InvalidPolicyParams(_))
        ));

        // Negative exact amount
        let rule = SplitRule::Exact(params(&[("a", 110), ("b", -10)]));
        assert!(matches!(
            compute_shares(100, &members(&["a", "b"]), &rule),
            Err(Error::InvalidPolicyParams(_))
        ));

        // Missing participant parameter
        let rule = SplitRule::Shares(params(&[("a", 1)]));
        assert!(matches!(
            compute_shares(100, &members(&["a", "b"]), &rule),
            Err(Error::InvalidPolicyParams(_))
        ));

        // Parameter for a non-participant
        let rule = SplitRule::Percentage(params(&[("a", 50), ("b", 25), ("z", 25)]));
        assert!(matches!(
            compute_shares(100, &members(&["a", "b"]), &rule),
            Err(Error::InvalidPolicyParams(_))
        ));
    }

    #[test]
    fn test_largest_remainder_apportionment() {
        // 34 cents apportioned 70/30
        assert_eq!(allocate_largest_remainder(34, &[70, 30]).unwrap(), vec![24, 10]);
        // 33 cents apportioned 70/30
        assert_eq!(allocate_largest_remainder(33, &[70, 30]).unwrap(), vec![23, 10]);
    }

    #[test]
    fn test_large_totals_do_not_overflow() {
        let rule = SplitRule::Shares(params(&[("a", i64::MAX), ("b", i64::MAX)]));
        let splits = compute_shares(i64::MAX, &members(&["a", "b"]), &rule).unwrap();
        let total: i128 = splits.iter().map(|s| i128::from(s.amount_cents)).sum();
        assert_eq!(total, i128::from(i64::MAX));
    }
}
