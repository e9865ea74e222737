//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Exact splits: Σ(shares) == total for every policy
//! - Money conservation: Σ(net balances) == 0
//! - Deterministic replay: same history → same ledger
//! - Non-negative ledger entries

use ledger_core::{
    allocate_largest_remainder, build_ledger, compute_net_balances, compute_shares,
    verify_conservation, Cents, Currency, Expense, ExpenseDraft, GroupId, MemberId, Payer,
    Settlement, SplitRule,
};
use proptest::prelude::*;
use proptest::sample::subsequence;
use std::collections::HashMap;

const MEMBERS: [&str; 5] = ["ana", "ben", "cho", "dev", "eli"];

fn group() -> GroupId {
    GroupId::new("prop-group")
}

/// Strategy for non-empty, ordered participant lists
fn participants_strategy() -> impl Strategy<Value = Vec<MemberId>> {
    members_strategy(MEMBERS.len())
}

fn members_strategy(max: usize) -> impl Strategy<Value = Vec<MemberId>> {
    subsequence(MEMBERS.to_vec(), 1..=max)
        .prop_shuffle()
        .prop_map(|ids| ids.into_iter().map(MemberId::new).collect())
}

/// Strategy for split rules valid for the given participants
fn rule_strategy(participants: Vec<MemberId>, total: Cents) -> BoxedStrategy<SplitRule> {
    let n = participants.len();
    let for_shares = participants.clone();
    let for_percentages = participants.clone();
    let for_exact = participants;

    prop_oneof![
        Just(SplitRule::Equal),
        prop::collection::vec(1i64..20, n).prop_map(move |weights| {
            SplitRule::Shares(for_shares.iter().cloned().zip(weights).collect())
        }),
        prop::collection::vec(0i64..10, n)
            .prop_filter("weights must not all be zero", |w| w.iter().sum::<i64>() > 0)
            .prop_map(move |weights| {
                let pcts = allocate_largest_remainder(100, &weights).unwrap();
                SplitRule::Percentage(for_percentages.iter().cloned().zip(pcts).collect())
            }),
        prop::collection::vec(1i64..10, n).prop_map(move |weights| {
            let amounts = allocate_largest_remainder(total, &weights).unwrap();
            SplitRule::Exact(for_exact.iter().cloned().zip(amounts).collect())
        }),
    ]
    .boxed()
}

/// Strategy for valid expenses
fn expense_strategy() -> impl Strategy<Value = Expense> {
    expense_with_payers_strategy(MEMBERS.len())
}

fn expense_with_payers_strategy(max_payers: usize) -> impl Strategy<Value = Expense> {
    (0i64..100_000, participants_strategy(), members_strategy(max_payers))
        .prop_flat_map(|(total, participants, payer_ids)| {
            let n_payers = payer_ids.len();
            (
                Just(total),
                Just(participants.clone()),
                Just(payer_ids),
                prop::collection::vec(1i64..10, n_payers),
                rule_strategy(participants, total),
            )
        })
        .prop_map(|(total, participants, payer_ids, weights, rule)| {
            let paid = allocate_largest_remainder(total, &weights).unwrap();
            let payers = payer_ids
                .iter()
                .zip(paid)
                .map(|(id, cents)| Payer {
                    member_id: id.clone(),
                    paid_cents: cents,
                })
                .collect();

            Expense::create(ExpenseDraft {
                group_id: group(),
                title: "generated".to_string(),
                amount_cents: total,
                currency: Currency::USD,
                payers,
                participants,
                rule,
            })
            .unwrap()
        })
}

/// Strategy for valid settlements
fn settlement_strategy() -> impl Strategy<Value = Settlement> {
    (subsequence(MEMBERS.to_vec(), 2).prop_shuffle(), 1i64..50_000).prop_map(|(pair, amount)| {
        Settlement::new(
            group(),
            MemberId::new(pair[0]),
            MemberId::new(pair[1]),
            amount,
            None,
        )
        .unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: shares always sum to the total
    #[test]
    fn prop_shares_sum_to_total(
        (total, participants, rule) in (0i64..10_000_000, participants_strategy())
            .prop_flat_map(|(total, participants)| {
                (Just(total), Just(participants.clone()), rule_strategy(participants, total))
            })
    ) {
        let splits = compute_shares(total, &participants, &rule).unwrap();

        prop_assert_eq!(splits.len(), participants.len());
        prop_assert_eq!(splits.iter().map(|s| s.amount_cents).sum::<i64>(), total);
        for (split, participant) in splits.iter().zip(&participants) {
            prop_assert_eq!(&split.member_id, participant);
            prop_assert!(split.amount_cents >= 0);
        }
    }

    /// Property: equal shares differ by at most one cent, larger ones first
    #[test]
    fn prop_equal_split_is_order_stable(total in 0i64..1_000_000, participants in participants_strategy()) {
        let splits = compute_shares(total, &participants, &SplitRule::Equal).unwrap();
        let amounts: Vec<i64> = splits.iter().map(|s| s.amount_cents).collect();

        let max = *amounts.iter().max().unwrap();
        let min = *amounts.iter().min().unwrap();
        prop_assert!(max - min <= 1);

        let mut sorted = amounts.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        prop_assert_eq!(amounts, sorted);
    }

    /// Property: largest-remainder amounts stay within one cent of the exact quota
    #[test]
    fn prop_largest_remainder_within_one_cent(
        total in 0i64..1_000_000,
        weights in prop::collection::vec(0i64..1000, 1..8)
            .prop_filter("positive weight sum", |w| w.iter().sum::<i64>() > 0)
    ) {
        let amounts = allocate_largest_remainder(total, &weights).unwrap();
        let weight_sum: i128 = weights.iter().map(|w| i128::from(*w)).sum();

        prop_assert_eq!(amounts.iter().sum::<i64>(), total);
        for (amount, weight) in amounts.iter().zip(&weights) {
            let floor = (i128::from(total) * i128::from(*weight)) / weight_sum;
            let amount = i128::from(*amount);
            prop_assert!(amount == floor || amount == floor + 1);
        }
    }

    /// Property: net balances always sum to zero
    #[test]
    fn prop_money_conservation(
        expenses in prop::collection::vec(expense_strategy(), 0..15),
        settlements in prop::collection::vec(settlement_strategy(), 0..10),
    ) {
        let ledger = build_ledger(&expenses, &settlements).unwrap();
        let balances = compute_net_balances(&ledger).unwrap();

        prop_assert!(verify_conservation(&balances).is_ok());
        prop_assert_eq!(balances.iter().map(|b| b.net_cents).sum::<i64>(), 0);
        for (_, _, amount) in ledger.entries() {
            prop_assert!(amount > 0);
        }
    }

    /// Property: with single payers, net balance equals paid - owed + settlements sent - received
    #[test]
    fn prop_net_matches_cash_flows(
        expenses in prop::collection::vec(expense_with_payers_strategy(1), 1..10),
        settlements in prop::collection::vec(settlement_strategy(), 0..5),
    ) {
        let ledger = build_ledger(&expenses, &settlements).unwrap();
        let balances = compute_net_balances(&ledger).unwrap();

        let mut expected: HashMap<MemberId, i64> = HashMap::new();
        for expense in &expenses {
            for payer in &expense.payers {
                *expected.entry(payer.member_id.clone()).or_default() += payer.paid_cents;
            }
            for split in &expense.splits {
                *expected.entry(split.member_id.clone()).or_default() -= split.amount_cents;
            }
        }
        for settlement in &settlements {
            *expected.entry(settlement.payer.clone()).or_default() += settlement.amount_cents;
            *expected.entry(settlement.payee.clone()).or_default() -= settlement.amount_cents;
        }

        for balance in &balances {
            let want = expected.get(&balance.member_id).copied().unwrap_or(0);
            prop_assert_eq!(balance.net_cents, want, "member {}", balance.member_id);
        }
    }

    /// Property: rebuilding from the same history is deterministic
    #[test]
    fn prop_deterministic_replay(
        expenses in prop::collection::vec(expense_strategy(), 0..10),
        settlements in prop::collection::vec(settlement_strategy(), 0..10),
    ) {
        let first = build_ledger(&expenses, &settlements).unwrap();
        let second = build_ledger(&expenses, &settlements).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            compute_net_balances(&first).unwrap(),
            compute_net_balances(&second).unwrap()
        );
    }

    /// Property: bilateral netting never changes net positions
    #[test]
    fn prop_bilateral_netting_preserves_positions(
        expenses in prop::collection::vec(expense_strategy(), 0..10),
        settlements in prop::collection::vec(settlement_strategy(), 0..10),
    ) {
        let ledger = build_ledger(&expenses, &settlements).unwrap();
        let netted = ledger.bilateral_netted();

        prop_assert!(netted.gross_total() <= ledger.gross_total());
        let net: Vec<i64> = ledger.net_balances().unwrap().iter().map(|b| b.net_cents).collect();
        let netted_net: Vec<i64> = netted.net_balances().unwrap().iter().map(|b| b.net_cents).collect();
        prop_assert_eq!(net, netted_net);
    }
}
