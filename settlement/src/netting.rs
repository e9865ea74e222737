//! Debt simplification
//!
//! Turns per-member net balances into a short list of transfers that settles
//! everyone.
//!
//! # Algorithm
//!
//! 1. Split members into net debtors and net creditors
//! 2. Repeatedly match the largest remaining debtor with the largest remaining creditor
//! 3. Transfer `min(debt, credit)`; whoever reaches zero leaves the pool
//!
//! Every step retires at least one member and the last step retires two, so a
//! group with `n` non-zero members needs at most `n - 1` transfers. Equal
//! amounts are broken by member ID ascending so the plan is reproducible.
//!
//! # Example
//!
//! ```text
//! Net balances:
//!   A: +$60 (creditor)
//!   B:   $0
//!   C: -$60 (debtor)
//!
//! Suggested transfers:
//!   C pays A: $60
//! ```

use crate::{
    types::{NettingStats, SimplifiedSettlement},
    Error, Result,
};
use ledger_core::{Cents, LedgerMatrix, MemberId, NetBalance};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// Netting engine
#[derive(Debug, Clone)]
pub struct NettingEngine {
    /// Re-apply every plan and require it to zero all balances
    verify_plan: bool,
}

impl Default for NettingEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NettingEngine {
    /// Create new netting engine
    pub fn new(verify_plan: bool) -> Self {
        Self { verify_plan }
    }

    /// Compute suggested transfers that bring every balance to zero
    pub fn simplify_debts(&self, balances: &[NetBalance]) -> Result<Vec<SimplifiedSettlement>> {
        // Max-heaps keyed by amount, then by smallest member ID
        let mut debtors: BinaryHeap<(Cents, Reverse<MemberId>)> = BinaryHeap::new();
        let mut creditors: BinaryHeap<(Cents, Reverse<MemberId>)> = BinaryHeap::new();
        let mut debit_total: i128 = 0;
        let mut credit_total: i128 = 0;

        for balance in balances {
            if balance.is_debtor() {
                let debt = balance.net_cents.checked_neg().ok_or_else(|| {
                    Error::Netting(format!("Balance of {} out of range", balance.member_id))
                })?;
                debit_total += i128::from(debt);
                debtors.push((debt, Reverse(balance.member_id.clone())));
            } else if balance.is_creditor() {
                credit_total += i128::from(balance.net_cents);
                creditors.push((balance.net_cents, Reverse(balance.member_id.clone())));
            }
        }

        if debit_total != credit_total {
            return Err(Error::Imbalance {
                debtors: debit_total,
                creditors: credit_total,
            });
        }

        let mut transfers = Vec::new();

        // Greedy matching: largest debtor pays largest creditor
        while let (Some((debt, Reverse(debtor))), Some((credit, Reverse(creditor)))) =
            (debtors.pop(), creditors.pop())
        {
            let amount = debt.min(credit);

            transfers.push(SimplifiedSettlement {
                payer: debtor.clone(),
                payee: creditor.clone(),
                amount_cents: amount,
            });

            if debt > amount {
                debtors.push((debt - amount, Reverse(debtor)));
            }
            if credit > amount {
                creditors.push((credit - amount, Reverse(creditor)));
            }
        }

        if self.verify_plan {
            verify_plan(balances, &transfers)?;
        }

        Ok(transfers)
    }

    /// Build netting statistics for a ledger and its suggested plan
    pub fn summarize(
        &self,
        ledger: &LedgerMatrix,
        balances: &[NetBalance],
        suggestions: &[SimplifiedSettlement],
    ) -> NettingStats {
        let gross_obligation_count = ledger.entry_count();
        let suggested_total: i128 = suggestions.iter().map(|s| i128::from(s.amount_cents)).sum();

        let mut stats = NettingStats {
            member_count: balances.iter().filter(|b| !b.is_settled()).count(),
            gross_obligation_count,
            gross_total: clamp_cents(ledger.gross_total()),
            suggestion_count: suggestions.len(),
            suggested_total: clamp_cents(suggested_total),
            transfers_eliminated: gross_obligation_count.saturating_sub(suggestions.len()),
            efficiency: 0.0,
        };
        stats.efficiency = stats.calculate_efficiency();

        stats
    }
}

/// Compute suggested transfers with plan verification enabled
pub fn simplify_debts(balances: &[NetBalance]) -> Result<Vec<SimplifiedSettlement>> {
    NettingEngine::default().simplify_debts(balances)
}

/// Residual balance per member after every suggestion is paid
pub fn apply_suggestions(
    balances: &[NetBalance],
    suggestions: &[SimplifiedSettlement],
) -> BTreeMap<MemberId, Cents> {
    let mut residual: BTreeMap<MemberId, Cents> = balances
        .iter()
        .map(|b| (b.member_id.clone(), b.net_cents))
        .collect();

    for suggestion in suggestions {
        // Paying moves the payer up and the payee down
        let payer = residual.entry(suggestion.payer.clone()).or_default();
        *payer = payer.saturating_add(suggestion.amount_cents);
        let payee = residual.entry(suggestion.payee.clone()).or_default();
        *payee = payee.saturating_sub(suggestion.amount_cents);
    }

    residual
}

/// Check that a plan brings every balance to exactly zero
pub fn verify_plan(balances: &[NetBalance], suggestions: &[SimplifiedSettlement]) -> Result<()> {
    if let Some(bad) = suggestions.iter().find(|s| s.amount_cents <= 0 || s.payer == s.payee) {
        return Err(Error::Netting(format!(
            "Invalid suggested transfer {} -> {} of {}",
            bad.payer, bad.payee, bad.amount_cents
        )));
    }

    let leftovers: Vec<String> = apply_suggestions(balances, suggestions)
        .into_iter()
        .filter(|(_, cents)| *cents != 0)
        .map(|(member, cents)| format!("{}={}", member, cents))
        .collect();

    if !leftovers.is_empty() {
        return Err(Error::Ledger(ledger_core::Error::InvariantViolation(format!(
            "Suggested plan leaves residual balances: {}",
            leftovers.join(", ")
        ))));
    }

    Ok(())
}

fn clamp_cents(amount: i128) -> Cents {
    Cents::try_from(amount).unwrap_or(Cents::MAX)
}
