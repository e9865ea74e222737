//! Gross pairwise debt ledger
//!
//! The ledger is derived state: it is rebuilt from a group's full expense and
//! settlement history on every read, so there is no incremental state to keep
//! consistent.
//!
//! # Example
//!
//! ```text
//! Expense: 300 paid by A, split equally among A, B, C
//!
//! Ledger:
//!   B owes A: 100
//!   C owes A: 100
//!
//! Net balances:
//!   A: +200
//!   B: -100
//!   C: -100
//! ```
//!
//! Entries are gross flows: `A owes B` and `B owes A` may both be populated.
//! Use [`LedgerMatrix::bilateral_netted`] for the one-direction view.

use crate::{
    split::allocate_largest_remainder,
    types::{sum_cents, Cents, Expense, MemberId, NetBalance, Settlement},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Debtor → creditor → amount owed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMatrix {
    debts: BTreeMap<MemberId, BTreeMap<MemberId, Cents>>,

    /// Every member touched by the history, including fully settled ones
    members: BTreeSet<MemberId>,
}

impl LedgerMatrix {
    /// Create empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the ledger from a group's full history
    pub fn build(expenses: &[Expense], settlements: &[Settlement]) -> Result<Self> {
        let mut ledger = Self::new();

        for expense in expenses {
            ledger.apply_expense(expense)?;
        }

        for settlement in settlements {
            ledger.apply_settlement(settlement)?;
        }

        Ok(ledger)
    }

    /// Record every participant's share as a debt to the payer(s)
    ///
    /// With several payers a share is apportioned across them in proportion to
    /// their paid amounts (largest-remainder rounding), so the debts created
    /// for a participant sum exactly to their share.
    pub fn apply_expense(&mut self, expense: &Expense) -> Result<()> {
        expense.validate()?;

        for member in expense.members() {
            self.members.insert(member.clone());
        }

        let weights: Vec<i64> = expense.payers.iter().map(|p| p.paid_cents).collect();

        for split in &expense.splits {
            if split.amount_cents == 0 || expense.is_sole_payer(&split.member_id) {
                continue;
            }

            let portions = allocate_largest_remainder(split.amount_cents, &weights)?;
            for (payer, portion) in expense.payers.iter().zip(portions) {
                if payer.member_id != split.member_id {
                    self.add_debt(&split.member_id, &payer.member_id, portion)?;
                }
            }
        }

        Ok(())
    }

    /// Apply a payment from `payer` to `payee`
    ///
    /// Reduces `payer → payee` down to zero; any excess becomes a debt in the
    /// opposite direction (overpayment).
    pub fn apply_settlement(&mut self, settlement: &Settlement) -> Result<()> {
        settlement.validate()?;
        self.apply_payment(&settlement.payer, &settlement.payee, settlement.amount_cents)
    }

    /// Apply a hypothetical or recorded payment without record validation
    pub fn apply_payment(
        &mut self,
        payer: &MemberId,
        payee: &MemberId,
        amount: Cents,
    ) -> Result<()> {
        self.members.insert(payer.clone());
        self.members.insert(payee.clone());

        let outstanding = self.owed(payer, payee);
        if amount <= outstanding {
            self.set_debt(payer, payee, outstanding - amount);
            Ok(())
        } else {
            self.set_debt(payer, payee, 0);
            self.add_debt(payee, payer, amount - outstanding)
        }
    }

    /// Add to `debtor → creditor`
    ///
    /// Fails with `AmountOverflow` if the entry would leave the `i64` range;
    /// the ledger is left unchanged in that case.
    pub fn add_debt(
        &mut self,
        debtor: &MemberId,
        creditor: &MemberId,
        amount: Cents,
    ) -> Result<()> {
        if amount <= 0 || debtor == creditor {
            return Ok(());
        }

        let total = self.owed(debtor, creditor).checked_add(amount).ok_or_else(|| {
            Error::AmountOverflow(format!(
                "{} owes {} more than {} minor units",
                debtor,
                creditor,
                Cents::MAX
            ))
        })?;

        self.members.insert(debtor.clone());
        self.members.insert(creditor.clone());
        self.set_debt(debtor, creditor, total);
        Ok(())
    }

    fn set_debt(&mut self, debtor: &MemberId, creditor: &MemberId, amount: Cents) {
        if amount > 0 {
            self.debts
                .entry(debtor.clone())
                .or_default()
                .insert(creditor.clone(), amount);
            return;
        }

        // Prune zero entries
        if let Some(row) = self.debts.get_mut(debtor) {
            row.remove(creditor);
            if row.is_empty() {
                self.debts.remove(debtor);
            }
        }
    }

    /// Amount `debtor` owes `creditor` (gross)
    pub fn owed(&self, debtor: &MemberId, creditor: &MemberId) -> Cents {
        self.debts
            .get(debtor)
            .and_then(|row| row.get(creditor))
            .copied()
            .unwrap_or(0)
    }

    /// All non-zero entries as `(debtor, creditor, amount)`, ordered by debtor then creditor
    pub fn entries(&self) -> impl Iterator<Item = (&MemberId, &MemberId, Cents)> {
        self.debts.iter().flat_map(|(debtor, row)| {
            row.iter()
                .map(move |(creditor, amount)| (debtor, creditor, *amount))
        })
    }

    /// Number of non-zero debtor → creditor entries
    pub fn entry_count(&self) -> usize {
        self.debts.values().map(|row| row.len()).sum()
    }

    /// Sum of all gross obligations
    pub fn gross_total(&self) -> i128 {
        sum_cents(self.entries().map(|(_, _, amount)| amount))
    }

    /// Members appearing in the history
    pub fn members(&self) -> impl Iterator<Item = &MemberId> {
        self.members.iter()
    }

    /// Check whether the ledger holds no obligations
    pub fn is_empty(&self) -> bool {
        self.debts.is_empty()
    }

    /// Collapse reverse pairs so at most one direction remains per pair
    ///
    /// `A owes B 100` and `B owes A 80` become `A owes B 20`; equal flows cancel.
    pub fn bilateral_netted(&self) -> LedgerMatrix {
        let mut netted = LedgerMatrix {
            debts: BTreeMap::new(),
            members: self.members.clone(),
        };

        for (debtor, creditor, amount) in self.entries() {
            let reverse = self.owed(creditor, debtor);
            // Each pair is visited once, so nothing accumulates
            if amount > reverse {
                netted.set_debt(debtor, creditor, amount - reverse);
            }
        }

        netted
    }

    /// Derive each member's net position
    ///
    /// Fails with `AmountOverflow` when a member's gross totals exceed `i64`.
    pub fn net_balances(&self) -> Result<Vec<NetBalance>> {
        let mut positions: BTreeMap<&MemberId, NetBalance> = self
            .members
            .iter()
            .map(|m| (m, NetBalance::new(m.clone())))
            .collect();

        for (debtor, creditor, amount) in self.entries() {
            if let Some(position) = positions.get_mut(debtor) {
                position.add_obligation(amount, true)?;
            }
            if let Some(position) = positions.get_mut(creditor) {
                position.add_obligation(amount, false)?;
            }
        }

        Ok(positions.into_values().collect())
    }
}

/// Build the ledger matrix from a group's expenses and settlements
pub fn build_ledger(expenses: &[Expense], settlements: &[Settlement]) -> Result<LedgerMatrix> {
    LedgerMatrix::build(expenses, settlements)
}

/// Net balance per member, ordered by member ID
pub fn compute_net_balances(ledger: &LedgerMatrix) -> Result<Vec<NetBalance>> {
    ledger.net_balances()
}

/// Check the conservation law: net balances sum to exactly zero
pub fn verify_conservation(balances: &[NetBalance]) -> Result<()> {
    let total = sum_cents(balances.iter().map(|b| b.net_cents));
    if total != 0 {
        return Err(Error::InvariantViolation(format!(
            "Net balances sum to {} across {} members",
            total,
            balances.len()
        )));
    }
    Ok(())
}
