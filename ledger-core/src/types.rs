//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (serde)
//! - Exact arithmetic (integer minor units for money, never floats)
//! - Immutability once recorded (replace or delete, never patch)

use crate::split::{compute_shares, SplitRule};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Money amount in integer minor units (cents)
pub type Cents = i64;

/// Member identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Create new member ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Create new group ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member ID
    pub id: MemberId,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,
}

impl Member {
    /// Create new member
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// ISO 4217 currency code
///
/// Carried as metadata only; amounts are never converted between currencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    #[default]
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// UAE Dirham
    AED,
    /// Indian Rupee
    INR,
    /// Japanese Yen
    JPY,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
            Currency::INR => "INR",
            Currency::JPY => "JPY",
        }
    }

    /// Parse from ISO code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "AED" => Some(Currency::AED),
            "INR" => Some(Currency::INR),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }

    /// Number of minor units per major unit, as a power of ten
    pub fn minor_units(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Render an amount of minor units as a major-unit string (`1234` → `"12.34"`)
    pub fn format_cents(&self, cents: Cents) -> String {
        Decimal::new(cents, self.minor_units()).to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Member who paid (part of) an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    /// Paying member
    pub member_id: MemberId,

    /// Amount paid
    pub paid_cents: Cents,
}

impl Payer {
    /// Create new payer entry
    pub fn new(member_id: impl Into<String>, paid_cents: Cents) -> Self {
        Self {
            member_id: MemberId::new(member_id),
            paid_cents,
        }
    }
}

/// Resolved share of an expense owed by one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Participant
    pub member_id: MemberId,

    /// Amount owed
    pub amount_cents: Cents,
}

/// Split policy tag stored on an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Even split, remainder to the first participants
    Equal,
    /// Explicit amount per participant
    Exact,
    /// Integer percentage per participant
    Percentage,
    /// Integer weight per participant
    Shares,
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitPolicy::Equal => "equal",
            SplitPolicy::Exact => "exact",
            SplitPolicy::Percentage => "percentage",
            SplitPolicy::Shares => "shares",
        };
        f.write_str(name)
    }
}

/// User input for a new expense, before splits are resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseDraft {
    /// Owning group
    pub group_id: GroupId,

    /// Title
    pub title: String,

    /// Total amount
    pub amount_cents: Cents,

    /// Currency (metadata)
    pub currency: Currency,

    /// Payers and their paid amounts
    pub payers: Vec<Payer>,

    /// Participants in split order
    pub participants: Vec<MemberId>,

    /// Split policy and parameters
    pub rule: SplitRule,
}

/// Shared cost logged by a group member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique expense ID (UUIDv7 for time-ordering)
    pub expense_id: Uuid,

    /// Owning group
    pub group_id: GroupId,

    /// Title
    pub title: String,

    /// Total amount
    pub amount_cents: Cents,

    /// Currency (metadata)
    pub currency: Currency,

    /// Payers and their paid amounts
    pub payers: Vec<Payer>,

    /// Participants in split order
    pub participants: Vec<MemberId>,

    /// Split policy tag
    pub policy: SplitPolicy,

    /// Resolved splits, one per participant in participant order
    pub splits: Vec<Split>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Create an expense from a draft, resolving splits with the split calculator
    pub fn create(draft: ExpenseDraft) -> Result<Self> {
        Self::create_with_id(Uuid::now_v7(), draft)
    }

    /// Create an expense with a caller-chosen ID (used for full replacement)
    pub fn create_with_id(expense_id: Uuid, draft: ExpenseDraft) -> Result<Self> {
        let splits = compute_shares(draft.amount_cents, &draft.participants, &draft.rule)?;

        let expense = Self {
            expense_id,
            group_id: draft.group_id,
            title: draft.title,
            amount_cents: draft.amount_cents,
            currency: draft.currency,
            payers: draft.payers,
            participants: draft.participants,
            policy: draft.rule.policy(),
            splits,
            created_at: Utc::now(),
        };

        expense.validate()?;
        Ok(expense)
    }

    /// Check record invariants
    ///
    /// Payer amounts and split amounts must each sum to the total exactly.
    pub fn validate(&self) -> Result<()> {
        if self.amount_cents < 0 {
            return Err(Error::InvalidExpense(format!(
                "Expense {} has negative amount {}",
                self.expense_id, self.amount_cents
            )));
        }

        if self.payers.is_empty() {
            return Err(Error::InvalidExpense(format!(
                "Expense {} has no payers",
                self.expense_id
            )));
        }

        let mut seen_payers = HashSet::new();
        for payer in &self.payers {
            if payer.paid_cents < 0 {
                return Err(Error::InvalidExpense(format!(
                    "Payer {} has negative paid amount",
                    payer.member_id
                )));
            }
            if !seen_payers.insert(&payer.member_id) {
                return Err(Error::InvalidExpense(format!(
                    "Payer {} listed more than once",
                    payer.member_id
                )));
            }
        }

        let paid = sum_cents(self.payers.iter().map(|p| p.paid_cents));
        if paid != i128::from(self.amount_cents) {
            return Err(Error::InvalidExpense(format!(
                "Payers sum to {}, expected {}",
                paid, self.amount_cents
            )));
        }

        if self.participants.is_empty() {
            return Err(Error::InvalidExpense(format!(
                "Expense {} has no participants",
                self.expense_id
            )));
        }

        if self.splits.len() != self.participants.len() {
            return Err(Error::InvalidExpense(format!(
                "Expense {} has {} splits for {} participants",
                self.expense_id,
                self.splits.len(),
                self.participants.len()
            )));
        }

        let mut seen_participants = HashSet::new();
        for (participant, split) in self.participants.iter().zip(&self.splits) {
            if !seen_participants.insert(participant) {
                return Err(Error::InvalidExpense(format!(
                    "Participant {} listed more than once",
                    participant
                )));
            }
            if &split.member_id != participant {
                return Err(Error::InvalidExpense(format!(
                    "Split for {} out of participant order (expected {})",
                    split.member_id, participant
                )));
            }
            if split.amount_cents < 0 {
                return Err(Error::InvalidExpense(format!(
                    "Split for {} is negative",
                    split.member_id
                )));
            }
        }

        let owed = sum_cents(self.splits.iter().map(|s| s.amount_cents));
        if owed != i128::from(self.amount_cents) {
            return Err(Error::InvalidExpense(format!(
                "Splits sum to {}, expected {}",
                owed, self.amount_cents
            )));
        }

        Ok(())
    }

    /// Whether `member` is the only payer of this expense
    pub fn is_sole_payer(&self, member: &MemberId) -> bool {
        self.payers.len() == 1 && &self.payers[0].member_id == member
    }

    /// Every member referenced by this expense
    pub fn members(&self) -> impl Iterator<Item = &MemberId> {
        self.payers
            .iter()
            .map(|p| &p.member_id)
            .chain(self.participants.iter())
    }
}

/// Real-world payment from one member to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Unique settlement ID
    pub settlement_id: Uuid,

    /// Owning group
    pub group_id: GroupId,

    /// Member who paid
    pub payer: MemberId,

    /// Member who received
    pub payee: MemberId,

    /// Amount paid (> 0)
    pub amount_cents: Cents,

    /// Free-text note
    #[serde(default)]
    pub note: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Create new settlement
    pub fn new(
        group_id: GroupId,
        payer: MemberId,
        payee: MemberId,
        amount_cents: Cents,
        note: Option<String>,
    ) -> Result<Self> {
        let settlement = Self {
            settlement_id: Uuid::now_v7(),
            group_id,
            payer,
            payee,
            amount_cents,
            note,
            created_at: Utc::now(),
        };

        settlement.validate()?;
        Ok(settlement)
    }

    /// Check record invariants
    pub fn validate(&self) -> Result<()> {
        if self.amount_cents <= 0 {
            return Err(Error::InvalidSettlement(
                "Amount must be positive".to_string(),
            ));
        }

        if self.payer == self.payee {
            return Err(Error::InvalidSettlement(format!(
                "Payer and payee are both {}",
                self.payer
            )));
        }

        Ok(())
    }
}

/// Full snapshot of a group as returned by the repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHistory {
    /// Group ID
    pub group_id: GroupId,

    /// Current members
    pub members: Vec<Member>,

    /// Expenses in recording order
    pub expenses: Vec<Expense>,

    /// Settlements in recording order
    pub settlements: Vec<Settlement>,
}

impl GroupHistory {
    /// Create empty history
    pub fn new(group_id: GroupId, members: Vec<Member>) -> Self {
        Self {
            group_id,
            members,
            expenses: Vec::new(),
            settlements: Vec::new(),
        }
    }

    /// Look up a member
    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    /// Check membership
    pub fn is_member(&self, id: &MemberId) -> bool {
        self.member(id).is_some()
    }

    /// Member IDs of the roster
    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }
}

/// Per-member position derived from the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetBalance {
    /// Member ID
    pub member_id: MemberId,

    /// Total this member owes others
    pub total_owed: Cents,

    /// Total others owe this member
    pub total_receivable: Cents,

    /// Net position (positive = the group owes them, negative = they owe the group)
    pub net_cents: Cents,
}

impl NetBalance {
    /// Create zero position
    pub fn new(member_id: MemberId) -> Self {
        Self {
            member_id,
            total_owed: 0,
            total_receivable: 0,
            net_cents: 0,
        }
    }

    /// Update position with an obligation
    ///
    /// Fails with `AmountOverflow` when a running total leaves the `i64` range.
    pub fn add_obligation(&mut self, amount: Cents, is_debtor: bool) -> Result<()> {
        let total = if is_debtor {
            &mut self.total_owed
        } else {
            &mut self.total_receivable
        };
        *total = total.checked_add(amount).ok_or_else(|| {
            Error::AmountOverflow(format!(
                "Position of {} exceeds {} minor units",
                self.member_id,
                Cents::MAX
            ))
        })?;

        // Both totals are non-negative, so the difference always fits
        self.net_cents = self.total_receivable - self.total_owed;
        Ok(())
    }

    /// Check if net debtor (owes money)
    pub fn is_debtor(&self) -> bool {
        self.net_cents < 0
    }

    /// Check if net creditor (is owed money)
    pub fn is_creditor(&self) -> bool {
        self.net_cents > 0
    }

    /// Check if fully settled
    pub fn is_settled(&self) -> bool {
        self.net_cents == 0
    }
}

/// Sum amounts without overflow
pub(crate) fn sum_cents(amounts: impl IntoIterator<Item = Cents>) -> i128 {
    amounts.into_iter().map(i128::from).sum()
}
