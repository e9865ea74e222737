//! Core types for settlement engine

use chrono::{DateTime, Utc};
use ledger_core::{Cents, Currency, GroupId, MemberId, NetBalance};
use serde::{Deserialize, Serialize};

/// Suggested transfer that settles part of the group's debts
///
/// Not persisted; the caller may record it as a real settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedSettlement {
    /// Member who should pay
    pub payer: MemberId,

    /// Member who should receive
    pub payee: MemberId,

    /// Amount to transfer (> 0)
    pub amount_cents: Cents,
}

/// Result of reading a group's balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group ID
    pub group_id: GroupId,

    /// Currencies seen in the history (metadata, never converted)
    pub currencies: Vec<Currency>,

    /// Net balance per member, ordered by member ID
    pub balances: Vec<NetBalance>,

    /// Suggested settling transfers
    pub suggestions: Vec<SimplifiedSettlement>,

    /// Netting statistics
    pub stats: NettingStats,

    /// Computation timestamp
    pub computed_at: DateTime<Utc>,
}

impl GroupSummary {
    /// Net balance of one member
    pub fn balance_of(&self, member: &MemberId) -> Option<&NetBalance> {
        self.balances.iter().find(|b| &b.member_id == member)
    }

    /// Check whether every member is settled up
    pub fn is_settled(&self) -> bool {
        self.balances.iter().all(|b| b.is_settled())
    }
}

/// Netting statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NettingStats {
    /// Number of members with a position
    pub member_count: usize,

    /// Number of gross debtor → creditor obligations
    pub gross_obligation_count: usize,

    /// Total gross obligations
    pub gross_total: Cents,

    /// Number of suggested transfers
    pub suggestion_count: usize,

    /// Total of suggested transfers
    pub suggested_total: Cents,

    /// Number of transfers eliminated
    pub transfers_eliminated: usize,

    /// Netting efficiency (0.0 - 1.0)
    pub efficiency: f64,
}

impl NettingStats {
    /// Calculate netting efficiency
    pub fn calculate_efficiency(&self) -> f64 {
        if self.gross_total == 0 {
            return 0.0;
        }

        let netted = self.gross_total - self.suggested_total;
        netted as f64 / self.gross_total as f64
    }

    /// Calculate amount no longer needing to change hands
    pub fn calculate_savings(&self) -> Cents {
        self.gross_total - self.suggested_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netting_stats_efficiency() {
        let stats = NettingStats {
            member_count: 3,
            gross_obligation_count: 3,
            gross_total: 100_000,
            suggestion_count: 2,
            suggested_total: 30_000,
            transfers_eliminated: 1,
            efficiency: 0.0,
        };

        // Efficiency = (1000 - 300) / 1000 = 0.7
        assert!((stats.calculate_efficiency() - 0.7).abs() < 1e-9);
        assert_eq!(stats.calculate_savings(), 70_000);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(NettingStats::default().calculate_efficiency(), 0.0);
    }

    #[test]
    fn test_summary_lookup() {
        let mut creditor = NetBalance::new(MemberId::new("a"));
        creditor.add_obligation(50, false).unwrap();
        let mut debtor = NetBalance::new(MemberId::new("b"));
        debtor.add_obligation(50, true).unwrap();

        let summary = GroupSummary {
            group_id: GroupId::new("g"),
            currencies: vec![Currency::USD],
            balances: vec![creditor, debtor],
            suggestions: vec![],
            stats: NettingStats::default(),
            computed_at: Utc::now(),
        };

        assert_eq!(summary.balance_of(&MemberId::new("a")).unwrap().net_cents, 50);
        assert!(summary.balance_of(&MemberId::new("z")).is_none());
        assert!(!summary.is_settled());
    }
}
