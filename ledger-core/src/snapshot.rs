//! Group snapshot export format
//!
//! A self-contained JSON document holding a group's roster and full history.
//! Clients that cache a group offline read and write this format instead of
//! depending on any particular storage layout.

use crate::{types::GroupHistory, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current snapshot format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Versioned export of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    /// Format version
    pub format_version: u32,

    /// Export timestamp
    pub exported_at: DateTime<Utc>,

    /// Group contents
    pub history: GroupHistory,
}

impl GroupSnapshot {
    /// Wrap a history for export
    pub fn new(history: GroupHistory) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            exported_at: Utc::now(),
            history,
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: GroupSnapshot = serde_json::from_str(json)?;

        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::Other(format!(
                "Unsupported snapshot format version {} (expected {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        snapshot.history.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SplitRule;
    use crate::types::{Currency, Expense, ExpenseDraft, GroupId, Member, MemberId, Payer};
    use std::collections::HashMap;

    fn history() -> GroupHistory {
        let group_id = GroupId::new("ski-trip");
        let mut history = GroupHistory::new(
            group_id.clone(),
            vec![
                Member::new("ana", "Ana", "ana@example.com"),
                Member::new("ben", "Ben", "ben@example.com"),
            ],
        );

        let shares: HashMap<MemberId, i64> =
            [(MemberId::new("ana"), 2), (MemberId::new("ben"), 1)]
                .into_iter()
                .collect();

        history
            .insert_expense(
                Expense::create(ExpenseDraft {
                    group_id,
                    title: "Lift passes".to_string(),
                    amount_cents: 9_000,
                    currency: Currency::EUR,
                    payers: vec![Payer::new("ana", 9_000)],
                    participants: vec![MemberId::new("ana"), MemberId::new("ben")],
                    rule: SplitRule::Shares(shares),
                })
                .unwrap(),
            )
            .unwrap();

        history
    }

    #[test]
    fn test_snapshot_json_preserves_history() {
        let snapshot = GroupSnapshot::new(history());
        let json = snapshot.to_json().unwrap();

        let restored = GroupSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.history.expenses[0].splits[0].amount_cents, 6_000);
    }

    #[test]
    fn test_snapshot_rejects_unknown_version() {
        let mut snapshot = GroupSnapshot::new(history());
        snapshot.format_version = 99;
        let json = snapshot.to_json().unwrap();

        assert!(GroupSnapshot::from_json(&json).is_err());
    }

    #[test]
    fn test_snapshot_rejects_invalid_history() {
        let mut snapshot = GroupSnapshot::new(history());
        snapshot.history.expenses[0].amount_cents += 1;
        let json = snapshot.to_json().unwrap();

        assert!(GroupSnapshot::from_json(&json).is_err());
    }
}
