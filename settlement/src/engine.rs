//! Main settlement engine
//!
//! Orchestrates the repository, ledger rebuild, and debt simplification.
//! Balances are never stored; every read recomputes them from the full history.

use crate::{
    config::Config,
    netting::NettingEngine,
    types::*,
    Error, Result,
};
use chrono::Utc;
use ledger_core::{
    build_ledger, storage::open_repository, verify_conservation, Cents, Currency, Expense,
    ExpenseDraft, GroupHistory, GroupId, GroupRepository, GroupSnapshot, Member, MemberId,
    Metrics, NetBalance, Settlement,
};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Settlement engine
pub struct SettlementEngine {
    /// Persistence collaborator
    repository: Arc<dyn GroupRepository>,

    /// Netting engine
    netting: NettingEngine,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create new settlement engine backed by the configured repository
    pub fn new(config: Config) -> Result<Self> {
        let repository: Arc<dyn GroupRepository> = Arc::from(open_repository(&config.ledger)?);
        Self::with_repository(config, repository)
    }

    /// Create new settlement engine over an existing repository
    pub fn with_repository(config: Config, repository: Arc<dyn GroupRepository>) -> Result<Self> {
        let metrics =
            Metrics::new().map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;
        let netting = NettingEngine::new(config.netting.verify_plan);

        tracing::info!(
            service = %config.service_name,
            backend = ?config.ledger.storage.backend,
            "Settlement engine ready"
        );

        Ok(Self {
            repository,
            netting,
            metrics,
            config,
        })
    }

    /// Repository handle
    pub fn repository(&self) -> &Arc<dyn GroupRepository> {
        &self.repository
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a group with its initial roster
    pub async fn create_group(&self, group_id: &GroupId, members: Vec<Member>) -> Result<()> {
        let count = members.len();
        self.repository.create_group(group_id, members).await?;
        tracing::info!(group = %group_id, members = count, "Group created");
        Ok(())
    }

    /// Add a member to a group
    pub async fn add_member(&self, group_id: &GroupId, member: Member) -> Result<()> {
        let member_id = member.id.clone();
        self.repository.add_member(group_id, member).await?;
        tracing::info!(group = %group_id, member = %member_id, "Member added");
        Ok(())
    }

    /// Recompute balances and suggested transfers for a group
    pub async fn group_summary(&self, group_id: &GroupId) -> Result<GroupSummary> {
        let started = Instant::now();
        let history = self.repository.load_group_history(group_id).await?;
        let summary = self.summarize(&history)?;

        self.metrics.summaries_total.inc();
        self.metrics
            .suggestions_total
            .inc_by(summary.suggestions.len() as u64);
        self.metrics
            .recompute_duration
            .observe(started.elapsed().as_secs_f64());

        tracing::debug!(
            group = %group_id,
            expenses = history.expenses.len(),
            settlements = history.settlements.len(),
            suggestions = summary.suggestions.len(),
            "Group summary recomputed"
        );

        Ok(summary)
    }

    /// Compute the summary of an already loaded history
    pub fn summarize(&self, history: &GroupHistory) -> Result<GroupSummary> {
        let ledger = build_ledger(&history.expenses, &history.settlements)?;

        let mut balances = ledger.net_balances()?;
        // Roster members without activity still report a zero balance
        for member in &history.members {
            if !balances.iter().any(|b| b.member_id == member.id) {
                balances.push(NetBalance::new(member.id.clone()));
            }
        }
        balances.sort_by(|a, b| a.member_id.cmp(&b.member_id));

        verify_conservation(&balances)?;

        let suggestions = self.netting.simplify_debts(&balances)?;
        let stats = self.netting.summarize(&ledger, &balances, &suggestions);

        let currencies = history_currencies(history);
        if currencies.len() > 1 {
            tracing::warn!(
                group = %history.group_id,
                currencies = ?currencies,
                "Group mixes currencies; amounts are summed without conversion"
            );
        }

        Ok(GroupSummary {
            group_id: history.group_id.clone(),
            currencies,
            balances,
            suggestions,
            stats,
            computed_at: Utc::now(),
        })
    }

    /// Net balance of one member
    pub async fn member_balance(&self, group_id: &GroupId, member: &MemberId) -> Result<NetBalance> {
        let summary = self.group_summary(group_id).await?;
        summary.balance_of(member).cloned().ok_or_else(|| {
            Error::Ledger(ledger_core::Error::UnknownMember {
                group: group_id.to_string(),
                member: member.to_string(),
            })
        })
    }

    /// Validate and persist a new expense
    pub async fn add_expense(&self, draft: ExpenseDraft) -> Result<Expense> {
        let expense = Expense::create(draft)?;
        self.repository.record_expense(expense.clone()).await?;

        self.metrics.expenses_recorded.inc();
        tracing::info!(
            group = %expense.group_id,
            expense_id = %expense.expense_id,
            amount = expense.amount_cents,
            policy = %expense.policy,
            "Expense recorded"
        );

        Ok(expense)
    }

    /// Replace an existing expense in full, keeping its ID
    pub async fn replace_expense(&self, expense_id: Uuid, draft: ExpenseDraft) -> Result<Expense> {
        let expense = Expense::create_with_id(expense_id, draft)?;
        self.repository.replace_expense(expense.clone()).await?;

        tracing::info!(
            group = %expense.group_id,
            expense_id = %expense_id,
            amount = expense.amount_cents,
            "Expense replaced"
        );

        Ok(expense)
    }

    /// Delete an expense
    pub async fn delete_expense(&self, group_id: &GroupId, expense_id: Uuid) -> Result<()> {
        self.repository.delete_expense(group_id, expense_id).await?;
        tracing::info!(group = %group_id, expense_id = %expense_id, "Expense deleted");
        Ok(())
    }

    /// Record a direct payment between two members
    pub async fn record_settlement(
        &self,
        group_id: &GroupId,
        payer: MemberId,
        payee: MemberId,
        amount_cents: Cents,
        note: Option<String>,
    ) -> Result<Settlement> {
        let settlement = Settlement::new(group_id.clone(), payer, payee, amount_cents, note)?;
        self.repository.record_settlement(settlement.clone()).await?;

        self.metrics.settlements_recorded.inc();
        tracing::info!(
            group = %group_id,
            settlement_id = %settlement.settlement_id,
            payer = %settlement.payer,
            payee = %settlement.payee,
            amount = settlement.amount_cents,
            "Settlement recorded"
        );

        Ok(settlement)
    }

    /// Record a suggested transfer as a real settlement
    pub async fn record_suggestion(
        &self,
        group_id: &GroupId,
        suggestion: &SimplifiedSettlement,
        note: Option<String>,
    ) -> Result<Settlement> {
        self.record_settlement(
            group_id,
            suggestion.payer.clone(),
            suggestion.payee.clone(),
            suggestion.amount_cents,
            note,
        )
        .await
    }

    /// Delete a settlement
    pub async fn delete_settlement(&self, group_id: &GroupId, settlement_id: Uuid) -> Result<()> {
        self.repository
            .delete_settlement(group_id, settlement_id)
            .await?;
        tracing::info!(group = %group_id, settlement_id = %settlement_id, "Settlement deleted");
        Ok(())
    }

    /// Export a group's full history
    pub async fn export_snapshot(&self, group_id: &GroupId) -> Result<GroupSnapshot> {
        let history = self.repository.load_group_history(group_id).await?;
        tracing::info!(
            group = %group_id,
            expenses = history.expenses.len(),
            settlements = history.settlements.len(),
            "Group exported"
        );
        Ok(GroupSnapshot::new(history))
    }

    /// Import a snapshot, replacing any group with the same ID
    pub async fn import_snapshot(&self, snapshot: GroupSnapshot) -> Result<GroupId> {
        let history = snapshot.history;
        let group_id = history.group_id.clone();

        // Reject histories whose ledger cannot be rebuilt
        build_ledger(&history.expenses, &history.settlements)?;

        self.repository.import_history(history).await?;
        tracing::info!(group = %group_id, "Group imported");
        Ok(group_id)
    }
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("netting", &self.netting)
            .field("metrics", &self.metrics)
            .field("config", &self.config)
            .finish()
    }
}

/// Distinct currencies in order of first appearance
fn history_currencies(history: &GroupHistory) -> Vec<Currency> {
    let mut currencies = Vec::new();
    for expense in &history.expenses {
        if !currencies.contains(&expense.currency) {
            currencies.push(expense.currency);
        }
    }
    currencies
}
