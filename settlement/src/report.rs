//! Human-readable rendering of group summaries

use crate::types::GroupSummary;
use ledger_core::{Currency, GroupHistory, MemberId};
use std::fmt;

/// Render a summary as a plain-text report
///
/// Member names come from the roster when available; amounts are formatted
/// in the group's single currency, or `default_currency` when the history has
/// none or mixes several.
pub fn render_text(
    summary: &GroupSummary,
    history: &GroupHistory,
    default_currency: Currency,
) -> String {
    let currency = match summary.currencies.as_slice() {
        [single] => *single,
        _ => default_currency,
    };

    TextReport {
        summary,
        history,
        currency,
    }
    .to_string()
}

struct TextReport<'a> {
    summary: &'a GroupSummary,
    history: &'a GroupHistory,
    currency: Currency,
}

impl TextReport<'_> {
    fn name(&self, id: &MemberId) -> String {
        self.history
            .member(id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (summary, currency) = (self.summary, self.currency);

        writeln!(f, "Group {} ({})", summary.group_id, currency)?;
        writeln!(
            f,
            "{} expenses, {} settlements",
            self.history.expenses.len(),
            self.history.settlements.len()
        )?;
        writeln!(f)?;

        writeln!(f, "Balances:")?;
        for balance in &summary.balances {
            let state = if balance.is_creditor() {
                "is owed"
            } else if balance.is_debtor() {
                "owes"
            } else {
                "settled"
            };
            writeln!(
                f,
                "  {:<20} {:>14}  {}",
                self.name(&balance.member_id),
                currency.format_cents(balance.net_cents),
                state
            )?;
        }

        writeln!(f)?;
        if summary.suggestions.is_empty() {
            return writeln!(f, "Everyone is settled up.");
        }

        writeln!(f, "Suggested transfers:")?;
        for suggestion in &summary.suggestions {
            writeln!(
                f,
                "  {} pays {} {}",
                self.name(&suggestion.payer),
                self.name(&suggestion.payee),
                currency.format_cents(suggestion.amount_cents)
            )?;
        }
        writeln!(
            f,
            "{} transfers instead of {} ({:.1}% less money moved)",
            summary.stats.suggestion_count,
            summary.stats.gross_obligation_count,
            summary.stats.efficiency * 100.0
        )
    }
}
