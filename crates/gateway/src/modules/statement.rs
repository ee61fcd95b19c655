// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mini-statement: read the selected account slot, query upstream, format
//! up to five transactions, end the session.

use crate::menu::Step;
use crate::registry::Handler;
use crate::session::Slot;
use crate::state::AppState;
use crate::turn::Turn;

/// Transactions start at this tuple-segment offset in the backend reply.
const STATEMENT_OFFSET: usize = 10;
/// Segments per transaction: date, description, type, amount, balance.
const STATEMENT_STRIDE: usize = 5;
const STATEMENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatementEntry {
    date: String,
    description: String,
    kind: String,
    amount: String,
    balance: String,
}

/// Account selection feeding the `statement_account` slot.
pub struct SelectStatementAccount;

#[async_trait::async_trait]
impl Handler for SelectStatementAccount {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let accounts = turn.session.accounts().to_vec();
        if accounts.is_empty() {
            return Ok(Some(Step::retry(
                "main_menu",
                "NO_ACCOUNTS",
                "No accounts are linked to your profile.",
            )));
        }

        let Some(input) = input else {
            let mut text = String::from("Select account:");
            for (index, account) in accounts.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", index + 1, account));
            }
            return Ok(Some(Step::con(text)));
        };

        let selection = input.trim().parse::<usize>().ok();
        let Some(account) = selection
            .filter(|index| (1..=accounts.len()).contains(index))
            .map(|index| accounts[index - 1].clone())
        else {
            return Ok(Some(Step::retry(
                "statement_accounts",
                "VALIDATION_ERROR",
                "Invalid selection. Please try again.",
            )));
        };

        state.sessions.store(&turn.key, &Slot::StatementAccount, &account).await?;
        Ok(Some(Step::next("statement")))
    }
}

pub struct ProcessStatementRequest;

#[async_trait::async_trait]
impl Handler for ProcessStatementRequest {
    async fn handle(
        &self,
        _input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let account: Option<String> =
            state.sessions.grab(&turn.key, &Slot::StatementAccount).await?;
        let Some(account) = account else {
            return Ok(Some(Step::retry(
                "main_menu",
                "STATE_LOST",
                "Please select an account again.",
            )));
        };

        let customer_id = turn
            .session
            .customer_data
            .as_ref()
            .map(|c| c.customer_id.clone())
            .unwrap_or_else(|| "GUEST".to_owned());

        let envelope =
            state.upstream.mini_statement(&turn.key, &turn.session, &customer_id, &account).await;
        state.sessions.blank(&turn.key, &[Slot::StatementAccount]).await?;

        if !envelope.success {
            return Ok(Some(Step::retry(
                "main_menu",
                "API_ERROR",
                "Unable to retrieve your statement. Please try again later.",
            )));
        }

        let _ = state.sessions.increment_transaction_count(&turn.key).await?;
        let entries = parse_statement(&envelope.raw);
        Ok(Some(Step::end(format_statement(&account, &entries))))
    }
}

/// Walk the raw tuple segments positionally: each transaction occupies
/// [`STATEMENT_STRIDE`] segments starting at [`STATEMENT_OFFSET`].
fn parse_statement(raw: &str) -> Vec<StatementEntry> {
    let segments: Vec<&str> = raw.split(':').collect();
    let mut entries = Vec::new();

    for n in 0..STATEMENT_LIMIT {
        let start = STATEMENT_OFFSET + n * STATEMENT_STRIDE;
        if start + STATEMENT_STRIDE > segments.len() {
            break;
        }
        let field = |offset: usize| segments[start + offset].trim().to_owned();
        let entry = StatementEntry {
            date: field(0),
            description: field(1),
            kind: field(2),
            amount: field(3),
            balance: field(4),
        };
        if entry.date.is_empty() {
            break;
        }
        entries.push(entry);
    }
    entries
}

fn format_statement(account: &str, entries: &[StatementEntry]) -> String {
    if entries.is_empty() {
        return format!("No recent transactions on {account}.");
    }
    let mut text = format!("Mini statement for {account}:");
    for entry in entries {
        text.push_str(&format!(
            "\n{} {} {} {} Bal {}",
            entry.date, entry.description, entry.kind, entry.amount, entry.balance
        ));
    }
    text
}

#[cfg(test)]
#[path = "statement_tests.rs"]
mod tests;
