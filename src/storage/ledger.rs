//! Credit ledger
//!
//! The ledger exposes two independent operations instead of one
//! transaction:
//!
//! - [`Ledger::reserve`] only reads the balance and answers whether it
//!   covers the cost. Nothing is held back.
//! - [`Ledger::debit`] subtracts the cost later, once a reply exists,
//!   clamping the balance at zero.
//!
//! Two requests from the same user can therefore both pass `reserve`
//! before either debits. The resulting overspend is bounded by the number
//! of in-flight requests and never shows up as a negative balance.

use super::{storage_err, SqliteStorage};
use crate::error::{CreditChatError, Result};
use anyhow::Context;
use rusqlite::{params, OptionalExtension};

/// Outcome of a quota pre-check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The balance covers the cost
    Allowed {
        /// Balance observed by the check
        balance: u32,
    },
    /// The balance is below the cost
    Denied {
        /// Balance observed by the check
        balance: u32,
    },
}

impl Reservation {
    /// Balance observed when the check ran
    pub fn balance(&self) -> u32 {
        match self {
            Self::Allowed { balance } | Self::Denied { balance } => *balance,
        }
    }

    /// Whether the check passed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Per-user credit balance
pub trait Ledger: Send + Sync {
    /// Check whether `user_id` can afford `cost` without changing anything
    fn reserve(&self, user_id: &str, cost: u32) -> Result<Reservation>;

    /// Subtract `cost`, flooring the balance at zero
    ///
    /// Returns the balance after the debit. Never raises the balance.
    fn debit(&self, user_id: &str, cost: u32) -> Result<u32>;
}

fn to_credits(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

impl Ledger for SqliteStorage {
    fn reserve(&self, user_id: &str, cost: u32) -> Result<Reservation> {
        let conn = self.connect()?;
        let credits: Option<i64> = conn
            .query_row(
                "SELECT credits FROM users WHERE id = ?",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read balance")
            .map_err(storage_err)?;

        let balance = to_credits(credits.ok_or_else(|| {
            CreditChatError::Storage(format!("No ledger entry for user {user_id}"))
        })?);

        if balance >= cost {
            Ok(Reservation::Allowed { balance })
        } else {
            Ok(Reservation::Denied { balance })
        }
    }

    fn debit(&self, user_id: &str, cost: u32) -> Result<u32> {
        let conn = self.connect()?;
        let remaining: Option<i64> = conn
            .query_row(
                "UPDATE users SET credits = MAX(credits - ?, 0) WHERE id = ? RETURNING credits",
                params![i64::from(cost), user_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to debit credits")
            .map_err(storage_err)?;

        let remaining = remaining.ok_or_else(|| {
            CreditChatError::Storage(format!("No ledger entry for user {user_id}"))
        })?;

        tracing::debug!(user_id, cost, remaining, "Debited credits");
        Ok(to_credits(remaining))
    }
}

impl SqliteStorage {
    /// Add purchased credits to a user's balance
    ///
    /// Stand-in for the external purchase collaborator; the generation path
    /// never calls this.
    pub fn grant_credits(&self, user_id: &str, amount: u32) -> Result<u32> {
        let conn = self.connect()?;
        let balance: Option<i64> = conn
            .query_row(
                "UPDATE users SET credits = credits + ? WHERE id = ? RETURNING credits",
                params![i64::from(amount), user_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to grant credits")
            .map_err(storage_err)?;

        let balance = balance
            .ok_or_else(|| CreditChatError::Storage(format!("Unknown user {user_id}")))?;
        tracing::info!(user_id, amount, balance, "Granted credits");
        Ok(to_credits(balance))
    }
}
