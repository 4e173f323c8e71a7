//! Credit ledger — per-organization send budget.
//!
//! One credit is consumed per outbound message attempt; failed sends are not
//! refunded. The debit is a single conditional UPDATE so concurrent dispatches
//! for the same organization cannot race the balance below zero.

use sqlx::PgPool;
use uuid::Uuid;

use roster_common::error::AppError;

pub struct CreditLedger;

impl CreditLedger {
    /// Current balance for an organization. Missing row reads as zero.
    pub async fn balance(pool: &PgPool, org_id: Uuid) -> Result<i32, AppError> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT balance FROM credit_balances WHERE org_id = $1")
                .bind(org_id)
                .fetch_optional(pool)
                .await?;

        Ok(row.map(|(b,)| b).unwrap_or(0))
    }

    /// Atomically debit one credit. Returns `false` when the balance is
    /// already zero — the caller must halt further dispatch.
    pub async fn try_debit(pool: &PgPool, org_id: Uuid) -> Result<bool, AppError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE credit_balances
            SET balance = balance - 1, updated_at = NOW()
            WHERE org_id = $1 AND balance > 0
            RETURNING balance
            "#,
        )
        .bind(org_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.is_some())
    }

    /// Add credits (bundle purchase or monthly plan grant). Returns the new
    /// balance.
    pub async fn grant(pool: &PgPool, org_id: Uuid, amount: i32) -> Result<i32, AppError> {
        if amount <= 0 {
            return Err(AppError::Validation(
                "Credit grant amount must be positive".to_string(),
            ));
        }

        let (balance,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO credit_balances (org_id, balance)
            VALUES ($1, $2)
            ON CONFLICT (org_id) DO UPDATE
            SET balance = credit_balances.balance + $2, updated_at = NOW()
            RETURNING balance
            "#,
        )
        .bind(org_id)
        .bind(amount)
        .fetch_one(pool)
        .await?;

        tracing::info!(org_id = %org_id, amount, balance, "Credits granted");

        Ok(balance)
    }
}
