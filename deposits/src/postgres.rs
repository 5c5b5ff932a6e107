//! Relational backing for the deposit store.
//!
//! Shares the service's `PgPool`. `commit` writes the deposit row, the
//! balance updates, and the journal records in a single database
//! transaction, so a credit or debit is never persisted without the deposit
//! state that justifies it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use tellercore_common::{AccountNumber, DepositId, Money, Result, TellerError, Timestamp};
use tellercore_ledger::account::Account;
use tellercore_ledger::journal::TransactionRecord;
use tellercore_ledger::postgres::{apply_accounts, apply_records};

use crate::deposit::{DepositStatus, TimeDeposit};
use crate::store::DepositStore;

fn store_err(err: sqlx::Error) -> TellerError {
    TellerError::StoreUnavailable(err.to_string())
}

fn corrupt(what: &str) -> TellerError {
    TellerError::StoreUnavailable(format!("corrupt {what} in database row"))
}

/// Deposit store backed by Postgres.
pub struct PgDepositStore {
    pool: PgPool,
}

impl PgDepositStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the time_deposits table if it does not exist.
    pub async fn setup(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS time_deposits (
                deposit_id      UUID PRIMARY KEY,
                account_number  TEXT NOT NULL REFERENCES accounts (account_number),
                principal       NUMERIC(15, 2) NOT NULL,
                duration_months INTEGER NOT NULL,
                interest_rate   NUMERIC(5, 4) NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL,
                maturity_at     TIMESTAMPTZ NOT NULL,
                status          TEXT NOT NULL,
                matured_at      TIMESTAMPTZ,
                final_amount    NUMERIC(15, 2)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_time_deposits_account \
             ON time_deposits (account_number, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }
}

fn deposit_from_row(row: &PgRow) -> Result<TimeDeposit> {
    let deposit_id: Uuid = row.try_get("deposit_id").map_err(store_err)?;
    let number: String = row.try_get("account_number").map_err(store_err)?;
    let principal: Decimal = row.try_get("principal").map_err(store_err)?;
    let duration_months: i32 = row.try_get("duration_months").map_err(store_err)?;
    let interest_rate: Decimal = row.try_get("interest_rate").map_err(store_err)?;
    let created_at: Timestamp = row.try_get("created_at").map_err(store_err)?;
    let maturity_at: Timestamp = row.try_get("maturity_at").map_err(store_err)?;
    let status: String = row.try_get("status").map_err(store_err)?;
    let matured_at: Option<Timestamp> = row.try_get("matured_at").map_err(store_err)?;
    let final_amount: Option<Decimal> = row.try_get("final_amount").map_err(store_err)?;

    Ok(TimeDeposit {
        deposit_id: DepositId::from_uuid(deposit_id),
        account_number: AccountNumber::parse(&number).map_err(|_| corrupt("account number"))?,
        principal: Money::from_decimal(principal).map_err(|_| corrupt("principal"))?,
        duration_months: u32::try_from(duration_months).map_err(|_| corrupt("duration"))?,
        interest_rate,
        created_at,
        maturity_at,
        status: DepositStatus::parse(&status).ok_or_else(|| corrupt("status"))?,
        matured_at,
        final_amount: final_amount
            .map(|d| Money::from_decimal(d).map_err(|_| corrupt("final amount")))
            .transpose()?,
    })
}

#[async_trait]
impl DepositStore for PgDepositStore {
    async fn get(&self, deposit_id: &DepositId) -> Result<TimeDeposit> {
        let row = sqlx::query(
            "SELECT deposit_id, account_number, principal, duration_months, interest_rate, \
                    created_at, maturity_at, status, matured_at, final_amount \
             FROM time_deposits WHERE deposit_id = $1",
        )
        .bind(deposit_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        match row {
            Some(row) => deposit_from_row(&row),
            None => Err(TellerError::DepositNotFound(*deposit_id)),
        }
    }

    async fn commit(
        &self,
        deposit: &TimeDeposit,
        accounts: &[Account],
        records: &[TransactionRecord],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        apply_accounts(&mut tx, accounts).await?;
        apply_records(&mut tx, records).await?;

        sqlx::query(
            r#"
            INSERT INTO time_deposits
                (deposit_id, account_number, principal, duration_months, interest_rate,
                 created_at, maturity_at, status, matured_at, final_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (deposit_id) DO UPDATE
            SET status = EXCLUDED.status,
                matured_at = EXCLUDED.matured_at,
                final_amount = EXCLUDED.final_amount
            "#,
        )
        .bind(deposit.deposit_id.as_uuid())
        .bind(deposit.account_number.as_str())
        .bind(deposit.principal.to_decimal())
        .bind(deposit.duration_months as i32)
        .bind(deposit.interest_rate)
        .bind(deposit.created_at)
        .bind(deposit.maturity_at)
        .bind(deposit.status.as_str())
        .bind(deposit.matured_at)
        .bind(deposit.final_amount.map(|m| m.to_decimal()))
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)
    }

    async fn list_by_account(&self, account_number: &AccountNumber) -> Result<Vec<TimeDeposit>> {
        let rows = sqlx::query(
            "SELECT deposit_id, account_number, principal, duration_months, interest_rate, \
                    created_at, maturity_at, status, matured_at, final_amount \
             FROM time_deposits WHERE account_number = $1 \
             ORDER BY created_at DESC",
        )
        .bind(account_number.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(deposit_from_row).collect()
    }
}
