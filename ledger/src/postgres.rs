//! Relational backings for the account store and transaction journal.
//!
//! Both share one `PgPool`. `commit` wraps the balance updates and journal
//! inserts in a single database transaction, so a balance write is never
//! persisted without its journal entry. Writers are serialized by the
//! engine's account lock table; this backing assumes a single service
//! process in front of the database.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use tellercore_common::{AccountNumber, Money, RecordId, Result, TellerError, Timestamp};

use crate::account::{Account, AccountStatus};
use crate::journal::{TransactionJournal, TransactionKind, TransactionRecord};
use crate::store::AccountStore;

fn store_err(err: sqlx::Error) -> TellerError {
    TellerError::StoreUnavailable(err.to_string())
}

fn corrupt(what: &str) -> TellerError {
    TellerError::StoreUnavailable(format!("corrupt {what} in database row"))
}

/// Apply balance updates inside an open database transaction. Callers own
/// the transaction and decide what else joins the same atomic unit.
pub async fn apply_accounts(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    accounts: &[Account],
) -> Result<()> {
    for account in accounts {
        sqlx::query(
            "UPDATE accounts SET balance = $1, last_transaction = $2 \
             WHERE account_number = $3",
        )
        .bind(account.balance.to_decimal())
        .bind(account.last_transaction_at)
        .bind(account.account_number.as_str())
        .execute(&mut **tx)
        .await
        .map_err(store_err)?;
    }
    Ok(())
}

/// Append journal records inside an open database transaction.
pub async fn apply_records(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    records: &[TransactionRecord],
) -> Result<()> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, account_number, kind, amount, balance_before, balance_after,
                 timestamp, reference_id, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.account_number.as_str())
        .bind(record.kind.as_str())
        .bind(record.amount.to_decimal())
        .bind(record.balance_before.to_decimal())
        .bind(record.balance_after.to_decimal())
        .bind(record.timestamp)
        .bind(record.reference_id)
        .bind(&record.description)
        .execute(&mut **tx)
        .await
        .map_err(store_err)?;
    }
    Ok(())
}

/// Account store backed by Postgres.
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the accounts and transactions tables if they do not exist.
    pub async fn setup(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                account_number   TEXT PRIMARY KEY,
                balance          NUMERIC(15, 2) NOT NULL,
                status           TEXT NOT NULL,
                created_at       TIMESTAMPTZ NOT NULL,
                last_transaction TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id             UUID PRIMARY KEY,
                account_number TEXT NOT NULL REFERENCES accounts (account_number),
                kind           TEXT NOT NULL,
                amount         NUMERIC(15, 2) NOT NULL,
                balance_before NUMERIC(15, 2) NOT NULL,
                balance_after  NUMERIC(15, 2) NOT NULL,
                timestamp      TIMESTAMPTZ NOT NULL,
                reference_id   UUID,
                description    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transactions_account \
             ON transactions (account_number, timestamp DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    let number: String = row.try_get("account_number").map_err(store_err)?;
    let balance: Decimal = row.try_get("balance").map_err(store_err)?;
    let status: String = row.try_get("status").map_err(store_err)?;
    let created_at: Timestamp = row.try_get("created_at").map_err(store_err)?;
    let last_transaction_at: Option<Timestamp> =
        row.try_get("last_transaction").map_err(store_err)?;

    Ok(Account {
        account_number: AccountNumber::parse(&number)
            .map_err(|_| corrupt("account number"))?,
        balance: Money::from_decimal(balance).map_err(|_| corrupt("balance"))?,
        status: AccountStatus::parse(&status).ok_or_else(|| corrupt("status"))?,
        created_at,
        last_transaction_at,
    })
}

fn record_from_row(row: &PgRow) -> Result<TransactionRecord> {
    let id: Uuid = row.try_get("id").map_err(store_err)?;
    let number: String = row.try_get("account_number").map_err(store_err)?;
    let kind: String = row.try_get("kind").map_err(store_err)?;
    let amount: Decimal = row.try_get("amount").map_err(store_err)?;
    let balance_before: Decimal = row.try_get("balance_before").map_err(store_err)?;
    let balance_after: Decimal = row.try_get("balance_after").map_err(store_err)?;
    let timestamp: Timestamp = row.try_get("timestamp").map_err(store_err)?;
    let reference_id: Option<Uuid> = row.try_get("reference_id").map_err(store_err)?;
    let description: String = row.try_get("description").map_err(store_err)?;

    Ok(TransactionRecord {
        id: RecordId::from_uuid(id),
        account_number: AccountNumber::parse(&number)
            .map_err(|_| corrupt("account number"))?,
        kind: TransactionKind::parse(&kind).ok_or_else(|| corrupt("transaction kind"))?,
        amount: Money::from_decimal(amount).map_err(|_| corrupt("amount"))?,
        balance_before: Money::from_decimal(balance_before).map_err(|_| corrupt("balance"))?,
        balance_after: Money::from_decimal(balance_after).map_err(|_| corrupt("balance"))?,
        timestamp,
        reference_id,
        description,
    })
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get(&self, account_number: &AccountNumber) -> Result<Account> {
        let row = sqlx::query(
            "SELECT account_number, balance, status, created_at, last_transaction \
             FROM accounts WHERE account_number = $1",
        )
        .bind(account_number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        match row {
            Some(row) => account_from_row(&row),
            None => Err(TellerError::AccountNotFound(account_number.clone())),
        }
    }

    async fn exists(&self, account_number: &AccountNumber) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM accounts WHERE account_number = $1")
            .bind(account_number.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.is_some())
    }

    async fn put(&self, account: Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_number, balance, status, created_at, last_transaction)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_number) DO UPDATE
            SET balance = EXCLUDED.balance,
                status = EXCLUDED.status,
                last_transaction = EXCLUDED.last_transaction
            "#,
        )
        .bind(account.account_number.as_str())
        .bind(account.balance.to_decimal())
        .bind(account.status.as_str())
        .bind(account.created_at)
        .bind(account.last_transaction_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn commit(&self, accounts: &[Account], records: &[TransactionRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        apply_accounts(&mut tx, accounts).await?;
        apply_records(&mut tx, records).await?;
        tx.commit().await.map_err(store_err)
    }
}

/// Journal reads backed by the same transactions table `commit` writes.
pub struct PgJournal {
    pool: PgPool,
}

impl PgJournal {
    /// Create a journal over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionJournal for PgJournal {
    async fn append(&self, records: &[TransactionRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        apply_records(&mut tx, records).await?;
        tx.commit().await.map_err(store_err)
    }

    async fn query_by_account(
        &self,
        account_number: &AccountNumber,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(
            "SELECT id, account_number, kind, amount, balance_before, balance_after, \
                    timestamp, reference_id, description \
             FROM transactions WHERE account_number = $1 \
             ORDER BY timestamp DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(account_number.as_str())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(record_from_row).collect()
    }
}
