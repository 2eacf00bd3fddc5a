//! Postgres-backed savings store.
//!
//! Plan application runs in a single transaction. Accounts are locked with
//! `SELECT ... FOR UPDATE` in member-id order, so two concurrent postings
//! touching the same accounts cannot deadlock, and the expected-balance
//! check holds until commit.

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use payloads::{
    Account, AccountId, Balances, MemberId, PaymentMethod, SavingsCategory,
    TransactionId, TransactionRecord, TransactionType, UserId,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::{PostingPlan, SavingsStore, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database-level account struct that matches the savings_accounts table
/// schema.
#[derive(Debug, Clone, FromRow)]
struct DbAccount {
    id: AccountId,
    member_id: MemberId,
    account_number: String,
    pokok_balance: Decimal,
    wajib_balance: Decimal,
    sukarela_balance: Decimal,
    #[sqlx(try_from = "SqlxTs")]
    created_at: Timestamp,
    last_transaction_at: Option<SqlxTs>,
}

impl TryFrom<DbAccount> for Account {
    type Error = StoreError;

    fn try_from(db: DbAccount) -> Result<Self, Self::Error> {
        let last_transaction_at = db
            .last_transaction_at
            .map(Timestamp::try_from)
            .transpose()
            .map_err(|e| {
                StoreError::UnexpectedError(anyhow::anyhow!(
                    "invalid last_transaction_at: {e}"
                ))
            })?;

        Ok(Account {
            id: db.id,
            member_id: db.member_id,
            account_number: db.account_number,
            balances: Balances {
                pokok: db.pokok_balance,
                wajib: db.wajib_balance,
                sukarela: db.sukarela_balance,
            },
            created_at: db.created_at,
            last_transaction_at,
        })
    }
}

/// Database-level transaction struct that matches the savings_transactions
/// table schema.
#[derive(Debug, Clone, FromRow)]
struct DbTransaction {
    id: TransactionId,
    code: String,
    member_id: MemberId,
    transaction_type: TransactionType,
    category: SavingsCategory,
    amount: Decimal,
    balance_before: Decimal,
    balance_after: Decimal,
    payment_method: PaymentMethod,
    description: Option<String>,
    created_by: Option<UserId>,
    #[sqlx(try_from = "SqlxTs")]
    created_at: Timestamp,
}

impl From<DbTransaction> for TransactionRecord {
    fn from(db: DbTransaction) -> Self {
        TransactionRecord {
            id: db.id,
            code: db.code,
            member_id: db.member_id,
            transaction_type: db.transaction_type,
            category: db.category,
            amount: db.amount,
            balance_before: db.balance_before,
            balance_after: db.balance_after,
            payment_method: db.payment_method,
            description: db.description,
            created_by: db.created_by,
            created_at: db.created_at,
        }
    }
}

#[async_trait]
impl SavingsStore for PgStore {
    async fn account(
        &self,
        member_id: &MemberId,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, DbAccount>(
            "SELECT * FROM savings_accounts WHERE member_id = $1",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn open_account(
        &self,
        member_id: &MemberId,
        account_number: &str,
        now: Timestamp,
    ) -> Result<Account, StoreError> {
        let mut tx = self.pool.begin().await?;

        // ON CONFLICT makes provisioning idempotent: a concurrent first
        // posting for the same member creates exactly one account.
        sqlx::query(
            r#"
            INSERT INTO savings_accounts (member_id, account_number, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (member_id) DO NOTHING
            "#,
        )
        .bind(member_id)
        .bind(account_number)
        .bind(now.to_sqlx())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, DbAccount>(
            "SELECT * FROM savings_accounts WHERE member_id = $1",
        )
        .bind(member_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    async fn apply_posting(
        &self,
        plan: &PostingPlan,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock accounts in member-id order to prevent deadlocks between
        // concurrent multi-leg postings.
        let mut lock_order: Vec<_> = plan.legs.iter().collect();
        lock_order.sort_by_key(|leg| leg.member_id.0);

        for leg in &lock_order {
            let current: Account = sqlx::query_as::<_, DbAccount>(
                "SELECT * FROM savings_accounts WHERE member_id = $1 FOR UPDATE",
            )
            .bind(leg.member_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::AccountNotFound)?
            .try_into()?;

            if current.balances != leg.expected {
                return Err(StoreError::StaleBalance);
            }
        }

        // Records are inserted before the balance updates they explain.
        let mut records = Vec::with_capacity(plan.legs.len());
        for leg in &plan.legs {
            let row = sqlx::query_as::<_, DbTransaction>(
                r#"
                INSERT INTO savings_transactions (
                    code,
                    member_id,
                    transaction_type,
                    category,
                    amount,
                    balance_before,
                    balance_after,
                    payment_method,
                    description,
                    created_by,
                    created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
                "#,
            )
            .bind(&leg.record.code)
            .bind(leg.member_id)
            .bind(leg.record.transaction_type)
            .bind(leg.record.category)
            .bind(leg.record.amount)
            .bind(leg.record.balance_before)
            .bind(leg.record.balance_after)
            .bind(leg.record.payment_method)
            .bind(&leg.record.description)
            .bind(leg.record.created_by)
            .bind(plan.posted_at.to_sqlx())
            .fetch_one(&mut *tx)
            .await?;

            records.push(TransactionRecord::from(row));

            sqlx::query(
                r#"
                UPDATE savings_accounts
                SET pokok_balance = $1,
                    wajib_balance = $2,
                    sukarela_balance = $3,
                    total_balance = $4,
                    last_transaction_at = $5
                WHERE member_id = $6
                "#,
            )
            .bind(leg.updated.pokok)
            .bind(leg.updated.wajib)
            .bind(leg.updated.sukarela)
            .bind(leg.updated.total())
            .bind(plan.posted_at.to_sqlx())
            .bind(leg.member_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(records)
    }

    async fn transactions(
        &self,
        member_id: &MemberId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            r#"
            SELECT * FROM savings_transactions
            WHERE member_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(member_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }
}
