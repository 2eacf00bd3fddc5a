//! Storage layer for the savings ledger.
//!
//! ## Design Decisions
//!
//! ### Injected storage
//! - The Ledger Poster talks to storage through the [`SavingsStore`] trait
//!   rather than a concrete pool. [`postgres::PgStore`] backs production;
//!   [`memory::MemoryStore`] backs tests and local runs without a database.
//!
//! ### Posting plans
//! - Writes go through [`PostingPlan`]: the poster reads account state,
//!   computes the replacement balances and the log record(s), and hands the
//!   whole unit to the store. The store applies a plan atomically and only
//!   if every account's balances still equal the balances the plan was
//!   computed from; otherwise it reports [`StoreError::StaleBalance`] and
//!   the poster re-reads and re-plans. Concurrent postings against one
//!   account therefore serialize instead of losing updates.
//!
//! ### Audit ordering
//! - Within a plan application, each transaction record is written before
//!   the balance update it explains. A crash can lose a posting, but never
//!   leaves a balance change without its log entry.
//!
//! ### Uniqueness
//! - `code` and `account_number` carry storage-level uniqueness. Collisions
//!   of the random 4-digit suffixes surface as
//!   [`StoreError::DuplicateTransactionCode`] /
//!   [`StoreError::DuplicateAccountNumber`], which the poster treats as
//!   regenerate-and-retry.

use async_trait::async_trait;
use jiff::Timestamp;
use payloads::{
    Account, Balances, MemberId, PaymentMethod, SavingsCategory,
    TransactionRecord, TransactionType, UserId,
};
use rust_decimal::Decimal;

pub mod memory;
pub mod postgres;

/// A transaction record as it exists before the store assigns identity and
/// timestamp.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub code: String,
    pub transaction_type: TransactionType,
    pub category: SavingsCategory,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub created_by: Option<UserId>,
}

/// One account's share of a posting: the record to append and the balances
/// to write, plus the balances the computation was based on.
#[derive(Debug, Clone)]
pub struct PostingLeg {
    pub member_id: MemberId,
    /// Balances the plan was computed from. The store refuses to apply the
    /// leg if the stored balances no longer match.
    pub expected: Balances,
    /// Replacement balances after this posting.
    pub updated: Balances,
    pub record: NewTransaction,
}

/// A validated posting, ready to persist as one atomic unit of work.
///
/// Single-party postings carry one leg; a transfer carries the debit and
/// credit legs of both accounts; an SHU distribution carries one credit leg
/// per recipient.
#[derive(Debug, Clone)]
pub struct PostingPlan {
    pub posted_at: Timestamp,
    pub legs: Vec<PostingLeg>,
}

#[async_trait]
pub trait SavingsStore: Send + Sync {
    /// Fetch a member's account, if one has been provisioned.
    async fn account(
        &self,
        member_id: &MemberId,
    ) -> Result<Option<Account>, StoreError>;

    /// Provision a zero-balance account for a member.
    ///
    /// Idempotent under concurrent provisioning: if an account already
    /// exists for the member, it is returned unchanged and the proposed
    /// account number is discarded.
    async fn open_account(
        &self,
        member_id: &MemberId,
        account_number: &str,
        now: Timestamp,
    ) -> Result<Account, StoreError>;

    /// Apply a posting plan atomically: verify expected balances, append
    /// the transaction records, write the replacement balances.
    ///
    /// Returns the created records in leg order. Fails without any effect
    /// if a leg's account is missing, its balances moved since planning, or
    /// a transaction code is already taken.
    async fn apply_posting(
        &self,
        plan: &PostingPlan,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// A member's transaction history, newest first.
    async fn transactions(
        &self,
        member_id: &MemberId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Amount must be positive")]
    AmountMustBePositive,
    #[error("Savings account not found")]
    AccountNotFound,
    #[error(
        "Insufficient {category} balance. Available: {available}, \
         Requested: {requested}"
    )]
    InsufficientFunds {
        category: SavingsCategory,
        available: Decimal,
        requested: Decimal,
    },
    #[error("Pokok savings cannot be withdrawn")]
    PokokWithdrawalNotAllowed,
    #[error("Transfer requires a destination member")]
    TransferTargetRequired,
    #[error("Transfer destination account not found")]
    TransferTargetNotFound,
    #[error("Cannot transfer to the sending member")]
    SelfTransfer,
    #[error("SHU is posted through distribution, not direct posting")]
    ShuRequiresDistribution,
    #[error("Field too long")]
    FieldTooLong,
    #[error("Distribution lists the same member twice")]
    DuplicateRecipient,
    #[error("Account balances changed concurrently")]
    StaleBalance,
    #[error("Transaction code already exists")]
    DuplicateTransactionCode,
    #[error("Account number already exists")]
    DuplicateAccountNumber,
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.is_unique_violation()
        {
            return match db_err.constraint() {
                Some("savings_transactions_code_key") => {
                    StoreError::DuplicateTransactionCode
                }
                Some("savings_accounts_account_number_key") => {
                    StoreError::DuplicateAccountNumber
                }
                _ => StoreError::NotUnique(e),
            };
        }
        StoreError::Database(e)
    }
}
