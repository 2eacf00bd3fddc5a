//! Shared types for the Sinoman savings API.
//!
//! Identifier newtypes, the savings domain enums, and the request/response
//! payloads exchanged with the backend. The `use-sqlx` feature adds sqlx
//! derives so the `api` crate can bind these types directly in queries;
//! clients (tests, tooling) can depend on the crate without pulling in a
//! database driver.

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod api_client;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError, ok_body, ok_empty};

/// A cooperative member, the owning identity of a savings account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct MemberId(pub Uuid);

/// The staff user or system actor that initiated a posting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct UserId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct AccountId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct TransactionId(pub Uuid);

/// The three savings categories every account tracks separately.
///
/// Pokok is the one-time membership deposit and can never be withdrawn.
/// Wajib is the recurring mandatory deposit. Sukarela is voluntary savings,
/// freely depositable and withdrawable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "savings_category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SavingsCategory {
    Pokok,
    Wajib,
    Sukarela,
}

/// What a transaction record did to its category balance.
///
/// `Deposit` and `Shu` credit the balance; `Withdrawal` and `Transfer`
/// (the source leg) debit it. The destination leg of a transfer is recorded
/// as a `Deposit` on the receiving account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "savings_transaction_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Shu,
}

impl TransactionType {
    /// Whether this type credits (adds to) the affected category balance.
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit | Self::Shu)
    }
}

/// How the money moved at the teller window.
///
/// `System` marks postings generated internally (SHU distributions), which
/// have no external payment leg.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Qris,
    System,
}

/// The three category balances of an account.
///
/// The persisted total is always derived from these via [`Balances::total`];
/// it is never adjusted on its own.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct Balances {
    pub pokok: Decimal,
    pub wajib: Decimal,
    pub sukarela: Decimal,
}

impl Balances {
    pub const ZERO: Balances = Balances {
        pokok: Decimal::ZERO,
        wajib: Decimal::ZERO,
        sukarela: Decimal::ZERO,
    };

    pub fn total(&self) -> Decimal {
        self.pokok + self.wajib + self.sukarela
    }

    pub fn amount(&self, category: SavingsCategory) -> Decimal {
        match category {
            SavingsCategory::Pokok => self.pokok,
            SavingsCategory::Wajib => self.wajib,
            SavingsCategory::Sukarela => self.sukarela,
        }
    }

    /// A copy of these balances with `category` replaced by `amount`.
    pub fn replacing(
        &self,
        category: SavingsCategory,
        amount: Decimal,
    ) -> Balances {
        let mut out = *self;
        match category {
            SavingsCategory::Pokok => out.pokok = amount,
            SavingsCategory::Wajib => out.wajib = amount,
            SavingsCategory::Sukarela => out.sukarela = amount,
        }
        out
    }
}

/// A member's savings account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub member_id: MemberId,
    /// Human-readable number of the form `SAV-YYYYMM-NNNN`.
    pub account_number: String,
    pub balances: Balances,
    pub created_at: jiff::Timestamp,
    /// Timestamp of the most recent posting, if any.
    pub last_transaction_at: Option<jiff::Timestamp>,
}

/// One posted ledger entry. Append-only: corrections are new postings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Human-readable code of the form `TRX-YYYYMMDD-NNNN`; the two legs of
    /// a transfer share the code with `-OUT`/`-IN` suffixes.
    pub code: String,
    pub member_id: MemberId,
    pub transaction_type: TransactionType,
    pub category: SavingsCategory,
    pub amount: Decimal,
    /// The affected category balance immediately before this posting.
    pub balance_before: Decimal,
    /// The affected category balance immediately after this posting.
    pub balance_after: Decimal,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: jiff::Timestamp,
}
