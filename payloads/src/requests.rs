use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MemberId, PaymentMethod, SavingsCategory, TransactionType, UserId};

pub const DESCRIPTION_MAX_LEN: usize = 255;

/// A single posting against one member's savings account.
///
/// `transaction_type` must be deposit, withdrawal, or transfer; SHU
/// postings are created through [`DistributeShu`] only. `transfer_to` is
/// required exactly when the type is transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostTransaction {
    pub member_id: MemberId,
    pub transaction_type: TransactionType,
    pub category: SavingsCategory,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub transfer_to: Option<MemberId>,
    pub created_by: Option<UserId>,
}

/// One member's share of an SHU distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuAllocation {
    pub member_id: MemberId,
    pub amount: Decimal,
}

/// Post the yearly profit share to members' sukarela balances.
///
/// The caller computes the per-member amounts; this operation only posts
/// them. All allocations are applied as a single atomic unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributeShu {
    pub fiscal_year: i32,
    pub allocations: Vec<ShuAllocation>,
    pub description: Option<String>,
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAccount {
    pub member_id: MemberId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTransactions {
    pub member_id: MemberId,
    pub limit: i64,
    pub offset: i64,
}
