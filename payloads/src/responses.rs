use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Account, AccountId, Balances, MemberId, TransactionRecord};

/// Account state as returned to callers, with the derived total spelled
/// out so consumers don't have to recompute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_id: AccountId,
    pub member_id: MemberId,
    pub account_number: String,
    pub balances: Balances,
    pub total_balance: Decimal,
    pub created_at: Timestamp,
    pub last_transaction_at: Option<Timestamp>,
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id,
            member_id: account.member_id,
            account_number: account.account_number,
            balances: account.balances,
            total_balance: account.balances.total(),
            created_at: account.created_at,
            last_transaction_at: account.last_transaction_at,
        }
    }
}

/// The result of a successful posting: the updated source account and the
/// record(s) written for it (two for a transfer, one otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingReceipt {
    pub account: AccountInfo,
    pub records: Vec<TransactionRecord>,
}

/// Summary of an SHU distribution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuDistributionResult {
    pub recipient_count: usize,
    pub total_amount: Decimal,
}
