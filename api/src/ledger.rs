//! The ledger poster: validates posting requests, computes replacement
//! balances, and persists the transaction record(s) and account state as
//! one unit of work.
//!
//! Validation is fail-fast: every business rule is checked before anything
//! is written. The store verifies at apply time that balances have not
//! moved since planning; on a conflict (or a generated-code collision) the
//! poster re-reads, re-plans, and retries a bounded number of times.

use std::collections::HashSet;
use std::sync::Arc;

use jiff::Timestamp;
use payloads::{
    Account, MemberId, PaymentMethod, SavingsCategory, TransactionRecord,
    TransactionType, requests,
    responses::{PostingReceipt, ShuDistributionResult},
};
use rust_decimal::Decimal;

use crate::codes;
use crate::store::{
    NewTransaction, PostingLeg, PostingPlan, SavingsStore, StoreError,
};
use crate::time::TimeSource;

/// How many times a posting is re-planned after a concurrent balance change
/// or an identifier collision before giving up.
const MAX_POSTING_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn SavingsStore>,
    time_source: TimeSource,
}

impl Ledger {
    pub fn new(store: Arc<dyn SavingsStore>, time_source: TimeSource) -> Self {
        Self { store, time_source }
    }

    /// Post a deposit, withdrawal, or transfer.
    ///
    /// Returns the updated source account together with the created
    /// record(s): one for a deposit or withdrawal, the debit and credit
    /// legs for a transfer.
    pub async fn post(
        &self,
        req: &requests::PostTransaction,
    ) -> Result<PostingReceipt, StoreError> {
        if req.amount <= Decimal::ZERO {
            return Err(StoreError::AmountMustBePositive);
        }
        check_description(&req.description)?;
        if req.transaction_type == TransactionType::Shu {
            return Err(StoreError::ShuRequiresDistribution);
        }
        if req.transaction_type == TransactionType::Transfer {
            let target =
                req.transfer_to.ok_or(StoreError::TransferTargetRequired)?;
            if target == req.member_id {
                return Err(StoreError::SelfTransfer);
            }
        }

        let posted_at = self.time_source.now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_post(req, posted_at).await {
                Err(e) if retryable(&e) && attempts < MAX_POSTING_ATTEMPTS => {
                    tracing::debug!(
                        attempt = attempts,
                        error = %e,
                        "posting conflict, re-planning"
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_post(
        &self,
        req: &requests::PostTransaction,
        posted_at: Timestamp,
    ) -> Result<PostingReceipt, StoreError> {
        let source = self.load_or_open(&req.member_id, posted_at).await?;

        let plan = match req.transaction_type {
            TransactionType::Deposit => PostingPlan {
                posted_at,
                legs: vec![plan_leg(
                    &source,
                    TransactionType::Deposit,
                    req.category,
                    req.amount,
                    codes::transaction_code(posted_at),
                    req.payment_method,
                    req.description.clone(),
                    req.created_by,
                )],
            },
            TransactionType::Withdrawal => {
                check_withdrawable(&source, req.category, req.amount)?;
                PostingPlan {
                    posted_at,
                    legs: vec![plan_leg(
                        &source,
                        TransactionType::Withdrawal,
                        req.category,
                        req.amount,
                        codes::transaction_code(posted_at),
                        req.payment_method,
                        req.description.clone(),
                        req.created_by,
                    )],
                }
            }
            TransactionType::Transfer => {
                // Presence and self-transfer were validated in post().
                let target_id =
                    req.transfer_to.ok_or(StoreError::TransferTargetRequired)?;

                // A transfer draws down the source like a withdrawal.
                check_withdrawable(&source, req.category, req.amount)?;

                // The target is never provisioned lazily; transferring to a
                // member who has not opened savings is a caller error.
                let target = self
                    .store
                    .account(&target_id)
                    .await?
                    .ok_or(StoreError::TransferTargetNotFound)?;

                let code = codes::transaction_code(posted_at);
                let debit = plan_leg(
                    &source,
                    TransactionType::Transfer,
                    req.category,
                    req.amount,
                    format!("{code}-OUT"),
                    req.payment_method,
                    Some(req.description.clone().unwrap_or_else(|| {
                        format!("Transfer to {}", target.account_number)
                    })),
                    req.created_by,
                );
                let credit = plan_leg(
                    &target,
                    TransactionType::Deposit,
                    req.category,
                    req.amount,
                    format!("{code}-IN"),
                    req.payment_method,
                    Some(format!("Transfer from {}", source.account_number)),
                    req.created_by,
                );
                PostingPlan {
                    posted_at,
                    legs: vec![debit, credit],
                }
            }
            TransactionType::Shu => {
                return Err(StoreError::ShuRequiresDistribution);
            }
        };

        let records = self.store.apply_posting(&plan).await?;

        Ok(PostingReceipt {
            account: account_after(source, &plan.legs[0], posted_at).into(),
            records,
        })
    }

    /// Post the yearly SHU profit share: one `shu`-typed sukarela deposit
    /// per allocation, applied as a single atomic unit of work.
    pub async fn distribute_shu(
        &self,
        req: &requests::DistributeShu,
    ) -> Result<ShuDistributionResult, StoreError> {
        check_description(&req.description)?;
        let mut seen = HashSet::new();
        for allocation in &req.allocations {
            if allocation.amount <= Decimal::ZERO {
                return Err(StoreError::AmountMustBePositive);
            }
            if !seen.insert(allocation.member_id) {
                return Err(StoreError::DuplicateRecipient);
            }
        }

        if req.allocations.is_empty() {
            return Ok(ShuDistributionResult {
                recipient_count: 0,
                total_amount: Decimal::ZERO,
            });
        }

        let posted_at = self.time_source.now();
        let total_amount: Decimal =
            req.allocations.iter().map(|a| a.amount).sum();

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_distribute_shu(req, posted_at).await {
                Err(e) if retryable(&e) && attempts < MAX_POSTING_ATTEMPTS => {
                    tracing::debug!(
                        attempt = attempts,
                        error = %e,
                        "distribution conflict, re-planning"
                    );
                }
                Err(e) => return Err(e),
                Ok(()) => {
                    return Ok(ShuDistributionResult {
                        recipient_count: req.allocations.len(),
                        total_amount,
                    });
                }
            }
        }
    }

    async fn try_distribute_shu(
        &self,
        req: &requests::DistributeShu,
        posted_at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut legs = Vec::with_capacity(req.allocations.len());
        for allocation in &req.allocations {
            let account =
                self.load_or_open(&allocation.member_id, posted_at).await?;
            let description = req
                .description
                .clone()
                .unwrap_or_else(|| format!("SHU {}", req.fiscal_year));
            legs.push(plan_leg(
                &account,
                TransactionType::Shu,
                SavingsCategory::Sukarela,
                allocation.amount,
                codes::transaction_code(posted_at),
                PaymentMethod::System,
                Some(description),
                req.created_by,
            ));
        }

        self.store
            .apply_posting(&PostingPlan { posted_at, legs })
            .await?;
        Ok(())
    }

    /// A member's account, or `AccountNotFound` if they have never posted.
    pub async fn account(
        &self,
        member_id: &MemberId,
    ) -> Result<Account, StoreError> {
        self.store
            .account(member_id)
            .await?
            .ok_or(StoreError::AccountNotFound)
    }

    /// A member's transaction history, newest first.
    pub async fn transactions(
        &self,
        member_id: &MemberId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.store
            .transactions(member_id, limit.max(0), offset.max(0))
            .await
    }

    /// Fetch the member's account, provisioning a zero-balance one on first
    /// use.
    async fn load_or_open(
        &self,
        member_id: &MemberId,
        now: Timestamp,
    ) -> Result<Account, StoreError> {
        if let Some(account) = self.store.account(member_id).await? {
            return Ok(account);
        }
        self.store
            .open_account(member_id, &codes::account_number(now), now)
            .await
    }
}

fn check_description(
    description: &Option<String>,
) -> Result<(), StoreError> {
    if description
        .as_ref()
        .is_some_and(|d| d.len() > requests::DESCRIPTION_MAX_LEN)
    {
        return Err(StoreError::FieldTooLong);
    }
    Ok(())
}

/// Conflicts that a fresh read-and-plan cycle can resolve.
fn retryable(e: &StoreError) -> bool {
    matches!(
        e,
        StoreError::StaleBalance
            | StoreError::DuplicateTransactionCode
            | StoreError::DuplicateAccountNumber
    )
}

/// Build one leg of a posting plan, snapshotting the affected category
/// balance before and after.
///
/// The caller is responsible for sufficiency checks; a debit leg here
/// assumes the funds are there.
#[allow(clippy::too_many_arguments)]
fn plan_leg(
    account: &Account,
    transaction_type: TransactionType,
    category: SavingsCategory,
    amount: Decimal,
    code: String,
    payment_method: PaymentMethod,
    description: Option<String>,
    created_by: Option<payloads::UserId>,
) -> PostingLeg {
    let balance_before = account.balances.amount(category);
    let balance_after = if transaction_type.is_credit() {
        balance_before + amount
    } else {
        balance_before - amount
    };

    PostingLeg {
        member_id: account.member_id,
        expected: account.balances,
        updated: account.balances.replacing(category, balance_after),
        record: NewTransaction {
            code,
            transaction_type,
            category,
            amount,
            balance_before,
            balance_after,
            payment_method,
            description,
            created_by,
        },
    }
}

/// Enforce the withdrawal rules: pokok is categorically non-withdrawable,
/// and the category balance must cover the amount. Applies to withdrawals
/// and to the source side of transfers.
fn check_withdrawable(
    account: &Account,
    category: SavingsCategory,
    amount: Decimal,
) -> Result<(), StoreError> {
    if category == SavingsCategory::Pokok {
        return Err(StoreError::PokokWithdrawalNotAllowed);
    }

    let available = account.balances.amount(category);
    if amount > available {
        return Err(StoreError::InsufficientFunds {
            category,
            available,
            requested: amount,
        });
    }

    Ok(())
}

/// The account as it stands once a leg has been applied.
fn account_after(
    mut account: Account,
    leg: &PostingLeg,
    posted_at: Timestamp,
) -> Account {
    account.balances = leg.updated;
    account.last_transaction_at = Some(posted_at);
    account
}
