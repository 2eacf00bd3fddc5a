//! In-memory savings store.
//!
//! Implements the same contract as the Postgres store over a single mutex,
//! which serializes plan application. Used by the integration test harness
//! and for running the service without a database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use jiff::Timestamp;
use payloads::{
    Account, AccountId, Balances, MemberId, TransactionId, TransactionRecord,
};
use uuid::Uuid;

use super::{PostingPlan, SavingsStore, StoreError};

#[derive(Default)]
struct State {
    accounts: HashMap<MemberId, Account>,
    /// Append-only, in posting order.
    records: Vec<TransactionRecord>,
    codes: HashSet<String>,
    account_numbers: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record ever written, oldest first. Test-inspection helper.
    pub fn all_records(&self) -> Vec<TransactionRecord> {
        self.state.lock().unwrap().records.clone()
    }
}

#[async_trait]
impl SavingsStore for MemoryStore {
    async fn account(
        &self,
        member_id: &MemberId,
    ) -> Result<Option<Account>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.accounts.get(member_id).cloned())
    }

    async fn open_account(
        &self,
        member_id: &MemberId,
        account_number: &str,
        now: Timestamp,
    ) -> Result<Account, StoreError> {
        let mut state = self.state.lock().unwrap();

        // Idempotent under retry, like the ON CONFLICT path in Postgres.
        if let Some(existing) = state.accounts.get(member_id) {
            return Ok(existing.clone());
        }

        if !state.account_numbers.insert(account_number.to_string()) {
            return Err(StoreError::DuplicateAccountNumber);
        }

        let account = Account {
            id: AccountId(Uuid::new_v4()),
            member_id: *member_id,
            account_number: account_number.to_string(),
            balances: Balances::ZERO,
            created_at: now,
            last_transaction_at: None,
        };
        state.accounts.insert(*member_id, account.clone());

        Ok(account)
    }

    async fn apply_posting(
        &self,
        plan: &PostingPlan,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;

        // Verify every leg before mutating anything, so a failed plan has
        // no partial effects.
        let mut plan_codes = HashSet::new();
        for leg in &plan.legs {
            let account = state
                .accounts
                .get(&leg.member_id)
                .ok_or(StoreError::AccountNotFound)?;
            if account.balances != leg.expected {
                return Err(StoreError::StaleBalance);
            }
            if state.codes.contains(&leg.record.code)
                || !plan_codes.insert(leg.record.code.as_str())
            {
                return Err(StoreError::DuplicateTransactionCode);
            }
        }

        let mut created = Vec::with_capacity(plan.legs.len());
        for leg in &plan.legs {
            let account = state
                .accounts
                .get_mut(&leg.member_id)
                .ok_or(StoreError::AccountNotFound)?;

            let record = TransactionRecord {
                id: TransactionId(Uuid::new_v4()),
                code: leg.record.code.clone(),
                member_id: leg.member_id,
                transaction_type: leg.record.transaction_type,
                category: leg.record.category,
                amount: leg.record.amount,
                balance_before: leg.record.balance_before,
                balance_after: leg.record.balance_after,
                payment_method: leg.record.payment_method,
                description: leg.record.description.clone(),
                created_by: leg.record.created_by,
                created_at: plan.posted_at,
            };

            state.codes.insert(record.code.clone());
            state.records.push(record.clone());
            account.balances = leg.updated;
            account.last_transaction_at = Some(plan.posted_at);
            created.push(record);
        }

        Ok(created)
    }

    async fn transactions(
        &self,
        member_id: &MemberId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        let limit = usize::try_from(limit).unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(0);

        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.member_id == *member_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
