//! Test harness for the savings API.
//!
//! Spawns the full HTTP server on an OS-assigned port, backed by the
//! in-memory store and (by default) mocked time, and hands back an
//! `APIClient` pointed at it. No external services are required.

use std::sync::Arc;

use api::Config;
use api::ledger::Ledger;
use api::store::memory::MemoryStore;
use api::telemetry;
use api::time::TimeSource;
use payloads::{
    MemberId, PaymentMethod, SavingsCategory, TransactionType, requests,
    responses,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use tracing_log::LogTracer;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

pub struct TestApp {
    #[allow(unused)]
    pub port: u16,
    pub client: payloads::APIClient,
    pub time_source: TimeSource,
    /// Direct handle on the backing store for invariant checks.
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Seed a member's balance with a cash deposit through the public API.
    pub async fn deposit(
        &self,
        member_id: MemberId,
        category: SavingsCategory,
        amount: Decimal,
    ) -> anyhow::Result<responses::PostingReceipt> {
        Ok(self
            .client
            .post_transaction(&deposit_request(member_id, category, amount))
            .await?)
    }
}

/// Mint a fresh member identity.
pub fn member() -> MemberId {
    MemberId(Uuid::new_v4())
}

pub fn deposit_request(
    member_id: MemberId,
    category: SavingsCategory,
    amount: Decimal,
) -> requests::PostTransaction {
    requests::PostTransaction {
        member_id,
        transaction_type: TransactionType::Deposit,
        category,
        amount,
        payment_method: PaymentMethod::Cash,
        description: None,
        transfer_to: None,
        created_by: None,
    }
}

pub fn withdrawal_request(
    member_id: MemberId,
    category: SavingsCategory,
    amount: Decimal,
) -> requests::PostTransaction {
    requests::PostTransaction {
        member_id,
        transaction_type: TransactionType::Withdrawal,
        category,
        amount,
        payment_method: PaymentMethod::Cash,
        description: None,
        transfer_to: None,
        created_by: None,
    }
}

pub fn transfer_request(
    member_id: MemberId,
    transfer_to: MemberId,
    category: SavingsCategory,
    amount: Decimal,
) -> requests::PostTransaction {
    requests::PostTransaction {
        member_id,
        transaction_type: TransactionType::Transfer,
        category,
        amount,
        payment_method: PaymentMethod::BankTransfer,
        description: None,
        transfer_to: Some(transfer_to),
        created_by: None,
    }
}

pub async fn spawn_app_on_port(port: u16) -> TestApp {
    let subscriber = telemetry::get_subscriber("error".into());
    let _ = LogTracer::init();
    let _ = subscriber.try_init();

    #[cfg(feature = "mock-time")]
    let time_source = TimeSource::new("2025-01-01T00:00:00Z".parse().unwrap());

    #[cfg(not(feature = "mock-time"))]
    let time_source = TimeSource::new();

    let store = Arc::new(MemoryStore::new());
    let ledger = Ledger::new(store.clone(), time_source.clone());

    let mut config = Config {
        database_url: String::new(), // in-memory store, no database
        ip: "127.0.0.1".into(),
        port,
        allowed_origins: vec!["*".to_string()],
    };

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let server = api::build(&mut config, ledger).await.unwrap();
    tokio::spawn(server);

    TestApp {
        port: config.port,
        client: payloads::APIClient {
            address: format!("http://127.0.0.1:{}", config.port),
            inner_client: client,
        },
        time_source,
        store,
    }
}

/// Use OS-assigned port for parallel testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_on_port(0).await
}

/// Assert that the result of an API action results in a specific status code.
pub fn assert_status_code<T>(
    result: Result<T, payloads::ClientError>,
    expected: StatusCode,
) {
    match result {
        Err(payloads::ClientError::APIError(code, _)) => {
            assert_eq!(code, expected)
        }
        _ => panic!("Expected APIError"),
    };
}
