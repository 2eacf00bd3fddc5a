use jiff::Span;
use payloads::{SavingsCategory, requests};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use test_helpers::{
    assert_status_code, member, spawn_app, withdrawal_request,
};

#[tokio::test]
async fn unknown_member_has_no_account() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app
        .client
        .get_account(&requests::GetAccount { member_id: member() })
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn first_deposit_provisions_the_account() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    let receipt = app
        .deposit(member, SavingsCategory::Pokok, Decimal::from(100_000))
        .await?;

    // Mocked clock starts at 2025-01-01, so the number carries that month.
    assert!(receipt.account.account_number.starts_with("SAV-202501-"));
    assert_eq!(receipt.records[0].code.len(), "TRX-20250101-0000".len());
    assert!(receipt.records[0].code.starts_with("TRX-20250101-"));
    assert_eq!(
        receipt.account.last_transaction_at,
        Some(app.time_source.now())
    );

    Ok(())
}

#[tokio::test]
async fn failed_first_withdrawal_still_provisions() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    // The posting itself fails on funds, but the account comes into being
    // zero-initialized (absence means "first use", not an error).
    let result = app
        .client
        .post_transaction(&withdrawal_request(
            member,
            SavingsCategory::Sukarela,
            Decimal::from(5_000),
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    let account = app
        .client
        .get_account(&requests::GetAccount { member_id: member })
        .await?;
    assert_eq!(account.balances.pokok, Decimal::ZERO);
    assert_eq!(account.balances.wajib, Decimal::ZERO);
    assert_eq!(account.balances.sukarela, Decimal::ZERO);
    assert_eq!(account.total_balance, Decimal::ZERO);
    assert_eq!(account.last_transaction_at, None);

    Ok(())
}

#[tokio::test]
async fn repeated_postings_keep_one_account() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    let first = app
        .deposit(member, SavingsCategory::Sukarela, Decimal::from(1_000))
        .await?;
    let second = app
        .deposit(member, SavingsCategory::Sukarela, Decimal::from(2_000))
        .await?;

    assert_eq!(first.account.account_id, second.account.account_id);
    assert_eq!(
        first.account.account_number,
        second.account.account_number
    );

    Ok(())
}

#[tokio::test]
async fn posting_timestamps_follow_the_clock() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    app.deposit(member, SavingsCategory::Sukarela, Decimal::from(1_000))
        .await?;

    // Timestamp arithmetic takes absolute units, so 40 days as hours.
    app.time_source.advance(Span::new().hours(40 * 24));
    let receipt = app
        .deposit(member, SavingsCategory::Sukarela, Decimal::from(1_000))
        .await?;

    // 40 days past 2025-01-01 lands in February.
    assert!(receipt.records[0].code.starts_with("TRX-20250210-"));
    assert_eq!(
        receipt.account.last_transaction_at,
        Some(app.time_source.now())
    );

    let transactions = app
        .client
        .get_transactions(&requests::GetTransactions {
            member_id: member,
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(transactions[0].created_at, app.time_source.now());

    Ok(())
}
