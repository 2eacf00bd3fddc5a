use payloads::{
    ClientError, PaymentMethod, SavingsCategory, TransactionType, requests,
};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use test_helpers::{
    assert_status_code, deposit_request, member, spawn_app, transfer_request,
    withdrawal_request,
};

#[tokio::test]
async fn deposit_increases_category_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    app.deposit(member, SavingsCategory::Sukarela, Decimal::from(50_000))
        .await?;

    let receipt = app
        .client
        .post_transaction(&deposit_request(
            member,
            SavingsCategory::Sukarela,
            Decimal::from(20_000),
        ))
        .await?;

    assert_eq!(
        receipt.account.balances.sukarela,
        Decimal::from(70_000)
    );
    assert_eq!(receipt.account.total_balance, Decimal::from(70_000));

    assert_eq!(receipt.records.len(), 1);
    let record = &receipt.records[0];
    assert_eq!(record.transaction_type, TransactionType::Deposit);
    assert_eq!(record.category, SavingsCategory::Sukarela);
    assert_eq!(record.balance_before, Decimal::from(50_000));
    assert_eq!(record.balance_after, Decimal::from(70_000));

    Ok(())
}

#[tokio::test]
async fn withdrawal_decreases_category_balance() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    app.deposit(member, SavingsCategory::Sukarela, Decimal::from(50_000))
        .await?;

    let receipt = app
        .client
        .post_transaction(&withdrawal_request(
            member,
            SavingsCategory::Sukarela,
            Decimal::from(20_000),
        ))
        .await?;

    assert_eq!(
        receipt.account.balances.sukarela,
        Decimal::from(30_000)
    );
    let record = &receipt.records[0];
    assert_eq!(record.transaction_type, TransactionType::Withdrawal);
    assert_eq!(record.balance_before, Decimal::from(50_000));
    assert_eq!(record.balance_after, Decimal::from(30_000));

    Ok(())
}

#[tokio::test]
async fn withdrawal_exceeding_balance_fails_without_effects()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    app.deposit(member, SavingsCategory::Sukarela, Decimal::from(50_000))
        .await?;

    let result = app
        .client
        .post_transaction(&withdrawal_request(
            member,
            SavingsCategory::Sukarela,
            Decimal::from(60_000),
        ))
        .await;

    match result {
        Err(ClientError::APIError(code, body)) => {
            assert_eq!(code, StatusCode::BAD_REQUEST);
            assert!(body.contains("Insufficient Sukarela balance"));
        }
        other => panic!("expected insufficient funds error, got {other:?}"),
    }

    // Account unchanged.
    let account = app
        .client
        .get_account(&requests::GetAccount { member_id: member })
        .await?;
    assert_eq!(account.balances.sukarela, Decimal::from(50_000));
    assert_eq!(account.total_balance, Decimal::from(50_000));

    Ok(())
}

#[tokio::test]
async fn pokok_withdrawal_is_forbidden_regardless_of_balance()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    app.deposit(member, SavingsCategory::Pokok, Decimal::from(100_000))
        .await?;

    let result = app
        .client
        .post_transaction(&withdrawal_request(
            member,
            SavingsCategory::Pokok,
            Decimal::from(10),
        ))
        .await;

    match result {
        Err(ClientError::APIError(code, body)) => {
            assert_eq!(code, StatusCode::BAD_REQUEST);
            assert!(body.contains("Pokok savings cannot be withdrawn"));
        }
        other => panic!("expected forbidden withdrawal, got {other:?}"),
    }

    let account = app
        .client
        .get_account(&requests::GetAccount { member_id: member })
        .await?;
    assert_eq!(account.balances.pokok, Decimal::from(100_000));

    // No pokok withdrawal record exists anywhere in the log.
    assert!(app.store.all_records().iter().all(|r| {
        !(r.category == SavingsCategory::Pokok
            && r.transaction_type == TransactionType::Withdrawal)
    }));

    Ok(())
}

#[tokio::test]
async fn overlong_description_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    let mut request = deposit_request(
        member,
        SavingsCategory::Sukarela,
        Decimal::from(10_000),
    );
    request.description = Some("x".repeat(300));

    let result = app.client.post_transaction(&request).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn transfer_moves_balance_between_members() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let alice = member();
    let bob = member();

    app.deposit(alice, SavingsCategory::Sukarela, Decimal::from(100_000))
        .await?;
    // Provision Bob's account at zero balance: a first posting attempt
    // creates the account even when the posting itself fails.
    let _ = app
        .client
        .post_transaction(&withdrawal_request(
            bob,
            SavingsCategory::Sukarela,
            Decimal::from(1),
        ))
        .await;

    let receipt = app
        .client
        .post_transaction(&transfer_request(
            alice,
            bob,
            SavingsCategory::Sukarela,
            Decimal::from(30_000),
        ))
        .await?;

    // The receipt carries the updated source account and both legs.
    assert_eq!(
        receipt.account.balances.sukarela,
        Decimal::from(70_000)
    );
    assert_eq!(receipt.records.len(), 2);

    let debit = &receipt.records[0];
    assert_eq!(debit.member_id, alice);
    assert_eq!(debit.transaction_type, TransactionType::Transfer);
    assert_eq!(debit.balance_before, Decimal::from(100_000));
    assert_eq!(debit.balance_after, Decimal::from(70_000));
    assert!(debit.code.ends_with("-OUT"));

    let credit = &receipt.records[1];
    assert_eq!(credit.member_id, bob);
    assert_eq!(credit.transaction_type, TransactionType::Deposit);
    assert_eq!(credit.balance_before, Decimal::ZERO);
    assert_eq!(credit.balance_after, Decimal::from(30_000));
    assert!(credit.code.ends_with("-IN"));

    // Both legs share the generated code.
    assert_eq!(
        debit.code.trim_end_matches("-OUT"),
        credit.code.trim_end_matches("-IN")
    );

    // The credit leg references the sender's account.
    let alice_account = app
        .client
        .get_account(&requests::GetAccount { member_id: alice })
        .await?;
    assert!(
        credit
            .description
            .as_deref()
            .unwrap()
            .contains(&alice_account.account_number)
    );

    let bob_account = app
        .client
        .get_account(&requests::GetAccount { member_id: bob })
        .await?;
    assert_eq!(bob_account.balances.sukarela, Decimal::from(30_000));
    assert_eq!(bob_account.total_balance, Decimal::from(30_000));

    Ok(())
}

#[tokio::test]
async fn transfer_source_rules_match_withdrawal() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let alice = member();
    let bob = member();

    app.deposit(alice, SavingsCategory::Pokok, Decimal::from(100_000))
        .await?;
    app.deposit(alice, SavingsCategory::Sukarela, Decimal::from(10_000))
        .await?;
    app.deposit(bob, SavingsCategory::Sukarela, Decimal::from(1_000))
        .await?;

    // Transfers draw down the source like a withdrawal: pokok is off-limits.
    let result = app
        .client
        .post_transaction(&transfer_request(
            alice,
            bob,
            SavingsCategory::Pokok,
            Decimal::from(10_000),
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // And the category balance must cover the amount.
    let result = app
        .client
        .post_transaction(&transfer_request(
            alice,
            bob,
            SavingsCategory::Sukarela,
            Decimal::from(20_000),
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // Neither side moved.
    let bob_account = app
        .client
        .get_account(&requests::GetAccount { member_id: bob })
        .await?;
    assert_eq!(bob_account.balances.sukarela, Decimal::from(1_000));

    Ok(())
}

#[tokio::test]
async fn transfer_to_unknown_member_fails() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let alice = member();
    let nobody = member();

    app.deposit(alice, SavingsCategory::Sukarela, Decimal::from(50_000))
        .await?;

    let result = app
        .client
        .post_transaction(&transfer_request(
            alice,
            nobody,
            SavingsCategory::Sukarela,
            Decimal::from(10_000),
        ))
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    // The failed transfer left no trace on the source account.
    let account = app
        .client
        .get_account(&requests::GetAccount { member_id: alice })
        .await?;
    assert_eq!(account.balances.sukarela, Decimal::from(50_000));
    let transactions = app
        .client
        .get_transactions(&requests::GetTransactions {
            member_id: alice,
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(transactions.len(), 1); // just the seed deposit

    Ok(())
}

#[tokio::test]
async fn self_transfer_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let alice = member();

    app.deposit(alice, SavingsCategory::Sukarela, Decimal::from(50_000))
        .await?;

    let result = app
        .client
        .post_transaction(&transfer_request(
            alice,
            alice,
            SavingsCategory::Sukarela,
            Decimal::from(10_000),
        ))
        .await;

    match result {
        Err(ClientError::APIError(code, body)) => {
            assert_eq!(code, StatusCode::BAD_REQUEST);
            assert!(body.contains("Cannot transfer to the sending member"));
        }
        other => panic!("expected self-transfer rejection, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn transfer_without_target_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let alice = member();

    app.deposit(alice, SavingsCategory::Sukarela, Decimal::from(50_000))
        .await?;

    let mut request = transfer_request(
        alice,
        alice,
        SavingsCategory::Sukarela,
        Decimal::from(10_000),
    );
    request.transfer_to = None;

    let result = app.client.post_transaction(&request).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn nonpositive_amounts_are_rejected_without_side_effects()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    for amount in [Decimal::ZERO, Decimal::from(-5_000)] {
        for request in [
            deposit_request(member, SavingsCategory::Sukarela, amount),
            withdrawal_request(member, SavingsCategory::Sukarela, amount),
            transfer_request(
                member,
                test_helpers::member(),
                SavingsCategory::Sukarela,
                amount,
            ),
        ] {
            let result = app.client.post_transaction(&request).await;
            match result {
                Err(ClientError::APIError(code, body)) => {
                    assert_eq!(code, StatusCode::BAD_REQUEST);
                    assert!(body.contains("Amount must be positive"));
                }
                other => panic!("expected invalid amount, got {other:?}"),
            }
        }
    }

    // Amount validation happens before provisioning: no account exists.
    let result = app
        .client
        .get_account(&requests::GetAccount { member_id: member })
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn identical_postings_are_not_deduplicated() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    let request = deposit_request(
        member,
        SavingsCategory::Wajib,
        Decimal::from(25_000),
    );

    let first = app.client.post_transaction(&request).await?;
    let second = app.client.post_transaction(&request).await?;

    // Two independent records, two balance mutations.
    assert_ne!(first.records[0].id, second.records[0].id);
    assert_ne!(first.records[0].code, second.records[0].code);
    assert_eq!(second.account.balances.wajib, Decimal::from(50_000));

    let transactions = app
        .client
        .get_transactions(&requests::GetTransactions {
            member_id: member,
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(transactions.len(), 2);

    Ok(())
}

#[tokio::test]
async fn posting_receipt_matches_subsequent_read() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    let receipt = app
        .deposit(member, SavingsCategory::Sukarela, Decimal::from(42_500))
        .await?;

    let account = app
        .client
        .get_account(&requests::GetAccount { member_id: member })
        .await?;

    assert_eq!(account, receipt.account);

    Ok(())
}

#[tokio::test]
async fn total_always_equals_sum_of_categories() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    app.deposit(member, SavingsCategory::Pokok, Decimal::from(100_000))
        .await?;
    app.deposit(member, SavingsCategory::Wajib, Decimal::from(40_000))
        .await?;
    app.deposit(member, SavingsCategory::Sukarela, Decimal::from(15_500))
        .await?;
    app.client
        .post_transaction(&withdrawal_request(
            member,
            SavingsCategory::Sukarela,
            Decimal::from(500),
        ))
        .await?;

    let account = app
        .client
        .get_account(&requests::GetAccount { member_id: member })
        .await?;
    assert_eq!(
        account.total_balance,
        account.balances.pokok
            + account.balances.wajib
            + account.balances.sukarela
    );
    assert_eq!(account.total_balance, Decimal::from(155_000));

    // Every record's snapshot obeys the sign convention of its type.
    let transactions = app
        .client
        .get_transactions(&requests::GetTransactions {
            member_id: member,
            limit: 10,
            offset: 0,
        })
        .await?;
    assert_eq!(transactions.len(), 4);
    for record in &transactions {
        let expected = match record.transaction_type {
            TransactionType::Deposit | TransactionType::Shu => {
                record.balance_before + record.amount
            }
            TransactionType::Withdrawal | TransactionType::Transfer => {
                record.balance_before - record.amount
            }
        };
        assert_eq!(record.balance_after, expected);
    }

    Ok(())
}

#[tokio::test]
async fn transaction_history_is_paginated_newest_first() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    for i in 1..=5 {
        app.deposit(
            member,
            SavingsCategory::Sukarela,
            Decimal::from(i * 1_000),
        )
        .await?;
    }

    let page1 = app
        .client
        .get_transactions(&requests::GetTransactions {
            member_id: member,
            limit: 2,
            offset: 0,
        })
        .await?;
    assert_eq!(page1.len(), 2);
    // Newest first: the last deposit (5000) leads.
    assert_eq!(page1[0].amount, Decimal::from(5_000));
    assert_eq!(page1[1].amount, Decimal::from(4_000));

    let page2 = app
        .client
        .get_transactions(&requests::GetTransactions {
            member_id: member,
            limit: 2,
            offset: 2,
        })
        .await?;
    assert_eq!(page2.len(), 2);
    assert_eq!(page2[0].amount, Decimal::from(3_000));

    let page3 = app
        .client
        .get_transactions(&requests::GetTransactions {
            member_id: member,
            limit: 2,
            offset: 4,
        })
        .await?;
    assert_eq!(page3.len(), 1);
    assert_eq!(page3[0].amount, Decimal::from(1_000));

    Ok(())
}

#[tokio::test]
async fn payment_method_is_recorded() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let member = member();

    let receipt = app
        .client
        .post_transaction(&requests::PostTransaction {
            member_id: member,
            transaction_type: TransactionType::Deposit,
            category: SavingsCategory::Sukarela,
            amount: Decimal::from(10_000),
            payment_method: PaymentMethod::Qris,
            description: Some("Setoran kios pasar".into()),
            transfer_to: None,
            created_by: None,
        })
        .await?;

    let record = &receipt.records[0];
    assert_eq!(record.payment_method, PaymentMethod::Qris);
    assert_eq!(record.description.as_deref(), Some("Setoran kios pasar"));

    Ok(())
}
