//! Integration tests for the reservation state machine
//!
//! These run against a local Postgres instance and are skipped when none is
//! reachable. Every test creates its own accounts so they can run in any
//! order against a shared database.

use accounts_service::Error;
use settlement_common::{Amount, ReservationStatus};

mod common;

#[tokio::test]
async fn test_reserve_then_transfer_moves_money_exactly_once() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let payer = common::create_funded_account(&store, 1000).await;
    let payee = common::create_funded_account(&store, 0).await;
    let reference = common::test_reference_id();

    store
        .reserve_funds(&reference, &payer, &payee, Amount::from_minor_units(100))
        .await
        .expect("reserve failed");

    let payer_account = store.get_account(&payer).await.unwrap();
    assert_eq!(payer_account.balance, Amount::from_minor_units(900));
    assert_eq!(payer_account.reserved, Amount::from_minor_units(100));

    store.transfer(&reference).await.expect("transfer failed");

    let payer_account = store.get_account(&payer).await.unwrap();
    let payee_account = store.get_account(&payee).await.unwrap();

    // No money created or destroyed: payer lost exactly 100, payee gained it.
    assert_eq!(payer_account.balance, Amount::from_minor_units(900));
    assert_eq!(payer_account.reserved, Amount::ZERO);
    assert_eq!(payee_account.balance, Amount::from_minor_units(100));
    assert_eq!(payee_account.reserved, Amount::ZERO);
}

#[tokio::test]
async fn test_reserve_rejects_insufficient_funds() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let payer = common::create_funded_account(&store, 50).await;
    let payee = common::create_funded_account(&store, 0).await;

    let result = store
        .reserve_funds(
            &common::test_reference_id(),
            &payer,
            &payee,
            Amount::from_minor_units(100),
        )
        .await;

    assert!(matches!(result, Err(Error::InsufficientFunds { .. })));

    // Nothing moved.
    let payer_account = store.get_account(&payer).await.unwrap();
    assert_eq!(payer_account.balance, Amount::from_minor_units(50));
    assert_eq!(payer_account.reserved, Amount::ZERO);
}

#[tokio::test]
async fn test_reserve_exact_balance_boundary() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let payer = common::create_funded_account(&store, 100).await;
    let payee = common::create_funded_account(&store, 0).await;

    // Reserving exactly the balance succeeds and leaves zero available.
    store
        .reserve_funds(
            &common::test_reference_id(),
            &payer,
            &payee,
            Amount::from_minor_units(100),
        )
        .await
        .expect("exact-balance reserve should succeed");

    let payer_account = store.get_account(&payer).await.unwrap();
    assert_eq!(payer_account.balance, Amount::ZERO);
    assert_eq!(payer_account.reserved, Amount::from_minor_units(100));

    // One more minor unit fails.
    let result = store
        .reserve_funds(
            &common::test_reference_id(),
            &payer,
            &payee,
            Amount::from_minor_units(1),
        )
        .await;
    assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
}

#[tokio::test]
async fn test_transfer_is_terminal() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let payer = common::create_funded_account(&store, 500).await;
    let payee = common::create_funded_account(&store, 0).await;
    let reference = common::test_reference_id();

    store
        .reserve_funds(&reference, &payer, &payee, Amount::from_minor_units(200))
        .await
        .unwrap();
    store.transfer(&reference).await.unwrap();

    // A second transfer is a no-op failing with the current terminal state.
    let result = store.transfer(&reference).await;
    match result {
        Err(Error::InvalidState { status, .. }) => {
            assert_eq!(status, ReservationStatus::Confirmed);
        }
        other => panic!("expected InvalidState, got {:?}", other),
    }

    // Balances did not move twice.
    let payee_account = store.get_account(&payee).await.unwrap();
    assert_eq!(payee_account.balance, Amount::from_minor_units(200));
}

#[tokio::test]
async fn test_release_restores_balance_and_blocks_transfer() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let payer = common::create_funded_account(&store, 300).await;
    let payee = common::create_funded_account(&store, 0).await;
    let reference = common::test_reference_id();

    store
        .reserve_funds(&reference, &payer, &payee, Amount::from_minor_units(100))
        .await
        .unwrap();
    store.release_funds(&reference).await.unwrap();

    let payer_account = store.get_account(&payer).await.unwrap();
    assert_eq!(payer_account.balance, Amount::from_minor_units(300));
    assert_eq!(payer_account.reserved, Amount::ZERO);

    // The released reservation is terminal: capture can never happen.
    let result = store.transfer(&reference).await;
    match result {
        Err(Error::InvalidState { status, .. }) => {
            assert_eq!(status, ReservationStatus::Failed);
        }
        other => panic!("expected InvalidState, got {:?}", other),
    }
}

#[tokio::test]
async fn test_duplicate_reference_id_is_rejected() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let payer = common::create_funded_account(&store, 1000).await;
    let payee = common::create_funded_account(&store, 0).await;
    let reference = common::test_reference_id();

    store
        .reserve_funds(&reference, &payer, &payee, Amount::from_minor_units(100))
        .await
        .unwrap();

    let result = store
        .reserve_funds(&reference, &payer, &payee, Amount::from_minor_units(100))
        .await;
    assert!(matches!(result, Err(Error::Duplicate(_))));

    // The failed duplicate did not double the hold.
    let payer_account = store.get_account(&payer).await.unwrap();
    assert_eq!(payer_account.reserved, Amount::from_minor_units(100));
}

#[tokio::test]
async fn test_update_balance_credit_and_debit() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let account = common::create_funded_account(&store, 100).await;

    let updated = store
        .update_balance(&account, Amount::from_minor_units(40), true)
        .await
        .unwrap();
    assert_eq!(updated.balance, Amount::from_minor_units(140));

    let updated = store
        .update_balance(&account, Amount::from_minor_units(90), false)
        .await
        .unwrap();
    assert_eq!(updated.balance, Amount::from_minor_units(50));

    let result = store
        .update_balance(&account, Amount::from_minor_units(51), false)
        .await;
    assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
}

#[tokio::test]
async fn test_duplicate_account_no_is_rejected() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let account_no = format!("ACC-{}", hex::encode(rand::random::<[u8; 6]>()));
    store
        .create_account("first", &account_no, Amount::from_minor_units(10))
        .await
        .unwrap();

    let result = store
        .create_account("second", &account_no, Amount::from_minor_units(10))
        .await;
    assert!(matches!(result, Err(Error::Duplicate(_))));
}

#[tokio::test]
async fn test_get_missing_account_is_not_found() {
    skip_if_no_database!();
    let store = common::test_store().await;

    let result = store.get_account("no-such-account").await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
