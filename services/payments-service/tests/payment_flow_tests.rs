//! Integration tests for intent creation and capture
//!
//! These run against a local Postgres instance (skipped when none is
//! reachable) with a scripted accounts double, so every orchestration branch
//! is exercised including the crash-recovery repair.

use payments_service::repository::models::IntentStatus;
use settlement_common::rpc::{
    CaptureOutcome, CapturePaymentRequest, CreatePaymentIntentRequest, ErrorKind, IntentOutcome,
    TransferOutcome,
};
use settlement_common::{new_reference_id, Amount, ReservationStatus};
use std::sync::Arc;

mod common;

fn intent_request(reference_id: &str) -> CreatePaymentIntentRequest {
    CreatePaymentIntentRequest {
        payer_id: "payer-1".to_string(),
        payee_id: "payee-1".to_string(),
        amount: Amount::from_minor_units(100),
        reference_id: Some(reference_id.to_string()),
    }
}

#[tokio::test]
async fn test_create_intent_authorizes_and_persists() {
    skip_if_no_database!();
    let accounts = Arc::new(common::StubAccounts::new(
        TransferOutcome::success("funds reserved"),
        TransferOutcome::success("transfer completed"),
    ));
    let service = common::test_service(accounts.clone()).await;
    let reference = new_reference_id();

    let response = service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();

    assert_eq!(response.status, IntentOutcome::Authorized);
    assert_eq!(response.reference_id, reference);
    assert_eq!(accounts.reserve_count(), 1);

    let intent = service
        .repository()
        .get_intent(&reference)
        .await
        .unwrap()
        .expect("intent should exist");
    assert_eq!(intent.status, IntentStatus::Authorized);
    assert_eq!(intent.amount, Amount::from_minor_units(100));
}

#[tokio::test]
async fn test_create_intent_is_idempotent() {
    skip_if_no_database!();
    let accounts = Arc::new(common::StubAccounts::new(
        TransferOutcome::success("funds reserved"),
        TransferOutcome::success("transfer completed"),
    ));
    let service = common::test_service(accounts.clone()).await;
    let reference = new_reference_id();

    let first = service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();
    let second = service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();
    let third = service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();

    // All replies identical, and Accounts was contacted exactly once.
    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(accounts.reserve_count(), 1);
}

#[tokio::test]
async fn test_failed_reserve_persists_nothing() {
    skip_if_no_database!();
    let accounts = Arc::new(common::StubAccounts::new(
        TransferOutcome::failed(ErrorKind::InsufficientFunds, "insufficient funds"),
        TransferOutcome::success("transfer completed"),
    ));
    let service = common::test_service(accounts.clone()).await;
    let reference = new_reference_id();

    let response = service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();
    assert_eq!(response.status, IntentOutcome::Failed);

    // No intent, and the failure is not served from the idempotency store:
    // a retry goes back to Accounts.
    assert!(service
        .repository()
        .get_intent(&reference)
        .await
        .unwrap()
        .is_none());
    let retry = service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();
    assert_eq!(retry.status, IntentOutcome::Failed);
    assert_eq!(accounts.reserve_count(), 2);

    // Capture of a never-authorized reference fails.
    let capture = service
        .capture_payment(CapturePaymentRequest {
            reference_id: reference.clone(),
        })
        .await
        .unwrap();
    assert_eq!(capture.status, CaptureOutcome::Failed);
    assert!(capture.message.contains("does not exist"));
}

#[tokio::test]
async fn test_capture_writes_txns_outbox_and_intent_once() {
    skip_if_no_database!();
    let accounts = Arc::new(common::StubAccounts::new(
        TransferOutcome::success("funds reserved"),
        TransferOutcome::success("transfer completed"),
    ));
    let service = common::test_service(accounts.clone()).await;
    let reference = new_reference_id();

    service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();
    let response = service
        .capture_payment(CapturePaymentRequest {
            reference_id: reference.clone(),
        })
        .await
        .unwrap();

    assert_eq!(response.status, CaptureOutcome::Captured);

    let repo = service.repository();
    assert_eq!(repo.count_payment_txns(&reference).await.unwrap(), 2);
    assert_eq!(repo.count_outbox_events(&reference).await.unwrap(), 1);
    let intent = repo.get_intent(&reference).await.unwrap().unwrap();
    assert_eq!(intent.status, IntentStatus::Captured);
}

#[tokio::test]
async fn test_double_capture_is_idempotent() {
    skip_if_no_database!();
    let accounts = Arc::new(common::StubAccounts::new(
        TransferOutcome::success("funds reserved"),
        TransferOutcome::success("transfer completed"),
    ));
    let service = common::test_service(accounts.clone()).await;
    let reference = new_reference_id();

    service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();

    let first = service
        .capture_payment(CapturePaymentRequest {
            reference_id: reference.clone(),
        })
        .await
        .unwrap();
    let second = service
        .capture_payment(CapturePaymentRequest {
            reference_id: reference.clone(),
        })
        .await
        .unwrap();

    assert_eq!(first.status, CaptureOutcome::Captured);
    assert_eq!(second.status, CaptureOutcome::Captured);
    assert_eq!(accounts.transfer_count(), 1);

    // Exactly two txn rows and one outbox event in total.
    let repo = service.repository();
    assert_eq!(repo.count_payment_txns(&reference).await.unwrap(), 2);
    assert_eq!(repo.count_outbox_events(&reference).await.unwrap(), 1);
}

#[tokio::test]
async fn test_capture_retry_after_crash_repairs_local_state() {
    skip_if_no_database!();
    // Transfer already confirmed on the Accounts side; the local commit was
    // lost. The retry must treat INVALID_STATE/CONFIRMED as success.
    let accounts = Arc::new(common::StubAccounts::new(
        TransferOutcome::success("funds reserved"),
        TransferOutcome::invalid_state(
            ReservationStatus::Confirmed,
            "reservation is CONFIRMED",
        ),
    ));
    let service = common::test_service(accounts.clone()).await;
    let reference = new_reference_id();

    service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();
    let response = service
        .capture_payment(CapturePaymentRequest {
            reference_id: reference.clone(),
        })
        .await
        .unwrap();

    assert_eq!(response.status, CaptureOutcome::Captured);

    let repo = service.repository();
    assert_eq!(repo.count_payment_txns(&reference).await.unwrap(), 2);
    assert_eq!(repo.count_outbox_events(&reference).await.unwrap(), 1);
    let intent = repo.get_intent(&reference).await.unwrap().unwrap();
    assert_eq!(intent.status, IntentStatus::Captured);
}

#[tokio::test]
async fn test_capture_of_released_reservation_fails() {
    skip_if_no_database!();
    let accounts = Arc::new(common::StubAccounts::new(
        TransferOutcome::success("funds reserved"),
        TransferOutcome::invalid_state(ReservationStatus::Failed, "reservation is FAILED"),
    ));
    let service = common::test_service(accounts.clone()).await;
    let reference = new_reference_id();

    service
        .create_payment_intent(intent_request(&reference))
        .await
        .unwrap();
    let response = service
        .capture_payment(CapturePaymentRequest {
            reference_id: reference.clone(),
        })
        .await
        .unwrap();

    assert_eq!(response.status, CaptureOutcome::Failed);

    // Nothing was written locally.
    let repo = service.repository();
    assert_eq!(repo.count_payment_txns(&reference).await.unwrap(), 0);
    assert_eq!(repo.count_outbox_events(&reference).await.unwrap(), 0);
    let intent = repo.get_intent(&reference).await.unwrap().unwrap();
    assert_eq!(intent.status, IntentStatus::Authorized);
}
