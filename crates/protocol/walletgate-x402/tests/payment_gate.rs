//! PaymentGate with a scripted verifier.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use walletgate_test_utils::{test_payment_header, test_x402_config, MockVerifier, TEST_PAYER};
use walletgate_types::Price;
use walletgate_x402::{Authorization, GateOutcome, PaymentGate, PaymentMethod, X402Config};

fn price() -> Option<Price> {
    Price::from_cents(5)
}

fn gate_with(verifier: &MockVerifier) -> PaymentGate {
    PaymentGate::with_verifier(test_x402_config(), Arc::new(verifier.clone()))
}

#[tokio::test]
async fn test_valid_proof_runs_handler_once() {
    let verifier = MockVerifier::accepting();
    let gate = gate_with(&verifier);
    let calls = AtomicUsize::new(0);
    let header = test_payment_header(50_000, "0x01");

    let outcome = gate
        .invoke("send_transaction", "Send funds", price(), Some(&header), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            "sent"
        })
        .await;

    match outcome {
        GateOutcome::Executed { output, receipt } => {
            assert_eq!(output, "sent");
            let receipt = receipt.unwrap();
            assert_eq!(receipt.amount, "50000");
            assert_eq!(receipt.payer.as_deref(), Some(TEST_PAYER));
            assert_eq!(receipt.tx_hash.as_deref(), Some("0xsettled0001"));
            assert!(receipt.confirmation_id.is_none());
        }
        GateOutcome::PaymentRequired { reason, .. } => panic!("refused: {:?}", reason),
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(verifier.verify_count(), 1);
    assert_eq!(verifier.settle_count(), 1);

    let payments = gate.recent_payments().await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].method, PaymentMethod::Proof);
    assert_eq!(payments[0].amount, 50_000);
}

#[tokio::test]
async fn test_rejected_proof_never_runs_handler() {
    let verifier = MockVerifier::rejecting("insufficient_funds");
    let gate = gate_with(&verifier);
    let calls = AtomicUsize::new(0);
    let header = test_payment_header(50_000, "0x02");

    let outcome = gate
        .invoke("send_transaction", "Send funds", price(), Some(&header), || async {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    match outcome {
        GateOutcome::PaymentRequired {
            requirements,
            reason,
        } => {
            assert_eq!(requirements.len(), 1);
            assert!(reason.unwrap().contains("insufficient_funds"));
        }
        GateOutcome::Executed { .. } => panic!("handler ran on a rejected proof"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(verifier.settle_count(), 0);
    assert!(gate.recent_payments().await.is_empty());
}

#[tokio::test]
async fn test_underpayment_is_refused_locally() {
    let verifier = MockVerifier::accepting();
    let gate = gate_with(&verifier);
    let header = test_payment_header(49_999, "0x03");

    let auth = gate
        .authorize("send_transaction", "Send funds", price(), Some(&header))
        .await;
    assert!(!auth.is_authorized());
    // Never reached the facilitator.
    assert_eq!(verifier.verify_count(), 0);
}

#[tokio::test]
async fn test_replayed_nonce_is_refused() {
    let verifier = MockVerifier::accepting();
    let gate = gate_with(&verifier);
    let header = test_payment_header(50_000, "0xreplay");

    let first = gate
        .authorize("send_transaction", "Send funds", price(), Some(&header))
        .await;
    assert!(matches!(first, Authorization::Paid(_)));

    let second = gate
        .authorize("send_transaction", "Send funds", price(), Some(&header))
        .await;
    match second {
        Authorization::Required { reason, .. } => {
            assert!(reason.unwrap().contains("nonce already used"));
        }
        other => panic!("replay accepted: {:?}", other),
    }
    assert_eq!(verifier.verify_count(), 1);
}

#[tokio::test]
async fn test_failed_verification_releases_nonce() {
    let verifier = MockVerifier::unreachable();
    let gate = gate_with(&verifier);
    let header = test_payment_header(50_000, "0xretry");

    let auth = gate
        .authorize("send_transaction", "Send funds", price(), Some(&header))
        .await;
    assert!(!auth.is_authorized());

    // The same proof may be retried once the facilitator is back.
    verifier.set_unreachable(false);
    assert!(gate
        .authorize("send_transaction", "Send funds", price(), Some(&header))
        .await
        .is_authorized());
    assert_eq!(verifier.verify_count(), 2);
}

#[tokio::test]
async fn test_settlement_failure_refuses() {
    let verifier = MockVerifier::accepting().with_settle_failure("reverted");
    let gate = gate_with(&verifier);
    let header = test_payment_header(50_000, "0x04");

    match gate
        .authorize("send_transaction", "Send funds", price(), Some(&header))
        .await
    {
        Authorization::Required { reason, .. } => assert!(reason.unwrap().contains("reverted")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_no_settlement_without_auto_settle() {
    let verifier = MockVerifier::accepting();
    let config = X402Config {
        auto_settle: false,
        ..test_x402_config()
    };
    let gate = PaymentGate::with_verifier(config, Arc::new(verifier.clone()));
    let header = test_payment_header(50_000, "0x05");

    match gate
        .authorize("send_transaction", "Send funds", price(), Some(&header))
        .await
    {
        Authorization::Paid(receipt) => assert!(receipt.tx_hash.is_none()),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(verifier.settle_count(), 0);
}

#[tokio::test]
async fn test_free_tools_ignore_proofs() {
    let verifier = MockVerifier::accepting();
    let gate = gate_with(&verifier);
    let header = test_payment_header(50_000, "0x06");

    let auth = gate
        .authorize("check_wallet", "Check", None, Some(&header))
        .await;
    assert!(matches!(auth, Authorization::Free));
    assert_eq!(verifier.verify_count(), 0);
}
