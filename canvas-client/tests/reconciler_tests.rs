//! Reconciliation layer against an in-process ledger

mod common;

use canvas_client::{
    ClientError, MarkStatus, ReconcileEvent, Reconciler, ReconcilerConfig, RetryPolicy,
    RetryStrategy, RollbackReason, SessionState, SubmissionPolicy,
};
use canvas_core::{ColorLabel, ParticipantId, Phase};
use common::MockLedger;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn config(submission: SubmissionPolicy) -> ReconcilerConfig {
    ReconcilerConfig {
        free_quota_limit: common::LIMIT,
        submission,
        retry: RetryPolicy {
            max_attempts: 3,
            strategy: RetryStrategy::Fixed { delay_ms: 5 },
        },
    }
}

fn buffered() -> SubmissionPolicy {
    SubmissionPolicy {
        max_batch: 5,
        idle_flush: Duration::from_millis(20),
        max_in_flight: 3,
    }
}

fn count<F: Fn(&ReconcileEvent) -> bool>(events: &[ReconcileEvent], f: F) -> usize {
    events.iter().filter(|e| f(e)).count()
}

async fn joined(ledger: Arc<MockLedger>, submission: SubmissionPolicy) -> Reconciler {
    let mut reconciler = Reconciler::new(ledger, config(submission));
    let events = reconciler.start(None).await.unwrap();
    assert_eq!(events, vec![ReconcileEvent::IdentityRequired]);
    reconciler.join(ColorLabel::Red).await.unwrap();
    reconciler
}

#[tokio::test]
async fn test_join_enters_blind_state() {
    let ledger = Arc::new(MockLedger::new());
    let reconciler = joined(ledger, buffered()).await;

    let session = reconciler.session();
    assert_eq!(session.state(), SessionState::BlindActive);
    assert_eq!(session.estimated_free_remaining(), 10);
    assert!(session.render_set().is_empty());
}

#[tokio::test]
async fn test_full_quota_reveals_once_and_fetches_canvas_once() {
    let ledger = Arc::new(MockLedger::new());
    let mut reconciler = joined(Arc::clone(&ledger), buffered()).await;

    for i in 0..10 {
        reconciler.place(0.05 * i as f64, 0.5).unwrap();
    }
    assert_eq!(reconciler.session().estimated_free_remaining(), 0);
    assert_eq!(reconciler.session().render_set().len(), 10);
    assert!(matches!(
        reconciler.place(0.9, 0.9),
        Err(ClientError::NoCapacity { phase: Phase::Free })
    ));

    let events = reconciler.settle().await.unwrap();

    assert_eq!(
        count(&events, |e| matches!(e, ReconcileEvent::Confirmed { .. })),
        10
    );
    assert_eq!(
        count(&events, |e| matches!(e, ReconcileEvent::Revealed { .. })),
        1
    );
    assert_eq!(ledger.canvas_reads.load(Ordering::SeqCst), 1);

    let session = reconciler.session();
    assert_eq!(session.state(), SessionState::RevealedActive);
    assert!(session.is_settled());
    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.free_quota_consumed, 10);
    assert!(snapshot.revealed);

    let render = session.render_set();
    assert_eq!(render.len(), 10);
    assert!(render.iter().all(|m| m.status == MarkStatus::Confirmed));

    // No credits yet.
    assert!(matches!(
        reconciler.place(0.5, 0.5),
        Err(ClientError::NoCapacity { phase: Phase::Paid })
    ));
    reconciler.refresh().await.unwrap();
    assert_eq!(ledger.canvas_reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_size_threshold_coalesces_batches() {
    let ledger = Arc::new(MockLedger::new());
    let policy = SubmissionPolicy {
        max_batch: 5,
        idle_flush: Duration::from_secs(5),
        max_in_flight: 1,
    };
    let mut reconciler = joined(Arc::clone(&ledger), policy).await;

    for i in 0..5 {
        reconciler.place(0.1 * i as f64, 0.1).unwrap();
    }
    let events = reconciler.next_events().await.unwrap();

    assert_eq!(
        count(&events, |e| matches!(e, ReconcileEvent::Confirmed { .. })),
        5
    );
    assert_eq!(*ledger.batch_sizes.lock().unwrap(), vec![5]);
    assert_eq!(reconciler.session().snapshot().unwrap().free_quota_consumed, 5);
}

#[tokio::test]
async fn test_idle_window_flushes_partial_batch() {
    let ledger = Arc::new(MockLedger::new());
    let mut reconciler = joined(Arc::clone(&ledger), buffered()).await;

    reconciler.place(0.2, 0.2).unwrap();
    reconciler.place(0.3, 0.3).unwrap();
    let events = reconciler.next_events().await.unwrap();

    assert_eq!(
        count(&events, |e| matches!(e, ReconcileEvent::Confirmed { .. })),
        2
    );
    assert_eq!(*ledger.batch_sizes.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_in_flight_requests_are_bounded() {
    let ledger = Arc::new(MockLedger::new().with_delay(Duration::from_millis(30)));
    let mut reconciler = joined(Arc::clone(&ledger), SubmissionPolicy::unbuffered(2)).await;

    for i in 0..8 {
        reconciler.place(0.1 * i as f64, 0.2).unwrap();
    }
    let events = reconciler.settle().await.unwrap();

    assert_eq!(
        count(&events, |e| matches!(e, ReconcileEvent::Confirmed { .. })),
        8
    );
    assert!(ledger.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(ledger.submits.load(Ordering::SeqCst), 8);
    assert_eq!(reconciler.session().snapshot().unwrap().free_quota_consumed, 8);
    assert_eq!(reconciler.session().estimated_free_remaining(), 2);
}

#[tokio::test]
async fn test_transport_failure_is_retried_with_same_keys() {
    let ledger = Arc::new(MockLedger::new().failing(2));
    let mut reconciler = joined(Arc::clone(&ledger), SubmissionPolicy::unbuffered(1)).await;

    let key = reconciler.place(0.4, 0.4).unwrap();
    let events = reconciler.settle().await.unwrap();

    assert!(events
        .iter()
        .any(|e| matches!(e, ReconcileEvent::Confirmed { key: k, .. } if k == &key)));
    assert_eq!(ledger.submits.load(Ordering::SeqCst), 3);
    assert_eq!(ledger.stored_marks(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_roll_back() {
    let ledger = Arc::new(MockLedger::new().failing(5));
    let mut reconciler = joined(Arc::clone(&ledger), SubmissionPolicy::unbuffered(1)).await;

    let key = reconciler.place(0.4, 0.4).unwrap();
    let events = reconciler.settle().await.unwrap();

    assert!(events.iter().any(|e| matches!(
        e,
        ReconcileEvent::RolledBack { key: k, reason: RollbackReason::Failed(_) } if k == &key
    )));
    assert!(reconciler.session().render_set().is_empty());
    assert_eq!(reconciler.session().estimated_free_remaining(), 10);
    assert_eq!(ledger.stored_marks(), 0);
}

#[tokio::test]
async fn test_unknown_stored_identity_is_discarded() {
    let ledger = Arc::new(MockLedger::with_participant(3, false, 0));
    let mut reconciler = Reconciler::new(ledger, config(buffered()));

    let events = reconciler
        .start(Some(ParticipantId::new("p-gone")))
        .await
        .unwrap();

    assert_eq!(events, vec![ReconcileEvent::IdentityRequired]);
    assert_eq!(reconciler.session().state(), SessionState::SelectingIdentity);
}

#[tokio::test]
async fn test_participant_lost_mid_session_requires_new_identity() {
    let ledger = Arc::new(MockLedger::with_participant(2, false, 0));
    let mut reconciler = Reconciler::new(Arc::clone(&ledger) as _, config(buffered()));
    reconciler
        .start(Some(ParticipantId::new("p-existing")))
        .await
        .unwrap();

    let key = reconciler.place(0.5, 0.5).unwrap();
    ledger.forget();
    let events = reconciler.settle().await.unwrap();

    assert!(events.contains(&ReconcileEvent::RolledBack {
        key,
        reason: RollbackReason::IdentityDiscarded,
    }));
    assert_eq!(events.last(), Some(&ReconcileEvent::IdentityRequired));

    let session = reconciler.session();
    assert_eq!(session.state(), SessionState::SelectingIdentity);
    assert!(session.participant_id().is_none());
    assert!(session.render_set().is_empty());
    assert!(matches!(
        reconciler.place(0.1, 0.1),
        Err(ClientError::InvalidState { .. })
    ));

    reconciler.join(ColorLabel::Green).await.unwrap();
    assert_eq!(reconciler.session().state(), SessionState::BlindActive);
    assert_eq!(
        reconciler.session().participant_id(),
        Some(&ParticipantId::new("p-new"))
    );
}

#[tokio::test]
async fn test_refresh_of_lost_participant_requires_new_identity() {
    let ledger = Arc::new(MockLedger::with_participant(10, true, 1));
    let mut reconciler = Reconciler::new(Arc::clone(&ledger) as _, config(buffered()));
    reconciler
        .start(Some(ParticipantId::new("p-existing")))
        .await
        .unwrap();

    ledger.forget();
    let events = reconciler.refresh().await.unwrap();

    assert_eq!(events, vec![ReconcileEvent::IdentityRequired]);
    assert_eq!(reconciler.session().state(), SessionState::SelectingIdentity);
    assert!(reconciler.reveal().await.is_err());
}

#[tokio::test]
async fn test_restored_revealed_identity_spends_credits() {
    let ledger = Arc::new(MockLedger::with_participant(10, true, 2));
    let mut reconciler = Reconciler::new(Arc::clone(&ledger) as _, config(buffered()));

    reconciler
        .start(Some(ParticipantId::new("p-existing")))
        .await
        .unwrap();
    assert_eq!(reconciler.session().state(), SessionState::RevealedActive);
    assert_eq!(ledger.canvas_reads.load(Ordering::SeqCst), 1);

    reconciler.place(0.1, 0.1).unwrap();
    reconciler.place(0.2, 0.2).unwrap();
    assert!(matches!(
        reconciler.place(0.3, 0.3),
        Err(ClientError::NoCapacity { phase: Phase::Paid })
    ));

    let events = reconciler.settle().await.unwrap();
    assert_eq!(
        count(&events, |e| matches!(e, ReconcileEvent::Confirmed { .. })),
        2
    );

    let session = reconciler.session();
    assert_eq!(session.snapshot().unwrap().credit_balance, 0);
    let render = session.render_set();
    assert_eq!(render.len(), 2);
    assert!(render.iter().all(|m| m.phase == Phase::Paid));
}

#[tokio::test]
async fn test_explicit_reveal_requires_quota() {
    let ledger = Arc::new(MockLedger::with_participant(4, false, 0));
    let mut reconciler = Reconciler::new(ledger, config(buffered()));
    reconciler
        .start(Some(ParticipantId::new("p-existing")))
        .await
        .unwrap();

    let result = reconciler.reveal().await;
    assert!(matches!(
        result,
        Err(ClientError::QuotaNotMet { consumed: 4, limit: 10 })
    ));
    assert_eq!(reconciler.session().state(), SessionState::BlindActive);
}

#[tokio::test]
async fn test_out_of_order_responses_never_regress_quota() {
    let ledger = Arc::new(MockLedger::new().with_delay(Duration::from_millis(5)));
    let mut reconciler = joined(Arc::clone(&ledger), SubmissionPolicy::unbuffered(3)).await;

    for i in 0..6 {
        reconciler.place(0.1 * i as f64, 0.6).unwrap();
    }

    let mut held = 0;
    while !reconciler.session().is_settled() {
        reconciler.next_events().await.unwrap();
        let consumed = reconciler.session().snapshot().unwrap().free_quota_consumed;
        assert!(consumed >= held);
        held = consumed;
    }
    assert_eq!(held, 6);
    assert_eq!(ledger.snapshot().free_quota_consumed, 6);
}
