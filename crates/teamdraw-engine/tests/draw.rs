mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use entity::user::InviteStatus;
use teamdraw_engine::cache::{PrizeTableCache, PrizeTableSource};
use teamdraw_engine::draw::DrawEngine;
use teamdraw_engine::error::{InviteError, LoadError};
use teamdraw_engine::prize::{PrizeConfigItem, PrizeKind};
use teamdraw_engine::DrawError;
use tokio::task::JoinSet;

use common::{attempts, engine, fixed, user};

// Default table: win below 0.075, retry below ~0.2417, lose above.
const WIN: f64 = 0.0;
const RETRY: f64 = 0.1;
const LOSE: f64 = 0.9;

#[tokio::test]
async fn two_concurrent_wins_share_the_last_invite() {
    let engine = engine().await.with_sampler(fixed(WIN));
    engine.store().update_quota(1).await.unwrap();
    let alice = user(&engine, "alice").await;
    let bob = user(&engine, "bob").await;

    let (a, b) = tokio::join!(engine.spin(&alice.id, None), engine.spin(&bob.id, None));

    let (winner, loser, won) = match (a, b) {
        (Ok(out), Err(err)) => (&alice, &bob, (out, err)),
        (Err(err), Ok(out)) => (&bob, &alice, (out, err)),
        other => panic!("expected exactly one winner, got {other:?}"),
    };
    let (outcome, err) = won;
    assert!(err.is_quota_empty());
    assert_eq!(outcome.kind(), PrizeKind::Win);
    assert_eq!(outcome.quota, 0);
    assert!(outcome.invite.is_some());

    assert_eq!(engine.store().get_quota().await.unwrap(), 0);
    assert_eq!(attempts(&engine, &winner.id).await, 0);
    assert_eq!(attempts(&engine, &loser.id).await, 1);

    let winner = engine.store().get_user(&winner.id).await.unwrap();
    assert_eq!(winner.invite_status, InviteStatus::Pending);
    let loser = engine.store().get_user(&loser.id).await.unwrap();
    assert_eq!(loser.invite_status, InviteStatus::None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wins_never_exceed_quota() {
    let engine = Arc::new(engine().await.with_sampler(fixed(WIN)));
    engine.store().update_quota(3).await.unwrap();

    let mut users = Vec::new();
    for n in 0..8 {
        users.push(user(&engine, &format!("player-{n}")).await);
    }

    let mut tasks = JoinSet::new();
    for u in &users {
        let engine = Arc::clone(&engine);
        let id = u.id.clone();
        tasks.spawn(async move { engine.spin(&id, None).await });
    }

    let mut wins = 0;
    let mut empties = 0;
    while let Some(res) = tasks.join_next().await {
        match res.unwrap() {
            Ok(outcome) => {
                assert!(outcome.quota >= 0);
                wins += 1;
            }
            Err(err) if err.is_quota_empty() => empties += 1,
            Err(err) => panic!("unexpected draw failure: {err}"),
        }
    }

    assert_eq!(wins, 3);
    assert_eq!(empties, 5);
    assert_eq!(engine.store().get_quota().await.unwrap(), 0);

    let codes = engine.store().list_invite_codes(100, 0).await.unwrap();
    assert_eq!(codes.total, 3);
    let mut seen: Vec<_> = codes.items.iter().map(|c| c.code.clone()).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn retry_nets_zero_attempts() {
    let engine = engine().await.with_sampler(fixed(RETRY));
    let carol = user(&engine, "carol").await;

    for _ in 0..3 {
        let outcome = engine.spin(&carol.id, None).await.unwrap();
        assert_eq!(outcome.kind(), PrizeKind::Retry);
        assert!(outcome.invite.is_none());
        assert_eq!(attempts(&engine, &carol.id).await, 1);
    }
}

#[tokio::test]
async fn empty_quota_refunds_the_attempt() {
    let engine = engine().await.with_sampler(fixed(WIN));
    let dave = user(&engine, "dave").await;

    let err = engine.spin(&dave.id, None).await.unwrap_err();
    assert!(err.is_quota_empty());
    assert_eq!(err.code(), "quota_empty");
    assert_eq!(attempts(&engine, &dave.id).await, 1);
    assert!(engine.store().latest_invite_for_user(&dave.id).await.unwrap().is_none());
    assert!(engine.store().list_spin_records(10, 0).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn lose_consumes_the_attempt_and_is_audited() {
    let engine = engine().await.with_sampler(fixed(LOSE));
    engine.store().update_quota(7).await.unwrap();
    let erin = user(&engine, "erin").await;

    let outcome = engine.spin(&erin.id, Some("spin-erin-1")).await.unwrap();
    assert_eq!(outcome.kind(), PrizeKind::Lose);
    assert_eq!(outcome.quota, 7);
    assert_eq!(outcome.spin_id, "spin-erin-1");
    assert_eq!(attempts(&engine, &erin.id).await, 0);

    let record = engine.store().get_spin_record("spin-erin-1").await.unwrap().unwrap();
    assert_eq!(record.status, "lose");
    assert_eq!(record.user_id, erin.id);
    assert_eq!(record.username, "erin");

    let err = engine.spin(&erin.id, None).await.unwrap_err();
    assert!(matches!(err, DrawError::Store(InviteError::NoAttemptsLeft)));
    assert_eq!(attempts(&engine, &erin.id).await, 0);
}

#[tokio::test]
async fn winners_cannot_draw_again() {
    let engine = engine().await.with_sampler(fixed(WIN));
    engine.store().update_quota(5).await.unwrap();
    let frank = user(&engine, "frank").await;
    engine.store().add_attempts(&frank.id, 2).await.unwrap();

    engine.spin(&frank.id, None).await.unwrap();
    let err = engine.spin(&frank.id, None).await.unwrap_err();
    assert!(matches!(err, DrawError::AlreadyWon));
    assert_eq!(attempts(&engine, &frank.id).await, 2);
    assert_eq!(engine.store().get_quota().await.unwrap(), 4);
}

#[tokio::test]
async fn replayed_spin_id_keeps_one_audit_row() {
    let engine = engine().await.with_sampler(fixed(RETRY));
    let gina = user(&engine, "gina").await;

    engine.spin(&gina.id, Some("replay")).await.unwrap();
    engine.spin(&gina.id, Some("replay")).await.unwrap();

    let records = engine.store().list_spin_records(10, 0).await.unwrap();
    assert_eq!(records.total, 1);
    assert_eq!(records.items[0].spin_id, "replay");
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let engine = engine().await;
    let err = engine.spin("missing", None).await.unwrap_err();
    assert!(matches!(err, DrawError::Store(InviteError::UserNotFound)));
}

#[tokio::test]
async fn prize_table_updates_invalidate_the_cache() {
    let engine = engine().await.with_sampler(fixed(LOSE));
    engine.store().update_quota(1).await.unwrap();
    let hank = user(&engine, "hank").await;
    engine.store().add_attempts(&hank.id, 1).await.unwrap();

    assert_eq!(engine.spin(&hank.id, None).await.unwrap().kind(), PrizeKind::Lose);

    engine
        .update_prize_config(&[PrizeConfigItem::new(PrizeKind::Win, "Invite", 1.0)])
        .await
        .unwrap();
    let outcome = engine.spin(&hank.id, None).await.unwrap();
    assert_eq!(outcome.kind(), PrizeKind::Win);
    assert_eq!(outcome.prize.name, "Invite");
}

#[tokio::test]
async fn same_user_concurrent_wins_refund_the_loser() {
    let engine = engine().await.with_sampler(fixed(WIN));
    engine.store().update_quota(5).await.unwrap();
    let ivan = user(&engine, "ivan").await;
    engine.store().add_attempts(&ivan.id, 1).await.unwrap();

    let (a, b) = tokio::join!(engine.spin(&ivan.id, None), engine.spin(&ivan.id, None));

    let err = match (a, b) {
        (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
        other => panic!("expected exactly one win, got {other:?}"),
    };
    assert!(matches!(err, DrawError::AlreadyWon));
    assert_eq!(attempts(&engine, &ivan.id).await, 1);
    assert_eq!(engine.store().get_quota().await.unwrap(), 4);
    assert_eq!(engine.store().list_invite_codes(10, 0).await.unwrap().total, 1);
}

struct BrokenTable;

#[async_trait]
impl PrizeTableSource for BrokenTable {
    async fn load_prize_table(&self) -> Result<Vec<PrizeConfigItem>, LoadError> {
        Err(LoadError::Invalid("weights do not parse".to_string()))
    }
}

#[tokio::test]
async fn unreadable_prize_table_fails_the_spin() {
    let engine = engine().await;
    let jane = user(&engine, "jane").await;
    let prizes = Arc::new(PrizeTableCache::new(Arc::new(BrokenTable), Duration::from_secs(30)));
    let draws = DrawEngine::new(engine.store().clone(), prizes).with_sampler(fixed(WIN));

    let err = draws.spin(&jane, None).await.unwrap_err();
    assert!(matches!(err, DrawError::ConfigUnavailable(LoadError::Invalid(_))));
    assert_eq!(err.code(), "config_unavailable");
    assert_eq!(attempts(&engine, &jane.id).await, 0);
    assert_eq!(engine.store().list_spin_records(10, 0).await.unwrap().total, 0);
}
