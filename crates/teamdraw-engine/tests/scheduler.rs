mod common;

use std::time::Duration;

use teamdraw_engine::scheduler::TickOutcome;
use teamdraw_engine::store::NewQuotaSchedule;
use teamdraw_engine::util::now_ts;

use common::{config, engine, engine_with};

fn schedule(target: i64, apply_at: i64) -> NewQuotaSchedule {
    NewQuotaSchedule {
        target,
        apply_at,
        author: "ops".to_string(),
        message: "weekend batch".to_string(),
    }
}

#[tokio::test]
async fn applies_only_once_due() {
    let engine = engine().await;
    engine.store().update_quota(10).await.unwrap();
    let scheduler = engine.scheduler();
    let now = now_ts();

    assert_eq!(scheduler.tick_at(now).await.unwrap(), TickOutcome::Idle);

    engine.schedule_quota(&schedule(50, now + 5)).await.unwrap();

    let early = scheduler.tick_at(now + 1).await.unwrap();
    assert_eq!(early, TickOutcome::Armed { apply_at: now + 5 });
    assert_eq!(engine.store().get_quota().await.unwrap(), 10);
    assert!(engine.store().load_quota_schedule().await.unwrap().is_some());

    let due = scheduler.tick_at(now + 6).await.unwrap();
    assert_eq!(due, TickOutcome::Applied { target: 50 });
    assert_eq!(engine.store().get_quota().await.unwrap(), 50);
    assert!(engine.store().load_quota_schedule().await.unwrap().is_none());

    assert_eq!(scheduler.tick_at(now + 7).await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn reapplying_an_uncleared_schedule_is_harmless() {
    let engine = engine().await;
    let now = now_ts();
    engine.schedule_quota(&schedule(20, now - 1)).await.unwrap();
    // As if a previous pass set the quota and crashed before clearing.
    engine.store().update_quota(20).await.unwrap();

    let outcome = engine.scheduler().tick_at(now).await.unwrap();
    assert_eq!(outcome, TickOutcome::Applied { target: 20 });
    assert_eq!(engine.store().get_quota().await.unwrap(), 20);
}

#[tokio::test]
async fn a_new_schedule_replaces_the_pending_one() {
    let engine = engine().await;
    let now = now_ts();
    engine.schedule_quota(&schedule(5, now + 60)).await.unwrap();
    engine.schedule_quota(&schedule(9, now + 120)).await.unwrap();

    let pending = engine.store().load_quota_schedule().await.unwrap().unwrap();
    assert_eq!((pending.target, pending.apply_at), (9, now + 120));

    let err = engine.schedule_quota(&schedule(-1, now)).await.unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[tokio::test]
async fn background_loop_applies_and_stops() {
    let mut cfg = config();
    cfg.quota_scheduler_tick = Duration::from_millis(20);
    let engine = engine_with(cfg).await;
    engine.schedule_quota(&schedule(42, now_ts() - 1)).await.unwrap();

    let handle = engine.spawn_scheduler();
    let mut quota = 0;
    for _ in 0..100 {
        quota = engine.store().get_quota().await.unwrap();
        if quota == 42 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.shutdown().await;

    assert_eq!(quota, 42);
    assert!(engine.store().load_quota_schedule().await.unwrap().is_none());
}
