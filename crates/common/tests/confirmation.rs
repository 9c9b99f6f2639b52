//! Integration tests for storage confirmation tracking

mod common;

use std::time::Duration;

use ::common::confirmation::{ConfirmationTracker, TrackerError};
use ::common::event_log::{ConfirmStorage, EventLedger, FromHeight, JournalEventLedger};
use ::common::ledger::{Ledger, MemoryLedger};
use ::common::shard::ShardId;
use crate::common::{event, ScriptedEventLedger};

fn shard(n: u8) -> ShardId {
    ShardId::from_share_bytes(&[n; 8])
}

#[tokio::test]
async fn test_query_history_never_regresses() {
    let id = shard(1);
    let script = ScriptedEventLedger::new(vec![
        vec![event(&id, 5, "carol")],
        vec![event(&id, 4, "mallory"), event(&id, 5, "mallory")],
        vec![event(&id, 3, "mallory"), event(&id, 7, "dave"), event(&id, 6, "mallory")],
        vec![event(&id, 1, "mallory")],
    ]);
    let tracker = ConfirmationTracker::new(
        &common::test_config(),
        Ledger::new(MemoryLedger::new()),
        script.clone(),
    );

    let mut heights = Vec::new();
    for _ in 0..4 {
        let record = tracker.query_history(&id).await.unwrap().unwrap();
        heights.push(record.block_height);
        assert_eq!(tracker.cached(&id).await.unwrap(), Some(record));
    }

    assert_eq!(heights, vec![5, 5, 7, 7]);
    assert!(heights.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        tracker.cached(&id).await.unwrap().unwrap().attesting_party,
        "dave"
    );

    // each query resumes from the cached height
    let starts: Vec<_> = script.queries().into_iter().map(|f| f.from).collect();
    assert_eq!(
        starts,
        vec![
            FromHeight::Height(0),
            FromHeight::Height(5),
            FromHeight::Height(5),
            FromHeight::Height(7)
        ]
    );
}

#[tokio::test]
async fn test_upload_then_watch_for_custodian() {
    let env = common::setup_test_env().await;
    let secret = "legal winner thank year wave sausage worth useful legal winner thank yellow".into();
    let password = ::common::crypto::Password::from("pw");
    let shares = env.splitter.split(&secret, 3, 2, Some(&password)).await.unwrap();
    let record = env.custody.upload_remote(&shares[0]).await.unwrap();

    let watcher = {
        let tracker = env.tracker.clone();
        let id = record.shard_id.clone();
        tokio::spawn(async move { tracker.watch_once(&id).await })
    };
    while env.events.subscriber_count() == 0 {
        tokio::task::yield_now().await;
    }

    env.events
        .submit(ConfirmStorage {
            shard_ids: vec![record.shard_id.clone()],
            attesting_party: "carol".to_string(),
        })
        .await
        .unwrap();

    let confirmation = watcher.await.unwrap().unwrap();
    assert_eq!(confirmation.attesting_party, "carol");
    assert_eq!(env.events.subscriber_count(), 0);

    let status = env.tracker.shard_status().await.unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].shard_id, record.shard_id);
    assert_eq!(status[0].confirmation.as_ref(), Some(&confirmation));
}

#[tokio::test]
async fn test_dropping_watch_tears_down_subscription() {
    let env = common::setup_test_env().await;
    let id = shard(2);

    let result = tokio::time::timeout(Duration::from_millis(50), env.tracker.watch_once(&id)).await;
    assert!(result.is_err(), "nothing was confirmed, the watch must still be pending");
    assert_eq!(env.events.subscriber_count(), 0);

    let result = env
        .tracker
        .watch_once_until(&id, tokio::time::sleep(Duration::from_millis(20)))
        .await;
    assert!(matches!(result, Err(TrackerError::Cancelled)));
    assert_eq!(env.events.subscriber_count(), 0);
    assert!(env.tracker.cached(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_at_most_one_delivery_per_watch() {
    let env = common::setup_test_env().await;
    let id = shard(3);

    let watcher = {
        let tracker = env.tracker.clone();
        let id = id.clone();
        tokio::spawn(async move { tracker.watch_once(&id).await })
    };
    while env.events.subscriber_count() == 0 {
        tokio::task::yield_now().await;
    }

    for party in ["carol", "dave"] {
        env.events
            .submit(ConfirmStorage {
                shard_ids: vec![id.clone()],
                attesting_party: party.to_string(),
            })
            .await
            .unwrap();
    }

    let first = watcher.await.unwrap().unwrap();
    assert_eq!(first.attesting_party, "carol");
    assert_eq!(first.block_height, 1);

    // history still catches the later block
    let latest = env.tracker.query_history(&id).await.unwrap().unwrap();
    assert_eq!(latest.attesting_party, "dave");
    assert_eq!(latest.block_height, 2);
}

#[tokio::test]
async fn test_journal_ledger_end_to_end() {
    let temp_dir = tempfile::tempdir().unwrap();
    let journal = JournalEventLedger::new(temp_dir.path().join("events.jsonl"))
        .with_poll_interval(Duration::from_millis(10));
    let tracker = ConfirmationTracker::new(
        &common::test_config(),
        Ledger::new(MemoryLedger::new()),
        journal.clone(),
    );
    let ids = vec![shard(4), shard(5)];

    let (receipt, records) = tracker.confirm_storage(&ids, "carol").await.unwrap();
    assert_eq!(receipt.block_height, 1);
    assert_eq!(records.len(), 2);

    // a custodian in another process appends to the same journal
    let custodian = JournalEventLedger::new(journal.path());
    let watched = ids[0].clone();
    let watcher = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.watch_once(&watched).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    custodian
        .submit(ConfirmStorage {
            shard_ids: vec![ids[0].clone()],
            attesting_party: "dave".to_string(),
        })
        .await
        .unwrap();

    let record = tokio::time::timeout(Duration::from_secs(5), watcher)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(record.attesting_party, "dave");
    assert_eq!(record.block_height, 2);

    assert_eq!(
        tracker.query_history(&ids[1]).await.unwrap().unwrap().block_height,
        1
    );
}

#[tokio::test]
async fn test_unavailable_ledger_is_reported() {
    let env = common::setup_test_env().await;
    env.events.set_offline(true);

    let result = env.tracker.sync_owned().await;
    assert!(result.is_ok(), "nothing owned means nothing to query");

    env.custody
        .ledger()
        .append_unique(
            &::common::ledger::keys::owned_shards(common::ACCOUNT),
            shard(6).as_str(),
        )
        .await
        .unwrap();
    let result = env.tracker.sync_owned().await;
    assert!(matches!(result, Err(TrackerError::LedgerUnavailable(_))));
}
