//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use greenorb_core::{
  activity::{ActivityLevel, NewActivity},
  event::EventKind,
  record::{Analysis, Company, Record},
  stage::StageKind,
  store::{EsgStore, materialize},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn discovered(names: &[&str]) -> EventKind {
  let now = Utc::now();
  EventKind::Discovered(names.iter().map(|n| Company::new(*n, now)).collect())
}

// ─── Event log ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_assigns_increasing_seqs() {
  let s = store().await;

  let first = s.append(vec![discovered(&["Acme"]), discovered(&["Globex"])]).await.unwrap();
  let second = s.append(vec![EventKind::SectorAdvanced { index: 1 }]).await.unwrap();

  assert_eq!(first.len(), 2);
  assert!(first[0].seq < first[1].seq);
  assert!(first[1].seq < second[0].seq);
}

#[tokio::test]
async fn empty_append_writes_nothing() {
  let s = store().await;
  assert!(s.append(vec![]).await.unwrap().is_empty());
  assert!(s.events_after(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn events_round_trip_through_the_columns() {
  let s = store().await;
  let analysis = Analysis { company: "Acme".into(), score: Some(72), ..Default::default() };
  let written = s
    .append(vec![
      discovered(&["Acme"]),
      EventKind::Analyzed(analysis.clone()),
      EventKind::Upserted(Record::Analysis(analysis)),
      EventKind::SectorAdvanced { index: 4 },
    ])
    .await
    .unwrap();

  let read = s.events_after(0).await.unwrap();
  assert_eq!(read, written);
}

#[tokio::test]
async fn events_after_skips_seen_events() {
  let s = store().await;
  let written = s
    .append(vec![discovered(&["A"]), discovered(&["B"]), discovered(&["C"])])
    .await
    .unwrap();

  let tail = s.events_after(written[0].seq).await.unwrap();
  assert_eq!(tail.len(), 2);
  assert_eq!(tail[0].seq, written[1].seq);

  let none = s.events_after(written[2].seq).await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn materialize_folds_the_whole_log() {
  let s = store().await;
  s.append(vec![discovered(&["Acme", "Globex"])]).await.unwrap();
  s.append(vec![discovered(&["acme ", "Initech"])]).await.unwrap();

  let p = materialize(&s, 500).await.unwrap();
  assert_eq!(p.companies().len(), 3);
  assert_eq!(p.analyst_backlog().len(), 3);
}

// ─── Clear ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_empties_records_and_feed_but_keeps_cursor() {
  let s = store().await;
  s.append(vec![discovered(&["Acme"]), EventKind::SectorAdvanced { index: 6 }])
    .await
    .unwrap();
  s.record_activity(NewActivity::system("hello")).await.unwrap();

  let cleared = s.clear().await.unwrap();
  assert_eq!(cleared.kind, EventKind::Cleared);

  let p = materialize(&s, 500).await.unwrap();
  assert!(p.companies().is_empty());
  assert_eq!(p.sector_index(), 6);
  assert!(s.recent_activity(10).await.unwrap().is_empty());

  // Only the cursor survives ahead of the clear.
  let kinds: Vec<_> = s.events_after(0).await.unwrap().into_iter().map(|e| e.kind).collect();
  assert_eq!(kinds, [EventKind::SectorAdvanced { index: 6 }, EventKind::Cleared]);
}

#[tokio::test]
async fn clear_compacts_the_log_for_every_reader() {
  let s = store().await;
  s.append(vec![discovered(&["Acme", "Globex"]), EventKind::SectorAdvanced { index: 1 }])
    .await
    .unwrap();
  s.append(vec![EventKind::SectorAdvanced { index: 2 }]).await.unwrap();

  // A reader that caught up before the clear.
  let mut early = materialize(&s, 500).await.unwrap();
  let cleared = s.clear().await.unwrap();
  s.append(vec![discovered(&["Initech"])]).await.unwrap();

  let events = s.events_after(0).await.unwrap();
  assert_eq!(events.len(), 3);
  assert_eq!(events[0].kind, EventKind::SectorAdvanced { index: 2 });
  assert_eq!(events[1].seq, cleared.seq);

  for event in &s.events_after(early.last_seq()).await.unwrap() {
    early.apply(event);
  }
  let fresh = materialize(&s, 500).await.unwrap();
  for p in [&early, &fresh] {
    assert_eq!(p.sector_index(), 2);
    let names: Vec<_> = p.companies().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Initech"]);
  }
}

// ─── Activity feed ───────────────────────────────────────────────────────────

#[tokio::test]
async fn activity_is_returned_oldest_first() {
  let s = store().await;
  s.record_activity(NewActivity::new(StageKind::Scout, ActivityLevel::Search, "one"))
    .await
    .unwrap();
  s.record_activity(NewActivity::new(StageKind::Analyst, ActivityLevel::Error, "two"))
    .await
    .unwrap();
  s.record_activity(NewActivity::system("three")).await.unwrap();

  let feed = s.recent_activity(10).await.unwrap();
  let messages: Vec<_> = feed.iter().map(|e| e.message.as_str()).collect();
  assert_eq!(messages, ["one", "two", "three"]);
  assert_eq!(feed[0].stage, Some(StageKind::Scout));
  assert_eq!(feed[1].level, ActivityLevel::Error);
  assert_eq!(feed[2].stage, None);

  let newest = s.recent_activity(2).await.unwrap();
  assert_eq!(newest[0].message, "two");
}

#[tokio::test]
async fn activity_is_trimmed_to_the_feed_cap() {
  let s = store().await.with_feed_cap(3);
  for i in 0..5 {
    s.record_activity(NewActivity::system(format!("line {i}"))).await.unwrap();
  }

  let feed = s.recent_activity(50).await.unwrap();
  let messages: Vec<_> = feed.iter().map(|e| e.message.as_str()).collect();
  assert_eq!(messages, ["line 2", "line 3", "line 4"]);
}

#[tokio::test]
async fn file_backed_store_persists_across_reopen() {
  let dir = std::env::temp_dir().join(format!("greenorb-test-{}", uuid::Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("store.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.append(vec![discovered(&["Acme"])]).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  let p = materialize(&s, 500).await.unwrap();
  assert_eq!(p.companies().len(), 1);

  std::fs::remove_dir_all(&dir).ok();
}
