//! Integration tests for `SqliteStore` against an in-memory database.

use bughist_core::{
  derive::MetricsDeriver,
  observe::NullObserver,
  pipeline::Pipeline,
  rebase::rebase,
  store::{SaveMode, SaveReport, TimelineLookup, TimelineSink},
  taxonomy::StatusTaxonomy,
  timeline::Timeline,
  version::{Interval, PersistenceState, Version},
};
use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t(hours: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(1_280_000_000 + hours * 3600, 0).unwrap()
}

fn forever() -> DateTime<Utc> { t(24 * 365 * 50) }

fn version(from: i64, to: Option<i64>, status: &str) -> Version {
  let to = to.map_or_else(forever, t);
  Version::new(Interval::new(t(from), to).unwrap(), "dev@example.com")
    .with_status(status)
}

fn bug(id: u64, versions: Vec<Version>) -> Timeline {
  let mut timeline = Timeline::new(id, "reporter@example.com");
  for v in versions {
    timeline.append(v).unwrap();
  }
  timeline
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_missing_bug_returns_none() {
  let s = store().await;
  assert!(s.find_timeline(404).await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_bug_id_is_rejected() {
  let s = store().await;
  let err = s.find_timeline(u64::MAX).await.unwrap_err();
  assert!(matches!(err, Error::BugIdOutOfRange(_)));
}

// ─── Insert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_timeline_is_inserted_and_loaded_as_saved() {
  let s = store().await;
  let timeline = bug(10, vec![
    version(0, Some(24), "NEW")
      .with_facet("product", "Firefox")
      .with_annotation("initial import"),
    version(24, None, "ASSIGNED"),
  ]);

  let report = s.save_timeline(&timeline).await.unwrap();
  assert_eq!(report, SaveReport {
    mode:     SaveMode::Insert,
    inserted: 2,
    updated:  0,
    skipped:  0,
  });

  let loaded = s.find_timeline(10).await.unwrap().unwrap();
  assert_eq!(loaded.reporter(), "reporter@example.com");
  assert!(!loaded.never_saved());
  assert!(loaded.iter().all(|v| v.persistence_state() == PersistenceState::Saved));

  let first = loaded.first().unwrap();
  assert_eq!(first.from(), t(0));
  assert_eq!(first.to(), t(24));
  assert_eq!(first.status(), Some("NEW"));
  assert_eq!(first.raw_facets().get("product").map(String::as_str), Some("Firefox"));
  assert_eq!(first.annotation(), Some("initial import"));
  assert_eq!(loaded.last().unwrap().to(), forever());
}

#[tokio::test]
async fn derived_attributes_roundtrip() {
  let s = store().await;
  let taxonomy = StatusTaxonomy::bugzilla();
  let mut timeline = bug(11, vec![
    version(0, Some(36), "NEW"),
    version(36, None, "RESOLVED"),
  ]);
  MetricsDeriver::new(&taxonomy)
    .apply(&mut timeline, t(48), &NullObserver)
    .unwrap();
  s.save_timeline(&timeline).await.unwrap();

  let loaded = s.find_timeline(11).await.unwrap().unwrap();
  let expected: Vec<_> = timeline.iter().map(|v| v.derived().cloned()).collect();
  let actual: Vec<_> = loaded.iter().map(|v| v.derived().cloned()).collect();
  assert_eq!(actual, expected);
}

// ─── Incremental update ──────────────────────────────────────────────────────

#[tokio::test]
async fn rebased_timeline_writes_only_changes() {
  let s = store().await;
  let taxonomy = StatusTaxonomy::bugzilla();
  let deriver = MetricsDeriver::new(&taxonomy);

  let mut first = bug(12, vec![
    version(0, Some(24), "NEW"),
    version(24, None, "ASSIGNED"),
  ]);
  deriver.apply(&mut first, t(30), &NullObserver).unwrap();
  s.save_timeline(&first).await.unwrap();

  let existing = s.find_timeline(12).await.unwrap().unwrap();
  let mut incoming = bug(12, vec![version(60, None, "RESOLVED")]);
  rebase(&mut incoming, existing, &NullObserver).unwrap();
  deriver.apply(&mut incoming, t(70), &NullObserver).unwrap();

  let report = s.save_timeline(&incoming).await.unwrap();
  assert_eq!(report, SaveReport {
    mode:     SaveMode::Update,
    inserted: 1,
    updated:  1,
    skipped:  1,
  });

  let loaded = s.find_timeline(12).await.unwrap().unwrap();
  let spans: Vec<_> = loaded.iter().map(|v| (v.from(), v.to())).collect();
  assert_eq!(spans, vec![(t(0), t(24)), (t(24), t(60)), (t(60), forever())]);
  let assigned = loaded.iter().nth(1).and_then(Version::derived).unwrap();
  assert_eq!(assigned.days_in_status, Some(1));
}

#[tokio::test]
async fn dirty_version_without_stored_row_fails_atomically() {
  let s = store().await;
  s.save_timeline(&bug(13, vec![version(0, None, "NEW")]))
    .await
    .unwrap();

  let broken = bug(13, vec![
    version(0, Some(5), "NEW").with_state(PersistenceState::Saved),
    version(5, Some(9), "ASSIGNED"),
    version(9, None, "RESOLVED").with_state(PersistenceState::Dirty),
  ]);
  let err = s.save_timeline(&broken).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));

  // The new version inserted before the failure was rolled back.
  let loaded = s.find_timeline(13).await.unwrap().unwrap();
  assert_eq!(loaded.len(), 1);
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pipeline_runs_against_sqlite() {
  let s = store().await;
  let taxonomy = StatusTaxonomy::bugzilla();
  let pipeline = Pipeline::new(&s, &s, &taxonomy, &NullObserver);

  let report = pipeline
    .process_batch(
      vec![
        bug(20, vec![version(0, Some(48), "NEW"), version(48, None, "ASSIGNED")]),
        bug(21, vec![version(0, None, "UNKNOWN")]),
      ],
      t(50),
    )
    .await;
  assert_eq!(report.saved.len(), 1);
  assert_eq!(report.failed.len(), 1);
  assert_eq!(report.failed[0].bug_id, 21);

  // Re-running the same extraction changes nothing.
  let report = pipeline
    .process_batch(
      vec![bug(20, vec![version(0, Some(48), "NEW"), version(48, None, "ASSIGNED")])],
      t(50),
    )
    .await;
  assert_eq!(report.saved[0].report, SaveReport {
    mode:     SaveMode::Update,
    inserted: 0,
    updated:  0,
    skipped:  2,
  });
  assert!(s.find_timeline(21).await.unwrap().is_none());
}

#[tokio::test]
async fn rerun_with_sub_millisecond_timestamps_is_idempotent() {
  let s = store().await;
  let taxonomy = StatusTaxonomy::bugzilla();
  let pipeline = Pipeline::new(&s, &s, &taxonomy, &NullObserver);

  let at = |hours| t(hours) + TimeDelta::microseconds(500);
  let extract = || {
    bug(30, vec![
      Version::new(Interval::new(at(0), at(24)).unwrap(), "dev@example.com")
        .with_status("NEW"),
      Version::new(Interval::new(at(24), forever()).unwrap(), "dev@example.com")
        .with_status("ASSIGNED"),
    ])
  };

  let first = pipeline.process_batch(vec![extract()], t(30)).await;
  assert!(first.is_success());

  let loaded = s.find_timeline(30).await.unwrap().unwrap();
  assert_eq!(loaded.first().unwrap().from(), at(0));
  assert_eq!(loaded.last().unwrap().from(), at(24));

  let second = pipeline.process_batch(vec![extract()], t(30)).await;
  assert!(second.is_success(), "{:?}", second.failed);
  assert_eq!(second.saved[0].report, SaveReport {
    mode:     SaveMode::Update,
    inserted: 0,
    updated:  0,
    skipped:  2,
  });
}
