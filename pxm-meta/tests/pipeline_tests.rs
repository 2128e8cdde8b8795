//! Maintenance pipeline end-to-end tests

mod helpers;

use async_trait::async_trait;
use helpers::{add_photo, count_rows, create_test_db, quiet_settings, PhotoSpec};
use pxm_common::db::set_setting;
use pxm_common::events::EventBus;
use pxm_common::PxmEvent;
use pxm_meta::db::photos::find_photo_by_uid;
use pxm_meta::db::SqliteStore;
use pxm_meta::models::Photo;
use pxm_meta::services::{
    FaceRecognizer, ItemTransform, MaintenancePipeline, MaintenanceStage, PageScanner,
    PipelineOutcome, ScanOptions, TaskRegistry, TransformOutcome,
};
use pxm_meta::{MetaWorker, PipelineError};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn worker(pool: &SqlitePool, registry: &TaskRegistry) -> (MetaWorker, EventBus) {
    let events = EventBus::new(1024);
    let worker = MetaWorker::new(pool.clone(), events.clone(), registry, None)
        .await
        .unwrap();
    (worker, events)
}

fn completed(outcome: PipelineOutcome) -> pxm_meta::services::PipelineReport {
    match outcome {
        PipelineOutcome::Completed(report) => report,
        other => panic!("expected completed run, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_optimizes_every_photo_once() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;
    for i in 0..120 {
        add_photo(&pool, PhotoSpec::new(format!("p{:03}", i)).taken_at(1_700_000_000 + i * 60)).await;
    }

    let (worker, _events) = worker(&pool, &TaskRegistry::new()).await;

    let report = completed(worker.start().await.unwrap());
    assert_eq!(report.optimized(), 120);
    assert_eq!(report.scan.processed, 120);
    assert_eq!(report.scan.pages, 4, "50 + 50 + 20 + final empty page");
    assert!(report.stage_failures.is_empty());
    assert_eq!(report.disabled_stages, vec!["faces"]);

    let photo = find_photo_by_uid(&pool, "p000").await.unwrap().unwrap();
    assert!(photo.camera_id.is_some());
    assert!(photo.lens_id.is_some());
    assert_eq!(photo.quality, 3);
    assert!(photo.checked_at.is_some());

    assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM photos WHERE checked_at IS NULL").await, 0);
    assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM lenses WHERE lens_slug <> 'zz'").await, 1);

    let second = completed(worker.start().await.unwrap());
    assert_eq!(second.optimized(), 0, "nothing changes on an immediate rerun");
}

#[tokio::test]
async fn test_skipped_while_running() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;
    add_photo(&pool, PhotoSpec::new("p1")).await;

    let registry = TaskRegistry::new();
    let (worker, events) = worker(&pool, &registry).await;
    let mut rx = events.subscribe();

    let _active = registry.guard(pxm_meta::META_TASK).start().unwrap();
    let outcome = worker.start().await.unwrap();

    assert_eq!(outcome, PipelineOutcome::Skipped);
    assert_eq!(outcome.to_string(), "skipped: already running");
    assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM photos WHERE checked_at IS NOT NULL").await, 0);
    assert!(matches!(rx.try_recv(), Ok(PxmEvent::MaintenanceSkipped { .. })));
}

#[tokio::test]
async fn test_cancel_before_run() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;
    add_photo(&pool, PhotoSpec::new("p1")).await;

    let (worker, _events) = worker(&pool, &TaskRegistry::new()).await;
    worker.guard().cancel();

    let outcome = worker.start().await.unwrap();

    assert_eq!(outcome, PipelineOutcome::Canceled);
    assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM photos WHERE checked_at IS NOT NULL").await, 0);
    assert!(!worker.guard().running());
    assert!(!worker.guard().canceled(), "stop clears the request");

    let report = completed(worker.start().await.unwrap());
    assert_eq!(report.optimized(), 1);
}

#[tokio::test]
async fn test_document_stack_merges_duplicates() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;
    let keep_id = add_photo(&pool, PhotoSpec::new("p1").document("doc-1")).await;
    add_photo(&pool, PhotoSpec::new("p2").document("doc-1").taken_at(1_700_000_500)).await;

    let (worker, events) = worker(&pool, &TaskRegistry::new()).await;
    let mut rx = events.subscribe();

    let report = completed(worker.start().await.unwrap());
    assert_eq!(report.scan.merged, 1);
    assert_eq!(report.scan.processed, 1, "merged photo is not processed again");

    let merged = find_photo_by_uid(&pool, "p2").await.unwrap().unwrap();
    assert_eq!(merged.merged_into.as_deref(), Some("p1"));
    assert!(merged.deleted_at.is_some());

    let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE photo_id = ?")
        .bind(keep_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(files, 2);

    let mut merge_events = 0;
    while let Ok(event) = rx.try_recv() {
        if let PxmEvent::PhotosMerged { photo_uid, merged_uids, .. } = event {
            assert_eq!(photo_uid, "p1");
            assert_eq!(merged_uids, vec!["p2".to_string()]);
            merge_events += 1;
        }
    }
    assert_eq!(merge_events, 1);
}

#[tokio::test]
async fn test_capture_duplicates_merge_on_first_run() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;
    add_photo(&pool, PhotoSpec::new("p1").taken_at(1_700_000_000)).await;
    add_photo(&pool, PhotoSpec::new("p2").taken_at(1_700_000_000)).await;

    let (worker, _events) = worker(&pool, &TaskRegistry::new()).await;
    let report = completed(worker.start().await.unwrap());

    assert_eq!(report.scan.merged, 1);
    let merged = find_photo_by_uid(&pool, "p2").await.unwrap().unwrap();
    assert_eq!(merged.merged_into.as_deref(), Some("p1"));
    assert!(merged.deleted_at.is_some());
}

#[tokio::test]
async fn test_merge_does_not_shift_later_pages() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 2).await;
    add_photo(&pool, PhotoSpec::new("p1").document("doc-1")).await;
    add_photo(&pool, PhotoSpec::new("p2").document("doc-1").taken_at(1_700_000_100)).await;
    add_photo(&pool, PhotoSpec::new("p3").taken_at(1_700_000_200)).await;
    add_photo(&pool, PhotoSpec::new("p4").taken_at(1_700_000_300)).await;

    let (worker, _events) = worker(&pool, &TaskRegistry::new()).await;
    let report = completed(worker.start().await.unwrap());

    assert_eq!(report.scan.processed, 3);
    assert_eq!(report.scan.merged, 1);
    assert_eq!(
        count_rows(&pool, "SELECT COUNT(*) FROM photos WHERE deleted_at IS NULL AND checked_at IS NULL").await,
        0,
        "every live photo is checked in one run"
    );
}

#[tokio::test]
async fn test_moments_and_previews() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;

    // 2024-08-10T00:00:00Z, one photo an hour
    let august = 1_723_248_000;
    for i in 0..10 {
        add_photo(&pool, PhotoSpec::new(format!("m{}", i)).taken_at(august + i * 3600)).await;
    }

    let (worker, _events) = worker(&pool, &TaskRegistry::new()).await;
    completed(worker.start().await.unwrap());

    let (title, thumb): (String, String) = sqlx::query_as(
        "SELECT album_title, thumb FROM albums WHERE album_type = 'moment' AND album_slug = 'august-2024'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(title, "August 2024");
    assert_eq!(thumb, "hash-m9");
    assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM photos_albums").await, 10);

    // A second run creates nothing new and refreshes the count
    completed(worker.start().await.unwrap());
    assert_eq!(count_rows(&pool, "SELECT COUNT(*) FROM albums").await, 1);
    assert_eq!(count_rows(&pool, "SELECT photo_count FROM albums").await, 10);
}

#[tokio::test]
async fn test_photo_without_primary_file_scores_minus_one() {
    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;
    add_photo(&pool, PhotoSpec::new("p1").without_file()).await;

    let (worker, _events) = worker(&pool, &TaskRegistry::new()).await;
    completed(worker.start().await.unwrap());

    let photo = find_photo_by_uid(&pool, "p1").await.unwrap().unwrap();
    assert_eq!(photo.quality, -1);
}

#[tokio::test]
async fn test_faces_stage_runs_when_enabled() {
    struct Recognizer(AtomicUsize);

    #[async_trait]
    impl FaceRecognizer for Recognizer {
        async fn recognize(&self) -> anyhow::Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    let (_dir, pool) = create_test_db().await;
    quiet_settings(&pool, 50).await;
    set_setting(&pool, "faces_enabled", true).await.unwrap();

    let recognizer = Arc::new(Recognizer(AtomicUsize::new(0)));
    let shared: Arc<dyn FaceRecognizer> = recognizer.clone();
    let worker = MetaWorker::new(pool.clone(), EventBus::new(64), &TaskRegistry::new(), Some(shared))
        .await
        .unwrap();

    let report = completed(worker.start().await.unwrap());
    assert!(report.disabled_stages.is_empty());
    assert_eq!(recognizer.0.load(Ordering::SeqCst), 1);
}

/// Transform that leaves photos untouched
struct NoopTransform;

#[async_trait]
impl ItemTransform<Photo> for NoopTransform {
    async fn apply(&self, _photo: &Photo) -> anyhow::Result<TransformOutcome> {
        Ok(TransformOutcome::unchanged())
    }
}

/// Stage with scripted behaviour that records its invocation
struct ScriptedStage {
    name: &'static str,
    behaviour: Behaviour,
    log: Arc<Mutex<Vec<&'static str>>>,
}

enum Behaviour {
    Succeed,
    Fail,
    Panic,
}

#[async_trait]
impl MaintenanceStage for ScriptedStage {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(self.name);
        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => anyhow::bail!("database is locked"),
            Behaviour::Panic => panic!("index out of bounds"),
        }
    }
}

fn scripted_pipeline(
    pool: &SqlitePool,
    registry: &TaskRegistry,
    stages: Vec<(&'static str, Behaviour)>,
) -> (MaintenancePipeline, Arc<Mutex<Vec<&'static str>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let stages: Vec<Arc<dyn MaintenanceStage>> = stages
        .into_iter()
        .map(|(name, behaviour)| {
            Arc::new(ScriptedStage {
                name,
                behaviour,
                log: log.clone(),
            }) as Arc<dyn MaintenanceStage>
        })
        .collect();

    let pipeline = MaintenancePipeline::new(
        registry.guard(pxm_meta::META_TASK),
        PageScanner::new(ScanOptions {
            page_size: 10,
            page_delay: Duration::ZERO,
        }),
        Arc::new(SqliteStore::new(pool.clone())),
        Arc::new(NoopTransform),
        stages,
        Duration::from_secs(1200),
        EventBus::new(16),
    );
    (pipeline, log)
}

#[tokio::test]
async fn test_failed_stage_does_not_stop_later_stages() {
    let (_dir, pool) = create_test_db().await;
    let registry = TaskRegistry::new();
    let (pipeline, log) = scripted_pipeline(
        &pool,
        &registry,
        vec![
            ("counts", Behaviour::Succeed),
            ("moments", Behaviour::Fail),
            ("previews", Behaviour::Succeed),
        ],
    );

    let outcome = pipeline.run().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["counts", "moments", "previews"]);
    assert_eq!(
        outcome.to_string(),
        "completed: 0 items optimized; failed: moments - database is locked"
    );
}

#[tokio::test]
async fn test_panic_is_reported_and_guard_released() {
    let (_dir, pool) = create_test_db().await;
    let registry = TaskRegistry::new();
    let (pipeline, log) = scripted_pipeline(
        &pool,
        &registry,
        vec![("counts", Behaviour::Panic), ("previews", Behaviour::Succeed)],
    );

    let err = pipeline.run().await.unwrap_err();

    match &err {
        PipelineError::Panicked { stage, message, backtrace } => {
            assert_eq!(stage, "counts");
            assert_eq!(message, "index out of bounds");
            assert!(!backtrace.is_empty());
        }
        other => panic!("expected panic report, got {:?}", other),
    }
    assert_eq!(*log.lock().unwrap(), vec!["counts"]);
    assert!(!registry.guard(pxm_meta::META_TASK).running());

    // The guard is free for the next run
    let (retry, _log) = scripted_pipeline(&pool, &registry, vec![]);
    assert!(matches!(retry.run().await, Ok(PipelineOutcome::Completed(_))));
}
