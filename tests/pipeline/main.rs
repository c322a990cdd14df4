//! Integration tests for the fetch-and-reconcile pipeline
//!
//! These tests drive the public API end to end against a scripted catalog
//! site: listing, detail parsing, caching, reconciliation, planning, staged
//! downloads and record generation.

mod support;

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use shmupfetch::app::{
    CatalogStore, EntryOutcome, FetchOptions, JsonFileStore, MemoryStore, Orientation,
};
use shmupfetch::errors::{AppError, CatalogError};

use support::{detail_html, listing_html, pipeline, ScriptedSite};

/// Cave lists a complete parent set and a clone that needs its parent
fn cave_site() -> ScriptedSite {
    ScriptedSite::new()
        .page(
            "/manufacturer/Cave",
            listing_html(&[
                ("ddonpach", "DoDonPachi (1997/02/05 MASTER VER.)"),
                ("donpachij", "DonPachi (Japan)"),
            ]),
        )
        .page(
            "/game/ddonpach",
            detail_html("DoDonPachi", None, &[("ddonpach", 100)]),
        )
        .page(
            "/game/donpachij",
            detail_html(
                "DonPachi (Japan)",
                Some("donpachi"),
                &[("donpachi", 50), ("donpachij", 10)],
            ),
        )
        .file("/download/split/ddonpach.zip", vec![0xdd; 100])
        .file("/download/split/donpachi.zip", vec![0xd0; 50])
}

fn no_staging_left(dest: &Path) -> bool {
    std::fs::read_dir(dest)
        .unwrap()
        .all(|e| !e.unwrap().file_name().to_string_lossy().starts_with('.'))
}

fn missing_only() -> FetchOptions {
    FetchOptions {
        missing_only: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_missing_clone_is_assembled_with_its_parent() {
    let dest = TempDir::new().unwrap();
    std::fs::write(dest.path().join("ddonpach.zip"), vec![0xdd; 100]).unwrap();

    let site = Arc::new(cave_site().file("/download/split/donpachij.zip", vec![0x0c; 10]));
    let harness = pipeline(site.clone(), Arc::new(MemoryStore::new()), dest.path());

    let run = harness
        .pipeline
        .run_developer("cave", &missing_only())
        .await
        .unwrap();

    assert_eq!(run.developer, "Cave");
    assert_eq!(run.listed, 2);
    assert_eq!(run.present, 1);
    let selected: Vec<_> = run.selected.iter().map(|e| e.identifier.as_str()).collect();
    assert_eq!(selected, ["donpachij"]);

    let summary = run.summary.as_ref().unwrap();
    assert_eq!(summary.succeeded(), 1);
    let EntryOutcome::Succeeded { artifact } = &summary.reports[0].outcome else {
        panic!("expected success, got {:?}", summary.reports[0].outcome);
    };
    assert_eq!(artifact.identifier, "donpachij");
    assert_eq!(artifact.total_size, 60);
    assert_eq!(artifact.path, dest.path().join("donpachij.zip"));
    assert!(!artifact.already_present);

    assert_eq!(
        std::fs::metadata(dest.path().join("donpachi.zip")).unwrap().len(),
        50
    );
    assert_eq!(
        std::fs::metadata(dest.path().join("donpachij.zip")).unwrap().len(),
        10
    );
    assert!(no_staging_left(dest.path()));
    assert_eq!(site.file_requests("/download/split/ddonpach.zip"), 0);

    let records = harness.pipeline.records(&run);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identifier, "donpachij");
    assert_eq!(records[0].display_name, "DonPachi");
    assert_eq!(records[0].developer, "Cave");
    assert_eq!(records[0].orientation, Orientation::Horizontal);
    assert_eq!(records[0].files.len(), 2);
}

#[tokio::test]
async fn test_second_run_does_not_download_again() {
    let dest = TempDir::new().unwrap();
    let site = Arc::new(cave_site().file("/download/split/donpachij.zip", vec![0x0c; 10]));
    let harness = pipeline(site.clone(), Arc::new(MemoryStore::new()), dest.path());

    let first = harness
        .pipeline
        .run_developer("Cave", &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(first.summary.as_ref().unwrap().succeeded(), 2);
    let downloads = site.total_file_requests();
    assert_eq!(downloads, 3);

    let second = harness
        .pipeline
        .run_developer("Cave", &FetchOptions::default())
        .await
        .unwrap();
    let summary = second.summary.as_ref().unwrap();
    assert_eq!(summary.succeeded(), 2);
    assert!(summary.reports.iter().all(|r| matches!(
        &r.outcome,
        EntryOutcome::Succeeded { artifact } if artifact.already_present
    )));
    assert_eq!(site.total_file_requests(), downloads);
    assert!(harness.pipeline.records(&second).is_empty());

    let third = harness
        .pipeline
        .run_developer("Cave", &missing_only())
        .await
        .unwrap();
    assert_eq!(third.present, 2);
    assert!(third.selected.is_empty());
    assert!(third.summary.is_none());
}

#[tokio::test]
async fn test_malformed_detail_page_is_skipped() {
    let dest = TempDir::new().unwrap();
    let site = Arc::new(
        ScriptedSite::new()
            .page(
                "/manufacturer/Cave",
                listing_html(&[
                    ("esprade", "ESP Ra.De."),
                    ("guwange", "Guwange"),
                    ("dfeveron", "Dangun Feveron"),
                ]),
            )
            .page("/game/esprade", detail_html("ESP Ra.De.", None, &[("esprade", 10)]))
            .page("/game/guwange", "<html><body><p>Under maintenance</p></body></html>")
            .page(
                "/game/dfeveron",
                detail_html("Dangun Feveron", None, &[("dfeveron", 10)]),
            ),
    );
    let store = Arc::new(MemoryStore::new());
    let harness = pipeline(site, store.clone(), dest.path());

    let report = harness.pipeline.client().list_games("Cave").await.unwrap();

    let ids: Vec<_> = report.entries.iter().map(|e| e.identifier.as_str()).collect();
    assert_eq!(ids, ["esprade", "dfeveron"]);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.len().await, 2);
    assert!(store.get("guwange").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failing_part_leaves_nothing_behind() {
    let dest = TempDir::new().unwrap();
    let site = Arc::new(cave_site().failing_file("/download/split/donpachij.zip", 10, 500));
    let harness = pipeline(site.clone(), Arc::new(MemoryStore::new()), dest.path());

    let options = FetchOptions {
        only: vec!["donpachij".to_string()],
        ..Default::default()
    };
    let run = harness
        .pipeline
        .run_developer("Cave", &options)
        .await
        .unwrap();

    let summary = run.summary.as_ref().unwrap();
    assert_eq!(summary.failed(), 1);
    let EntryOutcome::Failed { reason } = &summary.reports[0].outcome else {
        panic!("expected failure, got {:?}", summary.reports[0].outcome);
    };
    assert!(reason.contains("donpachij.zip"));
    assert!(reason.contains("3 attempts"));
    assert_eq!(site.file_requests("/download/split/donpachij.zip"), 3);

    assert!(!dest.path().join("donpachij.zip").exists());
    assert!(!dest.path().join("donpachi.zip").exists());
    assert!(no_staging_left(dest.path()));
    assert!(harness.pipeline.records(&run).is_empty());
}

#[tokio::test]
async fn test_offline_run_uses_persisted_catalog() {
    let dest = TempDir::new().unwrap();
    let store_dir = TempDir::new().unwrap();
    let store_path = store_dir.path().join("catalog.json");
    let dry_run = FetchOptions {
        dry_run: true,
        ..Default::default()
    };

    {
        let store = Arc::new(JsonFileStore::open(&store_path).await.unwrap());
        let harness = pipeline(Arc::new(cave_site()), store, dest.path());
        let run = harness.pipeline.run_developer("Cave", &dry_run).await.unwrap();
        assert_eq!(run.selected.len(), 2);
        assert!(run.summary.is_none());
    }

    let offline_site = Arc::new(ScriptedSite::new());
    let store = Arc::new(JsonFileStore::open(&store_path).await.unwrap());
    let harness = pipeline(offline_site.clone(), store, dest.path());

    let run = harness
        .pipeline
        .run_developer(
            "Cave",
            &FetchOptions {
                offline: true,
                ..dry_run
            },
        )
        .await
        .unwrap();

    let mut ids: Vec<_> = run.selected.iter().map(|e| e.identifier.clone()).collect();
    ids.sort();
    assert_eq!(ids, ["ddonpach", "donpachij"]);
    assert_eq!(run.cache_hits, 2);
    assert_eq!(offline_site.page_requests(), 0);
}

#[tokio::test]
async fn test_unavailable_developer_does_not_stop_survey() {
    let dest = TempDir::new().unwrap();
    let site = Arc::new(
        cave_site()
            .file("/download/split/donpachij.zip", vec![0x0c; 10])
            .broken_page("/manufacturer/Toaplan", 503),
    );
    let harness = pipeline(site, Arc::new(MemoryStore::new()), dest.path());

    let survey = harness.pipeline.run_all(&missing_only()).await;

    assert_eq!(survey.runs.len(), 1);
    assert_eq!(survey.runs[0].developer, "Cave");
    assert_eq!(survey.succeeded(), 2);
    assert_eq!(survey.failures.len(), 1);
    assert_eq!(survey.failures[0].0, "Toaplan");

    let single = harness
        .pipeline
        .run_developer("toaplan", &missing_only())
        .await;
    assert!(matches!(
        single,
        Err(AppError::Catalog(CatalogError::RemoteUnavailable { attempts: 3, .. }))
    ));
}

#[tokio::test]
async fn test_unknown_developer_is_rejected() {
    let dest = TempDir::new().unwrap();
    let harness = pipeline(
        Arc::new(ScriptedSite::new()),
        Arc::new(MemoryStore::new()),
        dest.path(),
    );

    let result = harness
        .pipeline
        .run_developer("Konami", &FetchOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(AppError::Catalog(CatalogError::UnknownDeveloper { .. }))
    ));
    drop(harness.cancel);
}
