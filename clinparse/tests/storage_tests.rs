//! Ontology store lifecycle: RF2 import, snapshot persistence and reopening

mod common;

use clinparse::ClinparseError;
use clinparse::config::{ClinparseConfig, OntologyConfig, StorageConfig};
use clinparse::core::ConceptEngine;
use clinparse::storage::{OntologyStore, create_ontology_store};
use clinparse::storage::rf2::Rf2Loader;
use common::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write_release(dir: &Path) {
    let terminology = dir.join("Snapshot").join("Terminology");
    fs::create_dir_all(&terminology).unwrap();

    fs::write(
        terminology.join("sct2_Concept_Snapshot_INT_20240101.txt"),
        "id\teffectiveTime\tactive\tmoduleId\tdefinitionStatusId\n\
         138875005\t20020131\t1\t900000000000207008\t900000000000074008\n\
         404684003\t20020131\t1\t900000000000207008\t900000000000074008\n\
         22253000\t20020131\t1\t900000000000207008\t900000000000074008\n\
         29857009\t20020131\t1\t900000000000207008\t900000000000074008\n",
    )
    .unwrap();
    fs::write(
        terminology.join("sct2_Description_Snapshot-en_INT_20240101.txt"),
        "id\teffectiveTime\tactive\tmoduleId\tconceptId\tlanguageCode\ttypeId\tterm\tcaseSignificanceId\n\
         1\t20020131\t1\t900000000000207008\t404684003\ten\t900000000000003001\tClinical finding (finding)\t900000000000448009\n\
         2\t20020131\t1\t900000000000207008\t22253000\ten\t900000000000003001\tPain (finding)\t900000000000448009\n\
         3\t20020131\t1\t900000000000207008\t22253000\ten\t900000000000013009\tPain\t900000000000448009\n\
         4\t20020131\t1\t900000000000207008\t29857009\ten\t900000000000003001\tChest pain (finding)\t900000000000448009\n\
         5\t20020131\t1\t900000000000207008\t29857009\ten\t900000000000013009\tChest pain\t900000000000448009\n",
    )
    .unwrap();
    fs::write(
        terminology.join("sct2_Relationship_Snapshot_INT_20240101.txt"),
        "id\teffectiveTime\tactive\tmoduleId\tsourceId\tdestinationId\trelationshipGroup\ttypeId\tcharacteristicTypeId\tmodifierId\n\
         10\t20020131\t1\t900000000000207008\t404684003\t138875005\t0\t116680003\t900000000000011006\t900000000000451002\n\
         11\t20020131\t1\t900000000000207008\t22253000\t404684003\t0\t116680003\t900000000000011006\t900000000000451002\n\
         12\t20020131\t1\t900000000000207008\t29857009\t22253000\t0\t116680003\t900000000000011006\t900000000000451002\n",
    )
    .unwrap();
}

fn storage_in(dir: &Path) -> StorageConfig {
    StorageConfig {
        data_dir: dir.to_path_buf(),
        ..StorageConfig::default()
    }
}

#[tokio::test]
async fn test_rf2_import_then_search() {
    let release = tempfile::tempdir().unwrap();
    write_release(release.path());

    let engine = ConceptEngine::new(
        ClinparseConfig::default(),
        Arc::new(clinparse::storage::MemoryOntologyStore::new()),
        Arc::new(ScriptedAnnotationService::new()),
    );

    let snapshot = Rf2Loader::new(release.path()).load().await.unwrap();
    let summary = engine.import(snapshot).await.unwrap();
    assert_eq!(summary.concepts, 4);
    assert_eq!(summary.is_a_edges, 3);

    let report = engine.rebuild_closure().await.unwrap();
    assert_eq!(report.version, 1);

    let hits = engine.search("pain", None).await.unwrap();
    assert_eq!(hits[0].id, PAIN);
    assert_eq!(hits[0].description, "Pain");

    let details = engine.find_concept(CLINICAL_FINDING).await.unwrap();
    assert_eq!(details.children, 2);
}

#[tokio::test]
async fn test_snapshot_survives_reopen() {
    let data = tempfile::tempdir().unwrap();
    let storage = storage_in(data.path());
    let ontology = OntologyConfig::default();

    {
        let store = create_ontology_store(&storage, &ontology).await.unwrap();
        let engine = ConceptEngine::new(
            ClinparseConfig::default(),
            store,
            Arc::new(ScriptedAnnotationService::new()),
        );
        engine.import(snapshot()).await.unwrap();
        engine.rebuild_closure().await.unwrap();
    }

    assert!(data.path().join("ontology.json").exists());

    let reopened = create_ontology_store(&storage, &ontology).await.unwrap();
    assert!(reopened.closure_version().await.unwrap() >= 1);
    assert!(reopened.ancestors(CKD).await.unwrap().contains(CLINICAL_FINDING));
    assert_eq!(reopened.replacement(RETIRED_CKD).await.unwrap().as_deref(), Some(CKD));
}

#[tokio::test]
async fn test_missing_snapshot_starts_empty() {
    let data = tempfile::tempdir().unwrap();
    let store = create_ontology_store(&storage_in(data.path()), &OntologyConfig::default())
        .await
        .unwrap();

    assert_eq!(store.closure_version().await.unwrap(), 0);
    assert!(store.concept(CKD).await.unwrap().is_none());
    assert!(!data.path().join("ontology.json").exists());
}

#[tokio::test]
async fn test_unreadable_snapshot_is_reported() {
    let data = tempfile::tempdir().unwrap();
    // a directory where the snapshot file should be
    let storage = StorageConfig {
        snapshot: Some(data.path().to_path_buf()),
        ..storage_in(data.path())
    };

    let err = create_ontology_store(&storage, &OntologyConfig::default())
        .await
        .unwrap_err();

    match err {
        ClinparseError::SnapshotNotAccessible { path } => {
            assert_eq!(path, data.path().display().to_string());
        }
        other => panic!("expected SnapshotNotAccessible, got {}", other),
    }
}
