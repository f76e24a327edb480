use cuimap_engine::dispatch::{dispatch, JobOutcome};
use cuimap_engine::partition::partition;
use cuimap_engine::{EngineConfig, EngineError};
use cuimap_core::Document;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::tempdir;

/// Stand-in for the engine binary. With no restriction flags configured the
/// invocation is `<bin> -I -p -K -8 --silent --conj <in> <out>`, so the
/// input is $7 and the output is $8.
fn stub_engine(dir: &Path, body: &str) -> EngineConfig {
    let bin = dir.join("metamap-stub");
    fs::write(&bin, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
    EngineConfig {
        metamap_bin: bin,
        tagger_ctl: dir.join("skrmedpostctl-stub"),
        sem_types: vec![],
        data_sources: vec![],
    }
}

fn docs(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| Document {
            source: "pubmed".into(),
            id: format!("{i}"),
            text: format!("document number {i}"),
        })
        .collect()
}

#[tokio::test]
async fn barrier_completes_every_unit_before_returning() {
    let dir = tempdir().unwrap();
    let cfg = stub_engine(dir.path(), r#"cp "$7" "$8""#);
    let units = partition(&docs(3), dir.path()).unwrap();

    let reports = dispatch(&cfg, &units, 2).await.unwrap();

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.outcome == JobOutcome::Completed));
    // Every output file exists by the time dispatch returns, regardless of
    // which worker handled which unit.
    for unit in &units {
        let out = fs::read_to_string(&unit.output).unwrap();
        let input = fs::read_to_string(&unit.input).unwrap();
        assert_eq!(out, input);
    }
}

#[tokio::test]
async fn failing_unit_does_not_abort_siblings() {
    let dir = tempdir().unwrap();
    let cfg = stub_engine(
        dir.path(),
        r#"grep -q poison "$7" && exit 3
cp "$7" "$8""#,
    );
    let mut batch = docs(2);
    batch.push(Document {
        source: "pubmed".into(),
        id: "bad".into(),
        text: "poison pill".into(),
    });
    let units = partition(&batch, dir.path()).unwrap();

    let reports = dispatch(&cfg, &units, 2).await.unwrap();

    assert_eq!(reports.len(), 3);
    let completed = reports
        .iter()
        .filter(|r| r.outcome == JobOutcome::Completed)
        .count();
    assert_eq!(completed, 2);
    assert!(reports
        .iter()
        .any(|r| matches!(r.outcome, JobOutcome::Failed(_))));
    // The healthy units still produced output.
    assert!(units[0].output.exists());
    assert!(units[1].output.exists());
    assert!(!units[2].output.exists());
}

#[tokio::test]
async fn missing_engine_command_is_fatal() {
    let dir = tempdir().unwrap();
    let cfg = EngineConfig {
        metamap_bin: dir.path().join("no-such-engine"),
        tagger_ctl: dir.path().join("no-such-ctl"),
        sem_types: vec![],
        data_sources: vec![],
    };
    let units = partition(&docs(2), dir.path()).unwrap();

    let err = dispatch(&cfg, &units, 1).await.unwrap_err();
    assert!(matches!(err, EngineError::NotInstalled));
}

#[tokio::test]
async fn empty_batch_is_a_noop() {
    let dir = tempdir().unwrap();
    let cfg = stub_engine(dir.path(), r#"cp "$7" "$8""#);
    let reports = dispatch(&cfg, &[], 4).await.unwrap();
    assert!(reports.is_empty());
}
