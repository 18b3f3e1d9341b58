//! End-to-end pipeline runs over a synthetic benchmark dataset

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use misusebench_core::{load_projects, CompilePaths, IdFilter};
use misusebench_pipeline::{default_registry, PipelineSettings};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A synthetic project whose build fabricates its class file
fn dataset() -> TempDir {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    write(
        &data.join("mock/project.yml"),
        "repository:\n  type: synthetic\n",
    );
    write(
        &data.join("mock/versions/v1/version.yml"),
        "build:\n  src: src\n  commands:\n    - mkdir -p classes && touch classes/Mu.class\n  classes: classes\nmisuses:\n  - mu1\n",
    );
    write(
        &data.join("mock/versions/v1/checkout/src/Mu.java"),
        "class Mu {}\n",
    );
    write(
        &data.join("mock/misuses/mu1/misuse.yml"),
        "location:\n  file: Mu.java\n",
    );
    temp
}

#[test]
fn checkout_mode_materializes_working_copies() {
    let temp = dataset();
    let settings = PipelineSettings::new(temp.path().join("checkouts"), temp.path().join("findings"));
    let runner = default_registry().lookup("checkout", &settings).unwrap();

    let projects = load_projects(&temp.path().join("data"), &IdFilter::all()).unwrap();
    let report = runner.run(&projects);

    assert!(report.is_success(), "failures: {:?}", report.failed);
    assert_eq!(report.completed, 1);
    assert!(temp
        .path()
        .join("checkouts/mock/v1/checkout/src/Mu.java")
        .is_file());
}

#[test]
fn compile_mode_produces_partitioned_artifacts() {
    let temp = dataset();
    let settings = PipelineSettings::new(temp.path().join("checkouts"), temp.path().join("findings"));
    let runner = default_registry().lookup("compile", &settings).unwrap();

    let projects = load_projects(&temp.path().join("data"), &IdFilter::all()).unwrap();
    let report = runner.run(&projects);

    assert!(report.is_success(), "failures: {:?}", report.failed);
    let paths = CompilePaths::new(&temp.path().join("checkouts"), "mock", "v1");
    assert!(paths.is_compiled());
    assert!(paths.original_sources().join("Mu.java").is_file());
    assert!(paths.original_classes().join("Mu.class").is_file());
    assert!(paths.misuse_sources().join("Mu.java").is_file());
    assert!(paths.misuse_classes().join("Mu.class").is_file());
}

#[test]
fn version_without_build_is_skipped_not_failed() {
    let temp = dataset();
    write(
        &temp.path().join("data/mock/versions/v0/version.yml"),
        "misuses: []\n",
    );
    write(
        &temp.path().join("data/mock/versions/v0/checkout/Nop.java"),
        "class Nop {}\n",
    );
    let settings = PipelineSettings::new(temp.path().join("checkouts"), temp.path().join("findings"));
    let runner = default_registry().lookup("compile", &settings).unwrap();

    let projects = load_projects(&temp.path().join("data"), &IdFilter::all()).unwrap();
    let report = runner.run(&projects);

    assert!(report.is_success());
    assert_eq!(report.completed, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "mock.v0");
}
