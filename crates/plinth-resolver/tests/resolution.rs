//! End-to-end resolution over JSON catalogs

use std::sync::Arc;

use plinth_catalog::{FeatureCatalog, InMemoryCatalog, MemoizedCatalog};
use plinth_core::types::{Feature, Target};
use plinth_resolver::{ChoiceAlgorithm, ConstraintSolver, ResultKind};

const BUILDS: &str = r#"{
    "features": [
        {"id": "app", "version": "1.0.0", "requires": [
            {"id": "bar", "range": "[2.1.0,3.0.0)"},
            {"id": "foo", "range": "[1.0.0,2.0.0)"}
        ]},
        {"id": "pinned", "version": "1.0.0", "requires": [
            {"id": "bar", "range": "[2.1.0.002,2.1.0.002]"}
        ]},
        {"id": "bar", "version": "2.1.0.002"},
        {"id": "bar", "version": "2.1.0.003"},
        {"id": "bar", "version": "2.1.0.004"},
        {"id": "bar", "version": "2.1.2.003"},
        {"id": "bar", "version": "2.1.2.004"},
        {"id": "foo", "version": "1.2.3.001"},
        {"id": "foo", "version": "1.2.3.002"},
        {"id": "foo", "version": "1.2.3.003"}
    ]
}"#;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn starting<C: FeatureCatalog>(catalog: &C, specs: &[&str]) -> Vec<Arc<Feature>> {
    specs
        .iter()
        .map(|literal| catalog.feature_model(&literal.parse::<Target>().unwrap()).unwrap())
        .collect()
}

fn no_fixed() -> Vec<Arc<Feature>> {
    Vec::new()
}

fn rendered(targets: &[Target]) -> Vec<String> {
    targets.iter().map(ToString::to_string).collect()
}

#[test]
fn lblm_takes_latest_build_of_lowest_release() {
    init_logging();
    let catalog = InMemoryCatalog::from_json_str(BUILDS).unwrap();
    let roots = starting(&catalog, &["app 1.0.0"]);
    let mut solver =
        ConstraintSolver::new(&catalog, roots, no_fixed(), ChoiceAlgorithm::LatestBuildOfLeastMatch).unwrap();

    let resolved = solver.search_and_warn().unwrap();
    assert_eq!(rendered(&resolved), vec!["bar 2.1.0.004", "foo 1.2.3.003"]);

    let newer: Vec<&str> = solver
        .diagnostics()
        .iter()
        .filter(|d| d.kind == ResultKind::NewerReleaseAvailable)
        .filter_map(|d| d.subject.as_deref())
        .collect();
    assert_eq!(newer, vec!["bar"]);
}

#[test]
fn latest_takes_highest_build() {
    init_logging();
    let catalog = InMemoryCatalog::from_json_str(BUILDS).unwrap();
    let roots = starting(&catalog, &["app 1.0.0"]);
    let mut solver = ConstraintSolver::new(&catalog, roots, no_fixed(), ChoiceAlgorithm::Latest).unwrap();

    let resolved = solver.try_search().unwrap();
    assert_eq!(rendered(&resolved), vec!["bar 2.1.2.004", "foo 1.2.3.003"]);
}

#[test]
fn exact_build_range_selects_that_build() {
    init_logging();
    let catalog = InMemoryCatalog::from_json_str(BUILDS).unwrap();
    let roots = starting(&catalog, &["pinned 1.0.0"]);
    let mut solver =
        ConstraintSolver::new(&catalog, roots, no_fixed(), ChoiceAlgorithm::LatestBuildOfLeastMatch).unwrap();

    assert_eq!(rendered(&solver.try_search().unwrap()), vec!["bar 2.1.0.002"]);
}

#[test]
fn memoized_catalog_resolves_identically() {
    init_logging();
    let catalog = MemoizedCatalog::new(InMemoryCatalog::from_json_str(BUILDS).unwrap());
    let roots = starting(&catalog, &["app 1.0.0"]);
    let mut solver =
        ConstraintSolver::new(&catalog, roots, no_fixed(), ChoiceAlgorithm::LatestBuildOfLeastMatch).unwrap();

    let first = solver.try_search().unwrap();
    let second = solver.try_search().unwrap();
    assert_eq!(first, second);
    assert!(catalog.stats().hits > 0);
}

#[test]
fn failure_explains_provenance() {
    init_logging();
    let json = r#"{"features": [
        {"id": "app", "version": "1.0.0", "requires": [{"id": "lib", "range": "[1.0.0,2.0.0)"}]},
        {"id": "lib", "version": "1.0.0", "requires": [{"id": "codec", "range": "[3.0.0,)"}]},
        {"id": "codec", "version": "2.0.0"}
    ]}"#;
    let catalog = InMemoryCatalog::from_json_str(json).unwrap();
    let roots = starting(&catalog, &["app 1.0.0"]);
    let mut solver = ConstraintSolver::new(&catalog, roots, no_fixed(), ChoiceAlgorithm::Latest).unwrap();

    let failure = solver.try_search().unwrap_err();
    assert_eq!(failure.kind, ResultKind::Unmatched);
    assert_eq!(failure.subject, "codec");

    let lines: Vec<&str> = failure.tree.lines().map(str::trim).collect();
    assert_eq!(
        lines,
        vec![
            "codec",
            "<- requires [3.0.0,) from lib 1.0.0",
            "lib chosen 1.0.0",
            "<- requires [1.0.0,2.0.0) from app 1.0.0",
            "app starting 1.0.0",
        ]
    );
    assert_eq!(solver.last_failure(), Some(&failure));
}
