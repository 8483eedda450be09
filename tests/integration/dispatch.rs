//! Dispatch correctness tests.
//!
//! These tests verify validation, result completeness and that a failing
//! unit never affects its siblings.

use std::collections::HashSet;

use proptest::prelude::*;

use orchestra::provenance::SUM_TOLERANCE;
use orchestra::{ConfigurationError, OrchestrationRequest, SourceFlags, TaskCatalog};

use crate::fixtures::{
    abc_catalog, orchestrator, scored_corpus, test_catalog, AlwaysOk, FailFor, PanicFor,
    Recording,
};

// ========== Validation Tests ==========

/// Scenario: no source flag set
/// Then the request is rejected and nothing runs
#[tokio::test]
async fn test_no_source_rejected_before_dispatch() {
    let strategy = Recording::default();
    let orchestrator = orchestrator(abc_catalog(), strategy.clone());

    let request = OrchestrationRequest::new(["A"], SourceFlags::default());
    let err = orchestrator.dispatch(request).await.unwrap_err();

    assert_eq!(err, ConfigurationError::NoSourceEnabled);
    assert!(strategy.calls().is_empty());
}

/// Scenario: a task missing from the catalog
/// Then the request is rejected and nothing runs
#[tokio::test]
async fn test_unknown_task_rejected_before_dispatch() {
    let strategy = Recording::default();
    let orchestrator = orchestrator(abc_catalog(), strategy.clone());

    let request = OrchestrationRequest::new(["X"], SourceFlags::local_only());
    let err = orchestrator.dispatch(request).await.unwrap_err();

    assert_eq!(err, ConfigurationError::UnknownTask("X".to_string()));
    assert!(strategy.calls().is_empty());
}

/// One bad name among good ones still rejects the whole request.
#[tokio::test]
async fn test_unknown_task_among_known_rejects_all() {
    let strategy = Recording::default();
    let orchestrator = orchestrator(abc_catalog(), strategy.clone());

    let request = OrchestrationRequest::new(["A", "B", "Nope"], SourceFlags::local_only());
    assert!(orchestrator.dispatch(request).await.is_err());
    assert!(strategy.calls().is_empty());
}

#[tokio::test]
async fn test_empty_selection_rejected() {
    let orchestrator = orchestrator(abc_catalog(), AlwaysOk);
    let request = OrchestrationRequest::new(Vec::<String>::new(), SourceFlags::local_only());
    assert_eq!(
        orchestrator.dispatch(request).await.unwrap_err(),
        ConfigurationError::EmptySelection
    );
}

// ========== Isolation Tests ==========

/// Given a strategy that fails only for B among A, B, C
/// Then A and C succeed and B fails with a message
#[tokio::test]
async fn test_failure_isolated_to_one_unit() {
    let orchestrator = orchestrator(abc_catalog(), FailFor::new(&["B"]));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::local_only());

    let report = orchestrator.dispatch(request).await.unwrap();
    assert_eq!(report.len(), 3);

    let a = report.get("A").unwrap();
    let b = report.get("B").unwrap();
    let c = report.get("C").unwrap();

    assert!(a.succeeded);
    assert!(c.succeeded);
    assert!(!b.succeeded);
    assert_eq!(
        b.error.as_deref(),
        Some("generation failed: stub failure for B")
    );
    assert_eq!(
        b.content,
        "Error generating B: generation failed: stub failure for B"
    );
    assert!(b.provenance.is_zero());
    assert!(a.provenance.is_normalized());
    assert!(c.provenance.is_normalized());
}

/// A panicking unit is recorded as failed; siblings finish normally.
#[tokio::test]
async fn test_panic_isolated_to_one_unit() {
    let orchestrator = orchestrator(abc_catalog(), PanicFor("B"));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::local_only());

    let report = orchestrator.dispatch(request).await.unwrap();
    assert_eq!(report.len(), 3);
    assert!(report.get("A").unwrap().succeeded);
    assert!(report.get("C").unwrap().succeeded);

    let b = report.get("B").unwrap();
    assert!(!b.succeeded);
    assert!(b.provenance.is_zero());
    let error = b.error.as_deref().unwrap();
    assert!(error.starts_with("unit panicked"), "{}", error);
    assert!(error.contains("stub panic in B"), "{}", error);
}

#[tokio::test]
async fn test_every_unit_failing_still_yields_full_report() {
    let orchestrator = orchestrator(abc_catalog(), FailFor::new(&["A", "B", "C"]));
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::new(true, true, true));

    let report = orchestrator.dispatch(request).await.unwrap();
    assert_eq!(report.len(), 3);
    assert_eq!(report.failed().count(), 3);
    for result in report.iter() {
        assert!(!result.content.is_empty());
        assert!(result.provenance.is_zero());
        assert!(result.error.is_some());
    }

    let summary = report.summary();
    assert_eq!(summary.success_rate, 0.0);
    assert!(summary.average_provenance.is_zero());
}

// ========== Scoring Tests ==========

/// Scenario: two tasks, local only, empty corpus
/// Then both succeed with all weight on local
#[tokio::test]
async fn test_local_only_empty_corpus() {
    let orchestrator = orchestrator(abc_catalog(), AlwaysOk);
    let request = OrchestrationRequest::new(["A", "B"], SourceFlags::local_only());

    let report = orchestrator.dispatch(request).await.unwrap();
    assert_eq!(report.len(), 2);
    for name in ["A", "B"] {
        let result = report.get(name).unwrap();
        assert!(result.succeeded);
        assert_eq!(result.provenance.local, 1.0);
        assert_eq!(result.provenance.world, 0.0);
        assert_eq!(result.provenance.online, 0.0);
    }
}

/// Sole enabled source normalizes to one regardless of corpus quality.
#[tokio::test]
async fn test_scored_corpus_local_only() {
    let orchestrator = orchestrator(abc_catalog(), AlwaysOk);
    let request = OrchestrationRequest::new(["A"], SourceFlags::local_only())
        .with_local_corpus(scored_corpus());

    let report = orchestrator.dispatch(request).await.unwrap();
    assert_eq!(report.get("A").unwrap().provenance.local, 1.0);
}

/// Every unit of one dispatch gets the same weights.
#[tokio::test]
async fn test_weights_identical_across_units() {
    let orchestrator = orchestrator(abc_catalog(), AlwaysOk);
    let request = OrchestrationRequest::new(["A", "B", "C"], SourceFlags::new(true, true, true))
        .with_local_corpus(scored_corpus());

    let report = orchestrator.dispatch(request).await.unwrap();
    let a = report.get("A").unwrap().provenance;
    assert!(a.is_normalized());
    assert!(a.local > 0.0 && a.world > 0.0 && a.online > 0.0);
    assert_eq!(report.get("B").unwrap().provenance, a);
    assert_eq!(report.get("C").unwrap().provenance, a);
}

// ========== Context Tests ==========

#[tokio::test]
async fn test_strategy_receives_shared_inputs() {
    let strategy = Recording::default();
    let orchestrator = orchestrator(abc_catalog(), strategy.clone());
    let flags = SourceFlags::new(true, false, true);
    let request = OrchestrationRequest::new(["A", "C"], flags)
        .with_local_corpus("# Acme")
        .with_reference_corpus("reference");

    orchestrator.dispatch(request).await.unwrap();

    let calls = strategy.calls();
    assert_eq!(calls.len(), 2);
    let tasks: HashSet<String> = calls.iter().map(|c| c.task.clone()).collect();
    assert_eq!(tasks, HashSet::from(["A".to_string(), "C".to_string()]));
    for call in &calls {
        assert_eq!(call.local_corpus, "# Acme");
        assert_eq!(call.reference_corpus, "reference");
        assert_eq!(call.flags, flags);
    }
}

#[tokio::test]
async fn test_standard_catalog_dispatch() {
    let catalog = std::sync::Arc::new(TaskCatalog::standard());
    let orchestrator = orchestrator(catalog.clone(), AlwaysOk);
    let request = OrchestrationRequest::all(&catalog, SourceFlags::new(true, true, false))
        .with_local_corpus("# Acme Corp\n## Overview\ncloud data strategy");

    let report = orchestrator.dispatch(request).await.unwrap();
    assert_eq!(report.len(), catalog.len());

    let ordered: Vec<&str> = report
        .ordered(&catalog)
        .iter()
        .map(|r| r.task_name.as_str())
        .collect();
    let expected: Vec<&str> = catalog.names().collect();
    assert_eq!(ordered, expected);
}

// ========== Property Tests ==========

const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

fn flags_strategy() -> impl Strategy<Value = SourceFlags> {
    (any::<bool>(), any::<bool>(), any::<bool>())
        .prop_filter("at least one source", |(l, w, o)| *l || *w || *o)
        .prop_map(|(l, w, o)| SourceFlags::new(l, w, o))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// One result per selected task; successes sum to one, failures are
    /// zero-weighted with a non-empty body.
    #[test]
    fn prop_report_complete_and_consistent(
        selected in proptest::sample::subsequence(NAMES.to_vec(), 1..=NAMES.len()),
        failing in proptest::sample::subsequence(NAMES.to_vec(), 0..=NAMES.len()),
        flags in flags_strategy(),
        corpus in "[a-z #*.0-9\n]{0,400}",
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let orchestrator = orchestrator(test_catalog(&NAMES), FailFor::new(&failing));
        let request = OrchestrationRequest::new(selected.clone(), flags)
            .with_local_corpus(corpus);

        let report = rt.block_on(orchestrator.dispatch(request)).unwrap();

        prop_assert_eq!(report.len(), selected.len());
        for name in &selected {
            let result = report.get(name).unwrap();
            prop_assert_eq!(result.succeeded, !failing.contains(name));
            if result.succeeded {
                prop_assert!((result.provenance.total() - 1.0).abs() <= SUM_TOLERANCE);
            } else {
                prop_assert!(result.provenance.is_zero());
                prop_assert!(!result.content.is_empty());
            }
        }
    }
}
