//! Golden file integration tests.
//!
//! Reads tests/testdata/golden_sheets.json and checks the transform and the
//! grader against hand-checked confusion matrices, accuracies and grades.

use std::sync::Arc;

use serde::Deserialize;

use somqc_core::rank::{ComparisonRanker, ResultsMap};
use somqc_core::table::RawTable;
use somqc_core::{GradedSheet, QualityGrader, SheetTransform};
use somqc_orchestration::{BatchOrchestrator, BatchPhase, InMemorySource};

// ---------------------------------------------------------------------------
// Golden data structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GoldenData {
    #[allow(dead_code)]
    description: String,
    sheets: Vec<GoldenSheet>,
}

#[derive(Deserialize)]
struct GoldenSheet {
    name: String,
    counts: Vec<Vec<u64>>,
    total_observations: u64,
    active_neurons: usize,
    confusion: Vec<Vec<u64>>,
    accuracy: f64,
    dof: usize,
    cramers_v: f64,
    expected_frequency_valid: bool,
    letter: String,
}

fn load_golden_data() -> GoldenData {
    let path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/testdata/golden_sheets.json"
    );
    let data = std::fs::read_to_string(path).expect("failed to read golden file");
    serde_json::from_str(&data).expect("failed to parse golden JSON")
}

fn analyse(sheet: &GoldenSheet) -> GradedSheet {
    let table = RawTable::from_counts(&sheet.counts);
    let result = SheetTransform::default()
        .transform(&sheet.name, &table)
        .unwrap_or_else(|e| panic!("{} failed to transform: {e}", sheet.name));
    QualityGrader::new().assess(result)
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

#[test]
fn golden_confusion_matrices() {
    for sheet in load_golden_data().sheets {
        let graded = analyse(&sheet);
        let r = &graded.result;
        assert_eq!(r.total_observations, sheet.total_observations, "{}", sheet.name);
        assert_eq!(r.active_neurons, sheet.active_neurons, "{}", sheet.name);
        assert_eq!(r.confusion_matrix.cells(), sheet.confusion.as_slice(), "{}", sheet.name);
        assert_eq!(r.confusion_matrix.total(), sheet.total_observations, "{}", sheet.name);
    }
}

#[test]
fn golden_statistics() {
    for sheet in load_golden_data().sheets {
        let graded = analyse(&sheet);
        let r = &graded.result;
        assert!(
            (r.accuracy - sheet.accuracy).abs() < 1e-3,
            "{}: accuracy {} != {}",
            sheet.name,
            r.accuracy,
            sheet.accuracy
        );
        assert!(
            (r.association_strength - sheet.cramers_v).abs() < 1e-3,
            "{}: Cramer's V {} != {}",
            sheet.name,
            r.association_strength,
            sheet.cramers_v
        );
        let test = r.significance.as_ref().expect("significance test");
        assert_eq!(test.dof, sheet.dof, "{}", sheet.name);
        assert_eq!(
            r.expected_frequency_valid(),
            sheet.expected_frequency_valid,
            "{}",
            sheet.name
        );
    }
}

// ---------------------------------------------------------------------------
// Grading and ranking
// ---------------------------------------------------------------------------

#[test]
fn golden_letter_grades() {
    for sheet in load_golden_data().sheets {
        let graded = analyse(&sheet);
        assert_eq!(graded.grade.letter.as_str(), sheet.letter, "{}", sheet.name);
        assert!(graded.grade.diagnostic.is_none(), "{}", sheet.name);
    }
}

#[test]
fn golden_ranking_orders_by_accuracy() {
    let data = load_golden_data();
    let mut map = ResultsMap::new();
    for sheet in &data.sheets {
        map.insert(Arc::new(analyse(sheet)));
    }
    let summary = ComparisonRanker::new().rank(&map);
    let order: Vec<&str> = summary.entries.iter().map(|e| e.sheet.name()).collect();
    assert_eq!(
        order,
        vec!["perfect_split", "sparse_four", "three_way", "weak_split"]
    );
}

#[test]
fn golden_batch_matches_direct_analysis() {
    let data = load_golden_data();
    let mut source = InMemorySource::new();
    for sheet in &data.sheets {
        source.insert(sheet.name.clone(), RawTable::from_counts(&sheet.counts));
    }
    let names: Vec<String> = data.sheets.iter().map(|s| s.name.clone()).collect();

    let orch = BatchOrchestrator::new(somqc_core::TransformOptions::default());
    orch.run(names, Arc::new(source)).unwrap();
    assert!(orch.wait(std::time::Duration::from_secs(10)));

    let snap = orch.snapshot();
    assert_eq!(snap.phase, BatchPhase::Completed);
    assert_eq!(snap.summary.len(), data.sheets.len());
    for sheet in &data.sheets {
        let batch = snap.results.get(&sheet.name).expect("sheet in results");
        let direct = analyse(sheet);
        assert_eq!(batch.grade.letter, direct.grade.letter, "{}", sheet.name);
        assert_eq!(
            batch.result.confusion_matrix, direct.result.confusion_matrix,
            "{}",
            sheet.name
        );
    }
}
