//! Results map and accuracy leaderboard.

use std::collections::HashMap;
use std::sync::Arc;

use crate::grade::GradedSheet;

/// Graded sheets keyed by name, iterated in insertion order.
///
/// Re-inserting an existing name replaces the entry in place and keeps its
/// original position.
#[derive(Debug, Clone, Default)]
pub struct ResultsMap {
    entries: Vec<Arc<GradedSheet>>,
    index: HashMap<String, usize>,
}

impl ResultsMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `sheet.name()`.
    pub fn insert(&mut self, sheet: Arc<GradedSheet>) {
        let name = sheet.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => self.entries[pos] = sheet,
            None => {
                self.index.insert(name, self.entries.len());
                self.entries.push(sheet);
            }
        }
    }

    /// Look up a sheet by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<GradedSheet>> {
        self.index.get(name).map(|&pos| &self.entries[pos])
    }

    /// Whether a sheet is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<GradedSheet>> {
        self.entries.iter()
    }

    /// Sheet names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.name())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSheet {
    /// 1-based position.
    pub rank: usize,
    pub sheet: Arc<GradedSheet>,
}

/// Leaderboard sorted by accuracy, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSummary {
    pub entries: Vec<RankedSheet>,
}

impl ComparisonSummary {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best-ranked sheet.
    #[must_use]
    pub fn best(&self) -> Option<&RankedSheet> {
        self.entries.first()
    }
}

/// Builds leaderboards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonRanker;

impl ComparisonRanker {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Rank by accuracy descending. Equal accuracies keep map order.
    #[must_use]
    pub fn rank(&self, results: &ResultsMap) -> ComparisonSummary {
        let mut sheets: Vec<Arc<GradedSheet>> = results.iter().cloned().collect();
        // sort_by is stable
        sheets.sort_by(|a, b| b.result.accuracy.total_cmp(&a.result.accuracy));
        ComparisonSummary {
            entries: sheets
                .into_iter()
                .enumerate()
                .map(|(i, sheet)| RankedSheet { rank: i + 1, sheet })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::QualityGrader;
    use crate::matrix::ObservationMatrix;
    use crate::transform::analyze_matrix;

    fn sheet(name: &str, counts: Vec<Vec<u64>>) -> Arc<GradedSheet> {
        let rows = counts.len();
        let m = ObservationMatrix::new(
            (1..=rows).map(|i| format!("n{i}")).collect(),
            vec!["a".into(), "b".into()],
            counts,
        )
        .unwrap();
        Arc::new(QualityGrader::new().assess(analyze_matrix(name, &m)))
    }

    fn perfect(name: &str) -> Arc<GradedSheet> {
        sheet(name, vec![vec![10, 0], vec![0, 10]])
    }

    fn mixed(name: &str) -> Arc<GradedSheet> {
        sheet(name, vec![vec![10, 0], vec![0, 10], vec![5, 5]])
    }

    #[test]
    fn map_preserves_insertion_order_and_overwrites() {
        let mut map = ResultsMap::new();
        map.insert(mixed("b"));
        map.insert(perfect("a"));
        map.insert(perfect("b"));
        assert_eq!(map.len(), 2);
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!((map.get("b").unwrap().result.accuracy - 100.0).abs() < 1e-9);
        assert!(map.contains("a"));
        map.clear();
        assert!(map.is_empty());
        assert!(map.get("a").is_none());
    }

    #[test]
    fn rank_sorts_by_accuracy_descending() {
        let mut map = ResultsMap::new();
        map.insert(mixed("low"));
        map.insert(perfect("high"));
        let summary = ComparisonRanker::new().rank(&map);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.best().unwrap().sheet.name(), "high");
        assert_eq!(summary.entries[0].rank, 1);
        assert_eq!(summary.entries[1].rank, 2);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut map = ResultsMap::new();
        map.insert(perfect("x"));
        map.insert(mixed("m"));
        map.insert(perfect("y"));
        map.insert(perfect("z"));
        let summary = ComparisonRanker::new().rank(&map);
        let names: Vec<_> = summary.entries.iter().map(|e| e.sheet.name()).collect();
        assert_eq!(names, vec!["x", "y", "z", "m"]);
    }

    #[test]
    fn rank_is_idempotent() {
        let mut map = ResultsMap::new();
        map.insert(mixed("a"));
        map.insert(perfect("b"));
        let ranker = ComparisonRanker::new();
        assert_eq!(ranker.rank(&map), ranker.rank(&map));
    }

    #[test]
    fn empty_map_yields_empty_summary() {
        let summary = ComparisonRanker::new().rank(&ResultsMap::new());
        assert!(summary.is_empty());
        assert!(summary.best().is_none());
    }
}
