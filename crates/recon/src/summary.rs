use std::collections::BTreeMap;

use crate::annotate::RowGroup;
use crate::model::{CandidateScope, MatchResult, PartitionSummary, RunSummary};

/// Compute summary statistics from per-row decisions.
pub fn compute_summary(
    results: &[MatchResult],
    reference_rows: usize,
    groups: &[RowGroup],
) -> RunSummary {
    let mut by_method: BTreeMap<String, usize> = BTreeMap::new();
    let mut matched = 0;
    let mut blocked_rows = 0;
    let mut fallback_rows = 0;

    for r in results {
        if r.matched {
            matched += 1;
            *by_method.entry(r.method.to_string()).or_insert(0) += 1;
        }
        match r.scope {
            CandidateScope::Blocked => blocked_rows += 1,
            CandidateScope::Fallback => fallback_rows += 1,
            _ => {}
        }
    }

    let partitions = groups
        .iter()
        .map(|g| PartitionSummary {
            label: g.label.clone(),
            rows: g.rows.len(),
            matched: g.rows.iter().filter(|&&i| results[i].matched).count(),
        })
        .collect();

    let total_rows = results.len();
    RunSummary {
        total_rows,
        reference_rows,
        matched,
        unmatched: total_rows - matched,
        match_rate: if total_rows == 0 {
            0.0
        } else {
            matched as f64 / total_rows as f64
        },
        by_method,
        blocked_rows,
        fallback_rows,
        partitions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchMethod;

    #[test]
    fn summary_counts() {
        let results = vec![
            MatchResult::linked(0, 100, MatchMethod::Email, CandidateScope::Skipped),
            MatchResult::linked(1, 92, MatchMethod::Fuzzy, CandidateScope::Blocked),
            MatchResult::unmatched(40, CandidateScope::Fallback),
            MatchResult::unmatched(0, CandidateScope::Skipped),
        ];
        let groups = vec![
            RowGroup {
                label: "in".into(),
                rows: vec![0, 2],
            },
            RowGroup {
                label: "out".into(),
                rows: vec![1, 3],
            },
        ];
        let summary = compute_summary(&results, 7, &groups);
        assert_eq!(summary.total_rows, 4);
        assert_eq!(summary.reference_rows, 7);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.unmatched, 2);
        assert_eq!(summary.match_rate, 0.5);
        assert_eq!(summary.by_method.get("email"), Some(&1));
        assert_eq!(summary.by_method.get("fuzzy"), Some(&1));
        assert_eq!(summary.blocked_rows, 1);
        assert_eq!(summary.fallback_rows, 1);
        assert_eq!(summary.partitions[0].matched, 1);
        assert_eq!(summary.partitions[1].rows, 2);
    }

    #[test]
    fn empty_run() {
        let summary = compute_summary(&[], 0, &[]);
        assert_eq!(summary.total_rows, 0);
        assert_eq!(summary.match_rate, 0.0);
    }
}
