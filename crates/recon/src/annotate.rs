//! Annotated output: source row + decision + prefixed reference fields.

use crate::config::{MatchConfig, MatchStrategy};
use crate::model::{CellValue, Dataset, MatchResult, OutputTable};
use crate::schema::ResolvedColumns;

/// Table name used when no partition is configured.
pub const UNPARTITIONED_LABEL: &str = "matched";

/// Source rows (by index, in input order) belonging to one output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    pub label: String,
    pub rows: Vec<usize>,
}

/// Split source rows by the discovery flag. Without a partition config every
/// row lands in a single group. Each row belongs to exactly one group.
pub fn partition_rows(
    source: &Dataset,
    columns: &ResolvedColumns,
    config: &MatchConfig,
) -> Vec<RowGroup> {
    let Some(ref partition) = config.partition else {
        return vec![RowGroup {
            label: UNPARTITIONED_LABEL.into(),
            rows: (0..source.len()).collect(),
        }];
    };

    let (inside, outside): (Vec<usize>, Vec<usize>) = (0..source.len())
        .partition(|&i| partition.is_in(columns.partition_value(&source.rows()[i])));

    vec![
        RowGroup {
            label: partition.in_label.clone(),
            rows: inside,
        },
        RowGroup {
            label: partition.out_label.clone(),
            rows: outside,
        },
    ]
}

pub fn output_headers(source: &Dataset, reference: &Dataset, config: &MatchConfig) -> Vec<String> {
    let out = &config.output;
    let mut headers = source.headers.clone();
    headers.push(out.matched_column.clone());
    headers.push(out.score_column.clone());
    if config.strategy != MatchStrategy::FuzzyName {
        headers.push(out.method_column.clone());
    }
    headers.extend(reference.headers.iter().map(|h| format!("{}{h}", out.prefix)));
    headers
}

fn annotate_row(
    row: usize,
    source: &Dataset,
    reference: &Dataset,
    result: &MatchResult,
    with_method: bool,
) -> Vec<CellValue> {
    let record = &source.rows()[row];
    let mut cells: Vec<CellValue> = record.values().iter().map(|v| CellValue::from_opt(v.as_deref())).collect();
    cells.push(CellValue::Bool(result.matched));
    cells.push(CellValue::Int(i64::from(result.score)));
    if with_method {
        cells.push(CellValue::Text(result.method.to_string()));
    }
    match result.linked.map(|r| &reference.rows()[r]) {
        Some(linked) => cells.extend(linked.values().iter().map(|v| CellValue::from_opt(v.as_deref()))),
        None => cells.extend(std::iter::repeat(CellValue::Empty).take(reference.headers.len())),
    }
    cells
}

/// One output table per group, rows in source order.
pub fn build_tables(
    groups: &[RowGroup],
    source: &Dataset,
    reference: &Dataset,
    results: &[MatchResult],
    config: &MatchConfig,
) -> Vec<OutputTable> {
    let headers = output_headers(source, reference, config);
    let with_method = config.strategy != MatchStrategy::FuzzyName;

    groups
        .iter()
        .map(|group| OutputTable {
            name: group.label.clone(),
            headers: headers.clone(),
            rows: group
                .rows
                .iter()
                .map(|&row| annotate_row(row, source, reference, &results[row], with_method))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PartitionConfig, Side};
    use crate::model::{CandidateScope, MatchMethod};

    fn source() -> Dataset {
        let mut ds = Dataset::new(
            "src",
            vec!["First_Name_".into(), "Last_Name_".into(), "Disc".into()],
        );
        ds.push_row(vec![Some("Jane".into()), Some("Doe".into()), Some("yes".into())]);
        ds.push_row(vec![Some("John".into()), Some("Smith".into()), None]);
        ds.push_row(vec![Some("Ann".into()), Some("Lee".into()), Some("no".into())]);
        ds
    }

    fn reference() -> Dataset {
        let mut ds = Dataset::new("ref", vec!["First Name".into(), "Last Name".into()]);
        ds.push_row(vec![Some("Jane".into()), Some("Doe".into())]);
        ds
    }

    fn results() -> Vec<MatchResult> {
        vec![
            MatchResult::linked(0, 100, MatchMethod::Fuzzy, CandidateScope::Full),
            MatchResult::unmatched(21, CandidateScope::Full),
            MatchResult::unmatched(0, CandidateScope::Full),
        ]
    }

    #[test]
    fn single_table_without_partition() {
        let (src, reference) = (source(), reference());
        let config = MatchConfig::default();
        let cols = ResolvedColumns::resolve(&src, Side::Source, &config).unwrap();
        let groups = partition_rows(&src, &cols, &config);
        let tables = build_tables(&groups, &src, &reference, &results(), &config);

        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.name, "matched");
        assert_eq!(
            t.headers,
            vec!["First_Name_", "Last_Name_", "Disc", "Matched", "Match_Score", "Adv_First Name", "Adv_Last Name"]
        );
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[0][3], CellValue::Bool(true));
        assert_eq!(t.rows[0][4], CellValue::Int(100));
        assert_eq!(t.rows[0][5], CellValue::Text("Jane".into()));
        assert_eq!(t.rows[1][3], CellValue::Bool(false));
        assert_eq!(t.rows[1][4], CellValue::Int(21));
        assert!(t.rows[1][5].is_empty() && t.rows[1][6].is_empty());
        assert!(t.rows.iter().all(|r| r.len() == t.headers.len()));
    }

    #[test]
    fn partition_splits_rows_without_loss() {
        let (src, reference) = (source(), reference());
        let config = MatchConfig {
            partition: Some(PartitionConfig {
                column: vec!["Disc".into()],
                true_values: vec!["yes".into()],
                in_label: "in discovery".into(),
                out_label: "not in discovery".into(),
            }),
            ..Default::default()
        };
        let cols = ResolvedColumns::resolve(&src, Side::Source, &config).unwrap();
        let groups = partition_rows(&src, &cols, &config);
        assert_eq!(groups[0].rows, vec![0]);
        assert_eq!(groups[1].rows, vec![1, 2]);

        let tables = build_tables(&groups, &src, &reference, &results(), &config);
        assert_eq!(tables[0].name, "in discovery");
        assert_eq!(tables[1].name, "not in discovery");
        assert_eq!(tables[1].rows[0][0], CellValue::Text("John".into()));
    }

    #[test]
    fn method_column_for_mixed_strategies() {
        let (src, reference) = (source(), reference());
        let config = MatchConfig {
            strategy: MatchStrategy::EmailThenFuzzy,
            ..Default::default()
        };
        let headers = output_headers(&src, &reference, &config);
        assert_eq!(headers[5], "Match_Method");

        let groups = vec![RowGroup {
            label: "all".into(),
            rows: vec![0, 1],
        }];
        let tables = build_tables(&groups, &src, &reference, &results(), &config);
        assert_eq!(tables[0].rows[0][5], CellValue::Text("fuzzy".into()));
        assert_eq!(tables[0].rows[1][5], CellValue::Text("none".into()));
    }
}
