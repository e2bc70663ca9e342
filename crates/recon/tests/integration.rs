use rostermatch_recon::config::{MatchConfig, MatchStrategy, ScorerKind};
use rostermatch_recon::engine::{load_csv_dataset, run};
use rostermatch_recon::model::{CandidateScope, CellValue, Dataset, MatchMethod, ReconInput};
use rostermatch_recon::{ReconError, RunResult};

fn dataset(name: &str, headers: &[&str], rows: &[Vec<&str>]) -> Dataset {
    let mut ds = Dataset::new(name, headers.iter().map(|h| h.to_string()).collect());
    for row in rows {
        ds.push_row(row.iter().map(|v| Some(v.to_string())).collect());
    }
    ds
}

fn source(rows: &[Vec<&str>]) -> Dataset {
    dataset("roster", &["First_Name_", "Last_Name_", "Business_Name"], rows)
}

fn reference(rows: &[Vec<&str>]) -> Dataset {
    dataset("contacts", &["First Name", "Last Name", "Company Name"], rows)
}

fn run_with(config: &MatchConfig, source: Dataset, reference: Dataset) -> RunResult {
    run(config, &ReconInput { source, reference }).unwrap()
}

/// Reference rows "<letter>ara<i> lee | acme", letters a..=y, never 'z'.
fn large_reference(n: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| {
            let letter = (b'a' + (i % 25) as u8) as char;
            vec![format!("{letter}ara{i}"), "Lee".to_string(), "Acme".to_string()]
        })
        .collect()
}

fn as_rows(owned: &[Vec<String>]) -> Vec<Vec<&str>> {
    owned.iter().map(|r| r.iter().map(String::as_str).collect()).collect()
}

// -------------------------------------------------------------------------
// Fuzzy name
// -------------------------------------------------------------------------

#[test]
fn suffix_variants_match() {
    let result = run_with(
        &MatchConfig::default(),
        source(&[vec!["Jane", "Doe", "Acme Corp"]]),
        reference(&[vec!["Jane", "Doe", "Acme Corporation"]]),
    );
    let r = &result.results[0];
    assert!(r.matched);
    assert!(r.score >= 90);
    assert_eq!(r.linked, Some(0));
}

#[test]
fn dissimilar_row_reports_best_low_score() {
    let result = run_with(
        &MatchConfig::default(),
        source(&[vec!["John", "Smith", "Tech LLC"]]),
        reference(&[vec!["Jane", "Doe", "Acme"]]),
    );
    let r = &result.results[0];
    assert!(!r.matched);
    assert_eq!(r.linked, None);
    // "john smith | tech" vs "jane doe | acme"
    assert_eq!(r.score, 21);
}

#[test]
fn non_latin_names_match() {
    for scorer in [ScorerKind::TokenSet, ScorerKind::TokenSetFast] {
        let config = MatchConfig {
            scorer,
            ..Default::default()
        };
        let result = run_with(
            &config,
            source(&[vec!["李", "伟", "华为"], vec!["Jürgen", "Müller", "Bäckerei Köln"]]),
            reference(&[
                vec!["王", "芳", "腾讯"],
                vec!["李", "伟", "华为"],
                vec!["Jürgen", "Müller", "Bäckerei Köln"],
            ]),
        );
        assert_eq!(result.results[0].linked, Some(1));
        assert_eq!(result.results[0].score, 100);
        assert_eq!(result.results[1].linked, Some(2));
        assert_eq!(result.results[1].score, 100);
    }
}

#[test]
fn blank_row_links_first_reference_row_at_threshold_zero() {
    let config = MatchConfig {
        threshold: 0,
        ..Default::default()
    };
    let result = run_with(
        &config,
        source(&[vec!["", "", ""]]),
        reference(&[vec!["Jane", "Doe", "Acme"], vec!["John", "Smith", "Tech"]]),
    );
    let r = &result.results[0];
    assert!(r.matched);
    assert_eq!(r.score, 0);
    assert_eq!(r.linked, Some(0));
    assert_eq!(result.report.summary.matched, 1);
}

#[test]
fn empty_reference_scores_zero() {
    let result = run_with(
        &MatchConfig::default(),
        source(&[vec!["John", "Smith", "Tech LLC"]]),
        reference(&[]),
    );
    assert!(!result.results[0].matched);
    assert_eq!(result.results[0].score, 0);
    assert_eq!(result.tables[0].rows.len(), 1);
}

#[test]
fn empty_source_yields_empty_output() {
    let result = run_with(
        &MatchConfig::default(),
        source(&[]),
        reference(&[vec!["Jane", "Doe", "Acme"]]),
    );
    assert!(result.results.is_empty());
    assert_eq!(result.report.summary.total_rows, 0);
    assert_eq!(result.tables.len(), 1);
    assert!(result.tables[0].rows.is_empty());
}

#[test]
fn empty_bucket_falls_back_to_full_scan() {
    let mut owned = large_reference(10_000);
    owned[5_000] = vec!["Ann".into(), "Zimmer".into(), "Zeta".into()];
    let config = MatchConfig {
        threshold: 80,
        ..Default::default()
    };
    let result = run_with(
        &config,
        source(&[vec!["Zoe", "Zimmer", "Zeta"]]),
        reference(&as_rows(&owned)),
    );

    let r = &result.results[0];
    assert_eq!(r.scope, CandidateScope::Fallback);
    assert!(r.matched);
    assert_eq!(r.linked, Some(5_000));
    // sect "zeta zimmer" vs "zeta zimmer zoe" = 22/26
    assert_eq!(r.score, 85);
    assert_eq!(result.report.summary.fallback_rows, 1);
}

#[test]
fn large_reference_is_blocked() {
    let mut owned = large_reference(600);
    owned.push(vec!["Jane".into(), "Doe".into(), "Acme Corporation".into()]);
    let result = run_with(
        &MatchConfig::default(),
        source(&[vec!["Jane", "Doe", "Acme Corp."]]),
        reference(&as_rows(&owned)),
    );
    let r = &result.results[0];
    assert_eq!(r.scope, CandidateScope::Blocked);
    assert_eq!(r.linked, Some(600));
    assert_eq!(r.score, 100);
    assert_eq!(result.report.summary.blocked_rows, 1);
}

#[test]
fn output_is_complete_and_deterministic() {
    let owned = large_reference(700);
    let src = source(&[
        vec!["Bara1", "Lee", "Acme"],
        vec!["", "", ""],
        vec!["Cara2", "Lea", "Acme Inc"],
        vec!["Nobody", "Here", ""],
    ]);
    let reference = reference(&as_rows(&owned));
    let config = MatchConfig::default();

    let a = run_with(&config, src.clone(), reference.clone());
    let b = run_with(&config, src, reference);

    assert_eq!(a.results.len(), 4);
    assert_eq!(a.tables[0].rows.len(), 4);
    assert_eq!(a.results, b.results);
    assert_eq!(a.tables[0].rows, b.tables[0].rows);
    // Blank key row is kept and scored 0
    assert_eq!(a.results[1].score, 0);
    assert_eq!(a.results[1].scope, CandidateScope::Skipped);
}

#[test]
fn parallel_and_fast_scorer_agree_with_default() {
    let owned = large_reference(800);
    let rows: Vec<Vec<String>> = (0..120)
        .map(|i| vec![format!("{}ara{}", (b'a' + (i % 25) as u8) as char, i * 7), "Le".into(), "Acme".into()])
        .collect();
    let src = source(&as_rows(&rows));
    let reference = reference(&as_rows(&owned));

    let baseline = run_with(&MatchConfig::default(), src.clone(), reference.clone());
    let parallel = run_with(
        &MatchConfig {
            parallel: true,
            scorer: ScorerKind::TokenSetFast,
            ..Default::default()
        },
        src,
        reference,
    );
    assert_eq!(baseline.results, parallel.results);
}

// -------------------------------------------------------------------------
// Other strategies
// -------------------------------------------------------------------------

#[test]
fn exact_id_strategy() {
    let config = MatchConfig {
        strategy: MatchStrategy::ExactId,
        ..Default::default()
    };
    let src = dataset("sheet", &["Name", "Matched_CRD"], &[vec!["A", "100"], vec!["B", "999"]]);
    let reference = dataset(
        "advisors",
        &["CRD", "Email_"],
        &[vec!["100", ""], vec!["100", "a@firm.com"]],
    );
    let result = run_with(&config, src, reference);

    assert_eq!(result.results[0].linked, Some(1));
    assert_eq!(result.results[0].method, MatchMethod::Id);
    assert!(!result.results[1].matched);

    let table = &result.tables[0];
    assert_eq!(
        table.headers,
        vec!["Name", "Matched_CRD", "Matched", "Match_Score", "Match_Method", "Adv_CRD", "Adv_Email_"]
    );
    assert_eq!(table.rows[0][6], CellValue::Text("a@firm.com".into()));
    assert_eq!(result.report.summary.by_method.get("id"), Some(&1));
}

#[test]
fn email_then_fuzzy_strategy() {
    let config = MatchConfig::from_toml(
        r#"
name = "discovery"
threshold = 80
strategy = "email_then_fuzzy"
"#,
    )
    .unwrap();
    let src = dataset(
        "schwab",
        &["First Name", "Last Name", "Company", "Email"],
        &[
            vec!["Jane", "Doe", "Acme", "jane@acme.com"],
            vec!["Jon", "Smith", "Tech", ""],
        ],
    );
    let reference = dataset(
        "adv",
        &["First Name", "Last Name", "Company", "Email_"],
        &[
            vec!["John", "Smith", "Tech LLC", "js@tech.io"],
            vec!["Janet", "Doe", "Acme", "Jane@Acme.com"],
        ],
    );
    let result = run_with(&config, src, reference);

    assert_eq!(result.results[0].method, MatchMethod::Email);
    assert_eq!(result.results[0].linked, Some(1));
    assert_eq!(result.results[1].method, MatchMethod::Fuzzy);
    assert_eq!(result.results[1].linked, Some(0));
}

// -------------------------------------------------------------------------
// Partition + config
// -------------------------------------------------------------------------

#[test]
fn partition_by_discovery_flag() {
    let config = MatchConfig::from_toml(
        r#"
[partition]
column = ["In_Discovery"]
"#,
    )
    .unwrap();
    let src = dataset(
        "roster",
        &["First_Name_", "Last_Name_", "In_Discovery"],
        &[
            vec!["Jane", "Doe", "Yes"],
            vec!["John", "Smith", ""],
            vec!["Ann", "Lee", "x"],
        ],
    );
    let reference = reference(&[vec!["Jane", "Doe", ""]]);
    let result = run_with(&config, src, reference);

    assert_eq!(result.tables.len(), 2);
    assert_eq!(result.tables[0].name, "in discovery");
    assert_eq!(result.tables[0].rows.len(), 2);
    assert_eq!(result.tables[1].name, "not in discovery");
    assert_eq!(result.tables[1].rows.len(), 1);

    let parts = &result.report.summary.partitions;
    assert_eq!(parts[0].matched, 1);
    assert_eq!(parts[0].rows + parts[1].rows, 3);
}

#[test]
fn schema_error_names_role_and_dataset() {
    let src = dataset("roster", &["Given", "Family"], &[vec!["Jane", "Doe"]]);
    let err = run(
        &MatchConfig::default(),
        &ReconInput {
            source: src,
            reference: reference(&[]),
        },
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(matches!(err, ReconError::UnresolvedRole { .. }));
    assert!(msg.contains("first_name"), "{msg}");
    assert!(msg.contains("source 'roster'"), "{msg}");
}

#[test]
fn csv_loader_feeds_engine() {
    let src = load_csv_dataset("src", "First Name,Last Name,Company\nJane,Doe,Acme Inc\n", b',').unwrap();
    let reference =
        load_csv_dataset("ref", "First Name;Last Name;Company\nJane;Doe;ACME\n", b';').unwrap();
    let result = run_with(&MatchConfig::default(), src, reference);
    assert!(result.results[0].matched);

    let json = serde_json::to_value(&result.report).unwrap();
    assert_eq!(json["summary"]["matched"], 1);
    assert_eq!(json["meta"]["strategy"], "fuzzy_name");
}
