// Copyright 2026 The Trimerge Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end alignment tests over the full pipeline.

use assert_matches::assert_matches;
use trimerge_lib::CancelFlag;
use trimerge_lib::align::AlignError;
use trimerge_lib::align::Alignment;
use trimerge_lib::align::Column;
use trimerge_lib::align::LineRange;
use trimerge_lib::align::ManualAnchor;
use trimerge_lib::align::align2;
use trimerge_lib::align::align3;
use trimerge_lib::options::DiffOptions;
use trimerge_lib::source_text::SourceText;

fn align(a: &str, b: &str, c: &str, options: &DiffOptions) -> Alignment {
    let a = SourceText::parse(a, options).unwrap();
    let b = SourceText::parse(b, options).unwrap();
    let c = SourceText::parse(c, options).unwrap();
    align3(&a, &b, &c, options, &[], &CancelFlag::new()).unwrap()
}

fn rows_of(alignment: &Alignment) -> Vec<(Option<usize>, Option<usize>, Option<usize>)> {
    alignment
        .rows
        .iter()
        .map(|row| (row.line_a, row.line_b, row.line_c))
        .collect()
}

/// Every input line appears in its column exactly once and in order, no
/// row is fully empty, and the equality flags form a consistent triangle.
fn check_invariants(alignment: &Alignment, len_a: usize, len_b: usize, len_c: usize) {
    for (column, len) in [(Column::A, len_a), (Column::B, len_b), (Column::C, len_c)] {
        let lines: Vec<usize> = alignment
            .rows
            .iter()
            .filter_map(|row| row.line(column))
            .collect();
        assert_eq!(lines, (0..len).collect::<Vec<_>>(), "column {column:?}");
    }
    for row in &alignment.rows {
        assert!(
            row.line_a.is_some() || row.line_b.is_some() || row.line_c.is_some(),
            "empty row survived compaction"
        );
        assert!(
            !(row.a_eq_b && row.b_eq_c) || row.a_eq_c,
            "equality triangle violated: {row:?}"
        );
    }
}

#[test]
fn test_identical_three_way() {
    let alignment = align("x\ny\nz\n", "x\ny\nz\n", "x\ny\nz\n", &DiffOptions::default());
    assert_eq!(
        rows_of(&alignment),
        vec![
            (Some(0), Some(0), Some(0)),
            (Some(1), Some(1), Some(1)),
            (Some(2), Some(2), Some(2)),
        ]
    );
    for row in &alignment.rows {
        assert!(row.a_eq_b && row.a_eq_c && row.b_eq_c);
    }
    check_invariants(&alignment, 3, 3, 3);
}

#[test]
fn test_pure_insertion_on_c() {
    let alignment = align("x\ny\n", "x\ny\n", "x\nNEW\ny\n", &DiffOptions::default());
    assert_eq!(
        rows_of(&alignment),
        vec![
            (Some(0), Some(0), Some(0)),
            (None, None, Some(1)),
            (Some(1), Some(1), Some(2)),
        ]
    );
    check_invariants(&alignment, 2, 2, 3);
}

#[test]
fn test_clean_modification_on_b() {
    let alignment = align("x\ny\nz\n", "x\nY\nz\n", "x\ny\nz\n", &DiffOptions::default());
    check_invariants(&alignment, 3, 3, 3);
    let row = &alignment.rows[1];
    assert_eq!((row.line_a, row.line_b, row.line_c), (Some(1), Some(1), Some(1)));
    assert!(!row.a_eq_b);
    assert!(row.a_eq_c);
    assert!(!row.b_eq_c);
}

#[test]
fn test_true_three_way_conflict() {
    let alignment = align("x\ny\nz\n", "x\nY1\nz\n", "x\nY2\nz\n", &DiffOptions::default());
    check_invariants(&alignment, 3, 3, 3);
    let row = &alignment.rows[1];
    assert!(!row.a_eq_b && !row.a_eq_c && !row.b_eq_c);
}

#[test]
fn test_delete_vs_modify() {
    let alignment = align("x\ny\nz\n", "x\nz\n", "x\nY\nz\n", &DiffOptions::default());
    check_invariants(&alignment, 3, 2, 3);
    let row = alignment
        .rows
        .iter()
        .find(|row| row.line_a == Some(1))
        .unwrap();
    assert_eq!(row.line_b, None);
    assert_eq!(row.line_c, Some(1));
    assert!(!row.a_eq_c);
}

#[test]
fn test_whitespace_only_difference_with_ignore_whitespace() {
    let options = DiffOptions {
        ignore_whitespace: true,
        ..Default::default()
    };
    let alignment = align("x\n\ty\nz\n", "x\n y\nz\n", "x\n  y\nz\n", &options);
    check_invariants(&alignment, 3, 3, 3);
    let row = &alignment.rows[1];
    assert!(row.a_eq_b && row.a_eq_c && row.b_eq_c);
    // The texts still differ byte for byte.
    assert!(!alignment.texts_equal_ab);
}

#[test]
fn test_fine_diff_single_character_change() {
    let alignment = align(
        "first line\nsecond line\n",
        "first line\nsecond lime\n",
        "first line\nsecond line\n",
        &DiffOptions::default(),
    );
    let row = &alignment.rows[1];
    let fine = row.fine_ab.as_ref().unwrap();
    let changes: Vec<_> = fine
        .iter()
        .filter(|d| d.removed_a > 0 || d.inserted_b > 0)
        .collect();
    assert_eq!(changes.len(), 1);
    assert_eq!((changes[0].removed_a, changes[0].inserted_b), (1, 1));
    // The other pairs are byte-identical and carry no fine diff.
    assert!(row.fine_ca.is_none());
}

#[test]
fn test_fine_diff_skipped_for_pure_comments() {
    let options = DiffOptions {
        ignore_comments: true,
        ..Default::default()
    };
    let alignment = align(
        "code();\n// one comment\n",
        "code();\n// another comment\n",
        "code();\n// one comment\n",
        &options,
    );
    let row = alignment
        .rows
        .iter()
        .find(|row| row.line_a == Some(1))
        .unwrap();
    assert!(row.a_eq_b);
    assert!(row.fine_ab.is_none());
}

#[test]
fn test_uneven_insertions_keep_columns_dense() {
    let alignment = align(
        "a\nb\nc\nd\ne\n",
        "a\nB1\nb\nc\nd2\ne\ntail\n",
        "head\na\nb\nX\nc\nd\ne\n",
        &DiffOptions::default(),
    );
    check_invariants(&alignment, 5, 7, 7);
}

#[test]
fn test_disjoint_inputs() {
    let alignment = align("1\n2\n", "3\n4\n5\n", "6\n", &DiffOptions::default());
    check_invariants(&alignment, 2, 3, 1);
}

#[test]
fn test_empty_inputs() {
    let alignment = align("", "x\n", "", &DiffOptions::default());
    check_invariants(&alignment, 0, 1, 0);
    assert_eq!(rows_of(&alignment), vec![(None, Some(0), None)]);
}

#[test]
fn test_ignore_case_alignment() {
    let options = DiffOptions {
        ignore_case: true,
        ..Default::default()
    };
    let alignment = align("Mixed\n", "MIXED\n", "mixed\n", &options);
    let row = &alignment.rows[0];
    assert!(row.a_eq_b && row.a_eq_c && row.b_eq_c);
}

#[test]
fn test_ignore_numbers_alignment() {
    let options = DiffOptions {
        ignore_numbers: true,
        ..Default::default()
    };
    let alignment = align("version 1\n", "version 2\n", "version 3\n", &options);
    let row = &alignment.rows[0];
    assert!(row.a_eq_b && row.a_eq_c && row.b_eq_c);
}

#[test]
fn test_stats_counts_equal_rows() {
    let alignment = align("x\ny\nz\n", "x\nY\nz\n", "x\ny\nz\n", &DiffOptions::default());
    let stats = alignment.stats();
    assert_eq!(stats.rows, 3);
    assert_eq!(stats.equal_ab, 2);
    assert_eq!(stats.equal_ac, 3);
    assert_eq!(stats.equal_bc, 2);
}

#[test]
fn test_total_equality_report() {
    let alignment = align("x\ny\n", "x\ny\n", "x\nY\n", &DiffOptions::default());
    assert!(alignment.texts_equal_ab);
    assert!(!alignment.texts_equal_bc);
    assert!(!alignment.texts_equal_ca);
}

#[test]
fn test_two_way_mode() {
    let options = DiffOptions::default();
    let a = SourceText::parse("x\ny\nz\n", &options).unwrap();
    let b = SourceText::parse("x\nz\n", &options).unwrap();
    let alignment = align2(&a, &b, &options, &[], &CancelFlag::new()).unwrap();
    assert!(!alignment.three_way);
    assert_eq!(
        rows_of(&alignment),
        vec![
            (Some(0), Some(0), None),
            (Some(1), None, None),
            (Some(2), Some(1), None),
        ]
    );
}

#[test]
fn test_manual_anchor_constrains_three_way() {
    // "marker" appears twice in A; the anchor ties its first occurrence in
    // A to the line 4 occurrence in B.
    let a = "one\nmarker\ntwo\n";
    let b = "one\nx\ny\nz\nmarker\ntwo\n";
    let c = "one\ntwo\n";
    let anchors = [ManualAnchor {
        range_a: Some(LineRange { first: 1, last: 1 }),
        range_b: Some(LineRange { first: 4, last: 4 }),
        range_c: None,
    }];
    let options = DiffOptions::default();
    let sa = SourceText::parse(a, &options).unwrap();
    let sb = SourceText::parse(b, &options).unwrap();
    let sc = SourceText::parse(c, &options).unwrap();
    let alignment = align3(&sa, &sb, &sc, &options, &anchors, &CancelFlag::new()).unwrap();
    check_invariants(&alignment, 3, 6, 2);
    let row = alignment
        .rows
        .iter()
        .find(|row| row.line_a == Some(1))
        .unwrap();
    assert_eq!(row.line_b, Some(4));
}

#[test]
fn test_malformed_anchors_are_rejected() {
    let options = DiffOptions::default();
    let a = SourceText::parse("x\ny\n", &options).unwrap();
    let b = SourceText::parse("x\ny\n", &options).unwrap();
    let anchors = [
        ManualAnchor {
            range_a: Some(LineRange { first: 0, last: 1 }),
            range_b: Some(LineRange { first: 0, last: 0 }),
            range_c: None,
        },
        ManualAnchor {
            range_a: Some(LineRange { first: 1, last: 1 }),
            range_b: Some(LineRange { first: 1, last: 1 }),
            range_c: None,
        },
    ];
    let result = align2(&a, &b, &options, &anchors, &CancelFlag::new());
    assert_matches!(result, Err(AlignError::BadAnchors { .. }));
}

#[test]
fn test_cancel_yields_incomplete_but_valid_table() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let options = DiffOptions::default();
    let a = SourceText::parse("a\nb\nc\nd\n", &options).unwrap();
    let b = SourceText::parse("a\nx\nc\n", &options).unwrap();
    let c = SourceText::parse("q\nb\nd\n", &options).unwrap();
    let alignment = align3(&a, &b, &c, &options, &[], &cancel).unwrap();
    assert!(alignment.incomplete);
    check_invariants(&alignment, 4, 3, 3);
}
