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

//! End-to-end merge tests: align, resolve, emit.

use indoc::indoc;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use trimerge_lib::CancelFlag;
use trimerge_lib::align::align2;
use trimerge_lib::align::align3;
use trimerge_lib::emit::MergeOutput;
use trimerge_lib::emit::MergeSources;
use trimerge_lib::emit::emit;
use trimerge_lib::options::DiffOptions;
use trimerge_lib::options::EmitOptions;
use trimerge_lib::options::MergePolicy;
use trimerge_lib::resolve::Choice;
use trimerge_lib::resolve::ConflictClass;
use trimerge_lib::resolve::resolve;
use trimerge_lib::source_text::SourceText;

fn merge_with(
    a: &str,
    b: &str,
    c: &str,
    options: &DiffOptions,
    policy: &MergePolicy,
) -> MergeOutput {
    let a = SourceText::parse(a, options).unwrap();
    let b = SourceText::parse(b, options).unwrap();
    let c = SourceText::parse(c, options).unwrap();
    let alignment = align3(&a, &b, &c, options, &[], &CancelFlag::new()).unwrap();
    let rows = resolve(&alignment, policy);
    let sources = MergeSources {
        a: &a,
        b: &b,
        c: Some(&c),
    };
    emit(&rows, &sources, &EmitOptions::default())
}

fn merge(a: &str, b: &str, c: &str) -> MergeOutput {
    merge_with(a, b, c, &DiffOptions::default(), &MergePolicy::default())
}

#[test]
fn test_identical_inputs_merge_to_themselves() {
    let output = merge("x\ny\nz\n", "x\ny\nz\n", "x\ny\nz\n");
    assert_eq!(output.text, "x\ny\nz\n");
    assert!(output.is_fully_resolved());
}

#[test]
fn test_insertion_on_c_is_taken() {
    let output = merge("x\ny\n", "x\ny\n", "x\nNEW\ny\n");
    assert_eq!(output.text, "x\nNEW\ny\n");
    assert!(output.is_fully_resolved());
}

#[test]
fn test_changes_from_both_branches_combine() {
    let output = merge("a\nb\nc\n", "A\nb\nc\n", "a\nb\nC\n");
    assert_eq!(output.text, "A\nb\nC\n");
    assert!(output.is_fully_resolved());
}

#[test]
fn test_deletion_on_one_branch_is_accepted() {
    let output = merge("x\ny\nz\n", "x\nz\n", "x\ny\nz\n");
    assert_eq!(output.text, "x\nz\n");
    assert!(output.is_fully_resolved());
}

#[test]
fn test_identical_change_in_both_branches() {
    let output = merge("x\nold\nz\n", "x\nnew\nz\n", "x\nnew\nz\n");
    assert_eq!(output.text, "x\nnew\nz\n");
    assert!(output.is_fully_resolved());
}

#[test]
fn test_true_conflict_gets_markers() {
    let output = merge("x\ny\nz\n", "x\nY1\nz\n", "x\nY2\nz\n");
    assert_eq!(output.unresolved, 1);
    assert_eq!(
        output.text,
        indoc! {"
            x
            <<<<<<< A
            y
            ||||||| B
            Y1
            ======= C
            Y2
            >>>>>>>
            z
        "}
    );
}

#[test]
fn test_delete_vs_modify_conflict() {
    let output = merge("x\ny\nz\n", "x\nz\n", "x\nY\nz\n");
    assert_eq!(output.unresolved, 1);
    assert_eq!(
        output.text,
        indoc! {"
            x
            <<<<<<< A
            y
            ||||||| B
            ======= C
            Y
            >>>>>>>
            z
        "}
    );
}

#[test]
fn test_differing_blank_lines_never_conflict() {
    // The fine differ forces equality for pairs of white lines, so rows
    // that disagree about invisible content resolve without markers.
    let output = merge("x\n \nz\n", "x\n\t\nz\n", "x\n  \nz\n");
    assert_eq!(output.text, "x\n \nz\n");
    assert!(output.is_fully_resolved());
}

#[test]
fn test_resolver_classes_for_seed_scenarios() {
    let options = DiffOptions::default();
    let a = SourceText::parse("x\ny\n", &options).unwrap();
    let c = SourceText::parse("x\nNEW\ny\n", &options).unwrap();
    let alignment = align3(&a, &a, &c, &options, &[], &CancelFlag::new()).unwrap();
    let rows = resolve(&alignment, &MergePolicy::default());
    assert_eq!(rows[1].class, ConflictClass::NewFromC);
    assert_eq!(rows[1].default_choice, Choice::C);
}

#[test]
fn test_override_resolves_conflict() {
    let options = DiffOptions::default();
    let a = SourceText::parse("x\ny\nz\n", &options).unwrap();
    let b = SourceText::parse("x\nY1\nz\n", &options).unwrap();
    let c = SourceText::parse("x\nY2\nz\n", &options).unwrap();
    let alignment = align3(&a, &b, &c, &options, &[], &CancelFlag::new()).unwrap();
    let mut rows = resolve(&alignment, &MergePolicy::default());
    let conflict = rows.iter_mut().find(|row| row.is_unsolved()).unwrap();
    conflict.override_choice = Some(Choice::C);
    let sources = MergeSources {
        a: &a,
        b: &b,
        c: Some(&c),
    };
    let output = emit(&rows, &sources, &EmitOptions::default());
    assert_eq!(output.text, "x\nY2\nz\n");
    assert!(output.is_fully_resolved());
}

#[test]
fn test_two_way_emit_prefers_b() {
    let options = DiffOptions::default();
    let a = SourceText::parse("keep\nold\ngone\n", &options).unwrap();
    let b = SourceText::parse("keep\nnew\nadded\n", &options).unwrap();
    let alignment = align2(&a, &b, &options, &[], &CancelFlag::new()).unwrap();
    let rows = resolve(&alignment, &MergePolicy::default());
    let sources = MergeSources {
        a: &a,
        b: &b,
        c: None,
    };
    let output = emit(&rows, &sources, &EmitOptions::default());
    assert_eq!(output.text, "keep\nnew\nadded\n");
}

fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(prop_oneof!["a", "b", "c", "d", "e"], 0..20)
        .prop_map(|lines| lines.into_iter().map(|l| l + "\n").collect())
}

proptest! {
    // The two-file round trip: defaults keep every B change, so the merge
    // of A with B reproduces B exactly.
    #[test]
    fn test_two_way_round_trip(a in arb_text(), b in arb_text()) {
        let options = DiffOptions::default();
        let sa = SourceText::parse(&a, &options).unwrap();
        let sb = SourceText::parse(&b, &options).unwrap();
        let alignment = align2(&sa, &sb, &options, &[], &CancelFlag::new()).unwrap();
        let rows = resolve(&alignment, &MergePolicy::default());
        let sources = MergeSources { a: &sa, b: &sb, c: None };
        let output = emit(&rows, &sources, &EmitOptions::default());
        prop_assert_eq!(output.text, b);
    }

    // Resolving the same alignment twice yields the same plan.
    #[test]
    fn test_resolver_idempotence(a in arb_text(), b in arb_text(), c in arb_text()) {
        let options = DiffOptions::default();
        let sa = SourceText::parse(&a, &options).unwrap();
        let sb = SourceText::parse(&b, &options).unwrap();
        let sc = SourceText::parse(&c, &options).unwrap();
        let alignment = align3(&sa, &sb, &sc, &options, &[], &CancelFlag::new()).unwrap();
        let policy = MergePolicy::default();
        prop_assert_eq!(resolve(&alignment, &policy), resolve(&alignment, &policy));
    }
}
