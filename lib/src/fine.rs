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

//! The fine differ: character-level edit scripts within one aligned row.
//!
//! A greedy search picks, from the current positions in both lines, the
//! closest pair of equal characters that has at least one confirming
//! context character, then extends the match backwards over plain equal
//! characters. The search range is bounded by a window, so the cost per
//! row pair stays O(window * shorter line).

use crate::align::Diff3Line;
use crate::diff::DiffList;
use crate::diff::DiffRun;
use crate::diff::check_diff_list;
use crate::options::DiffOptions;
use crate::source_text::TextBuffer;

/// Which column pair of the table a fine-diff pass compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FinePass {
    /// A against B, stored as `fine_ab`.
    Ab,
    /// B against C, stored as `fine_bc`.
    Bc,
    /// C against A, stored as `fine_ca`.
    Ca,
}

/// Equal runs shorter than this are folded into the surrounding change,
/// except at the very start of a line.
const MIN_USEFUL_RUN: usize = 4;

/// Computes the character-level edit script between two byte slices.
///
/// `require_context` demands a confirming neighbor for a candidate match:
/// near-diagonal position, matching following characters, or the end of
/// both slices. `search_window` bounds how far the second slice is probed
/// per position of the first.
pub(crate) fn fine_diff(
    p1: &[u8],
    p2: &[u8],
    require_context: bool,
    search_window: usize,
) -> DiffList {
    let len1 = p1.len();
    let len2 = p2.len();
    let mut list = DiffList::new();
    let mut i1 = 0;
    let mut i2 = 0;
    loop {
        let mut num_equal = 0;
        while i1 < len1 && i2 < len2 && p1[i1] == p2[i2] {
            i1 += 1;
            i2 += 1;
            num_equal += 1;
        }

        // Find the nearest equal pair (smallest k1 + k2) with context.
        let mut best: Option<(usize, usize)> = None;
        let mut k1 = 0;
        loop {
            if i1 + k1 == len1 || best.is_some_and(|(b1, b2)| k1 >= b1 + b2) {
                break;
            }
            for k2 in 0..search_window {
                if i2 + k2 == len2 || best.is_some_and(|(b1, b2)| k1 + k2 >= b1 + b2) {
                    break;
                }
                let at_both_ends = i1 + k1 + 1 == len1 && i2 + k2 + 1 == len2;
                let next_matches = i1 + k1 + 1 != len1
                    && i2 + k2 + 1 != len2
                    && p1[i1 + k1 + 1] == p2[i2 + k2 + 1];
                let near_diagonal = (k1 as i64 - k2 as i64).abs() < 3;
                if p1[i1 + k1] == p2[i2 + k2]
                    && (!require_context || near_diagonal || at_both_ends || next_matches)
                {
                    if best.is_none_or(|(b1, b2)| k1 + k2 < b1 + b2) {
                        best = Some((k1, k2));
                    }
                    break;
                }
            }
            k1 += 1;
        }

        let mut end_reached = false;
        if let Some((mut b1, mut b2)) = best {
            // The match was found with context; extend it backwards over
            // plain equal characters.
            while b1 >= 1 && b2 >= 1 && p1[i1 + b1 - 1] == p2[i2 + b2 - 1] {
                b1 -= 1;
                b2 -= 1;
            }
            list.push(DiffRun::new(num_equal, b1, b2));
            i1 += b1;
            i2 += b2;
        } else {
            list.push(DiffRun::new(num_equal, len1 - i1, len2 - i2));
            end_reached = true;
        }

        // The greedy choice sometimes eats characters that would have
        // matched later. Walk back over equal trailing characters and redo
        // the bookkeeping when that yields a better script.
        // TODO: this rollback can fold runs that were already emitted;
        // review whether a forward-only variant produces the same scripts.
        let mut num_unmatched = 0;
        let mut pu1 = i1 as i64 - 1;
        let mut pu2 = i2 as i64 - 1;
        while pu1 >= 0 && pu2 >= 0 && p1[pu1 as usize] == p2[pu2 as usize] {
            num_unmatched += 1;
            pu1 -= 1;
            pu2 -= 1;
        }
        if num_unmatched > 0 {
            let orig_back = *list.last().unwrap();
            let mut d = list.pop().unwrap();
            while num_unmatched > 0 {
                if d.removed_a > 0 && d.inserted_b > 0 {
                    d.removed_a -= 1;
                    d.inserted_b -= 1;
                    num_unmatched -= 1;
                } else if d.num_equal > 0 {
                    d.num_equal -= 1;
                    num_unmatched -= 1;
                }
                if d.num_equal == 0
                    && (d.removed_a == 0 || d.inserted_b == 0)
                    && num_unmatched > 0
                {
                    if list.is_empty() {
                        break;
                    }
                    let previous = list.pop().unwrap();
                    d.num_equal += previous.num_equal;
                    d.removed_a += previous.removed_a;
                    d.inserted_b += previous.inserted_b;
                    end_reached = false;
                }
            }
            if end_reached {
                list.push(orig_back);
            } else {
                i1 = (pu1 + 1 + num_unmatched) as usize;
                i2 = (pu2 + 1 + num_unmatched) as usize;
                list.push(d);
            }
        }
        if end_reached {
            break;
        }
    }

    check_diff_list(&list, len1, len2);
    list
}

/// Folds equal runs shorter than [`MIN_USEFUL_RUN`] into the neighboring
/// change. A short run at the very start survives as long as the script
/// has at least one useful run elsewhere.
fn collapse_trivial_runs(list: &mut DiffList) {
    let has_useful_run = list.iter().any(|d| d.num_equal >= MIN_USEFUL_RUN);
    for (index, d) in list.iter_mut().enumerate() {
        if d.num_equal < MIN_USEFUL_RUN
            && (d.removed_a > 0 || d.inserted_b > 0)
            && !(has_useful_run && index == 0)
        {
            d.removed_a += d.num_equal;
            d.inserted_b += d.num_equal;
            d.num_equal = 0;
        }
    }
}

/// Runs the fine differ over every row of the table for one column pair.
///
/// Returns whether the two texts are identical across the whole table.
/// Rows whose two lines are both white space or pure comments get their
/// equality flag forced instead of a fine diff.
pub(crate) fn fine_diff_pass(
    rows: &mut [Diff3Line],
    pass: FinePass,
    v1: &TextBuffer,
    v2: &TextBuffer,
    options: &DiffOptions,
) -> bool {
    let mut texts_equal = true;
    for row in rows {
        let (k1, k2) = match pass {
            FinePass::Ab => (row.line_a, row.line_b),
            FinePass::Bc => (row.line_b, row.line_c),
            FinePass::Ca => (row.line_c, row.line_a),
        };
        let (Some(k1), Some(k2)) = (k1, k2) else {
            if k1.is_some() != k2.is_some() {
                texts_equal = false;
            }
            continue;
        };
        let line1 = v1.line(k1);
        let line2 = v2.line(k2);
        let text1 = v1.line_str(k1).as_bytes();
        let text2 = v2.line_str(k2).as_bytes();
        if text1 == text2 {
            continue;
        }
        texts_equal = false;

        let both_invisible = (line1.is_pure_comment() || line1.is_white())
            && (line2.is_pure_comment() || line2.is_white());
        if both_invisible {
            // The difference is invisible under the active options; force
            // the pair equal and keep the row free of a fine diff.
            match pass {
                FinePass::Ab => row.a_eq_b = true,
                FinePass::Bc => row.b_eq_c = true,
                FinePass::Ca => row.a_eq_c = true,
            }
            continue;
        }

        let mut list = fine_diff(text1, text2, true, options.fine_search_window);
        collapse_trivial_runs(&mut list);
        match pass {
            FinePass::Ab => row.fine_ab = Some(list),
            FinePass::Bc => row.fine_bc = Some(list),
            FinePass::Ca => row.fine_ca = Some(list),
        }
    }
    texts_equal
}
