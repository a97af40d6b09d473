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

//! The pairwise line differ: equality predicate, equivalence classes, and
//! the driver around the middle-snake search in [`crate::myers`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::Range;

use crate::CancelFlag;
use crate::comment::is_white;
use crate::myers;
use crate::options::DiffOptions;
use crate::source_text::TextBuffer;

/// One contiguous stretch of an edit script: `num_equal` matching lines,
/// then `removed_a` lines deleted from the first sequence and `inserted_b`
/// lines inserted from the second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffRun {
    pub num_equal: usize,
    pub removed_a: usize,
    pub inserted_b: usize,
}

impl DiffRun {
    pub fn new(num_equal: usize, removed_a: usize, inserted_b: usize) -> Self {
        Self {
            num_equal,
            removed_a,
            inserted_b,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.num_equal == 0 && self.removed_a == 0 && self.inserted_b == 0
    }
}

/// An edit script. Summing `num_equal + removed_a` over all runs yields the
/// length of the first sequence; `num_equal + inserted_b` the second.
pub type DiffList = Vec<DiffRun>;

/// Streaming consumer over a [`DiffList`], decrementing one counter at a
/// time the way the aligner walks edit scripts.
#[derive(Clone, Debug)]
pub(crate) struct RunCursor<'a> {
    runs: std::slice::Iter<'a, DiffRun>,
    pub current: DiffRun,
}

impl<'a> RunCursor<'a> {
    pub fn new(list: &'a DiffList) -> Self {
        Self {
            runs: list.iter(),
            current: DiffRun::default(),
        }
    }

    /// Refills the current run when exhausted, skipping all-zero runs from
    /// degenerate segments. Returns false at the end of the script.
    pub fn refill(&mut self) -> bool {
        while self.current.is_exhausted() {
            match self.runs.next() {
                Some(run) => self.current = *run,
                None => return false,
            }
        }
        true
    }
}

pub(crate) fn check_diff_list(list: &DiffList, len_a: usize, len_b: usize) {
    debug_assert_eq!(
        list.iter().map(|d| d.num_equal + d.removed_a).sum::<usize>(),
        len_a,
        "edit script does not cover the first sequence"
    );
    debug_assert_eq!(
        list.iter().map(|d| d.num_equal + d.inserted_b).sum::<usize>(),
        len_b,
        "edit script does not cover the second sequence"
    );
}

/// A line with white space runs collapsed to single spaces and the ends
/// trimmed, when the options ask for it.
pub(crate) fn normalize_line<'a>(line: &'a str, options: &DiffOptions) -> Cow<'a, str> {
    if !options.ignore_whitespace {
        return Cow::Borrowed(line);
    }
    let mut out = String::with_capacity(line.len());
    let mut pending_space = false;
    for c in line.chars() {
        if is_white(c) {
            if !out.is_empty() {
                pending_space = true;
            }
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    Cow::Owned(out)
}

pub(crate) fn nonwhite_count(line: &str) -> usize {
    line.chars().filter(|&c| !is_white(c)).count()
}

/// Line equality under the active options. The strict variant additionally
/// refuses matches of trivial content (at most two non-white characters)
/// when `ignore_trivial_matches` is set; it is used where a match would end
/// a non-matching area.
pub(crate) fn lines_equal(l1: &str, l2: &str, options: &DiffOptions, strict: bool) -> bool {
    if normalize_line(l1, options) != normalize_line(l2, options) {
        return false;
    }
    if strict && options.ignore_trivial_matches {
        nonwhite_count(l1) > 2
    } else {
        true
    }
}

/// Equivalence classes of the lines of two buffers under the active
/// equality. Class 0 is reserved for lines that are blank after
/// normalization; `trivial` flags classes with at most two non-white
/// characters.
pub(crate) struct LineClasses {
    pub a: Vec<u32>,
    pub b: Vec<u32>,
    pub trivial: Vec<bool>,
}

pub(crate) fn classify(
    a: &TextBuffer,
    range_a: Range<usize>,
    b: &TextBuffer,
    range_b: Range<usize>,
    options: &DiffOptions,
) -> LineClasses {
    let mut map: HashMap<String, u32> = HashMap::new();
    let mut trivial = vec![true]; // class 0
    let mut assign = |buffer: &TextBuffer, range: Range<usize>| -> Vec<u32> {
        range
            .map(|i| {
                let key = normalize_line(buffer.line_str(i), options);
                if key.is_empty() {
                    return 0;
                }
                match map.entry(key.into_owned()) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let id = trivial.len() as u32;
                        trivial.push(nonwhite_count(entry.key()) <= 2);
                        entry.insert(id);
                        id
                    }
                }
            })
            .collect()
    };
    let classes_a = assign(a, range_a);
    let classes_b = assign(b, range_b);
    LineClasses {
        a: classes_a,
        b: classes_b,
        trivial,
    }
}

/// Produces the edit script from `a` to `b`.
///
/// Cancellation is cooperative: when the flag is raised mid-search the
/// remaining region is reported as changed, which keeps the count
/// invariants intact.
pub fn diff_lines(
    a: &TextBuffer,
    b: &TextBuffer,
    options: &DiffOptions,
    cancel: &CancelFlag,
) -> DiffList {
    diff_line_ranges(a, 0..a.line_count(), b, 0..b.line_count(), options, cancel)
}

/// Like [`diff_lines`], restricted to one segment of each input. Used to
/// diff the independent segments between manual alignment anchors.
pub fn diff_line_ranges(
    a: &TextBuffer,
    range_a: Range<usize>,
    b: &TextBuffer,
    range_b: Range<usize>,
    options: &DiffOptions,
    cancel: &CancelFlag,
) -> DiffList {
    let n = range_a.len();
    let m = range_b.len();
    if n == 0 || m == 0 {
        // Covers the null-vs-null case with a single all-zero run.
        return vec![DiffRun::new(0, n, m)];
    }

    let classes = classify(a, range_a, b, range_b, options);

    // Strip common leading and trailing lines.
    let mut prefix = 0;
    while prefix < n && prefix < m && classes.a[prefix] == classes.b[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < n - prefix
        && suffix < m - prefix
        && classes.a[n - 1 - suffix] == classes.b[m - 1 - suffix]
    {
        suffix += 1;
    }

    let mut changed_a = vec![false; n];
    let mut changed_b = vec![false; m];
    myers::compute_changes(
        &classes.a[prefix..n - suffix],
        &classes.b[prefix..m - suffix],
        &classes.trivial,
        options.ignore_trivial_matches,
        options.minimal,
        cancel,
        &mut changed_a[prefix..n - suffix],
        &mut changed_b[prefix..m - suffix],
    );

    let list = build_diff_list(&changed_a, &changed_b);
    tracing::trace!(
        lines_a = n,
        lines_b = m,
        runs = list.len(),
        "pairwise diff computed"
    );
    check_diff_list(&list, n, m);
    list
}

/// Converts the per-line changed bitmaps into an edit script.
fn build_diff_list(changed_a: &[bool], changed_b: &[bool]) -> DiffList {
    let n = changed_a.len();
    let m = changed_b.len();
    let mut list = DiffList::new();
    let mut i = 0;
    let mut j = 0;
    while i < n || j < m {
        let mut num_equal = 0;
        while i < n && j < m && !changed_a[i] && !changed_b[j] {
            i += 1;
            j += 1;
            num_equal += 1;
        }
        let mut removed_a = 0;
        while i < n && changed_a[i] {
            i += 1;
            removed_a += 1;
        }
        let mut inserted_b = 0;
        while j < m && changed_b[j] {
            j += 1;
            inserted_b += 1;
        }
        if num_equal == 0 && removed_a == 0 && inserted_b == 0 {
            // Unchanged lines pair up one to one, so both sides must be
            // exhausted here.
            debug_assert!(i == n && j == m);
            break;
        }
        list.push(DiffRun::new(num_equal, removed_a, inserted_b));
    }
    list
}
