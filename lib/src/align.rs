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

//! The three-way aligner: fuses the pairwise edit scripts A↔B, A↔C and
//! B↔C into one table of corresponding lines.
//!
//! Construction seeds the table from the A↔B script, weaves C in along the
//! A↔C script, then refines B↔C correspondences that A knows nothing
//! about. Two trim passes compact the table afterwards, lifting lines into
//! earlier rows left vacant by the construction. Manual alignment anchors
//! act as barriers: no line ever migrates across one.

use thiserror::Error;

use crate::CancelFlag;
use crate::diff::DiffList;
use crate::diff::RunCursor;
use crate::diff::diff_line_ranges;
use crate::diff::lines_equal;
use crate::fine;
use crate::fine::FinePass;
use crate::options::DiffOptions;
use crate::source_text::SourceText;
use crate::source_text::TextBuffer;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignError {
    #[error("manual alignment ranges invalid: {reason}")]
    BadAnchors { reason: String },
    #[error("three-way table is inconsistent with the input line counts")]
    Inconsistent3Way,
}

/// One of the up to three inputs of a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    A,
    B,
    C,
}

impl Column {
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];
}

/// An inclusive range of zero-based line numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRange {
    pub first: usize,
    pub last: usize,
}

/// A caller-supplied alignment barrier: the given line ranges must stay
/// co-aligned, and no alignment transformation may move a line across the
/// start or end of the anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManualAnchor {
    pub range_a: Option<LineRange>,
    pub range_b: Option<LineRange>,
    pub range_c: Option<LineRange>,
}

impl ManualAnchor {
    pub fn range(&self, column: Column) -> Option<LineRange> {
        match column {
            Column::A => self.range_a,
            Column::B => self.range_b,
            Column::C => self.range_c,
        }
    }

    pub fn first_line(&self, column: Column) -> Option<usize> {
        self.range(column).map(|r| r.first)
    }

    pub fn last_line(&self, column: Column) -> Option<usize> {
        self.range(column).map(|r| r.last)
    }
}

/// One row of the alignment table: the line of each input it represents
/// (if any), the pairwise equality of those lines under the active
/// equality relation, their white-line classification, and the sub-line
/// edit scripts once the fine differ has run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff3Line {
    pub line_a: Option<usize>,
    pub line_b: Option<usize>,
    pub line_c: Option<usize>,
    pub a_eq_b: bool,
    pub a_eq_c: bool,
    pub b_eq_c: bool,
    pub white_a: bool,
    pub white_b: bool,
    pub white_c: bool,
    pub fine_ab: Option<DiffList>,
    pub fine_bc: Option<DiffList>,
    pub fine_ca: Option<DiffList>,
}

impl Diff3Line {
    pub fn line(&self, column: Column) -> Option<usize> {
        match column {
            Column::A => self.line_a,
            Column::B => self.line_b,
            Column::C => self.line_c,
        }
    }

    fn is_empty(&self) -> bool {
        self.line_a.is_none() && self.line_b.is_none() && self.line_c.is_none()
    }
}

/// Per-pair row counts of an [`Alignment`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlignStats {
    pub rows: usize,
    pub equal_ab: usize,
    pub equal_ac: usize,
    pub equal_bc: usize,
}

/// The aligned table plus its completion status.
#[derive(Clone, Debug)]
pub struct Alignment {
    pub rows: Vec<Diff3Line>,
    /// Three inputs were aligned; `line_c` is meaningful.
    pub three_way: bool,
    /// A cooperative cancel was observed; the table is structurally valid
    /// but refinement, trimming or fine diffs may be missing.
    pub incomplete: bool,
    /// The compared texts are byte-identical over the whole table, per
    /// pair. Only `texts_equal_ab` is meaningful for a two-way alignment.
    pub texts_equal_ab: bool,
    pub texts_equal_bc: bool,
    pub texts_equal_ca: bool,
}

impl Alignment {
    pub fn stats(&self) -> AlignStats {
        let mut stats = AlignStats {
            rows: self.rows.len(),
            ..Default::default()
        };
        for row in &self.rows {
            stats.equal_ab += row.a_eq_b as usize;
            stats.equal_ac += row.a_eq_c as usize;
            stats.equal_bc += row.b_eq_c as usize;
        }
        stats
    }
}

/// Aligns three inputs.
pub fn align3(
    a: &SourceText,
    b: &SourceText,
    c: &SourceText,
    options: &DiffOptions,
    anchors: &[ManualAnchor],
    cancel: &CancelFlag,
) -> Result<Alignment, AlignError> {
    validate_anchors(anchors)?;

    let ab = diff_anchored(a, b, Column::A, Column::B, anchors, options, cancel);
    let bc = diff_anchored(b, c, Column::B, Column::C, anchors, options, cancel);
    let ac = diff_anchored(a, c, Column::A, Column::C, anchors, options, cancel);

    let mut rows = pass_ab(&ab);
    rows = pass_ac(rows, &ac);
    tracing::debug!(rows = rows.len(), "three-way table constructed");

    let matcher = LineMatcher {
        a: a.for_diff(),
        b: b.for_diff(),
        c: Some(c.for_diff()),
        options,
    };
    correct_manual_alignment(&mut rows, anchors);
    trim(&mut rows, &matcher, anchors);

    if options.align_bc && !cancel.is_cancelled() {
        pass_bc(&mut rows, &bc);
        correct_manual_alignment(&mut rows, anchors);
        trim(&mut rows, &matcher, anchors);
    }

    let mut texts_equal_ab = false;
    let mut texts_equal_bc = false;
    let mut texts_equal_ca = false;
    if !cancel.is_cancelled() {
        texts_equal_ab =
            fine::fine_diff_pass(&mut rows, FinePass::Ab, a.for_display(), b.for_display(), options);
        texts_equal_bc =
            fine::fine_diff_pass(&mut rows, FinePass::Bc, b.for_display(), c.for_display(), options);
        texts_equal_ca =
            fine::fine_diff_pass(&mut rows, FinePass::Ca, c.for_display(), a.for_display(), options);
    }

    compute_white_flags(&mut rows, a.for_diff(), b.for_diff(), Some(c.for_diff()));

    #[cfg(debug_assertions)]
    check_consistency(&rows, a.line_count(), b.line_count(), Some(c.line_count()))?;

    Ok(Alignment {
        rows,
        three_way: true,
        incomplete: cancel.is_cancelled(),
        texts_equal_ab,
        texts_equal_bc,
        texts_equal_ca,
    })
}

/// Aligns two inputs into the same table shape, with `line_c` absent on
/// every row.
pub fn align2(
    a: &SourceText,
    b: &SourceText,
    options: &DiffOptions,
    anchors: &[ManualAnchor],
    cancel: &CancelFlag,
) -> Result<Alignment, AlignError> {
    validate_anchors(anchors)?;

    let ab = diff_anchored(a, b, Column::A, Column::B, anchors, options, cancel);
    let mut rows = pass_ab(&ab);

    let texts_equal_ab = if cancel.is_cancelled() {
        false
    } else {
        fine::fine_diff_pass(&mut rows, FinePass::Ab, a.for_display(), b.for_display(), options)
    };

    compute_white_flags(&mut rows, a.for_diff(), b.for_diff(), None);

    #[cfg(debug_assertions)]
    check_consistency(&rows, a.line_count(), b.line_count(), None)?;

    Ok(Alignment {
        rows,
        three_way: false,
        incomplete: cancel.is_cancelled(),
        texts_equal_ab,
        texts_equal_bc: false,
        texts_equal_ca: false,
    })
}

/// Anchors must be ordered and must not overlap within any column.
fn validate_anchors(anchors: &[ManualAnchor]) -> Result<(), AlignError> {
    let bad = |reason: String| Err(AlignError::BadAnchors { reason });
    for column in Column::ALL {
        let mut previous_end: Option<usize> = None;
        for anchor in anchors {
            let Some(range) = anchor.range(column) else {
                continue;
            };
            if range.first > range.last {
                return bad(format!(
                    "range {}..={} is reversed",
                    range.first, range.last
                ));
            }
            if let Some(previous_end) = previous_end
                && range.first <= previous_end
            {
                return bad(format!(
                    "ranges overlap or are out of order at line {}",
                    range.first
                ));
            }
            previous_end = Some(range.last);
        }
    }
    if anchors.iter().any(|anchor| {
        Column::ALL.iter().all(|&c| anchor.range(c).is_none())
    }) {
        return bad("anchor names no column".to_owned());
    }
    Ok(())
}

/// Diffs two inputs segment by segment, treating each anchored range and
/// the gaps between anchors as independent problems.
fn diff_anchored(
    a: &SourceText,
    b: &SourceText,
    col1: Column,
    col2: Column,
    anchors: &[ManualAnchor],
    options: &DiffOptions,
    cancel: &CancelFlag,
) -> DiffList {
    let buf1 = a.for_diff();
    let buf2 = b.for_diff();
    let mut list = DiffList::new();
    let mut begin1 = 0;
    let mut begin2 = 0;
    for anchor in anchors {
        let (Some(range1), Some(range2)) = (anchor.range(col1), anchor.range(col2)) else {
            continue;
        };
        // The stretch before the anchor, then the anchored stretch itself.
        list.extend(diff_line_ranges(
            buf1,
            begin1..range1.first,
            buf2,
            begin2..range2.first,
            options,
            cancel,
        ));
        list.extend(diff_line_ranges(
            buf1,
            range1.first..range1.last + 1,
            buf2,
            range2.first..range2.last + 1,
            options,
            cancel,
        ));
        begin1 = range1.last + 1;
        begin2 = range2.last + 1;
    }
    list.extend(diff_line_ranges(
        buf1,
        begin1..buf1.line_count(),
        buf2,
        begin2..buf2.line_count(),
        options,
        cancel,
    ));
    list
}

/// Pass 1: seed the table from the A↔B script. Equal lines and
/// delete-insert pairs share a row; asymmetric residue gets a row of its
/// own.
fn pass_ab(ab: &DiffList) -> Vec<Diff3Line> {
    let mut rows = Vec::new();
    let mut cursor = RunCursor::new(ab);
    let mut line_a = 0;
    let mut line_b = 0;
    while cursor.refill() {
        let d = &mut cursor.current;
        let mut row = Diff3Line::default();
        if d.num_equal > 0 {
            row.a_eq_b = true;
            row.line_a = Some(line_a);
            row.line_b = Some(line_b);
            d.num_equal -= 1;
            line_a += 1;
            line_b += 1;
        } else if d.removed_a > 0 && d.inserted_b > 0 {
            row.line_a = Some(line_a);
            row.line_b = Some(line_b);
            d.removed_a -= 1;
            d.inserted_b -= 1;
            line_a += 1;
            line_b += 1;
        } else if d.removed_a > 0 {
            row.line_a = Some(line_a);
            d.removed_a -= 1;
            line_a += 1;
        } else {
            row.line_b = Some(line_b);
            d.inserted_b -= 1;
            line_b += 1;
        }
        rows.push(row);
    }
    rows
}

/// Pass 2: weave C into the table along the A↔C script. Lines of C that
/// match a line of A join its row; other lines of C get fresh rows at the
/// current position.
fn pass_ac(rows: Vec<Diff3Line>, ac: &DiffList) -> Vec<Diff3Line> {
    let mut out = Vec::with_capacity(rows.len());
    let mut input = rows.into_iter();
    let mut cursor = RunCursor::new(ac);
    let mut line_a = 0;
    let mut line_c = 0;
    while cursor.refill() {
        let d = &mut cursor.current;
        if d.num_equal > 0 {
            // Copy rows through the one carrying line_a.
            loop {
                let mut row = input
                    .next()
                    .expect("the row carrying the matched A line must exist");
                if row.line_a == Some(line_a) {
                    row.line_c = Some(line_c);
                    row.a_eq_c = true;
                    row.b_eq_c = row.a_eq_b;
                    out.push(row);
                    break;
                }
                out.push(row);
            }
            d.num_equal -= 1;
            line_a += 1;
            line_c += 1;
        } else if d.removed_a > 0 && d.inserted_b > 0 {
            out.push(Diff3Line {
                line_c: Some(line_c),
                ..Default::default()
            });
            d.removed_a -= 1;
            d.inserted_b -= 1;
            line_a += 1;
            line_c += 1;
        } else if d.removed_a > 0 {
            d.removed_a -= 1;
            line_a += 1;
        } else {
            out.push(Diff3Line {
                line_c: Some(line_c),
                ..Default::default()
            });
            d.inserted_b -= 1;
            line_c += 1;
        }
    }
    out.extend(input);
    out
}

/// Accept a B↔C migration that has to displace `k` lines only when
/// `k <= d*d + 4`, `d` being the remaining length of the equal run.
fn disturbance_tolerance(run_equal: usize) -> usize {
    run_equal * run_equal + 4
}

/// Pass 3: refine with the B↔C script. A line of C equal to a line of A
/// already shares its row; equality to a line of B only is established
/// here by migrating one of the two lines into the other's row, if the
/// path between them can be cleared.
fn pass_bc(rows: &mut Vec<Diff3Line>, bc: &DiffList) {
    let mut cursor = RunCursor::new(bc);
    let mut i3b = 0;
    let mut i3c = 0;
    let mut line_b = 0;
    let mut line_c = 0;
    while cursor.refill() {
        let d = &mut cursor.current;
        if d.num_equal > 0 {
            while rows[i3b].line_b != Some(line_b) {
                i3b += 1;
            }
            while rows[i3c].line_c != Some(line_c) {
                i3c += 1;
            }
            if i3b == i3c {
                debug_assert_eq!(rows[i3b].line_c, Some(line_c));
                rows[i3b].b_eq_c = true;
            } else if i3c < i3b && !rows[i3b].a_eq_b {
                // Pull the disturbing B lines between the two rows out of
                // the way, then move line_b up into the row of line_c.
                let disturbing = (i3c..i3b)
                    .filter(|&i| rows[i].line_b.is_some())
                    .count();
                if disturbing <= disturbance_tolerance(d.num_equal) {
                    if disturbing > 0 {
                        let mut pulled = Vec::with_capacity(disturbing);
                        for i in i3c..i3b {
                            if rows[i].line_b.is_some() {
                                pulled.push(Diff3Line {
                                    line_b: rows[i].line_b.take(),
                                    ..Default::default()
                                });
                                rows[i].a_eq_b = false;
                                rows[i].b_eq_c = false;
                            }
                        }
                        let moved = pulled.len();
                        rows.splice(i3c..i3c, pulled);
                        i3c += moved;
                        i3b += moved;
                    }
                    let source = &mut rows[i3b];
                    source.line_b = None;
                    source.a_eq_b = false;
                    source.a_eq_c = false;
                    source.b_eq_c = false;
                    let target = &mut rows[i3c];
                    target.line_b = Some(line_b);
                    target.b_eq_c = true;
                }
            } else if i3b < i3c && !rows[i3c].a_eq_c {
                let disturbing = (i3b..i3c)
                    .filter(|&i| rows[i].line_c.is_some())
                    .count();
                if disturbing <= disturbance_tolerance(d.num_equal) {
                    if disturbing > 0 {
                        let mut pulled = Vec::with_capacity(disturbing);
                        for i in i3b..i3c {
                            if rows[i].line_c.is_some() {
                                pulled.push(Diff3Line {
                                    line_c: rows[i].line_c.take(),
                                    ..Default::default()
                                });
                                rows[i].a_eq_c = false;
                                rows[i].b_eq_c = false;
                            }
                        }
                        let moved = pulled.len();
                        rows.splice(i3b..i3b, pulled);
                        i3b += moved;
                        i3c += moved;
                    }
                    let source = &mut rows[i3c];
                    source.line_c = None;
                    source.a_eq_c = false;
                    source.b_eq_c = false;
                    let target = &mut rows[i3b];
                    target.line_c = Some(line_c);
                    target.b_eq_c = true;
                }
            }
            d.num_equal -= 1;
            line_b += 1;
            line_c += 1;
            i3b += 1;
            i3c += 1;
        } else if d.removed_a > 0 {
            // A B line with no C partner: move it up as far as possible.
            let mut i3 = i3b;
            while rows[i3].line_b != Some(line_b) {
                i3 += 1;
            }
            if i3 != i3b && !rows[i3].a_eq_b {
                rows.insert(
                    i3b,
                    Diff3Line {
                        line_b: Some(line_b),
                        ..Default::default()
                    },
                );
                rows[i3 + 1].line_b = None;
            } else {
                i3b = i3;
            }
            d.removed_a -= 1;
            line_b += 1;
            i3b += 1;
            if d.inserted_b > 0 {
                d.inserted_b -= 1;
                line_c += 1;
            }
        } else {
            d.inserted_b -= 1;
            line_c += 1;
        }
    }
}

/// Tests whether aligning `line1` of `col1` with `line2` of `col2` would
/// cross an anchor barrier. Returns true when the move is allowed.
fn is_valid_move(
    anchors: &[ManualAnchor],
    line1: Option<usize>,
    line2: Option<usize>,
    col1: Column,
    col2: Column,
) -> bool {
    let (Some(line1), Some(line2)) = (line1, line2) else {
        return true;
    };
    for anchor in anchors {
        let (Some(start1), Some(start2)) = (anchor.first_line(col1), anchor.first_line(col2))
        else {
            continue;
        };
        if (line1 >= start1) != (line2 >= start2) {
            return false;
        }
        let end1 = anchor.last_line(col1).unwrap() + 1;
        let end2 = anchor.last_line(col2).unwrap() + 1;
        if (line1 >= end1) != (line2 >= end2) {
            return false;
        }
    }
    true
}

/// Compares lines of the matching buffers under the active equality.
struct LineMatcher<'a> {
    a: &'a TextBuffer,
    b: &'a TextBuffer,
    c: Option<&'a TextBuffer>,
    options: &'a DiffOptions,
}

impl LineMatcher<'_> {
    fn buffer(&self, column: Column) -> &TextBuffer {
        match column {
            Column::A => self.a,
            Column::B => self.b,
            Column::C => self.c.expect("column C requires a third input"),
        }
    }

    fn equal(&self, col1: Column, line1: usize, col2: Column, line2: usize) -> bool {
        lines_equal(
            self.buffer(col1).line_str(line1),
            self.buffer(col2).line_str(line2),
            self.options,
            false,
        )
    }
}

/// The trim passes: lift lines into earlier rows left vacant for their
/// column, preferring moves that complete fully-equal rows, and compact
/// empty rows away.
///
/// `i3a`, `i3b`, `i3c` are catch-up cursors pointing at the earliest row
/// that still lacks a line of the respective column; because no rows are
/// inserted or removed during the walk, a cursor's index also tells how
/// far its column has advanced.
fn trim(rows: &mut Vec<Diff3Line>, matcher: &LineMatcher, anchors: &[ManualAnchor]) {
    rows.retain(|row| !row.is_empty());

    let mut i3a = 0;
    let mut i3b = 0;
    let mut i3c = 0;
    let mut next_anchor = 0;

    for i3 in 0..rows.len() {
        if let Some(anchor) = anchors.get(next_anchor) {
            let row = &rows[i3];
            let at_anchor = Column::ALL.iter().any(|&col| {
                row.line(col).is_some() && row.line(col) == anchor.first_line(col)
            });
            if at_anchor {
                // The columns must re-converge here; nothing migrates past.
                i3a = i3;
                i3b = i3;
                i3c = i3;
                next_anchor += 1;
            }
        }

        // Triple lift A: the vacant row already holds matching B and C.
        if i3 > i3a
            && rows[i3].line_a.is_some()
            && rows[i3a].line_b.is_some()
            && rows[i3a].b_eq_c
            && matcher.equal(
                Column::A,
                rows[i3].line_a.unwrap(),
                Column::B,
                rows[i3a].line_b.unwrap(),
            )
            && is_valid_move(anchors, rows[i3].line_a, rows[i3a].line_b, Column::A, Column::B)
            && is_valid_move(anchors, rows[i3].line_a, rows[i3a].line_c, Column::A, Column::C)
        {
            let moved = rows[i3].line_a.take();
            rows[i3a].line_a = moved;
            rows[i3a].a_eq_b = true;
            rows[i3a].a_eq_c = true;
            rows[i3].a_eq_b = false;
            rows[i3].a_eq_c = false;
            i3a += 1;
        }

        // Triple lift B.
        if i3 > i3b
            && rows[i3].line_b.is_some()
            && rows[i3b].line_a.is_some()
            && rows[i3b].a_eq_c
            && matcher.equal(
                Column::B,
                rows[i3].line_b.unwrap(),
                Column::A,
                rows[i3b].line_a.unwrap(),
            )
            && is_valid_move(anchors, rows[i3].line_b, rows[i3b].line_a, Column::B, Column::A)
            && is_valid_move(anchors, rows[i3].line_b, rows[i3b].line_c, Column::B, Column::C)
        {
            let moved = rows[i3].line_b.take();
            rows[i3b].line_b = moved;
            rows[i3b].a_eq_b = true;
            rows[i3b].b_eq_c = true;
            rows[i3].a_eq_b = false;
            rows[i3].b_eq_c = false;
            i3b += 1;
        }

        // Triple lift C.
        if i3 > i3c
            && rows[i3].line_c.is_some()
            && rows[i3c].line_a.is_some()
            && rows[i3c].a_eq_b
            && matcher.equal(
                Column::C,
                rows[i3].line_c.unwrap(),
                Column::A,
                rows[i3c].line_a.unwrap(),
            )
            && is_valid_move(anchors, rows[i3].line_c, rows[i3c].line_a, Column::C, Column::A)
            && is_valid_move(anchors, rows[i3].line_c, rows[i3c].line_b, Column::C, Column::B)
        {
            let moved = rows[i3].line_c.take();
            rows[i3c].line_c = moved;
            rows[i3c].a_eq_c = true;
            rows[i3c].b_eq_c = true;
            rows[i3].a_eq_c = false;
            rows[i3].b_eq_c = false;
            i3c += 1;
        }

        // Single lift A: matches neither other column, move it alone.
        if i3 > i3a
            && rows[i3].line_a.is_some()
            && !rows[i3].a_eq_b
            && !rows[i3].a_eq_c
            && is_valid_move(anchors, rows[i3].line_a, rows[i3a].line_b, Column::A, Column::B)
            && is_valid_move(anchors, rows[i3].line_a, rows[i3a].line_c, Column::A, Column::C)
        {
            let moved = rows[i3].line_a.take();
            rows[i3a].line_a = moved;
            i3a += 1;
        }

        // Single lift B.
        if i3 > i3b
            && rows[i3].line_b.is_some()
            && !rows[i3].a_eq_b
            && !rows[i3].b_eq_c
            && is_valid_move(anchors, rows[i3].line_b, rows[i3b].line_a, Column::B, Column::A)
            && is_valid_move(anchors, rows[i3].line_b, rows[i3b].line_c, Column::B, Column::C)
        {
            let moved = rows[i3].line_b.take();
            rows[i3b].line_b = moved;
            i3b += 1;
        }

        // Single lift C.
        if i3 > i3c
            && rows[i3].line_c.is_some()
            && !rows[i3].a_eq_c
            && !rows[i3].b_eq_c
            && is_valid_move(anchors, rows[i3].line_c, rows[i3c].line_a, Column::C, Column::A)
            && is_valid_move(anchors, rows[i3].line_c, rows[i3c].line_b, Column::C, Column::B)
        {
            let moved = rows[i3].line_c.take();
            rows[i3c].line_c = moved;
            i3c += 1;
        }

        // Double lifts: a matching pair moves into the further-advanced of
        // the two catch-up rows.
        if i3 > i3a && i3 > i3b && rows[i3].line_a.is_some() && rows[i3].a_eq_b && !rows[i3].a_eq_c
        {
            let target = i3a.max(i3b);
            if is_valid_move(anchors, rows[target].line_c, rows[i3].line_a, Column::C, Column::A)
                && is_valid_move(
                    anchors,
                    rows[target].line_c,
                    rows[i3].line_b,
                    Column::C,
                    Column::B,
                )
            {
                let moved = rows[i3].line_a.take();
                rows[target].line_a = moved;
                let moved = rows[i3].line_b.take();
                rows[target].line_b = moved;
                rows[target].a_eq_b = true;
                rows[i3].a_eq_b = false;
                i3a = target + 1;
                i3b = target + 1;
            }
        } else if i3 > i3a
            && i3 > i3c
            && rows[i3].line_a.is_some()
            && rows[i3].a_eq_c
            && !rows[i3].a_eq_b
        {
            let target = i3a.max(i3c);
            if is_valid_move(anchors, rows[target].line_b, rows[i3].line_a, Column::B, Column::A)
                && is_valid_move(
                    anchors,
                    rows[target].line_b,
                    rows[i3].line_c,
                    Column::B,
                    Column::C,
                )
            {
                let moved = rows[i3].line_a.take();
                rows[target].line_a = moved;
                let moved = rows[i3].line_c.take();
                rows[target].line_c = moved;
                rows[target].a_eq_c = true;
                rows[i3].a_eq_c = false;
                i3a = target + 1;
                i3c = target + 1;
            }
        } else if i3 > i3b
            && i3 > i3c
            && rows[i3].line_b.is_some()
            && rows[i3].b_eq_c
            && !rows[i3].a_eq_c
        {
            let target = i3b.max(i3c);
            if is_valid_move(anchors, rows[target].line_a, rows[i3].line_b, Column::A, Column::B)
                && is_valid_move(
                    anchors,
                    rows[target].line_a,
                    rows[i3].line_c,
                    Column::A,
                    Column::C,
                )
            {
                let moved = rows[i3].line_b.take();
                rows[target].line_b = moved;
                let moved = rows[i3].line_c.take();
                rows[target].line_c = moved;
                rows[target].b_eq_c = true;
                rows[i3].b_eq_c = false;
                i3b = target + 1;
                i3c = target + 1;
            }
        }

        if rows[i3].line_a.is_some() {
            i3a = i3 + 1;
        }
        if rows[i3].line_b.is_some() {
            i3b = i3 + 1;
        }
        if rows[i3].line_c.is_some() {
            i3c = i3 + 1;
        }
    }

    rows.retain(|row| !row.is_empty());
}

/// Re-aligns the table at each anchor: at the first row touched by an
/// anchor, lines of the other anchored columns are pushed up into fresh
/// rows until all anchored columns converge on one row.
fn correct_manual_alignment(rows: &mut Vec<Diff3Line>, anchors: &[ManualAnchor]) {
    for anchor in anchors {
        let present: Vec<Column> = Column::ALL
            .into_iter()
            .filter(|&col| anchor.first_line(col).is_some())
            .collect();
        let missing = if present.len() == 2 {
            Column::ALL
                .into_iter()
                .find(|&col| anchor.first_line(col).is_none())
        } else if present.len() <= 1 {
            return;
        } else {
            None
        };

        // The first row aligned for any column.
        let mut found = None;
        'search: for (i3, row) in rows.iter().enumerate() {
            for col in Column::ALL {
                if row.line(col).is_some() && anchor.first_line(col) == row.line(col) {
                    found = Some((i3, col));
                    break 'search;
                }
            }
        }
        let Some((mut i_dest, wi)) = found else {
            continue;
        };

        let mut i3 = i_dest;
        while i3 < rows.len() {
            let wi2 = Column::ALL.into_iter().find(|&col| {
                col != wi
                    && rows[i3].line(col).is_some()
                    && anchor.first_line(col) == rows[i3].line(col)
            });
            let Some(wi2) = wi2 else {
                // The second anchored column has not caught up yet; push
                // the two non-`wi` columns of this row up out of the way.
                let mut lifted = Diff3Line::default();
                let row = &mut rows[i3];
                match wi {
                    Column::A => {
                        lifted.b_eq_c = row.b_eq_c;
                        lifted.line_b = row.line_b.take();
                        lifted.line_c = row.line_c.take();
                    }
                    Column::B => {
                        lifted.a_eq_c = row.a_eq_c;
                        lifted.line_a = row.line_a.take();
                        lifted.line_c = row.line_c.take();
                    }
                    Column::C => {
                        lifted.a_eq_b = row.a_eq_b;
                        lifted.line_a = row.line_a.take();
                        lifted.line_b = row.line_b.take();
                    }
                }
                row.a_eq_b = false;
                row.a_eq_c = false;
                row.b_eq_c = false;
                rows.insert(i_dest, lifted);
                i_dest += 1;
                i3 += 2;
                continue;
            };

            if i3 != i_dest {
                // Align the found line with the row already anchored.
                match wi2 {
                    Column::A => {
                        let moved = rows[i3].line_a.take();
                        rows[i_dest].line_a = moved;
                        rows[i3].a_eq_b = false;
                        rows[i3].a_eq_c = false;
                    }
                    Column::B => {
                        let moved = rows[i3].line_b.take();
                        rows[i_dest].line_b = moved;
                        rows[i3].a_eq_b = false;
                        rows[i3].b_eq_c = false;
                    }
                    Column::C => {
                        let moved = rows[i3].line_c.take();
                        rows[i_dest].line_c = moved;
                        rows[i3].b_eq_c = false;
                        rows[i3].a_eq_c = false;
                    }
                }
            }

            if let Some(wi3) = missing {
                // Push lines of the unanchored column up until an equality
                // with an anchored column stops the walk.
                let mut k = i3;
                while k < rows.len() {
                    if rows[k].line(wi3).is_some() {
                        let mut lifted = Diff3Line::default();
                        match wi3 {
                            Column::A => {
                                if rows[k].a_eq_b {
                                    break;
                                }
                                lifted.line_a = rows[k].line_a.take();
                                rows[k].a_eq_b = false;
                                rows[k].a_eq_c = false;
                            }
                            Column::B => {
                                if rows[k].a_eq_b {
                                    break;
                                }
                                lifted.line_b = rows[k].line_b.take();
                                rows[k].a_eq_b = false;
                                rows[k].b_eq_c = false;
                            }
                            Column::C => {
                                if rows[k].a_eq_c {
                                    break;
                                }
                                lifted.line_c = rows[k].line_c.take();
                                rows[k].a_eq_c = false;
                                rows[k].b_eq_c = false;
                            }
                        }
                        rows.insert(i_dest, lifted);
                        i_dest += 1;
                        k += 1;
                    }
                    k += 1;
                }
            }
            break;
        }
    }
}

/// A row column is "white" when its line is absent, white space only, or a
/// pure comment. The merge resolver uses the flags to detect conflicts
/// that only disagree about invisible content.
fn compute_white_flags(
    rows: &mut [Diff3Line],
    a: &TextBuffer,
    b: &TextBuffer,
    c: Option<&TextBuffer>,
) {
    let white = |buffer: Option<&TextBuffer>, line: Option<usize>| match (buffer, line) {
        (Some(buffer), Some(line)) => {
            buffer.line(line).is_white() || buffer.line(line).is_pure_comment()
        }
        _ => true,
    };
    for row in rows {
        row.white_a = white(Some(a), row.line_a);
        row.white_b = white(Some(b), row.line_b);
        row.white_c = white(c, row.line_c);
    }
}

/// Verifies that every column covers its input's lines exactly once, in
/// order. Checked in debug builds at the aligner boundary.
#[cfg(debug_assertions)]
fn check_consistency(
    rows: &[Diff3Line],
    len_a: usize,
    len_b: usize,
    len_c: Option<usize>,
) -> Result<(), AlignError> {
    let columns = [
        (Column::A, len_a),
        (Column::B, len_b),
        (Column::C, len_c.unwrap_or(0)),
    ];
    for (column, len) in columns {
        let mut expected = 0;
        for row in rows {
            if let Some(line) = row.line(column) {
                if line != expected {
                    return Err(AlignError::Inconsistent3Way);
                }
                expected += 1;
            }
        }
        if expected != len {
            return Err(AlignError::Inconsistent3Way);
        }
    }
    if rows.iter().any(|row| row.is_empty()) {
        return Err(AlignError::Inconsistent3Way);
    }
    Ok(())
}
