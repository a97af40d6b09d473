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

//! The merge resolver: classifies every aligned row and picks the default
//! source of the merged line. A is the base; B and C are the branches.

use crate::align::Alignment;
use crate::align::Diff3Line;
use crate::options::MergePolicy;

/// How a row relates its three lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictClass {
    /// All sides agree.
    NoChange,
    /// Only B differs from the base.
    BChanged,
    /// Only C differs from the base.
    CChanged,
    /// B and C made the same change.
    IdenticalBC,
    /// One branch deleted a line the other left unchanged.
    OneDeleted,
    /// The sides disagree and no side wins by default.
    Conflict,
    /// The line exists only in A.
    NewFromA,
    /// The line exists only in B.
    NewFromB,
    /// The line exists only in C.
    NewFromC,
}

/// The source a merged row is taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    A,
    B,
    C,
    /// Emit nothing for this row.
    None,
    /// No default applies; the row needs manual resolution.
    Unsolved,
}

/// One row of the merge plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeRow {
    pub line_a: Option<usize>,
    pub line_b: Option<usize>,
    pub line_c: Option<usize>,
    pub class: ConflictClass,
    pub default_choice: Choice,
    /// A caller-recorded resolution; replaces the default verbatim.
    pub override_choice: Option<Choice>,
    /// The conflict only involves white space or pure comments.
    pub whitespace_only: bool,
}

impl MergeRow {
    pub fn effective_choice(&self) -> Choice {
        self.override_choice.unwrap_or(self.default_choice)
    }

    pub fn is_unsolved(&self) -> bool {
        self.effective_choice() == Choice::Unsolved
    }
}

/// Classifies every row of the alignment and picks defaults.
///
/// The same alignment and policy always produce the same plan; overrides
/// are recorded afterwards with [`MergeRow::override_choice`].
pub fn resolve(alignment: &Alignment, policy: &MergePolicy) -> Vec<MergeRow> {
    alignment
        .rows
        .iter()
        .map(|row| {
            if alignment.three_way {
                resolve_three_way(row, policy)
            } else {
                resolve_two_way(row)
            }
        })
        .collect()
}

fn resolve_three_way(row: &Diff3Line, policy: &MergePolicy) -> MergeRow {
    let present = [row.line_a.is_some(), row.line_b.is_some(), row.line_c.is_some()];
    let (class, default_choice) = match present {
        [true, true, true] => match (row.a_eq_b, row.a_eq_c, row.b_eq_c) {
            (true, true, true) => (ConflictClass::NoChange, Choice::A),
            (true, _, _) => (ConflictClass::CChanged, Choice::C),
            (_, true, _) => (ConflictClass::BChanged, Choice::B),
            (_, _, true) => (ConflictClass::IdenticalBC, Choice::B),
            _ => (ConflictClass::Conflict, Choice::Unsolved),
        },
        // One column absent: equality of the remaining two decides between
        // an accepted deletion and a conflict. When the base is the absent
        // one, equal branches mean both added the same line.
        [false, true, true] => {
            if row.b_eq_c {
                (ConflictClass::IdenticalBC, Choice::B)
            } else {
                (ConflictClass::Conflict, Choice::Unsolved)
            }
        }
        [true, false, true] => {
            if row.a_eq_c {
                (ConflictClass::OneDeleted, Choice::None)
            } else {
                (ConflictClass::Conflict, Choice::Unsolved)
            }
        }
        [true, true, false] => {
            if row.a_eq_b {
                (ConflictClass::OneDeleted, Choice::None)
            } else {
                (ConflictClass::Conflict, Choice::Unsolved)
            }
        }
        [true, false, false] => (ConflictClass::NewFromA, Choice::A),
        [false, true, false] => (ConflictClass::NewFromB, Choice::B),
        [false, false, true] => (ConflictClass::NewFromC, Choice::C),
        [false, false, false] => unreachable!("empty rows are compacted away"),
    };

    let whitespace_only =
        class == ConflictClass::Conflict && row.white_a && row.white_b && row.white_c;
    let default_choice = if whitespace_only && policy.auto_resolve_whitespace {
        // Take the B side of an invisible conflict; absent B means the
        // invisible line was deleted there.
        if row.line_b.is_some() {
            Choice::B
        } else {
            Choice::None
        }
    } else {
        default_choice
    };

    MergeRow {
        line_a: row.line_a,
        line_b: row.line_b,
        line_c: row.line_c,
        class,
        default_choice,
        override_choice: None,
        whitespace_only,
    }
}

fn resolve_two_way(row: &Diff3Line) -> MergeRow {
    let (class, default_choice) = match (row.line_a.is_some(), row.line_b.is_some()) {
        (true, true) => {
            if row.a_eq_b {
                (ConflictClass::NoChange, Choice::A)
            } else {
                (ConflictClass::BChanged, Choice::B)
            }
        }
        (true, false) => (ConflictClass::OneDeleted, Choice::None),
        (false, true) => (ConflictClass::NewFromB, Choice::B),
        (false, false) => unreachable!("empty rows are compacted away"),
    };
    MergeRow {
        line_a: row.line_a,
        line_b: row.line_b,
        line_c: None,
        class,
        default_choice,
        override_choice: None,
        whitespace_only: false,
    }
}
