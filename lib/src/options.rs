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

//! Option types threaded through the engine. Nothing here is process-wide
//! state; every call site receives the options it needs.

/// How two lines are compared and how hard the pairwise differ tries.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiffOptions {
    /// Ignore white space when comparing lines: any run of white space
    /// compares like a single space and leading/trailing white space is
    /// dropped.
    pub ignore_whitespace: bool,
    /// Compare lines after case folding.
    pub ignore_case: bool,
    /// Compare lines with every decimal digit treated as the same character.
    pub ignore_numbers: bool,
    /// Blank out C/C++-style comments before comparing lines. Lines that
    /// consist of nothing but comments and white space additionally compare
    /// as "skippable".
    pub ignore_comments: bool,
    /// During the confusing-line discard phase, refuse to count a match
    /// unless the matched content has more than two non-white characters.
    pub ignore_trivial_matches: bool,
    /// Always compute a minimal edit script, never taking the heuristic
    /// shortcuts. Much slower on large inputs with many changes.
    pub minimal: bool,
    /// Run the B-C refinement pass (and the trim pass that follows it) when
    /// aligning three inputs.
    pub align_bc: bool,
    /// Search window of the sub-line differ, in characters.
    pub fine_search_window: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_whitespace: false,
            ignore_case: false,
            ignore_numbers: false,
            ignore_comments: false,
            ignore_trivial_matches: false,
            minimal: false,
            align_bc: true,
            fine_search_window: 500,
        }
    }
}

impl DiffOptions {
    /// Whether a separate matching buffer has to be prepared at ingest.
    pub(crate) fn needs_matching_text(&self) -> bool {
        self.ignore_case || self.ignore_numbers || self.ignore_comments
    }
}

/// How the resolver picks defaults.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MergePolicy {
    /// Resolve conflicts in which every participating line is white space or
    /// a pure comment by taking the B side. When disabled such rows stay
    /// unsolved but are still flagged as white-space-only.
    pub auto_resolve_whitespace: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            auto_resolve_whitespace: true,
        }
    }
}

/// Line-ending convention of the emitted merge output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EolPolicy {
    /// Keep the line ending of the source the line was taken from.
    #[default]
    Preserve,
    /// Terminate every line with LF.
    Lf,
    /// Terminate every line with CRLF.
    CrLf,
}

/// Delimiters written around an unresolved conflict region.
///
/// The default set is `<<<<<<< A`, `||||||| B`, `======= C` and a bare
/// `>>>>>>>`, one marker character per delimiter so the three sections stay
/// visually distinct.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConflictMarkers {
    /// Number of marker characters per delimiter line.
    pub marker_len: usize,
    /// Label written after the `<` delimiter, in front of the A section.
    pub label_a: String,
    /// Label written after the `|` delimiter, in front of the B section.
    pub label_b: String,
    /// Label written after the `=` delimiter, in front of the C section.
    pub label_c: String,
}

impl Default for ConflictMarkers {
    fn default() -> Self {
        Self {
            marker_len: 7,
            label_a: "A".to_owned(),
            label_b: "B".to_owned(),
            label_c: "C".to_owned(),
        }
    }
}

/// Options for the merge emitter.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EmitOptions {
    pub eol: EolPolicy,
    pub markers: ConflictMarkers,
}
