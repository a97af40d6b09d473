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

//! The merge emitter: writes the merged text from a resolved row plan,
//! bracketing any remaining unsolved regions with three-way conflict
//! markers.

use itertools::Itertools as _;

use crate::options::EmitOptions;
use crate::options::EolPolicy;
use crate::resolve::Choice;
use crate::resolve::MergeRow;
use crate::source_text::LineEnding;
use crate::source_text::SourceText;

/// The inputs whose text the emitter reads. `c` is absent in two-way mode.
pub struct MergeSources<'a> {
    pub a: &'a SourceText,
    pub b: &'a SourceText,
    pub c: Option<&'a SourceText>,
}

/// The merged text plus the number of conflict regions left in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutput {
    pub text: String,
    pub unresolved: usize,
}

impl MergeOutput {
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved == 0
    }
}

struct Emitter {
    out: String,
    unterminated: bool,
}

impl Emitter {
    /// Appends one line. A `None` ending is only honored at the very end
    /// of the output; if more lines follow, an LF keeps them apart.
    fn push_line(&mut self, content: &str, ending: Option<&str>) {
        if self.unterminated {
            self.out.push('\n');
            self.unterminated = false;
        }
        self.out.push_str(content);
        match ending {
            Some(ending) => self.out.push_str(ending),
            None => self.unterminated = true,
        }
    }
}

/// Walks the merge plan in row order and writes the chosen lines.
pub fn emit(rows: &[MergeRow], sources: &MergeSources, options: &EmitOptions) -> MergeOutput {
    let mut emitter = Emitter {
        out: String::new(),
        unterminated: false,
    };
    let mut unresolved = 0;
    for (is_unsolved, chunk) in &rows.iter().chunk_by(|row| row.is_unsolved()) {
        if is_unsolved {
            let region: Vec<&MergeRow> = chunk.collect();
            emit_conflict_region(&mut emitter, &region, sources, options);
            unresolved += 1;
        } else {
            for row in chunk {
                emit_row(&mut emitter, row, sources, options);
            }
        }
    }
    MergeOutput {
        text: emitter.out,
        unresolved,
    }
}

fn emit_row(emitter: &mut Emitter, row: &MergeRow, sources: &MergeSources, options: &EmitOptions) {
    let (source, line) = match row.effective_choice() {
        Choice::A => (sources.a, row.line_a),
        Choice::B => (sources.b, row.line_b),
        Choice::C => match sources.c {
            Some(c) => (c, row.line_c),
            None => return,
        },
        Choice::None => return,
        Choice::Unsolved => unreachable!("unsolved rows are emitted as conflict regions"),
    };
    let Some(line) = line else {
        return;
    };
    emit_source_line(emitter, source, line, options);
}

fn emit_source_line(emitter: &mut Emitter, source: &SourceText, line: usize, options: &EmitOptions) {
    let buffer = source.for_display();
    let ending = match options.eol {
        EolPolicy::Lf => Some("\n"),
        EolPolicy::CrLf => Some("\r\n"),
        EolPolicy::Preserve => buffer.line(line).ending().map(LineEnding::as_str),
    };
    emitter.push_line(buffer.line_str(line), ending);
}

/// Writes one unsolved region as an "A section, B section, C section"
/// conflict block.
fn emit_conflict_region(
    emitter: &mut Emitter,
    region: &[&MergeRow],
    sources: &MergeSources,
    options: &EmitOptions,
) {
    let marker_eol = match options.eol {
        EolPolicy::CrLf => "\r\n",
        EolPolicy::Lf | EolPolicy::Preserve => "\n",
    };
    let markers = &options.markers;
    let marker = |c: char, label: &str| -> String {
        let mut line: String = std::iter::repeat_n(c, markers.marker_len).collect();
        if !label.is_empty() {
            line.push(' ');
            line.push_str(label);
        }
        line
    };

    emitter.push_line(&marker('<', &markers.label_a), Some(marker_eol));
    for row in region {
        if let Some(line) = row.line_a {
            emit_source_line(emitter, sources.a, line, options);
        }
    }
    emitter.push_line(&marker('|', &markers.label_b), Some(marker_eol));
    for row in region {
        if let Some(line) = row.line_b {
            emit_source_line(emitter, sources.b, line, options);
        }
    }
    if let Some(c) = sources.c {
        emitter.push_line(&marker('=', &markers.label_c), Some(marker_eol));
        for row in region {
            if let Some(line) = row.line_c {
                emit_source_line(emitter, c, line, options);
            }
        }
    }
    emitter.push_line(&marker('>', ""), Some(marker_eol));
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::options::DiffOptions;
    use crate::resolve::ConflictClass;

    fn source(text: &str) -> SourceText {
        SourceText::parse(text, &DiffOptions::default()).unwrap()
    }

    fn merge_row(
        lines: (Option<usize>, Option<usize>, Option<usize>),
        choice: Choice,
    ) -> MergeRow {
        MergeRow {
            line_a: lines.0,
            line_b: lines.1,
            line_c: lines.2,
            class: ConflictClass::NoChange,
            default_choice: choice,
            override_choice: None,
            whitespace_only: false,
        }
    }

    #[test]
    fn test_plain_choices() {
        let a = source("a0\na1\n");
        let b = source("b0\nb1\n");
        let c = source("c0\nc1\n");
        let rows = vec![
            merge_row((Some(0), Some(0), Some(0)), Choice::A),
            merge_row((Some(1), Some(1), Some(0)), Choice::B),
            merge_row((None, None, Some(1)), Choice::C),
            merge_row((Some(1), None, None), Choice::None),
        ];
        let sources = MergeSources {
            a: &a,
            b: &b,
            c: Some(&c),
        };
        let output = emit(&rows, &sources, &EmitOptions::default());
        assert_eq!(output.text, "a0\nb1\nc1\n");
        assert!(output.is_fully_resolved());
    }

    #[test]
    fn test_conflict_markers() {
        let a = source("y\n");
        let b = source("Y1\n");
        let c = source("Y2\n");
        let rows = vec![merge_row((Some(0), Some(0), Some(0)), Choice::Unsolved)];
        let sources = MergeSources {
            a: &a,
            b: &b,
            c: Some(&c),
        };
        let output = emit(&rows, &sources, &EmitOptions::default());
        assert_eq!(output.unresolved, 1);
        assert_eq!(
            output.text,
            indoc! {"
                <<<<<<< A
                y
                ||||||| B
                Y1
                ======= C
                Y2
                >>>>>>>
            "}
        );
    }

    #[test]
    fn test_adjacent_unsolved_rows_share_markers() {
        let a = source("a0\na1\n");
        let b = source("b0\nb1\n");
        let c = source("c0\n");
        let rows = vec![
            merge_row((Some(0), Some(0), Some(0)), Choice::Unsolved),
            merge_row((Some(1), Some(1), None), Choice::Unsolved),
        ];
        let sources = MergeSources {
            a: &a,
            b: &b,
            c: Some(&c),
        };
        let output = emit(&rows, &sources, &EmitOptions::default());
        assert_eq!(output.unresolved, 1);
        assert_eq!(
            output.text,
            indoc! {"
                <<<<<<< A
                a0
                a1
                ||||||| B
                b0
                b1
                ======= C
                c0
                >>>>>>>
            "}
        );
    }

    #[test]
    fn test_eol_policies() {
        let a = source("x\r\ny\r\n");
        let sources = MergeSources {
            a: &a,
            b: &a,
            c: None,
        };
        let rows = vec![
            merge_row((Some(0), Some(0), None), Choice::A),
            merge_row((Some(1), Some(1), None), Choice::A),
        ];

        let preserve = emit(&rows, &sources, &EmitOptions::default());
        assert_eq!(preserve.text, "x\r\ny\r\n");

        let lf = emit(
            &rows,
            &sources,
            &EmitOptions {
                eol: EolPolicy::Lf,
                ..Default::default()
            },
        );
        assert_eq!(lf.text, "x\ny\n");

        let crlf_source = source("x\ny\n");
        let sources = MergeSources {
            a: &crlf_source,
            b: &crlf_source,
            c: None,
        };
        let crlf = emit(
            &rows,
            &sources,
            &EmitOptions {
                eol: EolPolicy::CrLf,
                ..Default::default()
            },
        );
        assert_eq!(crlf.text, "x\r\ny\r\n");
    }

    #[test]
    fn test_unterminated_final_line_is_preserved() {
        let a = source("x\ny");
        let sources = MergeSources {
            a: &a,
            b: &a,
            c: None,
        };
        let rows = vec![
            merge_row((Some(0), Some(0), None), Choice::A),
            merge_row((Some(1), Some(1), None), Choice::A),
        ];
        let output = emit(&rows, &sources, &EmitOptions::default());
        assert_eq!(output.text, "x\ny");
    }

    #[test]
    fn test_unterminated_line_mid_output_gets_a_newline() {
        let a = source("x");
        let b = source("x\nmore\n");
        let rows = vec![
            merge_row((Some(0), Some(0), None), Choice::A),
            merge_row((None, Some(1), None), Choice::B),
        ];
        let sources = MergeSources {
            a: &a,
            b: &b,
            c: None,
        };
        let output = emit(&rows, &sources, &EmitOptions::default());
        assert_eq!(output.text, "x\nmore\n");
    }
}
