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

//! Text ingest: turns one decoded input into an immutable line table.
//!
//! Each input is kept in up to two variants. The display variant is the
//! pristine text (minus a leading BOM) and is what the fine differ and the
//! merge emitter read. The matching variant only exists when an equality
//! option rewrites text before comparison (case folding, digit masking,
//! comment blanking); the line differ and the aligner read it.

use thiserror::Error;

use crate::comment::CommentScanner;
use crate::comment::is_white;
use crate::options::DiffOptions;

/// Limits keep every line addressable through 32-bit offsets.
const MAX_BYTES: usize = u32::MAX as usize;
const MAX_LINES: usize = (u32::MAX / 2) as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("input has {lines} lines, which exceeds the line index width")]
    TooManyLines { lines: usize },
    #[error("input has {bytes} bytes, which exceeds the line index width")]
    TooManyBytes { bytes: usize },
}

/// Line terminator styles recognized by the ingest scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEnding {
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }
}

/// One line of a text buffer: a byte range into the shared text plus the
/// flags the aligner cares about. Never mutated after ingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line {
    start: u32,
    len: u32,
    first_nonwhite: u32,
    ending: Option<LineEnding>,
    pure_comment: bool,
    skippable: bool,
}

impl Line {
    /// The line consists of white space only.
    pub fn is_white(&self) -> bool {
        self.first_nonwhite >= self.len
    }

    /// All non-white characters of the line lie inside comments.
    pub fn is_pure_comment(&self) -> bool {
        self.pure_comment
    }

    /// White space or pure comment.
    pub fn is_skippable(&self) -> bool {
        self.skippable
    }

    /// Terminator of this line, absent on an unterminated final line.
    pub fn ending(&self) -> Option<LineEnding> {
        self.ending
    }

    fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

/// An immutable text with its line table.
#[derive(Clone, Debug)]
pub struct TextBuffer {
    text: String,
    lines: Vec<Line>,
}

impl TextBuffer {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> &Line {
        &self.lines[index]
    }

    /// Line content without its terminator.
    pub fn line_str(&self, index: usize) -> &str {
        &self.text[self.lines[index].range()]
    }

    fn scan(text: String) -> Result<Self, IngestError> {
        if text.len() > MAX_BYTES {
            return Err(IngestError::TooManyBytes { bytes: text.len() });
        }
        let bytes = text.as_bytes();
        let mut lines = Vec::new();
        let mut start = 0usize;
        let mut i = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    let (content_end, ending) = if i > start && bytes[i - 1] == b'\r' {
                        (i - 1, LineEnding::CrLf)
                    } else {
                        (i, LineEnding::Lf)
                    };
                    lines.push(make_line(bytes, start, content_end, Some(ending)));
                    start = i + 1;
                }
                b'\r' if i + 1 >= bytes.len() || bytes[i + 1] != b'\n' => {
                    lines.push(make_line(bytes, start, i, Some(LineEnding::Cr)));
                    start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        if start < bytes.len() {
            lines.push(make_line(bytes, start, bytes.len(), None));
        }
        if lines.len() > MAX_LINES {
            return Err(IngestError::TooManyLines { lines: lines.len() });
        }
        Ok(Self { text, lines })
    }
}

fn make_line(bytes: &[u8], start: usize, end: usize, ending: Option<LineEnding>) -> Line {
    let content = &bytes[start..end];
    let first_nonwhite = content
        .iter()
        .position(|&b| !is_white(b as char))
        .unwrap_or(content.len());
    Line {
        start: start as u32,
        len: (end - start) as u32,
        first_nonwhite: first_nonwhite as u32,
        ending,
        pure_comment: false,
        skippable: first_nonwhite == content.len(),
    }
}

/// Selects which variant of a [`SourceText`] to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextVariant {
    /// The pristine input text.
    Display,
    /// The text rewritten for comparison, falling back to the display
    /// variant when no equality option required a rewrite.
    Matching,
}

/// One ingested input, shared read-only by every downstream component.
#[derive(Clone, Debug)]
pub struct SourceText {
    display: TextBuffer,
    matching: Option<TextBuffer>,
    /// A UTF-8 BOM was stripped from the start of the input.
    pub had_bom: bool,
    /// Terminator of the first line, if any line is terminated.
    pub dominant_ending: Option<LineEnding>,
    /// Some terminated line uses a different terminator than the first.
    pub mixed_endings: bool,
}

impl SourceText {
    pub fn parse(text: &str, options: &DiffOptions) -> Result<Self, IngestError> {
        let (text, had_bom) = match text.strip_prefix('\u{feff}') {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        let mut display = TextBuffer::scan(text.to_owned())?;

        let dominant_ending = display.lines.iter().find_map(|line| line.ending);
        let mixed_endings = display
            .lines
            .iter()
            .filter_map(|line| line.ending)
            .any(|ending| Some(ending) != dominant_ending);

        let matching = if options.needs_matching_text() {
            Some(build_matching(&mut display, options))
        } else {
            None
        };

        Ok(Self {
            display,
            matching,
            had_bom,
            dominant_ending,
            mixed_endings,
        })
    }

    /// An empty placeholder for the missing third input of a two-way
    /// comparison.
    pub fn empty() -> Self {
        Self {
            display: TextBuffer {
                text: String::new(),
                lines: Vec::new(),
            },
            matching: None,
            had_bom: false,
            dominant_ending: None,
            mixed_endings: false,
        }
    }

    pub fn line_count(&self) -> usize {
        self.display.line_count()
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }

    pub fn buffer(&self, variant: TextVariant) -> &TextBuffer {
        match variant {
            TextVariant::Display => &self.display,
            TextVariant::Matching => self.matching.as_ref().unwrap_or(&self.display),
        }
    }

    /// The buffer the line differ and the aligner compare.
    pub fn for_diff(&self) -> &TextBuffer {
        self.buffer(TextVariant::Matching)
    }

    /// The pristine buffer the fine differ and the emitter read.
    pub fn for_display(&self) -> &TextBuffer {
        &self.display
    }
}

/// Builds the matching buffer line by line and copies the pure-comment flag
/// back onto the display lines, which is where the aligner's white-line
/// classification reads it.
fn build_matching(display: &mut TextBuffer, options: &DiffOptions) -> TextBuffer {
    let mut scanner = CommentScanner::new();
    let mut text = String::with_capacity(display.text.len());
    let mut lines = Vec::with_capacity(display.lines.len());
    for index in 0..display.lines.len() {
        let mut content = display.line_str(index).to_owned();
        if options.ignore_case {
            content = content.to_uppercase();
        }
        if options.ignore_numbers {
            content = content
                .chars()
                .map(|c| if c.is_ascii_digit() { '0' } else { c })
                .collect();
        }
        let mut pure_comment = false;
        let mut skippable;
        if options.ignore_comments {
            let (stripped, flags) = scanner.strip_line(&content);
            content = stripped;
            pure_comment = flags.pure_comment;
            skippable = flags.skippable;
        } else {
            skippable = content.chars().all(is_white);
        }
        skippable |= pure_comment;

        let start = text.len();
        text.push_str(&content);
        text.push('\n');
        let mut line = make_line(text.as_bytes(), start, start + content.len(), Some(LineEnding::Lf));
        line.pure_comment = pure_comment;
        line.skippable = skippable;
        lines.push(line);

        let display_line = &mut display.lines[index];
        display_line.pure_comment = pure_comment;
        display_line.skippable |= pure_comment;
    }
    TextBuffer { text, lines }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn parse(text: &str) -> SourceText {
        SourceText::parse(text, &DiffOptions::default()).unwrap()
    }

    #[test_case("", &[]; "empty input")]
    #[test_case("x", &["x"]; "single unterminated line")]
    #[test_case("x\n", &["x"]; "single terminated line")]
    #[test_case("x\ny\nz\n", &["x", "y", "z"]; "lf lines")]
    #[test_case("x\r\ny\r\n", &["x", "y"]; "crlf lines")]
    #[test_case("x\ry\r", &["x", "y"]; "bare cr lines")]
    #[test_case("x\ny", &["x", "y"]; "unterminated last line")]
    #[test_case("\n\n", &["", ""]; "blank lines")]
    fn test_line_split(text: &str, expected: &[&str]) {
        let source = parse(text);
        let buffer = source.for_display();
        let actual: Vec<&str> = (0..buffer.line_count())
            .map(|i| buffer.line_str(i))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test_case("x\ny\n", Some(LineEnding::Lf), false; "uniform lf")]
    #[test_case("x\r\ny\r\n", Some(LineEnding::CrLf), false; "uniform crlf")]
    #[test_case("x\ry", Some(LineEnding::Cr), false; "bare cr")]
    #[test_case("x\r\ny\n", Some(LineEnding::CrLf), true; "mixed endings")]
    #[test_case("x", None, false; "no terminator")]
    fn test_ending_detection(text: &str, dominant: Option<LineEnding>, mixed: bool) {
        let source = parse(text);
        assert_eq!(source.dominant_ending, dominant);
        assert_eq!(source.mixed_endings, mixed);
    }

    #[test]
    fn test_bom_is_stripped_and_remembered() {
        let source = parse("\u{feff}x\n");
        assert!(source.had_bom);
        assert_eq!(source.for_display().line_str(0), "x");
        assert!(!parse("x\n").had_bom);
    }

    #[test]
    fn test_white_classification() {
        let source = parse("  \t\nfoo\n   bar\n");
        let lines = source.for_display().lines();
        assert!(lines[0].is_white());
        assert!(lines[0].is_skippable());
        assert!(!lines[1].is_white());
        assert!(!lines[2].is_white());
    }

    #[test]
    fn test_matching_case_fold() {
        let options = DiffOptions {
            ignore_case: true,
            ..Default::default()
        };
        let source = SourceText::parse("Mixed Case\n", &options).unwrap();
        assert_eq!(source.for_diff().line_str(0), "MIXED CASE");
        assert_eq!(source.for_display().line_str(0), "Mixed Case");
    }

    #[test]
    fn test_matching_digit_mask() {
        let options = DiffOptions {
            ignore_numbers: true,
            ..Default::default()
        };
        let source = SourceText::parse("v1.2.3 release 42\n", &options).unwrap();
        assert_eq!(source.for_diff().line_str(0), "v0.0.0 release 00");
    }

    #[test]
    fn test_matching_comment_blanking() {
        let options = DiffOptions {
            ignore_comments: true,
            ..Default::default()
        };
        let source = SourceText::parse("a(); // note\n// pure\nb();\n", &options).unwrap();
        assert_eq!(source.for_diff().line_str(0), "a();        ");
        // Pure comment lines keep their text but are flagged.
        assert_eq!(source.for_diff().line_str(1), "// pure");
        assert!(source.for_diff().line(1).is_pure_comment());
        assert!(source.for_diff().line(1).is_skippable());
        // The flag is copied onto the display lines.
        assert!(source.for_display().line(1).is_pure_comment());
        assert!(!source.for_display().line(2).is_pure_comment());
    }

    #[test]
    fn test_matching_absent_without_rewrites() {
        let source = parse("a\nb\n");
        assert!(std::ptr::eq(source.for_diff(), source.for_display()));
    }
}
