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

//! Streaming classifier for C/C++-style comments and string literals.
//!
//! The scanner walks one line at a time and carries the open-block-comment
//! state across calls, so a `/* ... */` spanning several lines classifies
//! every enclosed line as a pure comment. String literals shield their
//! contents: `"/* not a comment */"` stays code.

/// Classification of a single scanned line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineFlags {
    /// The line carries no non-white characters outside comments.
    pub skippable: bool,
    /// The line carries a comment and nothing else except white space.
    pub pure_comment: bool,
}

/// White space for line classification purposes.
pub(crate) fn is_white(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Character-by-character state machine over `{Code, SingleString,
/// DoubleString, LineComment, BlockComment}`. Only the block-comment state
/// survives the end of a line; an unterminated string literal ends there.
#[derive(Clone, Debug, Default)]
pub struct CommentScanner {
    in_block_comment: bool,
}

impl CommentScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `line` (without its terminator) and advances the
    /// multi-line state.
    pub fn scan_line(&mut self, line: &str) -> LineFlags {
        let chars: Vec<char> = line.chars().collect();
        let (_, flags) = self.scan(&chars);
        flags
    }

    /// Classifies `line` and returns it with comment runs overwritten by
    /// spaces, unless the line is nothing but comments and white space, in
    /// which case the comment text is kept so that pure-comment lines still
    /// compare against each other.
    pub fn strip_line(&mut self, line: &str) -> (String, LineFlags) {
        let mut chars: Vec<char> = line.chars().collect();
        let (ranges, flags) = self.scan(&chars);
        if !flags.skippable {
            for (start, end) in ranges {
                for c in &mut chars[start..end] {
                    *c = ' ';
                }
            }
        }
        (chars.into_iter().collect(), flags)
    }

    /// Returns the comment ranges (as char index ranges) and the flags.
    fn scan(&mut self, chars: &[char]) -> (Vec<(usize, usize)>, LineFlags) {
        let n = chars.len();
        let mut ranges = Vec::new();
        let mut white = true;
        let mut has_comment = false;
        let mut i = 0;

        if self.in_block_comment {
            has_comment = true;
            match find_block_end(chars, 0) {
                Some(end) => {
                    ranges.push((0, end));
                    self.in_block_comment = false;
                    i = end;
                }
                None => {
                    ranges.push((0, n));
                    i = n;
                }
            }
        }

        while i < n {
            let c = chars[i];
            if c == '\'' || c == '\"' {
                // A string literal; its body is opaque to comment detection.
                white = false;
                i += 1;
                let mut escaped = false;
                while i < n {
                    if escaped {
                        escaped = false;
                    } else if chars[i] == '\\' {
                        escaped = true;
                    } else if chars[i] == c {
                        break;
                    }
                    i += 1;
                }
                if i < n {
                    i += 1; // closing quote
                }
            } else if c == '/' && i + 1 < n && chars[i + 1] == '/' {
                has_comment = true;
                ranges.push((i, n));
                i = n;
            } else if c == '/' && i + 1 < n && chars[i + 1] == '*' {
                has_comment = true;
                let start = i;
                match find_block_end(chars, i + 2) {
                    Some(end) => {
                        ranges.push((start, end));
                        i = end;
                    }
                    None => {
                        ranges.push((start, n));
                        self.in_block_comment = true;
                        i = n;
                    }
                }
            } else {
                if !is_white(c) {
                    white = false;
                }
                i += 1;
            }
        }

        let flags = LineFlags {
            skippable: white,
            pure_comment: has_comment && white,
        };
        (ranges, flags)
    }
}

/// Index just past the closing `*/` at or after `from`, if any.
fn find_block_end(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}
