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

//! Two- and three-way textual alignment and merge.
//!
//! Given two or three decoded texts, the engine builds a table of
//! corresponding lines ([`align::align2`], [`align::align3`]), classifies
//! every row and picks a default merge source ([`resolve::resolve`]), and
//! writes the merged text with conflict markers around anything that could
//! not be decided ([`emit::emit`]). The typical call sequence:
//!
//! ```
//! use trimerge_lib::CancelFlag;
//! use trimerge_lib::align::align3;
//! use trimerge_lib::emit::{MergeSources, emit};
//! use trimerge_lib::options::{DiffOptions, EmitOptions, MergePolicy};
//! use trimerge_lib::resolve::resolve;
//! use trimerge_lib::source_text::SourceText;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = DiffOptions::default();
//! let a = SourceText::parse("x\ny\nz\n", &options)?;
//! let b = SourceText::parse("x\nY\nz\n", &options)?;
//! let c = SourceText::parse("x\ny\nz!\n", &options)?;
//!
//! let alignment = align3(&a, &b, &c, &options, &[], &CancelFlag::new())?;
//! let rows = resolve(&alignment, &MergePolicy::default());
//! let sources = MergeSources { a: &a, b: &b, c: Some(&c) };
//! let merged = emit(&rows, &sources, &EmitOptions::default());
//! assert_eq!(merged.text, "x\nY\nz!\n");
//! assert!(merged.is_fully_resolved());
//! # Ok(())
//! # }
//! ```
//!
//! All of it is synchronous and CPU-bound; long computations poll a
//! [`CancelFlag`] and return early with a result flagged incomplete.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

pub mod align;
pub mod comment;
pub mod diff;
pub mod emit;
mod fine;
mod myers;
pub mod options;
pub mod resolve;
pub mod source_text;

/// Cooperative cancellation handle, shared with the embedder. The inner
/// loops of the differs poll it and abandon the computation when raised.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks running computations to stop at the next check point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
