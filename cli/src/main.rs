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

//! Thin command-line wrapper: read two or three files, align and merge
//! them, write the result. Exits 0 when the merge is fully resolved, 1
//! when conflicts remain in the output, 2 on input errors.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;
use trimerge_lib::CancelFlag;
use trimerge_lib::align::align2;
use trimerge_lib::align::align3;
use trimerge_lib::emit::MergeSources;
use trimerge_lib::emit::emit;
use trimerge_lib::options::DiffOptions;
use trimerge_lib::options::EmitOptions;
use trimerge_lib::options::EolPolicy;
use trimerge_lib::options::MergePolicy;
use trimerge_lib::resolve::resolve;
use trimerge_lib::source_text::SourceText;

#[derive(Parser)]
#[command(
    name = "trimerge",
    version,
    about = "Aligns two or three text files and writes an auto-merged result"
)]
struct Args {
    /// The base file (A).
    file_a: PathBuf,
    /// The first branch (B).
    file_b: PathBuf,
    /// The second branch (C); omit for a two-way comparison.
    file_c: Option<PathBuf>,

    /// Write the merged output to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compare lines ignoring white space differences.
    #[arg(long)]
    ignore_whitespace: bool,
    /// Compare lines ignoring character case.
    #[arg(long)]
    ignore_case: bool,
    /// Compare lines with all digits treated alike.
    #[arg(long)]
    ignore_numbers: bool,
    /// Compare lines with C/C++ comments blanked out.
    #[arg(long)]
    ignore_comments: bool,
    /// Don't align on lines with fewer than three non-white characters.
    #[arg(long)]
    ignore_trivial_matches: bool,
    /// Always compute a minimal diff (slower on large inputs).
    #[arg(long)]
    minimal: bool,
    /// Leave conflicts that only differ in white space unresolved.
    #[arg(long)]
    no_auto_whitespace: bool,

    /// Line-ending convention of the output.
    #[arg(long, value_enum, default_value = "preserve")]
    eol: EolArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum EolArg {
    /// Keep the ending of whichever input a line was taken from.
    Preserve,
    Lf,
    Crlf,
}

impl From<EolArg> for EolPolicy {
    fn from(arg: EolArg) -> Self {
        match arg {
            EolArg::Preserve => Self::Preserve,
            EolArg::Lf => Self::Lf,
            EolArg::Crlf => Self::CrLf,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(unresolved) => {
            eprintln!("trimerge: {unresolved} unresolved conflict region(s) remain");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("trimerge: {err}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<usize, String> {
    let options = DiffOptions {
        ignore_whitespace: args.ignore_whitespace,
        ignore_case: args.ignore_case,
        ignore_numbers: args.ignore_numbers,
        ignore_comments: args.ignore_comments,
        ignore_trivial_matches: args.ignore_trivial_matches,
        minimal: args.minimal,
        ..Default::default()
    };

    let a = read_source(&args.file_a, &options)?;
    let b = read_source(&args.file_b, &options)?;
    let c = args
        .file_c
        .as_deref()
        .map(|path| read_source(path, &options))
        .transpose()?;

    let cancel = CancelFlag::new();
    let alignment = match &c {
        Some(c) => align3(&a, &b, c, &options, &[], &cancel),
        None => align2(&a, &b, &options, &[], &cancel),
    }
    .map_err(|err| err.to_string())?;
    tracing::debug!(stats = ?alignment.stats(), "alignment finished");

    let policy = MergePolicy {
        auto_resolve_whitespace: !args.no_auto_whitespace,
    };
    let rows = resolve(&alignment, &policy);
    let sources = MergeSources {
        a: &a,
        b: &b,
        c: c.as_ref(),
    };
    let emit_options = EmitOptions {
        eol: args.eol.into(),
        ..Default::default()
    };
    let output = emit(&rows, &sources, &emit_options);

    match &args.output {
        Some(path) => fs::write(path, &output.text)
            .map_err(|err| format!("{}: {err}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(output.text.as_bytes())
                .map_err(|err| err.to_string())?;
        }
    }
    Ok(output.unresolved)
}

fn read_source(path: &Path, options: &DiffOptions) -> Result<SourceText, String> {
    let bytes = fs::read(path).map_err(|err| format!("{}: {err}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    SourceText::parse(&text, options).map_err(|err| format!("{}: {err}", path.display()))
}
