//! Parser for `typst compile --diagnostic-format short` output.
//!
//! ```text
//! main.typ:3:5: error: unknown variable: titel
//!   hint: did you mean `title`?
//! chapters/intro.typ:1:1: warning: unused import
//! ```

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;

use crate::core::{Diagnostic, Location, Severity};

static RE_DIAGNOSTIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?):(\d+):(\d+): (error|warning): (.*)$").unwrap());

static RE_ANSI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

/// Diagnostics parsed from one compiler run.
#[derive(Debug, Default)]
pub(super) struct Parsed {
    /// Diagnostics located in the main document
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics seen in total, including other files
    pub seen: usize,
}

/// Parse compiler stderr, keeping diagnostics whose file is `main`.
///
/// `main` is the main document relative to the compile root. Hint lines
/// attach to the diagnostic before them. Exact duplicates are dropped.
/// Errors in other files are kept too, pinned to the start of `main` with
/// their real location in the message; warnings there are dropped.
pub(super) fn parse(stderr: &str, main: &Path) -> Parsed {
    let stderr = strip_ansi(stderr);
    let mut parsed = Parsed::default();
    let mut seen_keys = FxHashSet::default();
    // Whether the last header line was kept, so its hints follow it
    let mut keep_hints = false;

    for line in stderr.lines() {
        let trimmed = line.trim();
        if let Some(hint) = trimmed.strip_prefix("hint: ") {
            if keep_hints && let Some(last) = parsed.diagnostics.last_mut() {
                last.hints.push(hint.to_string());
            }
            continue;
        }

        let Some(caps) = RE_DIAGNOSTIC.captures(line) else {
            continue;
        };
        parsed.seen += 1;

        let (Ok(line_no), Ok(column)) = (caps[2].parse(), caps[3].parse()) else {
            keep_hints = false;
            continue;
        };
        let severity = match &caps[4] {
            "error" => Severity::Error,
            _ => Severity::Warning,
        };
        let mut message = caps[5].to_string();
        let mut location = Location::point(line_no, column);

        if !same_file(&caps[1], main) {
            if severity != Severity::Error {
                crate::debug!("backend"; "skip diagnostic in {}: {}", &caps[1], message);
                keep_hints = false;
                continue;
            }
            message = format!("in {}:{}:{}: {}", &caps[1], line_no, column, message);
            location = Location::point(1, 1);
        }
        if !seen_keys.insert((location.line, location.column, message.clone())) {
            keep_hints = false;
            continue;
        }

        parsed
            .diagnostics
            .push(Diagnostic::new(severity, location, message));
        keep_hints = true;
    }

    parsed
}

fn same_file(reported: &str, main: &Path) -> bool {
    let reported = Path::new(reported.trim_start_matches("./"));
    reported == main || (reported.is_absolute() && reported.ends_with(main))
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    RE_ANSI.replace_all(s, "")
}
