//! Line-based change detection
//!
//! Produces a unified diff (`---`/`+++` headers, `@@` hunks, three lines of
//! context) between the previous and current normalized text of a page.

use similar::{ChangeTag, DiffOp, TextDiff};
use std::fmt::Write;

/// Lines of unchanged context around each hunk
pub const CONTEXT_LINES: usize = 3;

/// Outcome of comparing two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub has_changed: bool,
    pub diff: String,
}

impl DiffReport {
    fn unchanged() -> Self {
        Self::default()
    }
}

/// Compares snapshots and renders the differences
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    old_label: String,
    new_label: String,
    context: usize,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            old_label: "previous".to_string(),
            new_label: "current".to_string(),
            context: CONTEXT_LINES,
        }
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file labels shown on the `---` and `+++` header lines
    pub fn with_labels(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old_label = old.into();
        self.new_label = new.into();
        self
    }

    /// Compare `old` against `new`.
    ///
    /// An empty side is never a change: an empty `old` means the page has no
    /// baseline yet, an empty `new` means the fetch produced nothing usable.
    pub fn detect(&self, old: &str, new: &str) -> DiffReport {
        if old.is_empty() || new.is_empty() {
            return DiffReport::unchanged();
        }

        let old_lines: Vec<&str> = old.trim().split('\n').collect();
        let new_lines: Vec<&str> = new.trim().split('\n').collect();

        let diff = TextDiff::from_slices(&old_lines, &new_lines);
        if diff.ops().iter().all(|op| matches!(op, DiffOp::Equal { .. })) {
            return DiffReport::unchanged();
        }
        let groups = diff.grouped_ops(self.context);
        if groups.is_empty() {
            return DiffReport::unchanged();
        }

        let mut out = String::new();
        let _ = writeln!(out, "--- {}", self.old_label);
        let _ = write!(out, "+++ {}", self.new_label);

        for group in &groups {
            let _ = write!(out, "\n{}", hunk_header(group));
            for op in group {
                for change in diff.iter_changes(op) {
                    let sign = match change.tag() {
                        ChangeTag::Equal => ' ',
                        ChangeTag::Delete => '-',
                        ChangeTag::Insert => '+',
                    };
                    let _ = write!(out, "\n{}{}", sign, change.value());
                }
            }
        }

        tracing::debug!("Changes detected: {} hunks", groups.len());
        DiffReport {
            has_changed: true,
            diff: out,
        }
    }
}

/// `@@ -a,b +c,d @@` for a group of diff operations
fn hunk_header(group: &[DiffOp]) -> String {
    let (first, last) = match (group.first(), group.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return "@@ -0,0 +0,0 @@".to_string(),
    };
    let old = first.old_range().start..last.old_range().end;
    let new = first.new_range().start..last.new_range().end;
    format!(
        "@@ -{} +{} @@",
        format_range(old.start, old.end),
        format_range(new.start, new.end)
    )
}

/// Unified-diff range: 1-based start, length omitted when it is 1
fn format_range(start: usize, end: usize) -> String {
    let len = end - start;
    match len {
        0 => format!("{},0", start),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}
