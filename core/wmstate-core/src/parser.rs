//! Line-oriented recursive-descent over dumps with no fixed schema.
//!
//! A dump is split into trimmed lines and walked by a [`LineCursor`]. Each
//! record kind implements [`Record`]: it names the header that opens it and
//! the headers that open its children. [`parse_record`] consumes the header,
//! then feeds body lines to the record until the next line matches one of the
//! exit patterns inherited from the caller.
//!
//! The exit set handed to children is the parent's exit set plus the parent's
//! declared child terminators; the driver computes the union, call sites
//! never assemble pattern lists by hand. A terminator missing from a
//! declaration makes the child swallow lines that belong to a sibling or to
//! the parent, silently.
//!
//! Unrecognised lines are dropped. Dumps are racy and carry many fields this
//! model does not care about, so the parser never fails; it only counts what
//! it dropped.

use regex::{Captures, Regex};
use serde::Serialize;

use crate::geometry::Rect;
use crate::patterns::{RE_AM_BOUNDS, RE_AM_FULLSCREEN, RE_AM_MIN_HEIGHT, RE_AM_MIN_WIDTH};

/// Forward-only cursor over the trimmed lines of one dump.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    position: usize,
    dropped: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(dump: &'a str) -> Self {
        Self {
            lines: dump.lines().map(str::trim).collect(),
            position: 0,
            dropped: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.lines.len()
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.position).copied()
    }

    pub fn advance(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.position += 1;
        Some(line)
    }

    /// True when the cursor is exhausted or the next line starts something
    /// the current record must not consume.
    pub fn at_exit(&self, exits: &ExitSet) -> bool {
        match self.peek() {
            Some(line) => exits.matches(line),
            None => true,
        }
    }

    pub fn note_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Number of non-blank lines consumed without matching any known field.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.position)
    }
}

/// Patterns that end extraction of the current record.
#[derive(Debug, Clone, Default)]
pub struct ExitSet {
    patterns: Vec<&'static Regex>,
}

impl ExitSet {
    pub fn new(patterns: &[&'static Regex]) -> Self {
        Self {
            patterns: patterns.to_vec(),
        }
    }

    /// A new set holding these patterns plus `extra`.
    pub fn union(&self, extra: &[&'static Regex]) -> Self {
        let mut patterns = self.patterns.clone();
        for pattern in extra {
            if !patterns.iter().any(|known| std::ptr::eq(*known, *pattern)) {
                patterns.push(pattern);
            }
        }
        Self { patterns }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(line))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// What a record did with one body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Consumed,
    Dropped,
    /// The line was consumed and the record is complete.
    Finish,
}

impl LineOutcome {
    pub fn from_matched(matched: bool) -> Self {
        if matched {
            Self::Consumed
        } else {
            Self::Dropped
        }
    }
}

/// One record kind in a dump grammar.
pub trait Record: Sized {
    /// Data handed down from the enclosing scope (e.g. the current display).
    type Context: Copy;

    /// Pattern recognising the header line that opens this record.
    fn header() -> &'static Regex;

    /// Header patterns of nested records. Added to the inherited exit set
    /// when extracting children, so a child stops at its next sibling.
    fn child_terminators() -> Vec<&'static Regex> {
        Vec::new()
    }

    /// Builds an empty record from its header line.
    fn open(line: &str, header: &Captures<'_>, context: Self::Context) -> Self;

    /// Tries to parse one nested record at the cursor. Returns true when a
    /// child consumed input.
    fn parse_child(&mut self, _cursor: &mut LineCursor<'_>, _child_exits: &ExitSet) -> bool {
        false
    }

    /// Applies one body line that did not start a child record.
    fn apply_line(&mut self, line: &str) -> LineOutcome;
}

/// Parses one `R` at the cursor if the next line is its header.
///
/// Returns `None` without consuming anything when the header does not match.
pub fn parse_record<R: Record>(
    cursor: &mut LineCursor<'_>,
    exits: &ExitSet,
    context: R::Context,
) -> Option<R> {
    let line = cursor.peek()?;
    let captures = R::header().captures(line)?;
    cursor.advance();

    let mut record = R::open(line, &captures, context);
    let child_exits = exits.union(&R::child_terminators());

    while !cursor.at_exit(exits) {
        if record.parse_child(cursor, &child_exits) {
            continue;
        }
        let Some(line) = cursor.advance() else {
            break;
        };
        match record.apply_line(line) {
            LineOutcome::Consumed => {}
            LineOutcome::Dropped if !line.is_empty() => cursor.note_dropped(),
            LineOutcome::Dropped => {}
            LineOutcome::Finish => break,
        }
    }
    Some(record)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Value Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Case-insensitive `"true"` is true, anything else false.
pub fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

pub fn capture_i32(captures: &Captures<'_>, group: usize) -> Option<i32> {
    captures.get(group)?.as_str().parse().ok()
}

pub fn capture_str(captures: &Captures<'_>, group: usize) -> Option<String> {
    captures.get(group).map(|m| m.as_str().to_string())
}

/// Reads four consecutive groups starting at `first` as
/// `left, top, right, bottom`.
pub fn capture_rect(captures: &Captures<'_>, first: usize) -> Option<Rect> {
    Some(Rect::from_ltrb(
        capture_i32(captures, first)?,
        capture_i32(captures, first + 1)?,
        capture_i32(captures, first + 2)?,
        capture_i32(captures, first + 3)?,
    ))
}

/// Matches `pattern` against `line` and reads the rectangle in groups 1..=4.
pub fn match_rect(pattern: &Regex, line: &str) -> Option<Rect> {
    pattern
        .captures(line)
        .and_then(|captures| capture_rect(&captures, 1))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler Container Fields
// ═══════════════════════════════════════════════════════════════════════════════

/// Fields shared by scheduler stacks and tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerFields {
    pub fullscreen: bool,
    pub bounds: Option<Rect>,
    pub min_width: i32,
    pub min_height: i32,
}

impl Default for ContainerFields {
    fn default() -> Self {
        Self {
            fullscreen: false,
            bounds: None,
            min_width: -1,
            min_height: -1,
        }
    }
}

impl ContainerFields {
    pub fn extract_fullscreen(&mut self, line: &str) -> bool {
        let Some(captures) = RE_AM_FULLSCREEN.captures(line) else {
            return false;
        };
        self.fullscreen = parse_flag(&captures[1]);
        tracing::debug!(fullscreen = self.fullscreen, "container fullscreen");
        true
    }

    pub fn extract_bounds(&mut self, line: &str) -> bool {
        let Some(captures) = RE_AM_BOUNDS.captures(line) else {
            return false;
        };
        self.bounds = capture_rect(&captures, 1);
        tracing::debug!(bounds = ?self.bounds, "container bounds");
        true
    }

    pub fn extract_min_size(&mut self, line: &str) -> bool {
        if let Some(captures) = RE_AM_MIN_WIDTH.captures(line) {
            if let Some(width) = capture_i32(&captures, 1) {
                self.min_width = width;
            }
            return true;
        }
        if let Some(captures) = RE_AM_MIN_HEIGHT.captures(line) {
            if let Some(height) = capture_i32(&captures, 1) {
                self.min_height = height;
            }
            return true;
        }
        false
    }
}
