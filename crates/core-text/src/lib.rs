//! Rope-based text buffer abstraction — the Buffer collaborator of spec §6.
//!
//! The editing engine (`core-model`/`core-actions`) never touches the rope
//! directly; it only calls the operation surface listed in spec §6
//! (`add_mark`, `move_mark_*`, `insert_before_mark`, ...). Buffer *internals*
//! (rope layout, mark fix-up arithmetic) are this crate's private business.

use anyhow::{Context, Result};
use regex::Regex;
use ropey::Rope;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A position inside a buffer expressed as (line index, byte offset within
/// that line). Lines and byte offsets are guaranteed (when clamped) to be on
/// UTF-8 code unit boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, byte: usize) -> Self {
        Self { line, byte }
    }
    pub fn origin() -> Self {
        Self { line: 0, byte: 0 }
    }
    pub fn clamp_to<F>(&mut self, line_count: usize, mut line_len_fn: F)
    where
        F: FnMut(usize) -> usize,
    {
        if line_count == 0 {
            self.line = 0;
            self.byte = 0;
            return;
        }
        if self.line >= line_count {
            self.line = line_count - 1;
        }
        let max_len = line_len_fn(self.line);
        if self.byte > max_len {
            self.byte = max_len;
        }
    }
}

pub mod width;
#[cfg(feature = "term-probe")]
pub mod width_probe;

pub use width::egc_width;

/// A stable handle to a registered [`Position`] in a buffer (spec §3 Mark).
/// Marks survive intervening inserts/deletes: the buffer fixes up their
/// coordinates on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub u64);

/// A registered highlight spanning `[start, end)` between two marks, or a
/// free-standing byte range. Used for selection-bound and search-match
/// highlighting (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleRuleId(pub u64);

/// Either a fixed byte range (search-match highlight, frozen at creation) or
/// a pair of tracked marks (selection-bound highlight, which must follow the
/// cursor as it moves — not just survive text edits like a fixed range does).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleAnchor {
    Marks(MarkId, MarkId),
    Fixed(Position, Position),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StylingRule {
    pub anchor: StyleAnchor,
    pub kind: StyleKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    /// Reverse-video selection / search-match highlight.
    ReverseVideo,
}

/// A text buffer backed by a `ropey::Rope`, extended with a mark registry
/// and a styling-rule list per spec §3/§6.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
    pub path: Option<PathBuf>,
    marks: HashMap<MarkId, Position>,
    next_mark_id: u64,
    rules: HashMap<StyleRuleId, StylingRule>,
    next_rule_id: u64,
    /// Number of views currently bound to this buffer (spec §5 ref-count).
    pub ref_count: usize,
    pub dirty: bool,
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
            path: None,
            marks: HashMap::new(),
            next_mark_id: 0,
            rules: HashMap::new(),
            next_rule_id: 0,
            ref_count: 0,
            dirty: false,
        })
    }

    /// `buffer_new_open(path)` — load a file from disk as a new buffer.
    pub fn buffer_new_open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let mut b = Self::from_str(path.to_string_lossy().to_string(), &content)?;
        b.path = Some(path.to_path_buf());
        Ok(b)
    }

    /// `buffer_save_as(path)` — write the full buffer contents to disk.
    pub fn buffer_save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.buffer_get()).with_context(|| format!("saving {}", path.display()))?;
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        Ok(())
    }

    /// `buffer_get` — the full buffer contents as one string.
    pub fn buffer_get(&self) -> String {
        self.rope.to_string()
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Return the requested line as an owned `String` (including trailing newline if present).
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx < self.rope.len_lines() {
            Some(self.rope.line(idx).to_string())
        } else {
            None
        }
    }

    /// Byte length of a line (excluding any newline) for clamping purposes.
    pub fn line_byte_len(&self, idx: usize) -> usize {
        if idx >= self.rope.len_lines() {
            return 0;
        }
        let line = self.rope.line(idx);
        let s = line.to_string();
        if s.ends_with('\n') {
            s.len() - 1
        } else {
            s.len()
        }
    }

    fn line_content_string(&self, idx: usize) -> String {
        let mut s = self.rope.line(idx).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        s
    }

    fn absolute_byte_index(&self, pos: &Position) -> usize {
        let line_start_char = self.rope.line_to_char(pos.line.min(self.rope.len_lines().saturating_sub(1)));
        let line_start_byte = self.rope.char_to_byte(line_start_char);
        line_start_byte + pos.byte
    }

    fn byte_to_char_index(&self, line: usize, byte_in_line: usize) -> usize {
        let line_start_char = self.rope.line_to_char(line);
        let line_str = self.rope.line(line).to_string();
        let mut trimmed = line_str.as_str();
        if trimmed.ends_with('\n') {
            trimmed = &trimmed[..trimmed.len() - 1];
        }
        let within = &trimmed[..byte_in_line.min(trimmed.len())];
        line_start_char + within.chars().count()
    }

    /// `get_offset` — absolute byte offset of a position into the whole buffer.
    pub fn get_offset(&self, pos: Position) -> usize {
        self.absolute_byte_index(&pos)
    }

    /// Insert a grapheme cluster string (may be multi-byte) at the given position; advances position by its byte length.
    pub fn insert_grapheme(&mut self, pos: &mut Position, g: &str) {
        let char_index = self.byte_to_char_index(pos.line, pos.byte);
        self.rope.insert(char_index, g);
        let at = *pos;
        self.fixup_marks_after_insert(at, g);
        pos.byte += g.len();
        self.dirty = true;
    }

    /// Insert a newline at the given position, splitting the current line. Cursor moves to start of new line.
    pub fn insert_newline(&mut self, pos: &mut Position) {
        let char_index = self.byte_to_char_index(pos.line, pos.byte);
        self.rope.insert(char_index, "\n");
        let at = *pos;
        self.fixup_marks_after_insert(at, "\n");
        pos.line += 1;
        pos.byte = 0;
        self.dirty = true;
    }

    /// Delete the grapheme cluster before the position (like backspace). If at start of line and not first line, joins with previous.
    pub fn delete_grapheme_before(&mut self, pos: &mut Position) {
        if pos.line == 0 && pos.byte == 0 {
            return;
        }
        if pos.byte == 0 {
            let prev_line = pos.line - 1;
            let prev_len = self.line_byte_len(prev_line);
            let line_start_char_prev = self.rope.line_to_char(prev_line);
            let prev_line_start_byte = self.rope.char_to_byte(line_start_char_prev);
            let newline_byte = prev_line_start_byte + prev_len;
            let newline_char_index = self.rope.byte_to_char(newline_byte);
            self.rope.remove(newline_char_index..newline_char_index + 1);
            let start = Position::new(prev_line, prev_len);
            let end = Position::new(pos.line, 0);
            self.fixup_marks_after_delete(start, end);
            pos.line = prev_line;
            pos.byte = prev_len;
            self.dirty = true;
            return;
        }
        let line_str = self.line_content_string(pos.line);
        let prev = grapheme::prev_boundary(&line_str, pos.byte);
        if prev == pos.byte {
            return;
        }
        let abs_start = self.absolute_byte_index(&Position {
            line: pos.line,
            byte: prev,
        });
        let abs_end = self.absolute_byte_index(pos);
        let start_char = self.rope.byte_to_char(abs_start);
        let end_char = self.rope.byte_to_char(abs_end);
        self.rope.remove(start_char..end_char);
        let start = Position::new(pos.line, prev);
        let end = *pos;
        self.fixup_marks_after_delete(start, end);
        pos.byte = prev;
        self.dirty = true;
    }

    /// Delete the grapheme cluster at the position (like Normal mode 'x'). No-op if at line end.
    pub fn delete_grapheme_at(&mut self, pos: &mut Position) {
        let line_len = self.line_byte_len(pos.line);
        if pos.byte >= line_len {
            return;
        }
        let line_str = self.line_content_string(pos.line);
        let next = grapheme::next_boundary(&line_str, pos.byte);
        if next == pos.byte {
            return;
        }
        let abs_start = self.absolute_byte_index(pos);
        let abs_end = self.absolute_byte_index(&Position {
            line: pos.line,
            byte: next,
        });
        let start_char = self.rope.byte_to_char(abs_start);
        let end_char = self.rope.byte_to_char(abs_end);
        self.rope.remove(start_char..end_char);
        let start = *pos;
        let end = Position::new(pos.line, next);
        self.fixup_marks_after_delete(start, end);
        self.dirty = true;
    }

    /// Return the UTF-8 slice in the absolute byte range `[start,end)`.
    pub fn slice_bytes(&self, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        let total = self.rope.len_bytes();
        let s = start.min(total);
        let e = end.min(total);
        if s >= e {
            return String::new();
        }
        let start_char = self.rope.byte_to_char(s);
        let end_char = self.rope.byte_to_char(e);
        self.rope.slice(start_char..end_char).to_string()
    }

    /// Delete the UTF-8 slice in absolute byte range `[start,end)` (clamped).
    pub fn delete_bytes(&mut self, start: usize, end: usize) -> String {
        if start >= end {
            return String::new();
        }
        let total = self.rope.len_bytes();
        let s = start.min(total);
        let e = end.min(total);
        if s >= e {
            return String::new();
        }
        let start_char = self.rope.byte_to_char(s);
        let end_char = self.rope.byte_to_char(e);
        let removed = self.rope.slice(start_char..end_char).to_string();
        self.rope.remove(start_char..end_char);
        self.dirty = true;
        removed
    }

    /// `buffer_insert(offset, data)` — insert raw text at an absolute byte offset.
    pub fn buffer_insert(&mut self, offset: usize, data: &str) {
        let start_char = self.rope.byte_to_char(offset.min(self.rope.len_bytes()));
        let pos = self.offset_to_position(offset);
        self.rope.insert(start_char, data);
        self.fixup_marks_after_insert(pos, data);
        self.dirty = true;
    }

    /// Inverse of `get_offset`: the line/byte position of an absolute byte offset.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let char_idx = self.rope.byte_to_char(offset.min(self.rope.len_bytes()));
        let line = self.rope.char_to_line(char_idx);
        let line_start_char = self.rope.line_to_char(line);
        let line_start_byte = self.rope.char_to_byte(line_start_char);
        Position::new(line, offset.saturating_sub(line_start_byte))
    }

    // ---------------------------------------------------------------
    // Mark registry (spec §3 Mark, §6 mark operations)
    // ---------------------------------------------------------------

    /// `add_mark` — register a new stable position, returning its handle.
    pub fn add_mark(&mut self, pos: Position) -> MarkId {
        let id = MarkId(self.next_mark_id);
        self.next_mark_id += 1;
        self.marks.insert(id, pos);
        id
    }

    /// `destroy_mark` — unregister a mark. No-op if already destroyed.
    pub fn destroy_mark(&mut self, id: MarkId) {
        self.marks.remove(&id);
    }

    /// `clone_mark` — register a new mark at the same position as `id`.
    pub fn clone_mark(&mut self, id: MarkId) -> Option<MarkId> {
        let pos = *self.marks.get(&id)?;
        Some(self.add_mark(pos))
    }

    pub fn mark_pos(&self, id: MarkId) -> Option<Position> {
        self.marks.get(&id).copied()
    }

    pub fn move_mark_to(&mut self, id: MarkId, line: usize, col: usize) {
        if let Some(p) = self.marks.get_mut(&id) {
            p.line = line;
            p.byte = col;
            clamp_mark(p, &self.rope);
        }
    }

    /// `move_mark_by(delta)` — move horizontally by `delta` graphemes,
    /// clamped to the buffer (no line wrap; callers compose with
    /// `move_mark_bol`/`eol` for wrapped motion).
    pub fn move_mark_by(&mut self, id: MarkId, delta: i64) {
        let Some(mut pos) = self.marks.get(&id).copied() else {
            return;
        };
        let line_str = self.line_content_string(pos.line);
        if delta > 0 {
            for _ in 0..delta {
                let next = grapheme::next_boundary(&line_str, pos.byte);
                if next == pos.byte {
                    break;
                }
                pos.byte = next;
            }
        } else {
            for _ in 0..(-delta) {
                let prev = grapheme::prev_boundary(&line_str, pos.byte);
                if prev == pos.byte {
                    break;
                }
                pos.byte = prev;
            }
        }
        self.marks.insert(id, pos);
    }

    /// `move_mark_vert(delta)` — move up/down by `delta` lines, clamping the
    /// column to the destination line's length (sticky-column handling is
    /// the caller's responsibility; see `core-model::Cursor::sticky_col`).
    pub fn move_mark_vert(&mut self, id: MarkId, delta: i64) {
        let Some(mut pos) = self.marks.get(&id).copied() else {
            return;
        };
        let new_line = pos.line as i64 + delta;
        pos.line = new_line.clamp(0, self.rope.len_lines().saturating_sub(1) as i64) as usize;
        clamp_mark(&mut pos, &self.rope);
        self.marks.insert(id, pos);
    }

    pub fn move_mark_bol(&mut self, id: MarkId) {
        if let Some(p) = self.marks.get_mut(&id) {
            p.byte = 0;
        }
    }

    pub fn move_mark_eol(&mut self, id: MarkId) {
        if let Some(pos) = self.marks.get(&id).copied() {
            let len = self.line_byte_len(pos.line);
            if let Some(p) = self.marks.get_mut(&id) {
                p.byte = len;
            }
        }
    }

    pub fn move_mark_beginning(&mut self, id: MarkId) {
        if let Some(p) = self.marks.get_mut(&id) {
            p.line = 0;
            p.byte = 0;
        }
    }

    pub fn move_mark_end(&mut self, id: MarkId) {
        let last = self.rope.len_lines().saturating_sub(1);
        let len = self.line_byte_len(last);
        if let Some(p) = self.marks.get_mut(&id) {
            p.line = last;
            p.byte = len;
        }
    }

    /// `move_mark_to_next_regex_match` — advance the mark to the start of the
    /// next match at or after its current position, wrapping from the start
    /// of the buffer if no forward match exists. Returns whether a match was
    /// found (and whether a wrap occurred).
    pub fn move_mark_to_next_regex_match(&mut self, id: MarkId, re: &Regex) -> Option<MatchOutcome> {
        let pos = self.marks.get(&id).copied()?;
        let offset = self.absolute_byte_index(&pos);
        let text = self.rope.to_string();
        if let Some(m) = re.find_at(&text, offset + 1).or_else(|| {
            // find_at requires a char boundary; fall back to scanning if offset+1 isn't one.
            re.find_iter(&text).find(|m| m.start() > offset)
        }) {
            let new_pos = self.offset_to_position(m.start());
            self.marks.insert(id, new_pos);
            return Some(MatchOutcome {
                wrapped: false,
                start: m.start(),
                end: m.end(),
            });
        }
        if let Some(m) = re.find(&text) {
            let new_pos = self.offset_to_position(m.start());
            self.marks.insert(id, new_pos);
            return Some(MatchOutcome {
                wrapped: true,
                start: m.start(),
                end: m.end(),
            });
        }
        None
    }

    /// `move_mark_to_prev_regex_match` — symmetric backward search.
    pub fn move_mark_to_prev_regex_match(&mut self, id: MarkId, re: &Regex) -> Option<MatchOutcome> {
        let pos = self.marks.get(&id).copied()?;
        let offset = self.absolute_byte_index(&pos);
        let text = self.rope.to_string();
        let before: Vec<_> = re.find_iter(&text).filter(|m| m.start() < offset).collect();
        if let Some(m) = before.last() {
            let new_pos = self.offset_to_position(m.start());
            self.marks.insert(id, new_pos);
            return Some(MatchOutcome {
                wrapped: false,
                start: m.start(),
                end: m.end(),
            });
        }
        if let Some(m) = re.find_iter(&text).last() {
            let new_pos = self.offset_to_position(m.start());
            self.marks.insert(id, new_pos);
            return Some(MatchOutcome {
                wrapped: true,
                start: m.start(),
                end: m.end(),
            });
        }
        None
    }

    /// `get_between_marks` — bytes between two marks (order-independent).
    pub fn get_between_marks(&self, a: MarkId, b: MarkId) -> Option<String> {
        let pa = self.marks.get(&a)?;
        let pb = self.marks.get(&b)?;
        let (lo, hi) = if pa <= pb { (*pa, *pb) } else { (*pb, *pa) };
        let start = self.absolute_byte_index(&lo);
        let end = self.absolute_byte_index(&hi);
        Some(self.slice_bytes(start, end))
    }

    /// `insert_before_mark` — insert text immediately before the mark's
    /// position, advancing the mark past the inserted text.
    pub fn insert_before_mark(&mut self, id: MarkId, data: &str) {
        let Some(pos) = self.marks.get(&id).copied() else {
            return;
        };
        let mut p = pos;
        let char_index = self.byte_to_char_index(p.line, p.byte);
        self.rope.insert(char_index, data);
        self.fixup_marks_after_insert(pos, data);
        // fixup already moved `id` itself if it sat at/after the insert
        // point (it does, since insert is "at or after"); recompute.
        let lines_added = data.matches('\n').count();
        if lines_added == 0 {
            p.byte += data.len();
        } else {
            p.line += lines_added;
            let last_nl = data.rfind('\n').unwrap();
            p.byte = data.len() - last_nl - 1;
        }
        self.marks.insert(id, p);
        self.dirty = true;
    }

    /// `delete_before_mark(count)` — delete `count` bytes ending at the mark.
    pub fn delete_before_mark(&mut self, id: MarkId, count: usize) -> String {
        let Some(pos) = self.marks.get(&id).copied() else {
            return String::new();
        };
        let end = self.absolute_byte_index(&pos);
        let start = end.saturating_sub(count);
        let removed = self.delete_bytes(start, end);
        let new_pos = self.offset_to_position(start);
        self.fixup_marks_after_delete(new_pos, pos);
        self.marks.insert(id, new_pos);
        removed
    }

    /// `delete_after_mark(count)` — delete `count` bytes starting at the mark.
    pub fn delete_after_mark(&mut self, id: MarkId, count: usize) -> String {
        let Some(pos) = self.marks.get(&id).copied() else {
            return String::new();
        };
        let start = self.absolute_byte_index(&pos);
        let end = start + count;
        let removed = self.delete_bytes(start, end);
        let end_pos = self.offset_to_position(end.min(self.rope.len_bytes() + count));
        self.fixup_marks_after_delete(pos, end_pos.max(pos));
        removed
    }

    /// `delete_between_marks` — delete the inclusive-of-`a`, exclusive-of-`b` span.
    pub fn delete_between_marks(&mut self, a: MarkId, b: MarkId) -> Option<String> {
        let pa = *self.marks.get(&a)?;
        let pb = *self.marks.get(&b)?;
        let (lo, hi) = if pa <= pb { (pa, pb) } else { (pb, pa) };
        let start = self.absolute_byte_index(&lo);
        let end = self.absolute_byte_index(&hi);
        let removed = self.delete_bytes(start, end);
        self.fixup_marks_after_delete(lo, hi);
        Some(removed)
    }

    // ---------------------------------------------------------------
    // Styling rules (spec §4.2 selection bound / search highlight)
    // ---------------------------------------------------------------

    /// Register a highlight over a frozen byte range (e.g. a search match).
    pub fn add_styling_rule(&mut self, start: Position, end: Position, kind: StyleKind) -> StyleRuleId {
        self.insert_rule(StyleAnchor::Fixed(start, end), kind)
    }

    /// Register a highlight that tracks two live marks (e.g. a selection
    /// bound): its span is read off the marks' current positions, not
    /// frozen at creation time.
    pub fn add_mark_styling_rule(&mut self, a: MarkId, b: MarkId, kind: StyleKind) -> StyleRuleId {
        self.insert_rule(StyleAnchor::Marks(a, b), kind)
    }

    fn insert_rule(&mut self, anchor: StyleAnchor, kind: StyleKind) -> StyleRuleId {
        let id = StyleRuleId(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(id, StylingRule { anchor, kind });
        id
    }

    pub fn remove_styling_rule(&mut self, id: StyleRuleId) {
        self.rules.remove(&id);
    }

    pub fn styling_rules(&self) -> impl Iterator<Item = (&StyleRuleId, &StylingRule)> {
        self.rules.iter()
    }

    pub fn has_styling_rule(&self, id: StyleRuleId) -> bool {
        self.rules.contains_key(&id)
    }

    /// Resolve a rule's current span, following live marks where anchored.
    /// Returned in `(start, end)` order regardless of which mark leads.
    pub fn styling_rule_span(&self, id: StyleRuleId) -> Option<(Position, Position)> {
        let rule = self.rules.get(&id)?;
        match rule.anchor {
            StyleAnchor::Fixed(a, b) => Some(if a <= b { (a, b) } else { (b, a) }),
            StyleAnchor::Marks(a, b) => {
                let pa = *self.marks.get(&a)?;
                let pb = *self.marks.get(&b)?;
                Some(if pa <= pb { (pa, pb) } else { (pb, pa) })
            }
        }
    }

    // ---------------------------------------------------------------
    // Mark fix-up: the load-bearing invariant of spec §3 ("survives
    // intervening inserts/deletes").
    // ---------------------------------------------------------------

    fn fixup_marks_after_insert(&mut self, at: Position, inserted: &str) {
        let lines_added = inserted.matches('\n').count();
        let last_line_extra = if lines_added == 0 {
            inserted.len()
        } else {
            inserted.len() - inserted.rfind('\n').unwrap() - 1
        };
        for pos in self.marks.values_mut() {
            if pos.line > at.line || (pos.line == at.line && pos.byte >= at.byte) {
                if pos.line == at.line {
                    if lines_added == 0 {
                        pos.byte += inserted.len();
                    } else {
                        pos.byte = pos.byte - at.byte + last_line_extra;
                    }
                }
                pos.line += lines_added;
            }
        }
        for rule in self.rules.values_mut() {
            if let StyleAnchor::Fixed(a, b) = &mut rule.anchor {
                fixup_position_after_insert(a, at, lines_added, last_line_extra, inserted.len());
                fixup_position_after_insert(b, at, lines_added, last_line_extra, inserted.len());
            }
        }
    }

    fn fixup_marks_after_delete(&mut self, start: Position, end: Position) {
        let line_delta = end.line - start.line;
        for pos in self.marks.values_mut() {
            fixup_position_after_delete(pos, start, end, line_delta);
        }
        for rule in self.rules.values_mut() {
            if let StyleAnchor::Fixed(a, b) = &mut rule.anchor {
                fixup_position_after_delete(a, start, end, line_delta);
                fixup_position_after_delete(b, start, end, line_delta);
            }
        }
    }
}

fn fixup_position_after_insert(
    pos: &mut Position,
    at: Position,
    lines_added: usize,
    last_line_extra: usize,
    inserted_len: usize,
) {
    if pos.line > at.line || (pos.line == at.line && pos.byte >= at.byte) {
        if pos.line == at.line {
            if lines_added == 0 {
                pos.byte += inserted_len;
            } else {
                pos.byte = pos.byte - at.byte + last_line_extra;
            }
        }
        pos.line += lines_added;
    }
}

fn fixup_position_after_delete(pos: &mut Position, start: Position, end: Position, line_delta: usize) {
    if *pos <= start {
        return;
    }
    if *pos >= end {
        if pos.line == end.line {
            pos.byte = pos.byte - end.byte + start.byte;
        }
        pos.line -= line_delta;
        return;
    }
    // start < pos < end: collapses into the deletion's start.
    *pos = start;
}

fn clamp_mark(pos: &mut Position, rope: &Rope) {
    let line_count = rope.len_lines();
    if line_count == 0 {
        pos.line = 0;
        pos.byte = 0;
        return;
    }
    if pos.line >= line_count {
        pos.line = line_count - 1;
    }
    let mut s = rope.line(pos.line).to_string();
    if s.ends_with('\n') {
        s.pop();
    }
    if pos.byte > s.len() {
        pos.byte = s.len();
    }
}

/// Outcome of a regex mark-motion search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub wrapped: bool,
    pub start: usize,
    pub end: usize,
}

/// Grapheme and width utilities. These are pure helpers operating on a single line.
pub mod grapheme {
    use crate::egc_width;
    use unicode_segmentation::UnicodeSegmentation;

    /// Iterate grapheme clusters in a line.
    pub fn iter(line: &str) -> impl Iterator<Item = &str> {
        line.graphemes(true)
    }

    /// Previous grapheme boundary (returns 0 if already at or below 1st boundary).
    pub fn prev_boundary(line: &str, byte: usize) -> usize {
        if byte == 0 || byte > line.len() {
            return 0;
        }
        let mut last = 0;
        for (idx, _) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            last = idx;
        }
        last
    }

    /// Next grapheme boundary (returns line.len() if at or beyond end).
    pub fn next_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        for (idx, _) in line.grapheme_indices(true) {
            if idx > byte {
                return idx;
            }
        }
        line.len()
    }

    /// Compute visual column (terminal cells) up to (but not including) byte offset.
    pub fn visual_col(line: &str, byte: usize) -> usize {
        let mut col = 0;
        for (idx, g) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            col += egc_width(g) as usize;
        }
        col
    }

    /// Width in terminal cells of this grapheme cluster.
    pub fn cluster_width(g: &str) -> usize {
        egc_width(g) as usize
    }

    /// Naive word classification: alphanumeric or underscore start.
    pub fn is_word(g: &str) -> bool {
        g.chars()
            .next()
            .map(|c| c == '_' || c.is_alphanumeric())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::grapheme;
    use super::*;
    use unicode_segmentation::UnicodeSegmentation;

    #[test]
    fn create_buffer_and_read_line() {
        let b = Buffer::from_str("test", "hello\nworld").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line(0).unwrap(), "hello\n");
        assert_eq!(b.line(1).unwrap(), "world");
    }

    #[test]
    fn grapheme_basic_emoji() {
        let s = "a😀b";
        let bytes_a = 0;
        let bytes_emoji = grapheme::next_boundary(s, grapheme::next_boundary(s, bytes_a));
        assert_eq!(
            grapheme::prev_boundary(s, bytes_emoji),
            grapheme::next_boundary(s, bytes_a)
        );
        let vcol_emoji = grapheme::visual_col(s, bytes_emoji);
        assert!(vcol_emoji >= 1);
    }

    #[test]
    fn grapheme_combining_mark() {
        let s = "e\u{0301}";
        let nb = grapheme::next_boundary(s, 0);
        assert_eq!(nb, s.len());
        assert_eq!(grapheme::prev_boundary(s, nb), 0);
    }

    #[test]
    fn insert_grapheme_middle() {
        let mut b = Buffer::from_str("t", "abc").unwrap();
        let mut pos = Position::new(0, 1);
        b.insert_grapheme(&mut pos, "😀");
        let line = b.line(0).unwrap();
        assert!(line.starts_with("a"));
        assert!(line.contains("😀"));
        assert_eq!(pos.byte, 1 + "😀".len());
    }

    #[test]
    fn insert_newline_split() {
        let mut b = Buffer::from_str("t", "abcd").unwrap();
        let mut pos = Position::new(0, 2);
        b.insert_newline(&mut pos);
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line(0).unwrap(), "ab\n");
        assert_eq!(b.line(1).unwrap(), "cd");
        assert_eq!(pos.line, 1);
        assert_eq!(pos.byte, 0);
    }

    #[test]
    fn delete_grapheme_before_join_lines() {
        let mut b = Buffer::from_str("t", "ab\ncd").unwrap();
        let mut pos = Position::new(1, 0);
        b.delete_grapheme_before(&mut pos);
        assert_eq!(b.line_count(), 1);
        let line = b.line(0).unwrap();
        assert_eq!(line, "abcd");
        assert_eq!(pos.line, 0);
        assert_eq!(pos.byte, 2);
    }

    #[test]
    fn mark_survives_insert_before_it() {
        let mut b = Buffer::from_str("t", "abcdef").unwrap();
        let id = b.add_mark(Position::new(0, 4));
        let mut insert_pos = Position::new(0, 0);
        b.insert_grapheme(&mut insert_pos, "XY");
        assert_eq!(b.mark_pos(id), Some(Position::new(0, 6)));
    }

    #[test]
    fn mark_survives_delete_spanning_it_collapses_to_start() {
        let mut b = Buffer::from_str("t", "abcdef").unwrap();
        let id = b.add_mark(Position::new(0, 3));
        let start_char = 1;
        let end_char = 5;
        let abs_start = b.absolute_byte_index(&Position::new(0, start_char));
        let abs_end = b.absolute_byte_index(&Position::new(0, end_char));
        b.delete_bytes(abs_start, abs_end);
        b.fixup_marks_after_delete(Position::new(0, start_char), Position::new(0, end_char));
        assert_eq!(b.mark_pos(id), Some(Position::new(0, 1)));
    }

    #[test]
    fn mark_survives_insert_across_newline() {
        let mut b = Buffer::from_str("t", "abc\ndef").unwrap();
        let id = b.add_mark(Position::new(1, 1));
        let mut insert_pos = Position::new(0, 1);
        b.insert_newline(&mut insert_pos);
        // buffer is now "a\nbc\ndef"; mark should have shifted down one line.
        assert_eq!(b.mark_pos(id), Some(Position::new(2, 1)));
    }

    #[test]
    fn add_and_remove_styling_rule() {
        let mut b = Buffer::from_str("t", "abcdef").unwrap();
        let id = b.add_styling_rule(Position::new(0, 0), Position::new(0, 3), StyleKind::ReverseVideo);
        assert!(b.has_styling_rule(id));
        assert_eq!(b.styling_rule_span(id), Some((Position::new(0, 0), Position::new(0, 3))));
        b.remove_styling_rule(id);
        assert!(!b.has_styling_rule(id));
    }

    #[test]
    fn mark_anchored_rule_tracks_cursor_motion() {
        let mut b = Buffer::from_str("t", "abcdef").unwrap();
        let anchor = b.add_mark(Position::new(0, 1));
        let cursor = b.add_mark(Position::new(0, 1));
        let id = b.add_mark_styling_rule(anchor, cursor, StyleKind::ReverseVideo);
        b.move_mark_by(cursor, 3);
        assert_eq!(
            b.styling_rule_span(id),
            Some((Position::new(0, 1), Position::new(0, 4)))
        );
    }

    #[test]
    fn regex_search_wraps() {
        let mut b = Buffer::from_str("t", "foo bar foo").unwrap();
        let id = b.add_mark(Position::new(0, 9));
        let re = regex::Regex::new("foo").unwrap();
        let outcome = b.move_mark_to_next_regex_match(id, &re).unwrap();
        assert!(outcome.wrapped);
        assert_eq!(b.mark_pos(id), Some(Position::new(0, 0)));
    }
}
