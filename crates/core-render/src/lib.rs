//! Draws a `core_model::Editor`'s views, buffers, cursors, and styling
//! rules into a `core_terminal::CellGrid` (spec §4.6/§9: "draw as a pure
//! function of view geometry + buffer + styling rules, no hidden state").
//!
//! There is deliberately no incremental/dirty-tracking machinery here: the
//! whole screen is recomputed from `Editor` on every redraw, and
//! `core_terminal::present` is what turns that into a minimal terminal
//! write by diffing against the previously presented grid. Two render
//! passes of the same `Editor` state always produce the same `CellGrid`.

pub mod status;
pub mod viewport;

use core_model::{Editor, View, ViewId};
use core_terminal::{CellGrid, Color};
use core_text::{Buffer, Position, StyleAnchor, StyleKind, StylingRule, grapheme};

/// Redraw every view plus the status line for `active_view` into `grid`.
/// `grid` is resized first if the editor's screen dimensions changed.
pub fn render(editor: &Editor, grid: &mut CellGrid) {
    if grid.width() != editor.screen_width || grid.height() != editor.screen_height {
        grid.resize(editor.screen_width, editor.screen_height);
    }
    grid.clear();
    for view in editor.views() {
        if let Some(buf) = editor.buffer(view.buffer) {
            draw_view(view, buf, grid);
        }
    }
    draw_status_line(editor, grid);
}

fn line_sans_newline(buf: &Buffer, idx: usize) -> String {
    let mut s = buf.line(idx).unwrap_or_default();
    if s.ends_with('\n') {
        s.pop();
    }
    s
}

fn draw_view(view: &View, buf: &Buffer, grid: &mut CellGrid) {
    let region = view.region;
    for row in 0..region.height {
        let line_idx = view.viewport_line + row as usize;
        let y = region.y + row;
        if line_idx >= buf.line_count() {
            continue;
        }
        let line = line_sans_newline(buf, line_idx);
        draw_line_numbers(view, line_idx, y, grid);
        draw_line_text(view, &line, y, grid);
    }
    draw_styling_rules(view, buf, grid);
    for cursor in &view.cursors {
        draw_cursor(view, buf, cursor, grid);
    }
}

fn draw_line_numbers(view: &View, line_idx: usize, y: u16, grid: &mut CellGrid) {
    if view.line_number_width == 0 {
        return;
    }
    let width = (view.line_number_width as usize).saturating_sub(1);
    let text = format!("{:>width$} ", line_idx + 1, width = width);
    for (i, ch) in text.chars().enumerate() {
        let x = view.region.x + i as u16;
        if x < view.region.x + view.line_number_width {
            grid.write_cell(x, y, ch, Color::DarkGrey, Color::Reset);
        }
    }
}

fn draw_line_text(view: &View, line: &str, y: u16, grid: &mut CellGrid) {
    let gutter = view.line_number_width;
    let text_width = view.region.width.saturating_sub(gutter) as usize;
    let mut col = 0usize;
    for g in grapheme::iter(line) {
        let w = grapheme::cluster_width(g);
        if w > 0 && col >= view.viewport_col {
            let rel = col - view.viewport_col;
            if rel < text_width {
                let ch = g.chars().next().unwrap_or(' ');
                grid.write_cell(view.region.x + gutter + rel as u16, y, ch, Color::Reset, Color::Reset);
            }
        }
        col += w;
    }
}

/// Resolve a styling rule's anchor to a `[start, end)` position pair,
/// following the tracked marks for selection-bound rules (spec §3: "must
/// follow the cursor as it moves").
fn resolve_anchor(buf: &Buffer, rule: &StylingRule) -> Option<(Position, Position)> {
    match rule.anchor {
        StyleAnchor::Fixed(a, b) => Some((a, b)),
        StyleAnchor::Marks(a, b) => {
            let pa = buf.mark_pos(a)?;
            let pb = buf.mark_pos(b)?;
            if pa <= pb { Some((pa, pb)) } else { Some((pb, pa)) }
        }
    }
}

fn draw_styling_rules(view: &View, buf: &Buffer, grid: &mut CellGrid) {
    for (_, rule) in buf.styling_rules() {
        let Some((start, end)) = resolve_anchor(buf, rule) else {
            continue;
        };
        let StyleKind::ReverseVideo = rule.kind;
        for line_idx in start.line..=end.line.min(buf.line_count().saturating_sub(1)) {
            let Some(y) = viewport::screen_row(view, line_idx) else {
                continue;
            };
            let line = line_sans_newline(buf, line_idx);
            let row_start = if line_idx == start.line { start.byte } else { 0 };
            let row_end = if line_idx == end.line { end.byte } else { line.len() };
            invert_range(view, &line, row_start, row_end, view.region.y + y, grid);
        }
    }
}

fn invert_range(view: &View, line: &str, start_byte: usize, end_byte: usize, y: u16, grid: &mut CellGrid) {
    let mut byte = 0usize;
    for g in grapheme::iter(line) {
        let next = byte + g.len();
        if next > start_byte && byte < end_byte {
            if let Some(x) = viewport::screen_col(view, line, byte) {
                if let Some(cell) = grid.get(view.region.x + x, y) {
                    grid.write_cell(view.region.x + x, y, cell.ch, cell.bg, cell.fg);
                }
            }
        }
        byte = next;
    }
}

fn draw_cursor(view: &View, buf: &Buffer, cursor: &core_model::Cursor, grid: &mut CellGrid) {
    let Some(pos) = buf.mark_pos(cursor.mark) else {
        return;
    };
    let Some(y) = viewport::screen_row(view, pos.line) else {
        return;
    };
    let line = line_sans_newline(buf, pos.line);
    let Some(x) = viewport::screen_col(view, &line, pos.byte) else {
        return;
    };
    let sx = view.region.x + x;
    let sy = view.region.y + y;
    let (fg, bg) = if cursor.is_asleep {
        (Color::Black, Color::DarkGrey)
    } else {
        (Color::Black, Color::White)
    };
    let ch = grid.get(sx, sy).map(|c| c.ch).unwrap_or(' ');
    grid.write_cell(sx, sy, ch, fg, bg);
}

fn draw_status_line(editor: &Editor, grid: &mut CellGrid) {
    let y = editor.screen_height.saturating_sub(1);
    let active: Option<ViewId> = editor.active_edit.or(Some(editor.active_view));
    let Some(view) = active.and_then(|id| editor.view(id)) else {
        return;
    };
    let text = status::compose(editor, view);
    for (i, ch) in text.chars().enumerate() {
        if (i as u16) >= editor.screen_width {
            break;
        }
        grid.write_cell(i as u16, y, ch, Color::Black, Color::Grey);
    }
    for x in (text.chars().count() as u16)..editor.screen_width {
        grid.write_cell(x, y, ' ', Color::Black, Color::Grey);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_terminal::CellGrid;
    use core_text::Buffer;

    #[test]
    fn renders_buffer_text_into_grid() {
        let buf = Buffer::from_str("t", "hi\n").unwrap();
        let ed = Editor::new(buf, 10, 4);
        let mut grid = CellGrid::new(10, 4);
        render(&ed, &mut grid);
        assert_eq!(grid.get(0, 0).unwrap().ch, 'h');
        assert_eq!(grid.get(1, 0).unwrap().ch, 'i');
    }

    #[test]
    fn cursor_cell_is_inverted() {
        let buf = Buffer::from_str("t", "hi\n").unwrap();
        let ed = Editor::new(buf, 10, 4);
        let mut grid = CellGrid::new(10, 4);
        render(&ed, &mut grid);
        let cell = grid.get(0, 0).unwrap();
        assert_eq!(cell.fg, Color::Black);
        assert_eq!(cell.bg, Color::White);
    }

    #[test]
    fn status_line_shows_buffer_name() {
        let buf = Buffer::from_str("scratch.txt", "x").unwrap();
        let ed = Editor::new(buf, 20, 4);
        let mut grid = CellGrid::new(20, 4);
        render(&ed, &mut grid);
        let row: String = (0..20).map(|x| grid.get(x, 3).unwrap().ch).collect();
        assert!(row.contains("scratch.txt"));
    }
}
