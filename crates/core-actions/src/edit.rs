//! Insertion and deletion commands (spec §4.2).

use crate::util::line_sans_newline;
use crate::{boundary, for_each_non_sleeping_cursor};
use core_model::CommandContext;
use core_state::CommandOutcome;
use core_text::{Buffer, Position, grapheme};

/// Insert the chord's printable character (or Enter/Tab) before every
/// non-sleeping cursor. Chords that don't decode to insertable data are a
/// no-op (spec §4.2 "insert data").
pub fn insert_data(ctx: &mut CommandContext) -> CommandOutcome {
    let Some(ch) = ctx.chord.insertable_char() else {
        return CommandOutcome::Ok;
    };
    let mut s = String::new();
    s.push(ch);
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.insert_before_mark(cursor.mark, &s);
        cursor.sticky_col = None;
    })
}

/// Insert spaces sufficient to round the cursor's column up to the next
/// multiple of the view's tab width, or a literal tab when the view has
/// hard tabs enabled.
pub fn insert_tab(ctx: &mut CommandContext) -> CommandOutcome {
    let view_id = ctx.view;
    let (tab_to_space, tab_width) = match ctx.editor.view(view_id) {
        Some(v) => (v.tab_to_space, v.tab_width.max(1)),
        None => return CommandOutcome::Failed("no such view".into()),
    };
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        if tab_to_space {
            let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
            let line = line_sans_newline(buf, pos.line);
            let col = grapheme::visual_col(&line, pos.byte);
            let spaces = tab_width - (col % tab_width);
            let text: String = std::iter::repeat(' ').take(spaces).collect();
            buf.insert_before_mark(cursor.mark, &text);
        } else {
            buf.insert_before_mark(cursor.mark, "\t");
        }
        cursor.sticky_col = None;
    })
}

fn grapheme_width_before(buf: &Buffer, pos: Position) -> usize {
    if pos.byte == 0 {
        if pos.line == 0 { 0 } else { 1 }
    } else {
        let line = line_sans_newline(buf, pos.line);
        pos.byte - grapheme::prev_boundary(&line, pos.byte)
    }
}

fn grapheme_width_after(buf: &Buffer, pos: Position) -> usize {
    let len = buf.line_byte_len(pos.line);
    if pos.byte >= len {
        if pos.line + 1 >= buf.line_count() { 0 } else { 1 }
    } else {
        let line = line_sans_newline(buf, pos.line);
        grapheme::next_boundary(&line, pos.byte) - pos.byte
    }
}

/// Delete one character before each active cursor mark (backspace).
pub fn delete_before(ctx: &mut CommandContext) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
        let width = grapheme_width_before(buf, pos);
        if width > 0 {
            buf.delete_before_mark(cursor.mark, width);
        }
        cursor.sticky_col = None;
    })
}

/// Delete one character after each active cursor mark (delete-forward).
pub fn delete_after(ctx: &mut CommandContext) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
        let width = grapheme_width_after(buf, pos);
        if width > 0 {
            buf.delete_after_mark(cursor.mark, width);
        }
        cursor.sticky_col = None;
    })
}

/// Delete from the cursor back to the previous word boundary on the same
/// line (no-op at beginning of line).
pub fn delete_word_before(ctx: &mut CommandContext) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
        let line = line_sans_newline(buf, pos.line);
        let target = boundary::backward(&line, pos.byte);
        if target < pos.byte {
            buf.delete_before_mark(cursor.mark, pos.byte - target);
        }
        cursor.sticky_col = None;
    })
}

/// Delete from the cursor forward to the next word boundary on the same
/// line (no-op at end of line).
pub fn delete_word_after(ctx: &mut CommandContext) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
        let line = line_sans_newline(buf, pos.line);
        let target = boundary::forward(&line, pos.byte);
        if target > pos.byte {
            buf.delete_after_mark(cursor.mark, target - pos.byte);
        }
        cursor.sticky_col = None;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedPrompts;
    use core_events::{Chord, KeyToken, NamedKey};
    use core_model::Editor;
    use core_text::Buffer;

    fn editor_with(content: &str) -> Editor {
        let buf = Buffer::from_str("t", content).unwrap();
        Editor::new(buf, 80, 24)
    }

    #[test]
    fn tab_expansion_rounds_up_to_next_stop() {
        let mut ed = editor_with("");
        let view = ed.active_view;
        let mut prompts = ScriptedPrompts::default();
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Named(NamedKey::Tab)),
            param: None,
            prompt_host: &mut prompts,
        };
        insert_tab(&mut ctx);
        let buffer_id = ed_buffer(&ed, view);
        assert_eq!(ed.buffer(buffer_id).unwrap().line(0).unwrap(), "    ");
    }

    fn ed_buffer(ed: &Editor, view: core_model::ViewId) -> core_model::BufferId {
        ed.view(view).unwrap().buffer
    }

    #[test]
    fn insert_data_applies_to_every_non_sleeping_cursor() {
        let mut ed = editor_with("a\nb\n");
        let view = ed.active_view;
        let buffer_id = ed_buffer(&ed, view);
        // Second cursor at the start of line 1, awake.
        let mark2 = ed.buffer_mut(buffer_id).unwrap().add_mark(Position::new(1, 0));
        {
            let v = ed.view_mut(view).unwrap();
            v.cursors.push(core_model::Cursor::new(mark2));
        }
        let mut prompts = ScriptedPrompts::default();
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('X')),
            param: None,
            prompt_host: &mut prompts,
        };
        insert_data(&mut ctx);
        let buf = ed.buffer(buffer_id).unwrap();
        assert_eq!(buf.line(0).unwrap(), "Xa\n");
        assert_eq!(buf.line(1).unwrap(), "Xb\n");
    }

    #[test]
    fn delete_before_joins_lines_at_column_zero() {
        let mut ed = editor_with("ab\ncd");
        let view = ed.active_view;
        let buffer_id = ed_buffer(&ed, view);
        let mark = ed.view(view).unwrap().active_cursor().mark;
        ed.buffer_mut(buffer_id).unwrap().move_mark_to(mark, 1, 0);
        let mut prompts = ScriptedPrompts::default();
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Named(NamedKey::Backspace)),
            param: None,
            prompt_host: &mut prompts,
        };
        delete_before(&mut ctx);
        assert_eq!(ed.buffer(buffer_id).unwrap().line(0).unwrap(), "abcd");
    }
}
