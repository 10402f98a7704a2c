//! Cut, copy, and uncut (spec §4.2).

use crate::for_each_non_sleeping_cursor;
use core_model::CommandContext;
use core_state::CommandOutcome;
use core_text::Position;

/// Per non-sleeping cursor: if no selection is anchored, select the whole
/// current line (including its trailing newline, if any). Capture the
/// selected text into the cursor's cut buffer, and delete it when cutting.
fn cut_or_copy(ctx: &mut CommandContext, delete: bool) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let had_selection = cursor.sel_bound.is_some();
        let (start_mark, end_mark) = match cursor.sel_bound {
            Some(bound) => (cursor.mark, bound),
            None => {
                let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
                let line_start = Position::new(pos.line, 0);
                let line_end = if pos.line + 1 < buf.line_count() {
                    Position::new(pos.line + 1, 0)
                } else {
                    Position::new(pos.line, buf.line_byte_len(pos.line))
                };
                (buf.add_mark(line_start), buf.add_mark(line_end))
            }
        };

        let text = buf.get_between_marks(start_mark, end_mark).unwrap_or_default();
        cursor.cut_buffer = text;
        if delete {
            buf.delete_between_marks(start_mark, end_mark);
        }

        if had_selection {
            if let Some(rule) = cursor.sel_rule.take() {
                buf.remove_styling_rule(rule);
            }
            buf.destroy_mark(end_mark);
            cursor.sel_bound = None;
        } else {
            buf.destroy_mark(start_mark);
            buf.destroy_mark(end_mark);
        }
        cursor.sticky_col = None;
    })
}

pub fn cut(ctx: &mut CommandContext) -> CommandOutcome {
    cut_or_copy(ctx, true)
}

pub fn copy(ctx: &mut CommandContext) -> CommandOutcome {
    cut_or_copy(ctx, false)
}

/// Insert each cursor's cut buffer at its mark.
pub fn uncut(ctx: &mut CommandContext) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        if cursor.cut_buffer.is_empty() {
            return;
        }
        let text = cursor.cut_buffer.clone();
        buf.insert_before_mark(cursor.mark, &text);
    })
}
