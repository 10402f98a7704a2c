//! Selection and sleeping-cursor commands (spec §4.2).

use crate::for_each_non_sleeping_cursor;
use core_model::{Cursor, CommandContext};
use core_state::CommandOutcome;
use core_text::{Position, StyleKind};

/// Toggle the selection bound on every non-sleeping cursor: create one
/// anchored at the current mark if unanchored, or destroy it (and its
/// highlight rule) if anchored.
pub fn toggle_sel_bound(ctx: &mut CommandContext) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| match cursor.sel_bound {
        Some(bound) => {
            buf.destroy_mark(bound);
            if let Some(rule) = cursor.sel_rule.take() {
                buf.remove_styling_rule(rule);
            }
            cursor.sel_bound = None;
        }
        None => {
            let bound = buf
                .clone_mark(cursor.mark)
                .unwrap_or_else(|| buf.add_mark(Position::origin()));
            let rule = buf.add_mark_styling_rule(bound, cursor.mark, StyleKind::ReverseVideo);
            cursor.sel_bound = Some(bound);
            cursor.sel_rule = Some(rule);
        }
    })
}

/// Add a new, sleeping cursor at the active cursor's position (spec §4.2
/// "drop sleeping cursor"). Applies only to the active cursor's context,
/// unlike the edit/move commands.
pub fn drop_sleeping_cursor(ctx: &mut CommandContext) -> CommandOutcome {
    let view_id = ctx.view;
    let Some((buf, view)) = ctx.editor.buffer_and_view_mut(view_id) else {
        return CommandOutcome::Failed("no such view".into());
    };
    let active_mark = view.active_cursor().mark;
    let pos = buf.mark_pos(active_mark).unwrap_or(Position::origin());
    let mark = buf.add_mark(pos);
    let mut cursor = Cursor::new(mark);
    cursor.is_asleep = true;
    view.cursors.push(cursor);
    CommandOutcome::Ok
}

/// Wake every sleeping cursor in the view.
pub fn wake_sleeping_cursors(ctx: &mut CommandContext) -> CommandOutcome {
    let Some(view) = ctx.editor.view_mut(ctx.view) else {
        return CommandOutcome::Failed("no such view".into());
    };
    for c in view.cursors.iter_mut() {
        c.is_asleep = false;
    }
    CommandOutcome::Ok
}

/// Collapse back to a single cursor: the active one survives, every other
/// cursor's marks/rules are destroyed.
pub fn remove_extra_cursors(ctx: &mut CommandContext) -> CommandOutcome {
    let view_id = ctx.view;
    let Some((buf, view)) = ctx.editor.buffer_and_view_mut(view_id) else {
        return CommandOutcome::Failed("no such view".into());
    };
    let active_idx = view.active_cursor;
    let survivor = view.cursors[active_idx].clone();
    for (idx, c) in view.cursors.iter().enumerate() {
        if idx == active_idx {
            continue;
        }
        buf.destroy_mark(c.mark);
        if let Some(sel) = c.sel_bound {
            buf.destroy_mark(sel);
        }
        if let Some(rule) = c.sel_rule {
            buf.remove_styling_rule(rule);
        }
    }
    view.cursors = vec![survivor];
    view.active_cursor = 0;
    CommandOutcome::Ok
}
