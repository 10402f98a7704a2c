//! Cursor motion commands (spec §4.2).
//!
//! Every motion applies to all non-sleeping cursors, then rectifies the
//! active view's viewport. Sticky column (spec §9 Open Questions): set on
//! horizontal motion/insert, consulted (not overwritten) on vertical
//! motion, cleared on horizontal motion.

use crate::boundary;
use crate::util::{byte_for_visual_col, line_sans_newline};
use crate::for_each_non_sleeping_cursor;
use core_model::CommandContext;
use core_state::CommandOutcome;
use core_text::{Position, grapheme};

fn active_cursor_position(ctx: &CommandContext) -> Option<Position> {
    let view = ctx.editor.view(ctx.view)?;
    let cursor = view.active_cursor();
    let buf = ctx.editor.buffer(view.buffer)?;
    buf.mark_pos(cursor.mark)
}

fn rectify(ctx: &mut CommandContext) {
    let Some(pos) = active_cursor_position(ctx) else {
        return;
    };
    if let Some(view) = ctx.editor.view_mut(ctx.view) {
        view.rectify_viewport(pos.line, pos.byte);
    }
}

pub fn move_left(ctx: &mut CommandContext) -> CommandOutcome {
    horizontal(ctx, -1)
}

pub fn move_right(ctx: &mut CommandContext) -> CommandOutcome {
    horizontal(ctx, 1)
}

fn horizontal(ctx: &mut CommandContext, delta: i64) -> CommandOutcome {
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.move_mark_by(cursor.mark, delta);
        cursor.sticky_col = None;
    });
    rectify(ctx);
    outcome
}

fn vertical(ctx: &mut CommandContext, delta: i64) -> CommandOutcome {
    let outcome = vertical_raw(ctx, delta);
    rectify(ctx);
    outcome
}

pub fn move_up(ctx: &mut CommandContext) -> CommandOutcome {
    vertical(ctx, -1)
}

pub fn move_down(ctx: &mut CommandContext) -> CommandOutcome {
    vertical(ctx, 1)
}

pub fn move_bol(ctx: &mut CommandContext) -> CommandOutcome {
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.move_mark_bol(cursor.mark);
        cursor.sticky_col = None;
    });
    rectify(ctx);
    outcome
}

pub fn move_eol(ctx: &mut CommandContext) -> CommandOutcome {
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.move_mark_eol(cursor.mark);
        cursor.sticky_col = None;
    });
    rectify(ctx);
    outcome
}

pub fn move_beginning(ctx: &mut CommandContext) -> CommandOutcome {
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.move_mark_beginning(cursor.mark);
        cursor.sticky_col = None;
    });
    rectify(ctx);
    outcome
}

pub fn move_end(ctx: &mut CommandContext) -> CommandOutcome {
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.move_mark_end(cursor.mark);
        cursor.sticky_col = None;
    });
    rectify(ctx);
    outcome
}

pub fn move_page_up(ctx: &mut CommandContext) -> CommandOutcome {
    page(ctx, -1)
}

pub fn move_page_down(ctx: &mut CommandContext) -> CommandOutcome {
    page(ctx, 1)
}

fn page(ctx: &mut CommandContext, dir: i64) -> CommandOutcome {
    let height = ctx
        .editor
        .view(ctx.view)
        .map(|v| v.region.height.max(1) as i64)
        .unwrap_or(1);
    let outcome = vertical_raw(ctx, dir * height);
    if let Some(pos) = active_cursor_position(ctx) {
        if let Some(view) = ctx.editor.view_mut(ctx.view) {
            view.anchor_viewport_top(pos.line);
        }
    }
    outcome
}

/// Shared vertical-move body that doesn't rectify (callers choose how the
/// viewport reacts: `rectify` for move_up/down, `anchor_viewport_top` for
/// page moves).
fn vertical_raw(ctx: &mut CommandContext, delta: i64) -> CommandOutcome {
    for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
        let line = line_sans_newline(buf, pos.line);
        let target_col = cursor.sticky_col.unwrap_or_else(|| grapheme::visual_col(&line, pos.byte));
        if cursor.sticky_col.is_none() {
            cursor.sticky_col = Some(target_col);
        }
        buf.move_mark_vert(cursor.mark, delta);
        let new_pos = buf.mark_pos(cursor.mark).unwrap();
        let new_line = line_sans_newline(buf, new_pos.line);
        let byte = byte_for_visual_col(&new_line, target_col);
        buf.move_mark_to(cursor.mark, new_pos.line, byte);
    })
}

/// Move to an absolute 1-indexed line number given in `ctx.param`.
pub fn move_to_line(ctx: &mut CommandContext) -> CommandOutcome {
    let Some(line) = ctx.param.as_ref().and_then(|p| p.trim().parse::<usize>().ok()) else {
        return CommandOutcome::Failed("move_to_line requires a numeric parameter".into());
    };
    let target = line.saturating_sub(1);
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.move_mark_to(cursor.mark, target, 0);
        cursor.sticky_col = None;
    });
    if let Some(pos) = active_cursor_position(ctx) {
        if let Some(view) = ctx.editor.view_mut(ctx.view) {
            view.center_viewport(pos.line);
        }
    }
    outcome
}

pub fn move_word_forward(ctx: &mut CommandContext) -> CommandOutcome {
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
        let line = line_sans_newline(buf, pos.line);
        let target = boundary::forward(&line, pos.byte);
        buf.move_mark_to(cursor.mark, pos.line, target);
        cursor.sticky_col = None;
    });
    rectify(ctx);
    outcome
}

pub fn move_word_backward(ctx: &mut CommandContext) -> CommandOutcome {
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        let pos = buf.mark_pos(cursor.mark).unwrap_or(Position::origin());
        let line = line_sans_newline(buf, pos.line);
        let target = boundary::backward(&line, pos.byte);
        buf.move_mark_to(cursor.mark, pos.line, target);
        cursor.sticky_col = None;
    });
    rectify(ctx);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedPrompts;
    use core_events::{Chord, KeyToken};
    use core_model::Editor;
    use core_text::Buffer;

    fn ctx_for<'a>(
        ed: &'a mut Editor,
        view: core_model::ViewId,
        prompts: &'a mut ScriptedPrompts,
    ) -> CommandContext<'a> {
        CommandContext {
            editor: ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('x')),
            param: None,
            prompt_host: prompts,
        }
    }

    #[test]
    fn move_left_at_origin_stays_put() {
        let buf = Buffer::from_str("t", "abc").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let view = ed.active_view;
        let mut prompts = ScriptedPrompts::default();
        let mut ctx = ctx_for(&mut ed, view, &mut prompts);
        move_left(&mut ctx);
        let v = ed.view(view).unwrap();
        let buf = ed.buffer(v.buffer).unwrap();
        assert_eq!(buf.mark_pos(v.active_cursor().mark), Some(Position::origin()));
    }

    #[test]
    fn move_down_twice_restores_sticky_column_after_short_line() {
        let buf = Buffer::from_str("t", "abcdef\nxy\nabcdef\n").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let view = ed.active_view;
        let buffer_id = ed.view(view).unwrap().buffer;
        let mark = ed.view(view).unwrap().active_cursor().mark;
        ed.buffer_mut(buffer_id).unwrap().move_mark_to(mark, 0, 5);
        let mut prompts = ScriptedPrompts::default();
        {
            let mut ctx = ctx_for(&mut ed, view, &mut prompts);
            move_down(&mut ctx); // lands clamped on short "xy" line
            move_down(&mut ctx); // back to a full line; sticky col should restore to 5
        }
        let pos = ed.buffer(buffer_id).unwrap().mark_pos(mark).unwrap();
        assert_eq!(pos, Position::new(2, 5));
    }

    #[test]
    fn move_to_line_centers_viewport() {
        let content: String = (0..50).map(|i| format!("line{i}\n")).collect();
        let buf = Buffer::from_str("t", &content).unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let view = ed.active_view;
        let mut prompts = ScriptedPrompts::default();
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('x')),
            param: Some("30".to_string()),
            prompt_host: &mut prompts,
        };
        move_to_line(&mut ctx);
        let v = ed.view(view).unwrap();
        let buf = ed.buffer(v.buffer).unwrap();
        assert_eq!(buf.mark_pos(v.active_cursor().mark).unwrap().line, 29);
    }
}
