//! Split and view-navigation commands (spec §4.2, §4.6).

use core_model::CommandContext;
use core_model::layout::Orientation;
use core_state::CommandOutcome;

fn split(ctx: &mut CommandContext, orientation: Orientation) -> CommandOutcome {
    let factor = ctx
        .param
        .as_ref()
        .and_then(|p| p.trim().parse::<f32>().ok())
        .unwrap_or(0.5);
    match ctx.editor.split(ctx.view, orientation, factor) {
        Ok(child) => {
            ctx.editor.set_active(child);
            CommandOutcome::Ok
        }
        Err(e) => CommandOutcome::Failed(e.to_string()),
    }
}

pub fn split_vertical(ctx: &mut CommandContext) -> CommandOutcome {
    split(ctx, Orientation::Vertical)
}

pub fn split_horizontal(ctx: &mut CommandContext) -> CommandOutcome {
    split(ctx, Orientation::Horizontal)
}

fn adjacent(ctx: &mut CommandContext, forward: bool) -> CommandOutcome {
    match ctx.editor.adjacent_edit_view(ctx.view, forward) {
        Some(v) => {
            ctx.editor.set_active(v);
            CommandOutcome::Ok
        }
        None => CommandOutcome::Failed("no adjacent edit view".into()),
    }
}

pub fn next_view(ctx: &mut CommandContext) -> CommandOutcome {
    adjacent(ctx, true)
}

pub fn prev_view(ctx: &mut CommandContext) -> CommandOutcome {
    adjacent(ctx, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedPrompts;
    use core_events::{Chord, KeyToken};
    use core_model::Editor;
    use core_text::Buffer;

    #[test]
    fn split_vertical_creates_and_activates_child() {
        let buf = Buffer::from_str("t", "hello").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let root = ed.active_view;
        let mut prompts = ScriptedPrompts::default();
        let mut ctx = CommandContext {
            editor: &mut ed,
            view: root,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('x')),
            param: None,
            prompt_host: &mut prompts,
        };
        split_vertical(&mut ctx);
        assert_eq!(ed.views().count(), 2);
        assert_ne!(ed.active_view, root);
    }

    #[test]
    fn next_view_wraps_back_to_root() {
        let buf = Buffer::from_str("t", "hello").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let root = ed.active_view;
        let mut prompts = ScriptedPrompts::default();
        {
            let mut ctx = CommandContext {
                editor: &mut ed,
                view: root,
                cursor_index: 0,
                chord: Chord::plain(KeyToken::Char('x')),
                param: None,
                prompt_host: &mut prompts,
            };
            split_vertical(&mut ctx);
        }
        let child = ed.active_view;
        {
            let mut ctx = CommandContext {
                editor: &mut ed,
                view: child,
                cursor_index: 0,
                chord: Chord::plain(KeyToken::Char('x')),
                param: None,
                prompt_host: &mut prompts,
            };
            next_view(&mut ctx);
        }
        assert_eq!(ed.active_view, root);
    }
}
