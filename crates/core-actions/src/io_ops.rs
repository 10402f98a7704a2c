//! File and view lifecycle commands (spec §4.2): save, open, reload,
//! close, quit.

use core_model::CommandContext;
use core_model::ViewType;
use core_model::layout::LayoutRegion;
use core_state::{CommandOutcome, PromptKind};
use core_text::Buffer;
use std::path::PathBuf;

/// Save the active view's buffer, prompting for a path if it has none yet.
pub fn save(ctx: &mut CommandContext) -> CommandOutcome {
    let view_id = ctx.view;
    let Some(view) = ctx.editor.view(view_id) else {
        return CommandOutcome::Failed("no such view".into());
    };
    let buffer_id = view.buffer;
    let existing_path = ctx.editor.buffer(buffer_id).and_then(|b| b.path.clone());
    let path = match existing_path {
        Some(p) => Some(p),
        None => ctx
            .prompt_host
            .run_prompt(&mut *ctx.editor, view_id, PromptKind::Input)
            .map(PathBuf::from),
    };
    let Some(path) = path else {
        return CommandOutcome::Ok;
    };
    match ctx.editor.buffer_mut(buffer_id) {
        Some(buf) => match buf.buffer_save_as(&path) {
            Ok(()) => CommandOutcome::Ok,
            Err(e) => CommandOutcome::Failed(e.to_string()),
        },
        None => CommandOutcome::Failed("no such buffer".into()),
    }
}

/// Prompt for a path, open it as a new buffer, and switch to a new edit
/// view over it sized to the current view's region.
pub fn open(ctx: &mut CommandContext) -> CommandOutcome {
    let view_id = ctx.view;
    let Some(path) = ctx.prompt_host.run_prompt(&mut *ctx.editor, view_id, PromptKind::Input) else {
        return CommandOutcome::Ok;
    };
    match Buffer::buffer_new_open(&path) {
        Ok(buf) => {
            let region = ctx
                .editor
                .view(view_id)
                .map(|v| v.region)
                .unwrap_or(LayoutRegion::new(0, 0, 80, 24));
            let buffer_id = ctx.editor.add_buffer(buf);
            let new_view = ctx.editor.new_view(buffer_id, region, ViewType::Edit);
            ctx.editor.set_active(new_view);
            CommandOutcome::Ok
        }
        Err(e) => CommandOutcome::Failed(e.to_string()),
    }
}

/// Re-read the active view's buffer from disk, resetting every view bound
/// to it to a single fresh cursor at the origin (see
/// `Editor::replace_buffer_contents`).
pub fn reload(ctx: &mut CommandContext) -> CommandOutcome {
    let view_id = ctx.view;
    let Some(buffer_id) = ctx.editor.view(view_id).map(|v| v.buffer) else {
        return CommandOutcome::Failed("no such view".into());
    };
    let path = match ctx.editor.buffer(buffer_id).and_then(|b| b.path.clone()) {
        Some(p) => p,
        None => return CommandOutcome::Failed("buffer has no path to reload from".into()),
    };
    match Buffer::buffer_new_open(&path) {
        Ok(fresh) => {
            ctx.editor.replace_buffer_contents(buffer_id, fresh);
            CommandOutcome::Ok
        }
        Err(e) => CommandOutcome::Failed(e.to_string()),
    }
}

/// Close the active view. Prompts on unsaved changes: yes saves first, no
/// discards, cancel aborts the close entirely.
pub fn close(ctx: &mut CommandContext) -> CommandOutcome {
    let view_id = ctx.view;
    let Some(view) = ctx.editor.view(view_id) else {
        return CommandOutcome::Failed("no such view".into());
    };
    let buffer_id = view.buffer;
    let dirty = ctx.editor.buffer(buffer_id).map(|b| b.dirty).unwrap_or(false);
    if dirty {
        let answer = ctx.prompt_host.run_prompt(&mut *ctx.editor, view_id, PromptKind::YesNo);
        match answer.as_deref() {
            Some(a) if a.eq_ignore_ascii_case("y") => {
                let path = ctx.editor.buffer(buffer_id).and_then(|b| b.path.clone());
                let Some(path) = path else {
                    return CommandOutcome::Failed("no path to save to".into());
                };
                if let Some(buf) = ctx.editor.buffer_mut(buffer_id) {
                    if let Err(e) = buf.buffer_save_as(&path) {
                        return CommandOutcome::Failed(e.to_string());
                    }
                }
            }
            Some(a) if a.eq_ignore_ascii_case("n") => {}
            _ => return CommandOutcome::Ok,
        }
    }
    match ctx.editor.close_view(view_id) {
        Ok(()) => CommandOutcome::Ok,
        Err(e) => CommandOutcome::Failed(e.to_string()),
    }
}

/// Request a graceful exit; the main loop observes `exit_requested` after
/// the current dispatch returns.
pub fn quit(ctx: &mut CommandContext) -> CommandOutcome {
    ctx.editor.exit_requested = true;
    CommandOutcome::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedPrompts;
    use core_events::{Chord, KeyToken};
    use core_model::Editor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn save_writes_buffer_to_existing_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "before").unwrap();
        let path = file.path().to_path_buf();

        let buf = Buffer::buffer_new_open(&path).unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let view = ed.active_view;
        let buffer_id = ed.view(view).unwrap().buffer;
        ed.buffer_mut(buffer_id).unwrap().insert_before_mark(
            ed.view(view).unwrap().active_cursor().mark,
            "X",
        );

        let mut prompts = ScriptedPrompts::default();
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('x')),
            param: None,
            prompt_host: &mut prompts,
        };
        let outcome = save(&mut ctx);
        assert_eq!(outcome, CommandOutcome::Ok);
        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "Xbefore");
    }

    #[test]
    fn quit_sets_exit_requested() {
        let buf = Buffer::from_str("t", "x").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let view = ed.active_view;
        let mut prompts = ScriptedPrompts::default();
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('x')),
            param: None,
            prompt_host: &mut prompts,
        };
        quit(&mut ctx);
        assert!(ed.exit_requested);
    }
}
