//! Search, search-next, and interactive replace (spec §4.2).

use crate::for_each_non_sleeping_cursor;
use core_model::CommandContext;
use core_state::{CommandOutcome, PromptKind};
use core_text::{Buffer, StyleKind};
use regex::Regex;

fn run_search(ctx: &mut CommandContext, pattern: &str) -> CommandOutcome {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => return CommandOutcome::Failed(format!("invalid regex: {e}")),
    };
    let outcome = for_each_non_sleeping_cursor(ctx, |buf, cursor| {
        buf.move_mark_to_next_regex_match(cursor.mark, &re);
    });
    if let Some(view) = ctx.editor.view_mut(ctx.view) {
        view.last_search = Some(pattern.to_string());
    }
    outcome
}

/// Prompt for a regex, then advance every non-sleeping cursor to its next
/// match (wrapping once if needed).
pub fn search(ctx: &mut CommandContext) -> CommandOutcome {
    let Some(pattern) = ctx.prompt_host.run_prompt(&mut *ctx.editor, ctx.view, PromptKind::Input) else {
        return CommandOutcome::Ok;
    };
    run_search(ctx, &pattern)
}

/// Repeat the view's last search.
pub fn search_next(ctx: &mut CommandContext) -> CommandOutcome {
    let Some(pattern) = ctx.editor.view(ctx.view).and_then(|v| v.last_search.clone()) else {
        return CommandOutcome::Failed("no previous search".into());
    };
    run_search(ctx, &pattern)
}

/// Find the next match at-or-after `from_offset`, wrapping to the first
/// match in the buffer if none is found forward. Unlike
/// `Buffer::move_mark_to_next_regex_match` (which always starts strictly
/// *after* the cursor, since it is "search next"), this includes a match
/// starting exactly at `from_offset` — required so replace can act on a
/// match sitting right under the cursor.
fn find_next_match_inclusive(buf: &Buffer, from_offset: usize, re: &Regex) -> Option<(usize, usize, bool)> {
    let text = buf.buffer_get();
    let clamped = from_offset.min(text.len());
    if let Some(m) = re.find_at(&text, clamped) {
        return Some((m.start(), m.end(), false));
    }
    if let Some(m) = re.find(&text) {
        return Some((m.start(), m.end(), true));
    }
    None
}

/// Interactive find-and-replace from the active cursor's position: prompt
/// for a regex and a replacement, then for each match (wrapping once)
/// highlight it and prompt yes/no. Stops on cancel or a second wrap.
pub fn replace(ctx: &mut CommandContext) -> CommandOutcome {
    let Some(pattern) = ctx.prompt_host.run_prompt(&mut *ctx.editor, ctx.view, PromptKind::Input) else {
        return CommandOutcome::Ok;
    };
    let Some(replacement) = ctx.prompt_host.run_prompt(&mut *ctx.editor, ctx.view, PromptKind::Input) else {
        return CommandOutcome::Ok;
    };
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => return CommandOutcome::Failed(format!("invalid regex: {e}")),
    };

    let view_id = ctx.view;
    let Some(view) = ctx.editor.view(view_id) else {
        return CommandOutcome::Failed("no such view".into());
    };
    let buffer_id = view.buffer;
    let mark = view.active_cursor().mark;

    let Some(buf) = ctx.editor.buffer(buffer_id) else {
        return CommandOutcome::Failed("no such buffer".into());
    };
    let Some(start_pos) = buf.mark_pos(mark) else {
        return CommandOutcome::Failed("no such mark".into());
    };
    let mut from_offset = buf.get_offset(start_pos);
    let mut wrapped_once = false;

    loop {
        let Some(buf) = ctx.editor.buffer(buffer_id) else {
            return CommandOutcome::Failed("no such buffer".into());
        };
        let Some((start, end, wrapped)) = find_next_match_inclusive(buf, from_offset, &re) else {
            break;
        };
        if wrapped {
            if wrapped_once {
                break;
            }
            wrapped_once = true;
        }
        let start_pos = buf.offset_to_position(start);
        let end_pos = buf.offset_to_position(end);

        let rule_id = {
            let buf = ctx.editor.buffer_mut(buffer_id).unwrap();
            buf.add_styling_rule(start_pos, end_pos, StyleKind::ReverseVideo)
        };

        let answer = ctx.prompt_host.run_prompt(&mut *ctx.editor, view_id, PromptKind::YesNo);

        let Some(buf) = ctx.editor.buffer_mut(buffer_id) else {
            return CommandOutcome::Failed("no such buffer".into());
        };
        buf.remove_styling_rule(rule_id);

        match answer.as_deref() {
            Some(a) if a.eq_ignore_ascii_case("y") => {
                buf.move_mark_to(mark, start_pos.line, start_pos.byte);
                let end_mark = buf.add_mark(end_pos);
                buf.delete_between_marks(mark, end_mark);
                buf.destroy_mark(end_mark);
                buf.insert_before_mark(mark, &replacement);
                from_offset = buf.get_offset(buf.mark_pos(mark).unwrap());
            }
            Some(a) if a.eq_ignore_ascii_case("n") => {
                let next_offset = advance_one_char(buf, start_pos);
                buf.move_mark_to(mark, next_offset.line, next_offset.byte);
                from_offset = buf.get_offset(next_offset);
            }
            _ => return CommandOutcome::Ok,
        }
    }
    CommandOutcome::Ok
}

fn advance_one_char(buf: &Buffer, pos: core_text::Position) -> core_text::Position {
    use core_text::grapheme;
    let line = {
        let mut s = buf.line(pos.line).unwrap_or_default();
        if s.ends_with('\n') {
            s.pop();
        }
        s
    };
    let next = grapheme::next_boundary(&line, pos.byte);
    if next == pos.byte {
        if pos.line + 1 < buf.line_count() {
            core_text::Position::new(pos.line + 1, 0)
        } else {
            pos
        }
    } else {
        core_text::Position::new(pos.line, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedPrompts;
    use core_events::{Chord, KeyToken};
    use core_model::Editor;
    use core_text::{Buffer, Position};

    #[test]
    fn search_wraps_to_first_match() {
        let buf = Buffer::from_str("t", "foo bar foo").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let view = ed.active_view;
        let buffer_id = ed.view(view).unwrap().buffer;
        let mark = ed.view(view).unwrap().active_cursor().mark;
        ed.buffer_mut(buffer_id).unwrap().move_mark_to(mark, 0, 9);

        let mut prompts = ScriptedPrompts::new(vec![Some("foo")]);
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('x')),
            param: None,
            prompt_host: &mut prompts,
        };
        search(&mut ctx);
        let pos = ed.buffer(buffer_id).unwrap().mark_pos(mark).unwrap();
        assert_eq!(pos, Position::new(0, 0));
    }

    #[test]
    fn replace_one_accepted_match_leaves_rest_untouched() {
        let buf = Buffer::from_str("t", "aaa").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let view = ed.active_view;
        let buffer_id = ed.view(view).unwrap().buffer;

        let mut prompts = ScriptedPrompts::new(vec![
            Some("a"),
            Some("b"),
            Some("y"),
            Some("n"),
            Some("n"),
        ]);
        let mut ctx = CommandContext {
            editor: &mut ed,
            view,
            cursor_index: 0,
            chord: Chord::plain(KeyToken::Char('x')),
            param: None,
            prompt_host: &mut prompts,
        };
        replace(&mut ctx);
        assert_eq!(ed.buffer(buffer_id).unwrap().buffer_get(), "baa");
    }
}
