//! The canonical command set dispatched through `core_model::CommandRegistry`
//! (spec §4.2). Every function here has the `CommandFn` signature and is
//! registered under its command name by [`register_default_commands`].

mod boundary;
pub mod clipboard;
pub mod edit;
pub mod io_ops;
pub mod macro_ops;
pub mod motion;
pub mod search;
pub mod selection;
mod util;
pub mod view_ops;

use core_model::{Cursor, CommandContext, CommandRegistry};
use core_state::CommandOutcome;
use core_text::Buffer;

/// Run `f` once for every non-sleeping cursor of `ctx.view`, on a snapshot
/// of cursor indices taken before the loop starts (spec §4.2: "Cursors are
/// iterated on a snapshot, safe against self-removal"). `f` sees the
/// buffer and cursor of a single index at a time; indices that a prior
/// iteration removed are skipped rather than panicking.
pub(crate) fn for_each_non_sleeping_cursor<F>(ctx: &mut CommandContext, mut f: F) -> CommandOutcome
where
    F: FnMut(&mut Buffer, &mut Cursor),
{
    let view_id = ctx.view;
    let indices = match ctx.editor.view(view_id) {
        Some(v) => v.cursor_indices_snapshot(),
        None => return CommandOutcome::Failed("no such view".into()),
    };
    for idx in indices {
        let Some((buf, view)) = ctx.editor.buffer_and_view_mut(view_id) else {
            continue;
        };
        if idx >= view.cursors.len() {
            continue;
        }
        if view.cursors[idx].is_asleep {
            continue;
        }
        f(buf, &mut view.cursors[idx]);
    }
    CommandOutcome::Ok
}

/// Populate `registry` with every canonical command named in spec §4.2.
pub fn register_default_commands(registry: &mut CommandRegistry) {
    registry.register("insert_data", edit::insert_data);
    registry.register("insert_tab", edit::insert_tab);
    registry.register("delete_before", edit::delete_before);
    registry.register("delete_after", edit::delete_after);
    registry.register("delete_word_before", edit::delete_word_before);
    registry.register("delete_word_after", edit::delete_word_after);

    registry.register("move_left", motion::move_left);
    registry.register("move_right", motion::move_right);
    registry.register("move_up", motion::move_up);
    registry.register("move_down", motion::move_down);
    registry.register("move_bol", motion::move_bol);
    registry.register("move_eol", motion::move_eol);
    registry.register("move_beginning", motion::move_beginning);
    registry.register("move_end", motion::move_end);
    registry.register("move_page_up", motion::move_page_up);
    registry.register("move_page_down", motion::move_page_down);
    registry.register("move_to_line", motion::move_to_line);
    registry.register("move_word_forward", motion::move_word_forward);
    registry.register("move_word_backward", motion::move_word_backward);

    registry.register("toggle_sel_bound", selection::toggle_sel_bound);
    registry.register("drop_sleeping_cursor", selection::drop_sleeping_cursor);
    registry.register("wake_sleeping_cursors", selection::wake_sleeping_cursors);
    registry.register("remove_extra_cursors", selection::remove_extra_cursors);

    registry.register("search", search::search);
    registry.register("search_next", search::search_next);
    registry.register("replace", search::replace);

    registry.register("cut", clipboard::cut);
    registry.register("copy", clipboard::copy);
    registry.register("uncut", clipboard::uncut);

    registry.register("split_vertical", view_ops::split_vertical);
    registry.register("split_horizontal", view_ops::split_horizontal);
    registry.register("next_view", view_ops::next_view);
    registry.register("prev_view", view_ops::prev_view);

    registry.register("save", io_ops::save);
    registry.register("open", io_ops::open);
    registry.register("reload", io_ops::reload);
    registry.register("close", io_ops::close);
    registry.register("quit", io_ops::quit);

    registry.register("apply_macro", macro_ops::apply_macro);
}
