//! Default keymap/binding table (spec §4.1), grounded in
//! `original_source/editor.c`'s `_editor_init_kmaps` defaults.
//!
//! One rebinding vs. the original: the source's `normal` kmap binds `M-r`
//! to `replace` and `C-r` to an incremental-search command that has no
//! equivalent in this command set. Since the macro toggle key defaults to
//! `M-r` here (spec §6), `replace` moves to the now-free `C-r`.

use core_keymap::{Binding, KeymapRegistry, parse_chord};

fn bind(keymaps: &mut KeymapRegistry, kmap: &str, chord: &str, command: &str) {
    match parse_chord(chord) {
        Ok(c) => {
            if let Err(e) = keymaps.bind(kmap, c, Binding::new(command)) {
                tracing::warn!(target: "startup.keymap", kmap, chord, error = %e, "failed to bind");
            }
        }
        Err(e) => tracing::warn!(target: "startup.keymap", kmap, chord, error = %e, "unparseable chord"),
    }
}

/// Define the `edit`, `prompt_input`, `prompt_yn`, and `prompt_ok` keymaps
/// and populate them with the canonical binding table.
pub fn register_default_keymaps(keymaps: &mut KeymapRegistry) {
    keymaps.define("edit", Some(Binding::new("insert_data")), false);
    for (chord, command) in EDIT_BINDINGS {
        bind(keymaps, "edit", chord, command);
    }

    keymaps.define("prompt_input", None, true);
    bind(keymaps, "prompt_input", "enter", "prompt_submit");
    bind(keymaps, "prompt_input", "C-c", "prompt_cancel");

    keymaps.define("prompt_yn", None, false);
    bind(keymaps, "prompt_yn", "y", "prompt_confirm_yes");
    bind(keymaps, "prompt_yn", "n", "prompt_confirm_no");
    bind(keymaps, "prompt_yn", "C-c", "prompt_cancel");

    keymaps.define("prompt_ok", Some(Binding::new("prompt_ack")), false);
}

const EDIT_BINDINGS: &[(&str, &str)] = &[
    ("tab", "insert_tab"),
    ("enter", "insert_data"),
    ("backspace", "delete_before"),
    ("backspace2", "delete_before"),
    ("delete", "delete_after"),
    ("C-a", "move_bol"),
    ("home", "move_bol"),
    ("C-e", "move_eol"),
    ("end", "move_eol"),
    ("M-\\", "move_beginning"),
    ("M-/", "move_end"),
    ("left", "move_left"),
    ("right", "move_right"),
    ("up", "move_up"),
    ("down", "move_down"),
    ("page-up", "move_page_up"),
    ("page-down", "move_page_down"),
    ("M-g", "move_to_line"),
    ("M-f", "move_word_forward"),
    ("M-b", "move_word_backward"),
    ("M-a", "toggle_sel_bound"),
    ("M-h", "drop_sleeping_cursor"),
    ("M-j", "wake_sleeping_cursors"),
    ("M-k", "remove_extra_cursors"),
    ("C-f", "search"),
    ("C-j", "search_next"),
    ("C-r", "replace"),
    ("C-w", "delete_word_before"),
    ("M-d", "delete_word_after"),
    ("C-k", "cut"),
    ("C-c", "copy"),
    ("C-u", "uncut"),
    ("M-n", "next_view"),
    ("M-p", "prev_view"),
    ("M-l", "split_vertical"),
    ("M-;", "split_horizontal"),
    ("C-o", "save"),
    ("C-n", "open"),
    ("M-m", "apply_macro"),
    ("M-c", "close"),
    ("C-q", "quit"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{Chord, KeyToken, ModMask};

    #[test]
    fn edit_default_binding_is_insert_data() {
        let mut keymaps = KeymapRegistry::new();
        register_default_keymaps(&mut keymaps);
        let edit = keymaps.get("edit").unwrap();
        assert_eq!(edit.default_binding.as_ref().unwrap().command, "insert_data");
    }

    #[test]
    fn ctrl_r_is_bound_to_replace_not_macro_toggle() {
        let mut keymaps = KeymapRegistry::new();
        register_default_keymaps(&mut keymaps);
        let edit = keymaps.get("edit").unwrap();
        let chord = Chord::new(ModMask::CTRL, KeyToken::Char('r'));
        assert_eq!(edit.lookup(&chord).unwrap().command, "replace");
    }

    #[test]
    fn prompt_input_falls_through_when_stacked_under_edit() {
        let mut keymaps = KeymapRegistry::new();
        register_default_keymaps(&mut keymaps);
        let stack = vec!["edit".to_string(), "prompt_input".to_string()];
        let resolved = core_keymap::resolve(&keymaps, &stack, &Chord::plain(KeyToken::Char('x')), |_| true).unwrap();
        assert_eq!(resolved.binding.command, "insert_data");
        assert_eq!(resolved.found_in, "edit");
    }

    #[test]
    fn prompt_yn_does_not_fall_through() {
        let mut keymaps = KeymapRegistry::new();
        register_default_keymaps(&mut keymaps);
        let stack = vec!["edit".to_string(), "prompt_yn".to_string()];
        let resolved = core_keymap::resolve(&keymaps, &stack, &Chord::plain(KeyToken::Char('x')), |_| true);
        assert!(resolved.is_none());
    }
}
