//! Status line composition: one line summarizing the active view's buffer
//! name, dirty flag, cursor position, and macro-recording indicator.

use core_model::{Editor, View};

/// Build the status line text for `view`'s buffer, per spec §6's display
/// role for the terminal collaborator (it only consumes cell writes, so the
/// line is composed here as plain text first).
pub fn compose(editor: &Editor, view: &View) -> String {
    let buf = editor.buffer(view.buffer);
    let name = buf.map(|b| display_name(b)).unwrap_or_else(|| "[No Name]".to_string());
    let dirty = buf.map(|b| b.dirty).unwrap_or(false);
    let pos = buf
        .and_then(|b| b.mark_pos(view.active_cursor().mark))
        .unwrap_or(core_text::Position::origin());
    let recording = if editor.macro_recorder.is_recording() { " [recording]" } else { "" };
    let cursor_count = if view.cursors.len() > 1 {
        format!(" {} cursors", view.cursors.len())
    } else {
        String::new()
    };
    format!(
        "{name}{dirty_mark} Ln {}, Col {}{cursor_count}{recording}",
        pos.line + 1,
        pos.byte + 1,
        dirty_mark = if dirty { "*" } else { "" },
    )
}

fn display_name(buf: &core_text::Buffer) -> String {
    buf.path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| buf.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    #[test]
    fn composes_name_and_position() {
        let buf = Buffer::from_str("scratch", "hello").unwrap();
        let ed = Editor::new(buf, 80, 24);
        let view = ed.active_view();
        let line = compose(&ed, view);
        assert!(line.contains("scratch"));
        assert!(line.contains("Ln 1, Col 1"));
        assert!(!line.contains('*'));
    }

    #[test]
    fn dirty_buffer_gets_asterisk() {
        let buf = Buffer::from_str("scratch", "hello").unwrap();
        let mut ed = Editor::new(buf, 80, 24);
        let buffer_id = ed.active_view().buffer;
        ed.buffer_mut(buffer_id).unwrap().dirty = true;
        let line = compose(&ed, ed.active_view());
        assert!(line.contains("scratch*"));
    }
}
