//! Mapping from buffer coordinates to screen cells within a single view's
//! scrolled, horizontally-offset viewport.

use core_model::View;
use core_text::grapheme;

/// Screen column (relative to the view's text area, i.e. already past the
/// line-number gutter) for a byte offset on a visible line, or `None` if
/// it falls outside the viewport's horizontal scroll window.
pub fn screen_col(view: &View, line: &str, byte: usize) -> Option<u16> {
    let col = grapheme::visual_col(line, byte);
    if col < view.viewport_col {
        return None;
    }
    let rel = col - view.viewport_col;
    let width = view.region.width.saturating_sub(view.line_number_width) as usize;
    if rel >= width { None } else { Some(rel as u16) }
}

/// Screen row for a buffer line index, or `None` if scrolled out of view.
pub fn screen_row(view: &View, line_idx: usize) -> Option<u16> {
    if line_idx < view.viewport_line {
        return None;
    }
    let rel = line_idx - view.viewport_line;
    if rel >= view.region.height as usize { None } else { Some(rel as u16) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::layout::LayoutRegion;
    use core_model::{Editor, ViewType};
    use core_text::Buffer;

    fn view_with_region(width: u16, height: u16) -> View {
        let buf = Buffer::from_str("t", "").unwrap();
        let mut ed = Editor::new(buf, width, height);
        let buffer_id = ed.view(ed.active_view).unwrap().buffer;
        let region = LayoutRegion::new(0, 0, width, height);
        let id = ed.new_view(buffer_id, region, ViewType::Edit);
        ed.view(id).unwrap().clone()
    }

    #[test]
    fn screen_col_offsets_by_horizontal_scroll() {
        let mut v = view_with_region(10, 5);
        v.viewport_col = 2;
        assert_eq!(screen_col(&v, "hello world", 2), Some(0));
        assert_eq!(screen_col(&v, "hello world", 0), None);
    }

    #[test]
    fn screen_row_offsets_by_vertical_scroll() {
        let mut v = view_with_region(10, 5);
        v.viewport_line = 3;
        assert_eq!(screen_row(&v, 3), Some(0));
        assert_eq!(screen_row(&v, 2), None);
        assert_eq!(screen_row(&v, 10), None);
    }
}
