//! Small pure helpers shared by the canonical commands in this crate.

use core_text::{Buffer, grapheme};

/// The requested line's content with any trailing newline stripped off, for
/// word-boundary scanning and visual-column math (spec §4.2's word-delete
/// regexes and sticky-column motion are both scoped to a single line).
pub(crate) fn line_sans_newline(buf: &Buffer, idx: usize) -> String {
    let mut s = buf.line(idx).unwrap_or_default();
    if s.ends_with('\n') {
        s.pop();
    }
    s
}

/// Inverse of `grapheme::visual_col`: the byte offset of the first
/// grapheme cluster whose visual column is `>= target_col`, or `line.len()`
/// if the line is shorter than that column. Used to re-home a cursor onto
/// its sticky column after a vertical move (spec §9 "sticky column").
pub(crate) fn byte_for_visual_col(line: &str, target_col: usize) -> usize {
    let mut byte = 0usize;
    let mut col = 0usize;
    loop {
        if col >= target_col || byte >= line.len() {
            return byte;
        }
        let next = grapheme::next_boundary(line, byte);
        if next == byte {
            return byte;
        }
        col += grapheme::cluster_width(&line[byte..next]);
        byte = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_for_visual_col_lands_on_boundary() {
        assert_eq!(byte_for_visual_col("abc", 0), 0);
        assert_eq!(byte_for_visual_col("abc", 2), 2);
        assert_eq!(byte_for_visual_col("abc", 10), 3);
    }
}
