//! Word-boundary scanning for delete-word/move-by-word.
//!
//! The donor's own word-delete regexes — `((?<=\W)\w|^)` backward and
//! `((?<=\w)\W|$)` forward — rely on lookbehind assertions that the `regex`
//! crate does not support. The classification they express (word-char
//! preceded/followed by non-word-char, or buffer edge) is reproduced here as
//! a grapheme walk instead of a regex, scoped to a single line the same way
//! the originals were.

use core_text::grapheme;

/// Scan backward from `byte` to the start of the word boundary the original
/// regex would match: skip any run of non-word graphemes, then skip the
/// word run behind it.
pub fn backward(line: &str, byte: usize) -> usize {
    let mut b = byte;
    loop {
        let prev = grapheme::prev_boundary(line, b);
        if prev == b {
            break;
        }
        if grapheme::is_word(&line[prev..b]) {
            break;
        }
        b = prev;
    }
    loop {
        let prev = grapheme::prev_boundary(line, b);
        if prev == b {
            break;
        }
        if !grapheme::is_word(&line[prev..b]) {
            break;
        }
        b = prev;
    }
    b
}

/// Scan forward from `byte` to the boundary the forward regex would match:
/// skip any run of non-word graphemes, then skip the word run ahead of it.
pub fn forward(line: &str, byte: usize) -> usize {
    let mut b = byte;
    loop {
        let next = grapheme::next_boundary(line, b);
        if next == b {
            break;
        }
        if grapheme::is_word(&line[b..next]) {
            break;
        }
        b = next;
    }
    loop {
        let next = grapheme::next_boundary(line, b);
        if next == b {
            break;
        }
        if !grapheme::is_word(&line[b..next]) {
            break;
        }
        b = next;
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backward_skips_trailing_space_then_word() {
        let line = "foo bar baz";
        assert_eq!(backward(line, 11), 8); // from end, lands at start of "baz"
        assert_eq!(backward(line, 7), 4); // from inside "bar", lands at start of "bar"
    }

    #[test]
    fn forward_skips_leading_word_then_space() {
        let line = "foo bar baz";
        assert_eq!(forward(line, 0), 4); // from start, lands after the space following "foo"
    }

    #[test]
    fn backward_stops_at_line_start() {
        assert_eq!(backward("abc", 0), 0);
    }

    #[test]
    fn forward_stops_at_line_end() {
        assert_eq!(forward("abc", 3), 3);
    }
}
