//! Shared event vocabulary: key chords, resize/async-proc notifications, and
//! the `KeyToken`/`ModMask` building blocks the chord grammar is built from.
//!
//! This crate sits at the bottom of the workspace: it defines the *data*
//! that flows from the terminal and from async child processes, but not how
//! it is produced (`core-input`) or consumed (`core-keymap`, `core-actions`).

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Modifier bits carried alongside a [`KeyToken`]. Mirrors the chord
    /// grammar of spec §6: only `Ctrl` and `Alt` ("M-") are addressable from
    /// keymap definition strings, but the wire format carries Shift/Super/
    /// Meta too since the terminal reports them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModMask: u8 {
        const CTRL  = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const SHIFT = 0b0000_0100;
        const SUPER = 0b0000_1000;
        const META  = 0b0001_0000;
    }
}

/// A named (non-printable) key, distinct from a literal Unicode codepoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Esc,
    Tab,
    Backspace,
    Backspace2,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    F(u8),
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedKey::Enter => write!(f, "enter"),
            NamedKey::Esc => write!(f, "esc"),
            NamedKey::Tab => write!(f, "tab"),
            NamedKey::Backspace => write!(f, "backspace"),
            NamedKey::Backspace2 => write!(f, "backspace2"),
            NamedKey::Delete => write!(f, "delete"),
            NamedKey::Home => write!(f, "home"),
            NamedKey::End => write!(f, "end"),
            NamedKey::PageUp => write!(f, "page-up"),
            NamedKey::PageDown => write!(f, "page-down"),
            NamedKey::Up => write!(f, "up"),
            NamedKey::Down => write!(f, "down"),
            NamedKey::Left => write!(f, "left"),
            NamedKey::Right => write!(f, "right"),
            NamedKey::F(n) => write!(f, "f{n}"),
        }
    }
}

/// The "what was pressed" half of a chord: either a printable codepoint or a
/// named special key. Control letters (`C-a`..`C-z`) are represented as
/// `Char('a'..'z')` plus `ModMask::CTRL`, matching spec §6's chord grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Char(c) => write!(f, "{c}"),
            KeyToken::Named(n) => write!(f, "{n}"),
        }
    }
}

/// A single key event: modifier mask plus token. This is the `kinput_t`
/// analogue from `original_source/mle.h` (`{ mod, ch, key }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    pub mods: ModMask,
    pub token: KeyToken,
}

impl Chord {
    pub fn new(mods: ModMask, token: KeyToken) -> Self {
        Self { mods, token }
    }

    pub fn plain(token: KeyToken) -> Self {
        Self {
            mods: ModMask::empty(),
            token,
        }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            mods: ModMask::CTRL,
            token: KeyToken::Char(c.to_ascii_lowercase()),
        }
    }

    pub fn alt(token: KeyToken) -> Self {
        Self {
            mods: ModMask::ALT,
            token,
        }
    }

    /// True when this chord corresponds to a printable-insertable character
    /// per spec §4.2 "Insert data": a printable Unicode codepoint, Enter,
    /// Tab, or an ASCII byte in `0x20..=0x7e`, with no Ctrl/Alt held.
    pub fn insertable_char(&self) -> Option<char> {
        if self.mods.intersects(ModMask::CTRL | ModMask::ALT) {
            return None;
        }
        match self.token {
            KeyToken::Char(c) => Some(c),
            KeyToken::Named(NamedKey::Enter) => Some('\n'),
            KeyToken::Named(NamedKey::Tab) => Some('\t'),
            _ => None,
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.contains(ModMask::CTRL) {
            if let KeyToken::Char(c) = self.token {
                return write!(f, "C-{}", c.to_ascii_lowercase());
            }
        }
        if self.mods.contains(ModMask::ALT) {
            return write!(f, "M-{}", self.token);
        }
        write!(f, "{}", self.token)
    }
}

/// Terminal-originated input, independent of any async proc activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(Chord),
    Resize { width: u16, height: u16 },
}

/// The result of draining an async child process's output pipe once,
/// handed to its registered callback (spec §4.5).
#[derive(Debug, Clone)]
pub enum AsyncProcEvent {
    /// Up to 1KiB of data read this pass.
    Data(Vec<u8>),
    /// Clean EOF on the read pipe.
    Eof,
    /// A read() error occurred.
    Error(String),
    /// The proc's absolute deadline elapsed without EOF/error.
    TimedOut,
}

impl AsyncProcEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AsyncProcEvent::Data(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_chord_displays_lowercase() {
        let c = Chord::ctrl('A');
        assert_eq!(c.to_string(), "C-a");
    }

    #[test]
    fn alt_chord_displays_with_prefix() {
        let c = Chord::alt(KeyToken::Char('f'));
        assert_eq!(c.to_string(), "M-f");
    }

    #[test]
    fn insertable_char_rejects_ctrl() {
        let c = Chord::ctrl('c');
        assert_eq!(c.insertable_char(), None);
    }

    #[test]
    fn insertable_char_accepts_enter_and_tab() {
        assert_eq!(
            Chord::plain(KeyToken::Named(NamedKey::Enter)).insertable_char(),
            Some('\n')
        );
        assert_eq!(
            Chord::plain(KeyToken::Named(NamedKey::Tab)).insertable_char(),
            Some('\t')
        );
    }
}
