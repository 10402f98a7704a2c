//! TTY key decoding and the async process multiplexer (spec §4.5).
//!
//! Single-threaded by design (spec §5: "no tokio runtime, no worker
//! threads"): the main loop owns the terminal fd and every async proc's
//! read pipe, and drains all of them from one `libc::poll()` pass at a
//! time via [`multiplexer::AsyncMultiplexer`]. Key decoding still goes
//! through crossterm's synchronous `event::read()` — only escape-sequence
//! parsing is reused from it, not its async event stream.

pub mod key_token;
pub mod multiplexer;

use core_events::{Chord, InputEvent};
use crossterm::event::Event as CEvent;
use key_token::map_key_event;

/// Read one crossterm event from stdin (assumed already readable, per the
/// multiplexer's TTY-priority pass) and translate it into an [`InputEvent`].
/// `None` covers event kinds with no chord/resize mapping (mouse, focus,
/// bracketed-paste boundary markers) and unsupported key codes.
pub fn next_input_event() -> std::io::Result<Option<InputEvent>> {
    match crossterm::event::read()? {
        CEvent::Key(key) => Ok(map_key_event(&key).map(|parts| InputEvent::Key(Chord::new(parts.mods, parts.token)))),
        CEvent::Resize(width, height) => Ok(Some(InputEvent::Resize { width, height })),
        CEvent::Mouse(_) | CEvent::Paste(_) | CEvent::FocusGained | CEvent::FocusLost => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::NamedKey;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

    #[test]
    fn resize_event_maps_directly() {
        // next_input_event() itself needs a real stdin, so we only exercise
        // the crossterm::Event -> InputEvent match arms it relies on here.
        let ev = CEvent::Resize(80, 24);
        let mapped = match ev {
            CEvent::Resize(w, h) => Some(InputEvent::Resize { width: w, height: h }),
            _ => None,
        };
        assert_eq!(mapped, Some(InputEvent::Resize { width: 80, height: 24 }));
    }

    #[test]
    fn key_event_maps_through_key_token() {
        let key = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        };
        let parts = map_key_event(&key).unwrap();
        let chord = Chord::new(parts.mods, parts.token);
        assert_eq!(chord, Chord::plain(core_events::KeyToken::Named(NamedKey::Enter)));
    }
}
