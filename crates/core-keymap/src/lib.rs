//! Keymap & Binding Table, and the per-view keymap-stack dispatch algorithm
//! of spec §4.1.
//!
//! A [`Keymap`] is a named hash from [`Chord`] to [`Binding`], with an
//! optional default binding and an `allow_fallthru` flag. Views hold a
//! *stack* of keymap names (`core-model::View::kmap_stack`); [`resolve`]
//! walks it top-down per spec §4.1.

use core_events::{Chord, KeyToken, ModMask, NamedKey};
use std::collections::HashMap;
use thiserror::Error;

/// A binding: a command reference (resolved lazily by name, per spec §4.1's
/// failure mode) plus an optional static parameter string (e.g. a macro
/// name, a search direction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub command: String,
    pub param: Option<String>,
}

impl Binding {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            param: None,
        }
    }

    pub fn with_param(command: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            param: Some(param.into()),
        }
    }
}

/// A named chord→binding table.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    pub name: String,
    bindings: HashMap<Chord, Binding>,
    pub default_binding: Option<Binding>,
    pub allow_fallthru: bool,
}

impl Keymap {
    pub fn new(name: impl Into<String>, default_binding: Option<Binding>, allow_fallthru: bool) -> Self {
        Self {
            name: name.into(),
            bindings: HashMap::new(),
            default_binding,
            allow_fallthru,
        }
    }

    pub fn bind(&mut self, chord: Chord, binding: Binding) {
        self.bindings.insert(chord, binding);
    }

    pub fn lookup(&self, chord: &Chord) -> Option<&Binding> {
        self.bindings.get(chord)
    }
}

/// Process-wide registry of named keymaps (spec §3: "registered by name").
#[derive(Debug, Clone, Default)]
pub struct KeymapRegistry {
    keymaps: HashMap<String, Keymap>,
}

impl KeymapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, default_binding: Option<Binding>, allow_fallthru: bool) {
        let name = name.into();
        self.keymaps.insert(name.clone(), Keymap::new(name, default_binding, allow_fallthru));
    }

    pub fn bind(&mut self, keymap: &str, chord: Chord, binding: Binding) -> Result<(), KeymapError> {
        let km = self
            .keymaps
            .get_mut(keymap)
            .ok_or_else(|| KeymapError::UnknownKeymap(keymap.to_string()))?;
        km.bind(chord, binding);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Keymap> {
        self.keymaps.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keymaps.contains_key(name)
    }
}

/// The outcome of [`resolve`]: the binding found, and the keymap node it was
/// found in (useful for logging / diagnostics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<'a> {
    pub binding: &'a Binding,
    pub found_in: &'a str,
}

/// Walk `stack` (bottom to top; the *last* element is the top of the stack,
/// i.e. most recently pushed) resolving `chord` per spec §4.1:
///
/// 1. Exact-match lookup in the top node's bindings.
/// 2. On miss, the node's default binding if any.
/// 3. If neither, fall through to the next node down iff `allow_fallthru`.
///
/// `command_known` lets the caller (which owns the command registry) report
/// that a resolved binding's command name doesn't actually exist; per spec
/// §4.1 that is treated as "no binding" and dispatch continues down the
/// stack rather than stopping.
pub fn resolve<'a>(
    registry: &'a KeymapRegistry,
    stack: &[String],
    chord: &Chord,
    command_known: impl Fn(&str) -> bool,
) -> Option<Resolved<'a>> {
    for name in stack.iter().rev() {
        let Some(km) = registry.get(name) else {
            tracing::warn!(target: "keymap.dispatch", keymap = %name, "keymap stack references unknown keymap");
            continue;
        };
        let candidate = km.lookup(chord).or(km.default_binding.as_ref());
        if let Some(binding) = candidate {
            if command_known(&binding.command) {
                return Some(Resolved {
                    binding,
                    found_in: &km.name,
                });
            }
            tracing::debug!(target: "keymap.dispatch", command = %binding.command, "binding command unresolved, falling through");
        }
        if !km.allow_fallthru {
            return None;
        }
    }
    None
}

#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("unknown keymap: {0}")]
    UnknownKeymap(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChordParseError {
    #[error("empty chord string")]
    Empty,
    #[error("unknown key name: {0}")]
    UnknownKeyName(String),
}

/// Parse the chord grammar of spec §6: `[M-]<name>` where `name` is a
/// literal Unicode character, `C-a`..`C-z`, or one of the fixed special
/// names.
pub fn parse_chord(s: &str) -> Result<Chord, ChordParseError> {
    if s.is_empty() {
        return Err(ChordParseError::Empty);
    }
    let (alt, rest) = match s.strip_prefix("M-") {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if rest.is_empty() {
        return Err(ChordParseError::UnknownKeyName(s.to_string()));
    }
    let mut mods = if alt { ModMask::ALT } else { ModMask::empty() };
    let token = if let Some(rest) = rest.strip_prefix("C-") {
        let c = rest.chars().next().ok_or_else(|| ChordParseError::UnknownKeyName(s.to_string()))?;
        if rest.chars().count() != 1 || !c.is_ascii_alphabetic() {
            return Err(ChordParseError::UnknownKeyName(s.to_string()));
        }
        mods |= ModMask::CTRL;
        KeyToken::Char(c.to_ascii_lowercase())
    } else if let Some(named) = named_key(rest) {
        named
    } else {
        let mut chars = rest.chars();
        let c = chars.next().ok_or_else(|| ChordParseError::UnknownKeyName(s.to_string()))?;
        if chars.next().is_some() {
            return Err(ChordParseError::UnknownKeyName(s.to_string()));
        }
        KeyToken::Char(c)
    };
    Ok(Chord::new(mods, token))
}

fn named_key(name: &str) -> Option<KeyToken> {
    Some(KeyToken::Named(match name {
        "enter" => NamedKey::Enter,
        "tab" => NamedKey::Tab,
        "backspace" => NamedKey::Backspace,
        "backspace2" => NamedKey::Backspace2,
        "delete" => NamedKey::Delete,
        "home" => NamedKey::Home,
        "end" => NamedKey::End,
        "page-up" => NamedKey::PageUp,
        "page-down" => NamedKey::PageDown,
        "up" => NamedKey::Up,
        "down" => NamedKey::Down,
        "left" => NamedKey::Left,
        "right" => NamedKey::Right,
        _ => return None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ctrl_and_alt_chords() {
        assert_eq!(parse_chord("C-a").unwrap(), Chord::ctrl('a'));
        assert_eq!(
            parse_chord("M-f").unwrap(),
            Chord::alt(KeyToken::Char('f'))
        );
        assert_eq!(
            parse_chord("enter").unwrap(),
            Chord::plain(KeyToken::Named(NamedKey::Enter))
        );
        assert_eq!(parse_chord("a").unwrap(), Chord::plain(KeyToken::Char('a')));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!(parse_chord("frobnicate").is_err());
        assert!(parse_chord("").is_err());
    }

    #[test]
    fn fallthrough_stops_without_flag() {
        let mut reg = KeymapRegistry::new();
        reg.define("edit", Some(Binding::new("insert_data")), false);
        reg.define("yn", None, false);
        reg.bind("yn", Chord::plain(KeyToken::Char('y')), Binding::new("confirm_yes")).unwrap();
        let stack = vec!["edit".to_string(), "yn".to_string()];
        // 'y' hits yn's binding directly.
        let known = |_: &str| true;
        let r = resolve(&reg, &stack, &Chord::plain(KeyToken::Char('y')), known).unwrap();
        assert_eq!(r.binding.command, "confirm_yes");
        // 'z' misses yn (no default, no fallthrough) -> no binding at all,
        // even though 'edit' below has a default.
        let r2 = resolve(&reg, &stack, &Chord::plain(KeyToken::Char('z')), known);
        assert!(r2.is_none());
    }

    #[test]
    fn fallthrough_descends_when_allowed() {
        let mut reg = KeymapRegistry::new();
        reg.define("edit", Some(Binding::new("insert_data")), false);
        reg.define("input", None, true);
        reg.bind("input", Chord::ctrl('c'), Binding::new("cancel")).unwrap();
        let stack = vec!["edit".to_string(), "input".to_string()];
        let known = |_: &str| true;
        // 'x' misses input's bindings and has no default there, but input
        // allows fallthrough so we descend to edit's default.
        let r = resolve(&reg, &stack, &Chord::plain(KeyToken::Char('x')), known).unwrap();
        assert_eq!(r.binding.command, "insert_data");
        assert_eq!(r.found_in, "edit");
    }

    #[test]
    fn resolved_binding_table_matches_expected() {
        // Uses `pretty_assertions` for a readable table diff when a
        // binding's resolved (command, param) pair drifts from what the
        // keymap was supposed to register.
        use pretty_assertions::assert_eq as table_eq;

        let mut reg = KeymapRegistry::new();
        reg.define("edit", Some(Binding::new("insert_data")), false);
        reg.bind("edit", Chord::ctrl('a'), Binding::new("move_bol")).unwrap();
        reg.bind("edit", Chord::ctrl('e'), Binding::new("move_eol")).unwrap();
        reg.bind("edit", Chord::alt(KeyToken::Char('r')), Binding::with_param("apply_macro", "last"))
            .unwrap();
        let stack = vec!["edit".to_string()];
        let known = |_: &str| true;

        let chords = [Chord::ctrl('a'), Chord::ctrl('e'), Chord::alt(KeyToken::Char('r'))];
        let got: Vec<(String, Option<String>)> = chords
            .iter()
            .map(|c| {
                let r = resolve(&reg, &stack, c, known).unwrap();
                (r.binding.command.clone(), r.binding.param.clone())
            })
            .collect();
        let expected = vec![
            ("move_bol".to_string(), None),
            ("move_eol".to_string(), None),
            ("apply_macro".to_string(), Some("last".to_string())),
        ];
        table_eq!(got, expected);
    }

    #[test]
    fn unresolved_command_name_falls_through_to_next_node() {
        let mut reg = KeymapRegistry::new();
        reg.define("edit", Some(Binding::new("insert_data")), false);
        reg.define("macro_apply", None, true);
        reg.bind("macro_apply", Chord::ctrl('m'), Binding::new("ghost_command")).unwrap();
        let stack = vec!["edit".to_string(), "macro_apply".to_string()];
        let known = |name: &str| name != "ghost_command";
        let r = resolve(&reg, &stack, &Chord::ctrl('m'), known).unwrap();
        assert_eq!(r.binding.command, "insert_data");
    }
}
