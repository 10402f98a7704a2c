//! RC-file discovery and argv splicing (spec §6 "RC files").
//!
//! `$HOME/.mlerc` and `/etc/mlerc`: each non-empty line is a CLI argument;
//! tokens are space-joined into the CLI vector as if passed at startup. The
//! system-wide file is read first so a user's `.mlerc` can append or repeat
//! flags after it — since most of the stateful flags (`-K`/`-k`, `-S`/`-s`)
//! only ever append, reading order only matters for which keymap/syntax a
//! later `-k`/`-s` attaches to.

use std::path::PathBuf;

/// The RC file paths to consult, in read order.
pub fn rc_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/mlerc")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".mlerc"));
    }
    paths
}

/// Read every RC file that exists, splitting each non-empty line on
/// whitespace into argv-style tokens. Missing files are silently skipped;
/// only a fatal parse of the resulting tokens (by [`crate::parse_args`]) is
/// ever an error.
pub fn load_rc_tokens() -> Vec<String> {
    let mut tokens = Vec::new();
    for path in rc_paths() {
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            tokens.extend(line.split_whitespace().map(String::from));
        }
    }
    tokens
}

/// Build the effective argv: RC-file tokens first, then the process's real
/// arguments (excluding argv[0]).
pub fn full_argv(real_args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut argv = load_rc_tokens();
    argv.extend(real_args);
    argv
}
