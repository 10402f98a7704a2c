//! Editor entrypoint: RC-file splicing, CLI parsing, startup buffer/view
//! construction, signal registration, and the terminal-driven main loop.
//!
//! Grounded in `examples/freddiehaddad-oxidized`'s own `main.rs` for the
//! overall shape (an `AppStartup` stage that configures logging and a panic
//! hook before the terminal is entered, followed by a runtime object that
//! owns the loop), adapted from its tokio/channel event source registry to
//! the synchronous single-threaded loop spec §5 calls for.

use anyhow::{Context, Result};
use core_actions::register_default_commands;
use core_config::{CliArgs, ConfigError};
use core_events::Chord;
use core_keymap::{Binding, parse_chord};
use core_model::Editor;
use core_state::MacroReplay;
use core_terminal::{CrosstermBackend, TerminalBackend};
use core_text::Buffer;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;

mod keymaps;
mod prompt_ops;
mod runtime;

fn main() -> ExitCode {
    let _log_guard = configure_logging();
    install_panic_hook();

    let real_args: Vec<String> = std::env::args().skip(1).collect();
    let argv = core_config::rc::full_argv(real_args);
    let cli = match core_config::parse_args(&argv) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            eprint!("{}", core_config::usage_text());
            return ExitCode::from(2);
        }
    };

    if cli.help {
        print!("{}", core_config::usage_text());
        return ExitCode::SUCCESS;
    }
    if cli.version {
        println!("oxidized {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(crashed) => {
            if crashed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!(target: "runtime", error = %e, "fatal startup error");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("oxidized.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "oxidized.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Build the editor from a parsed CLI surface, enter the terminal, and run
/// the main loop to completion. Returns whether a fatal-signal crash dump
/// was performed, which the caller maps to the spec §6 exit code.
fn run(cli: CliArgs) -> Result<bool> {
    let (width, height) = crossterm::terminal::size().context("querying terminal size")?;
    let editor_height = height.saturating_sub(1);

    let (buffer, open_failed) = match cli.files.first() {
        Some(file_arg) => match Buffer::buffer_new_open(&file_arg.path) {
            Ok(buf) => (buf, false),
            Err(e) => {
                tracing::error!(target: "io", path = %file_arg.path.display(), error = %e, "failed to open startup file");
                (Buffer::from_str("untitled", "").context("building empty startup buffer")?, true)
            }
        },
        None => (Buffer::from_str("untitled", "").context("building empty startup buffer")?, false),
    };

    let mut editor = Editor::new(buffer, width, editor_height);
    register_default_commands(&mut editor.commands);
    keymaps::register_default_keymaps(&mut editor.keymaps);
    prompt_ops::register_prompt_commands(&mut editor.commands);

    apply_cli(&mut editor, &cli)?;

    if let Some(line) = cli.files.first().and_then(|f| f.line) {
        goto_startup_line(&mut editor, line, open_failed);
    }

    register_signal_handlers(&editor)?;

    let mut backend = CrosstermBackend::new();
    let _guard = backend.enter_guard().context("entering terminal raw mode")?;
    let tty_fd = std::io::stdin().as_raw_fd();

    let mut rt = runtime::Runtime::new(tty_fd, width, editor_height);
    rt.redraw(&editor).context("initial redraw")?;
    rt.run_inner(&mut editor);

    Ok(rt.crashed)
}

/// Apply the startup definitions parsed from the CLI/RC-file surface (spec
/// §6): user-defined keymaps and their bindings, the macro toggle chord,
/// the initial keymap for the root edit view, user-defined macros, and an
/// optional one-shot startup replay (`-x`).
fn apply_cli(editor: &mut Editor, cli: &CliArgs) -> Result<()> {
    for kmap_def in &cli.keymaps {
        let default_binding = kmap_def.default_cmd.as_ref().map(|cmd| Binding::new(cmd.clone()));
        editor.keymaps.define(kmap_def.name.clone(), default_binding, kmap_def.allow_fallthru);
        for binding_def in &kmap_def.bindings {
            let chord = parse_chord(&binding_def.chord)
                .map_err(|e| anyhow::anyhow!("-k {},{}: {e}", binding_def.command, binding_def.chord))?;
            editor
                .keymaps
                .bind(&kmap_def.name, chord, Binding::new(binding_def.command.clone()))
                .map_err(|e| anyhow::anyhow!("-k {},{}: {e}", binding_def.command, binding_def.chord))?;
        }
    }

    if cli.macro_toggle_key != core_config::DEFAULT_MACRO_TOGGLE {
        editor.macro_toggle_key =
            parse_chord(&cli.macro_toggle_key).with_context(|| format!("-m {}", cli.macro_toggle_key))?;
    }

    for macro_def in &cli.macros {
        let inputs: Result<Vec<Chord>, ConfigError> = macro_def
            .keys
            .iter()
            .map(|k| parse_chord(k).map_err(|_| ConfigError::MalformedMacroDef(k.clone())))
            .collect();
        let inputs = inputs.with_context(|| format!("-M {}", macro_def.name))?;
        editor.macros.insert(core_state::Macro { name: macro_def.name.clone(), inputs });
    }

    if let Some(kmap_name) = &cli.initial_keymap {
        let active_view = editor.active_view;
        if let Some(view) = editor.view_mut(active_view) {
            view.kmap_stack = vec![kmap_name.clone()];
        }
    }

    if let Some(name) = &cli.startup_macro {
        match editor.macros.get(name) {
            Some(m) => editor.macro_replay = Some(MacroReplay::new(m)),
            None => tracing::warn!(target: "startup", macro_name = %name, "-x names an undefined macro"),
        }
    }

    Ok(())
}

/// Move the root view's active cursor to the `file:line` startup position
/// (1-based per spec §6), clamped to the buffer's line count.
fn goto_startup_line(editor: &mut Editor, line: usize, open_failed: bool) {
    if open_failed {
        return;
    }
    let view_id = editor.active_view;
    let Some(view) = editor.view(view_id) else { return };
    let buffer_id = view.buffer;
    let mark = view.cursors[view.active_cursor].mark;
    if let Some(buf) = editor.buffer_mut(buffer_id) {
        let target = line.saturating_sub(1).min(buf.line_count().saturating_sub(1));
        buf.move_mark_to(mark, target, 0);
    }
}

/// Register the fatal-signal set against `editor`'s crash-dump flag (spec
/// §5/§9): the handler only flips an `Arc<AtomicBool>`; the main loop in
/// `runtime::Runtime::run_inner` observes it and performs the actual dump.
fn register_signal_handlers(editor: &Editor) -> Result<()> {
    let flag = editor.crash_dump.shared();
    for sig in [
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGQUIT,
        signal_hook::consts::SIGHUP,
    ] {
        signal_hook::flag::register(sig, flag.clone()).context("registering signal handler")?;
    }
    Ok(())
}
