//! The synchronous, single-threaded event loop (spec §4.1/§4.3/§4.4/§5):
//! polls the TTY and async-proc pipes through one `AsyncMultiplexer` pass at
//! a time, resolves and dispatches the resulting chord, and recurses into
//! itself (via [`PromptHost::run_prompt`]) to serve a nested prompt without
//! any extra thread or channel.
//!
//! Grounded in `original_source/editor.c`'s `editor_run`/`_editor_loop`
//! (single `_editor_get_input` call per iteration, feeding either macro
//! replay or a real key, followed by one dispatch and one redraw) and in
//! `other_examples/01a2004e_dumitru-stama-Bark__src-persistent_shell.rs.rs`'s
//! poll-then-act main loop shape.

use core_events::{Chord, InputEvent};
use core_input::multiplexer::{AsyncMultiplexer, PassOutcome};
use core_keymap::resolve;
use core_model::{CommandContext, Editor, PromptHost, ViewId, ViewType, layout::LayoutRegion};
use core_state::{CommandOutcome, LoopContext, PromptKind};
use core_terminal::CellGrid;
use core_text::Buffer;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

pub struct Runtime {
    mux: AsyncMultiplexer,
    grid: CellGrid,
    prev_grid: CellGrid,
    stdout: io::Stdout,
    /// Set once a fatal-signal dump has been written, so `main` exits with
    /// the spec §6 "1 on fatal signal path" code instead of 0.
    pub crashed: bool,
}

impl Runtime {
    pub fn new(tty_fd: RawFd, width: u16, height: u16) -> Self {
        Self {
            mux: AsyncMultiplexer::new(tty_fd),
            grid: CellGrid::new(width, height),
            prev_grid: CellGrid::new(width, height),
            stdout: io::stdout(),
            crashed: false,
        }
    }

    /// Redraw unconditionally; `main` calls this once before the first
    /// input cycle so the initial buffer contents are visible immediately.
    pub fn redraw(&mut self, editor: &Editor) -> io::Result<()> {
        core_render::render(editor, &mut self.grid);
        core_terminal::present(&mut self.stdout, &mut self.prev_grid, &self.grid)
            .map_err(|e| io::Error::other(e.to_string()))
    }

    /// Drive `editor` until its own exit flag, or (when a prompt frame is
    /// active) that frame's `should_exit`, is set. Returns the submitted
    /// answer when called as a nested prompt loop; `None` at top level.
    pub fn run_inner(&mut self, editor: &mut Editor) -> Option<String> {
        loop {
            if !self.crashed && editor.crash_dump.is_raised() {
                self.perform_crash_dump(editor);
                self.crashed = true;
                editor.exit_requested = true;
            }
            if editor.exit_requested {
                break;
            }
            if let Some(frame) = editor.loop_stack.current_mut() {
                if frame.should_exit {
                    break;
                }
            }
            if let Err(e) = self.step(editor) {
                tracing::error!(target: "runtime.loop", error = %e, "input/render cycle failed");
                editor.exit_requested = true;
            }
        }
        if editor.loop_stack.is_active() {
            editor.loop_stack.pop().and_then(|f| f.prompt_answer)
        } else {
            None
        }
    }

    /// One full input->dispatch->redraw cycle.
    fn step(&mut self, editor: &mut Editor) -> io::Result<()> {
        let chord = self.next_chord(editor)?;
        let Some(chord) = chord else {
            return Ok(());
        };

        // Recorded unconditionally, per spec §4.3, before the toggle key
        // itself is examined — the toggle keystroke that stops a recording
        // needs to land in the buffer so `MacroRecorder::stop` can trim it.
        editor.macro_recorder.push_input(chord);

        if chord == editor.macro_toggle_key {
            self.toggle_macro_record(editor);
        } else {
            self.dispatch(editor, chord);
        }

        self.redraw(editor)
    }

    /// Pull the next chord from an in-progress macro replay, falling
    /// through to a real multiplexer pass once it's exhausted (spec §4.3).
    fn next_chord(&mut self, editor: &mut Editor) -> io::Result<Option<Chord>> {
        if let Some(replay) = editor.macro_replay.as_mut() {
            match replay.next() {
                Some(chord) => return Ok(Some(chord)),
                None => editor.macro_replay = None,
            }
        }
        self.poll_input(editor)
    }

    /// Run multiplexer passes until the TTY yields a decoded key chord.
    /// Resize events update the editor directly and a pass returns `None`
    /// either way, handing control back to the caller so exit/crash flags
    /// are re-checked promptly rather than starving the outer loop.
    fn poll_input(&mut self, editor: &mut Editor) -> io::Result<Option<Chord>> {
        loop {
            match self.mux.pass()? {
                PassOutcome::TtyReady => {
                    return match core_input::next_input_event()? {
                        Some(InputEvent::Key(chord)) => Ok(Some(chord)),
                        Some(InputEvent::Resize { width, height }) => {
                            editor.resize_screen(width, height);
                            Ok(None)
                        }
                        None => Ok(None),
                    };
                }
                PassOutcome::Callbacks(_events) => {
                    // No async-proc consumer is wired up yet; the
                    // multiplexer contract (poll, deadline, TTY priority)
                    // is exercised, but nothing registers a proc fd today.
                    return Ok(None);
                }
                PassOutcome::Idle => continue,
            }
        }
    }

    fn toggle_macro_record(&mut self, editor: &mut Editor) {
        if editor.macro_recorder.is_recording() {
            if let Some(m) = editor.macro_recorder.stop() {
                tracing::debug!(target: "macro", name = %m.name, inputs = m.inputs.len(), "recorded macro");
                editor.macros.insert(m);
            }
        } else {
            let view = editor.active_view;
            if let Some(name) = self.run_prompt(editor, view, PromptKind::Input) {
                editor.macro_recorder.start(name);
            }
        }
    }

    fn dispatch(&mut self, editor: &mut Editor, chord: Chord) {
        let view_id = editor.active_view;
        let Some(stack) = editor.view(view_id).map(|v| v.kmap_stack.clone()) else {
            return;
        };
        let resolved = resolve(&editor.keymaps, &stack, &chord, |name| editor.commands.contains(name));
        let Some(resolved) = resolved else {
            tracing::debug!(target: "dispatch", ?chord, "no binding resolved");
            return;
        };
        let command_name = resolved.binding.command.clone();
        let param = resolved.binding.param.clone();
        let Some(f) = editor.commands.get(&command_name) else {
            return;
        };
        let mut ctx = CommandContext {
            editor,
            view: view_id,
            cursor_index: 0,
            chord,
            param,
            prompt_host: self,
        };
        if let CommandOutcome::Failed(msg) = f(&mut ctx) {
            tracing::warn!(target: "dispatch", command = %command_name, error = %msg, "command failed");
        }
    }

    fn perform_crash_dump(&self, editor: &Editor) {
        let pid = std::process::id();
        for (idx, (_, buf)) in editor.buffers().enumerate() {
            if !buf.dirty {
                continue;
            }
            let path = core_state::crash_dump_path(pid, idx);
            if let Err(e) = std::fs::write(&path, buf.buffer_get()) {
                tracing::error!(target: "runtime.crash", path, error = %e, "failed to write crash dump");
            } else {
                tracing::error!(target: "runtime.crash", path, "wrote crash dump");
            }
        }
        let _ = self.stdout.lock().flush();
    }
}

impl PromptHost for Runtime {
    fn run_prompt(&mut self, editor: &mut Editor, invoker: ViewId, kind: PromptKind) -> Option<String> {
        let kmap_name = match &kind {
            PromptKind::Input => "prompt_input",
            PromptKind::YesNo => "prompt_yn",
            PromptKind::Ok => "prompt_ok",
            PromptKind::Custom(name) => name.as_str(),
        };
        let buffer_id = editor.add_buffer(Buffer::from_str("prompt", "").expect("empty buffer never fails"));
        let region = LayoutRegion::new(0, editor.screen_height.saturating_sub(2), editor.screen_width, 1);
        let prompt_view = editor.new_view(buffer_id, region, ViewType::Prompt);
        if let Some(v) = editor.view_mut(prompt_view) {
            v.kmap_stack = if matches!(kind, PromptKind::Input) {
                vec!["edit".to_string(), kmap_name.to_string()]
            } else {
                vec![kmap_name.to_string()]
            };
        }

        let prior_active = editor.active_view;
        let prior_prompt_view = editor.prompt_view;
        editor.prompt_view = Some(prompt_view);
        editor.set_active(prompt_view);

        if editor.loop_stack.push(LoopContext::new(Some(invoker.0 as usize))).is_err() {
            tracing::warn!(target: "runtime.prompt", "nested prompt disallowed");
            editor.prompt_view = prior_prompt_view;
            editor.set_active(prior_active);
            let _ = editor.close_view(prompt_view);
            return None;
        }
        editor.loop_depth += 1;

        let answer = self.run_inner(editor);

        editor.loop_depth -= 1;
        editor.prompt_view = prior_prompt_view;
        let _ = editor.close_view(prompt_view);
        editor.set_active(prior_active);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_actions::register_default_commands;
    use core_events::KeyToken;
    use core_text::Buffer as TextBuffer;

    fn editor() -> Editor {
        let mut ed = Editor::new(TextBuffer::from_str("t", "").unwrap(), 20, 10);
        register_default_commands(&mut ed.commands);
        crate::keymaps::register_default_keymaps(&mut ed.keymaps);
        crate::prompt_ops::register_prompt_commands(&mut ed.commands);
        ed
    }

    #[test]
    fn dispatch_unbound_chord_is_a_noop() {
        let mut ed = editor();
        let mut rt = Runtime::new(0, 20, 10);
        rt.dispatch(&mut ed, Chord::ctrl('z'));
        assert!(!ed.exit_requested);
    }

    #[test]
    fn dispatch_quit_sets_exit_requested() {
        let mut ed = editor();
        let mut rt = Runtime::new(0, 20, 10);
        rt.dispatch(&mut ed, Chord::ctrl('q'));
        assert!(ed.exit_requested);
    }

    #[test]
    fn run_prompt_recurses_and_restores_active_view() {
        let mut ed = editor();
        let mut rt = Runtime::new(0, 20, 10);
        let root = ed.active_view;
        // No real TTY in a test context, so drive the submission directly
        // rather than through `run_inner`'s multiplexer pass.
        let answer = {
            let buffer_id = ed.add_buffer(TextBuffer::from_str("prompt", "hi").unwrap());
            let region = LayoutRegion::new(0, 8, 20, 1);
            let prompt_view = ed.new_view(buffer_id, region, ViewType::Prompt);
            ed.set_active(prompt_view);
            ed.loop_stack.push(LoopContext::new(Some(root.0 as usize))).unwrap();
            let frame = ed.loop_stack.current_mut().unwrap();
            frame.submit(Some("hi".into()));
            let popped = ed.loop_stack.pop().unwrap();
            ed.close_view(prompt_view).unwrap();
            ed.set_active(root);
            popped.prompt_answer
        };
        assert_eq!(answer.as_deref(), Some("hi"));
        assert_eq!(ed.active_view, root);
        let _ = rt;
    }

    fn buffer_text(ed: &Editor) -> String {
        let view_id = ed.active_view;
        let buf_id = ed.view(view_id).unwrap().buffer;
        ed.buffer(buf_id).unwrap().buffer_get()
    }

    // Replaying a recorded macro against an equivalent initial state
    // reproduces the same final buffer bytes as dispatching the same
    // chords live.
    #[test]
    fn macro_replay_reproduces_live_dispatch_bytes() {
        let chords = [
            Chord::plain(KeyToken::Char('a')),
            Chord::plain(KeyToken::Char('b')),
            Chord::plain(KeyToken::Named(core_events::NamedKey::Enter)),
            Chord::plain(KeyToken::Char('c')),
        ];

        let mut live = editor();
        let mut rt = Runtime::new(0, 20, 10);
        for c in chords {
            rt.dispatch(&mut live, c);
        }
        let live_text = buffer_text(&live);

        let mut recorder = core_state::MacroRecorder::default();
        recorder.start("m");
        for c in chords {
            recorder.push_input(c);
        }
        // No toggle keystroke was recorded in this harness (we drive the
        // recorder directly rather than through `step`), so nothing needs
        // trimming; `stop` still pops one element per its contract, so feed
        // it one extra no-op chord to stand in for that toggle key.
        recorder.push_input(Chord::plain(KeyToken::Char('\0')));
        let m = recorder.stop().expect("recording was active");
        assert_eq!(m.inputs, chords.to_vec());

        let mut replayed = editor();
        let mut replay = core_state::MacroReplay::new(&m);
        while let Some(c) = replay.next() {
            rt.dispatch(&mut replayed, c);
        }
        let replayed_text = buffer_text(&replayed);

        assert_eq!(replayed_text, live_text);
        assert_eq!(replayed_text, "ab\nc");
    }
}
