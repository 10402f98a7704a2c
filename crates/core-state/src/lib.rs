//! Macro recorder/replayer (spec §4.3), prompt loop-context stack (§4.4),
//! and crash-dump-on-signal bookkeeping (§5).
//!
//! This crate deliberately knows nothing about `View`/`Cursor`/`Editor`
//! (those live in `core-model`, which depends on this crate, not the other
//! way around) — it only holds the generic state machines those higher
//! layers drive.

use core_events::Chord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

// ---------------------------------------------------------------------
// Macro record/replay (spec §4.3)
// ---------------------------------------------------------------------

/// A named buffer of recorded input chords.
#[derive(Debug, Clone, Default)]
pub struct Macro {
    pub name: String,
    pub inputs: Vec<Chord>,
}

/// Name-keyed map of completed macros.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<String, Macro>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, m: Macro) {
        self.macros.insert(m.name.clone(), m);
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }
}

/// Recorder-side state: `recording` flag plus the macro under construction.
#[derive(Debug, Clone, Default)]
pub struct MacroRecorder {
    recording: bool,
    record: Option<Macro>,
}

impl MacroRecorder {
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Begin recording a new (empty) macro under `name`.
    pub fn start(&mut self, name: impl Into<String>) {
        self.record = Some(Macro {
            name: name.into(),
            inputs: Vec::new(),
        });
        self.recording = true;
    }

    /// Record one input chord, if currently recording. Called
    /// unconditionally by the event loop before the macro-toggle key is
    /// itself examined, per `original_source/editor.c`'s
    /// `_editor_record_macro_input` — so the toggle keystroke that *stops*
    /// recording ends up in the buffer and must be trimmed on stop.
    pub fn push_input(&mut self, chord: Chord) {
        if let Some(m) = &mut self.record {
            m.inputs.push(chord);
        }
    }

    /// Stop recording, trim the trailing toggle keystroke, and return the
    /// finished macro for insertion into the registry. Returns `None` if no
    /// recording was in progress.
    pub fn stop(&mut self) -> Option<Macro> {
        self.recording = false;
        let mut m = self.record.take()?;
        m.inputs.pop();
        Some(m)
    }
}

/// Replayer-side state: the macro currently replaying plus the next index
/// to emit.
#[derive(Debug, Clone)]
pub struct MacroReplay {
    pub macro_name: String,
    inputs: Vec<Chord>,
    index: usize,
}

impl MacroReplay {
    pub fn new(m: &Macro) -> Self {
        Self {
            macro_name: m.name.clone(),
            inputs: m.inputs.clone(),
            index: 0,
        }
    }

    /// Yield the next recorded chord, or `None` once exhausted (at which
    /// point the input source resumes reading from the TTY, per spec
    /// §4.3).
    pub fn next(&mut self) -> Option<Chord> {
        let c = self.inputs.get(self.index).copied();
        if c.is_some() {
            self.index += 1;
        }
        c
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.inputs.len()
    }
}

// ---------------------------------------------------------------------
// Prompt subsystem loop-context stack (spec §4.4)
// ---------------------------------------------------------------------

/// The kind of prompt keymap to install, per spec §4.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// Free-text input, submitted with Enter.
    Input,
    /// Yes/No, submitted with `y`/`n`.
    YesNo,
    /// Acknowledge-only.
    Ok,
    /// Caller-supplied keymap name.
    Custom(String),
}

/// Per-event-loop-frame state: exit flag, prompt result, and the view that
/// invoked the prompt (so the answer can be routed back to it).
#[derive(Debug, Clone, Default)]
pub struct LoopContext {
    pub should_exit: bool,
    pub prompt_answer: Option<String>,
    /// Opaque handle to the invoking view (an index into `core-model`'s
    /// view list); this crate does not know the `ViewId` type, so the
    /// caller stores whatever numeric handle it uses.
    pub invoker_view: Option<usize>,
}

impl LoopContext {
    pub fn new(invoker_view: Option<usize>) -> Self {
        Self {
            should_exit: false,
            prompt_answer: None,
            invoker_view,
        }
    }

    /// Submit an answer and request the frame to exit (Enter in input
    /// mode, Y/N in yn mode).
    pub fn submit(&mut self, answer: Option<String>) {
        self.prompt_answer = answer;
        self.should_exit = true;
    }

    /// Cancel (Ctrl-C): answer is null, frame still exits.
    pub fn cancel(&mut self) {
        self.prompt_answer = None;
        self.should_exit = true;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("nested prompts are not supported")]
    NestedPromptDisallowed,
}

/// Explicit loop-context stack modeling the recursive event loop of spec
/// §4.4/§9 ("Recursive event loop for prompts"): `run_inner(loop_ctx)` is
/// modeled here as push/pop around a recursive call in the caller.
#[derive(Debug, Clone, Default)]
pub struct LoopContextStack {
    frames: Vec<LoopContext>,
}

impl LoopContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new prompt frame. Spec §4.4: "Nested prompts are disallowed
    /// (caller receives an error)."
    pub fn push(&mut self, ctx: LoopContext) -> Result<(), PromptError> {
        if !self.frames.is_empty() {
            return Err(PromptError::NestedPromptDisallowed);
        }
        self.frames.push(ctx);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<LoopContext> {
        self.frames.pop()
    }

    pub fn current_mut(&mut self) -> Option<&mut LoopContext> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }
}

// ---------------------------------------------------------------------
// Command outcome (spec §4.2: "return success or failure")
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ok,
    Failed(String),
}

impl CommandOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, CommandOutcome::Ok)
    }
}

// ---------------------------------------------------------------------
// Crash-dump-on-signal bookkeeping (spec §5)
// ---------------------------------------------------------------------

/// Shared flag set by the signal handler, observed by the main loop, which
/// performs the actual dump-and-exit (spec §9: "the handler only sets a
/// flag and writes to a self-pipe; the main loop observes and performs the
/// dump before exiting").
#[derive(Debug, Clone)]
pub struct CrashDumpFlag(Arc<AtomicBool>);

impl CrashDumpFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Expose the inner flag for registration with `signal_hook::flag`,
    /// which writes `true` to an `Arc<AtomicBool>` directly from the signal
    /// handler rather than invoking a callback.
    pub fn shared(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Default for CrashDumpFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The `mle.bak.<pid>.<n>` naming scheme of spec §5.
pub fn crash_dump_path(pid: u32, buffer_index: usize) -> String {
    format!("mle.bak.{pid}.{buffer_index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::KeyToken;

    #[test]
    fn macro_record_trims_trailing_toggle_key() {
        let mut rec = MacroRecorder::default();
        rec.start("q");
        rec.push_input(Chord::plain(KeyToken::Char('a')));
        rec.push_input(Chord::plain(KeyToken::Char('b')));
        rec.push_input(Chord::alt(KeyToken::Char('r'))); // the toggle key itself
        let m = rec.stop().unwrap();
        assert_eq!(m.inputs.len(), 2);
        assert!(!rec.is_recording());
    }

    #[test]
    fn macro_replay_falls_through_to_tty_when_exhausted() {
        let m = Macro {
            name: "q".into(),
            inputs: vec![Chord::plain(KeyToken::Char('x'))],
        };
        let mut replay = MacroReplay::new(&m);
        assert_eq!(replay.next(), Some(Chord::plain(KeyToken::Char('x'))));
        assert!(replay.is_exhausted());
        assert_eq!(replay.next(), None);
    }

    #[test]
    fn loop_context_stack_rejects_nested_prompts() {
        let mut stack = LoopContextStack::new();
        stack.push(LoopContext::new(Some(0))).unwrap();
        let err = stack.push(LoopContext::new(Some(1))).unwrap_err();
        assert_eq!(err, PromptError::NestedPromptDisallowed);
    }

    #[test]
    fn loop_context_submit_and_cancel() {
        let mut ctx = LoopContext::new(None);
        ctx.submit(Some("yes".into()));
        assert!(ctx.should_exit);
        assert_eq!(ctx.prompt_answer.as_deref(), Some("yes"));

        let mut ctx2 = LoopContext::new(None);
        ctx2.cancel();
        assert!(ctx2.should_exit);
        assert!(ctx2.prompt_answer.is_none());
    }
}
