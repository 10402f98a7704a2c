//! "Apply macro" command (spec §4.2, §4.3): prompts for a macro name and,
//! if found in the registry, sets it as the editor's replay source.

use core_model::CommandContext;
use core_state::{CommandOutcome, MacroReplay, PromptKind};

/// Prompt for a macro name; if it is registered, begin replaying it from
/// index 0. Disallowed while a replay is already in progress (spec §4.2:
/// "Disallowed while already replaying").
pub fn apply_macro(ctx: &mut CommandContext) -> CommandOutcome {
    if ctx.editor.macro_replay.is_some() {
        return CommandOutcome::Failed("already replaying a macro".into());
    }
    let Some(name) = ctx.prompt_host.run_prompt(&mut *ctx.editor, ctx.view, PromptKind::Input) else {
        return CommandOutcome::Ok;
    };
    let Some(m) = ctx.editor.macros.get(&name) else {
        return CommandOutcome::Failed(format!("no such macro: {name}"));
    };
    ctx.editor.macro_replay = Some(MacroReplay::new(m));
    CommandOutcome::Ok
}
