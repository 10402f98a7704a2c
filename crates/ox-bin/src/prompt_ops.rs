//! Commands bound only inside the `prompt_*` keymaps (spec §4.4): these are
//! the only way a `LoopContext` frame ever gets `submit`/`cancel`led, since
//! the recursive loop has no other exit condition while a prompt is active.

use core_model::CommandContext;
use core_state::CommandOutcome;

fn current_frame_or_fail(ctx: &mut CommandContext) -> Result<&mut core_state::LoopContext, CommandOutcome> {
    ctx.editor
        .loop_stack
        .current_mut()
        .ok_or_else(|| CommandOutcome::Failed("no active prompt".into()))
}

/// Submit the prompt view's buffer contents as the answer (Enter in
/// `prompt_input`).
pub fn prompt_submit(ctx: &mut CommandContext) -> CommandOutcome {
    let Some(buffer_id) = ctx.editor.view(ctx.view).map(|v| v.buffer) else {
        return CommandOutcome::Failed("no such view".into());
    };
    let text = ctx
        .editor
        .buffer(buffer_id)
        .map(|b| b.buffer_get())
        .unwrap_or_default();
    let answer = text.trim_end_matches('\n').to_string();
    match current_frame_or_fail(ctx) {
        Ok(frame) => {
            frame.submit(Some(answer));
            CommandOutcome::Ok
        }
        Err(e) => e,
    }
}

/// Cancel the active prompt (Ctrl-C in `prompt_input`/`prompt_yn`).
pub fn prompt_cancel(ctx: &mut CommandContext) -> CommandOutcome {
    match current_frame_or_fail(ctx) {
        Ok(frame) => {
            frame.cancel();
            CommandOutcome::Ok
        }
        Err(e) => e,
    }
}

pub fn prompt_confirm_yes(ctx: &mut CommandContext) -> CommandOutcome {
    match current_frame_or_fail(ctx) {
        Ok(frame) => {
            frame.submit(Some("y".into()));
            CommandOutcome::Ok
        }
        Err(e) => e,
    }
}

pub fn prompt_confirm_no(ctx: &mut CommandContext) -> CommandOutcome {
    match current_frame_or_fail(ctx) {
        Ok(frame) => {
            frame.submit(Some("n".into()));
            CommandOutcome::Ok
        }
        Err(e) => e,
    }
}

/// Default binding for `prompt_ok`: any key acknowledges and dismisses.
pub fn prompt_ack(ctx: &mut CommandContext) -> CommandOutcome {
    match current_frame_or_fail(ctx) {
        Ok(frame) => {
            frame.submit(Some(String::new()));
            CommandOutcome::Ok
        }
        Err(e) => e,
    }
}

/// Register the prompt-only commands into the shared command registry.
pub fn register_prompt_commands(registry: &mut core_model::CommandRegistry) {
    registry.register("prompt_submit", prompt_submit);
    registry.register("prompt_cancel", prompt_cancel);
    registry.register("prompt_confirm_yes", prompt_confirm_yes);
    registry.register("prompt_confirm_no", prompt_confirm_no);
    registry.register("prompt_ack", prompt_ack);
}
