//! Prompt text for each phase of a run.

/// System prompt for a sandbox whose repository lives at `workspace_root`.
pub fn system_prompt(workspace_root: &str) -> String {
    format!(
        "You are an autonomous coding agent operating in a secure sandbox.\n\
         Your repository is located at {workspace_root}.\n\
         You can: run shell commands, read/write files, install packages, and apply partial code edits.\n\
         Follow these rules strictly:\n\
         - Use pnpm for Node.js package operations (never npm or yarn).\n\
         - Never use interactive editors (nano, vim) or interactive prompts; all commands must be non-interactive.\n\
         - Prefer small, testable iterations with concrete, reproducible commands and file edits.\n\
         - Do not ask the user questions; decide and proceed with the best next step."
    )
}

/// First request of a run: an initial plan for `task`.
pub fn planning_prompt(task: &str) -> String {
    format!(
        "Task: {task}\n\
         Constraints:\n\
         - Use pnpm for all Node tasks\n\
         - Keep steps atomic\n\
         - After each step, propose the exact next tool call you will make"
    )
}

/// Trailing instruction when asking for the next tool call.
pub const TOOL_CALL_INSTRUCTION: &str = "Return one JSON {tool, args}. Continue the task.";

/// Trailing instruction when asking whether the task is finished.
pub const VERDICT_INSTRUCTION: &str = "If the task is complete, respond starting with 'DONE:' and \
     provide a brief summary. Otherwise, describe the next step briefly.";

const DONE_PREFIX: &str = "DONE:";

/// A verdict ends the run when it starts with `DONE:`, in any case.
///
/// The match is anchored at the very first character; leading whitespace
/// or prose before the marker does not count.
pub fn is_done(verdict: &str) -> bool {
    verdict
        .get(..DONE_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(DONE_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_is_case_insensitive_and_anchored() {
        assert!(is_done("DONE: finished"));
        assert!(is_done("done: finished"));
        assert!(is_done("Done:"));
        assert!(!is_done("almost DONE: not yet"));
        assert!(!is_done(" DONE: leading space"));
        assert!(!is_done("DONE without colon"));
        assert!(!is_done(""));
    }

    #[test]
    fn multibyte_verdicts_do_not_panic() {
        assert!(!is_done("ééé"));
        assert!(!is_done("✓✓"));
    }

    #[test]
    fn system_prompt_names_workspace() {
        let prompt = system_prompt("/home/user/workspace");
        assert!(prompt.contains("Your repository is located at /home/user/workspace."));
        assert!(prompt.contains("never npm or yarn"));
    }

    #[test]
    fn planning_prompt_leads_with_task() {
        assert!(planning_prompt("add tests").starts_with("Task: add tests\nConstraints:"));
    }
}
