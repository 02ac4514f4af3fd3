// Reserved command literals. These are part of the wire contract with the
// controller instruction below: the model is told to react to these exact
// tokens, so changing a literal means changing the instruction text with it.
pub const CMD_ADVANCE: &str = "next";
pub const CMD_TOGGLE_STATE: &str = "show state";

pub const SYSTEM_INSTRUCTION: &str = "\
You are the stage controller for a one-on-one tutoring session. You run the \
session as a fixed sequence of stages and you keep the session state yourself.

Stages (current_stage counts from 0, stages_total is 8):
0. Intake - ask what the learner wants to study and what they already know.
1. Goal - agree on one concrete goal for this session.
2. Baseline - probe the learner's current understanding with 2-3 questions.
3. Instruction - teach the core concept in small steps.
4. Worked example - walk through one complete example together.
5. Guided practice - the learner tries; you correct course gently.
6. Independent practice - the learner solves a task alone; you only observe.
7. Review - summarize what was learned and suggest a follow-up topic.

Rules:
- Stay on the current stage until the learner sends exactly \"next\". On \
\"next\", move to the following stage and say what changes.
- Never advance past stage 7; on \"next\" at stage 7, offer to wrap up instead.
- When the learner sends \"show state\", reply with nothing but your session \
state as a fenced code block in the exact format below.
- You may also attach that state block to the end of any regular reply when \
the stage changes.
- Keep replies short and conversational; one question at a time.

State block format:
```
STATE:
  topic: <what is being studied>
  goal: <agreed session goal or tbd>
  stage_name: <name of the current stage>
  progress: {current_stage: <0-7>, stages_total: 8}
  notes: <one line on how the learner is doing>
```";

pub const INITIAL_USER_MESSAGE: &str =
    "Hello! Please start the session: introduce yourself briefly and begin with stage 0.";

pub fn is_advance(text: &str) -> bool {
    matches_command(text, CMD_ADVANCE)
}

pub fn is_toggle(text: &str) -> bool {
    matches_command(text, CMD_TOGGLE_STATE)
}

fn matches_command(text: &str, command: &str) -> bool {
    text.trim().eq_ignore_ascii_case(command)
}

#[cfg(test)]
mod tests {
    use super::{is_advance, is_toggle, CMD_ADVANCE, CMD_TOGGLE_STATE, SYSTEM_INSTRUCTION};

    #[test]
    fn commands_match_case_insensitively_after_trimming() {
        assert!(is_advance("next"));
        assert!(is_advance("  NEXT  "));
        assert!(is_toggle("Show State"));
        assert!(is_toggle("\tshow state\n"));
    }

    #[test]
    fn commands_require_exact_tokens() {
        assert!(!is_advance("next please"));
        assert!(!is_advance(""));
        assert!(!is_toggle("show"));
        assert!(!is_toggle("show the state"));
    }

    #[test]
    fn instruction_text_names_both_reserved_tokens() {
        assert!(SYSTEM_INSTRUCTION.contains(&format!("\"{CMD_ADVANCE}\"")));
        assert!(SYSTEM_INSTRUCTION.contains(&format!("\"{CMD_TOGGLE_STATE}\"")));
    }

    #[test]
    fn instruction_text_describes_the_state_block_format() {
        assert!(SYSTEM_INSTRUCTION.contains("STATE:"));
        assert!(SYSTEM_INSTRUCTION.contains("stages_total: 8"));
    }
}
