use crate::session::Message;
use crate::state_block::{self, ProgressInfo};
use crate::tutor::prompt;
use std::time::{Duration, Instant};

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingReply,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub epoch: u64,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Debounced,
    Busy,
    EmptyInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(RejectReason),
    ToggledLocally { visible: bool },
    Dispatch(CallRequest),
}

pub struct SessionController {
    phase: Phase,
    messages: Vec<Message>,
    stage_state: Option<String>,
    visible: bool,
    epoch: u64,
    last_accepted_at: Option<Instant>,
    pending_user_text: Option<String>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            messages: Vec::new(),
            stage_state: None,
            visible: false,
            epoch: 0,
            last_accepted_at: None,
            pending_user_text: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn stage_state(&self) -> Option<&str> {
        self.stage_state.as_deref()
    }

    pub fn state_visible(&self) -> bool {
        self.visible
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn progress(&self) -> ProgressInfo {
        state_block::parse_progress(self.stage_state.as_deref())
    }

    // The toggle command with a non-blank stage state on hand flips
    // visibility without a round-trip; everything else goes to the model.
    pub fn is_local_toggle(&self, text: &str) -> bool {
        self.phase == Phase::Active
            && prompt::is_toggle(text)
            && self
                .stage_state
                .as_deref()
                .is_some_and(|state| !state.trim().is_empty())
    }

    pub fn start(&mut self, now: Instant) -> Option<CallRequest> {
        if self.phase != Phase::Idle || self.debounced(now) {
            return None;
        }
        self.stamp(now);
        self.messages.push(Message::system(prompt::SYSTEM_INSTRUCTION));
        self.messages.push(Message::user(prompt::INITIAL_USER_MESSAGE));
        self.pending_user_text = Some(prompt::INITIAL_USER_MESSAGE.to_string());
        self.phase = Phase::AwaitingReply;
        Some(self.call_request())
    }

    pub fn submit(&mut self, text: &str, now: Instant) -> SubmitOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }
        if self.phase != Phase::Active {
            return SubmitOutcome::Rejected(RejectReason::Busy);
        }
        if self.debounced(now) {
            return SubmitOutcome::Rejected(RejectReason::Debounced);
        }
        self.stamp(now);

        if self.is_local_toggle(trimmed) {
            self.visible = !self.visible;
            return SubmitOutcome::ToggledLocally {
                visible: self.visible,
            };
        }

        self.messages.push(Message::user(trimmed));
        self.pending_user_text = Some(trimmed.to_string());
        self.phase = Phase::AwaitingReply;
        SubmitOutcome::Dispatch(self.call_request())
    }

    pub fn apply_reply(&mut self, epoch: u64, text: &str) -> bool {
        if epoch != self.epoch || self.phase != Phase::AwaitingReply {
            return false;
        }
        self.messages.push(Message::assistant(text));

        match state_block::extract_state_block(text) {
            Some(block) => {
                self.stage_state = Some(block);
                self.visible = true;
            }
            None => {
                // Asked to show state but nothing came back: treat as a hide.
                let asked_to_toggle = self
                    .pending_user_text
                    .as_deref()
                    .is_some_and(prompt::is_toggle);
                if asked_to_toggle {
                    self.stage_state = None;
                    self.visible = false;
                }
            }
        }

        self.pending_user_text = None;
        self.phase = Phase::Active;
        true
    }

    // The user message stays committed; only the in-flight marker is undone.
    pub fn apply_failure(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || self.phase != Phase::AwaitingReply {
            return false;
        }
        self.pending_user_text = None;
        self.phase = Phase::Active;
        true
    }

    pub fn reset(&mut self, now: Instant) -> bool {
        if self.debounced(now) {
            return false;
        }
        self.stamp(now);
        self.messages.clear();
        self.stage_state = None;
        self.visible = false;
        self.pending_user_text = None;
        self.epoch += 1;
        self.phase = Phase::Idle;
        true
    }

    // Startup-only: re-enter a persisted session. The restored stage state
    // stays hidden until the user asks for it again.
    pub fn restore(&mut self, messages: Vec<Message>, stage_state: Option<String>) {
        if self.phase != Phase::Idle || messages.is_empty() {
            return;
        }
        self.messages = messages;
        self.stage_state = stage_state;
        self.visible = false;
        self.phase = Phase::Active;
    }

    fn call_request(&self) -> CallRequest {
        CallRequest {
            epoch: self.epoch,
            messages: self.messages.clone(),
        }
    }

    fn debounced(&self, now: Instant) -> bool {
        self.last_accepted_at
            .is_some_and(|last| now.saturating_duration_since(last) < DEBOUNCE_WINDOW)
    }

    fn stamp(&mut self, now: Instant) {
        self.last_accepted_at = Some(now);
    }
}
