// Completion events delivered from the tutor client's runtime tasks to the
// egui loop. The epoch ties each event to the session generation that
// dispatched the call.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ReplyReceived { epoch: u64, text: String },
    CallFailed { epoch: u64, message: String },
}
