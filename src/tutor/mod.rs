use crate::config::Settings;
use crate::event::AppEvent;
use crate::session::Message;
use serde_json::{json, Value};
use std::sync::mpsc;
use thiserror::Error;
use tokio::runtime::Handle;

pub mod prompt;

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("endpoint returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed reply: {0}")]
    Protocol(String),
}

#[derive(Clone)]
pub struct TutorClient {
    http: reqwest::Client,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
}

impl TutorClient {
    pub fn new(runtime_handle: Handle, tx: mpsc::Sender<AppEvent>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tx,
            runtime_handle,
        }
    }

    // One request per call, no retries; the epoch travels with the result so
    // a reply landing after a reset is discarded by the controller.
    pub fn send(&self, settings: &Settings, epoch: u64, messages: Vec<Message>) {
        let http = self.http.clone();
        let tx = self.tx.clone();
        let settings = settings.clone();

        self.runtime_handle.spawn(async move {
            let event = match request_reply(&http, &settings, &messages).await {
                Ok(text) => AppEvent::ReplyReceived { epoch, text },
                Err(err) => {
                    tracing::warn!(target: "gradus::tutor", error = %err, "call failed");
                    AppEvent::CallFailed {
                        epoch,
                        message: err.to_string(),
                    }
                }
            };
            let _ = tx.send(event);
        });
    }
}

async fn request_reply(
    http: &reqwest::Client,
    settings: &Settings,
    messages: &[Message],
) -> Result<String, TutorError> {
    let mut request = http
        .post(completions_url(&settings.base_url))
        .json(&build_request_body(&settings.model, messages));
    if !settings.api_key.is_empty() {
        request = request.bearer_auth(&settings.api_key);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TutorError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let payload: Value = response.json().await?;
    reply_text(&payload)
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn build_request_body(model: &str, messages: &[Message]) -> Value {
    json!({
        "model": model,
        "messages": messages,
    })
}

fn reply_text(payload: &Value) -> Result<String, TutorError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|text| text.to_string())
        .ok_or_else(|| TutorError::Protocol("missing choices[0].message.content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::{build_request_body, completions_url, reply_text};
    use crate::session::Message;
    use crate::tutor::prompt;
    use serde_json::json;

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        assert_eq!(
            completions_url("http://localhost:8080/v1/"),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:8080/v1"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_keeps_message_order_and_roles() {
        let messages = vec![
            Message::system(prompt::SYSTEM_INSTRUCTION),
            Message::user("hello"),
            Message::assistant("welcome"),
        ];
        let body = build_request_body("qwen3", &messages);

        assert_eq!(body["model"], "qwen3");
        let wire = body["messages"].as_array().expect("messages should be an array");
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[1]["content"], "hello");
        assert_eq!(wire[2]["role"], "assistant");
    }

    #[test]
    fn reply_text_reads_the_first_choice() {
        let payload = json!({
            "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
        });
        assert_eq!(reply_text(&payload).expect("reply should parse"), "hi there");
    }

    #[test]
    fn reply_text_rejects_missing_content() {
        let payload = json!({"choices": []});
        let error = reply_text(&payload).expect_err("empty choices should fail");
        assert!(error.to_string().contains("malformed reply"));
    }
}
