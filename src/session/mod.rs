use serde::{Deserialize, Serialize};

pub mod controller;
pub mod store;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranscriptMeta {
    pub schema_version: u32,
    pub started_at: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StageStateMeta {
    pub schema_version: u32,
    pub text: String,
}

pub fn transcript_markdown(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        let heading = match message.role {
            Role::System => continue,
            Role::User => "## You",
            Role::Assistant => "## Tutor",
        };
        out.push_str(heading);
        out.push_str("\n\n");
        out.push_str(&message.content);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::{transcript_markdown, Message, Role};

    #[test]
    fn roles_serialize_lowercase() {
        let message = Message::assistant("hi");
        let json = serde_json::to_value(&message).expect("message should serialize");
        assert_eq!(json["role"], "assistant");
        let back: Message = serde_json::from_value(json).expect("message should deserialize");
        assert_eq!(back.role, Role::Assistant);
    }

    #[test]
    fn transcript_markdown_skips_the_system_message() {
        let messages = vec![
            Message::system("controller instruction"),
            Message::user("hello"),
            Message::assistant("welcome"),
        ];
        let markdown = transcript_markdown(&messages);
        assert!(!markdown.contains("controller instruction"));
        assert!(markdown.contains("## You\n\nhello"));
        assert!(markdown.contains("## Tutor\n\nwelcome"));
    }
}
