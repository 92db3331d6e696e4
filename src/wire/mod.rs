use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// ========================================
/// Records exchanged with the generative API
/// ========================================

pub const DEFAULT_IMAGE_WIDTH: u32 = 514;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 1024;

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
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl TextRequest {
    /// The last user turn, which is what prompt-only endpoints receive.
    pub fn last_user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub enhance: bool,
    pub nologo: bool,
}

impl ImageRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, seed: u64) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            seed,
            width: DEFAULT_IMAGE_WIDTH,
            height: DEFAULT_IMAGE_HEIGHT,
            enhance: true,
            nologo: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageReply {
    #[serde(skip)]
    pub bytes: Bytes,
    pub byte_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ImageReply {
    pub fn new(bytes: impl Into<Bytes>, mime_type: Option<String>) -> Self {
        let bytes = bytes.into();
        Self { byte_len: bytes.len(), bytes, mime_type }
    }
}

/// Text reply as recorded in transcripts.
#[derive(Debug, Clone, Serialize)]
pub struct TextReply<'a> {
    pub content: &'a str,
}
