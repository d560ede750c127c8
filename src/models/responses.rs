use serde::{Deserialize, Serialize};

/// Keyboard layout the transport should attach to a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardVariant {
    /// Free text expected (location, age)
    None,
    /// Female / male / any choice
    SexChoice,
    /// Next, favorite, blacklist, favorites, settings
    Main,
}

/// Reply payload handed back to the chat transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotReply {
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub keyboard: KeyboardVariant,
}

impl BotReply {
    pub fn new(text: impl Into<String>, keyboard: KeyboardVariant) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
            keyboard,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Favorites listing response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesResponse {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub favorites: Vec<i64>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
