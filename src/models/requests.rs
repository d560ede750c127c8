use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::Command;

/// Start (or restart) onboarding for a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
}

/// Free-form text typed by the user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TextMessageRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    #[validate(length(max = 4096))]
    #[serde(default)]
    pub text: String,
}

/// A keyboard command already decoded by the transport
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommandRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
    pub command: Command,
}

/// Query for the favorites listing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FavoritesQuery {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: i64,
}
