//! Vkinder - conversational matchmaking over the VK user directory
//!
//! Users are onboarded through a small dialog state machine, then shown one
//! unseen candidate at a time. Every shown candidate is recorded so it is
//! never shown to the same user again.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{Assistant, AssistantError, DiscoveryEngine, DiscoveryOutcome, age_band};
pub use self::models::{BotReply, Command, DialogState, KeyboardVariant};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(age_band(30, 5), (25, 35));
        assert!(!DialogState::new(1).is_ready());
    }
}
