// Dialog core exports
pub mod assistant;
pub mod dialog;
pub mod discovery;
pub mod error;
pub mod filters;
pub mod prompts;
pub mod reactions;

pub use assistant::{render_favorites, Assistant, AssistantOptions};
pub use dialog::{match_target_sex, parse_age, parse_intent, DialogMachine, DialogOptions, TextIntent};
pub use discovery::{search_sex, DiscoveryEngine, DiscoveryLimits, DiscoveryOutcome};
pub use error::AssistantError;
pub use filters::{age_band, first_eligible, is_unseen, is_visible};
pub use reactions::ReactionRecorder;
