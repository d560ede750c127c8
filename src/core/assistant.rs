use std::sync::Arc;

use crate::core::dialog::{parse_intent, DialogMachine, TextIntent};
use crate::core::discovery::{DiscoveryEngine, DiscoveryOutcome};
use crate::core::error::AssistantError;
use crate::core::prompts;
use crate::core::reactions::ReactionRecorder;
use crate::models::{
    profile_url, Awaiting, BotReply, CandidateId, Command, DialogState, KeyboardVariant,
    ReactionKind, UserId,
};
use crate::services::{ExclusionStore, SessionStore, StoreError};

/// Assistant-level options
#[derive(Debug, Clone, Copy)]
pub struct AssistantOptions {
    pub favorites_limit: usize,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self { favorites_limit: 50 }
    }
}

/// Entry point for inbound chat events
///
/// Each handler locks the user's session for its whole duration, so events
/// of one user are processed one at a time while different users run in
/// parallel. The state snapshot is saved after every handler.
pub struct Assistant {
    sessions: Arc<SessionStore>,
    dialog: DialogMachine,
    discovery: DiscoveryEngine,
    reactions: ReactionRecorder,
    store: Arc<dyn ExclusionStore>,
    options: AssistantOptions,
}

impl Assistant {
    pub fn new(
        sessions: Arc<SessionStore>,
        dialog: DialogMachine,
        discovery: DiscoveryEngine,
        store: Arc<dyn ExclusionStore>,
        options: AssistantOptions,
    ) -> Self {
        Self {
            sessions,
            dialog,
            discovery,
            reactions: ReactionRecorder::new(store.clone()),
            store,
            options,
        }
    }

    /// Start or restart onboarding
    pub async fn on_start(&self, user_id: UserId) -> Result<BotReply, AssistantError> {
        let handle = self.sessions.session(user_id).await;
        let mut state = handle.lock().await;

        tracing::info!("Starting dialog for user {}", user_id);
        let reply = self.dialog.start(&mut state).await;

        self.sessions.save(&state).await;
        Ok(reply)
    }

    /// Handle a free-text message
    pub async fn on_text_message(
        &self,
        user_id: UserId,
        text: &str,
    ) -> Result<BotReply, AssistantError> {
        let handle = self.sessions.session(user_id).await;
        let mut state = handle.lock().await;

        let result = self.dispatch_text(&mut state, text).await;

        self.sessions.save(&state).await;
        result
    }

    /// Handle a decoded keyboard command
    pub async fn on_command(
        &self,
        user_id: UserId,
        command: Command,
    ) -> Result<BotReply, AssistantError> {
        let handle = self.sessions.session(user_id).await;
        let mut state = handle.lock().await;

        let result = self.dispatch_command(&mut state, command).await;

        self.sessions.save(&state).await;
        result
    }

    /// Favorited candidate ids, newest first
    pub async fn favorites(&self, user_id: UserId) -> Result<Vec<CandidateId>, AssistantError> {
        self.reactions
            .favorites(user_id, self.options.favorites_limit)
            .await
    }

    pub fn session_count(&self) -> u64 {
        self.sessions.len()
    }

    pub async fn health_check(&self) -> Result<bool, StoreError> {
        self.store.health_check().await
    }

    async fn dispatch_text(
        &self,
        state: &mut DialogState,
        text: &str,
    ) -> Result<BotReply, AssistantError> {
        let intent = parse_intent(text);

        if intent == Some(TextIntent::Start) {
            return Ok(self.dialog.start(state).await);
        }

        if state.awaiting != Awaiting::None {
            return Ok(self.dialog.handle_input(state, text).await);
        }

        match intent {
            Some(TextIntent::Command(command)) => self.dispatch_command(state, command).await,
            _ if state.is_ready() => Ok(BotReply::new(prompts::HELP, KeyboardVariant::Main)),
            _ => Ok(self.dialog.prompt(state)),
        }
    }

    async fn dispatch_command(
        &self,
        state: &mut DialogState,
        command: Command,
    ) -> Result<BotReply, AssistantError> {
        tracing::debug!("User {} command {:?}", state.user_id, command);

        match command {
            Command::Next => self.next_candidate(state).await,
            Command::Favorite => self.react(state, ReactionKind::Favorite).await,
            Command::Blacklist => self.react(state, ReactionKind::Blacklist).await,
            Command::ListFavorites => self.list_favorites(state).await,
            Command::ChangeSettings => Ok(self.dialog.change_settings(state)),
        }
    }

    async fn next_candidate(&self, state: &mut DialogState) -> Result<BotReply, AssistantError> {
        if !state.is_ready() {
            return Ok(self.dialog.prompt(state));
        }

        let outcome = self.discovery.find_next(state).await?;

        let reply = match outcome {
            DiscoveryOutcome::Found(candidate) => {
                state.last_candidate_id = Some(candidate.candidate_id);
                BotReply::new(candidate.display_text, KeyboardVariant::Main)
                    .with_attachments(candidate.attachments)
            }
            DiscoveryOutcome::Exhausted => {
                BotReply::new(prompts::NO_MORE_CANDIDATES, KeyboardVariant::Main)
            }
            DiscoveryOutcome::Unavailable => {
                BotReply::new(prompts::DIRECTORY_UNAVAILABLE, KeyboardVariant::Main)
            }
            DiscoveryOutcome::NotReady => self.dialog.prompt(state),
        };

        Ok(reply)
    }

    async fn react(
        &self,
        state: &mut DialogState,
        kind: ReactionKind,
    ) -> Result<BotReply, AssistantError> {
        if !state.is_ready() {
            return Ok(self.dialog.prompt(state));
        }

        match self.reactions.record_reaction(state, kind).await {
            Ok(_) => {
                let text = match kind {
                    ReactionKind::Favorite => prompts::ADDED_TO_FAVORITES,
                    ReactionKind::Blacklist => prompts::ADDED_TO_BLACKLIST,
                };
                Ok(BotReply::new(text, KeyboardVariant::Main))
            }
            Err(AssistantError::NoActiveCandidate) => {
                Ok(BotReply::new(prompts::PRESS_NEXT_FIRST, KeyboardVariant::Main))
            }
            Err(e) => Err(e),
        }
    }

    async fn list_favorites(&self, state: &DialogState) -> Result<BotReply, AssistantError> {
        let favorites = self.favorites(state.user_id).await?;
        let keyboard = if state.is_ready() {
            KeyboardVariant::Main
        } else {
            KeyboardVariant::None
        };
        Ok(BotReply::new(render_favorites(&favorites), keyboard))
    }
}

/// Render favorites as one profile link per line
pub fn render_favorites(favorites: &[CandidateId]) -> String {
    if favorites.is_empty() {
        return prompts::FAVORITES_EMPTY.to_string();
    }

    let mut text = String::from(prompts::FAVORITES_HEADER);
    for id in favorites {
        text.push('\n');
        text.push_str(&profile_url(*id));
    }
    text
}
