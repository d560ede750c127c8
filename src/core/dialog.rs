use std::sync::Arc;

use crate::core::error::AssistantError;
use crate::core::prompts;
use crate::models::{
    Awaiting, BotReply, Command, DialogState, KeyboardVariant, SexSelection, TargetSex, MAX_AGE,
    MIN_AGE,
};
use crate::services::{ExclusionStore, LocationLookup, ProfileLookup};

/// Free-text tokens mapped to a target sex, checked in order
///
/// Female comes first so that "female"/"women" never fall through to the
/// male rule via their "male"/"men" substrings.
const SEX_RULES: &[(&[&str], TargetSex)] = &[
    (&["жен", "дев", "female", "woman", "women", "girl"], TargetSex::Female),
    (&["муж", "пар", "male", "man", "men", "guy", "boy"], TargetSex::Male),
    (&["неваж", "не важ", "любо", "все", "всё", "any", "both", "all"], TargetSex::Any),
];

const START_ALIASES: &[&str] = &["/start", "start", "начать", "привет"];

const COMMAND_ALIASES: &[(&[&str], Command)] = &[
    (&["next", "дальше"], Command::Next),
    (&["favorite", "like", "в избранное"], Command::Favorite),
    (&["blacklist", "block", "в чс", "чс"], Command::Blacklist),
    (&["favorites", "избранное"], Command::ListFavorites),
    (&["settings", "change settings", "настройки"], Command::ChangeSettings),
];

/// What a free-text message asks for, outside onboarding input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextIntent {
    Start,
    Command(Command),
}

/// Lowercase, trim and drop leading emoji from keyboard labels
fn normalize(text: &str) -> String {
    text.trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric() && c != '/')
        .trim()
        .to_lowercase()
}

/// Map a message to a start request or a command by exact alias
pub fn parse_intent(text: &str) -> Option<TextIntent> {
    let normalized = normalize(text);
    if START_ALIASES.contains(&normalized.as_str()) {
        return Some(TextIntent::Start);
    }
    COMMAND_ALIASES
        .iter()
        .find(|(aliases, _)| aliases.contains(&normalized.as_str()))
        .map(|(_, command)| TextIntent::Command(*command))
}

/// Match free text against the sex rules; `None` means ask again
pub fn match_target_sex(text: &str) -> Option<TargetSex> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    SEX_RULES
        .iter()
        .find(|(tokens, _)| tokens.iter().any(|token| lowered.contains(token)))
        .map(|(_, target)| *target)
}

/// Parse a self-reported age within [MIN_AGE, MAX_AGE]
pub fn parse_age(text: &str) -> Result<u8, AssistantError> {
    let trimmed = text.trim();
    let age: i64 = trimmed
        .parse()
        .map_err(|_| AssistantError::Validation(format!("not a number: {:?}", trimmed)))?;

    if age < i64::from(MIN_AGE) || age > i64::from(MAX_AGE) {
        return Err(AssistantError::Validation(format!(
            "age {} outside {}..={}",
            age, MIN_AGE, MAX_AGE
        )));
    }
    Ok(age as u8)
}

/// Onboarding options
#[derive(Debug, Clone, Copy)]
pub struct DialogOptions {
    pub sex_selection: SexSelection,
    /// Country used to disambiguate city names
    pub country_id: i64,
}

impl Default for DialogOptions {
    fn default() -> Self {
        Self {
            sex_selection: SexSelection::Explicit,
            country_id: 1,
        }
    }
}

/// Onboarding state machine
///
/// `Init -> AwaitingLocation | AwaitingSex -> AwaitingAge -> Ready`. Every
/// handler either advances `awaiting` or leaves the state untouched and
/// re-prompts.
pub struct DialogMachine {
    profiles: Arc<dyn ProfileLookup>,
    locations: Arc<dyn LocationLookup>,
    store: Arc<dyn ExclusionStore>,
    options: DialogOptions,
}

impl DialogMachine {
    pub fn new(
        profiles: Arc<dyn ProfileLookup>,
        locations: Arc<dyn LocationLookup>,
        store: Arc<dyn ExclusionStore>,
        options: DialogOptions,
    ) -> Self {
        Self {
            profiles,
            locations,
            store,
            options,
        }
    }

    pub fn options(&self) -> DialogOptions {
        self.options
    }

    /// (Re)start onboarding from the user's own profile
    pub async fn start(&self, state: &mut DialogState) -> BotReply {
        state.last_candidate_id = None;
        state.awaiting = Awaiting::None;
        state.age = None;

        let mut notice = None;
        match self.profiles.own_profile(state.user_id).await {
            Ok(Some(profile)) => {
                if let Some(location) = profile.location.clone().filter(|l| l.id > 0) {
                    state.location = Some(location);
                }
                state.own_sex = profile.sex;
                if let Err(e) = self.store.upsert_user(&profile).await {
                    tracing::warn!("Failed to store user {}: {}", state.user_id, e);
                }
            }
            Ok(None) => {
                tracing::info!("No profile found for user {}", state.user_id);
                notice = Some(prompts::PROFILE_UNAVAILABLE);
            }
            Err(e) => {
                tracing::warn!("Profile lookup failed for {}: {}", state.user_id, e);
                notice = Some(prompts::PROFILE_UNAVAILABLE);
            }
        }

        if self.options.sex_selection == SexSelection::Inferred {
            state.target_sex = TargetSex::opposite_of(state.own_sex);
        }

        let next = if state.location.is_none() {
            Awaiting::Location
        } else {
            self.after_location()
        };
        let reply = self.enter(state, next);

        match notice {
            Some(notice) => BotReply::new(format!("{}\n{}", notice, reply.text), reply.keyboard),
            None => reply,
        }
    }

    /// Consume a text message as the pending onboarding input
    pub async fn handle_input(&self, state: &mut DialogState, text: &str) -> BotReply {
        match state.awaiting {
            Awaiting::Location => self.handle_location(state, text).await,
            Awaiting::Sex => self.handle_sex(state, text),
            Awaiting::Age => self.handle_age(state, text),
            Awaiting::None => self.prompt(state),
        }
    }

    /// Re-enter onboarding keeping the resolved location
    pub fn change_settings(&self, state: &mut DialogState) -> BotReply {
        if !state.is_ready() {
            return self.prompt(state);
        }

        state.age = None;
        state.last_candidate_id = None;
        state.target_sex = match self.options.sex_selection {
            SexSelection::Explicit => TargetSex::Any,
            SexSelection::Inferred => TargetSex::opposite_of(state.own_sex),
        };

        let next = self.after_location();
        self.enter(state, next)
    }

    /// The reply matching the current onboarding position
    pub fn prompt(&self, state: &DialogState) -> BotReply {
        match state.awaiting {
            Awaiting::Location => BotReply::new(prompts::ASK_LOCATION, KeyboardVariant::None),
            Awaiting::Sex => BotReply::new(prompts::ASK_SEX, KeyboardVariant::SexChoice),
            Awaiting::Age => BotReply::new(prompts::ASK_AGE, KeyboardVariant::None),
            Awaiting::None if state.is_ready() => {
                BotReply::new(prompts::READY, KeyboardVariant::Main)
            }
            Awaiting::None => BotReply::new(prompts::SEND_START, KeyboardVariant::None),
        }
    }

    async fn handle_location(&self, state: &mut DialogState, text: &str) -> BotReply {
        match self.locations.resolve(text.trim(), self.options.country_id).await {
            Ok(Some(location)) => {
                let confirmation = prompts::location_set(&location.label);
                state.location = Some(location);
                let next = self.after_location();
                let reply = self.enter(state, next);
                BotReply::new(format!("{} {}", confirmation, reply.text), reply.keyboard)
            }
            Ok(None) => BotReply::new(prompts::LOCATION_NOT_FOUND, KeyboardVariant::None),
            Err(e) => {
                tracing::warn!("Location lookup failed for {}: {}", state.user_id, e);
                BotReply::new(
                    format!("{}\n{}", prompts::DIRECTORY_UNAVAILABLE, prompts::ASK_LOCATION),
                    KeyboardVariant::None,
                )
            }
        }
    }

    fn handle_sex(&self, state: &mut DialogState, text: &str) -> BotReply {
        match match_target_sex(text) {
            Some(target) => {
                state.target_sex = target;
                self.enter(state, Awaiting::Age)
            }
            None => BotReply::new(prompts::SEX_NOT_RECOGNIZED, KeyboardVariant::SexChoice),
        }
    }

    fn handle_age(&self, state: &mut DialogState, text: &str) -> BotReply {
        match parse_age(text) {
            Ok(age) => {
                state.age = Some(age);
                self.enter(state, Awaiting::None)
            }
            Err(e) => {
                tracing::debug!("Rejected age from {}: {}", state.user_id, e);
                BotReply::new(prompts::AGE_INVALID, KeyboardVariant::None)
            }
        }
    }

    fn after_location(&self) -> Awaiting {
        match self.options.sex_selection {
            SexSelection::Explicit => Awaiting::Sex,
            SexSelection::Inferred => Awaiting::Age,
        }
    }

    fn enter(&self, state: &mut DialogState, next: Awaiting) -> BotReply {
        tracing::debug!(
            "User {} onboarding {:?} -> {:?}",
            state.user_id,
            state.awaiting,
            next
        );
        state.awaiting = next;
        self.prompt(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, OwnProfile, Sex, UserId};
    use crate::services::{MemoryStore, UpstreamError};
    use async_trait::async_trait;

    struct StubDirectory {
        profile: Option<OwnProfile>,
        city: Option<Location>,
        unavailable: bool,
    }

    fn outage() -> UpstreamError {
        UpstreamError::Api {
            code: 10,
            message: "Internal server error".to_string(),
        }
    }

    #[async_trait]
    impl ProfileLookup for StubDirectory {
        async fn own_profile(&self, _: UserId) -> Result<Option<OwnProfile>, UpstreamError> {
            if self.unavailable {
                return Err(outage());
            }
            Ok(self.profile.clone())
        }
    }

    #[async_trait]
    impl LocationLookup for StubDirectory {
        async fn resolve(&self, text: &str, _: i64) -> Result<Option<Location>, UpstreamError> {
            if self.unavailable {
                return Err(outage());
            }
            Ok(self.city.clone().filter(|c| c.label.eq_ignore_ascii_case(text)))
        }
    }

    fn moscow() -> Location {
        Location {
            id: 1,
            label: "Moscow".to_string(),
        }
    }

    fn machine(profile_location: Option<Location>, selection: SexSelection) -> DialogMachine {
        let directory = Arc::new(StubDirectory {
            profile: Some(OwnProfile {
                user_id: 5,
                first_name: "Ivan".to_string(),
                last_name: "Petrov".to_string(),
                sex: Some(Sex::Male),
                location: profile_location,
            }),
            city: Some(moscow()),
            unavailable: false,
        });
        DialogMachine::new(
            directory.clone(),
            directory,
            Arc::new(MemoryStore::new()),
            DialogOptions {
                sex_selection: selection,
                country_id: 1,
            },
        )
    }

    #[test]
    fn test_sex_rules() {
        assert_eq!(match_target_sex("Женщину"), Some(TargetSex::Female));
        assert_eq!(match_target_sex("female"), Some(TargetSex::Female));
        assert_eq!(match_target_sex("Women please"), Some(TargetSex::Female));
        assert_eq!(match_target_sex("МУЖЧИНУ"), Some(TargetSex::Male));
        assert_eq!(match_target_sex("men"), Some(TargetSex::Male));
        assert_eq!(match_target_sex("неважно"), Some(TargetSex::Any));
        assert_eq!(match_target_sex("Не важно"), Some(TargetSex::Any));
        assert_eq!(match_target_sex("Any"), Some(TargetSex::Any));
        assert_eq!(match_target_sex("кошку"), None);
        assert_eq!(match_target_sex("   "), None);
    }

    #[test]
    fn test_parse_age_bounds() {
        assert_eq!(parse_age(" 25 ").unwrap(), 25);
        assert_eq!(parse_age("18").unwrap(), 18);
        assert_eq!(parse_age("99").unwrap(), 99);
        assert!(matches!(parse_age("17"), Err(AssistantError::Validation(_))));
        assert!(matches!(parse_age("150"), Err(AssistantError::Validation(_))));
        assert!(matches!(parse_age("abc"), Err(AssistantError::Validation(_))));
        assert!(matches!(parse_age(""), Err(AssistantError::Validation(_))));
    }

    #[test]
    fn test_parse_intent_aliases() {
        assert_eq!(parse_intent("/start"), Some(TextIntent::Start));
        assert_eq!(parse_intent("Привет"), Some(TextIntent::Start));
        assert_eq!(parse_intent("Дальше"), Some(TextIntent::Command(Command::Next)));
        assert_eq!(
            parse_intent("❤️ В избранное"),
            Some(TextIntent::Command(Command::Favorite))
        );
        assert_eq!(
            parse_intent("⛔️ В ЧС"),
            Some(TextIntent::Command(Command::Blacklist))
        );
        assert_eq!(
            parse_intent("⭐️ Избранное"),
            Some(TextIntent::Command(Command::ListFavorites))
        );
        assert_eq!(
            parse_intent("change settings"),
            Some(TextIntent::Command(Command::ChangeSettings))
        );
        assert_eq!(parse_intent("hello there"), None);
    }

    #[tokio::test]
    async fn test_start_with_profile_city_asks_sex() {
        let machine = machine(Some(moscow()), SexSelection::Explicit);
        let mut state = DialogState::new(5);
        state.last_candidate_id = Some(99);

        let reply = machine.start(&mut state).await;

        assert_eq!(state.awaiting, Awaiting::Sex);
        assert_eq!(state.location, Some(moscow()));
        assert_eq!(state.last_candidate_id, None);
        assert_eq!(reply.keyboard, KeyboardVariant::SexChoice);
    }

    #[tokio::test]
    async fn test_start_without_city_asks_location() {
        let machine = machine(None, SexSelection::Explicit);
        let mut state = DialogState::new(5);

        machine.start(&mut state).await;
        assert_eq!(state.awaiting, Awaiting::Location);

        let reply = machine.handle_input(&mut state, "Atlantis").await;
        assert_eq!(state.awaiting, Awaiting::Location);
        assert_eq!(state.location, None);
        assert_eq!(reply.text, prompts::LOCATION_NOT_FOUND);

        machine.handle_input(&mut state, "moscow").await;
        assert_eq!(state.awaiting, Awaiting::Sex);
        assert_eq!(state.location, Some(moscow()));
    }

    #[tokio::test]
    async fn test_full_explicit_onboarding() {
        let machine = machine(Some(moscow()), SexSelection::Explicit);
        let mut state = DialogState::new(5);

        machine.start(&mut state).await;
        machine.handle_input(&mut state, "cats").await;
        assert_eq!(state.awaiting, Awaiting::Sex);

        machine.handle_input(&mut state, "женщин").await;
        assert_eq!(state.target_sex, TargetSex::Female);
        assert_eq!(state.awaiting, Awaiting::Age);

        machine.handle_input(&mut state, "abc").await;
        assert_eq!(state.awaiting, Awaiting::Age);
        assert_eq!(state.age, None);

        machine.handle_input(&mut state, "150").await;
        assert_eq!(state.awaiting, Awaiting::Age);
        assert_eq!(state.age, None);

        let reply = machine.handle_input(&mut state, "25").await;
        assert_eq!(state.awaiting, Awaiting::None);
        assert_eq!(state.age, Some(25));
        assert!(state.is_ready());
        assert_eq!(reply.keyboard, KeyboardVariant::Main);
    }

    #[tokio::test]
    async fn test_inferred_variant_skips_sex_prompt() {
        let machine = machine(Some(moscow()), SexSelection::Inferred);
        let mut state = DialogState::new(5);

        machine.start(&mut state).await;

        assert_eq!(state.awaiting, Awaiting::Age);
        assert_eq!(state.own_sex, Some(Sex::Male));
        assert_eq!(state.target_sex, TargetSex::Female);
    }

    #[tokio::test]
    async fn test_change_settings_keeps_location() {
        let machine = machine(Some(moscow()), SexSelection::Explicit);
        let mut state = DialogState::new(5);
        machine.start(&mut state).await;
        machine.handle_input(&mut state, "male").await;
        machine.handle_input(&mut state, "30").await;
        state.last_candidate_id = Some(42);
        state.offset = 150;

        machine.change_settings(&mut state);

        assert_eq!(state.awaiting, Awaiting::Sex);
        assert_eq!(state.age, None);
        assert_eq!(state.target_sex, TargetSex::Any);
        assert_eq!(state.last_candidate_id, None);
        assert_eq!(state.location, Some(moscow()));
        assert_eq!(state.offset, 150);
    }

    #[tokio::test]
    async fn test_change_settings_before_ready_reprompts() {
        let machine = machine(Some(moscow()), SexSelection::Explicit);
        let mut state = DialogState::new(5);
        machine.start(&mut state).await;

        let reply = machine.change_settings(&mut state);

        assert_eq!(state.awaiting, Awaiting::Sex);
        assert_eq!(reply.text, prompts::ASK_SEX);
    }

    #[tokio::test]
    async fn test_directory_outage_falls_back_to_location_prompt() {
        let directory = Arc::new(StubDirectory {
            profile: None,
            city: Some(moscow()),
            unavailable: true,
        });
        let machine = DialogMachine::new(
            directory.clone(),
            directory,
            Arc::new(MemoryStore::new()),
            DialogOptions::default(),
        );
        let mut state = DialogState::new(5);

        let reply = machine.start(&mut state).await;

        assert_eq!(state.awaiting, Awaiting::Location);
        assert!(reply.text.starts_with(prompts::PROFILE_UNAVAILABLE));
        assert!(reply.text.ends_with(prompts::ASK_LOCATION));

        let reply = machine.handle_input(&mut state, "Moscow").await;

        assert_eq!(state.awaiting, Awaiting::Location);
        assert_eq!(state.location, None);
        assert!(reply.text.starts_with(prompts::DIRECTORY_UNAVAILABLE));
        assert_eq!(reply.keyboard, KeyboardVariant::None);
    }
}
