use serde::{Deserialize, Serialize};

/// External (VK) identifier of a user talking to the bot
pub type UserId = i64;

/// External (VK) identifier of a candidate profile
pub type CandidateId = i64;

/// Youngest age accepted during onboarding and used in searches
pub const MIN_AGE: u8 = 18;

/// Oldest age accepted during onboarding and used in searches
pub const MAX_AGE: u8 = 99;

/// Build the public profile URL for a VK id
pub fn profile_url(id: CandidateId) -> String {
    format!("https://vk.com/id{}", id)
}

/// A sex as reported by the directory
///
/// VK encodes it as 1 = female, 2 = male, 0 = unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    /// Decode a VK sex code; 0 and anything unexpected map to `None`
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Sex::Female),
            2 => Some(Sex::Male),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Sex::Female => 1,
            Sex::Male => 2,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Sex::Female => Sex::Male,
            Sex::Male => Sex::Female,
        }
    }
}

/// Which candidates the user wants to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSex {
    Female,
    Male,
    #[default]
    Any,
}

impl TargetSex {
    /// VK `users.search` sex filter code (0 = any)
    pub fn search_code(self) -> u8 {
        match self {
            TargetSex::Female => 1,
            TargetSex::Male => 2,
            TargetSex::Any => 0,
        }
    }

    /// Target for someone of the given sex: the opposite one, or any if unknown
    pub fn opposite_of(sex: Option<Sex>) -> Self {
        match sex.map(Sex::opposite) {
            Some(Sex::Female) => TargetSex::Female,
            Some(Sex::Male) => TargetSex::Male,
            None => TargetSex::Any,
        }
    }
}

/// Which onboarding input the next text message is consumed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Awaiting {
    #[default]
    None,
    Location,
    Sex,
    Age,
}

/// A resolved search location (VK city)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub label: String,
}

/// Per-user conversational state
///
/// Mutated only while the user's session lock is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogState {
    pub user_id: UserId,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub target_sex: TargetSex,
    #[serde(default)]
    pub own_sex: Option<Sex>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub last_candidate_id: Option<CandidateId>,
    #[serde(default)]
    pub awaiting: Awaiting,
}

impl DialogState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            location: None,
            age: None,
            target_sex: TargetSex::Any,
            own_sex: None,
            offset: 0,
            last_candidate_id: None,
            awaiting: Awaiting::None,
        }
    }

    /// Onboarding has finished and discovery may run
    pub fn is_ready(&self) -> bool {
        self.awaiting == Awaiting::None && self.age.is_some()
    }
}

/// The user's own profile as returned by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnProfile {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<Sex>,
    pub location: Option<Location>,
}

/// One entry of a directory search page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryProfile {
    pub id: CandidateId,
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<Sex>,
    pub city: Option<String>,
    pub birth_date: Option<String>,
    pub has_photo: bool,
    pub is_closed: bool,
    pub can_access_closed: bool,
}

impl DirectoryProfile {
    /// Closed profiles are only usable when the viewer was granted access
    pub fn is_accessible(&self) -> bool {
        !self.is_closed || self.can_access_closed
    }

    pub fn display_text(&self) -> String {
        format!("{} {}\n{}", self.first_name, self.last_name, profile_url(self.id))
    }
}

/// A stored candidate profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: CandidateId,
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<Sex>,
    pub location: Option<String>,
    pub birth_date: Option<String>,
    pub has_photo: bool,
}

impl From<&DirectoryProfile> for CandidateProfile {
    fn from(profile: &DirectoryProfile) -> Self {
        Self {
            candidate_id: profile.id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            sex: profile.sex,
            location: profile.city.clone(),
            birth_date: profile.birth_date.clone(),
            has_photo: profile.has_photo,
        }
    }
}

/// Reaction stored on an exclusion record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Liked,
    Blocked,
}

impl Reaction {
    pub fn as_str(self) -> &'static str {
        match self {
            Reaction::Liked => "liked",
            Reaction::Blocked => "blocked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "liked" => Some(Reaction::Liked),
            "blocked" => Some(Reaction::Blocked),
            _ => None,
        }
    }
}

/// The single (user, candidate) exclusion relation
///
/// Favorites and the blacklist are views over `reaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRecord {
    pub user_id: UserId,
    pub candidate_id: CandidateId,
    pub shown_at: chrono::DateTime<chrono::Utc>,
    pub reaction: Option<Reaction>,
}

/// Directory search filters for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub location_id: i64,
    pub age_from: u8,
    pub age_to: u8,
    pub sex: TargetSex,
    pub offset: u32,
    pub count: u32,
}

/// A candidate picked by one discovery invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub display_text: String,
    pub attachments: Vec<String>,
}

/// Commands accepted once onboarding is complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Next,
    Favorite,
    Blacklist,
    ListFavorites,
    ChangeSettings,
}

/// Reaction a user can apply to the last shown candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Favorite,
    Blacklist,
}

impl From<ReactionKind> for Reaction {
    fn from(kind: ReactionKind) -> Self {
        match kind {
            ReactionKind::Favorite => Reaction::Liked,
            ReactionKind::Blacklist => Reaction::Blocked,
        }
    }
}

/// How the target sex for searches is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SexSelection {
    /// The user picks it during onboarding
    #[default]
    Explicit,
    /// The opposite of the user's own profile sex
    Inferred,
}
