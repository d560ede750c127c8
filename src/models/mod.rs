// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    profile_url, Awaiting, CandidateId, CandidateProfile, CandidateResult, Command, DialogState,
    DirectoryProfile, ExclusionRecord, Location, OwnProfile, Reaction, ReactionKind, SearchQuery,
    Sex, SexSelection, TargetSex, UserId, MAX_AGE, MIN_AGE,
};
pub use requests::{CommandRequest, FavoritesQuery, StartRequest, TextMessageRequest};
pub use responses::{BotReply, ErrorResponse, FavoritesResponse, HealthResponse, KeyboardVariant};
