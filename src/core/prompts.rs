//! Texts sent back to the user.

pub const ASK_LOCATION: &str = "Which city should I search in? (for example: Moscow)";
pub const LOCATION_NOT_FOUND: &str = "City not found. Try again (for example: Saint Petersburg).";
pub const ASK_SEX: &str = "Who are you looking for: women, men or anyone?";
pub const SEX_NOT_RECOGNIZED: &str = "Please answer women, men or anyone.";
pub const ASK_AGE: &str = "How old are you? Send a number (for example: 25).";
pub const AGE_INVALID: &str = "Age must be a number from 18 to 99. For example: 25";
pub const READY: &str = "All set. Press \"Next\" 👇";
pub const PROFILE_UNAVAILABLE: &str =
    "Could not read your profile, let's fill the settings in by hand.";
pub const DIRECTORY_UNAVAILABLE: &str = "Search is temporarily unavailable, please try again.";
pub const NO_MORE_CANDIDATES: &str = "No more candidates for the current settings 😕";
pub const PRESS_NEXT_FIRST: &str = "Press \"Next\" first.";
pub const ADDED_TO_FAVORITES: &str = "Added to favorites ⭐️";
pub const ADDED_TO_BLACKLIST: &str = "Added to the blacklist ⛔️";
pub const FAVORITES_EMPTY: &str = "Your favorites list is empty.";
pub const FAVORITES_HEADER: &str = "⭐️ Favorites:";
pub const SEND_START: &str = "Send /start to set up your search first.";
pub const HELP: &str = "Commands: /start, Next, ❤️ Favorite, ⛔️ Blacklist, ⭐️ Favorites, Settings";

pub fn location_set(label: &str) -> String {
    format!("OK, city: {}.", label)
}
