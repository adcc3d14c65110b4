use serde::{Deserialize, Serialize};

/// Avatar assigned at signup and whenever a user clears theirs.
pub const DEFAULT_AVATAR_URL: &str =
    "https://upload.wikimedia.org/wikipedia/commons/7/7c/Profile_avatar_placeholder_large.png?20150327203541";

/// User profile - the identity id plus the fields shown next to content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Requested profile edits. Only fields that differ from the current
/// profile are applied; an empty `avatar_url` resets to the default avatar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}
