use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TWITTER_USER_TABLE_NAME: &str = "twitter_users";

/// The account whose tweets are erased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterUser {
    pub user_id: u64,
    pub screen_name: String,
    pub name: String,
    pub lang: String,
}

impl TwitterUser {
    /// Whether `stored` differs in any of the mutable display fields
    /// (screen name, name, lang).
    pub fn needs_update(&self, stored: &TwitterUser) -> bool {
        self.screen_name != stored.screen_name
            || self.name != stored.name
            || self.lang != stored.lang
    }
}

/// A [`TwitterUser`] as persisted, with audit timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterUserRow {
    pub user: TwitterUser,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> TwitterUser {
        TwitterUser {
            user_id: u64::MAX,
            screen_name: "screen_name".into(),
            name: "name".into(),
            lang: "en".into(),
        }
    }

    #[test]
    fn test_needs_update_ignores_identical_profile() {
        assert!(!user().needs_update(&user()));
    }

    #[test]
    fn test_needs_update_on_each_display_field() {
        let stored = user();

        let renamed = TwitterUser { name: "name_dup".into(), ..user() };
        assert!(renamed.needs_update(&stored));

        let moved = TwitterUser { screen_name: "other".into(), ..user() };
        assert!(moved.needs_update(&stored));

        let relocalized = TwitterUser { lang: "ja".into(), ..user() };
        assert!(relocalized.needs_update(&stored));
    }
}
