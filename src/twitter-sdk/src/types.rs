use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Layout of `created_at` on API objects, e.g. `Wed Aug 27 13:08:45 +0000 2008`.
pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// A status as returned by the statuses endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: u64,
    #[serde(default, alias = "full_text")]
    pub text: String,
    pub created_at: String,
    /// Only the id survives `trim_user=true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

impl Tweet {
    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Parse `created_at` into a UTC timestamp.
    pub fn created_at_time(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_str(&self.created_at, CREATED_AT_FORMAT).map(|ts| ts.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
}

/// The authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub screen_name: String,
    #[serde(default)]
    pub lang: Option<String>,
}

/// Parameters of a `statuses/user_timeline` page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    pub user_id: u64,
    pub count: u32,
    /// Only return statuses with an id at most this value
    pub max_id: Option<u64>,
    pub trim_user: bool,
    pub exclude_replies: bool,
    pub include_rts: bool,
}

impl TimelineQuery {
    /// First page for `user_id` with the maximum page size.
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            count: 200,
            max_id: None,
            trim_user: true,
            exclude_replies: false,
            include_rts: false,
        }
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("user_id", self.user_id.to_string()),
            ("count", self.count.to_string()),
            ("trim_user", self.trim_user.to_string()),
            ("exclude_replies", self.exclude_replies.to_string()),
            ("include_rts", self.include_rts.to_string()),
        ];
        if let Some(max_id) = self.max_id {
            params.push(("max_id", max_id.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_created_at_time() {
        let tweet = Tweet {
            id: 1,
            text: String::new(),
            created_at: "Wed Aug 27 13:08:45 +0000 2008".into(),
            user: None,
        };
        assert_eq!(
            tweet.created_at_time().unwrap(),
            Utc.with_ymd_and_hms(2008, 8, 27, 13, 8, 45).unwrap()
        );

        let offset = Tweet {
            created_at: "Mon Jan 06 09:00:00 +0900 2020".into(),
            ..tweet.clone()
        };
        assert_eq!(
            offset.created_at_time().unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 6, 0, 0, 0).unwrap()
        );

        let broken = Tweet {
            created_at: "2008-08-27".into(),
            ..tweet
        };
        assert!(broken.created_at_time().is_err());
    }

    #[test]
    fn test_deserialize_trimmed_status() {
        let json = r#"{
            "id": 18446744073709551615,
            "id_str": "18446744073709551615",
            "full_text": "hello",
            "created_at": "Wed Aug 27 13:08:45 +0000 2008",
            "user": {"id": 42, "id_str": "42"}
        }"#;
        let tweet: Tweet = serde_json::from_str(json).unwrap();
        assert_eq!(tweet.id, u64::MAX);
        assert_eq!(tweet.text, "hello");
        assert_eq!(tweet.user_id(), Some(42));
    }

    #[test]
    fn test_timeline_params() {
        let mut query = TimelineQuery::new(7);
        let params = query.to_params();
        assert!(params.contains(&("count", "200".to_string())));
        assert!(params.contains(&("trim_user", "true".to_string())));
        assert!(params.contains(&("include_rts", "false".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "max_id"));

        query.max_id = Some(99);
        assert!(query.to_params().contains(&("max_id", "99".to_string())));
    }
}
