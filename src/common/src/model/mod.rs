//! Records kept about erasure attempts.

mod erase_error;
mod erase_tweet;
mod twitter_user;

pub use erase_error::{ERASE_ERROR_TABLE_NAME, EraseError, NewEraseError, STATUS_NOT_FOUND};
pub use erase_tweet::{ERASE_TWEET_TABLE_NAME, EraseTweet, NewEraseTweet};
pub use twitter_user::{TWITTER_USER_TABLE_NAME, TwitterUser, TwitterUserRow};

/// Map a tweet or user id onto a signed 64-bit column.
///
/// The bits are reinterpreted, so ids above `i64::MAX` are stored as negative
/// numbers and come back unchanged through [`from_db_id`].
pub fn to_db_id(id: u64) -> i64 {
    id as i64
}

/// Inverse of [`to_db_id`].
pub fn from_db_id(value: i64) -> u64 {
    value as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_id_round_trip_extremes() {
        for id in [0, 1, i64::MAX as u64, i64::MAX as u64 + 1, u64::MAX] {
            assert_eq!(from_db_id(to_db_id(id)), id);
        }
        assert_eq!(to_db_id(u64::MAX), -1);
    }
}
