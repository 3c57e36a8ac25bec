mod client;
mod error;
mod statuses;
mod types;

pub use client::TwitterClient;
pub use error::SdkError;
pub use types::{CREATED_AT_FORMAT, TimelineQuery, Tweet, User, UserRef};
