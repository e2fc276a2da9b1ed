use serde::{Deserialize, Serialize};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A user joined with the viewer's follow relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub is_following: bool,
}

/// A tweet, reply or retweet record.
///
/// A record with `retweet_id` set is a pure pointer to the original and
/// carries no content or media of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tweet {
    pub id: i64,
    pub user_id: i64,
    pub content: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub parent_id: Option<i64>,
    pub retweet_id: Option<i64>,
    pub reply_count: i64,
    pub retweet_count: i64,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Tweet {
    #[must_use]
    pub fn is_retweet(&self) -> bool {
        self.retweet_id.is_some()
    }
}

/// A tweet as returned by a listing query, with the viewer-relative
/// booleans joined on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TweetRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tweet: Tweet,
    pub is_liked: bool,
    pub is_retweeted: bool,
    pub is_following: bool,
}

/// Notification kind, stored and serialized as an uppercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Like,
    Retweet,
    Reply,
    Follow,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Retweet => "RETWEET",
            Self::Reply => "REPLY",
            Self::Follow => "FOLLOW",
        }
    }
}

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub actor_id: i64,
    pub tweet_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: String,
}

/// A hashtag with the number of tweets using it in the queried window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Hashtag {
    pub id: i64,
    pub name: String,
    pub tweet_count: i64,
}

/// Data for inserting a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Data for inserting a new tweet or reply.
#[derive(Debug, Clone)]
pub struct NewTweet {
    pub user_id: i64,
    pub content: Option<String>,
    pub parent_id: Option<i64>,
}

/// Data for inserting a new notification.
#[derive(Debug, Clone, Copy)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub actor_id: i64,
    pub tweet_id: Option<i64>,
    pub kind: NotificationKind,
}

/// Profile fields a user may change.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub size: i64,
}

impl Page {
    pub const DEFAULT_SIZE: i64 = 20;
    pub const MAX_SIZE: i64 = 50;

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.size
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 0,
            size: Self::DEFAULT_SIZE,
        }
    }
}
