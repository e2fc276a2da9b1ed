//! JSON shapes returned by the API.

use serde::Serialize;

use crate::db::User;
use crate::feed::{ReferencedTweet, TweetItem, UserItem};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_following: bool,
    pub followers_count: i64,
    pub following_count: i64,
}

impl UserResponse {
    fn new(user: User, is_following: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            is_following,
            followers_count: user.followers_count,
            following_count: user.following_count,
        }
    }
}

impl From<UserItem> for UserResponse {
    fn from(item: UserItem) -> Self {
        Self::new(item.user, item.is_following)
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::new(user, false)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub id: i64,
    pub content: Option<String>,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub user: UserResponse,
    pub reply_count: i64,
    pub like_count: i64,
    pub retweet_count: i64,
    pub is_liked: bool,
    pub is_retweeted: bool,
    pub is_following_author: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Box<TweetResponse>>,
    pub parent_id: Option<i64>,
    pub parent_username: Option<String>,
    pub created_at: String,
}

impl From<TweetItem> for TweetResponse {
    fn from(item: TweetItem) -> Self {
        let tweet = item.tweet;
        Self {
            id: tweet.id,
            content: tweet.content,
            media_type: tweet.media_type,
            media_url: tweet.media_url,
            user: item.author.into(),
            reply_count: tweet.reply_count,
            like_count: tweet.like_count,
            retweet_count: tweet.retweet_count,
            is_liked: item.is_liked,
            is_retweeted: item.is_retweeted,
            is_following_author: item.is_following_author,
            original: item.original_tweet.map(|original| Box::new(original.into())),
            parent_id: tweet.parent_id,
            parent_username: item.parent_author_handle,
            created_at: tweet.created_at,
        }
    }
}

impl From<ReferencedTweet> for TweetResponse {
    fn from(reference: ReferencedTweet) -> Self {
        let tweet = reference.tweet;
        let is_following_author = reference.author.is_following;
        Self {
            id: tweet.id,
            content: tweet.content,
            media_type: tweet.media_type,
            media_url: tweet.media_url,
            user: reference.author.into(),
            reply_count: tweet.reply_count,
            like_count: tweet.like_count,
            retweet_count: tweet.retweet_count,
            is_liked: reference.is_liked,
            is_retweeted: reference.is_retweeted,
            is_following_author,
            original: None,
            parent_id: tweet.parent_id,
            parent_username: None,
            created_at: tweet.created_at,
        }
    }
}

/// Convert a list of items into response shapes.
pub fn many<T, R: From<T>>(items: Vec<T>) -> Vec<R> {
    items.into_iter().map(R::from).collect()
}

#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

pub const SUCCESS: Success = Success { success: true };
