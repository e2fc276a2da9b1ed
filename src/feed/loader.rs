use anyhow::Result;
use async_trait::async_trait;

use crate::db::{self, Database, TweetRow, UserRow};

/// Batched-by-ID lookups consumed by the [`FeedAssembler`](super::FeedAssembler).
///
/// Implementations return whatever rows exist for the requested IDs, in any
/// order. Missing IDs are simply absent.
#[async_trait]
pub trait BatchLoader: Send + Sync {
    /// Fetch users with the viewer's follow flag joined on.
    async fn get_users_by_ids(&self, ids: &[i64], viewer_id: Option<i64>)
        -> Result<Vec<UserRow>>;

    /// Fetch tweets with the viewer's like/retweet/follow flags joined on.
    async fn get_tweets_by_ids(
        &self,
        ids: &[i64],
        viewer_id: Option<i64>,
    ) -> Result<Vec<TweetRow>>;
}

#[async_trait]
impl BatchLoader for Database {
    async fn get_users_by_ids(
        &self,
        ids: &[i64],
        viewer_id: Option<i64>,
    ) -> Result<Vec<UserRow>> {
        db::get_users_by_ids(self.pool(), ids, viewer_id).await
    }

    async fn get_tweets_by_ids(
        &self,
        ids: &[i64],
        viewer_id: Option<i64>,
    ) -> Result<Vec<TweetRow>> {
        db::get_tweets_by_ids(self.pool(), ids, viewer_id).await
    }
}
