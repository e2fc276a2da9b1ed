use crate::db::{self, Hashtag, Page, TweetRow};
use crate::error::{AppError, AppResult};
use crate::feed::{cache_keys, TweetItem, UserItem};

use super::{search_terms, SocialService};

impl SocialService {
    /// Newest top-level tweets from everyone.
    ///
    /// Anonymous pages are served from the response cache when enabled; a
    /// viewer always gets fresh rows since the flags depend on them.
    pub async fn global_feed(&self, page: Page, viewer_id: Option<i64>) -> AppResult<Vec<TweetItem>> {
        let cache = self.cache.as_ref().filter(|_| viewer_id.is_none());
        let key = cache_keys::global_feed(page.page, page.size);

        let cached = cache.and_then(|cache| cache.get::<Vec<TweetRow>>(&key));
        let rows = match cached {
            Some(rows) => rows,
            None => {
                let rows = db::list_global_feed(self.db.pool(), page, viewer_id).await?;
                if let Some(cache) = cache {
                    if !rows.is_empty() {
                        cache.put(&key, &rows, self.ttls.global_feed);
                    }
                }
                rows
            }
        };

        self.hydrate_rows(rows, viewer_id).await
    }

    /// Tweets from the accounts the viewer follows, and their own.
    pub async fn following_feed(&self, viewer_id: i64, page: Page) -> AppResult<Vec<TweetItem>> {
        let rows = db::list_following_feed(self.db.pool(), viewer_id, page).await?;
        self.hydrate_rows(rows, Some(viewer_id)).await
    }

    /// Everything a user posted.
    pub async fn user_feed(
        &self,
        user_id: i64,
        page: Page,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<TweetItem>> {
        let rows = db::list_user_tweets(self.db.pool(), user_id, page, viewer_id).await?;
        self.hydrate_rows(rows, viewer_id).await
    }

    /// A single hydrated tweet.
    pub async fn get_tweet(&self, tweet_id: i64, viewer_id: Option<i64>) -> AppResult<TweetItem> {
        let row = db::get_tweet_row(self.db.pool(), tweet_id, viewer_id)
            .await?
            .ok_or_else(|| AppError::not_found("tweet not found"))?;

        self.hydrate_rows(vec![row], viewer_id)
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("tweet not found"))
    }

    /// Direct replies to a tweet, oldest first.
    pub async fn replies(
        &self,
        tweet_id: i64,
        page: Page,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<TweetItem>> {
        let rows = db::list_replies(self.db.pool(), tweet_id, page, viewer_id).await?;
        self.hydrate_rows(rows, viewer_id).await
    }

    /// Search tweets. A query starting with `#` matches that hashtag exactly;
    /// anything else matches tweets containing every word.
    pub async fn search_tweets(
        &self,
        query: &str,
        page: Page,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<TweetItem>> {
        let trimmed = query.trim();

        let rows = if let Some(tag) = trimmed.strip_prefix('#') {
            let tag = tag.trim_start_matches('#').trim().to_lowercase();
            if tag.is_empty() {
                return Ok(Vec::new());
            }
            db::search_tweets_by_hashtag(self.db.pool(), &tag, page, viewer_id).await?
        } else {
            let terms = search_terms(trimmed);
            if terms.is_empty() {
                return Ok(Vec::new());
            }
            db::search_tweets_by_terms(self.db.pool(), &terms, page, viewer_id).await?
        };

        self.hydrate_rows(rows, viewer_id).await
    }

    /// Search users by handle or display name.
    pub async fn search_users(
        &self,
        query: &str,
        page: Page,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<UserItem>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let rows = db::search_users(self.db.pool(), trimmed, page, viewer_id).await?;
        Ok(rows.into_iter().map(UserItem::from).collect())
    }

    /// Hashtags starting with the query, with or without a leading `#`.
    pub async fn search_hashtags(&self, query: &str, limit: i64) -> AppResult<Vec<Hashtag>> {
        let prefix = query.trim().trim_start_matches('#').to_lowercase();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        Ok(db::search_hashtags(self.db.pool(), &prefix, limit).await?)
    }

    /// Most used hashtags of the last day, or of all time when the last day
    /// has none.
    pub async fn trending_hashtags(&self, limit: i64) -> AppResult<Vec<Hashtag>> {
        let key = cache_keys::trending_hashtags(limit);
        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get::<Vec<Hashtag>>(&key))
        {
            return Ok(cached);
        }

        let mut hashtags = db::trending_hashtags(self.db.pool(), 24, limit).await?;
        if hashtags.is_empty() {
            hashtags = db::top_hashtags(self.db.pool(), limit).await?;
        }

        if let Some(cache) = &self.cache {
            if !hashtags.is_empty() {
                cache.put(&key, &hashtags, self.ttls.trending);
            }
        }

        Ok(hashtags)
    }

    /// Accounts worth following: for a viewer, ones they do not follow yet;
    /// for anonymous callers, the most followed.
    pub async fn suggested_users(
        &self,
        page: Page,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<UserItem>> {
        let Some(viewer_id) = viewer_id else {
            let users = db::list_top_users(self.db.pool(), page).await?;
            return Ok(users
                .into_iter()
                .map(|user| UserItem {
                    user,
                    is_following: false,
                })
                .collect());
        };

        let rows = db::list_suggested_users(self.db.pool(), viewer_id, page).await?;
        Ok(rows.into_iter().map(UserItem::from).collect())
    }
}
