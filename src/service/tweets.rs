use tracing::warn;

use crate::db::{self, NewTweet, NotificationKind, Tweet};
use crate::error::{AppError, AppResult};
use crate::feed::TweetItem;

use super::{extract_hashtags, normalize_text, SocialService};

impl SocialService {
    async fn require_tweet(&self, tweet_id: i64) -> AppResult<Tweet> {
        db::get_tweet(self.db.pool(), tweet_id)
            .await?
            .ok_or_else(|| AppError::not_found("tweet not found"))
    }

    /// Post a tweet, or a reply when `parent_id` is set.
    ///
    /// The reply's parent author is notified. Hashtags in the text are
    /// recorded; a failure there does not fail the post.
    pub async fn create_tweet(
        &self,
        user_id: i64,
        content: Option<&str>,
        parent_id: Option<i64>,
    ) -> AppResult<TweetItem> {
        let content = normalize_text(content)
            .ok_or_else(|| AppError::bad_request("tweet must include text"))?;
        self.require_actor(user_id).await?;

        let parent = match parent_id {
            Some(id) => Some(self.require_tweet(id).await?),
            None => None,
        };

        let tweet = db::create_tweet(
            self.db.pool(),
            &NewTweet {
                user_id,
                content: Some(content.clone()),
                parent_id,
            },
        )
        .await?;

        if let Some(parent) = parent {
            self.notify(parent.user_id, user_id, Some(tweet.id), NotificationKind::Reply)
                .await;
        }

        for tag in extract_hashtags(&content) {
            let linked = match db::upsert_hashtag(self.db.pool(), &tag).await {
                Ok(hashtag_id) => db::link_tweet_hashtag(self.db.pool(), tweet.id, hashtag_id).await,
                Err(e) => Err(e),
            };
            if let Err(e) = linked {
                warn!(tweet_id = tweet.id, hashtag = %tag, "Failed to record hashtag: {e:#}");
            }
        }

        self.get_tweet(tweet.id, Some(user_id)).await
    }

    /// Delete one of the user's own tweets. Deleting a retweet record undoes
    /// the retweet.
    pub async fn delete_tweet(&self, user_id: i64, tweet_id: i64) -> AppResult<()> {
        let tweet = self.require_tweet(tweet_id).await?;
        if tweet.user_id != user_id {
            return Err(AppError::forbidden("you can only delete your own tweets"));
        }

        if let Some(original_id) = tweet.retweet_id {
            db::delete_retweet(self.db.pool(), user_id, original_id).await?;
        } else {
            db::delete_tweet(self.db.pool(), tweet_id, user_id).await?;
        }
        Ok(())
    }

    /// Like a tweet, notifying its author the first time.
    pub async fn like_tweet(&self, user_id: i64, tweet_id: i64) -> AppResult<()> {
        self.require_actor(user_id).await?;
        let tweet = self.require_tweet(tweet_id).await?;

        if db::like_tweet(self.db.pool(), user_id, tweet_id).await? {
            self.notify(tweet.user_id, user_id, Some(tweet.id), NotificationKind::Like)
                .await;
        }
        Ok(())
    }

    pub async fn unlike_tweet(&self, user_id: i64, tweet_id: i64) -> AppResult<()> {
        db::unlike_tweet(self.db.pool(), user_id, tweet_id).await?;
        Ok(())
    }

    /// Retweet a tweet. Retweeting a retweet targets its original.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the user does not exist, `Conflict` if they already
    /// retweeted the original.
    pub async fn retweet(&self, user_id: i64, tweet_id: i64) -> AppResult<TweetItem> {
        self.require_actor(user_id).await?;
        let original = self.resolve_original(tweet_id).await?;

        let retweet = db::create_retweet(self.db.pool(), user_id, original.id)
            .await?
            .ok_or_else(|| AppError::conflict("tweet already retweeted"))?;

        self.notify(original.user_id, user_id, Some(original.id), NotificationKind::Retweet)
            .await;

        self.get_tweet(retweet.id, Some(user_id)).await
    }

    /// Undo a retweet. Not having retweeted is not an error.
    pub async fn undo_retweet(&self, user_id: i64, tweet_id: i64) -> AppResult<()> {
        let original = self.resolve_original(tweet_id).await?;
        db::delete_retweet(self.db.pool(), user_id, original.id).await?;
        Ok(())
    }

    async fn resolve_original(&self, tweet_id: i64) -> AppResult<Tweet> {
        let tweet = self.require_tweet(tweet_id).await?;
        match tweet.retweet_id {
            Some(original_id) => self.require_tweet(original_id).await,
            None => Ok(tweet),
        }
    }
}
