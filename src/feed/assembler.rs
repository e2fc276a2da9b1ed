//! Batched tweet hydration.
//!
//! A page of N tweets is hydrated with at most three loader calls: one for
//! the primary authors, one for every referenced (parent or retweeted) tweet,
//! and one for the authors of those references that were not already loaded.
//! References are hydrated with their author only, so a hydrated item nests at
//! most one level deep no matter what the stored data looks like.

use std::collections::{BTreeSet, HashMap};

use anyhow::Context;
use serde::Serialize;
use tracing::warn;

use super::loader::BatchLoader;
use crate::db::{Tweet, TweetRow, User, UserRow};
use crate::error::{AppError, AppResult};

/// A user with the viewer's follow relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserItem {
    pub user: User,
    pub is_following: bool,
}

impl From<UserRow> for UserItem {
    fn from(row: UserRow) -> Self {
        Self {
            user: row.user,
            is_following: row.is_following,
        }
    }
}

/// A parent or retweeted tweet, hydrated with its author only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencedTweet {
    pub tweet: Tweet,
    pub author: UserItem,
    pub is_liked: bool,
    pub is_retweeted: bool,
}

/// A fully hydrated tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetItem {
    pub tweet: Tweet,
    pub author: UserItem,
    pub is_liked: bool,
    pub is_retweeted: bool,
    pub is_following_author: bool,
    /// Handle of the author being replied to, when the parent could be resolved.
    pub parent_author_handle: Option<String>,
    /// The retweeted original, when the tweet is a retweet and the original
    /// could be resolved.
    pub original_tweet: Option<ReferencedTweet>,
}

/// Viewer-relative booleans produced by the query that selected a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerFlags {
    pub is_liked: bool,
    pub is_retweeted: bool,
    pub is_following_author: bool,
}

impl From<&TweetRow> for ViewerFlags {
    fn from(row: &TweetRow) -> Self {
        Self {
            is_liked: row.is_liked,
            is_retweeted: row.is_retweeted,
            is_following_author: row.is_following,
        }
    }
}

/// Separate query rows into the raw tweets to hydrate and their flags.
#[must_use]
pub fn split_rows(rows: Vec<TweetRow>) -> (Vec<Tweet>, Vec<ViewerFlags>) {
    let flags = rows.iter().map(ViewerFlags::from).collect();
    let tweets = rows.into_iter().map(|row| row.tweet).collect();
    (tweets, flags)
}

/// Copy per-row viewer flags onto hydrated items by position.
///
/// `flags` must come from the same query as the tweets that were hydrated;
/// surplus entries on either side are ignored.
pub fn apply_viewer_flags(items: &mut [TweetItem], flags: &[ViewerFlags]) {
    for (item, flags) in items.iter_mut().zip(flags) {
        item.is_liked = flags.is_liked;
        item.is_retweeted = flags.is_retweeted;
        item.is_following_author = flags.is_following_author;
    }
}

/// Assembles [`TweetItem`]s from raw tweets through a [`BatchLoader`].
#[derive(Debug, Clone)]
pub struct FeedAssembler<L> {
    loader: L,
}

impl<L: BatchLoader> FeedAssembler<L> {
    #[must_use]
    pub const fn new(loader: L) -> Self {
        Self { loader }
    }

    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// Hydrate `tweets`, preserving their order.
    ///
    /// Viewer flags on the output are all false; apply the originating
    /// query's flags with [`apply_viewer_flags`].
    ///
    /// # Errors
    ///
    /// Fails with `Internal` if the author or reference fetch fails, and with
    /// `NotFound` if a tweet's own author does not exist.
    pub async fn hydrate(
        &self,
        tweets: Vec<Tweet>,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<TweetItem>> {
        if tweets.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids = BTreeSet::new();
        let mut reference_ids = BTreeSet::new();
        for tweet in &tweets {
            author_ids.insert(tweet.user_id);
            reference_ids.extend(tweet.parent_id);
            reference_ids.extend(tweet.retweet_id);
        }

        let mut authors = self.load_authors(&author_ids, viewer_id).await?;
        let references = self
            .load_references(&reference_ids, &mut authors, viewer_id)
            .await?;

        tweets
            .into_iter()
            .map(|tweet| {
                let author = authors.get(&tweet.user_id).cloned().ok_or_else(|| {
                    AppError::not_found(format!(
                        "author {} of tweet {} not found",
                        tweet.user_id, tweet.id
                    ))
                })?;

                let parent_author_handle = tweet
                    .parent_id
                    .and_then(|id| references.get(&id))
                    .map(|parent| parent.author.user.username.clone());

                let original_tweet = tweet
                    .retweet_id
                    .and_then(|id| references.get(&id))
                    .cloned();

                Ok(TweetItem {
                    tweet,
                    author,
                    is_liked: false,
                    is_retweeted: false,
                    is_following_author: false,
                    parent_author_handle,
                    original_tweet,
                })
            })
            .collect()
    }

    async fn load_authors(
        &self,
        ids: &BTreeSet<i64>,
        viewer_id: Option<i64>,
    ) -> AppResult<HashMap<i64, UserItem>> {
        let ids: Vec<i64> = ids.iter().copied().collect();
        let rows = self
            .loader
            .get_users_by_ids(&ids, viewer_id)
            .await
            .context("Failed to load tweet authors")?;

        Ok(rows
            .into_iter()
            .map(|row| (row.user.id, UserItem::from(row)))
            .collect())
    }

    /// Fetch referenced tweets and attach their authors.
    ///
    /// References whose author cannot be resolved are left out. Authors
    /// fetched here are added to `authors`.
    async fn load_references(
        &self,
        ids: &BTreeSet<i64>,
        authors: &mut HashMap<i64, UserItem>,
        viewer_id: Option<i64>,
    ) -> AppResult<HashMap<i64, ReferencedTweet>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<i64> = ids.iter().copied().collect();
        let rows = self
            .loader
            .get_tweets_by_ids(&ids, viewer_id)
            .await
            .context("Failed to load referenced tweets")?;

        let missing: BTreeSet<i64> = rows
            .iter()
            .map(|row| row.tweet.user_id)
            .filter(|id| !authors.contains_key(id))
            .collect();

        if !missing.is_empty() {
            let missing: Vec<i64> = missing.into_iter().collect();
            match self.loader.get_users_by_ids(&missing, viewer_id).await {
                Ok(found) => {
                    authors.extend(
                        found
                            .into_iter()
                            .map(|row| (row.user.id, UserItem::from(row))),
                    );
                }
                Err(e) => {
                    warn!(
                        authors = missing.len(),
                        "Failed to load referenced tweet authors: {e:#}"
                    );
                }
            }
        }

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let author = authors.get(&row.tweet.user_id)?.clone();
                Some((
                    row.tweet.id,
                    ReferencedTweet {
                        is_liked: row.is_liked,
                        is_retweeted: row.is_retweeted,
                        tweet: row.tweet,
                        author,
                    },
                ))
            })
            .collect())
    }
}
