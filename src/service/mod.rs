//! Use cases: store access, hydration, caching and notification dispatch.

mod feeds;
mod notifications;
mod tweets;
mod users;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::db::{self, Database, NewNotification, NotificationKind, Page, TweetRow};
use crate::error::{AppError, AppResult};
use crate::feed::{apply_viewer_flags, split_rows, FeedAssembler, ResponseCache, TweetItem};
use crate::notify::NotificationBroker;

static HASHTAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)#([a-z0-9_]+)").expect("valid hashtag regex")
});

/// TTLs for the anonymous response cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub global_feed: Duration,
    pub trending: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            global_feed: Duration::from_secs(30),
            trending: Duration::from_secs(300),
        }
    }
}

/// The social application core shared by every request handler.
#[derive(Debug, Clone)]
pub struct SocialService {
    db: Database,
    assembler: FeedAssembler<Database>,
    broker: Arc<NotificationBroker>,
    cache: Option<Arc<ResponseCache>>,
    ttls: CacheTtls,
}

impl SocialService {
    #[must_use]
    pub fn new(db: Database, broker: Arc<NotificationBroker>) -> Self {
        Self {
            assembler: FeedAssembler::new(db.clone()),
            db,
            broker,
            cache: None,
            ttls: CacheTtls::default(),
        }
    }

    /// Enable caching of anonymous feed and trending results.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResponseCache>, ttls: CacheTtls) -> Self {
        self.cache = Some(cache);
        self.ttls = ttls;
        self
    }

    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub const fn broker(&self) -> &Arc<NotificationBroker> {
        &self.broker
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// Hydrate query rows and re-attach the query's viewer flags by position.
    async fn hydrate_rows(
        &self,
        rows: Vec<TweetRow>,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<TweetItem>> {
        let (tweets, flags) = split_rows(rows);
        let mut items = self.assembler.hydrate(tweets, viewer_id).await?;
        apply_viewer_flags(&mut items, &flags);
        Ok(items)
    }

    /// Check that the acting viewer has an account. The viewer header is
    /// trusted as authenticated, but the user row may not exist.
    async fn require_actor(&self, user_id: i64) -> AppResult<()> {
        if db::get_user(self.db.pool(), user_id).await?.is_none() {
            return Err(AppError::unauthorized("unknown viewer"));
        }
        Ok(())
    }

    /// Persist a notification for `recipient_id` and push it to their live
    /// streams. Self-actions are skipped and failures are only logged.
    async fn notify(
        &self,
        recipient_id: i64,
        actor_id: i64,
        tweet_id: Option<i64>,
        kind: NotificationKind,
    ) {
        if recipient_id == actor_id {
            return;
        }

        let new = NewNotification {
            recipient_id,
            actor_id,
            tweet_id,
            kind,
        };

        match db::create_notification(self.db.pool(), &new).await {
            Ok(notification) => {
                let delivered = self.broker.publish(recipient_id, &notification);
                debug!(
                    recipient_id,
                    kind = kind.as_str(),
                    delivered,
                    "Notification dispatched"
                );
            }
            Err(e) => {
                warn!(
                    recipient_id,
                    actor_id,
                    kind = kind.as_str(),
                    "Failed to create notification: {e:#}"
                );
            }
        }
    }
}

/// Validate pagination parameters.
///
/// # Errors
///
/// Returns `BadRequest` for a negative page, a size below one, or a page
/// whose row offset does not fit in an `i64`.
pub fn paginate(page: Option<i64>, size: Option<i64>) -> AppResult<Page> {
    let page = page.unwrap_or(0);
    if page < 0 {
        return Err(AppError::bad_request("page must be >= 0"));
    }

    let size = size.unwrap_or(Page::DEFAULT_SIZE);
    if size < 1 {
        return Err(AppError::bad_request("size must be >= 1"));
    }
    let size = size.min(Page::MAX_SIZE);

    if page.checked_mul(size).is_none() {
        return Err(AppError::bad_request("page is out of range"));
    }

    Ok(Page { page, size })
}

/// Clamp an optional result limit to `1..=MAX_SIZE`, using `default` when
/// absent or non-positive.
#[must_use]
pub fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit
        .filter(|limit| *limit > 0)
        .unwrap_or(default)
        .min(Page::MAX_SIZE)
}

/// Extract `#hashtags` from tweet text, lowercased and de-duplicated in
/// order of first appearance.
#[must_use]
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_REGEX
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Split a free-text query into alphanumeric search terms.
#[must_use]
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Trim optional user text, treating blank as absent.
fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
