use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{
    Hashtag, NewNotification, NewTweet, NewUser, Notification, Page, ProfileUpdate, Tweet,
    TweetRow, User, UserRow,
};

// ========== Column Lists ==========

const USER_COLUMNS: &str = r"
    u.id, u.username, u.email, u.display_name, u.bio, u.avatar_url,
    u.followers_count, u.following_count, u.created_at, u.updated_at
";

/// User columns plus the viewer follow flag. Binds: viewer.
const USER_ROW_COLUMNS: &str = r"
    u.id, u.username, u.email, u.display_name, u.bio, u.avatar_url,
    u.followers_count, u.following_count, u.created_at, u.updated_at,
    EXISTS(
        SELECT 1 FROM follows fw WHERE fw.following_id = u.id AND fw.follower_id = ?
    ) AS is_following
";

const TWEET_COLUMNS: &str = r"
    t.id, t.user_id, t.content, t.media_type, t.media_url, t.parent_id, t.retweet_id,
    t.reply_count, t.retweet_count, t.like_count, t.created_at, t.updated_at
";

/// Tweet columns plus viewer flags. Binds: viewer, viewer, viewer.
///
/// For a retweet row the like/retweet flags describe the original it points at.
const TWEET_ROW_COLUMNS: &str = r"
    t.id, t.user_id, t.content, t.media_type, t.media_url, t.parent_id, t.retweet_id,
    t.reply_count, t.retweet_count, t.like_count, t.created_at, t.updated_at,
    EXISTS(
        SELECT 1 FROM likes lk
        WHERE lk.tweet_id = COALESCE(t.retweet_id, t.id) AND lk.user_id = ?
    ) AS is_liked,
    EXISTS(
        SELECT 1 FROM tweets rt
        WHERE rt.retweet_id = COALESCE(t.retweet_id, t.id) AND rt.user_id = ?
    ) AS is_retweeted,
    EXISTS(
        SELECT 1 FROM follows fw WHERE fw.following_id = t.user_id AND fw.follower_id = ?
    ) AS is_following
";

fn placeholders(count: usize) -> String {
    std::iter::repeat_n("?", count)
        .collect::<Vec<_>>()
        .join(",")
}

/// Build a `LIKE` pattern matching `term` anywhere, escaping wildcards.
fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ========== Users ==========

/// Insert a new user, returning the stored record.
pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let result = sqlx::query(
        r"
        INSERT INTO users (username, email, display_name, bio, avatar_url)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.bio)
    .bind(&user.avatar_url)
    .execute(pool)
    .await
    .context("Failed to insert user")?;

    get_user(pool, result.last_insert_rowid())
        .await?
        .context("Inserted user not found")
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch user")
}

/// Get a user by ID with the viewer's follow flag.
pub async fn get_user_row(
    pool: &SqlitePool,
    id: i64,
    viewer_id: Option<i64>,
) -> Result<Option<UserRow>> {
    sqlx::query_as(&format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id = ?"
    ))
    .bind(viewer_id)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch user row")
}

/// Get all users with the given IDs in a single query.
///
/// Missing IDs are silently absent from the result; order is unspecified.
pub async fn get_users_by_ids(
    pool: &SqlitePool,
    ids: &[i64],
    viewer_id: Option<i64>,
) -> Result<Vec<UserRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {USER_ROW_COLUMNS} FROM users u WHERE u.id IN ({})",
        placeholders(ids.len())
    );

    let mut query = sqlx::query_as(&sql).bind(viewer_id);
    for id in ids {
        query = query.bind(id);
    }

    query
        .fetch_all(pool)
        .await
        .context("Failed to fetch users by ids")
}

/// Search users whose handle or display name contains `term`.
pub async fn search_users(
    pool: &SqlitePool,
    term: &str,
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<UserRow>> {
    let pattern = contains_pattern(term);
    sqlx::query_as(&format!(
        r"
        SELECT {USER_ROW_COLUMNS}
        FROM users u
        WHERE lower(u.username) LIKE ? ESCAPE '\'
           OR lower(COALESCE(u.display_name, '')) LIKE ? ESCAPE '\'
        ORDER BY u.followers_count DESC, u.id ASC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(&pattern)
    .bind(&pattern)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to search users")
}

/// List the users following `user_id`, most recent first.
pub async fn list_followers(
    pool: &SqlitePool,
    user_id: i64,
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<UserRow>> {
    sqlx::query_as(&format!(
        r"
        SELECT {USER_ROW_COLUMNS}
        FROM follows f
        JOIN users u ON u.id = f.follower_id
        WHERE f.following_id = ?
        ORDER BY f.created_at DESC, u.id DESC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list followers")
}

/// List the users `user_id` follows, most recent first.
pub async fn list_following(
    pool: &SqlitePool,
    user_id: i64,
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<UserRow>> {
    sqlx::query_as(&format!(
        r"
        SELECT {USER_ROW_COLUMNS}
        FROM follows f
        JOIN users u ON u.id = f.following_id
        WHERE f.follower_id = ?
        ORDER BY f.created_at DESC, u.id DESC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list following")
}

/// Users the viewer does not follow yet, most followed first.
pub async fn list_suggested_users(
    pool: &SqlitePool,
    viewer_id: i64,
    page: Page,
) -> Result<Vec<UserRow>> {
    sqlx::query_as(&format!(
        r"
        SELECT {USER_ROW_COLUMNS}
        FROM users u
        WHERE u.id != ?
          AND NOT EXISTS (
              SELECT 1 FROM follows f WHERE f.follower_id = ? AND f.following_id = u.id
          )
        ORDER BY u.followers_count DESC, u.id ASC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list suggested users")
}

/// Most followed users, for anonymous discovery.
pub async fn list_top_users(pool: &SqlitePool, page: Page) -> Result<Vec<User>> {
    sqlx::query_as(&format!(
        r"
        SELECT {USER_COLUMNS}
        FROM users u
        ORDER BY u.followers_count DESC, u.id ASC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list top users")
}

/// Overwrite the editable profile fields of a user.
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: i64,
    profile: &ProfileUpdate,
) -> Result<Option<User>> {
    let result = sqlx::query(
        r"
        UPDATE users
        SET display_name = ?, bio = ?, updated_at = datetime('now')
        WHERE id = ?
        ",
    )
    .bind(&profile.display_name)
    .bind(&profile.bio)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to update profile")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_user(pool, user_id).await
}

// ========== Follows ==========

/// Follow a user. Returns `true` if a new follow was created.
pub async fn follow_user(pool: &SqlitePool, follower_id: i64, following_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO follows (follower_id, following_id) VALUES (?, ?)",
    )
    .bind(follower_id)
    .bind(following_id)
    .execute(&mut *tx)
    .await
    .context("Failed to insert follow")?
    .rows_affected()
        == 1;

    if inserted {
        sqlx::query("UPDATE users SET following_count = following_count + 1 WHERE id = ?")
            .bind(follower_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET followers_count = followers_count + 1 WHERE id = ?")
            .bind(following_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await.context("Failed to commit follow")?;
    Ok(inserted)
}

/// Unfollow a user. Returns `true` if a follow was removed.
pub async fn unfollow_user(
    pool: &SqlitePool,
    follower_id: i64,
    following_id: i64,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete follow")?
        .rows_affected()
        == 1;

    if removed {
        sqlx::query(
            "UPDATE users SET following_count = MAX(following_count - 1, 0) WHERE id = ?",
        )
        .bind(follower_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE users SET followers_count = MAX(followers_count - 1, 0) WHERE id = ?",
        )
        .bind(following_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.context("Failed to commit unfollow")?;
    Ok(removed)
}

// ========== Tweets ==========

/// Insert a tweet or reply. A reply bumps its parent's reply counter.
pub async fn create_tweet(pool: &SqlitePool, tweet: &NewTweet) -> Result<Tweet> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r"
        INSERT INTO tweets (user_id, content, media_type, parent_id)
        VALUES (?, ?, 'NONE', ?)
        ",
    )
    .bind(tweet.user_id)
    .bind(&tweet.content)
    .bind(tweet.parent_id)
    .execute(&mut *tx)
    .await
    .context("Failed to insert tweet")?
    .last_insert_rowid();

    if let Some(parent_id) = tweet.parent_id {
        sqlx::query("UPDATE tweets SET reply_count = reply_count + 1 WHERE id = ?")
            .bind(parent_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment reply count")?;
    }

    tx.commit().await.context("Failed to commit tweet")?;

    get_tweet(pool, id).await?.context("Inserted tweet not found")
}

/// Get a tweet by ID.
pub async fn get_tweet(pool: &SqlitePool, id: i64) -> Result<Option<Tweet>> {
    sqlx::query_as(&format!("SELECT {TWEET_COLUMNS} FROM tweets t WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch tweet")
}

/// Get a tweet by ID with viewer flags.
pub async fn get_tweet_row(
    pool: &SqlitePool,
    id: i64,
    viewer_id: Option<i64>,
) -> Result<Option<TweetRow>> {
    sqlx::query_as(&format!(
        "SELECT {TWEET_ROW_COLUMNS} FROM tweets t WHERE t.id = ?"
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch tweet row")
}

/// Get all tweets with the given IDs in a single query.
///
/// Missing IDs are silently absent from the result; order is unspecified.
pub async fn get_tweets_by_ids(
    pool: &SqlitePool,
    ids: &[i64],
    viewer_id: Option<i64>,
) -> Result<Vec<TweetRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {TWEET_ROW_COLUMNS} FROM tweets t WHERE t.id IN ({})",
        placeholders(ids.len())
    );

    let mut query = sqlx::query_as(&sql)
        .bind(viewer_id)
        .bind(viewer_id)
        .bind(viewer_id);
    for id in ids {
        query = query.bind(id);
    }

    query
        .fetch_all(pool)
        .await
        .context("Failed to fetch tweets by ids")
}

/// Newest top-level tweets and retweets from everyone.
pub async fn list_global_feed(
    pool: &SqlitePool,
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<TweetRow>> {
    sqlx::query_as(&format!(
        r"
        SELECT {TWEET_ROW_COLUMNS}
        FROM tweets t
        WHERE t.parent_id IS NULL
        ORDER BY t.id DESC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list global feed")
}

/// Newest top-level tweets from the accounts `follower_id` follows, and their own.
pub async fn list_following_feed(
    pool: &SqlitePool,
    follower_id: i64,
    page: Page,
) -> Result<Vec<TweetRow>> {
    let viewer_id = Some(follower_id);
    sqlx::query_as(&format!(
        r"
        SELECT {TWEET_ROW_COLUMNS}
        FROM tweets t
        WHERE t.parent_id IS NULL
          AND (
              t.user_id = ?
              OR t.user_id IN (SELECT following_id FROM follows WHERE follower_id = ?)
          )
        ORDER BY t.id DESC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(follower_id)
    .bind(follower_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list following feed")
}

/// Everything a user posted, replies and retweets included, newest first.
pub async fn list_user_tweets(
    pool: &SqlitePool,
    user_id: i64,
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<TweetRow>> {
    sqlx::query_as(&format!(
        r"
        SELECT {TWEET_ROW_COLUMNS}
        FROM tweets t
        WHERE t.user_id = ?
        ORDER BY t.id DESC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(user_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list user tweets")
}

/// Direct replies to a tweet, oldest first.
pub async fn list_replies(
    pool: &SqlitePool,
    tweet_id: i64,
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<TweetRow>> {
    sqlx::query_as(&format!(
        r"
        SELECT {TWEET_ROW_COLUMNS}
        FROM tweets t
        WHERE t.parent_id = ?
        ORDER BY t.id ASC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(tweet_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list replies")
}

/// Tweets tagged with `hashtag` (lowercase, without `#`), newest first.
pub async fn search_tweets_by_hashtag(
    pool: &SqlitePool,
    hashtag: &str,
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<TweetRow>> {
    sqlx::query_as(&format!(
        r"
        SELECT {TWEET_ROW_COLUMNS}
        FROM tweets t
        JOIN tweet_hashtags th ON th.tweet_id = t.id
        JOIN hashtags h ON h.id = th.hashtag_id
        WHERE h.name = ?
        ORDER BY t.id DESC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(hashtag)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to search tweets by hashtag")
}

/// Tweets whose text contains every term, newest first.
pub async fn search_tweets_by_terms(
    pool: &SqlitePool,
    terms: &[String],
    page: Page,
    viewer_id: Option<i64>,
) -> Result<Vec<TweetRow>> {
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let conditions = terms
        .iter()
        .map(|_| r"lower(t.content) LIKE ? ESCAPE '\'")
        .collect::<Vec<_>>()
        .join(" AND ");

    let sql = format!(
        r"
        SELECT {TWEET_ROW_COLUMNS}
        FROM tweets t
        WHERE t.content IS NOT NULL AND {conditions}
        ORDER BY t.id DESC
        LIMIT ? OFFSET ?
        "
    );

    let mut query = sqlx::query_as(&sql)
        .bind(viewer_id)
        .bind(viewer_id)
        .bind(viewer_id);
    for term in terms {
        query = query.bind(contains_pattern(term));
    }

    query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await
        .context("Failed to search tweets")
}

/// Delete a tweet owned by `user_id`, together with its reply thread and
/// retweets. A deleted reply releases its parent's reply counter. Returns
/// `true` if a row was removed.
pub async fn delete_tweet(pool: &SqlitePool, tweet_id: i64, user_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let parent: Option<(Option<i64>,)> =
        sqlx::query_as("SELECT parent_id FROM tweets WHERE id = ? AND user_id = ?")
            .bind(tweet_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up tweet for deletion")?;

    let Some((parent_id,)) = parent else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM tweets WHERE id = ? AND user_id = ?")
        .bind(tweet_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete tweet")?;

    if let Some(parent_id) = parent_id {
        sqlx::query("UPDATE tweets SET reply_count = MAX(reply_count - 1, 0) WHERE id = ?")
            .bind(parent_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement reply count")?;
    }

    tx.commit().await.context("Failed to commit tweet deletion")?;
    Ok(true)
}

// ========== Retweets ==========

/// Record a retweet of `original_id` by `user_id`.
///
/// Returns `None` if the user already retweeted it.
pub async fn create_retweet(
    pool: &SqlitePool,
    user_id: i64,
    original_id: i64,
) -> Result<Option<Tweet>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query("INSERT OR IGNORE INTO tweets (user_id, retweet_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(original_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert retweet")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    sqlx::query("UPDATE tweets SET retweet_count = retweet_count + 1 WHERE id = ?")
        .bind(original_id)
        .execute(&mut *tx)
        .await
        .context("Failed to increment retweet count")?;

    tx.commit().await.context("Failed to commit retweet")?;

    get_tweet(pool, result.last_insert_rowid()).await
}

/// Remove `user_id`'s retweet of `original_id`. Returns `true` if one existed.
pub async fn delete_retweet(pool: &SqlitePool, user_id: i64, original_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let removed = sqlx::query("DELETE FROM tweets WHERE user_id = ? AND retweet_id = ?")
        .bind(user_id)
        .bind(original_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete retweet")?
        .rows_affected()
        > 0;

    if removed {
        sqlx::query("UPDATE tweets SET retweet_count = MAX(retweet_count - 1, 0) WHERE id = ?")
            .bind(original_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement retweet count")?;
    }

    tx.commit().await.context("Failed to commit retweet deletion")?;
    Ok(removed)
}

// ========== Likes ==========

/// Like a tweet. Returns `true` if the like is new.
pub async fn like_tweet(pool: &SqlitePool, user_id: i64, tweet_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let inserted = sqlx::query("INSERT OR IGNORE INTO likes (user_id, tweet_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(tweet_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert like")?
        .rows_affected()
        == 1;

    if inserted {
        sqlx::query("UPDATE tweets SET like_count = like_count + 1 WHERE id = ?")
            .bind(tweet_id)
            .execute(&mut *tx)
            .await
            .context("Failed to increment like count")?;
    }

    tx.commit().await.context("Failed to commit like")?;
    Ok(inserted)
}

/// Remove a like. Returns `true` if one existed.
pub async fn unlike_tweet(pool: &SqlitePool, user_id: i64, tweet_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let removed = sqlx::query("DELETE FROM likes WHERE user_id = ? AND tweet_id = ?")
        .bind(user_id)
        .bind(tweet_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete like")?
        .rows_affected()
        == 1;

    if removed {
        sqlx::query("UPDATE tweets SET like_count = MAX(like_count - 1, 0) WHERE id = ?")
            .bind(tweet_id)
            .execute(&mut *tx)
            .await
            .context("Failed to decrement like count")?;
    }

    tx.commit().await.context("Failed to commit unlike")?;
    Ok(removed)
}

// ========== Hashtags ==========

/// Get or create a hashtag by name, returning its ID.
pub async fn upsert_hashtag(pool: &SqlitePool, name: &str) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO hashtags (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .context("Failed to insert hashtag")?;

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM hashtags WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .context("Failed to fetch hashtag id")?;

    Ok(id)
}

/// Associate a tweet with a hashtag.
pub async fn link_tweet_hashtag(pool: &SqlitePool, tweet_id: i64, hashtag_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO tweet_hashtags (tweet_id, hashtag_id) VALUES (?, ?)")
        .bind(tweet_id)
        .bind(hashtag_id)
        .execute(pool)
        .await
        .context("Failed to link tweet hashtag")?;
    Ok(())
}

/// Hashtags used most within the last `hours` hours.
pub async fn trending_hashtags(pool: &SqlitePool, hours: u32, limit: i64) -> Result<Vec<Hashtag>> {
    sqlx::query_as(
        r"
        SELECT h.id, h.name, COUNT(*) AS tweet_count
        FROM tweet_hashtags th
        JOIN hashtags h ON h.id = th.hashtag_id
        JOIN tweets t ON t.id = th.tweet_id
        WHERE t.created_at >= datetime('now', ?)
        GROUP BY h.id, h.name
        ORDER BY tweet_count DESC, h.name ASC
        LIMIT ?
        ",
    )
    .bind(format!("-{hours} hours"))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch trending hashtags")
}

/// Hashtags used most over all time.
pub async fn top_hashtags(pool: &SqlitePool, limit: i64) -> Result<Vec<Hashtag>> {
    sqlx::query_as(
        r"
        SELECT h.id, h.name, COUNT(*) AS tweet_count
        FROM tweet_hashtags th
        JOIN hashtags h ON h.id = th.hashtag_id
        GROUP BY h.id, h.name
        ORDER BY tweet_count DESC, h.name ASC
        LIMIT ?
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch top hashtags")
}

/// Hashtags starting with `prefix` (lowercase, without `#`).
pub async fn search_hashtags(pool: &SqlitePool, prefix: &str, limit: i64) -> Result<Vec<Hashtag>> {
    let mut pattern = contains_pattern(prefix);
    pattern.remove(0);

    sqlx::query_as(
        r"
        SELECT h.id, h.name, COUNT(th.tweet_id) AS tweet_count
        FROM hashtags h
        LEFT JOIN tweet_hashtags th ON th.hashtag_id = h.id
        WHERE h.name LIKE ? ESCAPE '\'
        GROUP BY h.id, h.name
        ORDER BY tweet_count DESC, h.name ASC
        LIMIT ?
        ",
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to search hashtags")
}

// ========== Notifications ==========

/// Persist a notification, returning the stored record.
pub async fn create_notification(
    pool: &SqlitePool,
    notification: &NewNotification,
) -> Result<Notification> {
    let id = sqlx::query(
        r"
        INSERT INTO notifications (recipient_id, actor_id, tweet_id, kind)
        VALUES (?, ?, ?, ?)
        ",
    )
    .bind(notification.recipient_id)
    .bind(notification.actor_id)
    .bind(notification.tweet_id)
    .bind(notification.kind)
    .execute(pool)
    .await
    .context("Failed to insert notification")?
    .last_insert_rowid();

    sqlx::query_as("SELECT * FROM notifications WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to fetch inserted notification")
}

/// A recipient's notifications, newest first.
pub async fn list_notifications(
    pool: &SqlitePool,
    recipient_id: i64,
    page: Page,
) -> Result<Vec<Notification>> {
    sqlx::query_as(
        r"
        SELECT * FROM notifications
        WHERE recipient_id = ?
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        ",
    )
    .bind(recipient_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list notifications")
}

/// Count a recipient's unread notifications.
pub async fn count_unread_notifications(pool: &SqlitePool, recipient_id: i64) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND is_read = 0",
    )
    .bind(recipient_id)
    .fetch_one(pool)
    .await
    .context("Failed to count unread notifications")?;

    Ok(count)
}

/// Mark every notification of a recipient as read, returning how many changed.
pub async fn mark_all_notifications_read(pool: &SqlitePool, recipient_id: i64) -> Result<u64> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE recipient_id = ? AND is_read = 0")
            .bind(recipient_id)
            .execute(pool)
            .await
            .context("Failed to mark notifications read")?;

    Ok(result.rows_affected())
}
