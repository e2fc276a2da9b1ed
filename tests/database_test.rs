//! Integration tests for database operations.

use chirp_api::db::{
    count_unread_notifications, create_notification, create_retweet, create_tweet, create_user,
    delete_retweet, delete_tweet, follow_user, get_tweet, get_tweet_row, get_tweets_by_ids,
    get_user, get_user_row, get_users_by_ids, like_tweet, link_tweet_hashtag, list_following_feed,
    list_global_feed, list_notifications, list_replies, mark_all_notifications_read,
    search_hashtags, search_tweets_by_terms, search_users, top_hashtags, trending_hashtags,
    unfollow_user, unlike_tweet, upsert_hashtag, Database, NewNotification, NewTweet, NewUser,
    NotificationKind, Page,
};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

async fn user(db: &Database, username: &str) -> i64 {
    create_user(
        db.pool(),
        &NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            display_name: Some(format!("{username} display")),
            bio: None,
            avatar_url: None,
        },
    )
    .await
    .expect("Failed to create user")
    .id
}

async fn tweet(db: &Database, user_id: i64, content: &str, parent_id: Option<i64>) -> i64 {
    create_tweet(
        db.pool(),
        &NewTweet {
            user_id,
            content: Some(content.to_string()),
            parent_id,
        },
    )
    .await
    .expect("Failed to create tweet")
    .id
}

#[tokio::test]
async fn test_open_creates_missing_directories() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("data").join("nested").join("chirp.sqlite");

    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    let alice = user(&db, "alice").await;
    assert!(db_path.exists());
    drop(db);

    // Reopening runs migrations again against the existing schema.
    let db = Database::new(&db_path)
        .await
        .expect("Failed to reopen database");
    assert!(get_user(db.pool(), alice).await.unwrap().is_some());
}

#[tokio::test]
async fn test_create_and_get_user() {
    let (db, _temp_dir) = setup_db().await;

    let id = user(&db, "alice").await;
    assert!(id > 0);

    let retrieved = get_user(db.pool(), id)
        .await
        .expect("Failed to get user")
        .expect("User not found");
    assert_eq!(retrieved.username, "alice");
    assert_eq!(retrieved.display_name.as_deref(), Some("alice display"));
    assert_eq!(retrieved.followers_count, 0);

    assert!(get_user(db.pool(), 9999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let (db, _temp_dir) = setup_db().await;
    user(&db, "alice").await;

    let result = create_user(
        db.pool(),
        &NewUser {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            display_name: None,
            bio: None,
            avatar_url: None,
        },
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_follow_updates_counters_and_flags() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;

    assert!(follow_user(db.pool(), alice, bob).await.unwrap());
    assert!(!follow_user(db.pool(), alice, bob).await.unwrap());

    let bob_user = get_user(db.pool(), bob).await.unwrap().unwrap();
    let alice_user = get_user(db.pool(), alice).await.unwrap().unwrap();
    assert_eq!(bob_user.followers_count, 1);
    assert_eq!(alice_user.following_count, 1);

    let row = get_user_row(db.pool(), bob, Some(alice))
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_following);
    let row = get_user_row(db.pool(), alice, Some(bob))
        .await
        .unwrap()
        .unwrap();
    assert!(!row.is_following);

    assert!(unfollow_user(db.pool(), alice, bob).await.unwrap());
    assert!(!unfollow_user(db.pool(), alice, bob).await.unwrap());
    let bob_user = get_user(db.pool(), bob).await.unwrap().unwrap();
    assert_eq!(bob_user.followers_count, 0);
}

#[tokio::test]
async fn test_get_users_by_ids_skips_missing() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;

    let mut rows = get_users_by_ids(db.pool(), &[bob, alice, 4242], None)
        .await
        .unwrap();
    rows.sort_by_key(|row| row.user.id);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].user.id, alice);
    assert_eq!(rows[1].user.id, bob);

    assert!(get_users_by_ids(db.pool(), &[], None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reply_counter_tracks_replies() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;

    let root = tweet(&db, alice, "root", None).await;
    let reply = tweet(&db, bob, "a reply", Some(root)).await;
    tweet(&db, alice, "second reply", Some(root)).await;

    assert_eq!(get_tweet(db.pool(), root).await.unwrap().unwrap().reply_count, 2);

    let replies = list_replies(db.pool(), root, Page::default(), None)
        .await
        .unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].tweet.id, reply);

    // Only the author can delete
    assert!(!delete_tweet(db.pool(), reply, alice).await.unwrap());
    assert!(delete_tweet(db.pool(), reply, bob).await.unwrap());
    assert_eq!(get_tweet(db.pool(), root).await.unwrap().unwrap().reply_count, 1);
}

#[tokio::test]
async fn test_global_feed_excludes_replies_newest_first() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;

    let first = tweet(&db, alice, "first", None).await;
    let second = tweet(&db, alice, "second", None).await;
    tweet(&db, alice, "reply", Some(first)).await;

    let feed = list_global_feed(db.pool(), Page::default(), None)
        .await
        .unwrap();
    let ids: Vec<i64> = feed.iter().map(|row| row.tweet.id).collect();
    assert_eq!(ids, vec![second, first]);

    let paged = list_global_feed(db.pool(), Page { page: 1, size: 1 }, None)
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].tweet.id, first);
}

#[tokio::test]
async fn test_following_feed_includes_self_and_followed() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    let carol = user(&db, "carol").await;

    let own = tweet(&db, alice, "mine", None).await;
    let followed = tweet(&db, bob, "from bob", None).await;
    tweet(&db, carol, "from carol", None).await;

    follow_user(db.pool(), alice, bob).await.unwrap();

    let feed = list_following_feed(db.pool(), alice, Page::default())
        .await
        .unwrap();
    let mut ids: Vec<i64> = feed.iter().map(|row| row.tweet.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![own, followed]);

    let bob_row = feed.iter().find(|row| row.tweet.id == followed).unwrap();
    assert!(bob_row.is_following);
}

#[tokio::test]
async fn test_like_is_idempotent_and_flagged() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    let post = tweet(&db, alice, "likeable", None).await;

    assert!(like_tweet(db.pool(), bob, post).await.unwrap());
    assert!(!like_tweet(db.pool(), bob, post).await.unwrap());

    let row = get_tweet_row(db.pool(), post, Some(bob)).await.unwrap().unwrap();
    assert_eq!(row.tweet.like_count, 1);
    assert!(row.is_liked);

    let anonymous = get_tweet_row(db.pool(), post, None).await.unwrap().unwrap();
    assert!(!anonymous.is_liked);

    assert!(unlike_tweet(db.pool(), bob, post).await.unwrap());
    assert!(!unlike_tweet(db.pool(), bob, post).await.unwrap());
    let row = get_tweet_row(db.pool(), post, Some(bob)).await.unwrap().unwrap();
    assert_eq!(row.tweet.like_count, 0);
    assert!(!row.is_liked);
}

#[tokio::test]
async fn test_retweet_unique_per_user() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    let post = tweet(&db, alice, "worth sharing", None).await;

    let retweet = create_retweet(db.pool(), bob, post)
        .await
        .unwrap()
        .expect("first retweet should be created");
    assert!(retweet.is_retweet());
    assert_eq!(retweet.retweet_id, Some(post));
    assert!(retweet.content.is_none());

    assert!(create_retweet(db.pool(), bob, post).await.unwrap().is_none());
    assert_eq!(get_tweet(db.pool(), post).await.unwrap().unwrap().retweet_count, 1);

    // The retweet row reports the viewer's flags for the original
    let rows = get_tweets_by_ids(db.pool(), &[retweet.id], Some(bob))
        .await
        .unwrap();
    assert!(rows[0].is_retweeted);

    assert!(delete_retweet(db.pool(), bob, post).await.unwrap());
    assert!(!delete_retweet(db.pool(), bob, post).await.unwrap());
    assert_eq!(get_tweet(db.pool(), post).await.unwrap().unwrap().retweet_count, 0);
    assert!(get_tweet(db.pool(), retweet.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_users_and_tweets() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    user(&db, "bob").await;

    let users = search_users(db.pool(), "ALI", Page::default(), None)
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user.id, alice);

    // Wildcards in the query are literal
    assert!(search_users(db.pool(), "%", Page::default(), None)
        .await
        .unwrap()
        .is_empty());

    let hit = tweet(&db, alice, "Rust and tokio together", None).await;
    tweet(&db, alice, "just rust", None).await;

    let terms = vec!["rust".to_string(), "tokio".to_string()];
    let found = search_tweets_by_terms(db.pool(), &terms, Page::default(), None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tweet.id, hit);
}

#[tokio::test]
async fn test_hashtags_trending_and_prefix_search() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;

    let first = tweet(&db, alice, "#rust", None).await;
    let second = tweet(&db, alice, "#rust #rustlang", None).await;

    let rust = upsert_hashtag(db.pool(), "rust").await.unwrap();
    assert_eq!(upsert_hashtag(db.pool(), "rust").await.unwrap(), rust);
    let rustlang = upsert_hashtag(db.pool(), "rustlang").await.unwrap();

    link_tweet_hashtag(db.pool(), first, rust).await.unwrap();
    link_tweet_hashtag(db.pool(), second, rust).await.unwrap();
    link_tweet_hashtag(db.pool(), second, rustlang).await.unwrap();
    // Linking twice is harmless
    link_tweet_hashtag(db.pool(), second, rustlang).await.unwrap();

    let trending = trending_hashtags(db.pool(), 24, 10).await.unwrap();
    assert_eq!(trending[0].name, "rust");
    assert_eq!(trending[0].tweet_count, 2);
    assert_eq!(trending[1].tweet_count, 1);

    let top = top_hashtags(db.pool(), 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "rust");

    let found = search_hashtags(db.pool(), "rustl", 5).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "rustlang");
}

#[tokio::test]
async fn test_notifications_lifecycle() {
    let (db, _temp_dir) = setup_db().await;
    let alice = user(&db, "alice").await;
    let bob = user(&db, "bob").await;
    let post = tweet(&db, alice, "hello", None).await;

    let like = create_notification(
        db.pool(),
        &NewNotification {
            recipient_id: alice,
            actor_id: bob,
            tweet_id: Some(post),
            kind: NotificationKind::Like,
        },
    )
    .await
    .unwrap();
    assert_eq!(like.kind, NotificationKind::Like);
    assert!(!like.is_read);

    let stored: String = sqlx::query_scalar("SELECT kind FROM notifications WHERE id = ?")
        .bind(like.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(stored, "LIKE");

    create_notification(
        db.pool(),
        &NewNotification {
            recipient_id: alice,
            actor_id: bob,
            tweet_id: None,
            kind: NotificationKind::Follow,
        },
    )
    .await
    .unwrap();

    let listed = list_notifications(db.pool(), alice, Page::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].kind, NotificationKind::Follow);

    assert_eq!(count_unread_notifications(db.pool(), alice).await.unwrap(), 2);
    assert_eq!(mark_all_notifications_read(db.pool(), alice).await.unwrap(), 2);
    assert_eq!(count_unread_notifications(db.pool(), alice).await.unwrap(), 0);
    assert_eq!(mark_all_notifications_read(db.pool(), alice).await.unwrap(), 0);

    assert!(list_notifications(db.pool(), bob, Page::default())
        .await
        .unwrap()
        .is_empty());
}
