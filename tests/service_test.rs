//! Integration tests for the social service: hydration, caching and live
//! notification dispatch against a real SQLite store.

use std::sync::Arc;
use std::time::Duration;

use chirp_api::db::{self, Database, NewUser, NotificationKind, Page};
use chirp_api::error::AppError;
use chirp_api::feed::ResponseCache;
use chirp_api::notify::NotificationBroker;
use chirp_api::service::{CacheTtls, SocialService};
use tempfile::TempDir;

async fn setup() -> (SocialService, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    let broker = Arc::new(NotificationBroker::new(10));
    (SocialService::new(db, broker), temp_dir)
}

async fn user(service: &SocialService, username: &str) -> i64 {
    db::create_user(
        service.db().pool(),
        &NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            display_name: None,
            bio: None,
            avatar_url: None,
        },
    )
    .await
    .expect("Failed to create user")
    .id
}

async fn post(service: &SocialService, user_id: i64, content: &str) -> i64 {
    service
        .create_tweet(user_id, Some(content), None)
        .await
        .expect("Failed to create tweet")
        .tweet
        .id
}

#[tokio::test]
async fn test_create_tweet_requires_text() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;

    let result = service.create_tweet(alice, Some("   "), None).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let result = service.create_tweet(alice, None, None).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let result = service.create_tweet(alice, Some("orphan"), Some(4242)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_create_tweet_records_hashtags() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;

    let id = post(&service, alice, "Learning #Rust with #tokio").await;

    let found = service
        .search_tweets("#rust", Page::default(), None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tweet.id, id);

    let trending = service.trending_hashtags(10).await.unwrap();
    let names: Vec<&str> = trending.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["rust", "tokio"]);

    let prefixed = service.search_hashtags("#to", 5).await.unwrap();
    assert_eq!(prefixed.len(), 1);
    assert_eq!(prefixed[0].name, "tokio");
}

#[tokio::test]
async fn test_reply_and_retweet_hydration() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let carol = user(&service, "carol").await;

    let root = post(&service, alice, "root tweet").await;

    let reply = service
        .create_tweet(bob, Some("a reply"), Some(root))
        .await
        .unwrap();
    assert_eq!(reply.tweet.parent_id, Some(root));
    assert_eq!(reply.parent_author_handle.as_deref(), Some("alice"));
    assert_eq!(reply.author.user.username, "bob");

    let retweet = service.retweet(carol, root).await.unwrap();
    assert!(retweet.tweet.is_retweet());
    assert!(retweet.is_retweeted);
    let original = retweet.original_tweet.expect("original should be hydrated");
    assert_eq!(original.tweet.id, root);
    assert_eq!(original.author.user.username, "alice");
    assert_eq!(original.tweet.retweet_count, 1);

    // Replies never show in the global feed; the retweet does
    let feed = service.global_feed(Page::default(), Some(carol)).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].tweet.id, retweet.tweet.id);
    assert!(feed[0].is_retweeted);
    assert_eq!(feed[1].tweet.id, root);
    assert!(feed[1].is_retweeted);
}

#[tokio::test]
async fn test_retweet_twice_conflicts_and_resolves_original() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let carol = user(&service, "carol").await;

    let root = post(&service, alice, "root").await;
    let bobs_retweet = service.retweet(bob, root).await.unwrap();

    let again = service.retweet(bob, root).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    // Retweeting a retweet targets the original
    let carols = service.retweet(carol, bobs_retweet.tweet.id).await.unwrap();
    assert_eq!(carols.tweet.retweet_id, Some(root));

    service.undo_retweet(carol, root).await.unwrap();
    service.undo_retweet(carol, root).await.unwrap();
    let tweet = service.get_tweet(root, None).await.unwrap();
    assert_eq!(tweet.tweet.retweet_count, 1);
}

#[tokio::test]
async fn test_delete_tweet_only_by_owner() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let id = post(&service, alice, "mine").await;

    let result = service.delete_tweet(bob, id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    service.delete_tweet(alice, id).await.unwrap();
    let result = service.get_tweet(id, None).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_deleting_tweet_removes_its_replies() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;

    let root = post(&service, alice, "root").await;
    let reply = service
        .create_tweet(bob, Some("a reply"), Some(root))
        .await
        .unwrap()
        .tweet
        .id;
    let nested = service
        .create_tweet(alice, Some("a reply to the reply"), Some(reply))
        .await
        .unwrap()
        .tweet
        .id;

    service.delete_tweet(alice, root).await.unwrap();

    let feed = service.global_feed(Page::default(), None).await.unwrap();
    assert!(feed.is_empty());
    for id in [reply, nested] {
        let result = service.get_tweet(id, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
    assert!(service
        .user_feed(bob, Page::default(), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_deleting_retweet_record_undoes_retweet() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let root = post(&service, alice, "root").await;

    let retweet = service.retweet(bob, root).await.unwrap();
    service.delete_tweet(bob, retweet.tweet.id).await.unwrap();

    let tweet = service.get_tweet(root, Some(bob)).await.unwrap();
    assert_eq!(tweet.tweet.retweet_count, 0);
    assert!(!tweet.is_retweeted);
}

#[tokio::test]
async fn test_live_subscriber_receives_notifications() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;

    let mut subscription = service.broker().subscribe(alice);
    let root = post(&service, alice, "notify me").await;

    service.like_tweet(bob, root).await.unwrap();
    service.retweet(bob, root).await.unwrap();
    service.create_tweet(bob, Some("reply"), Some(root)).await.unwrap();
    assert!(service.follow(bob, alice).await.unwrap());

    let mut kinds = Vec::new();
    while let Some(notification) = subscription.try_recv() {
        assert_eq!(notification.recipient_id, alice);
        assert_eq!(notification.actor_id, bob);
        kinds.push(notification.kind);
    }
    assert_eq!(
        kinds,
        vec![
            NotificationKind::Like,
            NotificationKind::Retweet,
            NotificationKind::Reply,
            NotificationKind::Follow,
        ]
    );

    // Everything was also persisted
    assert_eq!(service.unread_notification_count(alice).await.unwrap(), 4);
    assert_eq!(service.mark_notifications_read(alice).await.unwrap(), 4);
    assert_eq!(service.unread_notification_count(alice).await.unwrap(), 0);
}

#[tokio::test]
async fn test_repeated_like_and_follow_notify_once() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;
    let root = post(&service, alice, "hello").await;

    service.like_tweet(bob, root).await.unwrap();
    service.like_tweet(bob, root).await.unwrap();
    assert!(service.follow(bob, alice).await.unwrap());
    assert!(!service.follow(bob, alice).await.unwrap());

    let notifications = service.notifications(alice, Page::default()).await.unwrap();
    assert_eq!(notifications.len(), 2);
}

#[tokio::test]
async fn test_self_actions_do_not_notify() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;

    let mut subscription = service.broker().subscribe(alice);
    let root = post(&service, alice, "talking to myself").await;

    service.like_tweet(alice, root).await.unwrap();
    service
        .create_tweet(alice, Some("replying to myself"), Some(root))
        .await
        .unwrap();

    assert!(subscription.try_recv().is_none());
    assert_eq!(service.unread_notification_count(alice).await.unwrap(), 0);
}

#[tokio::test]
async fn test_notifications_without_subscriber_are_still_persisted() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;

    service.follow(bob, alice).await.unwrap();

    assert_eq!(service.broker().subscriber_count(alice), 0);
    assert_eq!(service.unread_notification_count(alice).await.unwrap(), 1);

    // A late subscriber does not see earlier notifications
    let mut subscription = service.broker().subscribe(alice);
    assert!(subscription.try_recv().is_none());
}

#[tokio::test]
async fn test_writes_from_unknown_viewer_are_unauthorized() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let root = post(&service, alice, "hello").await;
    let ghost = 999;

    let result = service.create_tweet(ghost, Some("boo"), None).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let result = service.like_tweet(ghost, root).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let result = service.retweet(ghost, root).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let result = service.follow(ghost, alice).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let tweet = service.get_tweet(root, None).await.unwrap();
    assert_eq!(tweet.tweet.like_count, 0);
    assert_eq!(tweet.tweet.retweet_count, 0);
    assert_eq!(service.unread_notification_count(alice).await.unwrap(), 0);
}

#[tokio::test]
async fn test_follow_rules() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;
    let bob = user(&service, "bob").await;

    let result = service.follow(alice, alice).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let result = service.follow(alice, 4242).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    service.follow(alice, bob).await.unwrap();
    let bob_item = service.get_user(bob, Some(alice)).await.unwrap();
    assert!(bob_item.is_following);
    assert_eq!(bob_item.user.followers_count, 1);

    let followers = service.followers(bob, Page::default(), None).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].user.id, alice);

    // Suggestions exclude the viewer and accounts already followed
    let suggested = service.suggested_users(Page::default(), Some(alice)).await.unwrap();
    assert!(suggested.is_empty());

    service.unfollow(alice, bob).await.unwrap();
    let suggested = service.suggested_users(Page::default(), Some(alice)).await.unwrap();
    assert_eq!(suggested.len(), 1);
    assert_eq!(suggested[0].user.id, bob);
}

#[tokio::test]
async fn test_update_profile_keeps_and_clears_fields() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;

    let updated = service
        .update_profile(alice, Some(" Alice "), Some("hello"))
        .await
        .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Alice"));
    assert_eq!(updated.bio.as_deref(), Some("hello"));

    let updated = service.update_profile(alice, None, Some("")).await.unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Alice"));
    assert!(updated.bio.is_none());
}

#[tokio::test]
async fn test_anonymous_global_feed_is_cached() {
    let (service, _temp_dir) = setup().await;
    let cache = Arc::new(ResponseCache::new());
    let service = service.with_cache(
        Arc::clone(&cache),
        CacheTtls {
            global_feed: Duration::from_secs(60),
            trending: Duration::from_secs(60),
        },
    );
    let alice = user(&service, "alice").await;
    post(&service, alice, "first").await;

    let feed = service.global_feed(Page::default(), None).await.unwrap();
    assert_eq!(feed.len(), 1);
    let cached_entries = cache.len();
    assert!(cached_entries >= 1);

    post(&service, alice, "second").await;

    // Anonymous readers see the cached page until it expires
    let feed = service.global_feed(Page::default(), None).await.unwrap();
    assert_eq!(feed.len(), 1);

    // A signed-in viewer always gets fresh rows
    let feed = service.global_feed(Page::default(), Some(alice)).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(cache.len(), cached_entries);
}

#[tokio::test]
async fn test_empty_global_feed_is_not_cached() {
    let (service, _temp_dir) = setup().await;
    let cache = Arc::new(ResponseCache::new());
    let service = service.with_cache(Arc::clone(&cache), CacheTtls::default());

    let feed = service.global_feed(Page::default(), None).await.unwrap();
    assert!(feed.is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_search_tweets_by_words() {
    let (service, _temp_dir) = setup().await;
    let alice = user(&service, "alice").await;

    let hit = post(&service, alice, "Async Rust is fun").await;
    post(&service, alice, "Rust only").await;

    let found = service
        .search_tweets("rust, async!", Page::default(), None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tweet.id, hit);

    assert!(service
        .search_tweets("   ", Page::default(), None)
        .await
        .unwrap()
        .is_empty());
}
