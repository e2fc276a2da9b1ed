use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use super::responses::{many, Success, TweetResponse, UserResponse, SUCCESS};
use super::stream::stream_notifications;
use super::viewer::{MaybeViewer, RequireViewer};
use super::AppState;
use crate::constants::{DEFAULT_HASHTAG_SEARCH_LIMIT, DEFAULT_TRENDING_LIMIT};
use crate::db::{Hashtag, Notification};
use crate::error::AppResult;
use crate::service::{clamp_limit, paginate};

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health))
        .nest("/api/v1", api_router())
}

fn api_router() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users/me", get(get_me))
        .route("/users/profile", put(update_profile))
        .route("/users/:id", get(get_user))
        .route("/users/:id/followers", get(list_followers))
        .route("/users/:id/following", get(list_following))
        .route("/users/:id/follow", post(follow_user).delete(unfollow_user))
        // Tweets
        .route("/tweets", post(create_tweet))
        .route("/tweets/:id", get(get_tweet).delete(delete_tweet))
        .route("/tweets/:id/replies", get(list_replies))
        .route("/tweets/:id/like", post(like_tweet).delete(unlike_tweet))
        .route("/tweets/:id/retweet", post(retweet).delete(undo_retweet))
        // Feeds
        .route("/feeds/global", get(global_feed))
        .route("/feeds/following", get(following_feed))
        .route("/feeds/user/:user_id", get(user_feed))
        // Search & discovery
        .route("/search/users", get(search_users))
        .route("/search/tweets", get(search_tweets))
        .route("/search/hashtags", get(search_hashtags))
        .route("/discovery/trending", get(trending_hashtags))
        .route("/discovery/users", get(suggested_users))
        // Notifications
        .route("/notifications", get(list_notifications))
        .route("/notifications/stream", get(stream_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/mark-read", post(mark_read))
}

async fn health() -> &'static str {
    "ok"
}

// ========== Request Shapes ==========

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    page: Option<i64>,
    size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    #[serde(default)]
    q: String,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTweetRequest {
    content: Option<String>,
    parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    display_name: Option<String>,
    bio: Option<String>,
}

// ========== Users ==========

async fn get_me(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
) -> AppResult<Json<UserResponse>> {
    let user = state.service.get_user(viewer_id, Some(viewer_id)).await?;
    Ok(Json(user.into()))
}

async fn get_user(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = state.service.get_user(id, viewer_id).await?;
    Ok(Json(user.into()))
}

async fn update_profile(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .service
        .update_profile(viewer_id, body.display_name.as_deref(), body.bio.as_deref())
        .await?;
    Ok(Json(user.into()))
}

async fn list_followers(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let page = paginate(query.page, query.size)?;
    let users = state.service.followers(id, page, viewer_id).await?;
    Ok(Json(many(users)))
}

async fn list_following(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let page = paginate(query.page, query.size)?;
    let users = state.service.following(id, page, viewer_id).await?;
    Ok(Json(many(users)))
}

async fn follow_user(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Success>> {
    state.service.follow(viewer_id, id).await?;
    Ok(Json(SUCCESS))
}

async fn unfollow_user(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Success>> {
    state.service.unfollow(viewer_id, id).await?;
    Ok(Json(SUCCESS))
}

// ========== Tweets ==========

async fn create_tweet(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Json(body): Json<CreateTweetRequest>,
) -> AppResult<(StatusCode, Json<TweetResponse>)> {
    let tweet = state
        .service
        .create_tweet(viewer_id, body.content.as_deref(), body.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(tweet.into())))
}

async fn get_tweet(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<TweetResponse>> {
    let tweet = state.service.get_tweet(id, viewer_id).await?;
    Ok(Json(tweet.into()))
}

async fn delete_tweet(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Success>> {
    state.service.delete_tweet(viewer_id, id).await?;
    Ok(Json(SUCCESS))
}

async fn list_replies(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<TweetResponse>>> {
    let page = paginate(query.page, query.size)?;
    let tweets = state.service.replies(id, page, viewer_id).await?;
    Ok(Json(many(tweets)))
}

async fn like_tweet(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Success>> {
    state.service.like_tweet(viewer_id, id).await?;
    Ok(Json(SUCCESS))
}

async fn unlike_tweet(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Success>> {
    state.service.unlike_tweet(viewer_id, id).await?;
    Ok(Json(SUCCESS))
}

async fn retweet(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<TweetResponse>> {
    let tweet = state.service.retweet(viewer_id, id).await?;
    Ok(Json(tweet.into()))
}

async fn undo_retweet(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Success>> {
    state.service.undo_retweet(viewer_id, id).await?;
    Ok(Json(SUCCESS))
}

// ========== Feeds ==========

async fn global_feed(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<TweetResponse>>> {
    let page = paginate(query.page, query.size)?;
    let tweets = state.service.global_feed(page, viewer_id).await?;
    Ok(Json(many(tweets)))
}

async fn following_feed(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<TweetResponse>>> {
    let page = paginate(query.page, query.size)?;
    let tweets = state.service.following_feed(viewer_id, page).await?;
    Ok(Json(many(tweets)))
}

async fn user_feed(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Path(user_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<TweetResponse>>> {
    let page = paginate(query.page, query.size)?;
    let tweets = state.service.user_feed(user_id, page, viewer_id).await?;
    Ok(Json(many(tweets)))
}

// ========== Search & Discovery ==========

async fn search_users(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let page = paginate(query.page, query.size)?;
    let users = state.service.search_users(&query.q, page, viewer_id).await?;
    Ok(Json(many(users)))
}

async fn search_tweets(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<TweetResponse>>> {
    let page = paginate(query.page, query.size)?;
    let tweets = state.service.search_tweets(&query.q, page, viewer_id).await?;
    Ok(Json(many(tweets)))
}

async fn search_hashtags(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Hashtag>>> {
    let limit = clamp_limit(query.limit, DEFAULT_HASHTAG_SEARCH_LIMIT);
    Ok(Json(state.service.search_hashtags(&query.q, limit).await?))
}

async fn trending_hashtags(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Hashtag>>> {
    let limit = clamp_limit(query.limit, DEFAULT_TRENDING_LIMIT);
    Ok(Json(state.service.trending_hashtags(limit).await?))
}

async fn suggested_users(
    State(state): State<AppState>,
    MaybeViewer(viewer_id): MaybeViewer,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let page = paginate(query.page, query.size)?;
    let users = state.service.suggested_users(page, viewer_id).await?;
    Ok(Json(many(users)))
}

// ========== Notifications ==========

async fn list_notifications(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let page = paginate(query.page, query.size)?;
    Ok(Json(state.service.notifications(viewer_id, page).await?))
}

async fn unread_count(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
) -> AppResult<Json<i64>> {
    Ok(Json(state.service.unread_notification_count(viewer_id).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    RequireViewer(viewer_id): RequireViewer,
) -> AppResult<Json<Success>> {
    state.service.mark_notifications_read(viewer_id).await?;
    Ok(Json(SUCCESS))
}
