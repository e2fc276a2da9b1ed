//! Shared constants used across the application.

/// Header carrying the authenticated viewer's user ID, set by the upstream
/// authentication layer.
pub const VIEWER_ID_HEADER: &str = "x-viewer-id";

/// Default number of trending hashtags returned.
pub const DEFAULT_TRENDING_LIMIT: i64 = 10;

/// Default number of hashtag search suggestions returned.
pub const DEFAULT_HASHTAG_SEARCH_LIMIT: i64 = 5;
