//! Read-path hydration: turning raw tweet rows into response-ready items.

mod assembler;
mod cache;
mod loader;

pub use assembler::{
    apply_viewer_flags, split_rows, FeedAssembler, ReferencedTweet, TweetItem, UserItem,
    ViewerFlags,
};
pub use cache::{keys as cache_keys, ResponseCache};
pub use loader::BatchLoader;
