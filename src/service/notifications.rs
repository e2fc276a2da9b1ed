use crate::db::{self, Notification, Page};
use crate::error::AppResult;

use super::SocialService;

impl SocialService {
    pub async fn notifications(&self, user_id: i64, page: Page) -> AppResult<Vec<Notification>> {
        Ok(db::list_notifications(self.db.pool(), user_id, page).await?)
    }

    pub async fn unread_notification_count(&self, user_id: i64) -> AppResult<i64> {
        Ok(db::count_unread_notifications(self.db.pool(), user_id).await?)
    }

    /// Mark every notification of the user read, returning how many changed.
    pub async fn mark_notifications_read(&self, user_id: i64) -> AppResult<u64> {
        Ok(db::mark_all_notifications_read(self.db.pool(), user_id).await?)
    }
}
