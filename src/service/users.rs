use crate::db::{self, NotificationKind, Page, ProfileUpdate, User};
use crate::error::{AppError, AppResult};
use crate::feed::UserItem;

use super::{normalize_text, SocialService};

impl SocialService {
    /// A user with the viewer's follow relationship.
    pub async fn get_user(&self, user_id: i64, viewer_id: Option<i64>) -> AppResult<UserItem> {
        db::get_user_row(self.db.pool(), user_id, viewer_id)
            .await?
            .map(UserItem::from)
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    /// Update the viewer's profile.
    ///
    /// Absent fields keep their value; blank fields are cleared.
    pub async fn update_profile(
        &self,
        user_id: i64,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> AppResult<User> {
        let existing = db::get_user(self.db.pool(), user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        let update = ProfileUpdate {
            display_name: match display_name {
                Some(value) => normalize_text(Some(value)),
                None => existing.display_name,
            },
            bio: match bio {
                Some(value) => normalize_text(Some(value)),
                None => existing.bio,
            },
        };

        db::update_profile(self.db.pool(), user_id, &update)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    /// Follow a user, notifying them the first time.
    ///
    /// Returns whether a new follow was created.
    pub async fn follow(&self, follower_id: i64, target_id: i64) -> AppResult<bool> {
        if follower_id == target_id {
            return Err(AppError::bad_request("you cannot follow yourself"));
        }
        self.require_actor(follower_id).await?;

        db::get_user(self.db.pool(), target_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        let inserted = db::follow_user(self.db.pool(), follower_id, target_id).await?;
        if inserted {
            self.notify(target_id, follower_id, None, NotificationKind::Follow)
                .await;
        }
        Ok(inserted)
    }

    pub async fn unfollow(&self, follower_id: i64, target_id: i64) -> AppResult<()> {
        db::unfollow_user(self.db.pool(), follower_id, target_id).await?;
        Ok(())
    }

    pub async fn followers(
        &self,
        user_id: i64,
        page: Page,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<UserItem>> {
        let rows = db::list_followers(self.db.pool(), user_id, page, viewer_id).await?;
        Ok(rows.into_iter().map(UserItem::from).collect())
    }

    pub async fn following(
        &self,
        user_id: i64,
        page: Page,
        viewer_id: Option<i64>,
    ) -> AppResult<Vec<UserItem>> {
        let rows = db::list_following(self.db.pool(), user_id, page, viewer_id).await?;
        Ok(rows.into_iter().map(UserItem::from).collect())
    }
}
