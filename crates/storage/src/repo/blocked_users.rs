use crate::{
    models::{to_db, SqlBlockedUser},
    Db,
};
use domain::{BlockedUser, CommunityId, UserId};

impl Db {
    pub async fn load_blocked_users(&self, community: CommunityId) -> anyhow::Result<Vec<BlockedUser>> {
        let rows = sqlx::query_as::<_, SqlBlockedUser>(
            r#"
            SELECT community_id, user_id, reviewer_id, reason, blocked_at
            FROM blocked_users
            WHERE community_id = ?
            "#,
        )
        .bind(to_db(community.get()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    // a repeated block refreshes the reviewer and reason instead of failing on the key
    pub async fn insert_blocked_user(&self, b: &BlockedUser) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blocked_users (community_id, user_id, reviewer_id, reason, blocked_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(community_id, user_id) DO UPDATE SET
                reviewer_id = excluded.reviewer_id,
                reason = excluded.reason,
                blocked_at = excluded.blocked_at
            "#,
        )
        .bind(to_db(b.community_id.get()))
        .bind(to_db(b.user_id))
        .bind(to_db(b.reviewer_id))
        .bind(&b.reason)
        .bind(b.blocked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub async fn delete_blocked_user(
        &self,
        community: CommunityId,
        user_id: UserId,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM blocked_users WHERE community_id = ? AND user_id = ?")
            .bind(to_db(community.get()))
            .bind(to_db(user_id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
