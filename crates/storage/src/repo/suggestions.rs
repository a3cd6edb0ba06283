use crate::{
    models::{to_db, SqlSuggestion},
    Db,
};
use domain::{CommunityId, Suggestion};

impl Db {
    /// All suggestions of a community in id order.
    pub async fn load_suggestions(&self, community: CommunityId) -> anyhow::Result<Vec<Suggestion>> {
        let rows = sqlx::query_as::<_, SqlSuggestion>(
            r#"
            SELECT
                community_id, id, author_id, content, status,
                mirror_message_id, mirror_thread_id,
                reviewer_id, remarks, up_votes, down_votes, created_at
            FROM suggestions
            WHERE community_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(to_db(community.get()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Suggestion::try_from).collect()
    }

    pub async fn insert_suggestion(&self, s: &Suggestion) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO suggestions (
                community_id, id, author_id, content, status,
                mirror_message_id, mirror_thread_id,
                reviewer_id, remarks, up_votes, down_votes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_db(s.community_id.get()))
        .bind(s.id)
        .bind(to_db(s.author_id))
        .bind(&s.content)
        .bind(s.status.as_str())
        .bind(to_db(s.mirror_message_id))
        .bind(to_db(s.mirror_thread_id))
        .bind(s.reviewer_id.map(to_db))
        .bind(&s.remarks)
        .bind(i64::from(s.up_votes))
        .bind(i64::from(s.down_votes))
        .bind(s.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_suggestion(&self, s: &Suggestion) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        update_in(&mut tx, s).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Writes every record in one transaction; either all land or none do.
    pub async fn update_suggestions(&self, batch: &[Suggestion]) -> anyhow::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in batch {
            update_in(&mut tx, s).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn update_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    s: &Suggestion,
) -> anyhow::Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE suggestions
        SET status = ?,
            mirror_message_id = ?,
            mirror_thread_id = ?,
            reviewer_id = ?,
            remarks = ?,
            up_votes = ?,
            down_votes = ?
        WHERE community_id = ? AND id = ?
        "#,
    )
    .bind(s.status.as_str())
    .bind(to_db(s.mirror_message_id))
    .bind(to_db(s.mirror_thread_id))
    .bind(s.reviewer_id.map(to_db))
    .bind(&s.remarks)
    .bind(i64::from(s.up_votes))
    .bind(i64::from(s.down_votes))
    .bind(to_db(s.community_id.get()))
    .bind(s.id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!(
            "suggestion {} does not exist in community {}",
            s.id,
            s.community_id
        );
    }
    Ok(())
}
