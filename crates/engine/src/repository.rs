use crate::traits::Repository;
use anyhow::Result;
use async_trait::async_trait;
use domain::{BlockedUser, CommunityId, Suggestion, UserId};
use storage::Db;

#[async_trait]
impl Repository for Db {
    async fn load_suggestions(&self, community: CommunityId) -> Result<Vec<Suggestion>> {
        Db::load_suggestions(self, community).await
    }

    async fn insert_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        Db::insert_suggestion(self, suggestion).await
    }

    async fn update_suggestion(&self, suggestion: &Suggestion) -> Result<()> {
        Db::update_suggestion(self, suggestion).await
    }

    async fn update_suggestions(&self, batch: &[Suggestion]) -> Result<()> {
        Db::update_suggestions(self, batch).await
    }

    async fn load_blocked_users(&self, community: CommunityId) -> Result<Vec<BlockedUser>> {
        Db::load_blocked_users(self, community).await
    }

    async fn insert_blocked_user(&self, entry: &BlockedUser) -> Result<()> {
        Db::insert_blocked_user(self, entry).await
    }

    async fn delete_blocked_user(&self, community: CommunityId, user_id: UserId) -> Result<bool> {
        Db::delete_blocked_user(self, community, user_id).await
    }
}
