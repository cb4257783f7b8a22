use chrono::Utc;
use folio_common::types::Comment;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::comment::{self, Column, Entity};
use crate::error::Result;
use crate::store::Store;

fn to_comment(m: comment::Model, author_username: String) -> Comment {
    Comment {
        id: m.id,
        post_id: m.post_id,
        author_id: m.author_id,
        author_username,
        content: m.content,
        is_approved: m.is_approved,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    async fn hydrate_comments(&self, models: Vec<comment::Model>) -> Result<Vec<Comment>> {
        let author_ids: Vec<String> = models.iter().map(|m| m.author_id.clone()).collect();
        let authors = self.usernames_by_ids(&author_ids).await?;
        Ok(models
            .into_iter()
            .map(|m| {
                let author = authors.get(&m.author_id).cloned().unwrap_or_default();
                to_comment(m, author)
            })
            .collect())
    }

    /// Approved comments of a post, newest first.
    pub async fn list_approved_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let rows = Entity::find()
            .filter(Column::PostId.eq(post_id))
            .filter(Column::IsApproved.eq(true))
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .all(self.db())
            .await?;
        self.hydrate_comments(rows).await
    }

    /// New comments are approved immediately; moderation can hide them later.
    pub async fn create_comment(&self, post_id: &str, author_id: &str, content: &str) -> Result<Comment> {
        let now = Utc::now().fixed_offset();
        let am = comment::ActiveModel {
            id: Set(folio_common::id::next_id()),
            post_id: Set(post_id.to_owned()),
            author_id: Set(author_id.to_owned()),
            content: Set(content.to_owned()),
            is_approved: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(self.db()).await?;
        let mut out = self.hydrate_comments(vec![m]).await?;
        Ok(out.remove(0))
    }

    pub async fn set_comment_approval(&self, comment_id: &str, approved: bool) -> Result<Option<Comment>> {
        let Some(m) = Entity::find_by_id(comment_id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut active: comment::ActiveModel = m.into();
        active.is_approved = Set(approved);
        active.updated_at = Set(Utc::now().fixed_offset());
        let m = active.update(self.db()).await?;
        Ok(self.hydrate_comments(vec![m]).await?.pop())
    }
}
