use folio_common::forms::TagDraft;
use folio_common::slug;
use folio_common::types::Tag;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    TransactionTrait,
};
use std::collections::HashMap;

use crate::entities::post_tag;
use crate::entities::tag::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{taken_slugs, Store};

pub(crate) fn to_tag(m: tag::Model) -> Tag {
    Tag {
        id: m.id,
        name: m.name,
        slug: m.slug,
        color: m.color,
    }
}

impl Store {
    /// All tags ordered by name.
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows = Entity::find()
            .order_by(Column::Name, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_tag).collect())
    }

    pub async fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let m = Entity::find()
            .filter(Column::Slug.eq(slug))
            .one(self.db())
            .await?;
        Ok(m.map(to_tag))
    }

    pub async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let m = Entity::find()
            .filter(Column::Name.eq(name))
            .one(self.db())
            .await?;
        Ok(m.map(to_tag))
    }

    /// Tags with the given ids, ordered by name. Unknown ids are skipped.
    pub async fn get_tags_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Entity::find()
            .filter(Column::Id.is_in(ids.iter().map(String::as_str)))
            .order_by(Column::Name, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_tag).collect())
    }

    /// post id -> tags, for a batch of posts.
    pub(crate) async fn tags_for_posts(&self, post_ids: &[String]) -> Result<HashMap<String, Vec<Tag>>> {
        let mut out: HashMap<String, Vec<Tag>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(out);
        }
        let links = post_tag::Entity::find()
            .filter(post_tag::Column::PostId.is_in(post_ids.iter().map(String::as_str)))
            .all(self.db())
            .await?;
        let tag_ids: Vec<String> = links.iter().map(|l| l.tag_id.clone()).collect();
        let tags: HashMap<String, Tag> = self
            .get_tags_by_ids(&tag_ids)
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        for link in links {
            if let Some(tag) = tags.get(&link.tag_id) {
                out.entry(link.post_id).or_default().push(tag.clone());
            }
        }
        for tags in out.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(out)
    }

    /// Insert a tag. A duplicate name is a [`StorageError::Conflict`]; a
    /// colliding slug gets a numeric suffix.
    pub async fn create_tag(&self, draft: &TagDraft) -> Result<Tag> {
        let txn = self.db().begin().await?;
        let existing = Entity::find()
            .filter(Column::Name.eq(draft.name.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(StorageError::Conflict(format!(
                "tag with name '{}' already exists",
                draft.name
            )));
        }
        let taken = taken_slugs::<Entity, _>(&txn, Column::Slug, &draft.slug_base, slug::TAG_SLUG_MAX).await?;
        let am = tag::ActiveModel {
            id: Set(folio_common::id::next_id()),
            name: Set(draft.name.clone()),
            slug: Set(slug::disambiguate(&draft.slug_base, &taken, slug::TAG_SLUG_MAX)),
            color: Set(draft.color.clone()),
        };
        let m = am.insert(&txn).await?;
        txn.commit().await?;
        Ok(to_tag(m))
    }
}
