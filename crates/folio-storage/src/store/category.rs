use chrono::Utc;
use folio_common::forms::CategoryDraft;
use folio_common::slug;
use folio_common::types::AIModelCategory;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    TransactionTrait,
};
use std::collections::HashMap;

use crate::entities::ai_model_category::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{taken_slugs, Store};

pub(crate) fn to_category(m: ai_model_category::Model) -> AIModelCategory {
    AIModelCategory {
        id: m.id,
        name: m.name,
        slug: m.slug,
        description: m.description,
        color: m.color,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn list_categories(&self) -> Result<Vec<AIModelCategory>> {
        let rows = Entity::find()
            .order_by(Column::Name, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_category).collect())
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<AIModelCategory>> {
        let m = Entity::find()
            .filter(Column::Slug.eq(slug))
            .one(self.db())
            .await?;
        Ok(m.map(to_category))
    }

    pub async fn get_category_by_id(&self, id: &str) -> Result<Option<AIModelCategory>> {
        let m = Entity::find_by_id(id).one(self.db()).await?;
        Ok(m.map(to_category))
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<AIModelCategory>> {
        let m = Entity::find()
            .filter(Column::Name.eq(name))
            .one(self.db())
            .await?;
        Ok(m.map(to_category))
    }

    pub(crate) async fn categories_by_ids(&self, ids: &[String]) -> Result<HashMap<String, AIModelCategory>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = Entity::find()
            .filter(Column::Id.is_in(ids.iter().map(String::as_str)))
            .all(self.db())
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| (m.id.clone(), to_category(m)))
            .collect())
    }

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<AIModelCategory> {
        let txn = self.db().begin().await?;
        let existing = Entity::find()
            .filter(Column::Name.eq(draft.name.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(StorageError::Conflict(format!(
                "category with name '{}' already exists",
                draft.name
            )));
        }
        let taken = taken_slugs::<Entity, _>(&txn, Column::Slug, &draft.slug_base, slug::CATEGORY_SLUG_MAX).await?;
        let am = ai_model_category::ActiveModel {
            id: Set(folio_common::id::next_id()),
            name: Set(draft.name.clone()),
            slug: Set(slug::disambiguate(&draft.slug_base, &taken, slug::CATEGORY_SLUG_MAX)),
            description: Set(draft.description.clone()),
            color: Set(draft.color.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        };
        let m = am.insert(&txn).await?;
        txn.commit().await?;
        Ok(to_category(m))
    }
}
