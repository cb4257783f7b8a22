use chrono::Utc;
use folio_common::types::User;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
};
use std::collections::HashMap;

use crate::entities::user::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;

pub(crate) fn to_user(m: user::Model) -> User {
    User {
        id: m.id,
        username: m.username,
        password_hash: m.password_hash,
        is_staff: m.is_staff,
        token_version: m.token_version as i64,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Username.eq(username))
            .one(self.db())
            .await?;
        Ok(model.map(to_user))
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_user))
    }

    /// Users whose username is in `usernames`; unknown names are simply absent.
    pub async fn get_users_by_usernames(&self, usernames: &[String]) -> Result<Vec<User>> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let models = Entity::find()
            .filter(Column::Username.is_in(usernames.iter().map(String::as_str)))
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_user).collect())
    }

    /// id -> username for the given user ids.
    pub(crate) async fn usernames_by_ids(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = Entity::find()
            .filter(Column::Id.is_in(ids.iter().map(String::as_str)))
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(|m| (m.id, m.username)).collect())
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User> {
        let now = Utc::now().fixed_offset();
        let am = user::ActiveModel {
            id: Set(folio_common::id::next_id()),
            username: Set(username.to_owned()),
            password_hash: Set(password_hash.to_owned()),
            is_staff: Set(is_staff),
            token_version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(self.db()).await?;
        Ok(to_user(m))
    }

    /// Invalidate every token issued to the user so far.
    pub async fn bump_token_version(&self, user_id: &str) -> Result<()> {
        let res = Entity::update_many()
            .col_expr(Column::TokenVersion, Expr::col(Column::TokenVersion).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(Column::Id.eq(user_id))
            .exec(self.db())
            .await?;
        if res.rows_affected == 0 {
            return Err(StorageError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn count_users(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }
}
