use chrono::Utc;
use folio_common::types::{media_url, PostImage};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::post_image::{self, Column, Entity};
use crate::error::Result;
use crate::store::Store;

fn to_image(m: post_image::Model) -> PostImage {
    PostImage {
        url: media_url(&m.image),
        id: m.id,
        post_id: m.post_id,
        image: m.image,
        alt_text: m.alt_text,
        uploaded_at: m.uploaded_at.with_timezone(&Utc),
    }
}

impl Store {
    /// Record an image already written under the media root at `path`.
    pub async fn create_post_image(&self, post_id: &str, path: &str, alt_text: &str) -> Result<PostImage> {
        let am = post_image::ActiveModel {
            id: Set(folio_common::id::next_id()),
            post_id: Set(post_id.to_owned()),
            image: Set(path.to_owned()),
            alt_text: Set(alt_text.to_owned()),
            uploaded_at: Set(Utc::now().fixed_offset()),
        };
        let m = am.insert(self.db()).await?;
        Ok(to_image(m))
    }

    /// Images of a post in upload order.
    pub async fn list_post_images(&self, post_id: &str) -> Result<Vec<PostImage>> {
        let rows = Entity::find()
            .filter(Column::PostId.eq(post_id))
            .order_by(Column::UploadedAt, Order::Asc)
            .order_by(Column::Id, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_image).collect())
    }
}
