use chrono::Utc;
use folio_common::forms::PostDraft;
use folio_common::slug;
use folio_common::types::{media_url, Post, PostStatus};
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use crate::entities::post::{self, Column, Entity};
use crate::entities::{comment, post_image, post_tag, tag};
use crate::error::Result;
use crate::store::{icontains, taken_slugs, Store};

/// Filters for post listings. Every `Some` field narrows the result (AND).
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub author_id: Option<String>,
    /// Exact tag slug
    pub tag_slug: Option<String>,
    /// Case-insensitive substring of any tag name
    pub tag_name_contains: Option<String>,
    /// Case-insensitive substring of title, body or a tag name
    pub search: Option<String>,
    pub has_featured_image: Option<bool>,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published),
            ..Default::default()
        }
    }
}

type PostSelect = sea_orm::Select<Entity>;

/// `posts.id IN (posts linked to a tag matching tag_cond)`.
fn tagged_with(tag_cond: SimpleExpr) -> SimpleExpr {
    Column::Id.in_subquery(
        Query::select()
            .column(post_tag::Column::PostId)
            .from(post_tag::Entity)
            .and_where(
                post_tag::Column::TagId.in_subquery(
                    Query::select()
                        .column(tag::Column::Id)
                        .from(tag::Entity)
                        .and_where(tag_cond)
                        .to_owned(),
                ),
            )
            .to_owned(),
    )
}

fn apply_post_filter(mut q: PostSelect, filter: &PostFilter) -> PostSelect {
    if let Some(status) = filter.status {
        q = q.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(ref author_id) = filter.author_id {
        q = q.filter(Column::AuthorId.eq(author_id.as_str()));
    }
    if let Some(ref slug) = filter.tag_slug {
        q = q.filter(tagged_with(tag::Column::Slug.eq(slug.as_str())));
    }
    if let Some(ref needle) = filter.tag_name_contains {
        q = q.filter(tagged_with(icontains(tag::Column::Name, needle)));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        q = q.filter(
            Condition::any()
                .add(icontains(Column::Title, search))
                .add(icontains(Column::Body, search))
                .add(tagged_with(icontains(tag::Column::Name, search))),
        );
    }
    match filter.has_featured_image {
        Some(true) => {
            q = q.filter(
                Condition::all()
                    .add(Column::FeaturedImage.is_not_null())
                    .add(Column::FeaturedImage.ne("")),
            )
        }
        Some(false) => {
            q = q.filter(
                Condition::any()
                    .add(Column::FeaturedImage.is_null())
                    .add(Column::FeaturedImage.eq("")),
            )
        }
        None => {}
    }
    q
}

fn to_post(m: post::Model, author_username: String, tags: Vec<folio_common::types::Tag>) -> Post {
    let featured_image = m.featured_image.filter(|p| !p.is_empty());
    Post {
        featured_image_url: featured_image.as_deref().map(media_url),
        featured_image,
        id: m.id,
        title: m.title,
        slug: m.slug,
        author_id: m.author_id,
        author_username,
        body: m.body,
        excerpt: m.excerpt,
        status: m.status.parse().unwrap_or(PostStatus::Draft),
        views: m.views,
        tags,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

async fn replace_post_tags<C: ConnectionTrait>(conn: &C, post_id: &str, tag_ids: &[String]) -> Result<()> {
    post_tag::Entity::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(conn)
        .await?;
    for tag_id in tag_ids {
        post_tag::ActiveModel {
            post_id: Set(post_id.to_owned()),
            tag_id: Set(tag_id.clone()),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

impl Store {
    async fn hydrate_posts(&self, models: Vec<post::Model>) -> Result<Vec<Post>> {
        let post_ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let author_ids: Vec<String> = models.iter().map(|m| m.author_id.clone()).collect();
        let authors = self.usernames_by_ids(&author_ids).await?;
        let mut tags = self.tags_for_posts(&post_ids).await?;
        Ok(models
            .into_iter()
            .map(|m| {
                let author = authors.get(&m.author_id).cloned().unwrap_or_default();
                let post_tags = tags.remove(&m.id).unwrap_or_default();
                to_post(m, author, post_tags)
            })
            .collect())
    }

    async fn hydrate_post(&self, model: Option<post::Model>) -> Result<Option<Post>> {
        match model {
            None => Ok(None),
            Some(m) => Ok(self.hydrate_posts(vec![m]).await?.pop()),
        }
    }

    /// Newest first.
    pub async fn list_posts(&self, filter: &PostFilter, limit: u64, offset: u64) -> Result<Vec<Post>> {
        let rows = apply_post_filter(Entity::find(), filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        self.hydrate_posts(rows).await
    }

    pub async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        Ok(apply_post_filter(Entity::find(), filter).count(self.db()).await?)
    }

    /// Any status.
    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let m = Entity::find()
            .filter(Column::Slug.eq(slug))
            .one(self.db())
            .await?;
        self.hydrate_post(m).await
    }

    pub async fn get_published_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let m = Entity::find()
            .filter(Column::Slug.eq(slug))
            .filter(Column::Status.eq(PostStatus::Published.as_str()))
            .one(self.db())
            .await?;
        self.hydrate_post(m).await
    }

    /// The post only when `author_id` wrote it.
    pub async fn get_post_for_author(&self, slug: &str, author_id: &str) -> Result<Option<Post>> {
        let m = Entity::find()
            .filter(Column::Slug.eq(slug))
            .filter(Column::AuthorId.eq(author_id))
            .one(self.db())
            .await?;
        self.hydrate_post(m).await
    }

    /// Insert a post and its tag links in one transaction. The slug is the
    /// draft's slug base, suffixed when already taken.
    pub async fn create_post(&self, author_id: &str, draft: &PostDraft) -> Result<Post> {
        let now = Utc::now().fixed_offset();
        let txn = self.db().begin().await?;
        let taken = taken_slugs::<Entity, _>(&txn, Column::Slug, &draft.slug_base, slug::POST_SLUG_MAX).await?;
        let am = post::ActiveModel {
            id: Set(folio_common::id::next_id()),
            title: Set(draft.title.clone()),
            slug: Set(slug::disambiguate(&draft.slug_base, &taken, slug::POST_SLUG_MAX)),
            author_id: Set(author_id.to_owned()),
            body: Set(draft.body.clone()),
            excerpt: Set(draft.excerpt.clone()),
            featured_image: Set(None),
            status: Set(draft.status.as_str().to_owned()),
            views: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let m = am.insert(&txn).await?;
        replace_post_tags(&txn, &m.id, &draft.tag_ids).await?;
        txn.commit().await?;
        tracing::info!(post_id = %m.id, slug = %m.slug, "Post created");
        self.hydrate_post(Some(m)).await?.ok_or_else(|| {
            crate::error::StorageError::Other("created post vanished".to_string())
        })
    }

    /// Replace the editable fields of a post. The slug never changes.
    pub async fn update_post(&self, post_id: &str, draft: &PostDraft) -> Result<Option<Post>> {
        let txn = self.db().begin().await?;
        let Some(m) = Entity::find_by_id(post_id).one(&txn).await? else {
            return Ok(None);
        };
        let mut active: post::ActiveModel = m.into();
        active.title = Set(draft.title.clone());
        active.body = Set(draft.body.clone());
        active.excerpt = Set(draft.excerpt.clone());
        active.status = Set(draft.status.as_str().to_owned());
        active.updated_at = Set(Utc::now().fixed_offset());
        let m = active.update(&txn).await?;
        replace_post_tags(&txn, &m.id, &draft.tag_ids).await?;
        txn.commit().await?;
        self.hydrate_post(Some(m)).await
    }

    /// Delete a post together with its tag links, comments and images.
    pub async fn delete_post(&self, post_id: &str) -> Result<bool> {
        let txn = self.db().begin().await?;
        post_tag::Entity::delete_many()
            .filter(post_tag::Column::PostId.eq(post_id))
            .exec(&txn)
            .await?;
        comment::Entity::delete_many()
            .filter(comment::Column::PostId.eq(post_id))
            .exec(&txn)
            .await?;
        post_image::Entity::delete_many()
            .filter(post_image::Column::PostId.eq(post_id))
            .exec(&txn)
            .await?;
        let res = Entity::delete_by_id(post_id).exec(&txn).await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    /// Atomic `views = views + 1`.
    pub async fn increment_post_views(&self, post_id: &str) -> Result<()> {
        Entity::update_many()
            .col_expr(Column::Views, Expr::col(Column::Views).add(1))
            .filter(Column::Id.eq(post_id))
            .exec(self.db())
            .await?;
        Ok(())
    }

    pub async fn set_featured_image(&self, post_id: &str, path: &str) -> Result<Option<Post>> {
        let Some(m) = Entity::find_by_id(post_id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut active: post::ActiveModel = m.into();
        active.featured_image = Set(Some(path.to_owned()));
        active.updated_at = Set(Utc::now().fixed_offset());
        let m = active.update(self.db()).await?;
        self.hydrate_post(Some(m)).await
    }
}
