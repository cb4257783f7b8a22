use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect,
};
use folio_common::slug;
use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;

pub mod category;
pub mod comment;
pub mod deployment;
pub mod feedback;
pub mod image;
pub mod inference;
pub mod model;
pub mod post;
pub mod tag;
pub mod usage;
pub mod user;

pub use inference::InferenceOutcome;
pub use usage::UsageLogEntry;
pub use model::{ModelFilter, ModelStats};
pub use post::PostFilter;

/// Access layer over the application database.
///
/// Every method is `async` and runs on SeaORM with SQLite. Each aggregate
/// (posts, models, inference requests, ...) lives in its own submodule as
/// another `impl Store` block.
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// Connect, switch SQLite to WAL and run pending migrations.
    ///
    /// `db_url` example: `sqlite://data/folio.db?mode=rwc`. `data_dir` is
    /// created when missing.
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
            db.execute_unprepared("PRAGMA foreign_keys=ON;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "Initialized store (SeaORM)");

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Cheap liveness probe used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}

/// Slugs in `col` that collide with `base` or with any suffixed variant
/// [`slug::disambiguate`] could derive from it within `max_len`.
pub(crate) async fn taken_slugs<E, C>(
    conn: &C,
    col: E::Column,
    base: &str,
    max_len: usize,
) -> Result<HashSet<String>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let prefix = slug::candidate_prefix(base, max_len);
    let rows: Vec<String> = E::find()
        .select_only()
        .column(col)
        .filter(col.eq(base).or(col.starts_with(prefix)))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// `%needle%` with LIKE wildcards in `needle` escaped by `\`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Case-insensitive substring match on a text column.
pub(crate) fn icontains<C: ColumnTrait>(col: C, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((col.entity_name(), col))))
        .like(LikeExpr::new(contains_pattern(needle)).escape('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Rust"), "%rust%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
