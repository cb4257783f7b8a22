use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // tables are created in dependency order
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_staff INTEGER NOT NULL DEFAULT 0,
    token_version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    color TEXT NOT NULL DEFAULT '#007bff'
);

CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    author_id TEXT NOT NULL REFERENCES users(id),
    body TEXT NOT NULL,
    excerpt TEXT NOT NULL DEFAULT '',
    featured_image TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    views INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_posts_status_created ON posts(status, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);

CREATE TABLE IF NOT EXISTS post_tags (
    post_id TEXT NOT NULL REFERENCES posts(id),
    tag_id TEXT NOT NULL REFERENCES tags(id),
    PRIMARY KEY (post_id, tag_id)
);
CREATE INDEX IF NOT EXISTS idx_post_tags_tag ON post_tags(tag_id);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY NOT NULL,
    post_id TEXT NOT NULL REFERENCES posts(id),
    author_id TEXT NOT NULL REFERENCES users(id),
    content TEXT NOT NULL,
    is_approved INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at DESC);

CREATE TABLE IF NOT EXISTS post_images (
    id TEXT PRIMARY KEY NOT NULL,
    post_id TEXT NOT NULL REFERENCES posts(id),
    image TEXT NOT NULL,
    alt_text TEXT NOT NULL DEFAULT '',
    uploaded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_post_images_post ON post_images(post_id);

CREATE TABLE IF NOT EXISTS ai_model_categories (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '#007bff',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ai_models (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    model_type TEXT NOT NULL,
    category_id TEXT REFERENCES ai_model_categories(id),
    version TEXT NOT NULL DEFAULT '1.0',
    framework TEXT NOT NULL DEFAULT 'PyTorch',
    model_file TEXT,
    config_file TEXT,
    accuracy REAL,
    precision_score REAL,
    recall REAL,
    f1_score REAL,
    input_format TEXT NOT NULL DEFAULT '{}',
    output_format TEXT NOT NULL DEFAULT '{}',
    max_input_length INTEGER NOT NULL DEFAULT 512,
    batch_size INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'training',
    is_public INTEGER NOT NULL DEFAULT 0,
    created_by TEXT NOT NULL REFERENCES users(id),
    last_trained TEXT,
    total_inferences INTEGER NOT NULL DEFAULT 0,
    successful_inferences INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ai_models_visible ON ai_models(is_public, status, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_ai_models_created_by ON ai_models(created_by);

CREATE TABLE IF NOT EXISTS ai_model_team_members (
    model_id TEXT NOT NULL REFERENCES ai_models(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    PRIMARY KEY (model_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_team_members_user ON ai_model_team_members(user_id);

CREATE TABLE IF NOT EXISTS inference_requests (
    id TEXT PRIMARY KEY NOT NULL,
    model_id TEXT NOT NULL REFERENCES ai_models(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    input_data TEXT NOT NULL,
    parameters TEXT NOT NULL DEFAULT '{}',
    status TEXT NOT NULL DEFAULT 'pending',
    result TEXT,
    error_message TEXT NOT NULL DEFAULT '',
    processing_time REAL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_inference_model_created ON inference_requests(model_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_inference_user ON inference_requests(user_id);

CREATE TABLE IF NOT EXISTS model_feedback (
    id TEXT PRIMARY KEY NOT NULL,
    inference_request_id TEXT NOT NULL REFERENCES inference_requests(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    feedback_type TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    rating INTEGER,
    created_at TEXT NOT NULL,
    UNIQUE (inference_request_id, user_id)
);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS model_feedback;
DROP TABLE IF EXISTS inference_requests;
DROP TABLE IF EXISTS ai_model_team_members;
DROP TABLE IF EXISTS ai_models;
DROP TABLE IF EXISTS ai_model_categories;
DROP TABLE IF EXISTS post_images;
DROP TABLE IF EXISTS comments;
DROP TABLE IF EXISTS post_tags;
DROP TABLE IF EXISTS posts;
DROP TABLE IF EXISTS tags;
DROP TABLE IF EXISTS users;
";
