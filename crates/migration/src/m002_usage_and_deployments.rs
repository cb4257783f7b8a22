use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_usage_and_deployments"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
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
CREATE TABLE IF NOT EXISTS model_usage_logs (
    id TEXT PRIMARY KEY NOT NULL,
    model_id TEXT NOT NULL REFERENCES ai_models(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    inference_request_id TEXT NOT NULL UNIQUE REFERENCES inference_requests(id),
    ip_address TEXT NOT NULL,
    user_agent TEXT NOT NULL DEFAULT '',
    api_endpoint TEXT NOT NULL,
    response_time REAL NOT NULL,
    cpu_usage REAL,
    gpu_usage REAL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_usage_logs_model_created ON model_usage_logs(model_id, created_at DESC);

CREATE TABLE IF NOT EXISTS model_deployments (
    id TEXT PRIMARY KEY NOT NULL,
    model_id TEXT NOT NULL REFERENCES ai_models(id),
    deployment_type TEXT NOT NULL,
    endpoint_url TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    replicas INTEGER NOT NULL DEFAULT 1,
    cpu_limit TEXT NOT NULL DEFAULT '1000m',
    memory_limit TEXT NOT NULL DEFAULT '1Gi',
    health_check_url TEXT,
    last_health_check TEXT,
    is_healthy INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_deployments_model ON model_deployments(model_id, created_at DESC);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS model_deployments;
DROP TABLE IF EXISTS model_usage_logs;
";
