pub use sea_orm_migration::prelude::*;

mod m001_initial_schema;
mod m002_usage_and_deployments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_initial_schema::Migration),
            Box::new(m002_usage_and_deployments::Migration),
        ]
    }
}
