//! Database operations, one module per entity

pub mod chapters;
pub mod resources;
pub mod sessions;
pub mod study;
pub mod subjects;
pub mod tasks;
pub mod users;

#[cfg(test)]
pub mod test_support {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Fresh in-memory database with the full schema applied
    ///
    /// Capped at one connection: each SQLite `:memory:` connection is its
    /// own database, so a larger pool would scatter tables across them.
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");

        studytrail_common::db::init_schema(&pool)
            .await
            .expect("schema init");

        pool
    }
}
