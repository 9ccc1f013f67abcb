use super::{CurrentConnectOptions, Db, Dialect};
use crate::config::DatabaseTarget;
use std::str::FromStr;

/// SQLite dialect implementation of the `Dialect` trait.
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    const NETWORKED: bool = false;

    fn placeholder(_idx: usize) -> String {
        "?".to_string()
    }

    fn connect_options(target: &DatabaseTarget) -> Result<CurrentConnectOptions, sqlx::Error> {
        let options = match target {
            DatabaseTarget::Url(url) => CurrentConnectOptions::from_str(url)?,
            DatabaseTarget::Params(params) => CurrentConnectOptions::new().filename(&params.name),
        };

        Ok(options.create_if_missing(true))
    }

    async fn migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error> {
        let stmts = vec![
            r#"CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_term TEXT NOT NULL,
                title TEXT NOT NULL,
                source_url TEXT NOT NULL,
                data BLOB NOT NULL,
                mime_type TEXT,
                width INTEGER,
                height INTEGER,
                created_at TEXT NOT NULL
            );"#,
            r#"CREATE INDEX IF NOT EXISTS images_query_term ON images (query_term);"#,
        ];

        for stmt in stmts {
            sqlx::query(stmt).execute(pool).await?;
        }

        Ok(())
    }
}
