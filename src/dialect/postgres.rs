use super::{CurrentConnectOptions, Db, Dialect};
use crate::config::DatabaseTarget;
use std::str::FromStr;

/// Postgres dialect implementation of the `Dialect` trait.
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    const NETWORKED: bool = true;

    fn placeholder(idx: usize) -> String {
        format!("${idx}")
    }

    fn connect_options(target: &DatabaseTarget) -> Result<CurrentConnectOptions, sqlx::Error> {
        match target {
            DatabaseTarget::Url(url) => CurrentConnectOptions::from_str(url),
            DatabaseTarget::Params(params) => {
                // Without server parameters libpq's PGHOST/PGUSER/... defaults apply.
                let options = match &params.server {
                    Some(server) => CurrentConnectOptions::new()
                        .host(&server.host)
                        .port(server.port)
                        .username(&server.user)
                        .password(&server.password),
                    None => CurrentConnectOptions::new(),
                };

                Ok(options.database(&params.name))
            }
        }
    }

    async fn migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error> {
        let stmts = vec![
            r#"CREATE TABLE IF NOT EXISTS images (
                id BIGSERIAL PRIMARY KEY,
                query_term TEXT NOT NULL,
                title TEXT NOT NULL,
                source_url TEXT NOT NULL,
                data BYTEA NOT NULL,
                mime_type TEXT,
                width BIGINT,
                height BIGINT,
                created_at TIMESTAMPTZ NOT NULL
            );"#,
            r#"CREATE INDEX IF NOT EXISTS images_query_term ON images (query_term);"#,
        ];

        for stmt in stmts {
            sqlx::query(stmt).execute(pool).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PostgresDialect;
    use crate::dialect::Dialect;

    #[test]
    fn test_placeholders_are_numbered() {
        assert_eq!("$1, $2, $3", PostgresDialect::placeholders(3));
        assert_eq!(
            "SELECT id, query_term, title, source_url, data, mime_type, width, height, created_at FROM images WHERE query_term = $1 ORDER BY id",
            PostgresDialect::query_images_by_term_statement()
        );
    }
}
