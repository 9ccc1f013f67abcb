use crate::{
    config::DatabaseTarget,
    dialect::{CurrentDialect, CurrentRow, Db, Dialect},
    record::ImageRecord,
};
use chrono::{DateTime, Utc};
pub use sqlx::Pool;
use sqlx::{FromRow, Row, pool::PoolOptions};
use thiserror::Error;

pub async fn run_migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error> {
    CurrentDialect::migration(pool).await
}

/// A persisted image row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub id: i64,
    pub query_term: String,
    pub title: String,
    pub source_url: String,
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, CurrentRow> for StoredImage {
    fn from_row(row: &CurrentRow) -> Result<Self, sqlx::Error> {
        let width: Option<i64> = row.try_get("width")?;
        let height: Option<i64> = row.try_get("height")?;

        Ok(StoredImage {
            id: row.try_get("id")?,
            query_term: row.try_get("query_term")?,
            title: row.try_get("title")?,
            source_url: row.try_get("source_url")?,
            data: row.try_get("data")?,
            mime_type: row.try_get("mime_type")?,
            width: width.and_then(|w| u32::try_from(w).ok()),
            height: height.and_then(|h| u32::try_from(h).ok()),
            created_at: row.try_get("created_at")?,
        })
    }
}

/// The persistence writer.
///
/// Wraps an SQLx pool capped at a single connection: the process opens it once,
/// reuses it for every insert, and closes it on the way out. SQL text comes
/// from the compiled-in `Dialect`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Db>,
}

impl Database {
    /// Opens the connection described by `target` and runs the migration.
    pub async fn connect(target: &DatabaseTarget) -> Result<Self, DatabaseError> {
        let options = CurrentDialect::connect_options(target)
            .map_err(|source| DatabaseError::ConnectFailed { source })?;

        let pool = PoolOptions::<Db>::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|source| DatabaseError::ConnectFailed { source })?;

        Self::with_migration(pool).await
    }

    pub async fn with_migration(pool: sqlx::Pool<Db>) -> Result<Self, DatabaseError> {
        run_migration(&pool)
            .await
            .map_err(|source| DatabaseError::MigrationFailed { source })?;

        Ok(Self { pool })
    }

    /// Inserts one image row and returns its id.
    ///
    /// `created_at` is stamped here. Every call is its own statement: there is
    /// no batching and no retry, so a failure leaves earlier rows in place.
    pub async fn insert_image(&self, record: &ImageRecord) -> Result<i64, DatabaseError> {
        let stmt = CurrentDialect::insert_image_statement();

        sqlx::query_scalar::<_, i64>(&stmt)
            .bind(record.query_term())
            .bind(record.title())
            .bind(record.source_url())
            .bind(record.binary_content().as_ref())
            .bind(record.mime_type())
            .bind(record.width().map(i64::from))
            .bind(record.height().map(i64::from))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed {
                operation: DbOperation::InsertImage {
                    source_url: record.source_url().to_string(),
                },
                sql: stmt.clone(),
                source: e,
            })
    }

    pub async fn count_images(&self) -> Result<u64, DatabaseError> {
        let stmt = CurrentDialect::count_images_statement();

        let count: i64 = sqlx::query_scalar(stmt)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed {
                operation: DbOperation::CountImages,
                sql: stmt.to_string(),
                source: e,
            })?;

        Ok(count as u64)
    }

    /// Returns every image stored for `query_term`, in insertion order.
    pub async fn find_by_query_term(
        &self,
        query_term: &str,
    ) -> Result<Vec<StoredImage>, DatabaseError> {
        let stmt = CurrentDialect::query_images_by_term_statement();

        sqlx::query_as::<_, StoredImage>(&stmt)
            .bind(query_term)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed {
                operation: DbOperation::QueryImagesByTerm {
                    query_term: query_term.to_string(),
                },
                sql: stmt.clone(),
                source: e,
            })
    }

    /// Closes the connection. Later operations fail with a `QueryFailed` error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Represents errors that can occur during database operations.
///
/// Each variant includes contextual information to assist with debugging and error handling.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to connect to the database")]
    ConnectFailed {
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to migrate the database schema")]
    MigrationFailed {
        #[source]
        source: sqlx::Error,
    },

    /// A general SQL query failure, with the operation and SQL that failed.
    #[error("Query failed during {operation:?}: sql={sql}")]
    QueryFailed {
        operation: DbOperation,
        sql: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Enum representing the kind of database operation being performed,
/// used for attaching context to [`DatabaseError::QueryFailed`].
#[derive(Debug)]
pub enum DbOperation {
    /// INSERT INTO images
    InsertImage { source_url: String },
    /// SELECT COUNT(*) FROM images
    CountImages,
    /// SELECT ... FROM images WHERE query_term = ...
    QueryImagesByTerm { query_term: String },
}
