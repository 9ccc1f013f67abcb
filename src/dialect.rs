//! # SQL Dialect Module
//!
//! This module defines the `Dialect` trait, which abstracts over the differences in
//! SQL syntax across the supported database systems (SQLite and PostgreSQL).
//!
//! The dialect is picked at compile time by feature flags. With the default `sqlite`
//! feature `CurrentDialect` is `sqlite::SqliteDialect`; building with
//! `--no-default-features --features postgres` selects `postgres::PostgresDialect`.
//!
//! ## Key Components
//! - **`Dialect` Trait**: placeholder syntax, the statements the persistence writer
//!   issues, connection options and the schema migration.
//! - **`CurrentDialect` Alias**: the dialect in use, so `database` never names a backend.

use crate::config::DatabaseTarget;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
mod postgres;

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable either the `sqlite` or the `postgres` feature");

/// The current SQL dialect used at compile time, determined by feature flags.
#[cfg(feature = "sqlite")]
pub type CurrentDialect = sqlite::SqliteDialect;

#[cfg(feature = "sqlite")]
pub type Db = sqlx::Sqlite;

#[cfg(feature = "sqlite")]
pub type CurrentRow = sqlx::sqlite::SqliteRow;

#[cfg(feature = "sqlite")]
pub type CurrentConnectOptions = sqlx::sqlite::SqliteConnectOptions;

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type CurrentDialect = postgres::PostgresDialect;

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type Db = sqlx::Postgres;

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type CurrentRow = sqlx::postgres::PgRow;

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type CurrentConnectOptions = sqlx::postgres::PgConnectOptions;

/// Columns of the `images` table in the order the statements below use them.
const IMAGE_COLUMNS: &str =
    "query_term, title, source_url, data, mime_type, width, height, created_at";

/// A trait for SQL dialects to support database-specific query generation.
///
/// Default methods are written in the common subset of SQL; a dialect only
/// overrides what its backend spells differently.
pub trait Dialect {
    /// Whether the backend is a server that needs host, port and credentials.
    /// File-backed dialects only need a database name.
    const NETWORKED: bool;

    /// Returns the SQL placeholder syntax for the given parameter index.
    ///
    /// - SQLite: `?`
    /// - PostgreSQL: `$1`, `$2`, ...
    ///
    /// # Parameters
    /// - `idx`: The 1-based parameter index (used in dialects that number placeholders).
    fn placeholder(idx: usize) -> String;

    /// Returns `count` comma separated placeholders, numbered from 1.
    fn placeholders(count: usize) -> String {
        (1..=count)
            .map(Self::placeholder)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns the statement inserting one image row and yielding its id.
    ///
    /// Binds, in order: query term, title, source URL, bytes, MIME type,
    /// width, height, creation timestamp.
    fn insert_image_statement() -> String {
        format!(
            "INSERT INTO images ({IMAGE_COLUMNS}) VALUES ({}) RETURNING id",
            Self::placeholders(8)
        )
    }

    /// Returns the statement counting all stored images.
    fn count_images_statement() -> &'static str {
        "SELECT COUNT(*) FROM images"
    }

    /// Returns the statement selecting every image stored for a query term, oldest first.
    fn query_images_by_term_statement() -> String {
        format!(
            "SELECT id, {IMAGE_COLUMNS} FROM images WHERE query_term = {} ORDER BY id",
            Self::placeholder(1)
        )
    }

    /// Builds the connection options for the given target.
    fn connect_options(target: &DatabaseTarget) -> Result<CurrentConnectOptions, sqlx::Error>;

    /// Creates the schema if it does not exist yet. Must be idempotent.
    async fn migration(pool: &sqlx::Pool<Db>) -> Result<(), sqlx::Error>;
}
