//! # Harvest Module
//!
//! Composes the three stages of a batch: the search client produces
//! descriptors, the fetcher downloads each one, and the database stores every
//! complete record.
//!
//! ## Provided Structures
//!
//! - **Harvester**: the search client, fetcher and database a batch runs against.
//! - **HarvestCommand**: one query term plus its result bound; `execute` runs the
//!   batch and returns a **BatchReport**.
//!
//! ## Error Handling
//!
//! Per-record failures (fetch, incomplete record, storage) never leave
//! `execute`: they are logged, collected in the report as [`SkipReason`]s, and
//! the next descriptor is processed. Search failures are returned as
//! [`AppError`]; [`AppError::is_fatal`] tells a recoverable service error
//! apart from rejected credentials.

use crate::{
    config::ConfigError,
    database::{Database, DatabaseError},
    fetch::{FetchError, Fetcher},
    record::{ImageRecord, RecordError},
    search::{Descriptor, SearchClient, SearchError},
};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result bound used when a command does not set one.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Everything a batch needs, built once per process.
#[derive(Debug, Clone)]
pub struct Harvester {
    pub search: SearchClient,
    pub fetcher: Fetcher,
    pub database: Database,
}

/// Represents a command for harvesting the images found for one search term.
pub struct HarvestCommand {
    /// The search term, stored with every record of the batch.
    pub query_term: String,
    /// Upper bound on the number of descriptors requested.
    pub max_results: usize,
}

impl HarvestCommand {
    pub fn new(query_term: &str) -> Self {
        HarvestCommand {
            query_term: query_term.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Runs the batch: search once, then fetch and store each descriptor in order.
    ///
    /// A record is stored if and only if its fetch succeeded and it is complete.
    /// Each stored record is an independent insert.
    ///
    /// # Returns
    ///
    /// The `BatchReport` of the batch, or an `AppError` when the search failed.
    pub async fn execute(self, harvester: &Harvester) -> Result<BatchReport, AppError> {
        let started = Instant::now();

        let descriptors = harvester
            .search
            .search(&self.query_term, self.max_results)
            .await?;
        info!(query = %self.query_term, found = descriptors.len(), "search completed");

        let mut report = BatchReport {
            query_term: self.query_term.clone(),
            found: descriptors.len(),
            stored: vec![],
            failures: vec![],
            elapsed: Duration::ZERO,
        };

        for (index, descriptor) in descriptors.iter().enumerate() {
            match harvest_one(harvester, &self.query_term, descriptor).await {
                Ok(id) => {
                    info!(id, url = %descriptor.source_url, "stored image");
                    report.stored.push(id);
                }
                Err(reason) => {
                    warn!(url = %descriptor.source_url, error = %reason, "skipping image");
                    report.failures.push(Failure {
                        position: index + 1,
                        source_url: descriptor.source_url.clone(),
                        reason,
                    });
                }
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }
}

async fn harvest_one(
    harvester: &Harvester,
    query_term: &str,
    descriptor: &Descriptor,
) -> Result<i64, SkipReason> {
    let bytes = harvester.fetcher.fetch(&descriptor.source_url).await?;
    let record = ImageRecord::new(descriptor, query_term, bytes)?;

    Ok(harvester.database.insert_image(&record).await?)
}

/// Outcome of one batch.
#[derive(Debug)]
pub struct BatchReport {
    pub query_term: String,
    /// Number of descriptors the search returned.
    pub found: usize,
    /// Row ids of the stored records, in descriptor order.
    pub stored: Vec<i64>,
    pub failures: Vec<Failure>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn fetch_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f.reason, SkipReason::Fetch(_)))
            .count()
    }

    pub fn storage_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f.reason, SkipReason::Storage(_)))
            .count()
    }
}

/// A descriptor that did not make it into the database.
#[derive(Debug)]
pub struct Failure {
    /// 1-based position of the descriptor in the batch.
    pub position: usize,
    pub source_url: String,
    pub reason: SkipReason,
}

/// Why a descriptor was skipped.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Incomplete(#[from] RecordError),

    #[error("storage failed: {0}")]
    Storage(#[from] DatabaseError),
}

/// Error types within the application, wrapping the error of each stage.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("fetcher error: {0}")]
    Fetch(#[from] FetchError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("console error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether the session must end. Only a failed search that was not an
    /// authentication problem is recoverable.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Search(e) => e.is_auth(),
            _ => true,
        }
    }
}
