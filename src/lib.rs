//! # Image Search Harvester
//!
//! This crate searches a hosted image-search service (SerpApi's Google Images
//! engine), downloads the images it finds and stores them, together with the
//! metadata describing them, in a relational database.
//!
//! ## Pipeline
//!
//! - **Query Submitter** ([`search`]): a term and a result bound become an
//!   ordered batch of descriptors.
//! - **Image Fetcher** ([`fetch`]): one HTTP GET per descriptor.
//! - **Persistence Writer** ([`database`]): one insert per complete record.
//!
//! The stages run strictly one after the other. A failed fetch or insert skips
//! that image only; a failed search skips the query; rejected credentials end
//! the run.
//!
//! ## Usage
//!
//! ```no_run
//! use imgrab::prelude::*;
//!
//! async fn harvest(harvester: &Harvester) {
//!     match HarvestCommand::new("red apple")
//!         .with_max_results(20)
//!         .execute(harvester)
//!         .await
//!     {
//!         Ok(report) => println!("stored {} of {}", report.stored.len(), report.found),
//!         Err(error) => eprintln!("search failed: {}", error),
//!     }
//! }
//! ```
//!
//! SQLite is the default backend; build with `--no-default-features --features
//! postgres` for PostgreSQL.

pub mod app;
pub mod config;
pub mod console;
pub mod database;
mod dialect;
pub mod fetch;
pub mod record;
pub mod search;
pub mod session;

pub mod prelude {
    pub use crate::app::{AppError, BatchReport, HarvestCommand, Harvester};
    pub use crate::config::{DatabaseSettings, resolve_api_key};
    pub use crate::console::Console;
    pub use crate::database::Database;
    pub use crate::fetch::{DEFAULT_TIMEOUT, Fetcher};
    pub use crate::search::{DEFAULT_ENDPOINT, ImageVariant, SearchClient};
    pub use crate::session::{self, print_report};
}
