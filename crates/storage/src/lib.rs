//! Storage layer for the Vigil issue tracker.
//!
//! This crate provides PostgreSQL implementations of the repository traits
//! defined in `vigil-core`. It handles all database interactions including
//! connection pooling, migrations, and list/aggregate queries.
//!
//! # Architecture
//!
//! The storage layer follows the repository pattern:
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::PgRepositories`] - Composite repository for all entity types
//! - Individual repositories for issues, services, component instances and
//!   component versions
//!
//! Every list query produces exactly what the pagination core consumes:
//! the ordered row window for `[offset, offset + limit)` plus the total
//! number of matching rows.
//!
//! # Usage
//!
//! ```ignore
//! use vigil_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Create repositories
//! let repositories = Arc::new(PgRepositories::new(Arc::new(db)));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, PgRepositories};
