//! GraphQL API for the Vigil issue tracker.
//!
//! Provides the query schema, the pre-execution admission guard, and the
//! HTTP server.
//!
//! # Request lifecycle
//!
//! 1. The HTTP layer extracts the (possibly batched) request.
//! 2. [`guard::admit`] checks batch size and selection depth against the
//!    process-wide [`ComplexityLimits`]; a violation short-circuits with
//!    zero storage cost.
//! 3. Admitted requests execute against the schema; resolvers ask
//!    storage for an ordered row window plus a total count and assemble
//!    the connection response from it.
//!
//! # Building a schema
//!
//! ```ignore
//! use vigil_graphql::{build_schema, ComplexityLimits, ServerConfig, serve};
//!
//! let schema = build_schema(repositories);
//! serve(schema, ComplexityLimits::default(), ServerConfig::default()).await?;
//! ```

mod guard;
mod schema;
mod server;
mod types;

pub use guard::{admit, execute_guarded, AdmissionError, ComplexityLimits};
pub use schema::{build_schema, CoreQuery};
pub use server::{serve, serve_with_shutdown, ServerConfig};
pub use types::{OrderByInput, OrderDirection, VigilSchema};
