//! Core domain layer for the Vigil issue tracker.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! the pagination/ordering/aggregation logic shared by every queryable
//! entity type. It follows hexagonal architecture principles - this is
//! the innermost layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      vigil (binary)                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                vigil-graphql (API + admission)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    vigil-storage                            │
//! │                     (PostgreSQL)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     vigil-core  ← YOU ARE HERE              │
//! │          (models, ports, severity aggregation)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Issue, Service, ComponentInstance, etc.)
//! - [`severity`] - Severity ratings and [`severity::SeverityCounts`] rollups
//! - [`ports`] - Interface traits and the pagination/ordering core
//! - [`error`] - Domain error types
//! - [`metrics`] - Metrics definitions
//!
//! # Key Concepts
//!
//! ## Connections
//!
//! Every list query returns a [`ports::Connection`]: the exact total row
//! count, a cursor-addressed window of edges, and a [`ports::PageInfo`]
//! with jump-to-page descriptors. Storage adapters only ever produce an
//! ordered row window plus a total; everything else is computed here.
//!
//! ## Ordering
//!
//! Clients pick an ordered list of sort dimensions per entity. The
//! [`ports::RowComparator`] applies them left to right with locale-aware
//! collation for text and fixed rank tables for enums, then always falls
//! through to the primary key so that repeated pagination of an unchanged
//! data set never reorders rows between requests.
//!
//! ## Severity rollups
//!
//! Parent entities (services, component versions) carry a
//! [`severity::SeverityCounts`] rollup where each distinct issue
//! contributes once through its highest-rated variant. The rollup's
//! bucket-lexicographic order ranks parents "worst first".

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod severity;
