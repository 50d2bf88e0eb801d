//! Port traits and supporting types for the domain layer.
//!
//! Ports define the seams between the pagination/ordering core and its
//! collaborators: storage adapters implement the repository traits, the
//! API layer consumes connections and order specifications.

pub mod ordering;
pub mod pagination;
pub mod repository;

pub use ordering::{
    ComponentInstanceOrderField, ComponentVersionOrderField, IssueOrderField, OrderBy,
    OrderDirection, OrderValue, Orderable, RowComparator, ServiceOrderField,
};
pub use pagination::{decode_after, Connection, Cursor, Edge, Page, PageInfo, MAX_PAGE_LINKS};
pub use repository::{
    ComponentInstanceFilter, ComponentInstanceRepository, ComponentVersionFilter,
    ComponentVersionRepository, IssueFilter, IssueRepository, IssueTypeCounts, Repositories,
    RowWindow, ServiceFilter, ServiceRepository, Window,
};
