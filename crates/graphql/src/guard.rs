//! Pre-execution request admission control.
//!
//! Every incoming request passes through two checks before any resolver
//! or storage work happens:
//!
//! - **batch check**: the number of top-level operations across the
//!   (possibly batched) request document must not exceed the configured
//!   batch limit; a violation refuses the entire batch.
//! - **depth check**: each operation's selection-set nesting (root
//!   fields at depth 1, every nested field selection one deeper) must
//!   not exceed the configured depth limit.
//!
//! Each additional nesting level can multiply the number of downstream
//! row fetches, so rejection has to be decided from the parsed document
//! alone - synchronously, cheaply, with zero database cost. This is the
//! service's sole backpressure mechanism.
//!
//! The rejection message strings are part of the contract observed by
//! clients; tooling matches on them as substrings.

use std::collections::HashSet;

use async_graphql::parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, Selection, SelectionSet,
};
use async_graphql::parser::parse_query;
use async_graphql::{
    BatchRequest, BatchResponse, Name, ObjectType, Positioned, Response, Schema, ServerError,
    SubscriptionType,
};
use thiserror::Error;

// =============================================================================
// Limits
// =============================================================================

/// Process-wide admission limits, set once at startup and read-only
/// thereafter.
#[derive(Debug, Clone, Copy)]
pub struct ComplexityLimits {
    /// Maximum number of top-level operations per request document.
    pub max_batch_size: usize,
    /// Maximum selection-set nesting depth per operation.
    pub max_depth: usize,
}

impl Default for ComplexityLimits {
    fn default() -> Self {
        Self {
            max_batch_size: 5,
            // Introspection queries nest to ~13, so the default leaves
            // room for them.
            max_depth: 15,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Admission rejection, surfaced before any storage access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// Too many top-level operations in the request document.
    #[error("the limit for sending batches has been exceeded")]
    BatchLimitExceeded,

    /// An operation's selection set nests too deeply.
    #[error("operation exceeds the depth limit")]
    DepthLimitExceeded,
}

impl AdmissionError {
    /// Metric label for the rejection reason.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::BatchLimitExceeded => "batch_limit",
            AdmissionError::DepthLimitExceeded => "depth_limit",
        }
    }
}

// =============================================================================
// Admission
// =============================================================================

/// Decide whether a request may execute.
///
/// Pure document inspection; never touches storage. Documents that fail
/// to parse count as one operation and are admitted so the executor
/// reports the syntax error itself.
pub fn admit(batch: &BatchRequest, limits: &ComplexityLimits) -> Result<(), AdmissionError> {
    let documents: Vec<Option<ExecutableDocument>> = batch
        .iter()
        .map(|request| parse_query(&request.query).ok())
        .collect();

    // Batch first: a violation refuses every operation in the batch.
    let operations: usize = documents
        .iter()
        .map(|doc| doc.as_ref().map(operation_count).unwrap_or(1))
        .sum();
    if operations > limits.max_batch_size {
        return Err(AdmissionError::BatchLimitExceeded);
    }

    for document in documents.iter().flatten() {
        for operation in operations_of(document) {
            let mut visiting = HashSet::new();
            let depth = selection_depth(document, &operation.node.selection_set.node, &mut visiting);
            if depth > limits.max_depth {
                return Err(AdmissionError::DepthLimitExceeded);
            }
        }
    }

    Ok(())
}

/// Run the admission checks, then execute; a rejected request
/// short-circuits into an error response.
pub async fn execute_guarded<Q, M, S>(
    schema: &Schema<Q, M, S>,
    batch: BatchRequest,
    limits: &ComplexityLimits,
) -> BatchResponse
where
    Q: ObjectType + 'static,
    M: ObjectType + 'static,
    S: SubscriptionType + 'static,
{
    vigil_core::metrics::record_request();

    match admit(&batch, limits) {
        Ok(()) => schema.execute_batch(batch).await,
        Err(err) => {
            vigil_core::metrics::record_request_rejected(err.reason());
            BatchResponse::Single(Response::from_errors(vec![ServerError::new(
                err.to_string(),
                None,
            )]))
        }
    }
}

// =============================================================================
// Document inspection
// =============================================================================

/// Number of top-level operations in a document.
fn operation_count(document: &ExecutableDocument) -> usize {
    match &document.operations {
        DocumentOperations::Single(_) => 1,
        DocumentOperations::Multiple(operations) => operations.len(),
    }
}

/// Iterate a document's operations regardless of form.
fn operations_of(
    document: &ExecutableDocument,
) -> Box<dyn Iterator<Item = &Positioned<OperationDefinition>> + '_> {
    match &document.operations {
        DocumentOperations::Single(operation) => Box::new(std::iter::once(operation)),
        DocumentOperations::Multiple(operations) => Box::new(operations.values()),
    }
}

/// Maximum nesting depth of a selection set: a leaf field is depth 1,
/// every nested field selection adds one.
///
/// Fragment spreads resolve through the document without adding depth of
/// their own; `visiting` breaks spread cycles (the executor rejects such
/// documents later, they must not hang admission).
fn selection_depth<'a>(
    document: &'a ExecutableDocument,
    selection_set: &'a SelectionSet,
    visiting: &mut HashSet<&'a Name>,
) -> usize {
    selection_set
        .items
        .iter()
        .map(|selection| match &selection.node {
            Selection::Field(field) => {
                1 + selection_depth(document, &field.node.selection_set.node, visiting)
            }
            Selection::InlineFragment(fragment) => {
                selection_depth(document, &fragment.node.selection_set.node, visiting)
            }
            Selection::FragmentSpread(spread) => {
                let name = &spread.node.fragment_name.node;
                match document.fragments.get(name) {
                    Some(fragment) if visiting.insert(name) => {
                        let depth =
                            selection_depth(document, &fragment.node.selection_set.node, visiting);
                        visiting.remove(name);
                        depth
                    }
                    _ => 0,
                }
            }
        })
        .max()
        .unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_batch_size: usize, max_depth: usize) -> ComplexityLimits {
        ComplexityLimits {
            max_batch_size,
            max_depth,
        }
    }

    /// Build a query nested to exactly `depth` field levels.
    fn nested_query(depth: usize) -> String {
        let mut selection = String::from("a");
        for _ in 1..depth {
            selection = format!("a {{ {selection} }}");
        }
        format!("{{ {selection} }}")
    }

    fn single(query: &str) -> BatchRequest {
        BatchRequest::Single(async_graphql::Request::new(query))
    }

    fn batch_of(queries: &[&str]) -> BatchRequest {
        BatchRequest::Batch(
            queries
                .iter()
                .map(|q| async_graphql::Request::new(*q))
                .collect(),
        )
    }

    #[test]
    fn nested_query_builder_produces_expected_depth() {
        assert_eq!(nested_query(1), "{ a }");
        assert_eq!(nested_query(2), "{ a { a } }");
        assert_eq!(nested_query(3), "{ a { a { a } } }");
    }

    #[test]
    fn batch_within_limit_is_admitted() {
        let batch = batch_of(&["{ a }", "{ b }", "{ c }"]);
        assert!(admit(&batch, &limits(3, 10)).is_ok());
    }

    #[test]
    fn batch_over_limit_is_rejected() {
        let batch = batch_of(&["{ a }", "{ b }", "{ c }"]);
        let err = admit(&batch, &limits(2, 10)).unwrap_err();
        assert_eq!(err, AdmissionError::BatchLimitExceeded);
        assert!(err
            .to_string()
            .contains("the limit for sending batches has been exceeded"));
    }

    #[test]
    fn multiple_operations_in_one_document_count_toward_batch() {
        let batch = single("query A { a } query B { b } query C { c }");
        assert!(admit(&batch, &limits(2, 10)).is_err());
        assert!(admit(&batch, &limits(3, 10)).is_ok());
    }

    #[test]
    fn depth_within_limit_is_admitted() {
        assert!(admit(&single(&nested_query(8)), &limits(5, 10)).is_ok());
        assert!(admit(&single(&nested_query(10)), &limits(5, 10)).is_ok());
    }

    #[test]
    fn depth_over_limit_is_rejected() {
        let err = admit(&single(&nested_query(11)), &limits(5, 10)).unwrap_err();
        assert_eq!(err, AdmissionError::DepthLimitExceeded);
        assert!(err.to_string().contains("operation exceeds the depth limit"));
    }

    #[test]
    fn sibling_fields_do_not_add_depth() {
        let query = "{ a b c d { e f } }";
        assert!(admit(&single(query), &limits(5, 2)).is_ok());
        assert!(admit(&single(query), &limits(5, 1)).is_err());
    }

    #[test]
    fn fragment_spread_depth_is_counted() {
        let query = r#"
            { a { ...deep } }
            fragment deep on T { b { c { d } } }
        "#;
        // a=1, b=2, c=3, d=4 through the spread
        assert!(admit(&single(query), &limits(5, 4)).is_ok());
        assert!(admit(&single(query), &limits(5, 3)).is_err());
    }

    #[test]
    fn inline_fragment_does_not_add_depth() {
        let query = "{ a { ... on T { b } } }";
        assert!(admit(&single(query), &limits(5, 2)).is_ok());
    }

    #[test]
    fn cyclic_fragments_do_not_hang_admission() {
        let query = r#"
            { a { ...one } }
            fragment one on T { b { ...two } }
            fragment two on T { c { ...one } }
        "#;
        // The cycle is cut after one unrolling; the executor rejects the
        // document itself.
        assert!(admit(&single(query), &limits(5, 10)).is_ok());
    }

    #[test]
    fn unparsable_document_is_left_to_the_executor() {
        assert!(admit(&single("{ a "), &limits(5, 10)).is_ok());
        // But it still counts against the batch size
        let batch = batch_of(&["{ a ", "{ b }", "{ c }"]);
        assert!(admit(&batch, &limits(2, 10)).is_err());
    }
}
