//! Admission-control tests through the execution path.

mod support;

use std::sync::Arc;

use async_graphql::{BatchRequest, BatchResponse, Request};

use vigil_graphql::{admit, build_schema, execute_guarded, ComplexityLimits, VigilSchema};

use support::seeded_store;

fn schema() -> VigilSchema {
    build_schema(Arc::new(seeded_store()))
}

fn limits(max_batch_size: usize, max_depth: usize) -> ComplexityLimits {
    ComplexityLimits {
        max_batch_size,
        max_depth,
    }
}

fn batch_of(queries: &[&str]) -> BatchRequest {
    BatchRequest::Batch(queries.iter().map(|q| Request::new(*q)).collect())
}

/// A query nested to exactly `depth` field levels.
fn nested_query(depth: usize) -> String {
    let mut selection = String::from("a");
    for _ in 1..depth {
        selection = format!("a {{ {selection} }}");
    }
    format!("{{ {selection} }}")
}

#[tokio::test]
async fn oversized_batch_is_refused_before_execution() {
    let queries = [
        "{ issues(first: 1) { totalCount } }",
        "{ services { totalCount } }",
        "{ componentVersions { totalCount } }",
    ];

    let response = execute_guarded(&schema(), batch_of(&queries), &limits(2, 15)).await;

    match response {
        BatchResponse::Single(response) => {
            assert_eq!(response.errors.len(), 1);
            assert!(response.errors[0]
                .message
                .contains("the limit for sending batches has been exceeded"));
        }
        BatchResponse::Batch(_) => panic!("oversized batch must not execute"),
    }
}

#[tokio::test]
async fn batch_at_the_limit_executes_every_operation() {
    let queries = [
        "{ issues(first: 1) { totalCount } }",
        "{ services { totalCount } }",
        "{ componentVersions { totalCount } }",
    ];

    let response = execute_guarded(&schema(), batch_of(&queries), &limits(3, 15)).await;

    match response {
        BatchResponse::Batch(responses) => {
            assert_eq!(responses.len(), 3);
            for response in &responses {
                assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
            }
        }
        BatchResponse::Single(_) => panic!("admitted batch should return per-request responses"),
    }
}

#[tokio::test]
async fn deep_operation_is_refused_before_execution() {
    let request = BatchRequest::Single(Request::new(nested_query(11)));
    let response = execute_guarded(&schema(), request, &limits(5, 10)).await;

    match response {
        BatchResponse::Single(response) => {
            assert_eq!(response.errors.len(), 1);
            assert!(response.errors[0]
                .message
                .contains("operation exceeds the depth limit"));
        }
        BatchResponse::Batch(_) => panic!("single request should yield a single response"),
    }
}

#[tokio::test]
async fn shallow_operation_passes_the_depth_check() {
    // Admission only; the executor still validates field names itself
    let request = BatchRequest::Single(Request::new(nested_query(8)));
    assert!(admit(&request, &limits(5, 10)).is_ok());

    // A real query within the limit executes end to end
    let request = BatchRequest::Single(Request::new(
        "{ issues(first: 1) { pageInfo { pages { pageNumber } } } }",
    ));
    let response = execute_guarded(&schema(), request, &limits(5, 10)).await;
    match response {
        BatchResponse::Single(response) => {
            assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
        }
        BatchResponse::Batch(_) => panic!("single request should yield a single response"),
    }
}

#[tokio::test]
async fn rejection_happens_for_the_whole_batch() {
    // Even the in-limit operations of an oversized batch must not run
    let queries = ["{ issues { totalCount } }"; 4];
    let response = execute_guarded(&schema(), batch_of(&queries), &limits(3, 15)).await;

    match response {
        BatchResponse::Single(response) => {
            assert!(!response.errors.is_empty());
        }
        BatchResponse::Batch(_) => panic!("oversized batch must not execute"),
    }
}
