#![allow(clippy::unwrap_used, clippy::expect_used)]

//! One problem per field violation, folded into a single response.

use problem_details::{
    AggregateError, CreateErrorResponse, ErrorResponse, ErrorResponseFactory, Extensions,
    MultiErrorAggregator,
};
use serde_json::{Value, json};

const VALIDATION: &str = "https://example.net/validation-error";

fn violation(factory: &ErrorResponseFactory, detail: &str, pointer: &str) -> ErrorResponse {
    let extensions: Extensions = [("pointer", pointer)].into_iter().collect();
    factory
        .create_error_response(
            422,
            Some("Your request is not valid.".to_owned()),
            Some(detail.to_owned()),
            None,
            Some(VALIDATION.to_owned()),
            extensions,
        )
        .unwrap()
}

#[test]
fn field_violations_become_one_payload() {
    let factory = ErrorResponseFactory::new();
    let mut batch = MultiErrorAggregator::new();
    batch
        .add(violation(&factory, "must be a positive integer", "#/age"))
        .unwrap();
    batch
        .add(violation(&factory, "must be 'green', 'red' or 'blue'", "#/profile/color"))
        .unwrap();

    let combined = batch.build().unwrap();
    let payload: Value = serde_json::from_slice(&combined.to_json().unwrap()).unwrap();

    assert_eq!(
        payload,
        json!({
            "type": VALIDATION,
            "status": 422,
            "title": "Your request is not valid.",
            "detail": null,
            "instance": null,
            "errors": [
                { "detail": "must be a positive integer", "instance": null, "pointer": "#/age" },
                { "detail": "must be 'green', 'red' or 'blue'", "instance": null, "pointer": "#/profile/color" },
            ],
        })
    );
}

#[test]
fn mismatched_batch_can_be_split_by_the_caller() {
    let factory = ErrorResponseFactory::new();
    let mut validation = MultiErrorAggregator::new();
    validation.add(violation(&factory, "too short", "#/name")).unwrap();

    let conflict = ErrorResponse::builder(409)
        .type_url("https://example.net/conflict")
        .detail("name already taken")
        .build()
        .unwrap();

    match validation.add(conflict.clone()) {
        Err(AggregateError::TypeMismatch { expected, .. }) => assert_eq!(expected, VALIDATION),
        other => panic!("expected type mismatch, got {other:?}"),
    }

    let mut conflicts = MultiErrorAggregator::new();
    conflicts.add(conflict).unwrap();

    assert_eq!(validation.build().unwrap().status().as_u16(), 422);
    assert_eq!(conflicts.build().unwrap().status().as_u16(), 409);
}

#[test]
fn combined_payload_round_trips_through_json() {
    let factory = ErrorResponseFactory::new();
    let mut batch = MultiErrorAggregator::new();
    batch.add(violation(&factory, "required", "#/email")).unwrap();
    let combined = batch.build().unwrap();

    let parsed: ErrorResponse = serde_json::from_slice(&combined.to_json().unwrap()).unwrap();

    assert_eq!(parsed, combined);
    assert!(parsed.is_same_type(&combined));
}
