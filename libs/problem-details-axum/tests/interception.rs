#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end behaviour of `InterceptionLayer` around fallible tower services.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Router;
use problem_details::{
    APPLICATION_PROBLEM_JSON, ErrorResponse, ErrorResponseFactory, Failure, FailureKind, Fault,
};
use problem_details_axum::{
    DefaultResponseFactory, InterceptError, InterceptionLayer, ResponseFactory,
};
use serde_json::{Value, json};
use tower::{Layer, ServiceBuilder, ServiceExt, service_fn};

static CUSTOM: FailureKind = FailureKind::new("CustomException", Some(FailureKind::EXCEPTION));
static LOOKALIKE_ROOT: FailureKind = FailureKind::new("Exception", None);
static USER_NOT_FOUND: FailureKind =
    FailureKind::new("UserNotFound", Some(FailureKind::NOT_FOUND));

/// Application failure enum mapping each variant onto the kind hierarchy.
#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("user {0} not found")]
    UserNotFound(u64),
    #[error("not authenticated")]
    Unauthenticated,
}

impl Failure for AppError {
    fn kind(&self) -> &'static FailureKind {
        match self {
            Self::UserNotFound(_) => &USER_NOT_FOUND,
            Self::Unauthenticated => FailureKind::UNAUTHENTICATED,
        }
    }
}

#[derive(Clone, Default)]
struct CountingResponses {
    calls: Arc<AtomicUsize>,
}

impl ResponseFactory for CountingResponses {
    fn create_response(&self, status: StatusCode) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DefaultResponseFactory.create_response(status)
    }
}

fn request(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn allow_listed_failure_becomes_problem_response() {
    let svc = ServiceBuilder::new()
        .layer(
            InterceptionLayer::new(DefaultResponseFactory, ErrorResponseFactory::new())
                .allow(FailureKind::EXCEPTION),
        )
        .service(service_fn(|_req: Request<Body>| async {
            Err::<Response, _>(Fault::exception("Handled Exception"))
        }));

    let resp = svc.oneshot(request("/any")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        APPLICATION_PROBLEM_JSON
    );
    assert_eq!(
        body_string(resp).await,
        r#"{"type":"about:blank","status":500,"title":"Handled Exception","detail":null,"instance":null}"#
    );
}

#[tokio::test]
async fn failure_outside_allow_list_is_returned_unchanged() {
    let responses = CountingResponses::default();
    let svc = ServiceBuilder::new()
        .layer(
            InterceptionLayer::new(responses.clone(), ErrorResponseFactory::new())
                .allow(&CUSTOM),
        )
        .service(service_fn(|_req: Request<Body>| async {
            Err::<Response, _>(Fault::exception("Unhandled Exception"))
        }));

    let err = svc.oneshot(request("/any")).await.unwrap_err();

    let failure = err.into_unhandled().expect("failure must pass through");
    assert_eq!(failure.message(), "Unhandled Exception");
    assert_eq!(failure.kind(), FailureKind::EXCEPTION);
    assert_eq!(responses.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn same_named_kind_does_not_stand_in_for_the_root() {
    let responses = CountingResponses::default();
    let svc = InterceptionLayer::new(responses.clone(), ErrorResponseFactory::new())
        .allow(&LOOKALIKE_ROOT)
        .layer(service_fn(|_req: Request<Body>| async {
            Err::<Response, _>(Fault::exception("not for you"))
        }));

    let err = svc.oneshot(request("/any")).await.unwrap_err();

    let failure = err.into_unhandled().expect("failure must pass through");
    assert_eq!(failure.kind(), FailureKind::EXCEPTION);
    assert_eq!(responses.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_allow_list_never_intercepts() {
    let svc = InterceptionLayer::new(DefaultResponseFactory, ErrorResponseFactory::new()).layer(
        service_fn(|_req: Request<Body>| async { Err::<Response, _>(AppError::UserNotFound(1)) }),
    );

    let err = svc.oneshot(request("/users/1")).await.unwrap_err();
    assert!(matches!(err, InterceptError::Unhandled(AppError::UserNotFound(1))));
}

#[tokio::test]
async fn successful_response_passes_through() {
    let responses = CountingResponses::default();
    let svc = InterceptionLayer::new(responses.clone(), ErrorResponseFactory::new())
        .allow(FailureKind::EXCEPTION)
        .layer(service_fn(|_req: Request<Body>| async {
            Ok::<_, Fault>((StatusCode::CREATED, "created").into_response())
        }));

    let resp = svc.oneshot(request("/items")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_string(resp).await, "created");
    assert_eq!(responses.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn derived_kinds_are_intercepted_through_translation_rules() {
    let factory = ErrorResponseFactory::new().with_rule(|failure: &dyn Failure| {
        failure.kind().is_a(FailureKind::NOT_FOUND).then(|| {
            ErrorResponse::builder(404)
                .title("Not Found")
                .detail(failure.message())
                .type_url("https://example.com/not-found")
                .build()
                .unwrap()
        })
    });
    let svc = InterceptionLayer::new(DefaultResponseFactory, factory)
        .allow(FailureKind::RUNTIME)
        .layer(service_fn(|_req: Request<Body>| async {
            Err::<Response, _>(AppError::UserNotFound(7))
        }));

    let resp = svc.oneshot(request("/users/7")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(
        body,
        json!({
            "type": "https://example.com/not-found",
            "status": 404,
            "title": "Not Found",
            "detail": "user 7 not found",
            "instance": null,
        })
    );
}

#[tokio::test]
async fn debug_mode_exposes_exception_details() {
    let svc = InterceptionLayer::new(
        DefaultResponseFactory,
        ErrorResponseFactory::new().with_debug(true),
    )
    .allow(FailureKind::EXCEPTION)
    .layer(service_fn(|_req: Request<Body>| async {
        Err::<Response, _>(Fault::new(FailureKind::INVALID_ARGUMENT, "boom").with_code(3))
    }));

    let resp = svc.oneshot(request("/debug")).await.unwrap();
    let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();

    assert_eq!(body["title"], "boom");
    assert_eq!(body["exception"]["class"], "InvalidArgumentException");
    assert_eq!(body["exception"]["message"], "boom");
    assert_eq!(body["exception"]["code"], 3);
    assert!(body["exceptionTrace"].is_array());
}

#[tokio::test]
async fn unhandled_failures_reach_an_outer_axum_handler() {
    let factory = ErrorResponseFactory::new();
    let svc = ServiceBuilder::new()
        .layer(HandleErrorLayer::<_, ()>::new(|err: InterceptError<AppError>| async move {
            match err {
                InterceptError::Unhandled(AppError::Unauthenticated) => {
                    (StatusCode::UNAUTHORIZED, "login required").into_response()
                }
                other => (StatusCode::BAD_GATEWAY, other.to_string()).into_response(),
            }
        }))
        .layer(
            InterceptionLayer::new(DefaultResponseFactory, factory)
                .allow(FailureKind::NOT_FOUND),
        )
        .service(service_fn(|req: Request<Body>| async move {
            if req.uri().path() == "/private" {
                Err::<Response, _>(AppError::Unauthenticated)
            } else {
                Err(AppError::UserNotFound(42))
            }
        }));
    let app = Router::new()
        .route_service("/private", svc.clone())
        .route_service("/users/42", svc);

    let resp = app.clone().oneshot(request("/private")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(resp).await, "login required");

    let resp = app.oneshot(request("/users/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        APPLICATION_PROBLEM_JSON
    );
    let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(body["title"], "user 42 not found");
}

#[tokio::test]
async fn error_response_is_an_axum_response() {
    let problem = ErrorResponse::builder(409)
        .title("Conflict")
        .extension("resource", "order")
        .build()
        .unwrap();

    let resp = problem.into_response();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        APPLICATION_PROBLEM_JSON
    );
    assert_eq!(
        body_string(resp).await,
        r#"{"type":"about:blank","status":409,"title":"Conflict","detail":null,"instance":null,"resource":"order"}"#
    );
}

#[tokio::test]
async fn into_response_body_matches_to_json() {
    let problem = ErrorResponse::builder(422)
        .title("Invalid order")
        .detail("quantity must be positive")
        .instance("/orders/1")
        .type_url("https://example.com/validation-error")
        .extension("violations", json!([{ "pointer": "#/quantity" }]))
        .extension("retryable", false)
        .build()
        .unwrap();
    let expected = problem.to_json().unwrap();

    let resp = problem.into_response();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], &expected[..]);
}
