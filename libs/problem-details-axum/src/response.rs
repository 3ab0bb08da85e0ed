use axum::body::Body;
use axum::response::Response;
use http::{HeaderValue, StatusCode, header};
use problem_details::{APPLICATION_PROBLEM_JSON, ErrorResponse, SerializationError};

/// Creates the response object a problem payload is written into.
pub trait ResponseFactory: Send + Sync {
    fn create_response(&self, status: StatusCode) -> Response;
}

/// Empty-bodied axum response with the given status.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
    fn create_response(&self, status: StatusCode) -> Response {
        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = status;
        resp
    }
}

/// Serialize `problem` into a response obtained from `responses`.
///
/// The status line always equals the payload's `status` member.
///
/// # Errors
/// Returns `SerializationError` if the payload cannot be encoded; the
/// response factory is not consulted in that case.
pub fn problem_response<R>(
    problem: &ErrorResponse,
    responses: &R,
) -> Result<Response, SerializationError>
where
    R: ResponseFactory + ?Sized,
{
    let body = problem.to_json()?;

    let mut resp = responses.create_response(problem.status());
    *resp.status_mut() = problem.status();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
    );
    *resp.body_mut() = Body::from(body);
    Ok(resp)
}
