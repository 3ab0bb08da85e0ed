use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::Response;
use http::Request;
use problem_details::{Failure, FailureKind, SerializationError, TranslateFailure};
use thiserror::Error;
use tower::{Layer, Service};

use crate::response::{ResponseFactory, problem_response};

/// Error returned by [`InterceptionService`].
#[derive(Error, Debug)]
pub enum InterceptError<E> {
    /// The failure's kind is not on the allow-list; this is the original
    /// failure, untouched, for an outer handler to deal with.
    #[error(transparent)]
    Unhandled(E),

    /// The translated problem could not be encoded.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl<E> InterceptError<E> {
    /// The original failure, if this error is a pass-through.
    #[must_use]
    pub fn into_unhandled(self) -> Option<E> {
        match self {
            Self::Unhandled(failure) => Some(failure),
            Self::Serialization(_) => None,
        }
    }
}

/// Tower layer translating allow-listed failures into problem responses.
///
/// A failure is intercepted when its kind is-a member of the allow-list.
/// The list starts empty, which intercepts nothing.
pub struct InterceptionLayer<R, T> {
    responses: Arc<R>,
    translator: Arc<T>,
    allowed: Arc<[&'static FailureKind]>,
}

impl<R, T> InterceptionLayer<R, T>
where
    R: ResponseFactory,
    T: TranslateFailure,
{
    #[must_use]
    pub fn new(responses: R, translator: T) -> Self {
        Self {
            responses: Arc::new(responses),
            translator: Arc::new(translator),
            allowed: Arc::from([]),
        }
    }

    /// Append a kind to the allow-list.
    #[must_use]
    pub fn allow(mut self, kind: &'static FailureKind) -> Self {
        let mut allowed = self.allowed.to_vec();
        allowed.push(kind);
        self.allowed = allowed.into();
        self
    }

    #[must_use]
    pub fn allowed(&self) -> &[&'static FailureKind] {
        &self.allowed
    }
}

// Manual impls: cloning shares the Arcs, so `R`/`T` need not be `Clone`.
impl<R, T> Clone for InterceptionLayer<R, T> {
    fn clone(&self) -> Self {
        Self {
            responses: Arc::clone(&self.responses),
            translator: Arc::clone(&self.translator),
            allowed: Arc::clone(&self.allowed),
        }
    }
}

impl<S, R, T> Layer<S> for InterceptionLayer<R, T> {
    type Service = InterceptionService<S, R, T>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptionService {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service produced by [`InterceptionLayer`].
pub struct InterceptionService<S, R, T> {
    inner: S,
    layer: InterceptionLayer<R, T>,
}

impl<S: Clone, R, T> Clone for InterceptionService<S, R, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            layer: self.layer.clone(),
        }
    }
}

fn is_interceptable(allowed: &[&'static FailureKind], kind: &FailureKind) -> bool {
    allowed.iter().any(|entry| kind.is_a(entry))
}

impl<S, B, R, T> Service<Request<B>> for InterceptionService<S, R, T>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Failure,
    B: Send + 'static,
    R: ResponseFactory + 'static,
    T: TranslateFailure + 'static,
{
    type Response = Response;
    type Error = InterceptError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(InterceptError::Unhandled)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let path = req.uri().path().to_owned();
        let layer = self.layer.clone();

        // Call the instance that was poll_ready'd, leave a fresh clone for the next cycle.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let failure = match inner.call(req).await {
                Ok(resp) => return Ok(resp),
                Err(failure) => failure,
            };

            let kind = failure.kind();
            if !is_interceptable(&layer.allowed, kind) {
                tracing::trace!(
                    path = %path,
                    kind = %kind,
                    "failure not interceptable, propagating"
                );
                return Err(InterceptError::Unhandled(failure));
            }

            let problem = layer.translator.create_from_failure(&failure);
            tracing::debug!(
                path = %path,
                kind = %kind,
                status = problem.status().as_u16(),
                problem_type = problem.type_url(),
                "failure intercepted"
            );

            problem_response(&problem, layer.responses.as_ref()).map_err(|err| {
                tracing::error!(path = %path, error = %err, "failed to encode problem response");
                InterceptError::Serialization(err)
            })
        })
    }
}
