//! Building problem responses, directly or by translating a failure
//!
//! Translation runs the registered rules in order and returns the first
//! response produced. When no rule matches, a `500` fallback titled with the
//! failure message is returned. Diagnostics are attached to the fallback only
//! in debug mode.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing_error::SpanTrace;

use crate::config::ProblemConfig;
use crate::error::ValidationError;
use crate::failure::Failure;
use crate::problem::{ErrorResponse, Extensions};

/// Maps a failure to a response, or declines with `None`.
pub trait TranslationRule: Send + Sync {
    fn translate(&self, failure: &dyn Failure) -> Option<ErrorResponse>;
}

impl<F> TranslationRule for F
where
    F: Fn(&dyn Failure) -> Option<ErrorResponse> + Send + Sync,
{
    fn translate(&self, failure: &dyn Failure) -> Option<ErrorResponse> {
        self(failure)
    }
}

/// Direct construction of problem responses.
pub trait CreateErrorResponse {
    /// # Errors
    /// Propagates the `ValidationError` of [`ErrorResponse::create`].
    fn create_error_response(
        &self,
        status: i64,
        title: Option<String>,
        detail: Option<String>,
        instance: Option<String>,
        type_url: Option<String>,
        extensions: Extensions,
    ) -> Result<ErrorResponse, ValidationError>;
}

/// Translation of arbitrary failures into problem responses.
pub trait TranslateFailure: Send + Sync {
    fn create_from_failure(&self, failure: &dyn Failure) -> ErrorResponse;
}

#[derive(Clone, Default)]
pub struct ErrorResponseFactory {
    rules: Vec<Arc<dyn TranslationRule>>,
    debug: bool,
}

impl ErrorResponseFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &ProblemConfig) -> Self {
        Self::new().with_debug(config.debug)
    }

    /// Register a rule after the ones already present.
    #[must_use]
    pub fn with_rule(mut self, rule: impl TranslationRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Diagnostic extensions for the fallback response; empty unless debug is on.
    fn diagnostics(&self, failure: &dyn Failure) -> Extensions {
        let mut extensions = Extensions::new();
        if !self.debug {
            return extensions;
        }

        let location = failure.location();
        extensions.insert(
            "exception",
            json!({
                "class": failure.kind().name(),
                "message": failure.message(),
                "code": failure.code(),
                "file": location.map(Location::file),
                "line": location.map(Location::line),
            }),
        );
        extensions.insert("exceptionTrace", span_frames(failure.span_trace()));
        extensions
    }
}

/// Innermost span first, as `SpanTrace` walks them.
fn span_frames(trace: Option<&SpanTrace>) -> Value {
    let mut frames = Vec::new();
    if let Some(trace) = trace {
        trace.with_spans(|metadata, fields| {
            frames.push(json!({
                "name": metadata.name(),
                "target": metadata.target(),
                "file": metadata.file(),
                "line": metadata.line(),
                "fields": fields,
            }));
            true
        });
    }
    Value::Array(frames)
}

impl CreateErrorResponse for ErrorResponseFactory {
    fn create_error_response(
        &self,
        status: i64,
        title: Option<String>,
        detail: Option<String>,
        instance: Option<String>,
        type_url: Option<String>,
        extensions: Extensions,
    ) -> Result<ErrorResponse, ValidationError> {
        ErrorResponse::create(status, title, detail, instance, type_url, extensions)
    }
}

impl TranslateFailure for ErrorResponseFactory {
    fn create_from_failure(&self, failure: &dyn Failure) -> ErrorResponse {
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(response) = rule.translate(failure) {
                tracing::debug!(
                    rule = index,
                    kind = %failure.kind(),
                    status = response.status().as_u16(),
                    "failure translated"
                );
                return response;
            }
        }

        tracing::warn!(
            kind = %failure.kind(),
            debug = self.debug,
            "no translation rule matched, using 500 fallback"
        );
        ErrorResponse::internal_error(failure.message(), self.diagnostics(failure))
    }
}

impl fmt::Debug for ErrorResponseFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorResponseFactory")
            .field("rules", &self.rules.len())
            .field("debug", &self.debug)
            .finish()
    }
}
