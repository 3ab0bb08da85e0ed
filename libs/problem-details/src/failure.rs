//! Failure model used to decide interception and build diagnostics
//!
//! A failure carries a [`FailureKind`], a static node in an is-a hierarchy.
//! Matching a kind against an allow-list walks the parent chain, so allowing
//! `RUNTIME` also admits `NOT_FOUND`.

use std::error::Error as StdError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;

use tracing_error::SpanTrace;

/// Named node in the failure kind hierarchy.
///
/// A kind is identified by its address, not its name: declare kinds as
/// `static` items and pass them around as `&'static FailureKind`. Two
/// separately declared kinds never compare equal, even with the same name
/// and parent.
#[derive(Debug)]
pub struct FailureKind {
    name: &'static str,
    parent: Option<&'static FailureKind>,
}

mod builtin {
    use super::FailureKind;

    pub(super) static EXCEPTION: FailureKind = FailureKind::new("Exception", None);
    pub(super) static LOGIC: FailureKind = FailureKind::new("LogicException", Some(&EXCEPTION));
    pub(super) static RUNTIME: FailureKind =
        FailureKind::new("RuntimeException", Some(&EXCEPTION));
    pub(super) static INVALID_ARGUMENT: FailureKind =
        FailureKind::new("InvalidArgumentException", Some(&LOGIC));
    pub(super) static NOT_FOUND: FailureKind =
        FailureKind::new("NotFoundException", Some(&RUNTIME));
    pub(super) static UNAUTHENTICATED: FailureKind =
        FailureKind::new("UnauthenticatedException", Some(&RUNTIME));
    pub(super) static FORBIDDEN: FailureKind =
        FailureKind::new("ForbiddenException", Some(&RUNTIME));
}

impl FailureKind {
    /// Root of the hierarchy; every kind is-a `EXCEPTION`.
    pub const EXCEPTION: &'static FailureKind = &builtin::EXCEPTION;
    /// Programming errors detectable before running.
    pub const LOGIC: &'static FailureKind = &builtin::LOGIC;
    /// Errors only detectable at run time.
    pub const RUNTIME: &'static FailureKind = &builtin::RUNTIME;
    pub const INVALID_ARGUMENT: &'static FailureKind = &builtin::INVALID_ARGUMENT;
    pub const NOT_FOUND: &'static FailureKind = &builtin::NOT_FOUND;
    pub const UNAUTHENTICATED: &'static FailureKind = &builtin::UNAUTHENTICATED;
    pub const FORBIDDEN: &'static FailureKind = &builtin::FORBIDDEN;

    /// Declare a kind. Application kinds usually derive from one of the built-ins:
    ///
    /// ```
    /// use problem_details::FailureKind;
    ///
    /// static PAYMENT_REQUIRED: FailureKind =
    ///     FailureKind::new("PaymentRequired", Some(FailureKind::RUNTIME));
    ///
    /// assert!(PAYMENT_REQUIRED.is_a(FailureKind::EXCEPTION));
    /// ```
    #[must_use]
    pub const fn new(name: &'static str, parent: Option<&'static FailureKind>) -> Self {
        Self { name, parent }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn parent(&self) -> Option<&'static FailureKind> {
        self.parent
    }

    /// `true` if `self` is `ancestor` or derives from it.
    #[must_use]
    pub fn is_a(&self, ancestor: &FailureKind) -> bool {
        self.ancestry().any(|kind| kind == ancestor)
    }

    /// `self` followed by every parent up to the root.
    pub fn ancestry(&self) -> impl Iterator<Item = &FailureKind> {
        std::iter::successors(Some(self), |kind| kind.parent)
    }
}

impl PartialEq for FailureKind {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for FailureKind {}

impl Hash for FailureKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A failure raised while handling a request.
///
/// Only [`kind`](Failure::kind) is required; the remaining methods feed the
/// debug diagnostics of `ErrorResponseFactory`.
pub trait Failure: StdError + Send + Sync + 'static {
    fn kind(&self) -> &'static FailureKind;

    /// Message used as the fallback `title`.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Application-defined numeric code.
    fn code(&self) -> i64 {
        0
    }

    /// Source location where the failure was raised, when known.
    fn location(&self) -> Option<&'static Location<'static>> {
        None
    }

    /// Span trace captured when the failure was raised, when known.
    fn span_trace(&self) -> Option<&SpanTrace> {
        None
    }
}

impl dyn Failure {
    /// Access the concrete failure type, e.g. from a translation rule.
    #[must_use]
    pub fn downcast_ref<T: Failure>(&self) -> Option<&T> {
        let err: &(dyn StdError + 'static) = self;
        err.downcast_ref::<T>()
    }

    #[must_use]
    pub fn is<T: Failure>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

/// General purpose failure capturing where it was raised.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct Fault {
    kind: &'static FailureKind,
    message: String,
    code: i64,
    location: &'static Location<'static>,
    span_trace: SpanTrace,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Fault {
    #[track_caller]
    #[must_use]
    pub fn new(kind: &'static FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: 0,
            location: Location::caller(),
            span_trace: SpanTrace::capture(),
            source: None,
        }
    }

    /// Shorthand for a fault of the root kind.
    #[track_caller]
    #[must_use]
    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(FailureKind::EXCEPTION, message)
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Failure for Fault {
    fn kind(&self) -> &'static FailureKind {
        self.kind
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn code(&self) -> i64 {
        self.code
    }

    fn location(&self) -> Option<&'static Location<'static>> {
        Some(self.location)
    }

    fn span_trace(&self) -> Option<&SpanTrace> {
        Some(&self.span_trace)
    }
}
