//! RFC 9457 Problem Details for HTTP APIs
//!
//! This crate is framework-free. It provides:
//! - the validated, immutable error payload (`ErrorResponse`)
//! - a failure model with an is-a kind hierarchy (`Failure`, `FailureKind`, `Fault`)
//! - a factory translating failures into payloads (`ErrorResponseFactory`)
//! - an aggregator folding same-type payloads into one (`MultiErrorAggregator`)
//!
//! The HTTP interception layer lives in `cf-problem-details-axum`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod factory;
pub mod failure;
pub mod problem;

pub use aggregate::{ERRORS_MEMBER, MultiErrorAggregator};
pub use config::ProblemConfig;
pub use error::{AggregateError, ConfigError, SerializationError, ValidationError};
pub use factory::{CreateErrorResponse, ErrorResponseFactory, TranslateFailure, TranslationRule};
pub use failure::{Failure, FailureKind, Fault};
pub use problem::{
    ABOUT_BLANK, APPLICATION_PROBLEM_JSON, ErrorResponse, ErrorResponseBuilder, Extensions,
    RESERVED_MEMBERS,
};
