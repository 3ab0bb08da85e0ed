//! Request interception for RFC 9457 Problem Details
//!
//! [`InterceptionLayer`] wraps a fallible tower service. Failures whose kind
//! is on the layer's allow-list are translated into `application/problem+json`
//! responses; every other failure is returned to the caller untouched.

mod layer;
mod response;

pub use layer::{InterceptError, InterceptionLayer, InterceptionService};
pub use response::{DefaultResponseFactory, ResponseFactory, problem_response};
