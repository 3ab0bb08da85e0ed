//! Folding several same-type problem responses into one
//!
//! An aggregator holds one batch. `build` consumes the batch and leaves the
//! aggregator empty, ready for a new batch. The `&mut self` API keeps a
//! batch confined to a single owner; use one aggregator per request.

use serde_json::{Map, Value};

use crate::error::AggregateError;
use crate::problem::{ErrorResponse, Extensions};

/// Extension member holding the per-item records of a combined response.
pub const ERRORS_MEMBER: &str = "errors";

#[derive(Debug, Default)]
pub struct MultiErrorAggregator {
    items: Vec<ErrorResponse>,
}

impl MultiErrorAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response to the current batch.
    ///
    /// # Errors
    /// Returns `AggregateError::TypeMismatch` if the batch already holds a
    /// response of another `type`. The batch is left unchanged.
    pub fn add(&mut self, response: ErrorResponse) -> Result<(), AggregateError> {
        if let Some(first) = self.items.first()
            && !first.is_same_type(&response)
        {
            return Err(AggregateError::TypeMismatch {
                expected: first.type_url().to_owned(),
                actual: response.type_url().to_owned(),
            });
        }
        self.items.push(response);
        Ok(())
    }

    /// Problem type shared by the current batch, if any item was added.
    #[must_use]
    pub fn batch_type(&self) -> Option<&str> {
        self.items.first().map(ErrorResponse::type_url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Combine the batch into one response and reset the aggregator.
    ///
    /// The combined response takes `status`, `title` and `type` from the first
    /// item. Its `errors` extension lists, in insertion order, each item's
    /// `detail` and `instance` merged with the item's own extensions.
    ///
    /// # Errors
    /// Returns `AggregateError::EmptyBatch` if nothing was added since the last build.
    pub fn build(&mut self) -> Result<ErrorResponse, AggregateError> {
        let items = std::mem::take(&mut self.items);
        let Some(first) = items.first() else {
            return Err(AggregateError::EmptyBatch);
        };

        let errors: Vec<Value> = items
            .iter()
            .map(|item| Value::Object(item_record(item)))
            .collect();
        let mut extensions = Extensions::new();
        extensions.insert(ERRORS_MEMBER, errors);

        tracing::debug!(
            problem_type = first.type_url(),
            items = items.len(),
            "combined problem responses"
        );

        Ok(ErrorResponse::create(
            i64::from(first.status().as_u16()),
            first.title().map(ToOwned::to_owned),
            None,
            None,
            Some(first.type_url().to_owned()),
            extensions,
        )?)
    }
}

fn item_record(item: &ErrorResponse) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("detail".to_owned(), Value::from(item.detail()));
    record.insert("instance".to_owned(), Value::from(item.instance()));
    for (key, value) in item.extensions() {
        record.insert(key.clone(), value.clone());
    }
    record
}
