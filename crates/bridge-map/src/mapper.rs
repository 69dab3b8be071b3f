//! The mapper contract.
//!
//! The same trait is used twice per pipeline: once from a source record to
//! canonical data sets, once from a data set to target records. A mapper may
//! fan out (one input, many outputs) or skip conditionally by returning an
//! empty vector, which is not an error.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use bridge_model::redact_value;

use crate::error::MappingError;

/// Result of a single mapping call.
pub type MappingResult<O> = std::result::Result<Vec<O>, MappingError>;

/// Converts one input into zero or more outputs.
///
/// Implementations must be deterministic and must not mutate shared state.
/// Read-only lookups are fine.
pub trait Mapper<I, O>: Send + Sync {
    /// Name used in logs and outcomes.
    fn name(&self) -> &str;

    fn map(&self, input: &I) -> MappingResult<O>;
}

impl<I, O, M: Mapper<I, O> + ?Sized> Mapper<I, O> for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn map(&self, input: &I) -> MappingResult<O> {
        (**self).map(input)
    }
}

/// Mapper backed by a closure.
pub struct FnMapper<F> {
    name: String,
    mapping: F,
}

/// Wraps a closure as a named [`Mapper`].
pub fn mapper_fn<I, O, F>(name: impl Into<String>, mapping: F) -> FnMapper<F>
where
    F: Fn(&I) -> MappingResult<O> + Send + Sync,
{
    FnMapper {
        name: name.into(),
        mapping,
    }
}

impl<I, O, F> Mapper<I, O> for FnMapper<F>
where
    F: Fn(&I) -> MappingResult<O> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn map(&self, input: &I) -> MappingResult<O> {
        (self.mapping)(input)
    }
}

/// Runs a mapper, turning a panic into [`MappingError::Panicked`].
///
/// The panic message may quote the input, so it is only logged when record
/// logging is enabled.
pub fn map_guarded<I, O, M>(mapper: &M, input: &I) -> MappingResult<O>
where
    M: Mapper<I, O> + ?Sized,
{
    catch_unwind(AssertUnwindSafe(|| mapper.map(input))).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(
            mapper = mapper.name(),
            message = redact_value(&message),
            "mapper panicked"
        );
        Err(MappingError::Panicked(message))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_from_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn panic_message_from_unknown_payload() {
        let payload: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
