use thiserror::Error;

/// Errors raised while assembling a [`Validator`](crate::Validator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidatorError {
    #[error("rule '{0}' is already registered")]
    DuplicateRule(String),

    #[error("rule '{rule}' depends on '{dependency}', which is not registered before it")]
    UnknownDependency { rule: String, dependency: String },
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
