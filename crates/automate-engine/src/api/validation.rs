use std::{error::Error as StdError, fmt};

use rhai::{Dynamic, EvalAltResult, Position};

#[derive(Debug, Clone)]
/// Argument error raised by an API function, reported at the script call site.
pub struct ValidationError {
    /// Error message to surface.
    pub(crate) message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ValidationError {}

/// Create a boxed Rhai runtime error tagged as a validation error.
pub(crate) fn boxed_validation_error(message: String, pos: Position) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(ValidationError { message }),
        pos,
    ))
}

/// Message of a validation error payload, if `value` carries one.
pub(crate) fn validation_message(value: &Dynamic) -> Option<String> {
    value
        .is::<ValidationError>()
        .then(|| value.clone_cast::<ValidationError>().message)
}
