use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid inputs structure: {0}")]
    InvalidInputs(String),

    #[error("invalid signature for {function}: {reason}")]
    InvalidSignature { function: String, reason: String },

    #[error("{function}() got an unexpected argument `{param}`")]
    UnknownParameter { function: String, param: String },

    #[error("{function}() got multiple values for argument `{param}`")]
    DuplicateArgument { function: String, param: String },

    #[error("{function}() missing required argument `{param}`")]
    MissingArgument { function: String, param: String },

    #[error("{function}() takes {expected} positional arguments but {given} were given")]
    TooManyPositional {
        function: String,
        expected: usize,
        given: usize,
    },
}
