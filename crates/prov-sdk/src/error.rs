use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid call: {0}")]
    Call(#[from] prov_types::TypeError),

    #[error("repo error: {0}")]
    Repo(#[from] prov_repo::RepoError),

    #[error("argument not bound: {0}")]
    MissingArgument(String),

    #[error("computation failed: {0}")]
    Compute(String),
}

impl SdkError {
    /// Wrap a failure raised by user computation code.
    pub fn compute(reason: impl fmt::Display) -> Self {
        Self::Compute(reason.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
