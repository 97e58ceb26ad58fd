use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Unknown kind tag, bad hyperparameter, or a layer chain whose shapes do not line up.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("shape mismatch in {context}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// `learn` was called on a layer that has not seen a `feedforward` yet.
    #[error("missing forward pass: {0}")]
    MissingForwardPass(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

/// Fails with [`Error::ShapeMismatch`] unless `actual == expected`.
#[inline]
pub(crate) fn check_len(context: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::shape(context, expected, actual));
    }
    Ok(())
}
