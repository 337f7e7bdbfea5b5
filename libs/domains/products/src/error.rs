use thiserror::Error;

/// Failures of a single catalog operation.
///
/// None of these are fatal to the process; each is scoped to the action that
/// triggered it and the caller decides how to surface it.
#[derive(Debug, Error)]
pub enum ProductError {
    /// The document store could not be reached or rejected the write
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    /// The target document was absent at write time
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The blob store rejected a request: an image write, delete or lookup
    #[error("Blob store rejected the request: {0}")]
    UploadFailed(String),

    /// An image URL could not be mapped back to a blob path
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    /// The draft did not pass the form rules
    #[error("Invalid input: {0}")]
    Validation(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl ProductError {
    /// Errors after which the same action can reasonably be retried by the user
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProductError::StoreUnavailable(_) | ProductError::UploadFailed(_)
        )
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        ProductError::StoreUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ProductError {
    fn from(err: validator::ValidationErrors) -> Self {
        ProductError::Validation(err.to_string())
    }
}
