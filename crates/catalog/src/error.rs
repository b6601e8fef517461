use thiserror::Error;
use vitrine_blob::BlobError;

use crate::catalog::ProductId;

/// Errors from catalog access and the product image flows.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product with the given id exists.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The blob store rejected or failed the operation.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The catalog backend failed.
    #[error("catalog storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use vitrine_blob::ValidationError;

    use super::*;

    #[test]
    fn blob_errors_pass_through() {
        let err: CatalogError = BlobError::Validation(ValidationError::Empty).into();
        assert_eq!(err.to_string(), BlobError::Validation(ValidationError::Empty).to_string());
        assert!(matches!(err, CatalogError::Blob(BlobError::Validation(_))));
    }

    #[test]
    fn display() {
        let err = CatalogError::ProductNotFound(ProductId::new("p-1"));
        assert_eq!(err.to_string(), "product not found: p-1");
    }
}
