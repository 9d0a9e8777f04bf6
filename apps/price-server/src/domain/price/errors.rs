//! Store errors.

/// Errors a caller of a `PriceStore` can observe.
///
/// The embedded store accepts any id, blank ones included, and reports an
/// unknown key as an empty result. Other adapters use this to reject
/// arguments they cannot serve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The adapter refused an argument.
    #[error("invalid argument `{field}`: {message}")]
    InvalidArgument {
        /// Argument name.
        field: &'static str,
        /// Why it was rejected.
        message: String,
    },
}

impl StoreError {
    /// Build an `InvalidArgument` for `field`.
    #[must_use]
    pub fn invalid_argument(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_field() {
        let err = StoreError::invalid_argument("instrumentId", "unsupported venue");
        assert_eq!(
            err.to_string(),
            "invalid argument `instrumentId`: unsupported venue"
        );
    }
}
