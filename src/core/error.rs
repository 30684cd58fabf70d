use thiserror::Error;

/// Outcome of a failed ledger or price read.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient network failure: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("account {account} owned by {actual}, expected {expected}")]
    OwnershipMismatch {
        account: String,
        expected: String,
        actual: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Recovers a `FetchError` raised inside a provider, anything else is transient.
    pub fn from_provider(err: anyhow::Error) -> Self {
        match err.downcast::<FetchError>() {
            Ok(fetch_err) => fetch_err,
            Err(other) => FetchError::Transient(other),
        }
    }

    /// Missing or foreign accounts are not failures, they read as a zero balance.
    pub fn resolves_to_zero(&self) -> bool {
        matches!(
            self,
            FetchError::AccountNotFound(_) | FetchError::OwnershipMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_zero_classification() {
        assert!(FetchError::AccountNotFound("abc".into()).resolves_to_zero());
        assert!(
            FetchError::OwnershipMismatch {
                account: "a".into(),
                expected: "b".into(),
                actual: "c".into(),
            }
            .resolves_to_zero()
        );
        assert!(!FetchError::Transient(anyhow!("timeout")).resolves_to_zero());
        assert!(!FetchError::MalformedResponse("bad".into()).resolves_to_zero());
    }

    #[test]
    fn test_from_provider_keeps_domain_errors() {
        let wrapped = anyhow::Error::new(FetchError::MalformedResponse("no value".into()));
        assert!(matches!(
            FetchError::from_provider(wrapped),
            FetchError::MalformedResponse(_)
        ));
        assert!(matches!(
            FetchError::from_provider(anyhow!("connection reset")),
            FetchError::Transient(_)
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = FetchError::OwnershipMismatch {
            account: "acc".into(),
            expected: "Tokenkeg".into(),
            actual: "System".into(),
        };
        assert_eq!(err.to_string(), "account acc owned by System, expected Tokenkeg");
    }
}
