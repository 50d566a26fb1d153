use thiserror::Error;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Failure kinds surfaced by the workflow services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    /// The record has already left the state the operation requires.
    #[error("already processed")]
    AlreadyProcessed,

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("service unavailable")]
    Unavailable,

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Unknown(anyhow::Error),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::Invalid(message.into())
    }

    /// Text shown to end users. `Cancelled` is expected and shown nowhere.
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            Self::PermissionDenied => "You don't have permission to perform this action.",
            Self::Unauthenticated => "Please sign in to continue.",
            Self::NotFound => "The requested item could not be found.",
            Self::AlreadyExists => "This item already exists.",
            Self::AlreadyProcessed => "This request has already been processed.",
            Self::Invalid(message) => return Some(message.clone()),
            Self::Unavailable => "The service is temporarily unavailable. Please try again.",
            Self::QuotaExceeded => "Too many requests. Please try again later.",
            Self::Cancelled => return None,
            Self::Unknown(_) => "An unexpected error occurred.",
        };
        Some(message.to_string())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }
        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return Self::Unavailable;
        }

        let code = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
            _ => None,
        };
        match code.as_deref() {
            // unique_violation
            Some("23505") => Self::AlreadyExists,
            // foreign_key_violation
            Some("23503") => Self::NotFound,
            // query_canceled
            Some("57014") => Self::Cancelled,
            // too_many_connections
            Some("53300") => Self::Unavailable,
            _ => Self::Unknown(err.into()),
        }
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_timeout() || err.is_connection_refusal() {
            Self::Unavailable
        } else {
            Self::Unknown(err.into())
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<sqlx::Error>() {
            Ok(sqlx_err) => sqlx_err.into(),
            Err(err) => Self::Unknown(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_has_no_user_message() {
        assert!(ServiceError::Cancelled.user_message().is_none());
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(
            ServiceError::AlreadyProcessed.user_message().as_deref(),
            Some("This request has already been processed.")
        );
        assert_eq!(
            ServiceError::QuotaExceeded.user_message().as_deref(),
            Some("Too many requests. Please try again later.")
        );
        assert_eq!(
            ServiceError::invalid("ward is required").user_message().as_deref(),
            Some("ward is required")
        );
    }

    #[test]
    fn unknown_hides_details() {
        let err = ServiceError::Unknown(anyhow::anyhow!("connection string leaked"));
        assert_eq!(
            err.user_message().as_deref(),
            Some("An unexpected error occurred.")
        );
    }

    #[test]
    fn sqlx_errors_are_classified() {
        assert!(matches!(
            ServiceError::from(sqlx::Error::RowNotFound),
            ServiceError::NotFound
        ));
        assert!(matches!(
            ServiceError::from(sqlx::Error::PoolTimedOut),
            ServiceError::Unavailable
        ));
        let wrapped = anyhow::Error::from(sqlx::Error::PoolClosed);
        assert!(matches!(
            ServiceError::from(wrapped),
            ServiceError::Unavailable
        ));
    }
}
