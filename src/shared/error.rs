use axum::{response::IntoResponse, Json};

/// Error taxonomy shared by every core service. Each variant carries a
/// stable snake_case reason code so callers can render accurate messages
/// without parsing free text.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Role insufficient: {0}")]
    RoleInsufficient(String),
    #[error("Out of scope: {0}")]
    OutOfScope(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Configuration conflict: {0}")]
    ConfigConflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl CoreError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::RoleInsufficient(_) => "role_insufficient",
            Self::OutOfScope(_) => "out_of_scope",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::ConfigConflict(_) => "config_conflict",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_failed",
            Self::PersistenceFailure(_) => "persistence_failure",
        }
    }

    /// Conflicts reproduce on retry until the request itself is corrected.
    /// Only aborted persistence work is worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::RoleInsufficient(_) | Self::OutOfScope(_) => StatusCode::FORBIDDEN,
            Self::InvalidTransition(_) | Self::ConfigConflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.reason_code(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_stable() {
        assert_eq!(
            CoreError::RoleInsufficient("x".into()).reason_code(),
            "role_insufficient"
        );
        assert_eq!(CoreError::OutOfScope("x".into()).reason_code(), "out_of_scope");
        assert_eq!(
            CoreError::InvalidTransition("x".into()).reason_code(),
            "invalid_transition"
        );
    }

    #[test]
    fn test_only_persistence_failures_retry() {
        assert!(CoreError::PersistenceFailure("aborted".into()).is_retryable());
        assert!(!CoreError::ConfigConflict("overlap".into()).is_retryable());
        assert!(!CoreError::InvalidTransition("rejected".into()).is_retryable());
    }
}
