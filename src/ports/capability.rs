//! Errors shared by the capability ports.

use super::AIError;

/// Failure of an external capability (classifier, extractor, analytics, chat).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("capability timed out")]
    Timeout,

    #[error("invalid capability response: {0}")]
    InvalidResponse(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl CapabilityError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}

impl From<AIError> for CapabilityError {
    fn from(err: AIError) -> Self {
        match err {
            AIError::Timeout { .. } => CapabilityError::Timeout,
            AIError::Parse(msg) => CapabilityError::InvalidResponse(msg),
            AIError::ContentFiltered { reason } => CapabilityError::Rejected(reason),
            AIError::InvalidRequest(msg) | AIError::ContextTooLong(msg) => {
                CapabilityError::Rejected(msg)
            }
            other => CapabilityError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_errors_map_to_capability_errors() {
        assert_eq!(
            CapabilityError::from(AIError::Timeout { timeout_secs: 5 }),
            CapabilityError::Timeout
        );
        assert_eq!(
            CapabilityError::from(AIError::parse("not json")),
            CapabilityError::InvalidResponse("not json".into())
        );
        assert!(matches!(
            CapabilityError::from(AIError::AuthenticationFailed),
            CapabilityError::Unavailable(_)
        ));
    }
}
