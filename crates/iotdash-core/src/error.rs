use thiserror::Error;

/// Failure reading or writing the durable key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    /// The only failure meant to be shown to the user as-is.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Session storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("Activity timer needs a running tokio runtime: {0}")]
    NoRuntime(String),
}

impl SessionError {
    /// Message suitable for the login form.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCredentials => self.to_string(),
            SessionError::Store(_) => {
                "Could not save session. Check the data directory and try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message() {
        assert_eq!(
            SessionError::InvalidCredentials.user_message(),
            "Invalid username or password"
        );
    }

    #[test]
    fn test_store_error_hides_details_from_user() {
        let err = SessionError::from(StoreError::Unavailable("quota exceeded".to_string()));
        assert!(!err.user_message().contains("quota"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
