use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Authentication required: session is not logged in")]
    AuthenticationRequired,

    #[error("Unrecognized date format: {0}")]
    UnrecognizedDateFormat(String),

    #[error("Unrecognized time format: {0}")]
    UnrecognizedTimeFormat(String),

    #[error("Malformed item: {0}")]
    MalformedItem(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl HarvestError {
    /// Errors scoped to one observed row. The collector skips the row and keeps going.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            HarvestError::UnrecognizedDateFormat(_)
                | HarvestError::UnrecognizedTimeFormat(_)
                | HarvestError::MalformedItem(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_and_malformed_errors_are_item_scoped() {
        assert!(HarvestError::UnrecognizedDateFormat("Someday 5".into()).is_item_scoped());
        assert!(HarvestError::MalformedItem("no id".into()).is_item_scoped());
        assert!(!HarvestError::AuthenticationRequired.is_item_scoped());
        assert!(!HarvestError::Navigation("click".into()).is_item_scoped());
    }

    #[test]
    fn date_error_names_the_token() {
        let err = HarvestError::UnrecognizedDateFormat("12/03".into());
        assert_eq!(err.to_string(), "Unrecognized date format: 12/03");
    }
}
