use thiserror::Error;

use ws_core::{ErrorCode, WsError};

pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error(transparent)]
    Workspace(#[from] WsError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A local failure after the definition was registered with the
    /// orchestrator. `compensation` holds the cleanup failure, if any.
    #[error("{}", compensated_message(source, compensation.as_deref()))]
    Compensated {
        source: Box<TemplateError>,
        compensation: Option<String>,
    },
}

fn compensated_message(source: &TemplateError, compensation: Option<&str>) -> String {
    match compensation {
        Some(cleanup) => format!(
            "{}; clean-up of the registered workflow template failed: {}",
            source, cleanup
        ),
        None => source.to_string(),
    }
}

impl TemplateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TemplateError::Workspace(err) => err.code(),
            TemplateError::Compensated { source, .. } => source.code(),
            TemplateError::Database(_)
            | TemplateError::Migration(_)
            | TemplateError::Serialization(_)
            | TemplateError::Io(_) => ErrorCode::Internal,
        }
    }

    /// The wrapped taxonomy error, looking through compensation.
    pub fn workspace_error(&self) -> Option<&WsError> {
        match self {
            TemplateError::Workspace(err) => Some(err),
            TemplateError::Compensated { source, .. } => source.workspace_error(),
            _ => None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        WsError::NotFound(message.into()).into()
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        WsError::Unknown(message.into()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compensation_keeps_original_message() {
        let err = TemplateError::Compensated {
            source: Box::new(TemplateError::Database(sqlx::Error::RowNotFound)),
            compensation: Some("orchestrator unavailable".to_string()),
        };
        let message = err.to_string();
        assert!(message.starts_with("Database error:"));
        assert!(message.ends_with("orchestrator unavailable"));
        assert_eq!(err.code(), ErrorCode::Internal);
    }

    #[test]
    fn test_codes_pass_through() {
        let err = TemplateError::not_found("Workspace template not found.");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(matches!(err.workspace_error(), Some(WsError::NotFound(_))));
    }
}
