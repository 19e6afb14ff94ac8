//! Error types for the peroxide_scan library
//!
//! Quality rejections and failed deliveries are not errors: they are normal
//! outcomes carried by [`crate::AnalysisOutcome`] and [`crate::SyncResult`].

use thiserror::Error;

/// Result type alias for peroxide_scan operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Comprehensive error types for strip analysis and local persistence
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Calibration or configuration is unusable (never retried automatically)
    #[error("Configuration error: {reason}")]
    ConfigurationError {
        reason: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Invalid input parameters (caller bug, not a transient condition)
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Capture image could not be loaded or decoded into a frame
    #[error("Failed to decode frame: {message}")]
    FrameDecodeError {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Local record store could not be read or written
    #[error("Storage error: {message}")]
    StorageError {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Generic processing error
    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

impl AnalysisError {
    /// Create a configuration error without an underlying cause
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a configuration error with context
    pub fn configuration_with_source<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigurationError {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a frame decode error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::FrameDecodeError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a storage error with context
    pub fn storage<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StorageError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a storage error for a corrupt or inconsistent store
    pub fn storage_corrupt(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
            source: None,
        }
    }

    /// Check if this error indicates a recoverable condition
    ///
    /// Only storage failures may clear up on their own (full disk, locked
    /// file). Configuration and input errors need a human to fix them.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalysisError::StorageError { .. })
    }

    /// Get user-friendly error description for operator display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::ConfigurationError { .. } => {
                "The calibration scale is missing or invalid. Contact the quality department.".to_string()
            }
            AnalysisError::InvalidParameter { parameter, .. } => {
                format!("Invalid analysis input ({}). Please retake the photo.", parameter)
            }
            AnalysisError::FrameDecodeError { .. } => {
                "Could not read the captured image. Please retake the photo.".to_string()
            }
            AnalysisError::StorageError { .. } => {
                "The measurement could not be saved on the device. Please try again.".to_string()
            }
            AnalysisError::ProcessingError { .. } => {
                "Analysis failed. Please retake the photo.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_errors_are_recoverable() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(AnalysisError::storage("append failed", io).is_recoverable());
        assert!(!AnalysisError::configuration("one patch").is_recoverable());
        assert!(!AnalysisError::invalid_parameter("region", "0x0").is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = AnalysisError::invalid_parameter("frame.width", 0);
        assert_eq!(err.to_string(), "Invalid parameter: frame.width = 0");

        let err = AnalysisError::configuration("calibration needs at least 2 patches, got 1");
        assert!(err.to_string().contains("at least 2 patches"));
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = AnalysisError::image_load("cannot open strip.jpg", io);
        assert!(err.source().is_some());
        assert!(!err.user_message().is_empty());
    }
}
