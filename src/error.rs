//! Application-wide error types using thiserror
//!
//! Client-layer failures stay as [`crate::api::ClientError`] and session
//! refusals as [`crate::core::SessionError`]; `AppError` covers startup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<()> {
            std::fs::File::open("/definitely/not/here.yaml")?;
            Ok(())
        }
        let err = open().unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().starts_with("IO error:"));
    }
}
