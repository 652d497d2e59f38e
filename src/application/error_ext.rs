//! Error conversion helpers for common I/O and serialization operations
//!
//! Provides extension traits for cleaner error handling with path context.

use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting fallible results to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an error.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&path)
    ///     .with_path_context("read draft", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T, E> IoResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}
