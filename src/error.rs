//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the graphics device lifecycle.
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// A required creation step failed during device construction.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// No viable hardware adapter was found and software devices are not allowed.
    #[error("no compatible graphics adapter available")]
    NoAdapterAvailable,

    /// A native call into the graphics substrate failed.
    ///
    /// Carries the originating call name so diagnostics can point at the
    /// exact native entry point that failed.
    #[error("native call {call} failed: {message}")]
    NativeCall {
        /// Name of the native call that failed.
        call: String,
        /// Substrate-provided failure description.
        message: String,
    },

    /// The device was removed by the driver/hardware.
    #[error("device lost: {0}")]
    DeviceLost(String),

    /// A single resource failed to create or rebuild.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Image bytes could not be decoded by any codec in the chain.
    #[error("image decode failed: {0}")]
    DecodeFailed(String),

    /// The byte-supplying service failed to provide file content.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The requested operation is not valid for this object.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl GraphicsError {
    /// Build a [`GraphicsError::NativeCall`] from a call name and message.
    pub fn native(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NativeCall {
            call: call.into(),
            message: message.into(),
        }
    }
}

/// Convenience result alias used throughout the crate.
pub type GraphicsResult<T> = Result<T, GraphicsError>;

/// Log a failed native call with its originating call name.
///
/// Every native failure passes through here before any higher-level message
/// is produced, so the log always contains the exact failing entry point.
pub(crate) fn report_native_error(call: &str, error: &GraphicsError) {
    log::error!("{} failed: {}", call, error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::NoAdapterAvailable;
        assert_eq!(err.to_string(), "no compatible graphics adapter available");

        let err = GraphicsError::native("Factory::enumerate_adapters", "out of range");
        assert_eq!(
            err.to_string(),
            "native call Factory::enumerate_adapters failed: out of range"
        );
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;
        let err = GraphicsError::Io {
            path: "missing.png".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.source().is_some());
    }
}
