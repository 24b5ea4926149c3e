//! Port error types.

/// Errors surfaced by port operations.
///
/// Every variant is raised after the port's exclusivity has been released,
/// so a caller that recovers from one can keep using the port. The one
/// exception is [`PortError::TruncatedEncoding`], after which the port's
/// character position is undefined.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Data-moving or seek operation on a closed port.
    #[error("{operation} attempted on closed port: {port}")]
    Closed {
        port: String,
        operation: &'static str,
    },

    /// The backend/direction combination cannot perform this operation.
    #[error("{operation} is not supported by port: {port}")]
    Unsupported {
        port: String,
        operation: &'static str,
    },

    /// End of input reached in the middle of a multibyte character.
    #[error(
        "encountered EOF in middle of a multibyte character from port {port} \
         ({got} of {expected} bytes)"
    )]
    TruncatedEncoding {
        port: String,
        expected: usize,
        got: usize,
    },

    /// Pushback storage is already occupied or would exceed its capacity.
    #[error("pushback capacity exceeded on port: {port}")]
    PushbackOverflow { port: String },

    /// A block read was requested into a zero-length buffer.
    #[error("block read into an empty buffer on port: {port}")]
    EmptyRequest { port: String },

    /// A backend callback re-entered the port while it was mid-operation.
    #[error("port re-entered from inside its own backend: {port}")]
    Reentered { port: String },

    /// Underlying device error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PortError {
    /// Returns true if the port's character stream position is undefined
    /// after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::TruncatedEncoding { .. })
    }

    pub(crate) fn closed(port: &str, operation: &'static str) -> Self {
        Self::Closed {
            port: port.to_string(),
            operation,
        }
    }

    pub(crate) fn unsupported(port: &str, operation: &'static str) -> Self {
        Self::Unsupported {
            port: port.to_string(),
            operation,
        }
    }

    pub(crate) fn overflow(port: &str) -> Self {
        Self::PushbackOverflow {
            port: port.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_truncation_is_fatal() {
        let truncated = PortError::TruncatedEncoding {
            port: "p".into(),
            expected: 3,
            got: 1,
        };
        assert!(truncated.is_fatal());
        assert!(!PortError::closed("p", "read").is_fatal());
        assert!(!PortError::overflow("p").is_fatal());
    }

    #[test]
    fn messages_name_the_port() {
        let err = PortError::closed("stdin", "seek");
        assert_eq!(err.to_string(), "seek attempted on closed port: stdin");
        let err = PortError::unsupported("log", "read");
        assert_eq!(err.to_string(), "read is not supported by port: log");
    }

    #[test]
    fn io_errors_convert() {
        let err: PortError = std::io::Error::other("boom").into();
        assert!(matches!(err, PortError::Io { .. }));
    }
}
