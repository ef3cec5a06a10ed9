//! Crate-wide error type.
//!
//! Errors carry a machine-readable kind (the failure taxonomy) plus a
//! human-readable message. The kind determines the process exit code:
//!
//! - 2: configuration / input validation problems
//! - 3: inference failed (no viable model, unusable synthesis output)
//! - 4: I/O and backend transport problems

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed example set (missing columns, empty set).
    Validation,
    /// Numeric fitting exhausted all candidate families.
    NoViableModel,
    /// The local generative call missed its wall-clock deadline.
    LocalTimeout,
    /// Local generative transport/decode failure (recovered internally).
    LocalGenerationFailed,
    /// Remote credentials were absent at construction time.
    RemoteUnavailable,
    /// Remote generative transport/auth failure.
    RemoteGenerationFailed,
    /// No function block could be extracted from generative output.
    NoFunctionFound,
    /// Extracted code failed to parse, even after the repair pass.
    SynthesisSyntaxError,
    /// Runtime failure inside the script sandbox.
    Script,
    /// Filesystem / CSV problems.
    Io,
    /// Terminal wrapper for an unrecovered upstream failure.
    InferenceFailed,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Validation | ErrorKind::RemoteUnavailable => 2,
            ErrorKind::NoViableModel
            | ErrorKind::NoFunctionFound
            | ErrorKind::SynthesisSyntaxError
            | ErrorKind::Script
            | ErrorKind::InferenceFailed => 3,
            ErrorKind::LocalTimeout
            | ErrorKind::LocalGenerationFailed
            | ErrorKind::RemoteGenerationFailed
            | ErrorKind::Io => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(AppError::validation("x").exit_code(), 2);
        assert_eq!(AppError::new(ErrorKind::NoViableModel, "x").exit_code(), 3);
        assert_eq!(AppError::io("x").exit_code(), 4);
    }
}
