//! Exit codes for the mg-core CLI.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use mg_common::{Error, ErrorCategory};

/// Exit codes for mg-core operations.
///
/// These codes are a stable contract for automation. Changes require
/// a major version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-1)
    // ========================================================================
    /// Success: every probe recognized / clean run
    Clean = 0,

    /// Ran to completion but at least one recognition reported no match
    NoMatch = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing, unparseable or invalid
    ConfigError = 11,

    /// Gesture recording or replay script is malformed
    InputError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }

    /// Operational outcomes are not errors; they report what was recognized.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    pub fn is_user_error(self) -> bool {
        let code = self as i32;
        (10..20).contains(&code)
    }

    pub fn is_internal_error(self) -> bool {
        let code = self as i32;
        code >= 20
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::NoMatch => "OK_NO_MATCH",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Map a library error to the exit code reported for it.
    pub fn from_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Capture => ExitCode::InputError,
            ErrorCategory::Model => ExitCode::InternalError,
            ErrorCategory::Io => match err {
                Error::Json(_) => ExitCode::InputError,
                _ => ExitCode::IoError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_consistent() {
        let all = [
            ExitCode::Clean,
            ExitCode::NoMatch,
            ExitCode::ArgsError,
            ExitCode::ConfigError,
            ExitCode::InputError,
            ExitCode::InternalError,
            ExitCode::IoError,
        ];
        for code in all {
            assert_eq!(code.is_operational(), !code.is_error(), "{code}");
            if code.is_error() {
                assert_ne!(code.is_user_error(), code.is_internal_error(), "{code}");
            }
        }
        assert!(ExitCode::Clean.is_success());
        assert!(!ExitCode::NoMatch.is_success());
    }

    #[test]
    fn display_includes_name_and_value() {
        assert_eq!(ExitCode::NoMatch.to_string(), "OK_NO_MATCH (1)");
        assert_eq!(i32::from(ExitCode::IoError), 21);
    }

    #[test]
    fn errors_map_by_category() {
        assert_eq!(
            ExitCode::from_error(&Error::InvalidConfig("x".into())),
            ExitCode::ConfigError
        );
        assert_eq!(ExitCode::from_error(&Error::EmptyGesture), ExitCode::InputError);
        assert_eq!(
            ExitCode::from_error(&Error::Numerical("nan".into())),
            ExitCode::InternalError
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ExitCode::from_error(&Error::Io(io)), ExitCode::IoError);
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ExitCode::from_error(&Error::Json(json)), ExitCode::InputError);
    }
}
