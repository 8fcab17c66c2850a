//! User-facing outcome messages for the notification surface.

use std::fmt;

use berry_types::error::FsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Error notice for a failed operation, or `None` for silent failures.
    pub fn from_error(err: &FsError) -> Option<Self> {
        if err.is_silent() {
            None
        } else {
            Some(Self::error(err.to_string()))
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Success => write!(f, "{}", self.message),
            Severity::Error => write!(f, "error: {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_silent() {
        assert!(Notice::from_error(&FsError::EmptyName).is_none());
    }

    #[test]
    fn other_errors_become_error_notices() {
        let n = Notice::from_error(&FsError::ClipboardEmpty).unwrap();
        assert!(n.is_error());
        assert_eq!(n.to_string(), "error: nothing to paste");
    }

    #[test]
    fn success_display() {
        assert_eq!(Notice::success("Pasted: a.txt").to_string(), "Pasted: a.txt");
    }
}
