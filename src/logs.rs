//! Leveled pipeline logging.
//!
//! Thin print-based log layer used by every pipeline stage. Entries carry a
//! level and an optional indent so nested steps read as a tree on stdout.

use serde::{Deserialize, Serialize};

/// Log level for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Print this entry. Errors go to stderr, everything else to stdout.
    pub fn emit(&self) {
        let prefix = match self.level {
            LogLevel::Info => "  ",
            LogLevel::Success => "  ✓",
            LogLevel::Warning => "  ⚠",
            LogLevel::Error => "  ✗",
        };
        let indent = "  ".repeat(self.indent as usize);
        if self.level == LogLevel::Error {
            eprintln!("{}{} {}", indent, prefix, self.message);
        } else {
            println!("{}{} {}", indent, prefix, self.message);
        }
    }
}

/// Log an info message.
pub fn log_info(message: impl Into<String>) {
    LogEntry::info(message).emit();
}

/// Log a success message.
pub fn log_success(message: impl Into<String>) {
    LogEntry::success(message).emit();
}

/// Log a warning message.
pub fn log_warning(message: impl Into<String>) {
    LogEntry::warning(message).emit();
}

/// Log an error message.
pub fn log_error(message: impl Into<String>) {
    LogEntry::error(message).emit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_constructors() {
        let entry = LogEntry::warning("low disk").with_indent(2);
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.indent, 2);
        assert_eq!(entry.message, "low disk");
    }
}
