use serde::{Deserialize, Serialize};
use std::fmt;

pub const ERR_TOOL_NOT_FOUND: &str = "ERR_TOOL_NOT_FOUND";
pub const ERR_PARSE: &str = "ERR_PARSE";
pub const ERR_TOOL_INVOCATION: &str = "ERR_TOOL_INVOCATION";
pub const ERR_TIMEOUT: &str = "ERR_TIMEOUT";
pub const ERR_VALIDATION: &str = "ERR_VALIDATION";
pub const ERR_SYSTEM: &str = "ERR_SYSTEM";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            trace_id: trace_id.into(),
        }
    }

    /// The vendor tool is not installed where we looked. Callers usually degrade instead of failing.
    pub fn tool_not_found(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_TOOL_NOT_FOUND, message, trace_id)
    }

    pub fn parse(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_PARSE, message, trace_id)
    }

    /// The tool ran (or failed to spawn) and reported failure.
    pub fn tool_invocation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_TOOL_INVOCATION, message, trace_id)
    }

    pub fn timeout(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_TIMEOUT, message, trace_id)
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_VALIDATION, message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_SYSTEM, message, trace_id)
    }

    pub fn is_tool_not_found(&self) -> bool {
        self.code == ERR_TOOL_NOT_FOUND
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}
