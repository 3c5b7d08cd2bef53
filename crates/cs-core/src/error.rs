use thiserror::Error;

pub const CODE_COMPILE: &str = "SCRIPT_COMPILE";
pub const CODE_EVAL: &str = "SCRIPT_EVAL";
pub const CODE_TIMEOUT: &str = "SCRIPT_TIMEOUT";
pub const CODE_DEPTH: &str = "SCRIPT_DEPTH";
pub const CODE_BINDING: &str = "SCRIPT_BINDING";
pub const CODE_PARSE: &str = "VALUE_PARSE";

/// Error raised below the resolver layer. `Display` renders only the message so that a
/// diagnostic string produced by the resolver is exactly `error.to_string()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptError {
    pub code: String,
    pub message: String,
}

impl ScriptError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn compile(message: impl Into<String>) -> Self {
        Self::new(CODE_COMPILE, message)
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Self::new(CODE_EVAL, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(CODE_PARSE, message)
    }

    pub fn is_timeout(&self) -> bool {
        self.code == CODE_TIMEOUT
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn display_renders_message_only() {
        let error = ScriptError::compile("unexpected token");
        assert_eq!(error.to_string(), "unexpected token");
        assert_eq!(error.code, CODE_COMPILE);
        assert!(!error.is_timeout());
        assert!(ScriptError::new(CODE_TIMEOUT, "late").is_timeout());
    }
}
