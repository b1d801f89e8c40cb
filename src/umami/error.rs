use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UmamiErrorCode {
    InvalidArgument,
    InvalidConfig,
    InvalidScriptUrl,
    ScriptInjection,
    Internal,
}

impl UmamiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UmamiErrorCode::InvalidArgument => "umami/invalid-argument",
            UmamiErrorCode::InvalidConfig => "umami/invalid-config",
            UmamiErrorCode::InvalidScriptUrl => "umami/invalid-script-url",
            UmamiErrorCode::ScriptInjection => "umami/script-injection",
            UmamiErrorCode::Internal => "umami/internal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UmamiError {
    pub code: UmamiErrorCode,
    message: String,
}

impl UmamiError {
    pub fn new(code: UmamiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for UmamiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for UmamiError {}

pub type UmamiResult<T> = Result<T, UmamiError>;

pub fn invalid_argument(message: impl Into<String>) -> UmamiError {
    UmamiError::new(UmamiErrorCode::InvalidArgument, message)
}

pub fn invalid_config(message: impl Into<String>) -> UmamiError {
    UmamiError::new(UmamiErrorCode::InvalidConfig, message)
}

pub fn script_injection(message: impl Into<String>) -> UmamiError {
    UmamiError::new(UmamiErrorCode::ScriptInjection, message)
}

pub fn internal_error(message: impl Into<String>) -> UmamiError {
    UmamiError::new(UmamiErrorCode::Internal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let err = invalid_config("websiteId is required");
        assert_eq!(err.code_str(), "umami/invalid-config");
        assert_eq!(err.to_string(), "websiteId is required (umami/invalid-config)");
        assert_eq!(err.message(), "websiteId is required");
    }
}
