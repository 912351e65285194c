/// Error envelope returned by the Generative Language API on non-2xx responses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiError {
    error: ErrorDetails,
}

impl ApiError {
    pub fn details(&self) -> &ErrorDetails {
        &self.error
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl ErrorDetails {
    pub fn new(message: &str) -> Self {
        Self {
            code: None,
            message: message.to_string(),
            status: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_google_error_envelope() {
        let body = r#"{
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        }"#;

        let error: ApiError = serde_json::from_str(body).unwrap();

        assert_eq!(error.details().code(), Some(400));
        assert_eq!(error.details().status(), Some("INVALID_ARGUMENT"));
        assert!(error.details().message().starts_with("API key not valid"));
    }
}
