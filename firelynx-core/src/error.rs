use thiserror::Error;

/// Error taxonomy for the config/interpolation/validation pipeline and the
/// request-scoped failures that bubble up out of it.
#[derive(Error, Debug)]
pub enum FirelynxError {
    #[error("malformed configuration document: {0}")]
    Parse(String),

    #[error("interpolation failed: missing variable(s): {}", .0.join(", "))]
    Interpolation(Vec<String>),

    #[error("invalid configuration:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("listener {listener_id} failed to bind {address}: {source}")]
    Bind {
        listener_id: String,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handler error: {0}")]
    Handler(String),

    #[error("operation canceled")]
    Cancellation,
}

impl FirelynxError {
    /// Maps a request-scoped error to the status code the listener should
    /// answer with. Config-pipeline errors never reach a request, so they
    /// have no sensible status and are not covered here.
    pub fn status_code(&self) -> u16 {
        match self {
            FirelynxError::Handler(_) => 500,
            FirelynxError::Cancellation => 499,
            _ => 500,
        }
    }

    pub fn to_json_body(&self) -> Vec<u8> {
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": self.status_code(),
        });
        serde_json::to_vec(&body).unwrap_or_else(|_| b"{\"error\":\"internal\"}".to_vec())
    }
}
