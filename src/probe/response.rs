//! Responses collected from each environment

use serde_json::Value;

use crate::common::{Error, Result};

/// Response from one environment
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    /// Name of the environment that answered
    pub environment: String,
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn new(environment: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            environment: environment.into(),
            status,
            body: body.into(),
        }
    }

    /// Response carrying a JSON body
    pub fn with_json(environment: impl Into<String>, status: u16, body: &Value) -> Self {
        Self::new(environment, status, body.to_string())
    }

    /// Decode the body as JSON
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::response_decode(&self.environment, e))
    }

    /// Body as text, cut to `max` characters for messages
    pub fn preview(&self, max: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        if text.chars().count() > max {
            let cut: String = text.chars().take(max).collect();
            format!("{}...", cut)
        } else {
            text.into_owned()
        }
    }
}

/// Decode every response body, failing on the first one that is not JSON
pub fn decode_all(responses: &[ProbeResponse]) -> Result<Vec<Value>> {
    responses.iter().map(ProbeResponse::json).collect()
}
