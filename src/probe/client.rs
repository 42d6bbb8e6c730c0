//! Issuing one logical request to every configured environment

use std::sync::Arc;

use super::request::ProbeRequest;
use super::response::ProbeResponse;
use super::transport::{HttpTransport, Transport};
use crate::common::{Config, Environment, Result};

/// Sends the same request to each environment in configuration order
///
/// Requests go out one at a time: the second environment is contacted only
/// after the first has answered. Every request carries the bearer token and
/// the task tag header.
#[derive(Clone)]
pub struct ProbeClient {
    environments: Vec<Environment>,
    transport: Arc<dyn Transport>,
    token: String,
    task_header: String,
}

impl ProbeClient {
    pub fn new(
        environments: Vec<Environment>,
        transport: Arc<dyn Transport>,
        token: impl Into<String>,
        task_header: impl Into<String>,
    ) -> Self {
        Self {
            environments,
            transport,
            token: token.into(),
            task_header: task_header.into(),
        }
    }

    /// Build a client over HTTP from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let token = config.token()?.to_string();
        let transport = HttpTransport::new(config.timeouts.request())?;
        Ok(Self::new(
            config.environments.clone(),
            Arc::new(transport),
            token,
            config.task_header.clone(),
        ))
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    /// Attach the credential and task tag headers
    fn finalize(&self, tag: &str, request: ProbeRequest) -> ProbeRequest {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header(self.task_header.as_str(), tag)
    }

    /// Send an identical request to every environment
    pub async fn send_all(&self, tag: &str, request: &ProbeRequest) -> Result<Vec<ProbeResponse>> {
        self.send_each(tag, |_| Ok(request.clone())).await
    }

    /// Send a request built per environment
    ///
    /// Used when a leg depends on values an environment returned earlier,
    /// so each environment only ever sees its own identifiers.
    pub async fn send_each<F>(&self, tag: &str, mut build: F) -> Result<Vec<ProbeResponse>>
    where
        F: FnMut(&Environment) -> Result<ProbeRequest>,
    {
        let mut responses = Vec::with_capacity(self.environments.len());

        for env in &self.environments {
            let request = self.finalize(tag, build(env)?);
            tracing::debug!(
                environment = %env.name,
                method = %request.method,
                url = %request.url_for(&env.base_url),
                tag,
                "sending request"
            );

            let response = self.transport.send(env, &request).await?;
            tracing::debug!(
                environment = %env.name,
                status = response.status,
                bytes = response.body.len(),
                "received response"
            );
            responses.push(response);
        }

        Ok(responses)
    }
}

impl std::fmt::Debug for ProbeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeClient")
            .field("environments", &self.environments)
            .field("task_header", &self.task_header)
            .finish_non_exhaustive()
    }
}
