//! Sending a request to one environment
//!
//! The `Transport` trait is the seam between the runner and the network.
//! `HttpTransport` is the real implementation; tests substitute their own.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::request::{ProbeRequest, RequestBody};
use super::response::ProbeResponse;
use crate::common::{Environment, Error, Result};

/// Trait for anything that can deliver a request to an environment
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the full response
    async fn send(&self, environment: &Environment, request: &ProbeRequest)
        -> Result<ProbeResponse>;
}

/// Transport over HTTP(S) using reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport, applying a request timeout when one is configured
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("parity-probe/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn multipart_form(request: &ProbeRequest, files: &[super::request::MultipartFile]) -> Result<Form> {
    let mut form = Form::new();
    for file in files {
        let part = Part::bytes(file.content.clone().into_bytes())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                Error::Scenario(format!(
                    "Invalid content type '{}' for {} {}: {}",
                    file.content_type, request.method, request.path, e
                ))
            })?;
        form = form.part(file.field.clone(), part);
    }
    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        environment: &Environment,
        request: &ProbeRequest,
    ) -> Result<ProbeResponse> {
        let url = request.url_for(&environment.base_url);
        let parsed = reqwest::Url::parse(&url).map_err(|e| Error::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = self.client.request(request.method.into(), parsed);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(files) => builder.multipart(multipart_form(request, files)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport(&environment.name, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(&environment.name, e))?;

        Ok(ProbeResponse::new(environment.name.clone(), status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::request::{Method, MultipartFile};

    #[test]
    fn test_build_with_and_without_timeout() {
        assert!(HttpTransport::new(None).is_ok());
        assert!(HttpTransport::new(Some(Duration::from_secs(3))).is_ok());
    }

    #[test]
    fn test_multipart_rejects_bad_content_type() {
        let files = vec![MultipartFile {
            field: "avatar".into(),
            file_name: "a.png".into(),
            content_type: "not a mime".into(),
            content: "x".into(),
        }];
        let request = ProbeRequest::new(Method::Post, "/users/1/avatar").multipart(files.clone());
        assert!(matches!(
            multipart_form(&request, &files),
            Err(Error::Scenario(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_reported() {
        let transport = HttpTransport::new(None).unwrap();
        let env = Environment::new("dev", "not a url");
        let err = transport
            .send(&env, &ProbeRequest::new(Method::Get, "/users"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
        assert!(err.is_transport());
    }
}
