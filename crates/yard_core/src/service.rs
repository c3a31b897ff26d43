use std::path::Path;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{
    header::AUTHORIZATION,
    multipart::{Form, Part},
    Client, Method, RequestBuilder, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Container, ContainerId, Position},
    error::ServiceErrorBody,
    protocol::{AckResponse, HealthResponse, LogBuffer, MetricsSnapshot, TrainingProgressSnapshot},
};
use tracing::debug;
use url::Url;

use crate::{config::CoordinatorConfig, error::YardError};

const MAX_ERROR_BODY_CHARS: usize = 256;

/// Bytes of a CSV file handed to the service's import endpoint untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl CsvUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("upload path '{}' has no file name", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Ok(Self { file_name, bytes })
    }
}

/// Remote authority for yard state.
#[async_trait]
pub trait YardService: Send + Sync {
    async fn fetch_containers(&self) -> Result<Vec<Container>, YardError>;
    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, YardError>;
    async fn fetch_logs(&self) -> Result<LogBuffer, YardError>;
    async fn fetch_training_progress(&self) -> Result<TrainingProgressSnapshot, YardError>;
    async fn remove_container(&self, id: &ContainerId) -> Result<(), YardError>;
    async fn manual_place_container(
        &self,
        id: &ContainerId,
        position: Position,
    ) -> Result<(), YardError>;
    async fn upload_csv(&self, upload: CsvUpload) -> Result<(), YardError>;
    async fn reoptimize(&self) -> Result<(), YardError>;
    async fn health(&self) -> Result<HealthResponse, YardError>;
}

pub struct HttpYardService {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    log_stream: String,
}

impl HttpYardService {
    pub fn new(config: &CoordinatorConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(config.service_url.trim())
            .with_context(|| format!("invalid yard service url '{}'", config.service_url))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "yard service url must be an http(s) base url, got '{}'",
                config.service_url
            ));
        }
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            log_stream: config.log_stream.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, YardError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| YardError::Network(format!("'{}' cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.header(AUTHORIZATION, key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Vec<u8>, YardError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(YardError::ServerRejected {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            });
        }
        Ok(body.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, YardError> {
        let body = self.send(self.request(Method::GET, url)).await?;
        serde_json::from_slice(&body).map_err(|err| {
            YardError::Decode(format!("{err}; body: {}", excerpt(&body)))
        })
    }

    async fn post_ack(&self, builder: RequestBuilder) -> Result<(), YardError> {
        let body = self.send(builder).await?;
        if let Ok(ack) = serde_json::from_slice::<AckResponse>(&body) {
            debug!(ack = ack.message.as_deref().unwrap_or_default(), "yard service acknowledged");
        }
        Ok(())
    }
}

#[async_trait]
impl YardService for HttpYardService {
    async fn fetch_containers(&self) -> Result<Vec<Container>, YardError> {
        self.get_json(self.endpoint(&["containers"])?).await
    }

    async fn fetch_metrics(&self) -> Result<MetricsSnapshot, YardError> {
        self.get_json(self.endpoint(&["metrics"])?).await
    }

    async fn fetch_logs(&self) -> Result<LogBuffer, YardError> {
        let mut url = self.endpoint(&["logs"])?;
        url.query_pairs_mut().append_pair("type", &self.log_stream);
        let lines: Vec<String> = self.get_json(url).await?;
        Ok(LogBuffer::from_lines(lines))
    }

    async fn fetch_training_progress(&self) -> Result<TrainingProgressSnapshot, YardError> {
        self.get_json(self.endpoint(&["training_progress"])?).await
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<(), YardError> {
        let url = self.endpoint(&["remove_container", id.as_str()])?;
        self.post_ack(self.request(Method::POST, url)).await
    }

    async fn manual_place_container(
        &self,
        id: &ContainerId,
        position: Position,
    ) -> Result<(), YardError> {
        let url = self.endpoint(&["manual_place_container", id.as_str()])?;
        self.post_ack(self.request(Method::POST, url).json(&position))
            .await
    }

    async fn upload_csv(&self, upload: CsvUpload) -> Result<(), YardError> {
        let url = self.endpoint(&["upload_csv"])?;
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);
        self.post_ack(self.request(Method::POST, url).multipart(form))
            .await
    }

    async fn reoptimize(&self) -> Result<(), YardError> {
        let url = self.endpoint(&["reoptimize"])?;
        self.post_ack(self.request(Method::POST, url)).await
    }

    async fn health(&self) -> Result<HealthResponse, YardError> {
        self.get_json(self.endpoint(&["health"])?).await
    }
}

fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ServiceErrorBody>(body) {
        return parsed.error;
    }
    let text = excerpt(body);
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        text
    }
}

fn excerpt(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .trim()
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect()
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
