use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shown when a failure carries no text of its own
pub const FALLBACK_ERROR: &str = "An error occurred";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Could not read resume {path}: {source}")]
    Resume {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network response was not ok")]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Malformed response from analysis service: {0}")]
    Malformed(String),

    #[error("{0}")]
    Service(String),
}

impl AnalysisError {
    /// Text placed in the assistant turn that reports this failure
    pub fn user_message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            FALLBACK_ERROR.to_string()
        } else {
            text
        }
    }
}

/// A resume file chosen by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub file_name: String,
}

impl Attachment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume.pdf".to_string());
        Self { path, file_name }
    }

    fn is_pdf(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    analysis: AnalysisPayload,
}

#[derive(Deserialize)]
struct AnalysisPayload {
    analysis: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Pull the analysis text out of a successful response body.
///
/// The service nests its result as `{"analysis": {"analysis": "..."}}`, and
/// reports upstream model failures as `{"analysis": {"error": "..."}}` with a
/// success status.
pub fn parse_analysis(body: &[u8]) -> Result<String, AnalysisError> {
    let response: UploadResponse =
        serde_json::from_slice(body).map_err(|e| AnalysisError::Malformed(e.to_string()))?;

    match response.analysis {
        AnalysisPayload { analysis: Some(text), .. } => Ok(text),
        AnalysisPayload { error: Some(message), .. } => Err(AnalysisError::Service(message)),
        _ => Err(AnalysisError::Malformed(
            "missing field `analysis.analysis`".to_string(),
        )),
    }
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(
        &self,
        job_description: &str,
        resume: Option<&Attachment>,
    ) -> Result<String, AnalysisError>;
}

#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    endpoint: String,
}

impl AnalysisClient {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn build_form(
        job_description: &str,
        resume: Option<&Attachment>,
    ) -> Result<multipart::Form, AnalysisError> {
        let mut form = multipart::Form::new();

        if let Some(attachment) = resume {
            let bytes = tokio::fs::read(&attachment.path)
                .await
                .map_err(|source| AnalysisError::Resume {
                    path: attachment.path.display().to_string(),
                    source,
                })?;
            debug!(file = %attachment.file_name, size = bytes.len(), "attaching resume");

            let mut part = multipart::Part::bytes(bytes).file_name(attachment.file_name.clone());
            if attachment.is_pdf() {
                part = part.mime_str("application/pdf")?;
            }
            form = form.part("file", part);
        }

        Ok(form.text("job_description", job_description.to_string()))
    }
}

#[async_trait]
impl AnalysisService for AnalysisClient {
    async fn analyze(
        &self,
        job_description: &str,
        resume: Option<&Attachment>,
    ) -> Result<String, AnalysisError> {
        let form = Self::build_form(job_description, resume).await?;

        info!(endpoint = %self.endpoint, with_file = resume.is_some(), "sending analysis request");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body).ok().map(|b| b.error);
            warn!(%status, detail = detail.as_deref().unwrap_or(""), "analysis service rejected request");
            return Err(AnalysisError::Status { status, detail });
        }

        let body = response.bytes().await?;
        parse_analysis(&body)
    }
}
