//! HTTP adapter for the learning backend REST API.
//!
//! Endpoint paths are resolved against the configured base URL. IDs are
//! percent-encoded as path segments, so a base URL with a path prefix
//! (`https://lms.example.com/api/v2/`) works the same as a bare host.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use coursetrack_models::{
    ContentId, ContentProgress, ContentRecord, CourseId, ModuleId, ModuleRecord, ModuleSnapshot,
    QuizId, QuizRecord, QuizSubmission, VideoId, VideoProgress, VideoProgressUpdate, VideoRecord,
};

use crate::config::BackendConfig;
use crate::error::{BackendError, Result};
use crate::traits::LearningBackend;

/// Learning backend reached over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// Creates a backend from connection settings.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    /// Creates a backend from environment variables.
    ///
    /// See [`BackendConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(&BackendConfig::from_env()?)
    }

    /// Base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn listing(&self, module_id: &ModuleId, kind: &str, published_only: bool) -> Result<Url> {
        let mut url = self.endpoint(&["modules", module_id.as_str(), kind])?;
        url.query_pairs_mut()
            .append_pair("publishedOnly", if published_only { "true" } else { "false" });
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        trace!(url = %url, "GET");
        let response = self.send(self.client.get(url.clone())).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(format!("failed to read response from {}: {}", url, e)))?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Decode(format!("{}: {}", url.path(), e)))
    }

    async fn post<B: Serialize + ?Sized>(&self, url: Url, body: Option<&B>) -> Result<()> {
        trace!(url = %url, "POST");
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "backend returned error status");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LearningBackend for HttpBackend {
    async fn list_modules(&self, course_id: &CourseId) -> Result<Vec<ModuleRecord>> {
        self.get(self.endpoint(&["courses", course_id.as_str(), "modules"])?)
            .await
    }

    async fn list_contents(&self, module_id: &ModuleId, published_only: bool) -> Result<Vec<ContentRecord>> {
        self.get(self.listing(module_id, "contents", published_only)?).await
    }

    async fn list_videos(&self, module_id: &ModuleId, published_only: bool) -> Result<Vec<VideoRecord>> {
        self.get(self.listing(module_id, "videos", published_only)?).await
    }

    async fn list_quizzes(&self, module_id: &ModuleId, published_only: bool) -> Result<Vec<QuizRecord>> {
        self.get(self.listing(module_id, "quizzes", published_only)?).await
    }

    async fn get_content_progress(&self, content_id: &ContentId) -> Result<ContentProgress> {
        self.get(self.endpoint(&["contents", content_id.as_str(), "progress"])?)
            .await
    }

    async fn get_video_progress(&self, video_id: &VideoId) -> Result<VideoProgress> {
        self.get(self.endpoint(&["videos", video_id.as_str(), "progress"])?)
            .await
    }

    async fn check_quiz_submission(&self, quiz_id: &QuizId) -> Result<QuizSubmission> {
        self.get(self.endpoint(&["quizzes", quiz_id.as_str(), "submission"])?)
            .await
    }

    async fn mark_content_viewed(&self, content_id: &ContentId) -> Result<()> {
        let url = self.endpoint(&["contents", content_id.as_str(), "view"])?;
        self.post::<()>(url, None).await
    }

    async fn update_video_watch_progress(
        &self,
        video_id: &VideoId,
        watched_seconds: f64,
        total_seconds: f64,
    ) -> Result<()> {
        let url = self.endpoint(&["videos", video_id.as_str(), "progress"])?;
        let body = VideoProgressUpdate {
            watched_seconds,
            total_seconds,
        };
        self.post(url, Some(&body)).await
    }

    async fn get_module_progress(&self, module_id: &ModuleId) -> Result<ModuleSnapshot> {
        self.get(self.endpoint(&["modules", module_id.as_str(), "progress"])?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(&BackendConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let backend = backend("https://lms.example.com/api/v2");
        let url = backend
            .endpoint(&["courses", "c-1", "modules"])
            .unwrap();
        assert_eq!(url.as_str(), "https://lms.example.com/api/v2/courses/c-1/modules");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let backend = backend("http://localhost:8080/api/");
        let url = backend.endpoint(&["contents", "a/b c", "progress"]).unwrap();
        assert_eq!(url.path(), "/api/contents/a%2Fb%20c/progress");
    }

    #[test]
    fn test_listing_query() {
        let backend = backend("http://localhost:8080/");
        let url = backend
            .listing(&ModuleId::from("m1"), "videos", true)
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/modules/m1/videos?publishedOnly=true");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpBackend::new(&BackendConfig::new("not a url")).err().unwrap();
        assert!(matches!(err, BackendError::InvalidUrl(_)));

        let err = HttpBackend::new(&BackendConfig::new("mailto:someone@example.com"))
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }
}
