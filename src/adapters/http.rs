use crate::core::{
    ConfigProvider, Course, CourseId, Module, ModuleId, ModuleRepository, UpdateModuleRequest,
};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// REST client for the content API.
///
/// `GET courses`, `GET modules`, `PUT modules/{id}`, `DELETE modules/{id}`
/// and `DELETE courses/{id}`, all relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct HttpModuleRepository {
    client: Client,
    base_url: Url,
}

impl HttpModuleRepository {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        validate_url("api.base_url", base_url)?;
        let base_url = Url::parse(base_url).map_err(|e| SyncError::InvalidConfigValueError {
            field: "api.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            Duration::from_secs(config.request_timeout_secs()),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::ConfigError {
                message: format!("API base URL cannot carry a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Maps a non-2xx response to `RemoteRejected`, keeping the server's
    /// `message` or `error` field when the body is JSON.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| {
                ["message", "error"]
                    .iter()
                    .find_map(|key| json.get(key).and_then(|v| v.as_str()).map(str::to_string))
            });

        tracing::debug!("Remote store answered {}: {}", status, body);
        Err(SyncError::RemoteRejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ModuleRepository for HttpModuleRepository {
    async fn fetch_courses(&self) -> Result<Vec<Course>> {
        let url = self.endpoint(&["courses"])?;
        tracing::debug!("Fetching courses from {}", url);
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn fetch_modules(&self) -> Result<Vec<Module>> {
        let url = self.endpoint(&["modules"])?;
        tracing::debug!("Fetching modules from {}", url);
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn update_module(&self, request: &UpdateModuleRequest) -> Result<()> {
        let url = self.endpoint(&["modules", request.module_id.as_str()])?;
        Self::check(self.client.put(url).json(request).send().await?).await?;
        Ok(())
    }

    async fn delete_module(&self, module_id: &ModuleId) -> Result<()> {
        let url = self.endpoint(&["modules", module_id.as_str()])?;
        Self::check(self.client.delete(url).send().await?).await?;
        Ok(())
    }

    async fn delete_course(&self, course_id: &CourseId) -> Result<()> {
        let url = self.endpoint(&["courses", course_id.as_str()])?;
        Self::check(self.client.delete(url).send().await?).await?;
        Ok(())
    }
}
