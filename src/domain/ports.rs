use crate::domain::model::{Course, CourseId, Module, ModuleId, Notification, UpdateModuleRequest};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Remote persistence collaborator. Transport, auth and retry policy live
/// behind this trait.
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    async fn fetch_courses(&self) -> Result<Vec<Course>>;
    async fn fetch_modules(&self) -> Result<Vec<Module>>;
    async fn update_module(&self, request: &UpdateModuleRequest) -> Result<()>;
    async fn delete_module(&self, module_id: &ModuleId) -> Result<()>;
    async fn delete_course(&self, course_id: &CourseId) -> Result<()>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout_secs(&self) -> u64;
    fn refetch_after_confirm(&self) -> bool;
}
