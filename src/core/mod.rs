pub mod assignment;
pub mod gesture;
pub mod reorder;
pub mod store;
pub mod sync;

pub use crate::domain::model::{
    ContentStatus, Course, CourseId, CourseMembership, Module, ModuleId, ModuleRef, Notification,
    Severity, UpdateModuleRequest,
};
pub use crate::domain::ports::{ConfigProvider, ModuleRepository, Notifier};
pub use crate::utils::error::Result;
