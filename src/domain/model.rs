use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(CourseId);
id_newtype!(ModuleId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub status: ContentStatus,
}

/// One entry of a course's ordered module list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRef {
    pub module_id: ModuleId,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMembership {
    pub course_id: CourseId,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lesson_count: u32,
    #[serde(default, rename = "duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub status: ContentStatus,
    /// Kept in assignment order; the first entry is the primary course.
    #[serde(default, rename = "courses")]
    pub memberships: Vec<CourseMembership>,
}

impl Module {
    pub fn membership(&self, course_id: &CourseId) -> Option<&CourseMembership> {
        self.memberships.iter().find(|m| &m.course_id == course_id)
    }

    pub fn is_member_of(&self, course_id: &CourseId) -> bool {
        self.membership(course_id).is_some()
    }

    pub fn primary_course(&self) -> Option<&CourseId> {
        self.memberships.first().map(|m| &m.course_id)
    }
}

/// Outbound "update module" payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModuleRequest {
    pub module_id: ModuleId,
    pub primary_course_id: Option<CourseId>,
    pub all_course_ids: Vec<CourseId>,
    pub order: Option<u32>,
}

impl UpdateModuleRequest {
    /// `order` is the module's position in the course the mutation targeted.
    /// The primary course is derived here and nowhere else.
    pub fn from_memberships(
        module_id: ModuleId,
        memberships: &[CourseMembership],
        target_course: &CourseId,
    ) -> Self {
        Self {
            module_id,
            primary_course_id: memberships.first().map(|m| m.course_id.clone()),
            all_course_ids: memberships.iter().map(|m| m.course_id.clone()).collect(),
            order: memberships
                .iter()
                .find(|m| &m.course_id == target_course)
                .map(|m| m.order),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            issued_at: Utc::now(),
        }
    }
}
