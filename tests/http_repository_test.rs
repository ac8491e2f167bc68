use anyhow::Result;
use course_sync::core::{
    ContentStatus, CourseId, CourseMembership, ModuleId, ModuleRepository, UpdateModuleRequest,
};
use course_sync::{HttpModuleRepository, SyncError};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn repository(server: &MockServer) -> HttpModuleRepository {
    HttpModuleRepository::new(&server.base_url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_courses_and_modules() -> Result<()> {
    let server = MockServer::start();
    let courses_mock = server.mock(|when, then| {
        when.method(GET).path("/courses");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([
                {"id": "c1", "title": "Rust Basics", "status": "published"},
                {"id": "c2", "title": "Async Rust"}
            ]));
    });
    let modules_mock = server.mock(|when, then| {
        when.method(GET).path("/modules");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([
                {
                    "id": "m1",
                    "title": "Ownership",
                    "description": "Moves and borrows",
                    "lessonCount": 4,
                    "duration": 45,
                    "status": "published",
                    "courses": [
                        {"courseId": "c1", "order": 1},
                        {"courseId": "c2", "order": 3}
                    ]
                },
                {"id": "m2", "title": "Traits"}
            ]));
    });

    let repository = repository(&server);
    let courses = repository.fetch_courses().await?;
    let modules = repository.fetch_modules().await?;

    courses_mock.assert();
    modules_mock.assert();

    assert_eq!(courses.len(), 2);
    assert_eq!(courses[0].status, ContentStatus::Published);
    assert_eq!(courses[1].status, ContentStatus::Draft);

    let ownership = &modules[0];
    assert_eq!(ownership.lesson_count, 4);
    assert_eq!(ownership.duration_minutes, 45);
    assert_eq!(
        ownership.memberships,
        vec![
            CourseMembership {
                course_id: CourseId::new("c1"),
                order: 1
            },
            CourseMembership {
                course_id: CourseId::new("c2"),
                order: 3
            },
        ]
    );
    assert!(modules[1].memberships.is_empty());
    assert_eq!(modules[1].description, None);
    Ok(())
}

#[tokio::test]
async fn test_update_module_sends_camel_case_body() -> Result<()> {
    let server = MockServer::start();
    let update_mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/modules/m1")
            .json_body(json!({
                "moduleId": "m1",
                "primaryCourseId": "c2",
                "allCourseIds": ["c2", "c1"],
                "order": 2
            }));
        then.status(200).json_body(json!({"ok": true}));
    });

    let request = UpdateModuleRequest {
        module_id: ModuleId::new("m1"),
        primary_course_id: Some(CourseId::new("c2")),
        all_course_ids: vec![CourseId::new("c2"), CourseId::new("c1")],
        order: Some(2),
    };
    repository(&server).update_module(&request).await?;

    update_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_rejection_keeps_server_reason() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PUT).path("/modules/m1");
        then.status(422)
            .header("Content-Type", "application/json")
            .json_body(json!({"message": "Module is locked for editing"}));
    });
    server.mock(|when, then| {
        when.method(DELETE).path("/courses/c1");
        then.status(409).json_body(json!({"error": "Course has enrollments"}));
    });
    server.mock(|when, then| {
        when.method(DELETE).path("/modules/m9");
        then.status(500).body("upstream exploded");
    });

    let repository = repository(&server);
    let request = UpdateModuleRequest {
        module_id: ModuleId::new("m1"),
        primary_course_id: None,
        all_course_ids: vec![],
        order: None,
    };

    let err = repository.update_module(&request).await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteRejected { status: 422, .. }));
    assert_eq!(err.remote_reason(), Some("Module is locked for editing"));
    assert_eq!(
        err.user_friendly_message(),
        "Failed to update module: Module is locked for editing"
    );

    let err = repository
        .delete_course(&CourseId::new("c1"))
        .await
        .unwrap_err();
    assert_eq!(err.remote_reason(), Some("Course has enrollments"));

    let err = repository
        .delete_module(&ModuleId::new("m9"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::RemoteRejected {
            status: 500,
            message: None
        }
    ));
    assert_eq!(err.user_friendly_message(), "Failed to update module");
}

#[tokio::test]
async fn test_delete_endpoints() -> Result<()> {
    let server = MockServer::start();
    let module_mock = server.mock(|when, then| {
        when.method(DELETE).path("/modules/m2");
        then.status(204);
    });
    let course_mock = server.mock(|when, then| {
        when.method(DELETE).path("/courses/c2");
        then.status(200);
    });

    let repository = repository(&server);
    repository.delete_module(&ModuleId::new("m2")).await?;
    repository.delete_course(&CourseId::new("c2")).await?;

    module_mock.assert();
    course_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_base_url_path_is_kept() {
    let server = MockServer::start();
    let courses_mock = server.mock(|when, then| {
        when.method(GET).path("/api/v1/courses");
        then.status(200).json_body(json!([]));
    });

    let repository =
        HttpModuleRepository::new(&server.url("/api/v1/"), Duration::from_secs(5)).unwrap();
    assert!(repository.fetch_courses().await.unwrap().is_empty());
    courses_mock.assert();
}
