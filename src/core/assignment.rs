use crate::core::store::AssociationStore;
use crate::domain::model::{CourseId, CourseMembership, ModuleId, UpdateModuleRequest};
use crate::utils::error::{Result, SyncError};

/// Planned membership change, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentPlan {
    pub module_id: ModuleId,
    pub course_id: CourseId,
    pub order: u32,
    pub updated_memberships: Vec<CourseMembership>,
}

impl AssignmentPlan {
    pub fn to_request(&self) -> UpdateModuleRequest {
        UpdateModuleRequest::from_memberships(
            self.module_id.clone(),
            &self.updated_memberships,
            &self.course_id,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentResult {
    Applied(AssignmentPlan),
    AlreadyMember {
        module_id: ModuleId,
        course_id: CourseId,
    },
}

/// Turns "module dropped on course" into a membership plan. Never writes.
pub struct AssignmentService<'a> {
    store: &'a AssociationStore,
}

impl<'a> AssignmentService<'a> {
    pub fn new(store: &'a AssociationStore) -> Self {
        Self { store }
    }

    pub fn assign(&self, module_id: &ModuleId, course_id: &CourseId) -> Result<AssignmentResult> {
        let module = self
            .store
            .module(module_id)
            .ok_or_else(|| SyncError::not_found("module", module_id))?;
        if !self.store.has_course(course_id) {
            return Err(SyncError::not_found("course", course_id));
        }

        if module.is_member_of(course_id) {
            tracing::debug!("Module {} is already part of course {}", module_id, course_id);
            return Ok(AssignmentResult::AlreadyMember {
                module_id: module_id.clone(),
                course_id: course_id.clone(),
            });
        }

        // new assignments always land last
        let order = self.store.get_course_modules(course_id).len() as u32 + 1;
        let mut updated_memberships = module.memberships.clone();
        updated_memberships.push(CourseMembership {
            course_id: course_id.clone(),
            order,
        });

        tracing::debug!(
            "Planned module {} into course {} at order {}",
            module_id,
            course_id,
            order
        );
        Ok(AssignmentResult::Applied(AssignmentPlan {
            module_id: module_id.clone(),
            course_id: course_id.clone(),
            order,
            updated_memberships,
        }))
    }
}
