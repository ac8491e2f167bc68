use crate::domain::model::{Course, CourseId, CourseMembership, Module, ModuleId, ModuleRef};
use crate::utils::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle passed to every collaborator that reads or writes the graph.
pub type SharedStore = Arc<Mutex<AssociationStore>>;

/// In-memory course/module graph for the active session.
///
/// Course ordering is not stored separately: a course's module sequence is
/// derived from the `order` of each module's membership in that course.
/// Every write goes through the methods below.
#[derive(Debug, Default, Clone)]
pub struct AssociationStore {
    courses: HashMap<CourseId, Course>,
    modules: HashMap<ModuleId, Module>,
    last_synced_at: Option<DateTime<Utc>>,
}

/// Verbatim copy of selected records, presence included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    courses: Vec<(CourseId, Option<Course>)>,
    modules: Vec<(ModuleId, Option<Module>)>,
}

impl AssociationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Replaces the whole graph with a fresh remote fetch.
    pub fn hydrate(&mut self, courses: Vec<Course>, modules: Vec<Module>) -> Result<()> {
        self.courses = courses.into_iter().map(|c| (c.id.clone(), c)).collect();
        self.modules.clear();

        for mut module in modules {
            let mut seen = HashSet::new();
            module.memberships.retain(|m| {
                if !self.courses.contains_key(&m.course_id) {
                    tracing::warn!(
                        "Dropping membership of module {} in unknown course {}",
                        module.id,
                        m.course_id
                    );
                    return false;
                }
                seen.insert(m.course_id.clone())
            });
            self.modules.insert(module.id.clone(), module);
        }

        let course_ids: Vec<CourseId> = self.courses.keys().cloned().collect();
        for course_id in &course_ids {
            self.normalize(course_id)?;
        }

        self.last_synced_at = Some(Utc::now());
        tracing::debug!(
            "Hydrated store with {} courses and {} modules",
            self.courses.len(),
            self.modules.len()
        );
        Ok(())
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    pub fn insert_course(&mut self, course: Course) {
        self.courses.insert(course.id.clone(), course);
    }

    /// Adds a module, keeping only memberships whose course is known.
    pub fn insert_module(&mut self, mut module: Module) -> Result<()> {
        if let Some(m) = module
            .memberships
            .iter()
            .find(|m| !self.courses.contains_key(&m.course_id))
        {
            return Err(SyncError::not_found("course", &m.course_id));
        }
        let mut touched: Vec<CourseId> = Vec::new();
        module.memberships.retain(|m| {
            if touched.contains(&m.course_id) {
                return false;
            }
            touched.push(m.course_id.clone());
            true
        });
        self.modules.insert(module.id.clone(), module);
        for course_id in &touched {
            self.normalize(course_id)?;
        }
        Ok(())
    }

    pub fn course(&self, course_id: &CourseId) -> Option<&Course> {
        self.courses.get(course_id)
    }

    pub fn module(&self, module_id: &ModuleId) -> Option<&Module> {
        self.modules.get(module_id)
    }

    pub fn has_course(&self, course_id: &CourseId) -> bool {
        self.courses.contains_key(course_id)
    }

    /// Courses sorted by title, then id.
    pub fn courses(&self) -> Vec<&Course> {
        let mut courses: Vec<&Course> = self.courses.values().collect();
        courses.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        courses
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Modules with no membership at all (the unassigned pool).
    pub fn unassigned_modules(&self) -> Vec<&Module> {
        let mut pool: Vec<&Module> = self
            .modules
            .values()
            .filter(|m| m.memberships.is_empty())
            .collect();
        pool.sort_by(|a, b| a.id.cmp(&b.id));
        pool
    }

    /// Modules of a course in ascending order; ties fall back to module id.
    pub fn get_course_modules(&self, course_id: &CourseId) -> Vec<&Module> {
        let mut members: Vec<(u32, &Module)> = self
            .modules
            .values()
            .filter_map(|module| module.membership(course_id).map(|m| (m.order, module)))
            .collect();
        members.sort_by(|(a_order, a), (b_order, b)| a_order.cmp(b_order).then_with(|| a.id.cmp(&b.id)));
        members.into_iter().map(|(_, module)| module).collect()
    }

    pub fn course_module_ids(&self, course_id: &CourseId) -> Vec<ModuleId> {
        self.get_course_modules(course_id)
            .into_iter()
            .map(|m| m.id.clone())
            .collect()
    }

    pub fn course_refs(&self, course_id: &CourseId) -> Vec<ModuleRef> {
        self.get_course_modules(course_id)
            .into_iter()
            .filter_map(|module| {
                module.membership(course_id).map(|m| ModuleRef {
                    module_id: module.id.clone(),
                    order: m.order,
                })
            })
            .collect()
    }

    pub fn get_module_memberships(&self, module_id: &ModuleId) -> &[CourseMembership] {
        self.modules
            .get(module_id)
            .map(|m| m.memberships.as_slice())
            .unwrap_or(&[])
    }

    /// Inserts or updates one membership. Other modules of the course keep
    /// their orders; callers supply an already normalized value.
    pub fn upsert_membership(
        &mut self,
        module_id: &ModuleId,
        course_id: &CourseId,
        order: u32,
    ) -> Result<()> {
        if !self.courses.contains_key(course_id) {
            return Err(SyncError::not_found("course", course_id));
        }
        let module = self
            .modules
            .get_mut(module_id)
            .ok_or_else(|| SyncError::not_found("module", module_id))?;

        match module
            .memberships
            .iter_mut()
            .find(|m| &m.course_id == course_id)
        {
            Some(existing) => existing.order = order,
            None => module.memberships.push(CourseMembership {
                course_id: course_id.clone(),
                order,
            }),
        }
        Ok(())
    }

    /// Commits a full membership set for one module.
    pub fn replace_memberships(
        &mut self,
        module_id: &ModuleId,
        memberships: Vec<CourseMembership>,
    ) -> Result<()> {
        if let Some(m) = memberships
            .iter()
            .find(|m| !self.courses.contains_key(&m.course_id))
        {
            return Err(SyncError::not_found("course", &m.course_id));
        }
        let module = self
            .modules
            .get_mut(module_id)
            .ok_or_else(|| SyncError::not_found("module", module_id))?;
        module.memberships = memberships;
        Ok(())
    }

    /// Removes a module and all its memberships. Surviving courses keep
    /// their gaps until `normalize` runs.
    pub fn remove_module(&mut self, module_id: &ModuleId) -> Result<Module> {
        self.modules
            .remove(module_id)
            .ok_or_else(|| SyncError::not_found("module", module_id))
    }

    /// Removes a course and every membership pointing at it. Modules stay.
    pub fn remove_course(&mut self, course_id: &CourseId) -> Result<Course> {
        let course = self
            .courses
            .remove(course_id)
            .ok_or_else(|| SyncError::not_found("course", course_id))?;
        for module in self.modules.values_mut() {
            module.memberships.retain(|m| &m.course_id != course_id);
        }
        Ok(course)
    }

    /// Renumbers a course to `1..N` keeping the current relative order.
    pub fn normalize(&mut self, course_id: &CourseId) -> Result<()> {
        let sequence = self.course_module_ids(course_id);
        for (position, module_id) in sequence.iter().enumerate() {
            if let Some(membership) = self
                .modules
                .get_mut(module_id)
                .and_then(|m| m.memberships.iter_mut().find(|m| &m.course_id == course_id))
            {
                membership.order = position as u32 + 1;
            }
        }

        if let Err(e) = self.verify_order(course_id) {
            tracing::error!("{}", e);
            if cfg!(debug_assertions) {
                panic!("{e}");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Checks that the course's orders are exactly `1..N`.
    pub fn verify_order(&self, course_id: &CourseId) -> Result<()> {
        let mut orders: Vec<u32> = self
            .modules
            .values()
            .filter_map(|m| m.membership(course_id).map(|m| m.order))
            .collect();
        orders.sort_unstable();

        for (position, order) in orders.iter().enumerate() {
            let expected = position as u32 + 1;
            if *order != expected {
                return Err(SyncError::InvariantViolation {
                    course_id: course_id.to_string(),
                    detail: format!("expected order {expected}, found {order}"),
                });
            }
        }
        Ok(())
    }

    pub fn snapshot(&self, course_ids: &[CourseId], module_ids: &[ModuleId]) -> StoreSnapshot {
        StoreSnapshot {
            courses: course_ids
                .iter()
                .map(|id| (id.clone(), self.courses.get(id).cloned()))
                .collect(),
            modules: module_ids
                .iter()
                .map(|id| (id.clone(), self.modules.get(id).cloned()))
                .collect(),
        }
    }

    /// Puts every captured record back exactly as it was, removing records
    /// that did not exist when the snapshot was taken.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        for (id, course) in snapshot.courses {
            match course {
                Some(course) => {
                    self.courses.insert(id, course);
                }
                None => {
                    self.courses.remove(&id);
                }
            }
        }
        for (id, module) in snapshot.modules {
            match module {
                Some(module) => {
                    self.modules.insert(id, module);
                }
                None => {
                    self.modules.remove(&id);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::model::ContentStatus;

    pub(crate) fn course(id: &str) -> Course {
        Course {
            id: CourseId::new(id),
            title: format!("Course {id}"),
            status: ContentStatus::Published,
        }
    }

    pub(crate) fn module(id: &str, memberships: &[(&str, u32)]) -> Module {
        Module {
            id: ModuleId::new(id),
            title: format!("Module {id}"),
            description: None,
            lesson_count: 3,
            duration_minutes: 20,
            status: ContentStatus::Draft,
            memberships: memberships
                .iter()
                .map(|(course_id, order)| CourseMembership {
                    course_id: CourseId::new(*course_id),
                    order: *order,
                })
                .collect(),
        }
    }

    pub(crate) fn sample_store() -> AssociationStore {
        let mut store = AssociationStore::new();
        store
            .hydrate(
                vec![course("c1"), course("c2")],
                vec![
                    module("m1", &[]),
                    module("m2", &[("c1", 1)]),
                    module("m3", &[("c1", 2), ("c2", 1)]),
                ],
            )
            .unwrap();
        store
    }

    fn ids(values: &[&str]) -> Vec<ModuleId> {
        values.iter().map(|v| ModuleId::new(*v)).collect()
    }

    #[test]
    fn test_course_modules_sorted_by_order() {
        let store = sample_store();
        assert_eq!(store.course_module_ids(&"c1".into()), ids(&["m2", "m3"]));
        assert_eq!(store.course_module_ids(&"c2".into()), ids(&["m3"]));
        assert!(store.get_course_modules(&"missing".into()).is_empty());
    }

    #[test]
    fn test_hydrate_normalizes_and_drops_unknown_courses() {
        let mut store = AssociationStore::new();
        store
            .hydrate(
                vec![course("c1")],
                vec![
                    module("a", &[("c1", 10)]),
                    module("b", &[("c1", 4), ("ghost", 1)]),
                ],
            )
            .unwrap();

        assert_eq!(store.course_module_ids(&"c1".into()), ids(&["b", "a"]));
        assert_eq!(store.get_module_memberships(&"b".into()).len(), 1);
        assert!(store.verify_order(&"c1".into()).is_ok());
        assert!(store.last_synced_at().is_some());
    }

    #[test]
    fn test_upsert_inserts_then_updates_in_place() {
        let mut store = sample_store();
        let m1 = ModuleId::new("m1");
        let c1 = CourseId::new("c1");

        store.upsert_membership(&m1, &c1, 3).unwrap();
        assert_eq!(store.course_module_ids(&c1), ids(&["m2", "m3", "m1"]));

        store.upsert_membership(&m1, &c1, 1).unwrap();
        assert_eq!(store.get_module_memberships(&m1).len(), 1);
        assert_eq!(store.get_module_memberships(&m1)[0].order, 1);
        // m2 still holds order 1: no automatic renumbering
        assert!(store.verify_order(&c1).is_err());
    }

    #[test]
    fn test_upsert_unknown_ids() {
        let mut store = sample_store();
        let err = store
            .upsert_membership(&"nope".into(), &"c1".into(), 1)
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { entity: "module", .. }));

        let err = store
            .upsert_membership(&"m1".into(), &"nope".into(), 1)
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { entity: "course", .. }));
    }

    #[test]
    fn test_remove_module_leaves_gap_until_normalize() {
        let mut store = sample_store();
        store
            .upsert_membership(&"m1".into(), &"c1".into(), 3)
            .unwrap();

        let removed = store.remove_module(&"m2".into()).unwrap();
        assert_eq!(removed.id, ModuleId::new("m2"));
        assert!(store.verify_order(&"c1".into()).is_err());

        store.normalize(&"c1".into()).unwrap();
        let refs = store.course_refs(&"c1".into());
        assert_eq!(
            refs.iter().map(|r| r.order).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(refs[0].module_id, ModuleId::new("m3"));
    }

    #[test]
    fn test_remove_course_keeps_modules() {
        let mut store = sample_store();
        store.remove_course(&"c1".into()).unwrap();

        assert_eq!(store.module_count(), 3);
        assert!(store.get_module_memberships(&"m2".into()).is_empty());
        assert_eq!(store.get_module_memberships(&"m3".into()).len(), 1);
        assert_eq!(store.unassigned_modules().len(), 2);
    }

    #[test]
    fn test_snapshot_restore_is_verbatim() {
        let mut store = sample_store();
        let c1 = CourseId::new("c1");
        let before = store.course_refs(&c1);
        let snapshot = store.snapshot(&[c1.clone()], &ids(&["m1", "m2", "m3"]));

        store.upsert_membership(&"m1".into(), &c1, 3).unwrap();
        store.remove_module(&"m2".into()).unwrap();
        store.normalize(&c1).unwrap();
        assert_ne!(store.course_refs(&c1), before);

        store.restore(snapshot);
        assert_eq!(store.course_refs(&c1), before);
        assert!(store.get_module_memberships(&"m1".into()).is_empty());
    }

    #[test]
    fn test_restore_removes_records_absent_at_snapshot() {
        let mut store = sample_store();
        let snapshot = store.snapshot(&[CourseId::new("c9")], &ids(&["m9"]));

        store.insert_course(course("c9"));
        store.insert_module(module("m9", &[("c9", 1)])).unwrap();
        store.restore(snapshot);

        assert!(!store.has_course(&"c9".into()));
        assert!(store.module(&"m9".into()).is_none());
    }

    #[test]
    fn test_replace_memberships_rejects_unknown_course() {
        let mut store = sample_store();
        let err = store
            .replace_memberships(
                &"m1".into(),
                vec![CourseMembership {
                    course_id: "c7".into(),
                    order: 1,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
        assert!(store.get_module_memberships(&"m1".into()).is_empty());
    }
}
