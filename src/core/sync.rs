use crate::core::assignment::{AssignmentResult, AssignmentService};
use crate::core::reorder::{compute_reorder, dense_orders};
use crate::core::store::{AssociationStore, SharedStore, StoreSnapshot};
use crate::domain::model::{CourseId, ModuleId, Notification, Severity, UpdateModuleRequest};
use crate::domain::ports::{ConfigProvider, ModuleRepository, Notifier};
use crate::utils::error::{ErrorCategory, Result, SyncError};
use std::collections::HashMap;
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const ASSIGNED_MESSAGE: &str = "Module added to course";
const REORDERED_MESSAGE: &str = "Module order updated";
const MODULE_DELETED_MESSAGE: &str = "Module deleted";
const COURSE_DELETED_MESSAGE: &str = "Course deleted";
const ALREADY_MEMBER_MESSAGE: &str = "Module is already part of this course";
const GENERIC_FAILURE_MESSAGE: &str = "Failed to update module";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Per-module mutation lifecycle.
///
/// ```text
/// Idle -> Applying -> Confirmed
///                 \-> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Applying,
    Confirmed,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Confirmed,
    AlreadyMember,
    /// Nothing to do, e.g. a module dropped back onto its own slot.
    Unchanged,
    RolledBack { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Views of these courses should re-read from the server on next access.
    Invalidated { course_ids: Vec<CourseId> },
    Refreshed { courses: usize, modules: usize },
}

/// A resolved gesture, ready to run against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragIntent {
    Assign {
        module_id: ModuleId,
        course_id: CourseId,
    },
    Reorder {
        course_id: CourseId,
        /// The module the gesture picked up. When set it wins over a stale
        /// `source_index`.
        module_id: Option<ModuleId>,
        source_index: usize,
        target_index: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    pub refetch_after_confirm: bool,
}

impl SyncSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            refetch_after_confirm: config.refetch_after_confirm(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteCall {
    Update(UpdateModuleRequest),
    DeleteModule(ModuleId),
    DeleteCourse(CourseId),
}

type StateMap = HashMap<ModuleId, MutationState>;

/// Marks modules `Applying` for the lifetime of one mutation. Dropping it
/// without settling puts them back to `Idle`.
struct Claim<'a> {
    states: &'a StdMutex<StateMap>,
    module_ids: Vec<ModuleId>,
    settled: bool,
}

impl Claim<'_> {
    fn settle(mut self, state: MutationState) {
        let mut states = lock_states(self.states);
        for id in &self.module_ids {
            states.insert(id.clone(), state);
        }
        self.settled = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut states = lock_states(self.states);
        for id in &self.module_ids {
            states.insert(id.clone(), MutationState::Idle);
        }
    }
}

fn lock_states(states: &StdMutex<StateMap>) -> MutexGuard<'_, StateMap> {
    states.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs a write; if it fails part way the store goes back to `snapshot`.
fn write_or_restore(
    store: &mut AssociationStore,
    snapshot: &StoreSnapshot,
    write: impl FnOnce(&mut AssociationStore) -> Result<()>,
) -> Result<()> {
    let result = write(store);
    if result.is_err() {
        store.restore(snapshot.clone());
    }
    result
}

/// A restore only rewinds the snapshotted records. Course-mates written by an
/// overlapping mutation keep their orders, which can leave a gap. Renumbers
/// such courses and returns update requests for every module that moved.
fn compact_after_restore(
    store: &mut AssociationStore,
    course_ids: &[CourseId],
) -> Vec<UpdateModuleRequest> {
    let mut repairs = Vec::new();
    for course_id in course_ids {
        if !store.has_course(course_id) || store.verify_order(course_id).is_ok() {
            continue;
        }
        let before = store.course_refs(course_id);
        if let Err(e) = store.normalize(course_id) {
            tracing::error!("Could not compact course {} after rollback: {}", course_id, e);
            continue;
        }
        for (old, new) in before.iter().zip(store.course_refs(course_id)) {
            if old.order != new.order {
                repairs.push(UpdateModuleRequest::from_memberships(
                    new.module_id.clone(),
                    store.get_module_memberships(&new.module_id),
                    course_id,
                ));
            }
        }
    }
    repairs
}

/// Applies mutations to the local store first, then to the remote store,
/// confirming or rolling back when the remote answers.
pub struct OptimisticSyncController<R: ModuleRepository, N: Notifier> {
    store: SharedStore,
    repository: R,
    notifier: N,
    settings: SyncSettings,
    states: StdMutex<StateMap>,
    events: broadcast::Sender<SyncEvent>,
}

impl<R: ModuleRepository, N: Notifier> OptimisticSyncController<R, N> {
    pub fn new(store: SharedStore, repository: R, notifier: N, settings: SyncSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            repository,
            notifier,
            settings,
            states: StdMutex::new(HashMap::new()),
            events,
        }
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn mutation_state(&self, module_id: &ModuleId) -> MutationState {
        lock_states(&self.states)
            .get(module_id)
            .copied()
            .unwrap_or_default()
    }

    /// Reloads the whole graph from the remote store.
    pub async fn refresh(&self) -> Result<()> {
        let courses = self.repository.fetch_courses().await?;
        let modules = self.repository.fetch_modules().await?;
        let (course_count, module_count) = (courses.len(), modules.len());

        self.store.lock().await.hydrate(courses, modules)?;
        tracing::info!(
            "Refreshed {} courses and {} modules from remote store",
            course_count,
            module_count
        );
        let _ = self.events.send(SyncEvent::Refreshed {
            courses: course_count,
            modules: module_count,
        });
        Ok(())
    }

    pub async fn execute(&self, intent: DragIntent) -> Result<SyncOutcome> {
        match intent {
            DragIntent::Assign {
                module_id,
                course_id,
            } => self.assign(&module_id, &course_id).await,
            DragIntent::Reorder {
                course_id,
                module_id,
                source_index,
                target_index,
            } => {
                self.reorder_anchored(&course_id, module_id.as_ref(), source_index, target_index)
                    .await
            }
        }
    }

    pub async fn assign(&self, module_id: &ModuleId, course_id: &CourseId) -> Result<SyncOutcome> {
        let mut store = self.store.lock().await;

        let assignment = AssignmentService::new(&store).assign(module_id, course_id);
        let plan = match assignment {
            Ok(AssignmentResult::Applied(plan)) => plan,
            Ok(AssignmentResult::AlreadyMember { .. }) => {
                drop(store);
                self.notifier
                    .notify(Notification::new(Severity::Info, ALREADY_MEMBER_MESSAGE));
                return Ok(SyncOutcome::AlreadyMember);
            }
            Err(e) => return Err(self.reject(e)),
        };

        let claim = self.claim(std::slice::from_ref(module_id))?;
        let snapshot = store.snapshot(
            std::slice::from_ref(course_id),
            std::slice::from_ref(module_id),
        );
        write_or_restore(&mut store, &snapshot, |store| {
            store.replace_memberships(module_id, plan.updated_memberships.clone())
        })?;
        drop(store);

        tracing::debug!(
            "Optimistically assigned module {} to course {} at order {}",
            module_id,
            course_id,
            plan.order
        );
        self.settle(
            claim,
            snapshot,
            vec![RemoteCall::Update(plan.to_request())],
            vec![course_id.clone()],
            ASSIGNED_MESSAGE,
        )
        .await
    }

    pub async fn reorder(
        &self,
        course_id: &CourseId,
        source_index: usize,
        target_index: usize,
    ) -> Result<SyncOutcome> {
        self.reorder_anchored(course_id, None, source_index, target_index)
            .await
    }

    /// `anchor` replaces `source_index` with the module's current position.
    async fn reorder_anchored(
        &self,
        course_id: &CourseId,
        anchor: Option<&ModuleId>,
        source_index: usize,
        target_index: usize,
    ) -> Result<SyncOutcome> {
        let mut store = self.store.lock().await;
        if !store.has_course(course_id) {
            return Err(self.reject(SyncError::not_found("course", course_id)));
        }

        let current = store.course_module_ids(course_id);
        let source_index = match anchor {
            None => source_index,
            Some(module_id) => match current.iter().position(|id| id == module_id) {
                Some(position) => {
                    if position != source_index {
                        tracing::debug!(
                            "Module {} moved from position {} to {} since the drag started",
                            module_id,
                            source_index,
                            position
                        );
                    }
                    position
                }
                None => return Err(self.reject(SyncError::not_found("module", module_id))),
            },
        };
        let reordered = match compute_reorder(&current, source_index, target_index) {
            Ok(reordered) => reordered,
            Err(e) => return Err(self.reject(e)),
        };
        if reordered == current {
            return Ok(SyncOutcome::Unchanged);
        }

        // only modules whose position actually moved are touched
        let changed: Vec<(ModuleId, u32)> = dense_orders(&reordered)
            .into_iter()
            .filter(|(id, order)| {
                store
                    .module(id)
                    .and_then(|m| m.membership(course_id))
                    .map(|m| m.order)
                    != Some(*order)
            })
            .collect();
        let module_ids: Vec<ModuleId> = changed.iter().map(|(id, _)| id.clone()).collect();

        let claim = self.claim(&module_ids)?;
        let snapshot = store.snapshot(std::slice::from_ref(course_id), &module_ids);
        write_or_restore(&mut store, &snapshot, |store| {
            for (id, order) in &changed {
                store.upsert_membership(id, course_id, *order)?;
            }
            store.verify_order(course_id)
        })?;

        let calls: Vec<RemoteCall> = module_ids
            .iter()
            .map(|id| {
                RemoteCall::Update(UpdateModuleRequest::from_memberships(
                    id.clone(),
                    store.get_module_memberships(id),
                    course_id,
                ))
            })
            .collect();
        drop(store);

        tracing::debug!(
            "Optimistically moved position {} to {} in course {} ({} modules renumbered)",
            source_index,
            target_index,
            course_id,
            module_ids.len()
        );
        self.settle(
            claim,
            snapshot,
            calls,
            vec![course_id.clone()],
            REORDERED_MESSAGE,
        )
        .await
    }

    /// Deletes a module and its memberships; the courses it left are
    /// renumbered locally.
    pub async fn delete_module(&self, module_id: &ModuleId) -> Result<SyncOutcome> {
        let mut store = self.store.lock().await;
        let Some(module) = store.module(module_id) else {
            return Err(self.reject(SyncError::not_found("module", module_id)));
        };

        let course_ids: Vec<CourseId> = module
            .memberships
            .iter()
            .map(|m| m.course_id.clone())
            .collect();
        let mut module_ids = vec![module_id.clone()];
        for course_id in &course_ids {
            for id in store.course_module_ids(course_id) {
                if !module_ids.contains(&id) {
                    module_ids.push(id);
                }
            }
        }

        let claim = self.claim(&module_ids)?;
        let snapshot = store.snapshot(&course_ids, &module_ids);
        write_or_restore(&mut store, &snapshot, |store| {
            store.remove_module(module_id)?;
            for course_id in &course_ids {
                store.normalize(course_id)?;
            }
            Ok(())
        })?;
        drop(store);

        self.settle(
            claim,
            snapshot,
            vec![RemoteCall::DeleteModule(module_id.clone())],
            course_ids,
            MODULE_DELETED_MESSAGE,
        )
        .await
    }

    /// Deletes a course. Its modules survive without that membership.
    pub async fn delete_course(&self, course_id: &CourseId) -> Result<SyncOutcome> {
        let mut store = self.store.lock().await;
        if !store.has_course(course_id) {
            return Err(self.reject(SyncError::not_found("course", course_id)));
        }

        let module_ids = store.course_module_ids(course_id);
        let claim = self.claim(&module_ids)?;
        let snapshot = store.snapshot(std::slice::from_ref(course_id), &module_ids);
        write_or_restore(&mut store, &snapshot, |store| {
            store.remove_course(course_id).map(|_| ())
        })?;
        drop(store);

        self.settle(
            claim,
            snapshot,
            vec![RemoteCall::DeleteCourse(course_id.clone())],
            vec![course_id.clone()],
            COURSE_DELETED_MESSAGE,
        )
        .await
    }

    fn claim(&self, module_ids: &[ModuleId]) -> Result<Claim<'_>> {
        let mut states = lock_states(&self.states);
        if let Some(busy) = module_ids
            .iter()
            .find(|id| states.get(*id) == Some(&MutationState::Applying))
        {
            drop(states);
            return Err(self.reject(SyncError::MutationInFlight {
                module_id: busy.to_string(),
            }));
        }
        for id in module_ids {
            states.insert(id.clone(), MutationState::Applying);
        }
        Ok(Claim {
            states: &self.states,
            module_ids: module_ids.to_vec(),
            settled: false,
        })
    }

    /// Sends the remote calls in order. The first failure restores the
    /// snapshot; anything written locally in the meantime is lost. Courses
    /// left with gaps by the restore are compacted and the new orders pushed.
    async fn settle(
        &self,
        claim: Claim<'_>,
        snapshot: StoreSnapshot,
        calls: Vec<RemoteCall>,
        course_ids: Vec<CourseId>,
        success_message: &str,
    ) -> Result<SyncOutcome> {
        for call in &calls {
            if let Err(e) = self.send(call).await {
                let repairs = {
                    let mut store = self.store.lock().await;
                    store.restore(snapshot);
                    compact_after_restore(&mut store, &course_ids)
                };
                claim.settle(MutationState::RolledBack);

                let message = match e.remote_reason() {
                    Some(reason) => format!("{GENERIC_FAILURE_MESSAGE}: {reason}"),
                    None => GENERIC_FAILURE_MESSAGE.to_string(),
                };
                tracing::warn!("Rolled back local change after remote failure: {}", e);
                self.notifier
                    .notify(Notification::new(Severity::Error, message.clone()));
                self.push_repairs(repairs).await;
                return Ok(SyncOutcome::RolledBack { message });
            }
        }

        claim.settle(MutationState::Confirmed);
        tracing::info!("{} ({} remote calls)", success_message, calls.len());
        self.notifier
            .notify(Notification::new(Severity::Success, success_message));
        let _ = self.events.send(SyncEvent::Invalidated { course_ids });

        if self.settings.refetch_after_confirm {
            if let Err(e) = self.refresh().await {
                tracing::warn!("Reconciling refetch failed, keeping local state: {}", e);
            }
        }
        Ok(SyncOutcome::Confirmed)
    }

    /// Best effort; a failed repair leaves the gap on the server until the
    /// next refresh.
    async fn push_repairs(&self, repairs: Vec<UpdateModuleRequest>) {
        for request in repairs {
            tracing::debug!(
                "Pushing compacted order {:?} for module {}",
                request.order,
                request.module_id
            );
            if let Err(e) = self.repository.update_module(&request).await {
                tracing::warn!(
                    "Failed to push compacted order for {}: {}",
                    request.module_id,
                    e
                );
            }
        }
    }

    async fn send(&self, call: &RemoteCall) -> Result<()> {
        match call {
            RemoteCall::Update(request) => {
                tracing::debug!("Updating module {} remotely", request.module_id);
                self.repository.update_module(request).await
            }
            RemoteCall::DeleteModule(module_id) => {
                tracing::debug!("Deleting module {} remotely", module_id);
                self.repository.delete_module(module_id).await
            }
            RemoteCall::DeleteCourse(course_id) => {
                tracing::debug!("Deleting course {} remotely", course_id);
                self.repository.delete_course(course_id).await
            }
        }
    }

    /// Surfaces an error that stopped a mutation before any local write.
    fn reject(&self, error: SyncError) -> SyncError {
        let severity = match error.category() {
            ErrorCategory::Conflict => Severity::Info,
            _ => Severity::Error,
        };
        tracing::warn!("Mutation rejected: {}", error);
        self.notifier
            .notify(Notification::new(severity, error.user_friendly_message()));
        error
    }
}
